// src/services/series.rs
use serde::Serialize;
use std::borrow::Cow;

use crate::models::{CpiObservation, ExportMetadata, ExportPoint, YearMonth};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: YearMonth,
    pub index_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yoy_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mom_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub first_date: Option<YearMonth>,
    pub last_date: Option<YearMonth>,
    pub count: usize,
    pub last_index_value: Option<f64>,
    pub average_index_value: Option<f64>,
}

fn is_normalized(series: &[CpiObservation]) -> bool {
    series.windows(2).all(|pair| pair[0].date < pair[1].date)
}

/// Ascending by month with one observation per month; the later duplicate wins.
/// Borrows when the input is already in that shape.
pub fn normalize_series(series: &[CpiObservation]) -> Cow<'_, [CpiObservation]> {
    if is_normalized(series) {
        return Cow::Borrowed(series);
    }

    let mut sorted = series.to_vec();
    sorted.sort_by_key(|observation| observation.date);

    let mut unique: Vec<CpiObservation> = Vec::with_capacity(sorted.len());
    for observation in sorted {
        match unique.last_mut() {
            Some(last) if last.date == observation.date => *last = observation,
            _ => unique.push(observation),
        }
    }
    Cow::Owned(unique)
}

fn percent_change(current: f64, reference: f64) -> Option<f64> {
    if reference == 0.0 {
        None
    } else {
        Some((current / reference - 1.0) * 100.0)
    }
}

/// Change against the same month one year earlier, when that month is present.
pub fn year_over_year_change(series: &[CpiObservation], at: usize) -> Option<f64> {
    let current = series.get(at)?;
    let reference_month = current.date.add_months(-12);
    let reference = series[..at]
        .binary_search_by_key(&reference_month, |observation| observation.date)
        .ok()
        .map(|index| &series[index])?;
    percent_change(current.index_value, reference.index_value)
}

/// Change against the previous observation, only when it is exactly one month earlier.
pub fn month_over_month_change(series: &[CpiObservation], at: usize) -> Option<f64> {
    if at == 0 {
        return None;
    }
    let current = series.get(at)?;
    let previous = &series[at - 1];
    if previous.date.months_until(current.date) != 1 {
        return None;
    }
    percent_change(current.index_value, previous.index_value)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Observations in `from..=to` with YoY/MoM derived against the whole series.
pub fn trend_between(series: &[CpiObservation], from: YearMonth, to: YearMonth) -> Vec<TrendPoint> {
    let series = normalize_series(series);
    series
        .iter()
        .enumerate()
        .filter(|(_, observation)| observation.date >= from && observation.date <= to)
        .map(|(index, observation)| TrendPoint {
            date: observation.date,
            index_value: observation.index_value,
            yoy_pct: year_over_year_change(&series, index).map(round2),
            mom_pct: month_over_month_change(&series, index).map(round2),
        })
        .collect()
}

pub fn summarize(series: &[CpiObservation]) -> SeriesSummary {
    let series = normalize_series(series);
    let count = series.len();
    let average_index_value = if count == 0 {
        None
    } else {
        Some(series.iter().map(|o| o.index_value).sum::<f64>() / count as f64)
    };

    SeriesSummary {
        first_date: series.first().map(|o| o.date),
        last_date: series.last().map(|o| o.date),
        count,
        last_index_value: series.last().map(|o| o.index_value),
        average_index_value,
    }
}

fn export_date(month: YearMonth) -> String {
    format!("{}-01", month)
}

/// Export-format points with derived YoY/MoM, plus the bundle metadata, the
/// way the ETL exporter writes them.
pub fn compute_series_metrics(series: &[CpiObservation]) -> (Vec<ExportPoint>, ExportMetadata) {
    let series = normalize_series(series);
    let points = series
        .iter()
        .enumerate()
        .map(|(index, observation)| ExportPoint {
            date: export_date(observation.date),
            index_value: observation.index_value,
            yoy_pct: year_over_year_change(&series, index).map(round2),
            mom_pct: month_over_month_change(&series, index).map(round2),
        })
        .collect();

    let summary = summarize(&series);
    let metadata = ExportMetadata {
        first_date: summary.first_date.map(export_date),
        last_date: summary.last_date.map(export_date),
        count: summary.count,
        last_index_value: summary.last_index_value,
        average_index_value: summary.average_index_value.map(round2),
    };
    (points, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(date: &str, value: f64) -> CpiObservation {
        CpiObservation::new(YearMonth::parse(date).unwrap(), value)
    }

    fn etl_fixture() -> Vec<CpiObservation> {
        vec![
            obs("2023-01", 100.0),
            obs("2023-02", 102.0),
            obs("2023-12", 108.0),
            obs("2024-01", 110.0),
            obs("2024-02", 111.0),
        ]
    }

    #[test]
    fn test_normalize_borrows_sorted_input() {
        let series = etl_fixture();
        assert!(matches!(normalize_series(&series), Cow::Borrowed(_)));
    }

    #[test]
    fn test_normalize_sorts_and_dedups() {
        let series = vec![obs("2024-01", 110.0), obs("2023-01", 100.0), obs("2024-01", 111.0)];
        let normalized = normalize_series(&series);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].date.to_string(), "2023-01");
        assert_eq!(normalized[1].index_value, 111.0);
    }

    #[test]
    fn test_yoy_and_mom_follow_calendar_gaps() {
        let series = etl_fixture();
        // 2023-12 follows 2023-02: gap, no MoM
        assert_eq!(month_over_month_change(&series, 2), None);
        assert!((month_over_month_change(&series, 1).unwrap() - 2.0).abs() < 1e-9);
        assert!((year_over_year_change(&series, 3).unwrap() - 10.0).abs() < 1e-9);
        assert!((year_over_year_change(&series, 4).unwrap() - (111.0 / 102.0 - 1.0) * 100.0).abs() < 1e-9);
        assert_eq!(year_over_year_change(&series, 2), None);
        assert_eq!(month_over_month_change(&series, 0), None);
    }

    #[test]
    fn test_trend_between_uses_full_history() {
        let series = etl_fixture();
        let trend = trend_between(&series, YearMonth::new(2024, 1).unwrap(), YearMonth::new(2024, 2).unwrap());
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].yoy_pct, Some(10.0));
        assert_eq!(trend[1].mom_pct, Some(0.91));
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&etl_fixture());
        assert_eq!(summary.count, 5);
        assert_eq!(summary.first_date, YearMonth::new(2023, 1));
        assert_eq!(summary.last_index_value, Some(111.0));
        assert!((summary.average_index_value.unwrap() - 106.2).abs() < 1e-9);

        let empty = summarize(&[]);
        assert_eq!(empty.count, 0);
        assert!(empty.average_index_value.is_none());
    }

    #[test]
    fn test_series_metrics_match_export_layout() {
        let (points, metadata) = compute_series_metrics(&etl_fixture());
        assert_eq!(points.len(), 5);
        assert_eq!(points[0].date, "2023-01-01");
        assert_eq!(points[0].yoy_pct, None);
        assert_eq!(points[1].mom_pct, Some(2.0));
        assert_eq!(points[3].yoy_pct, Some(10.0));
        assert_eq!(metadata.first_date.as_deref(), Some("2023-01-01"));
        assert_eq!(metadata.last_date.as_deref(), Some("2024-02-01"));
        assert_eq!(metadata.count, 5);
        assert_eq!(metadata.average_index_value, Some(106.2));
    }
}
