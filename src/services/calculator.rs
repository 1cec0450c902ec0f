// src/services/calculator.rs
use serde::Serialize;
use std::fmt;

use crate::models::{CpiObservation, YearMonth};
use crate::services::series::normalize_series;

/// First month covered by the published CPI series.
pub const EARLIEST_COVERAGE: YearMonth = match YearMonth::new(1958, 1) {
    Some(month) => month,
    None => panic!("invalid coverage constant"),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InflationErrorCode {
    InvalidAmount,
    InvalidFromDate,
    InvalidToDate,
    NoCpiData,
    FromDateTooEarly,
    ToDateBeforeFromDate,
    ToDateInFuture,
    FromCpiNotFound,
    ToCpiNotFound,
    InvalidCpiData,
}

impl InflationErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InflationErrorCode::InvalidAmount => "INVALID_AMOUNT",
            InflationErrorCode::InvalidFromDate => "INVALID_FROM_DATE",
            InflationErrorCode::InvalidToDate => "INVALID_TO_DATE",
            InflationErrorCode::NoCpiData => "NO_CPI_DATA",
            InflationErrorCode::FromDateTooEarly => "FROM_DATE_TOO_EARLY",
            InflationErrorCode::ToDateBeforeFromDate => "TO_DATE_BEFORE_FROM_DATE",
            InflationErrorCode::ToDateInFuture => "TO_DATE_IN_FUTURE",
            InflationErrorCode::FromCpiNotFound => "FROM_CPI_NOT_FOUND",
            InflationErrorCode::ToCpiNotFound => "TO_CPI_NOT_FOUND",
            InflationErrorCode::InvalidCpiData => "INVALID_CPI_DATA",
        }
    }
}

impl fmt::Display for InflationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InflationError {
    pub code: InflationErrorCode,
    pub message: String,
}

impl InflationError {
    fn new(code: InflationErrorCode, message: impl Into<String>) -> Self {
        InflationError {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for InflationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for InflationError {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InflationResult {
    pub original_amount: f64,
    pub adjusted_amount: f64,
    /// Cumulative change between the matched observations, in percent.
    pub inflation_rate: f64,
    /// CAGR in percent; zero when less than a whole year elapsed.
    pub average_annual_rate: f64,
    pub years: i32,
    pub total_months: i32,
    pub from_date: YearMonth,
    pub to_date: YearMonth,
    pub from_index: f64,
    pub to_index: f64,
}

pub type CalculationOutcome = Result<InflationResult, InflationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataCoverage {
    pub from: YearMonth,
    pub to: YearMonth,
}

pub fn is_inflation_error(outcome: &CalculationOutcome) -> bool {
    outcome.is_err()
}

pub fn get_data_coverage(today: YearMonth) -> DataCoverage {
    DataCoverage {
        from: EARLIEST_COVERAGE,
        to: today,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn compound_annual_rate(start_value: f64, end_value: f64, years: f64) -> f64 {
    if start_value <= 0.0 || end_value <= 0.0 || years <= 0.0 {
        0.0
    } else {
        (end_value / start_value).powf(1.0 / years) - 1.0
    }
}

/// Most recent observation not after `target`. Assumes an ascending series.
pub fn find_closest_cpi_point(series: &[CpiObservation], target: YearMonth) -> Option<&CpiObservation> {
    series.iter().rev().find(|observation| observation.date <= target)
}

/// Re-expresses `amount` from the price level of `from` in the price level of `to`.
pub fn convert_amount(amount: f64, from: &CpiObservation, to: &CpiObservation) -> f64 {
    amount * to.index_value / from.index_value
}

/// Inclusive, ascending run of months. Empty when `to` precedes `from`.
pub fn get_months_between(from: YearMonth, to: YearMonth) -> Vec<YearMonth> {
    let span = from.months_until(to);
    (0..=span).map(|offset| from.add_months(offset)).collect()
}

pub fn filter_cpi_data_by_range(series: &[CpiObservation], from: YearMonth, to: YearMonth) -> Vec<CpiObservation> {
    series
        .iter()
        .filter(|observation| observation.date >= from && observation.date <= to)
        .copied()
        .collect()
}

/// Rules 1-3: a positive finite amount and two strict `YYYY-MM` months.
fn parse_inputs(amount: f64, from_date: &str, to_date: &str) -> Result<(YearMonth, YearMonth), InflationError> {
    use InflationErrorCode::*;

    if !amount.is_finite() || amount <= 0.0 {
        return Err(InflationError::new(InvalidAmount, "Amount must be a positive number"));
    }
    let from = YearMonth::parse(from_date).ok_or_else(|| {
        InflationError::new(InvalidFromDate, format!("Invalid from date '{}'. Use YYYY-MM.", from_date))
    })?;
    let to = YearMonth::parse(to_date).ok_or_else(|| {
        InflationError::new(InvalidToDate, format!("Invalid to date '{}'. Use YYYY-MM.", to_date))
    })?;
    Ok((from, to))
}

/// Rules 5-7: coverage start, ordering, and no months after `today`.
fn check_range(from: YearMonth, to: YearMonth, today: YearMonth) -> Result<(), InflationError> {
    use InflationErrorCode::*;

    if from < EARLIEST_COVERAGE {
        return Err(InflationError::new(
            FromDateTooEarly,
            format!("Data coverage begins from {}. From date cannot be earlier.", EARLIEST_COVERAGE),
        ));
    }
    if to < from {
        return Err(InflationError::new(ToDateBeforeFromDate, "To date must be on or after from date"));
    }
    if to > today {
        return Err(InflationError::new(
            ToDateInFuture,
            format!("To date cannot be later than {}", today),
        ));
    }
    Ok(())
}

/// Every input check that does not need the series, in calculator order.
/// Lets callers tell bad input from a data outage when no series is at hand.
pub fn validate_request(
    amount: f64,
    from_date: &str,
    to_date: &str,
    today: YearMonth,
) -> Result<(YearMonth, YearMonth), InflationError> {
    let (from, to) = parse_inputs(amount, from_date, to_date)?;
    check_range(from, to, today)?;
    Ok((from, to))
}

/// Converts `amount` between two months of `series`. `today` bounds the latest
/// month a caller may ask for.
pub fn calculate_inflation(
    amount: f64,
    from_date: &str,
    to_date: &str,
    series: &[CpiObservation],
    today: YearMonth,
) -> CalculationOutcome {
    use InflationErrorCode::*;

    let (from, to) = parse_inputs(amount, from_date, to_date)?;
    if series.is_empty() {
        return Err(InflationError::new(NoCpiData, "No CPI data available"));
    }
    check_range(from, to, today)?;

    let series = normalize_series(series);
    let from_point = find_closest_cpi_point(&series, from).ok_or_else(|| {
        InflationError::new(FromCpiNotFound, format!("No CPI data found on or before {}", from))
    })?;
    let to_point = find_closest_cpi_point(&series, to).ok_or_else(|| {
        InflationError::new(ToCpiNotFound, format!("No CPI data found on or before {}", to))
    })?;
    if from_point.index_value == 0.0 {
        return Err(InflationError::new(
            InvalidCpiData,
            format!("CPI value for {} is zero", from_point.date),
        ));
    }

    let from_index = from_point.index_value;
    let to_index = to_point.index_value;

    let adjusted_amount = convert_amount(amount, from_point, to_point);
    let inflation_rate = (to_index - from_index) / from_index * 100.0;

    // Elapsed time is measured between the requested months, not the matched ones.
    let year_diff = (to.year() - from.year()) as f64;
    let month_diff = to.month() as f64 - from.month() as f64;
    let years = (year_diff + month_diff / 12.0).floor() as i32;
    let total_months = from.months_until(to).abs();

    let average_annual_rate = if years > 0 {
        compound_annual_rate(from_index, to_index, years as f64) * 100.0
    } else {
        0.0
    };

    Ok(InflationResult {
        original_amount: round2(amount),
        adjusted_amount: round2(adjusted_amount),
        inflation_rate: round2(inflation_rate),
        average_annual_rate: round2(average_annual_rate),
        years,
        total_months,
        from_date: from_point.date,
        to_date: to_point.date,
        from_index: round2(from_index),
        to_index: round2(to_index),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(value: &str) -> YearMonth {
        YearMonth::parse(value).unwrap()
    }

    fn obs(date: &str, value: f64) -> CpiObservation {
        CpiObservation::new(ym(date), value)
    }

    fn today() -> YearMonth {
        ym("2025-06")
    }

    fn sample_series() -> Vec<CpiObservation> {
        vec![
            obs("2010-01", 100.0),
            obs("2015-01", 150.0),
            obs("2020-01", 200.0),
            obs("2024-10", 450.25),
        ]
    }

    fn error_code(outcome: CalculationOutcome) -> InflationErrorCode {
        outcome.expect_err("expected an inflation error").code
    }

    #[test]
    fn test_closest_on_or_before_match() {
        let result = calculate_inflation(100.0, "2010-01", "2024-10", &sample_series(), today()).unwrap();
        assert_eq!(result.adjusted_amount, 450.25);
        assert_eq!(result.inflation_rate, 350.25);
        assert_eq!(result.years, 14);
        assert_eq!(result.total_months, 177);
        assert_eq!(result.from_date, ym("2010-01"));
        assert_eq!(result.to_date, ym("2024-10"));
    }

    #[test]
    fn test_matched_dates_can_differ_from_requested() {
        let result = calculate_inflation(100.0, "2012-06", "2021-03", &sample_series(), today()).unwrap();
        assert_eq!(result.from_date, ym("2010-01"));
        assert_eq!(result.to_date, ym("2020-01"));
        assert_eq!(result.adjusted_amount, 200.0);
        // 2012-06 -> 2021-03 is 8.75 years
        assert_eq!(result.years, 8);
        assert_eq!(result.total_months, 105);
    }

    #[test]
    fn test_cagr() {
        let series = vec![obs("2010-01", 100.0), obs("2020-01", 200.0)];
        let result = calculate_inflation(1000.0, "2010-01", "2020-01", &series, today()).unwrap();
        // 2^(1/10) - 1
        assert_eq!(result.average_annual_rate, 7.18);
        assert_eq!(result.adjusted_amount, 2000.0);
    }

    #[test]
    fn test_cagr_is_zero_under_a_year() {
        let series = vec![obs("2020-01", 100.0), obs("2020-06", 104.0)];
        let result = calculate_inflation(50.0, "2020-01", "2020-11", &series, today()).unwrap();
        assert_eq!(result.years, 0);
        assert_eq!(result.average_annual_rate, 0.0);
        assert_eq!(result.inflation_rate, 4.0);
    }

    #[test]
    fn test_same_month_is_identity() {
        for month in ["2010-01", "2016-07", "2024-10"] {
            let result = calculate_inflation(123.45, month, month, &sample_series(), today()).unwrap();
            assert_eq!(result.adjusted_amount, 123.45);
            assert_eq!(result.inflation_rate, 0.0);
            assert_eq!(result.total_months, 0);
        }
    }

    #[test]
    fn test_conversion_round_trip() {
        let series = sample_series();
        for (amount, from, to) in [(100.0, 0, 3), (2500.0, 1, 2), (0.37, 0, 1)] {
            let forward = convert_amount(amount, &series[from], &series[to]);
            let back = convert_amount(forward, &series[to], &series[from]);
            assert!((back - amount).abs() < 1e-9);
        }
    }

    #[test]
    fn test_validation_order() {
        let series = sample_series();
        assert_eq!(error_code(calculate_inflation(-5.0, "2020-01", "2021-01", &series, today())), InflationErrorCode::InvalidAmount);
        assert_eq!(error_code(calculate_inflation(0.0, "bad", "bad", &[], today())), InflationErrorCode::InvalidAmount);
        assert_eq!(error_code(calculate_inflation(f64::NAN, "2020-01", "2021-01", &series, today())), InflationErrorCode::InvalidAmount);
        assert_eq!(error_code(calculate_inflation(f64::INFINITY, "2020-01", "2021-01", &series, today())), InflationErrorCode::InvalidAmount);
        assert_eq!(error_code(calculate_inflation(1.0, "2020-13", "bad", &[], today())), InflationErrorCode::InvalidFromDate);
        assert_eq!(error_code(calculate_inflation(1.0, "2020-01", "2021-1", &[], today())), InflationErrorCode::InvalidToDate);
        assert_eq!(error_code(calculate_inflation(1.0, "1950-01", "2021-01", &[], today())), InflationErrorCode::NoCpiData);
        assert_eq!(error_code(calculate_inflation(100.0, "1950-01", "2024-01", &series, today())), InflationErrorCode::FromDateTooEarly);
        assert_eq!(error_code(calculate_inflation(100.0, "2024-06", "2024-01", &series, today())), InflationErrorCode::ToDateBeforeFromDate);
        assert_eq!(error_code(calculate_inflation(100.0, "2024-06", "2025-07", &series, today())), InflationErrorCode::ToDateInFuture);
    }

    #[test]
    fn test_earliest_coverage_is_accepted() {
        let series = vec![obs("1958-01", 10.0), obs("1960-01", 12.0)];
        let result = calculate_inflation(10.0, "1958-01", "1960-01", &series, today()).unwrap();
        assert_eq!(result.adjusted_amount, 12.0);
        assert_eq!(
            error_code(calculate_inflation(10.0, "1957-12", "1960-01", &series, today())),
            InflationErrorCode::FromDateTooEarly
        );
    }

    #[test]
    fn test_missing_points() {
        let series = vec![obs("2015-01", 150.0)];
        assert_eq!(
            error_code(calculate_inflation(100.0, "2010-01", "2020-01", &series, today())),
            InflationErrorCode::FromCpiNotFound
        );

        let zero = vec![obs("2010-01", 0.0), obs("2020-01", 200.0)];
        assert_eq!(
            error_code(calculate_inflation(100.0, "2010-01", "2020-01", &zero, today())),
            InflationErrorCode::InvalidCpiData
        );
    }

    #[test]
    fn test_unsorted_series_is_normalized() {
        let shuffled = vec![obs("2020-01", 200.0), obs("2010-01", 100.0), obs("2015-01", 150.0)];
        let result = calculate_inflation(100.0, "2010-01", "2016-01", &shuffled, today()).unwrap();
        assert_eq!(result.to_date, ym("2015-01"));
        assert_eq!(result.adjusted_amount, 150.0);
    }

    #[test]
    fn test_exact_match_is_returned() {
        let series = sample_series();
        for observation in &series {
            assert_eq!(find_closest_cpi_point(&series, observation.date), Some(observation));
        }
        assert_eq!(find_closest_cpi_point(&series, ym("2009-12")), None);
        assert_eq!(find_closest_cpi_point(&series, ym("2019-12")).unwrap().date, ym("2015-01"));
    }

    #[test]
    fn test_outcome_partition() {
        let series = sample_series();
        let inputs = [
            (100.0, "2010-01", "2024-10"),
            (-1.0, "2010-01", "2024-10"),
            (100.0, "1900-01", "2024-10"),
            (100.0, "2015-05", "2015-05"),
        ];
        for (amount, from, to) in inputs {
            let outcome = calculate_inflation(amount, from, to, &series, today());
            assert_ne!(is_inflation_error(&outcome), outcome.is_ok());
        }
    }

    #[test]
    fn test_coverage_matches_validation() {
        let coverage = get_data_coverage(today());
        assert_eq!(coverage.from.to_string(), "1958-01");
        assert_eq!(coverage.to, today());
    }

    #[test]
    fn test_months_between() {
        let months: Vec<String> = get_months_between(ym("2023-11"), ym("2024-02"))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(months, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(get_months_between(ym("2024-02"), ym("2024-02")).len(), 1);
        assert!(get_months_between(ym("2024-03"), ym("2024-02")).is_empty());
    }

    #[test]
    fn test_filter_by_range_is_inclusive() {
        let filtered = filter_cpi_data_by_range(&sample_series(), ym("2015-01"), ym("2020-01"));
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].date, ym("2015-01"));
        assert_eq!(filtered[1].date, ym("2020-01"));
    }

    #[test]
    fn test_validate_request_skips_only_the_series_check() {
        assert_eq!(
            validate_request(100.0, "2010-01", "2024-10", today()),
            Ok((ym("2010-01"), ym("2024-10")))
        );
        for (amount, from, to, code) in [
            (-5.0, "2020-01", "2021-01", InflationErrorCode::InvalidAmount),
            (1.0, "2020-13", "2021-01", InflationErrorCode::InvalidFromDate),
            (1.0, "1950-01", "2021-01", InflationErrorCode::FromDateTooEarly),
            (1.0, "2024-06", "2024-01", InflationErrorCode::ToDateBeforeFromDate),
            (1.0, "2020-01", "2025-07", InflationErrorCode::ToDateInFuture),
        ] {
            assert_eq!(validate_request(amount, from, to, today()).unwrap_err().code, code);
        }
    }
}
