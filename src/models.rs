// src/models.rs
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn month_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}$").expect("static month pattern is valid"))
}

/// A calendar month, written canonically as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        if month >= 1 && month <= 12 {
            Some(YearMonth { year, month })
        } else {
            None
        }
    }

    pub fn from_date<D: Datelike>(date: &D) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Strict `YYYY-MM` parse, month in 1..=12.
    pub fn parse(value: &str) -> Option<Self> {
        if !month_pattern().is_match(value) {
            return None;
        }
        let year = value[..4].parse().ok()?;
        let month = value[5..].parse().ok()?;
        Self::new(year, month)
    }

    /// Accepts `YYYY-MM` or an ISO `YYYY-MM-DD` date (as written by the export ETL).
    pub fn parse_lenient(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::parse(value).or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|date| Self::from_date(&date))
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    fn ordinal(&self) -> i32 {
        self.year * 12 + self.month as i32 - 1
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(&self, other: YearMonth) -> i32 {
        other.ordinal() - self.ordinal()
    }

    pub fn add_months(&self, months: i32) -> YearMonth {
        let ordinal = self.ordinal() + months;
        YearMonth {
            year: ordinal.div_euclid(12),
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        YearMonth::parse(s).ok_or_else(|| format!("invalid month '{}', expected YYYY-MM", s))
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        YearMonth::parse_lenient(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid month '{}'", raw)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sector {
    Combined,
    Urban,
    Rural,
}

/// One month's published index value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpiObservation {
    pub date: YearMonth,
    pub index_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<Sector>,
}

impl CpiObservation {
    pub fn new(date: YearMonth, index_value: f64) -> Self {
        CpiObservation {
            date,
            index_value,
            sector: None,
        }
    }
}

// Export bundle, as written by the ETL exporter.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    #[serde(default)]
    pub first_date: Option<String>,
    #[serde(default)]
    pub last_date: Option<String>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub last_index_value: Option<f64>,
    #[serde(default)]
    pub average_index_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportPoint {
    pub date: String,
    pub index_value: f64,
    #[serde(default)]
    pub yoy_pct: Option<f64>,
    #[serde(default)]
    pub mom_pct: Option<f64>,
}

impl ExportPoint {
    pub fn to_observation(&self) -> Option<CpiObservation> {
        YearMonth::parse_lenient(&self.date).map(|date| CpiObservation::new(date, self.index_value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRegion {
    pub code: String,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalSeries {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: ExportMetadata,
    #[serde(default)]
    pub series: Vec<ExportPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub metadata: ExportMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<ExportRegion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regional_series: Option<Vec<RegionalSeries>>,
    #[serde(default)]
    pub series: Vec<ExportPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

impl ExportBundle {
    /// Top-level series as calculator observations. Points with unreadable dates are skipped.
    pub fn observations(&self) -> Vec<CpiObservation> {
        self.series.iter().filter_map(ExportPoint::to_observation).collect()
    }
}
