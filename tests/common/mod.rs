#![allow(dead_code)]

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;

use india_inflation::config::{ExportConfig, ObjectStorageConfig};
use india_inflation::models::{CpiObservation, ExportBundle, YearMonth};
use india_inflation::services::exports::gzip::gzip_bytes;
use india_inflation::services::series::compute_series_metrics;

/// An item export as the ETL exporter would write it, derived fields included.
pub fn bundle(slug: &str, points: &[(&str, f64)]) -> Value {
    let observations: Vec<CpiObservation> = points
        .iter()
        .map(|(date, value)| CpiObservation::new(YearMonth::parse_lenient(date).unwrap(), *value))
        .collect();
    let (series, metadata) = compute_series_metrics(&observations);

    serde_json::to_value(ExportBundle {
        slug: slug.to_string(),
        name: format!("{} index", slug),
        metadata,
        default_region: None,
        regions: None,
        regional_series: None,
        series,
        generated_at: Some("2025-06-01T00:00:00Z".to_string()),
    })
    .unwrap()
}

pub fn cpi_bundle() -> Value {
    bundle(
        "cpi-all-india",
        &[
            ("2010-01-01", 100.0),
            ("2015-01-01", 150.0),
            ("2020-01-01", 200.0),
            ("2024-10-01", 450.25),
        ],
    )
}

pub fn write_local(root: &Path, dir: &str, slug: &str, body: &Value) {
    let path = root.join("etl/data/exports").join(dir).join(format!("{}.json.gz", slug));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, gzip_bytes(body.to_string().as_bytes()).unwrap()).unwrap();
}

pub fn write_sample(root: &Path, dir: &str, slug: &str, body: &Value) {
    let path = root.join("public/sample-data").join(dir).join(format!("{}.json", slug));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body.to_string()).unwrap();
}

pub fn export_config(root: &Path, object_storage: Option<ObjectStorageConfig>) -> ExportConfig {
    ExportConfig {
        project_root: root.to_path_buf(),
        max_bytes: 1024 * 1024,
        backend_timeout: Duration::from_secs(5),
        object_storage,
    }
}
