// src/services/exports/csv_export.rs
use csv::Writer;
use std::io;

use super::ExportError;
use crate::models::ExportBundle;

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Top-level series as `date,index_value,yoy_pct,mom_pct`, empty fields for nulls.
pub fn convert_export_to_csv(bundle: &ExportBundle) -> Result<String, ExportError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(["date", "index_value", "yoy_pct", "mom_pct"])?;

    for point in &bundle.series {
        writer.write_record([
            point.date.clone(),
            point.index_value.to_string(),
            optional(point.yoy_pct),
            optional(point.mom_pct),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExportMetadata, ExportPoint};

    fn bundle(points: Vec<ExportPoint>) -> ExportBundle {
        ExportBundle {
            slug: "milk".to_string(),
            name: "Milk".to_string(),
            metadata: ExportMetadata::default(),
            default_region: None,
            regions: None,
            regional_series: None,
            series: points,
            generated_at: None,
        }
    }

    #[test]
    fn test_csv_rows_and_nulls() {
        let csv = convert_export_to_csv(&bundle(vec![
            ExportPoint {
                date: "2023-01-01".to_string(),
                index_value: 100.0,
                yoy_pct: None,
                mom_pct: None,
            },
            ExportPoint {
                date: "2023-02-01".to_string(),
                index_value: 102.5,
                yoy_pct: Some(4.25),
                mom_pct: Some(2.5),
            },
        ]))
        .unwrap();

        assert_eq!(
            csv,
            "date,index_value,yoy_pct,mom_pct\n2023-01-01,100,,\n2023-02-01,102.5,4.25,2.5\n"
        );
    }

    #[test]
    fn test_csv_quotes_fields_with_delimiters() {
        let csv = convert_export_to_csv(&bundle(vec![ExportPoint {
            date: "Jan, 2023".to_string(),
            index_value: 1.0,
            yoy_pct: None,
            mom_pct: None,
        }]))
        .unwrap();
        assert!(csv.contains("\"Jan, 2023\",1,,"));
    }
}
