use std::{fs::File, io::Write, path::Path};

use anyhow::Context;
use chrono::Local;
use itertools::Itertools;
use serde_json::json;

use crate::{types::ListingRecord, utils::parse_price};

/// Writes the full result set as CSV, UTF-8 with a byte-order mark so
/// spreadsheet tools pick the right encoding. Header row first, then one row
/// per record in fetch order.
pub fn write_csv(
    schema: &[String],
    records: &[ListingRecord],
    path: &Path,
) -> anyhow::Result<()> {
    let mut file =
        File::create(path).context(format!("could not create data file {:?}", path))?;
    file.write_all(b"\xEF\xBB\xBF")?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(schema)?;
    for record in records {
        writer.write_record(&record.values)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, PartialEq)]
pub struct Summary {
    pub total_cars: usize,
    /// None when the active schema has no dealer column.
    pub unique_dealers: Option<usize>,
    /// None when any price failed to parse; no partial average is reported.
    pub average_price: Option<f64>,
    pub timestamp: String,
}

impl Summary {
    pub fn compute(schema: &[String], records: &[ListingRecord]) -> Self {
        let unique_dealers = match schema.iter().position(|f| f == "dealer") {
            Some(idx) => Some(
                records
                    .iter()
                    .filter_map(|r| r.values.get(idx))
                    .filter(|dealer| !dealer.is_empty())
                    .unique()
                    .count(),
            ),
            None => {
                warn!("record schema has no dealer field, skipping dealer count");
                None
            }
        };

        let average_price = schema
            .iter()
            .position(|f| f == "price")
            .and_then(|idx| average_price(records, idx));

        Summary {
            total_cars: records.len(),
            unique_dealers,
            average_price,
            timestamp: Local::now().to_rfc3339(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "total_cars": self.total_cars,
            "unique_dealers": self.unique_dealers,
            "average_price": match self.average_price {
                Some(avg) => json!(avg),
                None => json!("N/A"),
            },
            "timestamp": self.timestamp,
        })
    }
}

fn average_price(records: &[ListingRecord], price_idx: usize) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let mut sum = 0.0;
    for record in records {
        let raw = record.values.get(price_idx).map(String::as_str).unwrap_or("");
        match parse_price(raw) {
            Some(price) => sum += price,
            None => {
                warn!("unparsable price `{}`, reporting average as unavailable", raw);
                return None;
            }
        }
    }
    Some(sum / records.len() as f64)
}

pub fn write_summary(summary: &Summary, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&summary.to_json())?;
    std::fs::write(path, json)
        .context(format!("could not write summary file {:?}", path))?;
    Ok(())
}
