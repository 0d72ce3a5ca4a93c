use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::common::error::{Result, ScraperError};
use crate::normalize::{normalize_column, parse_price};

/// What a CSV conversion produced
#[derive(Debug, Clone)]
pub struct ConvertSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub csv_path: PathBuf,
    pub json_path: PathBuf,
}

/// Normalized header names, de-duplicated with a numeric suffix
fn normalize_headers(headers: &csv::StringRecord) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let base = match normalize_column(raw) {
                name if name.is_empty() => format!("column_{}", index + 1),
                name => name,
            };
            let mut name = base.clone();
            let mut n = 2;
            while !seen.insert(name.clone()) {
                name = format!("{base}_{n}");
                n += 1;
            }
            name
        })
        .collect()
}

/// JSON value for one non-empty cell; prices become numbers, specifications objects
fn cell_value(column: &str, cell: &str) -> Option<Value> {
    match column {
        "price" => Some(parse_price(cell).map(Value::from).unwrap_or(Value::Null)),
        "specifications" => match serde_json::from_str::<Value>(cell) {
            Ok(value @ Value::Object(_)) => Some(value),
            _ => None,
        },
        _ => Some(Value::String(cell.to_string())),
    }
}

/// Convert a supplier CSV into `{stem}_normalized.csv` and `{stem}.json`.
///
/// Headers are normalized to catalog field names and every cell is trimmed.
/// In the JSON output `price` is numeric (null when unparseable) and the
/// original text is kept as `price_text`.
pub fn convert_csv(input: &Path, output_dir: &Path) -> Result<ConvertSummary> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ScraperError::Config(format!("Input path has no file name: {}", input.display())))?;

    std::fs::create_dir_all(output_dir)?;
    let csv_path = output_dir.join(format!("{stem}_normalized.csv"));
    let json_path = output_dir.join(format!("{stem}.json"));

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(input)?;
    let columns = normalize_headers(reader.headers()?);
    let keeps_price_text = columns.iter().any(|c| c == "price_text");

    let mut writer = csv::Writer::from_path(&csv_path)?;
    writer.write_record(&columns)?;

    let mut objects = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let cells: Vec<&str> = (0..columns.len()).map(|i| record.get(i).unwrap_or("").trim()).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        writer.write_record(&cells)?;

        let mut object = Map::new();
        for (column, cell) in columns.iter().zip(&cells) {
            if cell.is_empty() {
                // An absent specifications key reads back as an empty map
                if column != "specifications" {
                    object.insert(column.clone(), Value::Null);
                }
                continue;
            }
            match cell_value(column, cell) {
                Some(value) => {
                    object.insert(column.clone(), value);
                }
                None => warn!(line = line + 2, column = %column, "dropping cell that is not a JSON object"),
            }
            if column == "price" && !keeps_price_text {
                object.insert("price_text".to_string(), Value::String(cell.to_string()));
            }
        }
        objects.push(Value::Object(object));
    }
    writer.flush()?;

    serde_json::to_writer_pretty(BufWriter::new(File::create(&json_path)?), &objects)?;

    info!(
        input = %input.display(),
        rows = objects.len(),
        csv = %csv_path.display(),
        json = %json_path.display(),
        "CSV converted"
    );
    Ok(ConvertSummary {
        rows: objects.len(),
        columns,
        csv_path,
        json_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::ScrapedProduct;
    use crate::output::{read_json, write_csv};
    use tempfile::tempdir;

    #[test]
    fn test_convert_normalizes_headers_and_cells() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("supplier sheet.csv");
        std::fs::write(
            &input,
            "Product Name, Unit Price ,Image,Category,Notes,Notes\n\
             \"  iPhone 12 Screen \",\"$1,049.50\",/img/a.jpg,Screens,oem,x\n\
             ,,,,,\n\
             Galaxy Battery,call us,,Batteries,,\n",
        )
        .unwrap();

        let out = dir.path().join("out");
        let summary = convert_csv(&input, &out).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(
            summary.columns,
            vec!["name", "price", "image_url", "category", "notes", "notes_2"]
        );
        assert!(summary.csv_path.ends_with("supplier sheet_normalized.csv"));

        let mut reader = csv::Reader::from_path(&summary.csv_path).unwrap();
        let first = reader.records().next().unwrap().unwrap();
        assert_eq!(&first[0], "iPhone 12 Screen");

        let json: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&summary.json_path).unwrap()).unwrap();
        assert_eq!(json[0]["price"], Value::from(1049.5));
        assert_eq!(json[0]["price_text"], Value::from("$1,049.50"));
        assert_eq!(json[1]["price"], Value::Null);

        // The JSON is directly importable
        let products = read_json(&summary.json_path).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].price, Some(1049.5));
        assert_eq!(products[1].category.as_deref(), Some("Batteries"));
    }

    #[test]
    fn test_exported_csv_converts_back_to_importable_json() {
        let dir = tempdir().unwrap();
        let exported = dir.path().join("shop_products.csv");
        let products = vec![
            ScrapedProduct {
                name: "iPhone 12 Screen".to_string(),
                price: Some(89.0),
                category: Some("Screens".to_string()),
                specifications: [("display".to_string(), "6.1 inch".to_string())].into_iter().collect(),
                ..Default::default()
            },
            ScrapedProduct {
                name: "Galaxy S21 Battery".to_string(),
                price: Some(19.5),
                category: Some("Batteries".to_string()),
                ..Default::default()
            },
        ];
        write_csv(&exported, &products).unwrap();

        let summary = convert_csv(&exported, &dir.path().join("out")).unwrap();
        assert_eq!(summary.rows, 2);

        let json: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&summary.json_path).unwrap()).unwrap();
        assert!(json[1].get("specifications").is_none());

        let imported = read_json(&summary.json_path).unwrap();
        assert_eq!(imported.len(), 2);
        assert_eq!(imported[0].specifications.get("display").map(String::as_str), Some("6.1 inch"));
        assert!(imported[1].specifications.is_empty());
        assert_eq!(imported[1].price, Some(19.5));
    }
}
