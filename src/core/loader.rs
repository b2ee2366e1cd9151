use crate::core::{FundingRecord, Storage, WordFrequencyTable};
use crate::domain::model::WordCounts;
use crate::utils::error::{RenderError, Result};
use crate::utils::validation::is_remote;
use reqwest::Client;
use std::collections::BTreeMap;

/// Funding value used when the field is absent, non-numeric or not positive.
pub const DEFAULT_FUNDING: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct LoadedData {
    pub records: Vec<FundingRecord>,
    pub words: WordFrequencyTable,
}

pub struct DataLoader<S: Storage> {
    storage: S,
    client: Client,
}

impl<S: Storage> DataLoader<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            client: Client::new(),
        }
    }

    /// Fetches both resources; either failing fails the whole load.
    pub async fn load(&self, funding_location: &str, words_location: &str) -> Result<LoadedData> {
        let (funding_bytes, word_bytes) = tokio::try_join!(
            self.fetch(funding_location),
            self.fetch(words_location)
        )?;

        let records = parse_funding_csv(&funding_bytes, funding_location)?;
        let words = parse_word_table(&word_bytes, words_location)?;

        tracing::info!(
            "📥 Loaded {} funding rows and word tables for {} departments",
            records.len(),
            words.len()
        );

        Ok(LoadedData { records, words })
    }

    pub async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        if !is_remote(location) {
            tracing::debug!("Reading local resource: {}", location);
            return self.storage.read_file(location).await;
        }

        tracing::debug!("Making HTTP request to: {}", location);
        let response = self.client.get(location).send().await?;
        tracing::debug!("HTTP response status: {}", response.status());

        if !response.status().is_success() {
            return Err(RenderError::ResourceError {
                location: location.to_string(),
                message: format!("HTTP status {}", response.status()),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Trims and parses a funding field. Missing, empty, non-numeric, non-finite
/// and non-positive values all become [`DEFAULT_FUNDING`].
pub fn coerce_funding(raw: Option<&str>) -> f64 {
    raw.map(str::trim)
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(DEFAULT_FUNDING)
}

pub fn parse_funding_csv(bytes: &[u8], source_name: &str) -> Result<Vec<FundingRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let department_idx = column("department").ok_or_else(|| RenderError::DataShapeError {
        source_name: source_name.to_string(),
        message: "missing 'department' column".to_string(),
    })?;
    let funding_idx = column("funding");
    if funding_idx.is_none() {
        tracing::warn!("⚠️ No 'funding' column in {}; every department gets 1", source_name);
    }

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let department = record.get(department_idx).unwrap_or_default();
        if department.is_empty() {
            tracing::warn!("Skipping row {} with empty department", row + 1);
            continue;
        }

        let raw_funding = funding_idx.and_then(|idx| record.get(idx));
        let funding = coerce_funding(raw_funding);
        if raw_funding.and_then(|v| v.parse::<f64>().ok()) != Some(funding) {
            tracing::debug!(
                "Coerced funding {:?} -> {} for {}",
                raw_funding,
                funding,
                department
            );
        }

        records.push(FundingRecord {
            department: department.to_string(),
            funding,
        });
    }

    Ok(records)
}

pub fn parse_word_table(bytes: &[u8], source_name: &str) -> Result<WordFrequencyTable> {
    let shape_error = |message: String| RenderError::DataShapeError {
        source_name: source_name.to_string(),
        message,
    };

    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    let serde_json::Value::Object(departments) = value else {
        return Err(shape_error("expected an object keyed by department".to_string()));
    };

    let mut table = BTreeMap::new();
    for (department, words) in departments {
        let serde_json::Value::Object(words) = words else {
            return Err(shape_error(format!(
                "word table for '{}' is not an object",
                department
            )));
        };

        let mut counts = WordCounts::new();
        for (word, count) in words {
            let count = count.as_u64().ok_or_else(|| {
                shape_error(format!(
                    "count for '{}' in '{}' is not a non-negative integer",
                    word, department
                ))
            })?;
            counts.insert(word, count);
        }
        table.insert(department, counts);
    }

    Ok(WordFrequencyTable { departments: table })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_funding_defaults_to_one() {
        assert_eq!(coerce_funding(None), 1.0);
        assert_eq!(coerce_funding(Some("")), 1.0);
        assert_eq!(coerce_funding(Some("n/a")), 1.0);
        assert_eq!(coerce_funding(Some("1,000")), 1.0);
        assert_eq!(coerce_funding(Some("NaN")), 1.0);
        assert_eq!(coerce_funding(Some("inf")), 1.0);
        assert_eq!(coerce_funding(Some("0")), 1.0);
        assert_eq!(coerce_funding(Some("-25")), 1.0);
    }

    #[test]
    fn test_coerce_funding_keeps_numbers() {
        assert_eq!(coerce_funding(Some("100")), 100.0);
        assert_eq!(coerce_funding(Some(" 12.5 ")), 12.5);
        assert_eq!(coerce_funding(Some("2e3")), 2000.0);
    }

    #[test]
    fn test_parse_funding_csv() {
        let csv = "Department,Funding,Notes\n\
                   Department of Energy,2500000,\n\
                   Department of Commerce,,missing\n\
                   ,10,orphan\n\
                   Department of Labor,abc\n";

        let records = parse_funding_csv(csv.as_bytes(), "funding.csv").unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].department, "Department of Energy");
        assert_eq!(records[0].funding, 2_500_000.0);
        assert_eq!(records[1].funding, 1.0);
        assert_eq!(records[2].department, "Department of Labor");
        assert_eq!(records[2].funding, 1.0);
    }

    #[test]
    fn test_parse_funding_csv_without_funding_column() {
        let csv = "department\nA\nB\n";
        let records = parse_funding_csv(csv.as_bytes(), "funding.csv").unwrap();
        assert!(records.iter().all(|r| r.funding == 1.0));
    }

    #[test]
    fn test_parse_funding_csv_requires_department_column() {
        let csv = "name,funding\nA,10\n";
        let result = parse_funding_csv(csv.as_bytes(), "funding.csv");
        assert!(matches!(result, Err(RenderError::DataShapeError { .. })));
    }

    #[test]
    fn test_parse_word_table() {
        let json = r#"{"Department of Energy": {"science": 10, "data": 5}, "Department of Labor": {}}"#;
        let table = parse_word_table(json.as_bytes(), "words.json").unwrap();

        assert_eq!(table.len(), 2);
        let energy = table.words_for("Department of Energy").unwrap();
        assert_eq!(energy.get("science"), Some(&10));
        assert!(table.words_for("Department of Labor").is_none());
        assert!(table.words_for("Department of State").is_none());
    }

    #[test]
    fn test_parse_word_table_rejects_bad_shapes() {
        assert!(matches!(
            parse_word_table(b"[1, 2, 3]", "words.json"),
            Err(RenderError::DataShapeError { .. })
        ));
        assert!(matches!(
            parse_word_table(br#"{"A": ["science"]}"#, "words.json"),
            Err(RenderError::DataShapeError { .. })
        ));
        assert!(matches!(
            parse_word_table(br#"{"A": {"science": "ten"}}"#, "words.json"),
            Err(RenderError::DataShapeError { .. })
        ));
        assert!(matches!(
            parse_word_table(b"{not json", "words.json"),
            Err(RenderError::SerializationError(_))
        ));
    }
}
