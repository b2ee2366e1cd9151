//! Turns the copied-out funding listing text into the department table the
//! renderer reads.
//!
//! The listing is line oriented: a `Department of ...` line opens a section,
//! and each grant line ends in `$<amount>` (`8 mil.`, `1.2 bil`, `350k`,
//! `12,500`) or says `None reported`. Grant names that wrapped onto several
//! lines are joined back together.

use crate::utils::error::{RenderError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

const DEPARTMENT_PREFIX: &str = "Department of";
const NONE_REPORTED: &str = "None reported";
const SKIPPED_PREFIXES: [&str; 2] = ["https", "2/14"];

/// One grant line from the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Funding")]
    pub funding: u64,
    #[serde(rename = "Department")]
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentTotal {
    pub department: String,
    pub funding: u64,
}

pub struct FundingListingParser {
    amount: Regex,
}

impl FundingListingParser {
    pub fn new() -> Result<Self> {
        let amount = Regex::new(r"^([\d,.]+)\s*(mil|bil|k)?").map_err(|e| {
            RenderError::ConfigError {
                message: format!("invalid amount pattern: {}", e),
            }
        })?;
        Ok(Self { amount })
    }

    /// `"8 mil."` → 8_000_000, `"1.5 bil"` → 1_500_000_000, `"350k"` → 350_000.
    /// Anything without a leading number is 0.
    pub fn convert_funding_value(&self, raw: &str) -> u64 {
        let normalized = raw.trim().to_lowercase();
        let Some(caps) = self.amount.captures(&normalized) else {
            return 0;
        };
        let digits = caps[1].replace(',', "");
        let Ok(value) = digits.parse::<f64>() else {
            tracing::warn!("⚠️ Unreadable amount '{}', using 0", raw.trim());
            return 0;
        };
        let multiplier = match caps.get(2).map(|m| m.as_str()) {
            Some("mil") => 1_000_000.0,
            Some("bil") => 1_000_000_000.0,
            Some("k") => 1_000.0,
            _ => 1.0,
        };
        // 無條件捨去
        (value * multiplier) as u64
    }

    pub fn parse_listing(&self, text: &str) -> Vec<GrantEntry> {
        let mut entries = Vec::new();
        let mut department = String::new();
        let mut name_buffer: Vec<&str> = Vec::new();

        for line in text.lines().map(str::trim) {
            if line.is_empty() || SKIPPED_PREFIXES.iter().any(|p| line.starts_with(p)) {
                continue;
            }
            if line.starts_with(DEPARTMENT_PREFIX) {
                department = line.to_string();
                continue;
            }

            let (name, funding) = if let Some((name, amount)) = line.rsplit_once('$') {
                (name.trim().to_string(), self.convert_funding_value(amount))
            } else if line.contains(NONE_REPORTED) {
                (line.replace(NONE_REPORTED, "").trim().to_string(), 0)
            } else {
                name_buffer.push(line);
                continue;
            };

            let name = if name_buffer.is_empty() {
                name
            } else {
                let prefix = name_buffer.join(" ");
                name_buffer.clear();
                format!("{} {}", prefix, name).trim().to_string()
            };

            entries.push(GrantEntry {
                name,
                funding,
                department: department.clone(),
            });
        }

        if !name_buffer.is_empty() {
            tracing::debug!("Ignoring {} trailing lines without an amount", name_buffer.len());
        }
        entries
    }
}

/// Sums funding per department in first-seen order. Entries listed before
/// any department heading are left out.
pub fn aggregate_by_department(entries: &[GrantEntry]) -> Vec<DepartmentTotal> {
    let mut totals: Vec<DepartmentTotal> = Vec::new();
    for entry in entries.iter().filter(|e| !e.department.is_empty()) {
        match totals.iter_mut().find(|t| t.department == entry.department) {
            Some(total) => total.funding = total.funding.saturating_add(entry.funding),
            None => totals.push(DepartmentTotal {
                department: entry.department.clone(),
                funding: entry.funding,
            }),
        }
    }
    totals
}

pub fn write_grants_csv(entries: &[GrantEntry]) -> Result<Vec<u8>> {
    write_csv(entries)
}

pub fn write_totals_csv(totals: &[DepartmentTotal]) -> Result<Vec<u8>> {
    write_csv(totals)
}

fn write_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|e| RenderError::IoError(e.into_error()))
}
