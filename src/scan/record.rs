use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ScanError, ScanResult};

/// Column order shared by ledger partitions and export artifacts.
pub const COLUMNS: [&str; 7] = [
    "title",
    "author",
    "publisher",
    "date",
    "abstract",
    "url",
    "time_received",
];

pub const UNTITLED: &str = "Untitled";
pub const PROCESSING_ERROR_TITLE: &str = "Data Processing Error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub date: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
}

impl CanonicalRecord {
    /// Placeholder stored when the submitted payload could not be read at all.
    pub fn processing_error() -> Self {
        Self {
            title: PROCESSING_ERROR_TITLE.to_string(),
            author: String::new(),
            publisher: String::new(),
            date: String::new(),
            abstract_text: String::new(),
            url: String::new(),
        }
    }

    pub fn is_processing_error(&self) -> bool {
        self.title == PROCESSING_ERROR_TITLE
            && self.author.is_empty()
            && self.publisher.is_empty()
            && self.url.is_empty()
    }

    pub(crate) fn to_row<'a>(&'a self, time_received: &'a str) -> [&'a str; 7] {
        [
            &self.title,
            &self.author,
            &self.publisher,
            &self.date,
            &self.abstract_text,
            &self.url,
            time_received,
        ]
    }
}

/// A record as persisted in a partition, with the time the store accepted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(flatten)]
    pub record: CanonicalRecord,
    pub time_received: String,
}

impl LedgerEntry {
    pub(crate) fn from_row(row: &csv::StringRecord) -> Self {
        let field = |idx: usize| row.get(idx).unwrap_or_default().to_string();
        Self {
            record: CanonicalRecord {
                title: field(0),
                author: field(1),
                publisher: field(2),
                date: field(3),
                abstract_text: field(4),
                url: field(5),
            },
            time_received: field(6),
        }
    }
}

/// Calendar day naming one ledger partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PartitionKey(NaiveDate);

impl PartitionKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Accepts only the canonical zero-padded `YYYY-MM-DD` form, so a key can
    /// always be turned into a file name inside the ledger directory.
    pub fn parse(raw: &str) -> ScanResult<Self> {
        let trimmed = raw.trim();
        let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map_err(|_| ScanError::InvalidPartitionKey(raw.to_string()))?;
        let key = Self(date);
        if key.to_string() != trimmed {
            return Err(ScanError::InvalidPartitionKey(raw.to_string()));
        }
        Ok(key)
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn file_name(self) -> String {
        format!("{self}.csv")
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<PartitionKey> for String {
    fn from(value: PartitionKey) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for PartitionKey {
    type Error = ScanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
