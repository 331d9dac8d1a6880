use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One trade parsed out of an uploaded document. Owned by its parent file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date: Option<String>,
    pub symbol: Option<String>,
    #[serde(rename = "type")]
    pub trade_type: Option<String>,
    pub quantity: i64,
    pub price: f64,
    pub counterparty: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileStatus {
    Processing,
    Completed,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Processing => "Processing",
            FileStatus::Completed => "Completed",
            FileStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FileStatus::Processing)
    }

    /// Status only moves forward: Processing -> Completed | Failed.
    pub fn can_transition_to(&self, next: FileStatus) -> bool {
        !self.is_terminal() && next.is_terminal()
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Processing" => Ok(FileStatus::Processing),
            "Completed" => Ok(FileStatus::Completed),
            "Failed" => Ok(FileStatus::Failed),
            other => Err(format!("unknown file status '{other}'")),
        }
    }
}

/// Upload size in kilobytes, rounded to two decimals.
///
/// Kept numeric internally; the `"<value> KB"` form only appears at the
/// display and serialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FileSize(f64);

impl FileSize {
    pub const UNIT: &'static str = "KB";

    pub fn from_bytes(bytes: u64) -> Self {
        Self::from_kb(bytes as f64 / 1024.0)
    }

    pub fn from_kb(kb: f64) -> Self {
        FileSize((kb * 100.0).round() / 100.0)
    }

    pub fn kb(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.0, Self::UNIT)
    }
}

impl FromStr for FileSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let number = trimmed.strip_suffix(Self::UNIT).unwrap_or(trimmed).trim();
        number
            .parse::<f64>()
            .ok()
            .filter(|kb| kb.is_finite() && *kb >= 0.0)
            .map(FileSize::from_kb)
            .ok_or_else(|| format!("invalid file size '{value}'"))
    }
}

impl From<FileSize> for String {
    fn from(size: FileSize) -> Self {
        size.to_string()
    }
}

impl TryFrom<String> for FileSize {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Fields handed to the store when a file record is first created.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub filename: String,
    pub status: FileStatus,
    pub file_type: String,
    pub file_size: FileSize,
    pub raw_content: String,
    pub sample_trades: Vec<TradeRecord>,
    pub uploaded_at: DateTime<Utc>,
}

impl NewFileRecord {
    pub fn trade_count(&self) -> usize {
        self.sample_trades.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub filename: String,
    pub status: FileStatus,
    pub file_type: String,
    pub file_size: FileSize,
    pub raw_content: String,
    pub sample_trades: Vec<TradeRecord>,
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn trade_count(&self) -> usize {
        self.sample_trades.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileTypeSummary {
    pub file_type: String,
    pub files: usize,
    pub avg_size_kb: f64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSummary {
    pub total_files: usize,
    pub success_rate: f64,
    pub avg_file_size_kb: f64,
    /// Not measured by ingestion; always the fixed placeholder.
    pub avg_process_time_secs: f64,
    pub file_types: Vec<FileTypeSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_formats_with_two_decimals() {
        let size = FileSize::from_bytes(10 * 1024 + 512);
        assert_eq!(size.to_string(), "10.50 KB");
        assert_eq!(FileSize::from_bytes(1000).to_string(), "0.98 KB");
    }

    #[test]
    fn size_parses_back_from_display_form() {
        let size: FileSize = "20.00 KB".parse().unwrap();
        assert_eq!(size.kb(), 20.0);
        let bare: FileSize = "3.25".parse().unwrap();
        assert_eq!(bare.kb(), 3.25);
        assert!("big KB".parse::<FileSize>().is_err());
    }

    #[test]
    fn status_moves_forward_only() {
        assert!(FileStatus::Processing.can_transition_to(FileStatus::Completed));
        assert!(FileStatus::Processing.can_transition_to(FileStatus::Failed));
        assert!(!FileStatus::Completed.can_transition_to(FileStatus::Processing));
        assert!(!FileStatus::Failed.can_transition_to(FileStatus::Completed));
        assert!(FileStatus::Failed.is_terminal());
        assert_eq!("Completed".parse::<FileStatus>(), Ok(FileStatus::Completed));
    }

    #[test]
    fn trade_type_serializes_as_type() {
        let trade = TradeRecord {
            date: Some("2024-01-02".to_string()),
            symbol: Some("AAPL".to_string()),
            trade_type: Some("buy".to_string()),
            quantity: 10,
            price: 187.5,
            counterparty: None,
        };
        let json = serde_json::to_value(&trade).unwrap();
        assert_eq!(json["type"], "buy");
        assert!(json["counterparty"].is_null());
    }
}
