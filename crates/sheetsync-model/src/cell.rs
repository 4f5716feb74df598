//! Values handed back to the formula evaluator

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Default text shown while a cell waits for data
pub const LOADING_TEXT: &str = "Loading...";

/// Result of a synchronous cell lookup
///
/// `Loading` and `Pending` are not errors: the data source has scheduled a
/// fetch and will publish an update once the value is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Nothing to show
    Empty,
    /// Text value
    Text(String),
    /// Numeric value
    Number(f64),
    /// Row outside the fetched window, a reload is scheduled
    Loading,
    /// Column not fetched yet, a reload is scheduled
    Pending,
}

impl CellValue {
    /// Create text value
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Whether the value is a placeholder for data still being fetched
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Loading | Self::Pending)
    }

    /// Convert a raw scalar the way the evaluator expects it
    ///
    /// Falsy values (`false`, `null`, `""`, `0`) become [`CellValue::Empty`],
    /// so an unset field renders as an empty cell.
    #[must_use]
    pub fn from_raw(value: &Value) -> Self {
        match value {
            Value::Number(n) => match n.as_f64() {
                Some(f) if f != 0.0 => Self::Number(f),
                _ => Self::Empty,
            },
            Value::String(s) if !s.is_empty() => Self::Text(s.clone()),
            Value::Bool(true) => Self::text("TRUE"),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
            _ => Self::Empty,
        }
    }

    /// Render with a custom loading text
    #[must_use]
    pub fn render(&self, loading_text: &str) -> String {
        match self {
            Self::Loading => loading_text.to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty | Self::Pending => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Number(n) => write!(f, "{n}"),
            Self::Loading => f.write_str(LOADING_TEXT),
        }
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for CellValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}
