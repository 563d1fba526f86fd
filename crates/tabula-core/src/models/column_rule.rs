use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Data type of a column. Selects which value validators apply to its cells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Number,
    Email,
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DataType::String => write!(f, "string"),
            DataType::Number => write!(f, "number"),
            DataType::Email => write!(f, "email"),
        }
    }
}

impl FromStr for DataType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" | "text" => Ok(DataType::String),
            "number" | "numeric" => Ok(DataType::Number),
            "email" => Ok(DataType::Email),
            _ => Err(anyhow::anyhow!("Invalid data type: {}", s)),
        }
    }
}

/// A single column rule of an upload configuration.
///
/// `required` means the header must be present in the file; `values_required` means every
/// cell of that column must be non-empty. Length bounds and the pattern only apply to
/// `string` columns, value bounds only to `number` columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnRule {
    pub id: Uuid,
    pub configuration_id: Uuid,
    pub header_name: String,
    pub display_name: String,
    pub data_type: DataType,
    pub required: bool,
    pub values_required: bool,
    pub min_length: Option<i32>,
    pub max_length: Option<i32>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub pattern: Option<String>,
    pub position: i32,
}

impl ColumnRule {
    /// Create an optional column with no bounds. Display name defaults to the header.
    pub fn new(
        configuration_id: Uuid,
        header_name: impl Into<String>,
        data_type: DataType,
        position: i32,
    ) -> Self {
        let header_name = header_name.into();
        Self {
            id: Uuid::new_v4(),
            configuration_id,
            display_name: header_name.clone(),
            header_name,
            data_type,
            required: false,
            values_required: false,
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            pattern: None,
            position,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn values_required(mut self) -> Self {
        self.values_required = true;
        self
    }

    pub fn with_length(mut self, min: Option<i32>, max: Option<i32>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_value_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Header as it is matched against the file (trimmed).
    pub fn normalized_header(&self) -> &str {
        self.header_name.trim()
    }
}
