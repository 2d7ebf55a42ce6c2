//! Run configuration: the condition levels and the column naming conventions
//! of the survival workbook.
//!
//! The source sheet is expected to follow these conventions:
//!
//! * a numeric condition column (`temp`) holding one of the configured levels,
//! * an optional `sex` column matched by exact text against the sex filter,
//! * an optional `exclude` column where `1` drops the row,
//! * count columns whose names start with `Day` (`Day3`, `Day4`, ...),
//! * any column whose name contains `eggs` is ignored.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::survival::export::error::ConfigError;
use crate::survival::export::model::CellValue;

/// File stem used when no output path is given.
pub const DEFAULT_OUTPUT_STEM: &str = "exportedSurvival_forPrism";

/// A condition level, e.g. an incubation temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Value matched against the condition column.
    pub value: f64,
    /// Output column header. Defaults to the value rendered as text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Condition {
    pub fn new(value: f64) -> Self {
        Self { value, label: None }
    }

    pub fn with_label(value: f64, label: impl Into<String>) -> Self {
        Self {
            value,
            label: Some(label.into()),
        }
    }

    /// Header used for this condition in the expanded table (`23.0` → `"23"`).
    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.value.to_string())
    }

    /// Whether a cell holds this level. Text cells are compared numerically
    /// when they parse as a number.
    pub fn matches(&self, cell: &CellValue) -> bool {
        match cell {
            CellValue::Number(value) => *value == self.value,
            CellValue::Text(text) => text
                .trim()
                .parse::<f64>()
                .is_ok_and(|value| value == self.value),
            CellValue::Bool(_) | CellValue::Empty => false,
        }
    }
}

/// How the `time` cell of an output row is derived from a day column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeLabel {
    /// Last character of the column name (`Day3` → `3`, `Day12` → `2`).
    #[default]
    LastCharacter,
    /// Everything after the day prefix (`Day12` → `12`).
    DaySuffix,
}

impl TimeLabel {
    pub fn apply(self, column: &str, day_prefix: &str) -> String {
        match self {
            TimeLabel::LastCharacter => column
                .chars()
                .last()
                .map(String::from)
                .unwrap_or_default(),
            TimeLabel::DaySuffix => column
                .strip_prefix(day_prefix)
                .unwrap_or(column)
                .to_string(),
        }
    }
}

/// Settings shared by the filter and the expander.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Condition levels, in output column order.
    pub conditions: Vec<Condition>,
    pub condition_column: String,
    pub sex_column: String,
    pub exclude_column: String,
    /// Prefix identifying the per-day count columns.
    pub day_prefix: String,
    /// Columns whose name contains this marker are dropped.
    pub ignored_column_marker: String,
    /// Header of the time column in the output.
    pub time_header: String,
    pub time_label: TimeLabel,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            conditions: vec![
                Condition::new(23.0),
                Condition::new(30.0),
                Condition::new(37.0),
            ],
            condition_column: "temp".to_string(),
            sex_column: "sex".to_string(),
            exclude_column: "exclude".to_string(),
            day_prefix: "Day".to_string(),
            ignored_column_marker: "eggs".to_string(),
            time_header: "time".to_string(),
            time_label: TimeLabel::default(),
        }
    }
}

impl ExportConfig {
    /// Reads a JSON configuration. Missing fields take their default value.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ExportConfig =
            serde_json::from_str(&data).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces the condition levels.
    pub fn with_conditions(mut self, values: &[f64]) -> Self {
        self.conditions = values.iter().copied().map(Condition::new).collect();
        self
    }

    pub fn condition_labels(&self) -> Vec<String> {
        self.conditions.iter().map(Condition::label).collect()
    }

    pub fn is_day_column(&self, name: &str) -> bool {
        name.starts_with(&self.day_prefix)
    }

    pub fn is_ignored_column(&self, name: &str) -> bool {
        name.contains(&self.ignored_column_marker)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conditions.is_empty() {
            return Err(ConfigError::NoConditions);
        }

        let mut labels = HashSet::new();
        for condition in &self.conditions {
            if !condition.value.is_finite() {
                return Err(ConfigError::NonFiniteCondition(condition.value));
            }
            let label = condition.label();
            if !labels.insert(label.clone()) {
                return Err(ConfigError::DuplicateLabel(label));
            }
        }

        let required = [
            ("condition_column", &self.condition_column),
            ("day_prefix", &self.day_prefix),
            ("ignored_column_marker", &self.ignored_column_marker),
            ("time_header", &self.time_header),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(ConfigError::EmptySetting(name));
            }
        }

        Ok(())
    }
}
