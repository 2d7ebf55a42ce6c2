use std::collections::HashSet;
use std::fmt;

/// Text that marks a missing value, as understood by the usual spreadsheet
/// and dataframe tooling. Such cells load as [`CellValue::Empty`].
pub const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single cell of the source table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Plain text, kept exactly as read.
    Text(String),
    /// Any numeric cell. Integers and floats are not distinguished.
    Number(f64),
    /// Boolean cell.
    Bool(bool),
    /// Blank or missing cell.
    Empty,
}

impl CellValue {
    /// Builds a cell from untyped text, as found in delimited input. Blank
    /// text and missing-value markers become [`CellValue::Empty`]; anything
    /// else stays text so exact comparisons see the original characters.
    pub fn from_text(raw: &str) -> Self {
        if is_missing(raw) {
            CellValue::Empty
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    /// Numeric view of the cell. Booleans count as 0/1 and text is parsed;
    /// blanks and non-numeric text give nothing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            CellValue::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            CellValue::Text(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            CellValue::Empty => None,
        }
    }

    /// Text view of the cell used for exact string comparisons.
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// Whether text denotes a missing value.
pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || NA_TOKENS.contains(&trimmed)
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(value) => f.write_str(value),
            CellValue::Number(value) => write!(f, "{value}"),
            CellValue::Bool(value) => write!(f, "{value}"),
            CellValue::Empty => Ok(()),
        }
    }
}

/// In-memory table with named columns. Every row has exactly one cell per
/// column; the loader pads short rows with [`CellValue::Empty`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Creates a table, padding or truncating each row to the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First non-blank column name that appears more than once.
    pub fn duplicate_column(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.columns
            .iter()
            .filter(|name| !name.is_empty())
            .find(|name| !seen.insert(*name))
            .map(String::as_str)
    }

    /// Position of the first column with the given name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Iterates over the cells of a column, or `None` when it does not exist.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &CellValue> + '_> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    /// Returns a new table with the columns accepted by `keep`, in source
    /// order.
    pub fn select_columns<F>(&self, keep: F) -> Table
    where
        F: Fn(&str) -> bool,
    {
        let indices: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| keep(name))
            .map(|(index, _)| index)
            .collect();

        Table {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Returns a new table holding the rows at the given positions.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

/// A run of identical observations in the long-format output: `count`
/// subjects with an event at `time` under the condition at index `condition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRun {
    pub time: String,
    pub condition: usize,
    pub count: usize,
}

/// Long-format table ready to be pasted into plotting software. Observations
/// are stored as runs and expanded into single rows by [`ExpandedTable::rows`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpandedTable {
    pub time_header: String,
    pub condition_labels: Vec<String>,
    pub runs: Vec<EventRun>,
}

/// Marker written into the column of the condition an observation belongs to.
pub const EVENT_MARKER: &str = "1";

impl ExpandedTable {
    pub fn new(time_header: impl Into<String>, condition_labels: Vec<String>) -> Self {
        Self {
            time_header: time_header.into(),
            condition_labels,
            runs: Vec::new(),
        }
    }

    /// Appends `count` identical observations. Empty runs are not stored.
    pub fn push_events(&mut self, time: &str, condition: usize, count: usize) {
        if count == 0 {
            return;
        }
        self.runs.push(EventRun {
            time: time.to_string(),
            condition,
            count,
        });
    }

    /// Number of output rows.
    pub fn len(&self) -> usize {
        self.runs.iter().map(|run| run.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// One item per output row, in output order.
    pub fn rows(&self) -> impl Iterator<Item = &EventRun> + '_ {
        self.runs
            .iter()
            .flat_map(|run| std::iter::repeat(run).take(run.count))
    }

    /// Header without the leading index column.
    pub fn headers(&self) -> Vec<String> {
        std::iter::once(self.time_header.clone())
            .chain(self.condition_labels.iter().cloned())
            .collect()
    }

    /// Cells of a row without the leading index column. Exactly one of the
    /// condition cells carries [`EVENT_MARKER`], the others are blank.
    pub fn cells(&self, row: &EventRun) -> Vec<String> {
        std::iter::once(row.time.clone())
            .chain((0..self.condition_labels.len()).map(|index| {
                if index == row.condition {
                    EVENT_MARKER.to_string()
                } else {
                    String::new()
                }
            }))
            .collect()
    }

    /// Number of observations recorded for each condition, in label order.
    pub fn counts_per_condition(&self) -> Vec<usize> {
        let mut counts = vec![0; self.condition_labels.len()];
        for run in &self.runs {
            if let Some(count) = counts.get_mut(run.condition) {
                *count += run.count;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimited_text_keeps_original_characters() {
        assert_eq!(CellValue::from_text("01"), CellValue::Text("01".into()));
        assert_eq!(CellValue::from_text("01").as_text(), "01");
        assert_eq!(CellValue::from_text("01").as_number(), Some(1.0));
        assert_eq!(CellValue::from_text("  "), CellValue::Empty);
    }

    #[test]
    fn missing_value_markers_are_empty() {
        for token in ["NA", "N/A", "#N/A", "NaN", "null", " nan "] {
            assert_eq!(CellValue::from_text(token), CellValue::Empty, "{token}");
        }
        assert_eq!(CellValue::from_text("two"), CellValue::Text("two".into()));
    }

    #[test]
    fn duplicate_headers_are_found() {
        let table = Table::new(
            vec!["temp".into(), "Day3".into(), "".into(), "".into(), "Day3".into()],
            vec![],
        );
        assert_eq!(table.duplicate_column(), Some("Day3"));

        let table = Table::new(vec!["temp".into(), "".into(), "".into()], vec![]);
        assert_eq!(table.duplicate_column(), None);
    }

    #[test]
    fn runs_expand_into_rows() {
        let mut table = ExpandedTable::new("time", vec!["23".into(), "30".into()]);
        table.push_events("3", 0, 2);
        table.push_events("3", 1, 0);
        table.push_events("4", 1, 1);

        assert_eq!(table.runs.len(), 2);
        assert_eq!(table.len(), 3);
        let rows: Vec<(&str, usize)> = table
            .rows()
            .map(|row| (row.time.as_str(), row.condition))
            .collect();
        assert_eq!(rows, vec![("3", 0), ("3", 0), ("4", 1)]);
        assert_eq!(table.counts_per_condition(), vec![2, 1]);
    }
}
