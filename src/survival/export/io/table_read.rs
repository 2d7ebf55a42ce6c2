use std::path::Path;

use calamine::{DataType, Reader, open_workbook_auto};
use tracing::{debug, instrument};

use crate::survival::export::error::LoadError;
use crate::survival::export::model::{CellValue, Table, is_missing};

/// Source layouts understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Any workbook calamine can open (`xlsx`, `xlsm`, `xlsb`, `xls`, `ods`).
    Workbook,
    /// Delimited text with the given field separator.
    Delimited(u8),
}

impl SourceFormat {
    pub fn detect(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "xla" | "ods" => Ok(SourceFormat::Workbook),
            "csv" => Ok(SourceFormat::Delimited(b',')),
            "tsv" | "tab" => Ok(SourceFormat::Delimited(b'\t')),
            _ => Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

/// Reads the survival sheet into memory. The first row holds the column
/// names, which must be unique; fully blank rows are skipped. Blank cells,
/// missing-value markers such as `NA` or `#N/A` and spreadsheet error cells
/// all load as [`CellValue::Empty`].
///
/// For workbooks the first worksheet is read unless `sheet` names another one.
#[instrument(level = "info", skip_all, fields(input = %path.display(), sheet = ?sheet))]
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let table = match SourceFormat::detect(path)? {
        SourceFormat::Workbook => read_workbook(path, sheet)?,
        SourceFormat::Delimited(delimiter) => read_delimited(path, delimiter)?,
    };
    if let Some(column) = table.duplicate_column() {
        return Err(LoadError::DuplicateColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        });
    }
    debug!(
        columns = table.columns.len(),
        rows = table.len(),
        "source table loaded"
    );
    Ok(table)
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<Table, LoadError> {
    let workbook_error = |source| LoadError::Workbook {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let range = match sheet {
        Some(name) => workbook
            .worksheet_range(name)
            .ok_or_else(|| LoadError::MissingSheet {
                path: path.to_path_buf(),
                sheet: name.to_string(),
            })?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| LoadError::NoHeader(path.to_path_buf()))?,
    }
    .map_err(workbook_error)?;

    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|cell| cell_to_string(Some(cell))).collect(),
        None => return Err(LoadError::NoHeader(path.to_path_buf())),
    };

    let rows = rows
        .map(|row| row.iter().map(cell_to_value).collect::<Vec<_>>())
        .filter(|row| !row.iter().all(CellValue::is_empty))
        .collect();

    Ok(Table::new(columns, rows))
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<Table, LoadError> {
    let csv_error = |source| LoadError::Delimited {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(LoadError::NoHeader(path.to_path_buf()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let row: Vec<CellValue> = record.iter().map(CellValue::from_text).collect();
        if row.iter().all(CellValue::is_empty) {
            continue;
        }
        rows.push(row);
    }

    Ok(Table::new(columns, rows))
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(value) if is_missing(value) => CellValue::Empty,
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Bool(*value),
        DataType::Empty | DataType::Error(_) => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}
