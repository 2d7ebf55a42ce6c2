use std::io::Write;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Workbook, XlsxError};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::survival::export::error::WriteError;
use crate::survival::export::model::{EVENT_MARKER, ExpandedTable};

/// Worksheet name used for workbook output.
pub const OUTPUT_SHEET: &str = "Survival";

/// Output layouts produced by the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Tsv,
    Xlsx,
}

impl OutputFormat {
    /// Infers the format from the file extension, if it is a known one.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(OutputFormat::Csv),
            "tsv" => Some(OutputFormat::Tsv),
            "xlsx" => Some(OutputFormat::Xlsx),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Xlsx => "xlsx",
        }
    }
}

/// Writes the expanded table with a leading, unnamed row-index column
/// starting at 0.
///
/// The whole file is rendered in memory and moved into place only once it is
/// complete, so a failure never leaves a truncated file at `path`.
#[instrument(
    level = "info",
    skip(table),
    fields(output = %path.display(), rows = table.len())
)]
pub fn write_table(
    path: &Path,
    table: &ExpandedTable,
    format: OutputFormat,
) -> Result<(), WriteError> {
    let bytes = match format {
        OutputFormat::Csv => render_delimited(path, table, b',')?,
        OutputFormat::Tsv => render_delimited(path, table, b'\t')?,
        OutputFormat::Xlsx => render_workbook(table).map_err(|source| WriteError::Workbook {
            path: path.to_path_buf(),
            source,
        })?,
    };
    debug!(bytes = bytes.len(), "output rendered");
    persist_atomically(path, &bytes)
}

fn render_delimited(
    path: &Path,
    table: &ExpandedTable,
    delimiter: u8,
) -> Result<Vec<u8>, WriteError> {
    let csv_error = |source| WriteError::Delimited {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let header = std::iter::once(String::new()).chain(table.headers());
    writer.write_record(header).map_err(csv_error)?;

    for (index, row) in table.rows().enumerate() {
        let record = std::iter::once(index.to_string()).chain(table.cells(row));
        writer.write_record(record).map_err(csv_error)?;
    }

    writer.into_inner().map_err(|err| WriteError::Io {
        path: path.to_path_buf(),
        source: err.into_error(),
    })
}

fn render_workbook(table: &ExpandedTable) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(OUTPUT_SHEET)?;

    for (col_idx, header) in table.headers().iter().enumerate() {
        worksheet.write_string(0, (col_idx + 1) as u16, header)?;
    }

    for (row_idx, row) in table.rows().enumerate() {
        let sheet_row = (row_idx + 1) as u32;
        worksheet.write_number(sheet_row, 0, row_idx as f64)?;
        for (col_idx, cell) in table.cells(row).iter().enumerate() {
            let sheet_col = (col_idx + 1) as u16;
            if col_idx == 0 {
                worksheet.write_string(sheet_row, sheet_col, cell)?;
            } else if cell == EVENT_MARKER {
                worksheet.write_number(sheet_row, sheet_col, 1.0)?;
            }
        }
    }

    workbook.save_to_buffer()
}

fn persist_atomically(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let io_error = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = NamedTempFile::new_in(&parent).map_err(io_error)?;
    tmp.write_all(bytes).map_err(io_error)?;
    tmp.flush().map_err(io_error)?;
    tmp.as_file().sync_all().map_err(io_error)?;
    tmp.persist(path).map_err(|err| io_error(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sample() -> ExpandedTable {
        let mut table = ExpandedTable::new("time", vec!["23".into(), "30".into(), "37".into()]);
        table.push_events("3", 0, 2);
        table.push_events("3", 1, 1);
        table.push_events("4", 2, 1);
        table
    }

    #[test]
    fn csv_has_index_column_and_blank_cells() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("out.csv");
        write_table(&path, &sample(), OutputFormat::Csv).expect("written");

        let written = fs::read_to_string(&path).expect("output read");
        assert_eq!(
            written,
            ",time,23,30,37\n0,3,1,,\n1,3,1,,\n2,3,,1,\n3,4,,,1\n"
        );
    }

    #[test]
    fn tsv_uses_tabs() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("out.tsv");
        write_table(&path, &sample(), OutputFormat::Tsv).expect("written");

        let written = fs::read_to_string(&path).expect("output read");
        assert!(written.starts_with("\ttime\t23\t30\t37\n0\t3\t1\t\t\n"));
    }

    #[test]
    fn empty_table_writes_header_only() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("out.csv");
        let table = ExpandedTable::new("time", vec!["23".into()]);
        write_table(&path, &table, OutputFormat::Csv).expect("written");
        assert_eq!(fs::read_to_string(&path).unwrap(), ",time,23\n");
    }

    #[test]
    fn unwritable_destination_leaves_nothing_behind() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("missing").join("out.csv");
        let err = write_table(&path, &sample(), OutputFormat::Csv).unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn formats_follow_extensions() {
        assert_eq!(
            OutputFormat::from_path(Path::new("a.XLSX")),
            Some(OutputFormat::Xlsx)
        );
        assert_eq!(OutputFormat::from_path(Path::new("a.txt")), None);
        assert_eq!(OutputFormat::from_path(Path::new("a")), None);
    }
}
