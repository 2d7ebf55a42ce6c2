use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::survival::export::config::{DEFAULT_OUTPUT_STEM, ExportConfig};
use crate::survival::export::error::Result;
use crate::survival::export::expand::expand;
use crate::survival::export::filter::{RowSelector, split_by_condition};
use crate::survival::export::io::table_read;
use crate::survival::export::io::table_write::{self, OutputFormat};
use crate::survival::export::model::{ExpandedTable, Table};

/// Everything needed for one conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    /// Exact sex value to keep. Blank or `None` keeps every row.
    pub sex: Option<String>,
    /// Worksheet to read; the first one when `None`.
    pub sheet: Option<String>,
}

impl ExportRequest {
    /// Builds a request writing CSV to the default file next to `input`.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let output = resolve_output_path(&input, None, None);
        Self {
            input,
            output,
            format: OutputFormat::Csv,
            sex: None,
            sheet: None,
        }
    }
}

/// Counts reported after a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub output: PathBuf,
    pub source_rows: usize,
    pub condition_labels: Vec<String>,
    /// Source rows kept for each condition after filtering.
    pub kept_rows: Vec<usize>,
    /// Output rows emitted for each condition.
    pub events: Vec<usize>,
}

impl ExportSummary {
    pub fn total_events(&self) -> usize {
        self.events.iter().sum()
    }
}

/// Resolves where the converted file goes.
///
/// Without a request the default file name is used next to the input. A
/// relative path is resolved against the input's directory, not the working
/// directory; an absolute path is used as given. The extension of `format`
/// (`.csv` when unset) is appended when the name has no recognised output
/// extension.
pub fn resolve_output_path(
    input: &Path,
    requested: Option<&Path>,
    format: Option<OutputFormat>,
) -> PathBuf {
    let input_dir = input.parent().unwrap_or_else(|| Path::new(""));
    let extension = format.unwrap_or_default().extension();

    let Some(requested) = requested.filter(|path| !path.as_os_str().is_empty()) else {
        return input_dir.join(format!("{DEFAULT_OUTPUT_STEM}.{extension}"));
    };

    let mut resolved = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        input_dir.join(requested)
    };

    if OutputFormat::from_path(&resolved).is_none() {
        let mut name = resolved.as_os_str().to_os_string();
        name.push(".");
        name.push(extension);
        resolved = PathBuf::from(name);
    }
    resolved
}

/// Filters and expands an in-memory table. Returns the expanded table and the
/// number of source rows kept per condition.
pub fn convert_table(
    table: &Table,
    config: &ExportConfig,
    selector: RowSelector<'_>,
) -> Result<(ExpandedTable, Vec<usize>)> {
    config.validate()?;
    let filtered = split_by_condition(table, config, selector)?;
    let kept = filtered.iter().map(Table::len).collect();
    let expanded = expand(&filtered, config)?;
    Ok((expanded, kept))
}

/// Loads the survival sheet, converts it and writes the long-format file.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %request.input.display(), output = %request.output.display())
)]
pub fn export_survival(request: &ExportRequest, config: &ExportConfig) -> Result<ExportSummary> {
    let table = table_read::read_table(&request.input, request.sheet.as_deref())?;
    info!(rows = table.len(), "read source table");

    let selector = RowSelector::from_input(request.sex.as_deref());
    let (expanded, kept_rows) = convert_table(&table, config, selector)?;
    info!(events = expanded.len(), "expanded day counts");

    table_write::write_table(&request.output, &expanded, request.format)?;

    Ok(ExportSummary {
        output: request.output.clone(),
        source_rows: table.len(),
        events: expanded.counts_per_condition(),
        condition_labels: expanded.condition_labels,
        kept_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_next_to_input() {
        let input = Path::new("/data/assay/survival.xlsx");
        assert_eq!(
            resolve_output_path(input, None, None),
            PathBuf::from("/data/assay/exportedSurvival_forPrism.csv")
        );
        assert_eq!(
            resolve_output_path(input, Some(Path::new("")), None),
            PathBuf::from("/data/assay/exportedSurvival_forPrism.csv")
        );
    }

    #[test]
    fn bare_names_get_csv_extension() {
        let input = Path::new("/data/assay/survival.xlsx");
        assert_eq!(
            resolve_output_path(input, Some(Path::new("males")), None),
            PathBuf::from("/data/assay/males.csv")
        );
        assert_eq!(
            resolve_output_path(input, Some(Path::new("males.xlsx")), None),
            PathBuf::from("/data/assay/males.xlsx")
        );
        assert_eq!(
            resolve_output_path(input, Some(Path::new("/tmp/out/run1.v2")), None),
            PathBuf::from("/tmp/out/run1.v2.csv")
        );
    }

    #[test]
    fn relative_paths_are_anchored_at_the_input_directory() {
        let input = Path::new("/data/assay/survival.xlsx");
        assert_eq!(
            resolve_output_path(input, Some(Path::new("sub/x.csv")), None),
            PathBuf::from("/data/assay/sub/x.csv")
        );
        assert_eq!(
            resolve_output_path(input, Some(Path::new("../shared/males")), None),
            PathBuf::from("/data/assay/../shared/males.csv")
        );
    }

    #[test]
    fn explicit_format_picks_the_appended_extension() {
        let input = Path::new("/data/assay/survival.xlsx");
        assert_eq!(
            resolve_output_path(input, None, Some(OutputFormat::Xlsx)),
            PathBuf::from("/data/assay/exportedSurvival_forPrism.xlsx")
        );
        assert_eq!(
            resolve_output_path(input, Some(Path::new("females")), Some(OutputFormat::Tsv)),
            PathBuf::from("/data/assay/females.tsv")
        );
    }
}
