use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use survival_export::Result;
use survival_export::config::{ExportConfig, TimeLabel};
use survival_export::io::table_write::OutputFormat;
use survival_export::logging;
use survival_export::pipeline::{self, ExportRequest, ExportSummary};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    logging::init(cli.verbose)?;

    let config = cli.resolve_config()?;
    let requested_format = cli.format.map(OutputFormat::from);
    let output =
        pipeline::resolve_output_path(&cli.input, cli.output.as_deref(), requested_format);
    let format = requested_format
        .or_else(|| OutputFormat::from_path(&output))
        .unwrap_or_default();

    println!("will load data from: {}", cli.input.display());
    println!("will save new file to: {}", output.display());

    let request = ExportRequest {
        input: cli.input,
        output,
        format,
        sex: cli.sex,
        sheet: cli.sheet,
    };

    let summary = pipeline::export_survival(&request, &config)?;
    report(&summary);
    Ok(())
}

fn report(summary: &ExportSummary) {
    for ((label, kept), events) in summary
        .condition_labels
        .iter()
        .zip(&summary.kept_rows)
        .zip(&summary.events)
    {
        println!("  {label}: {kept} source rows, {events} events");
    }
    println!(
        "new file saved to {} ({} rows)",
        summary.output.display(),
        summary.total_events()
    );
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Export survival-assay counts in a one-event-per-row layout for plotting."
)]
struct Cli {
    /// Spreadsheet holding the survival counts (xlsx, xls, ods, csv, tsv).
    input: PathBuf,

    /// Output file. A relative path is resolved against the input's
    /// directory; defaults to exportedSurvival_forPrism.csv.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only keep rows whose sex column equals this value exactly.
    #[arg(long)]
    sex: Option<String>,

    /// Worksheet to read instead of the first one.
    #[arg(long)]
    sheet: Option<String>,

    /// Output layout. Inferred from the output extension when omitted.
    #[arg(long, value_enum)]
    format: Option<FormatKind>,

    /// JSON file with conditions and column naming conventions.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Condition levels in output column order, e.g. 23,30,37.
    #[arg(long = "condition", value_delimiter = ',')]
    conditions: Vec<f64>,

    /// How day columns are turned into time values.
    #[arg(long, value_enum)]
    time_label: Option<TimeLabelKind>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatKind {
    Csv,
    Tsv,
    Xlsx,
}

impl From<FormatKind> for OutputFormat {
    fn from(kind: FormatKind) -> Self {
        match kind {
            FormatKind::Csv => OutputFormat::Csv,
            FormatKind::Tsv => OutputFormat::Tsv,
            FormatKind::Xlsx => OutputFormat::Xlsx,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TimeLabelKind {
    LastCharacter,
    DaySuffix,
}

impl From<TimeLabelKind> for TimeLabel {
    fn from(kind: TimeLabelKind) -> Self {
        match kind {
            TimeLabelKind::LastCharacter => TimeLabel::LastCharacter,
            TimeLabelKind::DaySuffix => TimeLabel::DaySuffix,
        }
    }
}

impl Cli {
    fn resolve_config(&self) -> Result<ExportConfig> {
        let mut config = match &self.config {
            Some(path) => ExportConfig::from_json_file(path)?,
            None => ExportConfig::default(),
        };
        if !self.conditions.is_empty() {
            config = config.with_conditions(&self.conditions);
        }
        if let Some(kind) = self.time_label {
            config.time_label = kind.into();
        }
        config.validate()?;
        Ok(config)
    }
}
