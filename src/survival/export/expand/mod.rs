use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::survival::export::config::ExportConfig;
use crate::survival::export::error::ExpansionError;
use crate::survival::export::model::{CellValue, ExpandedTable, Table};

/// Upper bound on output rows: the data rows that fit in one worksheet below
/// its header.
pub const MAX_EVENT_ROWS: usize = 1_048_575;

/// Expands per-day event counts into one row per subject.
///
/// `tables` holds one filtered table per configured condition, in the same
/// order as `config.conditions`. Day columns are taken from the first table in
/// source order; for every day the rows of the first condition come first,
/// then the second, and so on.
#[instrument(level = "debug", skip_all, fields(conditions = tables.len()))]
pub fn expand(tables: &[Table], config: &ExportConfig) -> Result<ExpandedTable, ExpansionError> {
    let first = tables.first().ok_or(ExpansionError::NoConditions)?;
    if tables.len() != config.conditions.len() {
        return Err(ExpansionError::ConditionCountMismatch {
            expected: config.conditions.len(),
            actual: tables.len(),
        });
    }

    let labels = config.condition_labels();
    let mut expanded = ExpandedTable::new(config.time_header.clone(), labels.clone());

    let day_columns: Vec<&String> = first
        .columns
        .iter()
        .filter(|name| config.is_day_column(name))
        .collect();

    let mut seen = HashSet::new();
    if let Some(duplicate) = day_columns.iter().find(|day| !seen.insert(**day)) {
        return Err(ExpansionError::DuplicateDayColumn {
            column: duplicate.to_string(),
        });
    }

    let mut emitted = 0;
    for day in day_columns {
        let time = config.time_label.apply(day, &config.day_prefix);
        for (condition, (table, label)) in tables.iter().zip(&labels).enumerate() {
            let count = day_total(table, day, label)?;
            emitted += count;
            if emitted > MAX_EVENT_ROWS {
                return Err(ExpansionError::TooManyEvents {
                    column: day.clone(),
                    limit: MAX_EVENT_ROWS,
                });
            }
            debug!(day = %day, condition = %label, count, "expanding day total");
            expanded.push_events(&time, condition, count);
        }
    }

    Ok(expanded)
}

/// Sums a day column, skipping blank cells, and truncates to a whole count.
fn day_total(table: &Table, column: &str, condition: &str) -> Result<usize, ExpansionError> {
    let cells = table
        .column(column)
        .ok_or_else(|| ExpansionError::MissingDayColumn {
            column: column.to_string(),
            condition: condition.to_string(),
        })?;

    let mut total = 0.0;
    for cell in cells {
        if cell.is_empty() {
            continue;
        }
        total += cell
            .as_number()
            .ok_or_else(|| ExpansionError::NonNumeric {
                column: column.to_string(),
                condition: condition.to_string(),
                value: cell.as_text(),
            })?;
    }

    if !total.is_finite() || total < 0.0 {
        return Err(ExpansionError::InvalidCount {
            column: column.to_string(),
            condition: condition.to_string(),
            total,
        });
    }
    if total > MAX_EVENT_ROWS as f64 {
        return Err(ExpansionError::TooManyEvents {
            column: column.to_string(),
            limit: MAX_EVENT_ROWS,
        });
    }

    Ok(total.trunc() as usize)
}
