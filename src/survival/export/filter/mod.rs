use tracing::{debug, instrument};

use crate::survival::export::config::{Condition, ExportConfig};
use crate::survival::export::error::FilterError;
use crate::survival::export::model::{CellValue, Table};

/// Row selection applied before the per-condition split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowSelector<'a> {
    /// Exact text the sex column must hold. `None` keeps every sex.
    pub sex: Option<&'a str>,
}

impl<'a> RowSelector<'a> {
    /// Builds a selector from user input; blank input disables the sex filter.
    pub fn from_input(sex: Option<&'a str>) -> Self {
        Self {
            sex: sex.filter(|value| !value.trim().is_empty()),
        }
    }
}

/// Selects the rows of one condition level and drops ignored columns.
///
/// A row is kept when its sex matches the selector (or no sex filter is set),
/// it is not flagged in the exclude column (or that column is absent), and its
/// condition cell equals `condition`.
pub fn filter_condition(
    table: &Table,
    config: &ExportConfig,
    condition: &Condition,
    selector: RowSelector<'_>,
) -> Result<Table, FilterError> {
    let condition_index = table
        .column_index(&config.condition_column)
        .ok_or_else(|| FilterError::MissingColumn {
            column: config.condition_column.clone(),
        })?;

    let sex_filter = match selector.sex {
        Some(requested) => {
            let index = table.column_index(&config.sex_column).ok_or_else(|| {
                FilterError::MissingSexColumn {
                    column: config.sex_column.clone(),
                    requested: requested.to_string(),
                }
            })?;
            Some((index, requested))
        }
        None => None,
    };

    let exclude_index = table.column_index(&config.exclude_column);

    let kept: Vec<usize> = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            let sex_matches = sex_filter
                .map(|(index, requested)| row[index].as_text() == requested)
                .unwrap_or(true);
            let not_excluded = exclude_index
                .map(|index| !is_excluded(&row[index]))
                .unwrap_or(true);
            sex_matches && not_excluded && condition.matches(&row[condition_index])
        })
        .map(|(index, _)| index)
        .collect();

    Ok(table
        .take_rows(&kept)
        .select_columns(|name| !config.is_ignored_column(name)))
}

/// Splits the table into one filtered table per configured condition, in
/// configuration order.
#[instrument(level = "debug", skip_all, fields(rows = table.len(), sex = ?selector.sex))]
pub fn split_by_condition(
    table: &Table,
    config: &ExportConfig,
    selector: RowSelector<'_>,
) -> Result<Vec<Table>, FilterError> {
    config
        .conditions
        .iter()
        .map(|condition| {
            let filtered = filter_condition(table, config, condition, selector)?;
            debug!(
                condition = %condition.label(),
                kept = filtered.len(),
                "filtered condition rows"
            );
            Ok(filtered)
        })
        .collect()
}

fn is_excluded(cell: &CellValue) -> bool {
    cell.as_number() == Some(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    fn num(value: f64) -> CellValue {
        CellValue::Number(value)
    }

    fn sample() -> Table {
        Table::new(
            vec![
                "temp".into(),
                "sex".into(),
                "exclude".into(),
                "Day3".into(),
                "eggs laid".into(),
            ],
            vec![
                vec![num(23.0), text("F"), num(0.0), num(2.0), num(40.0)],
                vec![num(23.0), text("M"), num(0.0), num(1.0), num(12.0)],
                vec![num(23.0), text("F"), num(1.0), num(5.0), num(3.0)],
                vec![num(30.0), text("F"), CellValue::Empty, num(4.0), num(8.0)],
                vec![num(37.0), text("F"), num(0.0), num(6.0), num(1.0)],
            ],
        )
    }

    #[test]
    fn drops_ignored_columns_and_excluded_rows() {
        let config = ExportConfig::default();
        let low = filter_condition(
            &sample(),
            &config,
            &config.conditions[0],
            RowSelector::default(),
        )
        .unwrap();

        assert_eq!(low.columns, vec!["temp", "sex", "exclude", "Day3"]);
        assert_eq!(low.len(), 2);
        assert!(low.column("Day3").unwrap().all(|cell| *cell != num(5.0)));
    }

    #[test]
    fn sex_filter_is_exact() {
        let config = ExportConfig::default();
        let tables =
            split_by_condition(&sample(), &config, RowSelector::from_input(Some("F"))).unwrap();
        assert_eq!(
            tables.iter().map(Table::len).collect::<Vec<_>>(),
            vec![1, 1, 1]
        );

        let tables =
            split_by_condition(&sample(), &config, RowSelector::from_input(Some("f"))).unwrap();
        assert!(tables.iter().all(Table::is_empty));
    }

    #[test]
    fn delimited_sex_codes_compare_as_written() {
        let table = Table::new(
            vec!["temp".into(), "sex".into(), "Day3".into()],
            vec![
                vec![text("23"), CellValue::from_text("01"), text("2")],
                vec![text("23"), CellValue::from_text("1"), text("3")],
            ],
        );
        let config = ExportConfig::default();
        let low = filter_condition(
            &table,
            &config,
            &config.conditions[0],
            RowSelector::from_input(Some("01")),
        )
        .unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low.rows[0][2], text("2"));
    }

    #[test]
    fn blank_sex_input_means_no_filter() {
        assert_eq!(RowSelector::from_input(Some("  ")).sex, None);
        assert_eq!(RowSelector::from_input(Some("M")).sex, Some("M"));
    }

    #[test]
    fn missing_exclude_column_keeps_rows() {
        let config = ExportConfig::default();
        let table = sample().select_columns(|name| name != "exclude");
        let low = filter_condition(&table, &config, &config.conditions[0], RowSelector::default())
            .unwrap();
        assert_eq!(low.len(), 3);
    }

    #[test]
    fn sex_filter_without_sex_column_fails() {
        let config = ExportConfig::default();
        let table = sample().select_columns(|name| name != "sex");
        let err = split_by_condition(&table, &config, RowSelector::from_input(Some("F")))
            .unwrap_err();
        assert!(matches!(err, FilterError::MissingSexColumn { .. }));

        // Without a sex filter the column is not needed.
        assert!(split_by_condition(&table, &config, RowSelector::default()).is_ok());
    }

    #[test]
    fn missing_condition_column_fails() {
        let config = ExportConfig::default();
        let table = sample().select_columns(|name| name != "temp");
        let err = split_by_condition(&table, &config, RowSelector::default()).unwrap_err();
        assert!(matches!(err, FilterError::MissingColumn { column } if column == "temp"));
    }
}
