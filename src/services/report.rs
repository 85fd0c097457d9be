use crate::error::AppError;
use crate::models::{
    CategoryCount, CategoryInsight, ErrorPatternCount, ErrorPatternReport, MissingValueCount,
    MissingValueReport, TableSummary,
};
use crate::services::table::{ColumnKind, Table};
use rayon::prelude::*;
use smallvec::SmallVec;
use std::collections::HashMap;

/// The fixed spreadsheet error vocabulary scanned for in cell text.
pub const ERROR_TOKENS: [&str; 4] = ["#REF!", "#N/A", "#DIV/0!", "#VALUE!"];

/// How many distinct values a category insight keeps per column.
pub const TOP_CATEGORIES: usize = 10;

/// Per-column missing cell counts, nonzero entries only, table column order.
pub fn missing_value_report(table: &Table) -> Result<MissingValueReport, AppError> {
    let mut columns = Vec::new();
    for name in table.column_names() {
        let missing = table.missing_count(&name)?;
        if missing > 0 {
            columns.push(MissingValueCount {
                column: name,
                missing,
            });
        }
    }
    Ok(MissingValueReport { columns })
}

/// Substring scan of every cell's textual representation against the fixed
/// token vocabulary. Records come out column-major, token-minor; columns are
/// scanned in parallel but collected in table order.
pub fn error_pattern_report(table: &Table) -> Result<ErrorPatternReport, AppError> {
    let names = table.column_names();
    let per_column: Vec<Vec<ErrorPatternCount>> = names
        .par_iter()
        .map(|name| {
            let cells = table.text_values(name)?;
            let mut records = Vec::new();
            for token in ERROR_TOKENS {
                let count = cells
                    .iter()
                    .filter(|cell| cell.as_deref().is_some_and(|text| text.contains(token)))
                    .count();
                if count > 0 {
                    records.push(ErrorPatternCount {
                        token: token.to_string(),
                        column: name.clone(),
                        count,
                    });
                }
            }
            Ok(records)
        })
        .collect::<Result<_, AppError>>()?;

    Ok(ErrorPatternReport {
        records: per_column.into_iter().flatten().collect(),
    })
}

/// Frequency tables for text-typed columns: the ten most frequent distinct
/// values, descending by count, ties broken by first appearance.
pub fn category_insights(table: &Table) -> Result<Vec<CategoryInsight>, AppError> {
    let mut insights = Vec::new();
    for name in table.column_names() {
        if table.kind(&name)? != ColumnKind::Text {
            continue;
        }

        let cells = table.text_values(&name)?;
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let mut non_missing = 0usize;
        for (row, cell) in cells.into_iter().enumerate() {
            let Some(value) = cell else { continue };
            non_missing += 1;
            let entry = counts.entry(value).or_insert((0, row));
            entry.0 += 1;
        }

        let mut ranked: Vec<(String, usize, usize)> = counts
            .into_iter()
            .map(|(value, (count, first_row))| (value, count, first_row))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        let top_values: SmallVec<[CategoryCount; TOP_CATEGORIES]> = ranked
            .into_iter()
            .take(TOP_CATEGORIES)
            .map(|(value, count, _)| CategoryCount { value, count })
            .collect();

        insights.push(CategoryInsight {
            column: name,
            non_missing,
            top_values: top_values.into_vec(),
        });
    }
    Ok(insights)
}

/// The full upload report rendered after POST /upload.
pub fn summarize(table: &Table) -> Result<TableSummary, AppError> {
    Ok(TableSummary {
        row_count: table.height(),
        column_count: table.width(),
        columns: table.column_names(),
        missing_values: missing_value_report(table)?,
        error_patterns: error_pattern_report(table)?,
        category_insights: category_insights(table)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn table(columns: Vec<Series>) -> Table {
        Table::new(DataFrame::new(columns).unwrap()).unwrap()
    }

    #[test]
    fn clean_table_has_no_missing_values() {
        let t = table(vec![
            Series::new("a", vec![1.0f64, 2.0, 3.0]),
            Series::new("b", vec!["x", "y", "z"]),
        ]);
        assert!(missing_value_report(&t).unwrap().columns.is_empty());
    }

    #[test]
    fn missing_counts_preserve_column_order() {
        let t = table(vec![
            Series::new("a", vec![Some(1i64), Some(2), None, None]),
            Series::new("b", vec!["w", "x", "y", "z"]),
            Series::new("c", vec![Some("p"), None, Some(""), Some("q")]),
        ]);
        let report = missing_value_report(&t).unwrap();
        assert_eq!(
            report.columns,
            vec![
                MissingValueCount {
                    column: "a".to_string(),
                    missing: 2
                },
                MissingValueCount {
                    column: "c".to_string(),
                    missing: 2
                },
            ]
        );
    }

    #[test]
    fn upload_round_trip_missing_counts() {
        // Columns [A, B], rows [(1, "x"), (2, None)].
        let t = table(vec![
            Series::new("A", vec![1i64, 2]),
            Series::new("B", vec![Some("x"), None]),
        ]);
        let report = missing_value_report(&t).unwrap();
        assert_eq!(
            report.columns,
            vec![MissingValueCount {
                column: "B".to_string(),
                missing: 1
            }]
        );
    }

    #[test]
    fn single_error_token_yields_single_record() {
        let t = table(vec![
            Series::new("A", vec!["ok", "fine"]),
            Series::new("C", vec!["#N/A", "good"]),
        ]);
        let report = error_pattern_report(&t).unwrap();
        assert_eq!(
            report.records,
            vec![ErrorPatternCount {
                token: "#N/A".to_string(),
                column: "C".to_string(),
                count: 1
            }]
        );
    }

    #[test]
    fn error_records_are_column_major_token_minor() {
        let t = table(vec![
            Series::new("a", vec!["#VALUE!", "#REF!", "#REF!"]),
            Series::new("b", vec!["#DIV/0!", "ok", "ok"]),
        ]);
        let report = error_pattern_report(&t).unwrap();
        let flat: Vec<(&str, &str, usize)> = report
            .records
            .iter()
            .map(|r| (r.token.as_str(), r.column.as_str(), r.count))
            .collect();
        assert_eq!(
            flat,
            vec![
                ("#REF!", "a", 2),
                ("#VALUE!", "a", 1),
                ("#DIV/0!", "b", 1),
            ]
        );
    }

    #[test]
    fn error_scan_matches_substrings() {
        let t = table(vec![Series::new("a", vec!["result: #N/A (stale)"])]);
        let report = error_pattern_report(&t).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].count, 1);
    }

    #[test]
    fn category_insights_cap_at_ten_and_sort_descending() {
        let values: Vec<String> = (0..12)
            .flat_map(|i| {
                // value "v0" appears 13 times, "v1" 12 times, ... "v11" 1 time
                std::iter::repeat(format!("v{}", i)).take(13 - i)
            })
            .collect();
        let t = table(vec![Series::new("cat", values)]);
        let insights = category_insights(&t).unwrap();
        assert_eq!(insights.len(), 1);
        let top = &insights[0].top_values;
        assert_eq!(top.len(), TOP_CATEGORIES);
        assert!(top.windows(2).all(|w| w[0].count >= w[1].count));
        assert_eq!(top[0].value, "v0");
        assert_eq!(top[0].count, 13);
    }

    #[test]
    fn category_ties_break_by_first_appearance() {
        let t = table(vec![Series::new(
            "cat",
            vec!["beta", "alpha", "beta", "alpha", "gamma"],
        )]);
        let insights = category_insights(&t).unwrap();
        let top = &insights[0].top_values;
        assert_eq!(top[0].value, "beta");
        assert_eq!(top[1].value, "alpha");
        assert_eq!(top[2].value, "gamma");
    }

    #[test]
    fn category_insights_skip_numeric_columns_and_missing_cells() {
        let t = table(vec![
            Series::new("n", vec![1.0f64, 2.0, 3.0]),
            Series::new("cat", vec![Some("x"), None, Some("x")]),
        ]);
        let insights = category_insights(&t).unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].column, "cat");
        assert_eq!(insights[0].non_missing, 2);
        assert_eq!(insights[0].top_values.len(), 1);
        assert_eq!(insights[0].top_values[0].count, 2);
    }
}
