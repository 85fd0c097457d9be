use crate::error::AppError;
use crate::services::table::Table;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use polars::prelude::*;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

/// Loads an uploaded file into a [`Table`], dispatching on the file extension.
pub fn load_table(filename: &str, data: &[u8]) -> Result<Table, AppError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" | "txt" => read_csv_bytes(data),
        "xlsx" | "xlsm" => read_xlsx_bytes(data),
        other => Err(AppError::UnsupportedFormat(if other.is_empty() {
            filename.to_string()
        } else {
            other.to_string()
        })),
    }
}

/// Tolerant text decoding: strip a UTF-8 BOM, replace invalid sequences.
/// Uploads with odd encodings degrade to replacement characters instead of
/// failing the whole request.
fn decode_text(data: &[u8]) -> String {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    String::from_utf8_lossy(data).into_owned()
}

pub fn read_csv_bytes(data: &[u8]) -> Result<Table, AppError> {
    let text = decode_text(data);
    let cursor = Cursor::new(text.into_bytes());
    let df = CsvReader::new(cursor)
        .has_header(true)
        .with_ignore_errors(true)
        .finish()
        .map_err(|e| AppError::ParseError(e.to_string()))?;
    Table::new(df)
}

pub fn read_csv_path(path: &Path) -> Result<Table, AppError> {
    let df = CsvReader::from_path(path)
        .map_err(|e| AppError::ParseError(e.to_string()))?
        .has_header(true)
        .with_ignore_errors(true)
        .finish()
        .map_err(|e| AppError::ParseError(e.to_string()))?;
    Table::new(df)
}

/// Reads the first worksheet of an XLSX workbook. The first row is the header
/// row; later rows become columns typed numeric only when every non-empty
/// cell is numeric.
pub fn read_xlsx_bytes(data: &[u8]) -> Result<Table, AppError> {
    let cursor = Cursor::new(data.to_vec());
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
        .map_err(|e| AppError::ParseError(format!("Failed to open workbook: {}", e)))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let Some(sheet_name) = sheet_names.first() else {
        return Err(AppError::ParseError(
            "No sheets found in workbook".to_string(),
        ));
    };

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| AppError::ParseError(format!("Failed to read worksheet: {}", e)))?;
    let rows: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();
    if rows.len() < 2 {
        return Err(AppError::EmptyTable);
    }

    let mut seen = HashSet::new();
    let headers: Vec<String> = rows[0]
        .iter()
        .enumerate()
        .map(|(idx, cell)| normalize_header(&cell.to_string(), idx, &mut seen))
        .collect();

    let mut columns = Vec::with_capacity(headers.len());
    for (col_idx, header) in headers.iter().enumerate() {
        let values: Vec<Data> = rows
            .iter()
            .skip(1)
            .map(|row| row.get(col_idx).cloned().unwrap_or(Data::Empty))
            .collect();
        columns.push(build_series(header, &values));
    }

    let df = DataFrame::new(columns)
        .map_err(|e| AppError::ParseError(format!("Failed to build table: {}", e)))?;
    Table::new(df)
}

/// Header cells may be blank or repeated in real spreadsheets; blanks get a
/// positional name and repeats get a numeric suffix.
fn normalize_header(raw: &str, index: usize, seen: &mut HashSet<String>) -> String {
    let base = raw.trim();
    let base = if base.is_empty() {
        format!("column_{}", index + 1)
    } else {
        base.to_string()
    };

    let mut name = base.clone();
    let mut counter = 1;
    while !seen.insert(name.clone()) {
        name = format!("{}_{}", base, counter);
        counter += 1;
    }
    name
}

fn build_series(name: &str, values: &[Data]) -> Series {
    let all_numeric = values
        .iter()
        .filter(|v| !matches!(v, Data::Empty))
        .all(|v| matches!(v, Data::Float(_) | Data::Int(_)));
    let has_any = values.iter().any(|v| !matches!(v, Data::Empty));

    if all_numeric && has_any {
        let nums: Vec<Option<f64>> = values
            .iter()
            .map(|v| match v {
                Data::Float(f) => Some(*f),
                Data::Int(i) => Some(*i as f64),
                _ => None,
            })
            .collect();
        Series::new(name, nums)
    } else {
        let strings: Vec<Option<String>> = values
            .iter()
            .map(|v| match v {
                Data::Empty => None,
                other => {
                    let text = other.to_string();
                    if text.is_empty() {
                        None
                    } else {
                        Some(text)
                    }
                }
            })
            .collect();
        Series::new(name, strings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::table::ColumnKind;

    #[test]
    fn reads_csv_and_infers_column_types() {
        let table = read_csv_bytes(b"A,B\n1,x\n2,\n").unwrap();
        assert_eq!(table.height(), 2);
        assert_eq!(table.column_names(), vec!["A", "B"]);
        assert_eq!(table.kind("A").unwrap(), ColumnKind::Numeric);
        assert_eq!(table.kind("B").unwrap(), ColumnKind::Text);
        assert_eq!(table.missing_count("B").unwrap(), 1);
    }

    #[test]
    fn strips_utf8_bom() {
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice(b"A\n1\n");
        let table = read_csv_bytes(&data).unwrap();
        assert_eq!(table.column_names(), vec!["A"]);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_fatal() {
        let table = read_csv_bytes(b"name\ncaf\xe9\n").unwrap();
        assert_eq!(table.height(), 1);
    }

    #[test]
    fn header_only_csv_is_an_empty_table() {
        assert!(matches!(
            read_csv_bytes(b"A,B\n"),
            Err(AppError::EmptyTable)
        ));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        assert!(matches!(
            load_table("data.parquet", b""),
            Err(AppError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            load_table("noextension", b""),
            Err(AppError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn normalizes_blank_and_duplicate_headers() {
        let mut seen = HashSet::new();
        assert_eq!(normalize_header("Name", 0, &mut seen), "Name");
        assert_eq!(normalize_header("Name", 1, &mut seen), "Name_1");
        assert_eq!(normalize_header("  ", 2, &mut seen), "column_3");
    }

    #[test]
    fn numeric_cells_build_a_numeric_series() {
        let series = build_series(
            "n",
            &[Data::Int(1), Data::Float(2.5), Data::Empty],
        );
        assert_eq!(series.dtype(), &DataType::Float64);
        assert_eq!(series.null_count(), 1);
    }

    #[test]
    fn mixed_cells_build_a_text_series() {
        let series = build_series("m", &[Data::Int(1), Data::String("x".to_string())]);
        assert_eq!(series.dtype(), &DataType::String);
    }
}
