use crate::error::AppError;
use polars::prelude::*;

/// Column type decided once at load time from the series dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
    Other,
}

pub fn column_kind(dtype: &DataType) -> ColumnKind {
    match dtype {
        DataType::String | DataType::Categorical(..) => ColumnKind::Text,
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => ColumnKind::Numeric,
        _ => ColumnKind::Other,
    }
}

/// Immutable tabular dataset backing one upload. Empty-string text cells are
/// treated as missing, matching how blank CSV fields behave.
#[derive(Debug, Clone)]
pub struct Table {
    df: DataFrame,
}

impl Table {
    pub fn new(df: DataFrame) -> Result<Self, AppError> {
        if df.height() == 0 || df.width() == 0 {
            return Err(AppError::EmptyTable);
        }
        Ok(Self { df })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|name| (*name).to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.get_column_names().iter().any(|c| *c == name)
    }

    pub fn kind(&self, name: &str) -> Result<ColumnKind, AppError> {
        Ok(column_kind(self.series(name)?.dtype()))
    }

    fn series(&self, name: &str) -> Result<&Series, AppError> {
        self.df
            .column(name)
            .map_err(|_| AppError::InvalidColumn(name.to_string()))
    }

    /// Every cell of a column rendered as text; nulls and empty strings come
    /// back as `None`.
    pub fn text_values(&self, name: &str) -> Result<Vec<Option<String>>, AppError> {
        let casted = self.series(name)?.cast(&DataType::String)?;
        let ca = casted.str()?;
        Ok(ca
            .into_iter()
            .map(|cell| {
                cell.and_then(|text| {
                    if text.is_empty() {
                        None
                    } else {
                        Some(text.to_string())
                    }
                })
            })
            .collect())
    }

    /// Numeric cells of a numeric column. Fails on text columns rather than
    /// silently coercing.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<Option<f64>>, AppError> {
        let series = self.series(name)?;
        if column_kind(series.dtype()) != ColumnKind::Numeric {
            return Err(AppError::NonNumeric(name.to_string()));
        }
        let casted = series.cast(&DataType::Float64)?;
        Ok(casted.f64()?.into_iter().collect())
    }

    pub fn missing_count(&self, name: &str) -> Result<usize, AppError> {
        let series = self.series(name)?;
        match column_kind(series.dtype()) {
            ColumnKind::Text => {
                let casted = series.cast(&DataType::String)?;
                let ca = casted.str()?;
                let empties = ca.into_iter().filter(|v| matches!(v, Some(""))).count();
                Ok(ca.null_count() + empties)
            }
            _ => Ok(series.null_count()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let df = DataFrame::new(vec![
            Series::new("a", vec![Some(1.0f64), Some(2.0), None]),
            Series::new("b", vec![Some("x"), Some(""), None]),
        ])
        .unwrap();
        Table::new(df).unwrap()
    }

    #[test]
    fn rejects_empty_dataframe() {
        let df = DataFrame::new(vec![Series::new("a", Vec::<Option<f64>>::new())]).unwrap();
        assert!(matches!(Table::new(df), Err(AppError::EmptyTable)));
    }

    #[test]
    fn tags_columns_at_load() {
        let table = sample();
        assert_eq!(table.kind("a").unwrap(), ColumnKind::Numeric);
        assert_eq!(table.kind("b").unwrap(), ColumnKind::Text);
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let table = sample();
        assert_eq!(table.missing_count("a").unwrap(), 1);
        assert_eq!(table.missing_count("b").unwrap(), 2);
        assert_eq!(
            table.text_values("b").unwrap(),
            vec![Some("x".to_string()), None, None]
        );
    }

    #[test]
    fn numeric_access_rejects_text_columns() {
        let table = sample();
        assert!(matches!(
            table.numeric_values("b"),
            Err(AppError::NonNumeric(_))
        ));
        assert!(matches!(
            table.numeric_values("nope"),
            Err(AppError::InvalidColumn(_))
        ));
    }
}
