use serde::Serialize;

/// Columns with at least one missing cell, in table column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingValueReport {
    pub columns: Vec<MissingValueCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingValueCount {
    pub column: String,
    pub missing: usize,
}

/// Spreadsheet error-token hits, column-major, token-minor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPatternReport {
    pub records: Vec<ErrorPatternCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPatternCount {
    pub token: String,
    pub column: String,
    pub count: usize,
}

/// Top distinct values of one text column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryInsight {
    pub column: String,
    pub non_missing: usize,
    pub top_values: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub missing_values: MissingValueReport,
    pub error_patterns: ErrorPatternReport,
    pub category_insights: Vec<CategoryInsight>,
}
