use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

/// One variant per failure class so callers can match on the kind instead of
/// inspecting message strings.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("No column selected")]
    MissingSelection,
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Error reading file: {0}")]
    ParseError(String),
    #[error("Uploaded file has no data")]
    EmptyTable,
    #[error("Invalid column: {0}")]
    InvalidColumn(String),
    #[error("Invalid axis column: {0}")]
    InvalidAxis(String),
    #[error("Unknown chart type: {0}")]
    UnknownChartKind(String),
    #[error("Column is not numeric: {0}")]
    NonNumeric(String),
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<polars::error::PolarsError> for AppError {
    fn from(err: polars::error::PolarsError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MissingFile
            | AppError::MissingSelection
            | AppError::UnsupportedFormat(_)
            | AppError::ParseError(_)
            | AppError::EmptyTable
            | AppError::InvalidColumn(_)
            | AppError::InvalidAxis(_)
            | AppError::UnknownChartKind(_)
            | AppError::NonNumeric(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownDataset(_) => StatusCode::NOT_FOUND,
            AppError::Io(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Html(crate::render::error_page(&self.to_string()));

        (status, body).into_response()
    }
}
