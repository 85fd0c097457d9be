use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::Method,
    response::Html,
    routing::{get, post},
    Router,
};
use axum_extra::extract::Form;
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    error::AppError,
    render,
    services::{
        chart::{self, ChartKind, ChartRequest},
        ingest, report,
    },
    AppState,
};

pub fn routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/visualize", post(visualize))
        .layer(DefaultBodyLimit::max(state.config.max_file_size))
        .layer(cors)
}

async fn index() -> Html<String> {
    Html(render::index_page())
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Html<String>, AppError> {
    let start = std::time::Instant::now();

    let mut file: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ParseError(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or(AppError::MissingFile)?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::ParseError(e.to_string()))?;
        file = Some((filename, data));
    }

    let (filename, data) = file.ok_or(AppError::MissingFile)?;
    if data.is_empty() {
        return Err(AppError::MissingFile);
    }
    tracing::info!("processing upload {:?}, size: {}KB", filename, data.len() / 1024);

    let table = ingest::load_table(&filename, &data)?;
    let summary = report::summarize(&table)?;
    let dataset = state.store.insert(&filename, &data, table)?;

    tracing::info!(
        "upload {:?} analyzed in {:?}: {} rows, {} columns",
        filename,
        start.elapsed(),
        summary.row_count,
        summary.column_count
    );

    Ok(Html(render::report_page(dataset, &summary)))
}

#[derive(Debug, Deserialize)]
pub struct VisualizeForm {
    dataset: Uuid,
    #[serde(default)]
    column: Vec<String>,
    chart_type: String,
    #[serde(default)]
    x_axis: Option<String>,
    #[serde(default)]
    y_axis: Option<String>,
}

async fn visualize(
    State(state): State<Arc<AppState>>,
    Form(form): Form<VisualizeForm>,
) -> Result<Html<String>, AppError> {
    let start = std::time::Instant::now();

    let table = state.store.get(form.dataset)?;
    let kind = ChartKind::parse(&form.chart_type)?;
    let request = ChartRequest {
        columns: form.column.into_iter().filter(|c| !c.is_empty()).collect(),
        kind,
        x_axis: form.x_axis,
        y_axis: form.y_axis,
    };

    let specs = chart::build_charts(&table, &request)?;
    tracing::info!(
        "built {} chart(s) for dataset {} in {:?}",
        specs.len(),
        form.dataset,
        start.elapsed()
    );

    Ok(Html(render::charts_page(&specs)))
}
