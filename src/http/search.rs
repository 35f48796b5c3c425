use std::path::Path;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::http::error::AppError;
use crate::models::SummaryRow;

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<SummaryRow>,
}

/// `GET /search?query=<s>&limit=<n>` (spec §6, auxiliary search surface):
/// case-insensitive substring match over the union of all SummaryTables
/// on columns `Text|Category|Type|Attributes`.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let rows = load_all_summary_rows(&state.config.summary_dir())?;
    let results = search_rows(&rows, &params.query, limit);

    Ok(Json(SearchResponse {
        query: params.query,
        total_results: results.len(),
        results,
    }))
}

fn load_all_summary_rows(dir: &Path) -> Result<Vec<SummaryRow>, AppError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut rows = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| AppError::Internal(format!("failed to read {}: {e}", path.display())))?;
        for record in reader.deserialize() {
            let row: SummaryRow = record
                .map_err(|e| AppError::Internal(format!("malformed row in {}: {e}", path.display())))?;
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Case-insensitive substring match over `Text|Category|Type|Attributes`.
fn search_rows(rows: &[SummaryRow], query: &str, limit: usize) -> Vec<SummaryRow> {
    let needle = query.to_lowercase();
    rows.iter()
        .filter(|row| {
            row.text.to_lowercase().contains(&needle)
                || row.category.to_lowercase().contains(&needle)
                || row.entity_type.to_lowercase().contains(&needle)
                || row.attributes.to_lowercase().contains(&needle)
        })
        .take(limit)
        .cloned()
        .collect()
}
