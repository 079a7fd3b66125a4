//! Landing page reporting the deployment and a masked storage connection.

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResponse {
    pub ok: bool,
    pub env: String,
    pub deployed_at: String,
    pub message: String,
    pub storage_conn_masked: String,
}

/// Landing page handler.
pub async fn index(State(state): State<AppState>) -> Json<IndexResponse> {
    let site = &state.config.site;
    Json(IndexResponse {
        ok: true,
        env: site.env_label.clone(),
        deployed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        message: site.message.clone(),
        storage_conn_masked: site.storage_connection_masked(),
    })
}
