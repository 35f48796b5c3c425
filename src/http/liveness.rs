use axum::Json;
use serde::Serialize;

use crate::config::APP_VERSION;

#[derive(Debug, Serialize)]
pub struct LivenessBody {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /` liveness message (spec §6). Supplemented from the teacher's
/// health-endpoint convention into a small JSON payload rather than
/// bare text.
pub async fn check() -> Json<LivenessBody> {
    Json(LivenessBody {
        status: "ok",
        version: APP_VERSION,
    })
}
