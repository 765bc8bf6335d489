//! Request/response bodies for the run/health surface (§6, §13).

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub dot: String,
    #[serde(default)]
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub run_id: String,
    #[serde(flatten)]
    pub result: pipedot_engine::RunResult,
}
