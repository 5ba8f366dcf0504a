use crate::errors::HarnessError;
use crate::model::{EvalType, TestCase};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable carrying the unique run identifier. Required whenever
/// the selected cases include script verification, because those scripts
/// provision and destroy per-run external resources.
pub const RUN_ID_ENV: &str = "EVAL_RUN_ID";

/// Which exchange the agent endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointType {
    /// Single-shot request/response.
    Query,
    /// Incrementally delivered chunks; the client drains fully before
    /// evaluation sees any text.
    Streaming,
}

impl EndpointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointType::Query => "query",
            EndpointType::Streaming => "streaming",
        }
    }
}

impl FromStr for EndpointType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(EndpointType::Query),
            "streaming" => Ok(EndpointType::Streaming),
            other => Err(format!(
                "invalid endpoint type '{}' (expected 'streaming' or 'query')",
                other
            )),
        }
    }
}

impl std::fmt::Display for EndpointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one validated configuration structure for a run. Built once at startup
/// from CLI arguments and the environment, then passed by reference; nothing
/// mutates it afterwards.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub eval_data: PathBuf,
    pub agent_endpoint: String,
    pub endpoint_type: EndpointType,
    pub agent_provider: String,
    pub agent_model: String,
    pub judge_provider: String,
    pub judge_model: String,
    pub auth_token: String,
    pub result_dir: PathBuf,
    pub tags: Vec<String>,
    /// Present when the environment supplied one; scripts see it as
    /// `EVAL_RUN_ID`.
    pub run_id: Option<String>,
    pub request_timeout: Duration,
    pub script_timeout: Duration,
    pub run_deadline: Option<Duration>,
}

/// Read the bearer credential file, trimming surrounding whitespace.
/// Scoped acquisition: the file is read once at startup, never re-opened.
pub fn read_auth_token(path: &Path) -> Result<String, HarnessError> {
    let token = std::fs::read_to_string(path).map_err(|e| {
        HarnessError::config(format!(
            "failed to read auth token file {}: {}",
            path.display(),
            e
        ))
    })?;
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(HarnessError::config(format!(
            "auth token file {} is empty",
            path.display()
        )));
    }
    Ok(token)
}

/// Pre-flight check for the run identifier. Script-verified cases provision
/// external resources keyed by the run id; starting without one would collide
/// across runs, so absence is fatal here, not a later runtime ERROR.
pub fn resolve_run_id(selected: &[TestCase]) -> Result<Option<String>, HarnessError> {
    let run_id = std::env::var(RUN_ID_ENV).ok().filter(|v| !v.is_empty());
    let needs_run_id = selected.iter().any(|c| c.eval_type == EvalType::Script);
    if needs_run_id && run_id.is_none() {
        return Err(HarnessError::config(format!(
            "environment variable {} is required when script-verified test cases are selected",
            RUN_ID_ENV
        )));
    }
    Ok(run_id)
}
