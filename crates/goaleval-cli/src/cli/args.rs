use clap::{Parser, Subcommand};
use goaleval_core::EndpointType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "goaleval",
    version,
    about = "Goal-based evaluation harness for conversational agents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the selected test cases against the agent endpoint
    Run(RunArgs),
    /// Load, validate and filter the eval data without any network calls
    Validate(ValidateArgs),
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    /// Path to the evaluation data YAML file
    #[arg(long, default_value = "eval_data.yaml")]
    pub eval_data: PathBuf,

    /// Agent endpoint URL
    #[arg(long, default_value = "http://localhost:8090")]
    pub agent_endpoint: String,

    /// Endpoint type to use for agent queries: streaming|query
    #[arg(long, default_value = "streaming")]
    pub endpoint_type: EndpointType,

    #[arg(long, default_value = "gemini")]
    pub agent_provider: String,

    #[arg(long, default_value = "gemini/gemini-2.5-flash")]
    pub agent_model: String,

    /// Judge provider for LLM evaluation
    #[arg(long, default_value = "gemini")]
    pub judge_provider: String,

    /// Judge model for LLM evaluation
    #[arg(long, default_value = "gemini-2.5-flash")]
    pub judge_model: String,

    /// Path to the agent auth token file (bearer credential)
    #[arg(long, default_value = "ocm_token.txt")]
    pub auth_token_file: PathBuf,

    /// Directory for evaluation result artifacts
    #[arg(long, default_value = "eval_output")]
    pub result_dir: PathBuf,

    /// Select only test cases carrying one of these tags (repeatable);
    /// absent runs everything
    #[arg(long)]
    pub tags: Vec<String>,

    /// Per-request timeout for agent and judge calls
    #[arg(long, default_value_t = 300)]
    pub request_timeout_seconds: u64,

    /// Timeout for verification scripts
    #[arg(long, default_value_t = 300)]
    pub script_timeout_seconds: u64,

    /// Overall run deadline; incomplete cases are reported as ERROR
    #[arg(long)]
    pub run_deadline_seconds: Option<u64>,
}

#[derive(Parser, Clone)]
pub struct ValidateArgs {
    /// Path to the evaluation data YAML file
    #[arg(long, default_value = "eval_data.yaml")]
    pub eval_data: PathBuf,

    /// Tag filter to preview (repeatable)
    #[arg(long)]
    pub tags: Vec<String>,
}
