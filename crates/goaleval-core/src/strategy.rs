use crate::config::RUN_ID_ENV;
use crate::errors::HarnessError;
use crate::judge::JudgeClient;
use crate::model::{EvalOutcome, EvalType, TestCase};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Strategy decision for one response: PASS/FAIL plus a short explanation.
/// Infrastructure failures are returned as `Err` and become ERROR results at
/// the runner boundary.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub outcome: EvalOutcome,
    pub message: String,
}

impl Evaluation {
    pub fn pass() -> Self {
        Self {
            outcome: EvalOutcome::Pass,
            message: "ok".into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            outcome: EvalOutcome::Fail,
            message: message.into(),
        }
    }
}

/// One evaluation strategy. Dispatch over `eval_type` is a pure mapping held
/// by [`StrategySet`]; a new evaluation type is a new implementor, never an
/// edit to the existing ones.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn evaluate(&self, case: &TestCase, response: &str)
        -> Result<Evaluation, HarnessError>;
}

/// Case-insensitive substring containment: PASS iff every expected keyword is
/// contained in the response after Unicode lowercasing of both sides.
/// Whitespace is significant. Empty keyword lists are rejected at load time,
/// so this strategy never produces ERROR.
pub struct SubstringStrategy;

#[async_trait]
impl Strategy for SubstringStrategy {
    fn name(&self) -> &'static str {
        "substring"
    }

    async fn evaluate(
        &self,
        case: &TestCase,
        response: &str,
    ) -> Result<Evaluation, HarnessError> {
        let haystack = response.to_lowercase();
        let missing: Vec<&str> = case
            .expected_keywords
            .iter()
            .filter(|k| !haystack.contains(&k.to_lowercase()))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(Evaluation::pass())
        } else {
            Ok(Evaluation::fail(format!("missing keywords: {:?}", missing)))
        }
    }
}

/// Asks the judge model whether the response semantically satisfies the
/// reference answer. The judge's binary verdict is PASS/FAIL; failing to
/// obtain a verdict at all propagates as an error (ERROR result), which keeps
/// "the judge disagreed" distinct from "the judge was unreachable".
pub struct JudgeLlmStrategy {
    judge: Arc<dyn JudgeClient>,
}

impl JudgeLlmStrategy {
    pub fn new(judge: Arc<dyn JudgeClient>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl Strategy for JudgeLlmStrategy {
    fn name(&self) -> &'static str {
        "judge-llm"
    }

    async fn evaluate(
        &self,
        case: &TestCase,
        response: &str,
    ) -> Result<Evaluation, HarnessError> {
        let expected = case.expected_response.as_deref().ok_or_else(|| {
            HarnessError::config(format!(
                "test case '{}' reached judge-llm strategy without expected_response",
                case.id
            ))
        })?;
        let verdict = self.judge.verdict(&case.query, response, expected).await?;
        if verdict.passed {
            Ok(Evaluation::pass())
        } else {
            let msg = if verdict.rationale.is_empty() {
                "judge verdict: fail".to_string()
            } else {
                format!("judge verdict: fail ({})", verdict.rationale)
            };
            Ok(Evaluation::fail(msg))
        }
    }
}

/// Runs `verify_script` through `sh -c` with the agent response on stdin, the
/// query in `EVAL_QUERY` and the run id in `EVAL_RUN_ID`. Exit 0 is PASS,
/// non-zero is FAIL; a script that cannot be launched or outlives the timeout
/// is ERROR. `kill_on_drop` reaps timed-out processes so the run never hangs.
pub struct ScriptStrategy {
    timeout: Duration,
    run_id: Option<String>,
}

impl ScriptStrategy {
    pub fn new(timeout: Duration, run_id: Option<String>) -> Self {
        Self { timeout, run_id }
    }
}

#[async_trait]
impl Strategy for ScriptStrategy {
    fn name(&self) -> &'static str {
        "script"
    }

    async fn evaluate(
        &self,
        case: &TestCase,
        response: &str,
    ) -> Result<Evaluation, HarnessError> {
        let script = case.verify_script.as_deref().ok_or_else(|| {
            HarnessError::config(format!(
                "test case '{}' reached script strategy without verify_script",
                case.id
            ))
        })?;

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(script)
            .env("EVAL_QUERY", &case.query)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(run_id) = &self.run_id {
            cmd.env(RUN_ID_ENV, run_id);
        }

        let mut child = cmd.spawn().map_err(|e| {
            HarnessError::script(format!("failed to launch verify script '{}': {}", script, e))
        })?;

        // Feed stdin concurrently with waiting: a script that never reads
        // stdin must not stall the write past the timeout. EPIPE means the
        // script exited without consuming stdin; the exit status alone
        // decides the verdict.
        let stdin = child.stdin.take();
        let feed = async {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(response.as_bytes()).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    Err(e) => {
                        return Err(HarnessError::script(format!(
                            "failed to write response to verify script: {}",
                            e
                        )))
                    }
                }
                // stdin drops here, closing the pipe so line-readers terminate
            }
            Ok(())
        };

        let finished = tokio::time::timeout(self.timeout, async {
            let (fed, waited) = tokio::join!(feed, child.wait_with_output());
            fed?;
            waited.map_err(|e| HarnessError::script(format!("verify script did not finish: {}", e)))
        })
        .await;
        let output = match finished {
            Ok(res) => res?,
            Err(_) => {
                return Err(HarnessError::timeout(format!(
                    "verify script '{}' exceeded {}s",
                    script,
                    self.timeout.as_secs()
                )))
            }
        };

        if output.status.success() {
            Ok(Evaluation::pass())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".into());
            let msg = if stderr.trim().is_empty() {
                format!("verify script exited with status {}", code)
            } else {
                format!(
                    "verify script exited with status {}: {}",
                    code,
                    stderr.trim()
                )
            };
            Ok(Evaluation::fail(msg))
        }
    }
}

/// Closed dispatch table from `eval_type` to strategy.
pub struct StrategySet {
    substring: SubstringStrategy,
    judge: JudgeLlmStrategy,
    script: ScriptStrategy,
}

impl StrategySet {
    pub fn new(
        judge: Arc<dyn JudgeClient>,
        script_timeout: Duration,
        run_id: Option<String>,
    ) -> Self {
        Self {
            substring: SubstringStrategy,
            judge: JudgeLlmStrategy::new(judge),
            script: ScriptStrategy::new(script_timeout, run_id),
        }
    }

    pub fn strategy_for(&self, eval_type: EvalType) -> &dyn Strategy {
        match eval_type {
            EvalType::Substring => &self.substring,
            EvalType::JudgeLlm => &self.judge,
            EvalType::Script => &self.script,
        }
    }
}
