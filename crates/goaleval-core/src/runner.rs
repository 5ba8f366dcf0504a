use crate::client::{AgentClient, HttpAgentClient};
use crate::config::HarnessConfig;
use crate::judge::LlmJudge;
use crate::model::{EvalOutcome, EvalResult, TestCase};
use crate::strategy::StrategySet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Orchestrates one evaluation run: agent call then strategy, case by case,
/// sequentially and in input order. Every per-case failure is converted into
/// an ERROR result at this boundary; nothing below the runner escapes
/// uncaught, and no single case aborts the run.
pub struct Runner {
    client: Arc<dyn AgentClient>,
    strategies: StrategySet,
    run_deadline: Option<Duration>,
}

impl Runner {
    pub fn new(
        client: Arc<dyn AgentClient>,
        strategies: StrategySet,
        run_deadline: Option<Duration>,
    ) -> Self {
        Self {
            client,
            strategies,
            run_deadline,
        }
    }

    /// Wire up the production harness: HTTP agent client plus an LLM judge
    /// routed through the same service with the judge provider/model pair.
    pub fn from_config(cfg: &HarnessConfig) -> Self {
        let agent: Arc<dyn AgentClient> = Arc::new(HttpAgentClient::new(cfg));
        let judge = Arc::new(LlmJudge::new(Arc::new(HttpAgentClient::judge_route(cfg))));
        let strategies = StrategySet::new(judge, cfg.script_timeout, cfg.run_id.clone());
        Self::new(agent, strategies, cfg.run_deadline)
    }

    /// Run all selected cases, producing exactly one result per case in input
    /// order. Reports must reproduce test order for diffability, so nothing
    /// here reorders. When the overall deadline expires, remaining cases are
    /// reported as ERROR instead of hanging the process.
    pub async fn run(&self, cases: &[TestCase]) -> Vec<EvalResult> {
        let started = Instant::now();
        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            let result = match self.run_deadline {
                Some(deadline) => match deadline.checked_sub(started.elapsed()) {
                    Some(remaining) => {
                        match tokio::time::timeout(remaining, self.run_case(case)).await {
                            Ok(r) => r,
                            Err(_) => error_result(case, String::new(), "run deadline exceeded"),
                        }
                    }
                    None => error_result(case, String::new(), "run deadline exceeded"),
                },
                None => self.run_case(case).await,
            };
            tracing::info!(
                id = %result.eval_id,
                outcome = result.outcome.as_str(),
                "test case finished"
            );
            results.push(result);
        }
        results
    }

    async fn run_case(&self, case: &TestCase) -> EvalResult {
        tracing::info!(id = %case.id, eval_type = case.eval_type.as_str(), "running test case");

        // A strategy cannot judge a response that was never obtained:
        // transport failures short-circuit straight to ERROR.
        let response = match self.client.query(&case.query).await {
            Ok(r) => r,
            Err(e) => {
                return error_result(case, String::new(), &format!("agent call failed: {}", e))
            }
        };

        let strategy = self.strategies.strategy_for(case.eval_type);
        match strategy.evaluate(case, &response).await {
            Ok(eval) => EvalResult {
                eval_id: case.id.clone(),
                outcome: eval.outcome,
                eval_type: case.eval_type,
                query: case.query.clone(),
                response,
                expected: case.expectation(),
                message: eval.message,
                error: None,
            },
            Err(e) => error_result(case, response, &e.to_string()),
        }
    }
}

fn error_result(case: &TestCase, response: String, error: &str) -> EvalResult {
    EvalResult {
        eval_id: case.id.clone(),
        outcome: EvalOutcome::Error,
        eval_type: case.eval_type,
        query: case.query.clone(),
        response,
        expected: case.expectation(),
        message: String::new(),
        error: Some(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HarnessError;
    use crate::filter::filter_by_tags;
    use crate::judge::{JudgeClient, JudgeVerdict};
    use crate::model::{load_eval_data, EvalType};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io::Write;

    /// Scripted agent: canned response per query, error for unknown queries.
    struct ScriptedAgent {
        responses: HashMap<String, String>,
    }

    #[async_trait]
    impl AgentClient for ScriptedAgent {
        async fn query(&self, query: &str) -> Result<String, HarnessError> {
            self.responses
                .get(query)
                .cloned()
                .ok_or_else(|| HarnessError::transport("connection refused"))
        }
    }

    struct SlowAgent;

    #[async_trait]
    impl AgentClient for SlowAgent {
        async fn query(&self, _query: &str) -> Result<String, HarnessError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok("late".into())
        }
    }

    struct PassingJudge;

    #[async_trait]
    impl JudgeClient for PassingJudge {
        async fn verdict(
            &self,
            _query: &str,
            _response: &str,
            _expected: &str,
        ) -> Result<JudgeVerdict, HarnessError> {
            Ok(JudgeVerdict {
                passed: true,
                rationale: String::new(),
            })
        }
    }

    fn substring_case(id: &str, query: &str, keywords: &[&str], tags: &[&str]) -> TestCase {
        TestCase {
            id: id.into(),
            query: query.into(),
            eval_type: EvalType::Substring,
            expected_keywords: keywords.iter().map(|k| k.to_string()).collect(),
            expected_response: None,
            verify_script: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn runner_with(agent: Arc<dyn AgentClient>, deadline: Option<Duration>) -> Runner {
        let strategies =
            StrategySet::new(Arc::new(PassingJudge), Duration::from_secs(5), None);
        Runner::new(agent, strategies, deadline)
    }

    #[tokio::test]
    async fn client_error_yields_error_result_and_run_continues() {
        let mut responses = HashMap::new();
        responses.insert("q1".to_string(), "cluster created".to_string());
        responses.insert("q3".to_string(), "cluster created".to_string());
        let runner = runner_with(Arc::new(ScriptedAgent { responses }), None);

        let cases = vec![
            substring_case("a", "q1", &["cluster"], &[]),
            substring_case("b", "q2-unreachable", &["cluster"], &[]),
            substring_case("c", "q3", &["created"], &[]),
        ];
        let results = runner.run(&cases).await;

        assert_eq!(results.len(), 3);
        let ids: Vec<_> = results.iter().map(|r| r.eval_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(results[0].outcome, EvalOutcome::Pass);
        assert_eq!(results[1].outcome, EvalOutcome::Error);
        assert!(results[1].error.as_deref().unwrap().contains("connection refused"));
        assert_eq!(results[2].outcome, EvalOutcome::Pass);
    }

    #[tokio::test]
    async fn judged_mismatch_is_fail_not_error() {
        let mut responses = HashMap::new();
        responses.insert("q1".to_string(), "Your node is ready".to_string());
        let runner = runner_with(Arc::new(ScriptedAgent { responses }), None);

        let cases = vec![substring_case("a", "q1", &["cluster", "created"], &[])];
        let results = runner.run(&cases).await;
        assert_eq!(results[0].outcome, EvalOutcome::Fail);
        assert!(results[0].error.is_none());
        assert!(results[0].message.contains("missing keywords"));
    }

    #[tokio::test]
    async fn deadline_marks_remaining_cases_error() {
        let runner = runner_with(Arc::new(SlowAgent), Some(Duration::from_millis(50)));
        let cases = vec![
            substring_case("a", "q1", &["late"], &[]),
            substring_case("b", "q2", &["late"], &[]),
        ];
        let start = Instant::now();
        let results = runner.run(&cases).await;
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(results.len(), 2);
        for r in &results {
            assert_eq!(r.outcome, EvalOutcome::Error);
            assert!(r.error.as_deref().unwrap().contains("run deadline exceeded"));
        }
    }

    #[tokio::test]
    async fn load_filter_run_round_trip_by_eval_id() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(
            br#"
- id: smoke1
  query: "create a cluster"
  eval_type: substring
  expected_keywords: ["cluster"]
  tags: ["smoke"]
- id: deep1
  query: "explain operators"
  eval_type: substring
  expected_keywords: ["operator"]
  tags: ["deep"]
"#,
        )
        .unwrap();
        let cases = load_eval_data(f.path()).unwrap();
        let selected = filter_by_tags(cases, &["deep".into()]);
        assert_eq!(selected.len(), 1);

        let mut responses = HashMap::new();
        responses.insert(
            "explain operators".to_string(),
            "An operator manages apps".to_string(),
        );
        let runner = runner_with(Arc::new(ScriptedAgent { responses }), None);
        let results = runner.run(&selected).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].eval_id, "deep1");
        assert_eq!(results[0].outcome, EvalOutcome::Pass);
    }
}
