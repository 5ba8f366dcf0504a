use crate::errors::HarnessError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Discriminator for the evaluation strategy a test case uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvalType {
    #[serde(rename = "substring")]
    Substring,
    #[serde(rename = "judge-llm")]
    JudgeLlm,
    #[serde(rename = "script")]
    Script,
}

impl EvalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalType::Substring => "substring",
            EvalType::JudgeLlm => "judge-llm",
            EvalType::Script => "script",
        }
    }
}

/// One declarative evaluation scenario, loaded from the eval-data document.
///
/// Constructed once at load time and never mutated by the runner. Exactly one
/// of the type-specific fields is populated, consistent with `eval_type`;
/// anything else is rejected by [`load_eval_data`] before the run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub query: String,
    pub eval_type: EvalType,
    /// Required for `substring`: every keyword must appear in the response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected_keywords: Vec<String>,
    /// Required for `judge-llm`: the judge's reference answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_response: Option<String>,
    /// Required for `script`: executable verification command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_script: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl TestCase {
    /// Check the per-type field invariant. Violations are configuration
    /// errors, surfaced at load time rather than mid-run.
    pub fn validate(&self) -> Result<(), HarnessError> {
        match self.eval_type {
            EvalType::Substring => {
                if self.expected_keywords.is_empty() {
                    return Err(HarnessError::config(format!(
                        "test case '{}': eval_type 'substring' requires non-empty expected_keywords",
                        self.id
                    )));
                }
                if self.expected_keywords.iter().any(|k| k.is_empty()) {
                    return Err(HarnessError::config(format!(
                        "test case '{}': expected_keywords must not contain empty strings",
                        self.id
                    )));
                }
            }
            EvalType::JudgeLlm => {
                if self
                    .expected_response
                    .as_deref()
                    .map_or(true, |s| s.trim().is_empty())
                {
                    return Err(HarnessError::config(format!(
                        "test case '{}': eval_type 'judge-llm' requires expected_response",
                        self.id
                    )));
                }
            }
            EvalType::Script => {
                if self
                    .verify_script
                    .as_deref()
                    .map_or(true, |s| s.trim().is_empty())
                {
                    return Err(HarnessError::config(format!(
                        "test case '{}': eval_type 'script' requires verify_script",
                        self.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Human-readable rendering of the expectation this case checks, used in
    /// failure reports.
    pub fn expectation(&self) -> String {
        match self.eval_type {
            EvalType::Substring => format!("contains keywords: {:?}", self.expected_keywords),
            EvalType::JudgeLlm => format!(
                "judged equivalent to: {}",
                self.expected_response.as_deref().unwrap_or("")
            ),
            EvalType::Script => format!(
                "verify script exits 0: {}",
                self.verify_script.as_deref().unwrap_or("")
            ),
        }
    }
}

/// Three-valued outcome. FAIL is a judged mismatch; ERROR is an
/// infrastructure/process failure distinct from judged correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalOutcome {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "ERROR")]
    Error,
}

impl EvalOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalOutcome::Pass => "PASS",
            EvalOutcome::Fail => "FAIL",
            EvalOutcome::Error => "ERROR",
        }
    }
}

/// Outcome of running one test case. Created once per case by the runner,
/// immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResult {
    pub eval_id: String,
    pub outcome: EvalOutcome,
    pub eval_type: EvalType,
    pub query: String,
    pub response: String,
    /// The expectation that was checked, captured for reporting.
    pub expected: String,
    /// Strategy explanation for PASS/FAIL ("ok", missing keyword, judge
    /// rationale, script exit status).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Populated only when `outcome == ERROR`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate counts keyed by outcome; always derived from the result list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub pass: usize,
    pub fail: usize,
    pub error: usize,
}

impl RunSummary {
    pub fn from_results(results: &[EvalResult]) -> Self {
        let mut summary = Self::default();
        for r in results {
            match r.outcome {
                EvalOutcome::Pass => summary.pass += 1,
                EvalOutcome::Fail => summary.fail += 1,
                EvalOutcome::Error => summary.error += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.pass + self.fail + self.error
    }

    /// The process-level gate: success iff no FAIL and no ERROR.
    pub fn all_passed(&self) -> bool {
        self.fail == 0 && self.error == 0
    }
}

/// Load the full eval-data document (an ordered sequence of mappings) and
/// validate it wholesale before any filtering or network activity.
pub fn load_eval_data(path: &Path) -> Result<Vec<TestCase>, HarnessError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        HarnessError::config(format!("failed to read eval data {}: {}", path.display(), e))
    })?;
    let cases: Vec<TestCase> = serde_yaml::from_str(&text).map_err(|e| {
        HarnessError::config(format!(
            "failed to parse eval data {}: {}",
            path.display(),
            e
        ))
    })?;
    if cases.is_empty() {
        return Err(HarnessError::config(format!(
            "eval data {} contains no test cases",
            path.display()
        )));
    }
    let mut seen = HashSet::new();
    for case in &cases {
        if !seen.insert(case.id.as_str()) {
            return Err(HarnessError::config(format!(
                "duplicate test case id '{}'",
                case.id
            )));
        }
        case.validate()?;
    }
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_yaml(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        f.write_all(content.as_bytes()).expect("write yaml");
        f
    }

    #[test]
    fn loads_ordered_sequence_of_cases() {
        let f = write_yaml(
            r#"
- id: eval1
  query: "create a cluster"
  eval_type: substring
  expected_keywords: ["cluster", "created"]
  tags: ["smoke"]
- id: eval2
  query: "what is assisted installer?"
  eval_type: judge-llm
  expected_response: "A service that installs clusters."
"#,
        );
        let cases = load_eval_data(f.path()).expect("load");
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].id, "eval1");
        assert_eq!(cases[0].eval_type, EvalType::Substring);
        assert_eq!(cases[1].id, "eval2");
        assert!(cases[1].tags.is_empty());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let f = write_yaml(
            r#"
- id: eval1
  query: "q"
  eval_type: substring
  expected_keywords: ["a"]
- id: eval1
  query: "q2"
  eval_type: substring
  expected_keywords: ["b"]
"#,
        );
        let err = load_eval_data(f.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate test case id 'eval1'"));
        assert!(err.is_fatal());
    }

    #[test]
    fn rejects_missing_type_specific_field() {
        let f = write_yaml(
            r#"
- id: eval1
  query: "q"
  eval_type: judge-llm
"#,
        );
        let err = load_eval_data(f.path()).unwrap_err();
        assert!(err.to_string().contains("requires expected_response"));
    }

    #[test]
    fn rejects_empty_keyword_list_at_load_time() {
        let f = write_yaml(
            r#"
- id: eval1
  query: "q"
  eval_type: substring
  expected_keywords: []
"#,
        );
        let err = load_eval_data(f.path()).unwrap_err();
        assert!(err.to_string().contains("non-empty expected_keywords"));
    }

    #[test]
    fn rejects_empty_document() {
        let f = write_yaml("[]\n");
        let err = load_eval_data(f.path()).unwrap_err();
        assert!(err.to_string().contains("no test cases"));
    }

    #[test]
    fn summary_counts_sum_to_total() {
        let mk = |id: &str, outcome: EvalOutcome| EvalResult {
            eval_id: id.into(),
            outcome,
            eval_type: EvalType::Substring,
            query: "q".into(),
            response: "r".into(),
            expected: "e".into(),
            message: String::new(),
            error: None,
        };
        let results = vec![
            mk("a", EvalOutcome::Pass),
            mk("b", EvalOutcome::Fail),
            mk("c", EvalOutcome::Error),
            mk("d", EvalOutcome::Pass),
        ];
        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.total(), results.len());
        assert_eq!((summary.pass, summary.fail, summary.error), (2, 1, 1));
        assert!(!summary.all_passed());
        assert!(RunSummary { pass: 3, fail: 0, error: 0 }.all_passed());
    }

    #[test]
    fn outcome_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&EvalOutcome::Pass).unwrap(),
            "\"PASS\""
        );
        assert_eq!(
            serde_json::to_string(&EvalOutcome::Error).unwrap(),
            "\"ERROR\""
        );
    }
}
