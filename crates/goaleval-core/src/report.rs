use crate::model::{EvalOutcome, EvalResult, RunSummary};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Print the human-readable report to stderr: one line per case and, for
/// every non-PASS case, the full diagnostic context (query, response,
/// expectation, error). Failure detail is never silently dropped; the
/// summary line and exit code are the only machine-checked contract.
pub fn print_report(results: &[EvalResult]) -> RunSummary {
    eprintln!();
    for r in results {
        match r.outcome {
            EvalOutcome::Pass => {
                eprintln!("✅ {:<20} PASS", r.eval_id);
            }
            EvalOutcome::Fail => {
                eprintln!("❌ {:<20} FAIL ({})", r.eval_id, r.eval_type.as_str());
                print_diagnostics(r);
            }
            EvalOutcome::Error => {
                eprintln!("💥 {:<20} ERROR ({})", r.eval_id, r.eval_type.as_str());
                print_diagnostics(r);
            }
        }
    }

    let summary = RunSummary::from_results(results);
    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!(
        "Summary: {} passed, {} failed, {} error",
        summary.pass, summary.fail, summary.error
    );
    summary
}

fn print_diagnostics(r: &EvalResult) {
    eprintln!("    Query:    {}", r.query);
    if r.response.is_empty() {
        eprintln!("    Response: <none>");
    } else {
        eprintln!("    Response: {}", r.response);
    }
    eprintln!("    Expected: {}", r.expected);
    if !r.message.is_empty() {
        eprintln!("    Reason:   {}", r.message);
    }
    if let Some(err) = &r.error {
        eprintln!("    Error:    {}", err);
    }
}

/// Process exit status: success iff no FAIL and no ERROR. Deterministic for a
/// fixed result set.
pub fn exit_code(summary: &RunSummary) -> i32 {
    if summary.all_passed() {
        0
    } else {
        1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsArtifact {
    pub generated_at: String,
    pub results: Vec<EvalResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryArtifact {
    pub generated_at: String,
    pub pass: usize,
    pub fail: usize,
    pub error: usize,
    pub total: usize,
    pub all_passed: bool,
}

/// Write `results.json` and `summary.json` under the result dir (created if
/// missing). Results keep runner order.
pub fn write_artifacts(
    result_dir: &Path,
    results: &[EvalResult],
    summary: &RunSummary,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(result_dir)?;
    let generated_at = chrono::Utc::now().to_rfc3339();

    let results_doc = ResultsArtifact {
        generated_at: generated_at.clone(),
        results: results.to_vec(),
    };
    std::fs::write(
        result_dir.join("results.json"),
        serde_json::to_string_pretty(&results_doc)?,
    )?;

    let summary_doc = SummaryArtifact {
        generated_at,
        pass: summary.pass,
        fail: summary.fail,
        error: summary.error,
        total: summary.total(),
        all_passed: summary.all_passed(),
    };
    std::fs::write(
        result_dir.join("summary.json"),
        serde_json::to_string_pretty(&summary_doc)?,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EvalType;

    fn result(id: &str, outcome: EvalOutcome) -> EvalResult {
        EvalResult {
            eval_id: id.into(),
            outcome,
            eval_type: EvalType::Substring,
            query: "q".into(),
            response: "r".into(),
            expected: "contains keywords".into(),
            message: String::new(),
            error: if outcome == EvalOutcome::Error {
                Some("boom".into())
            } else {
                None
            },
        }
    }

    #[test]
    fn exit_code_is_zero_iff_no_fail_and_no_error() {
        for fail in 0..3 {
            for error in 0..3 {
                let summary = RunSummary {
                    pass: 2,
                    fail,
                    error,
                };
                let expected = if fail == 0 && error == 0 { 0 } else { 1 };
                assert_eq!(exit_code(&summary), expected);
            }
        }
    }

    #[test]
    fn print_report_returns_derived_summary() {
        let results = vec![
            result("a", EvalOutcome::Pass),
            result("b", EvalOutcome::Fail),
            result("c", EvalOutcome::Error),
        ];
        let summary = print_report(&results);
        assert_eq!((summary.pass, summary.fail, summary.error), (1, 1, 1));
    }

    #[test]
    fn artifacts_round_trip_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![result("a", EvalOutcome::Pass), result("b", EvalOutcome::Error)];
        let summary = RunSummary::from_results(&results);
        write_artifacts(dir.path(), &results, &summary).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("results.json")).unwrap();
        let doc: ResultsArtifact = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc.results.len(), 2);
        assert_eq!(doc.results[0].eval_id, "a");
        assert_eq!(doc.results[1].error.as_deref(), Some("boom"));

        let raw = std::fs::read_to_string(dir.path().join("summary.json")).unwrap();
        let doc: SummaryArtifact = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc.total, 2);
        assert_eq!(doc.pass, 1);
        assert_eq!(doc.error, 1);
        assert!(!doc.all_passed);
    }

    #[test]
    fn result_dir_is_created_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("eval_output/nested");
        write_artifacts(&nested, &[], &RunSummary::default()).unwrap();
        assert!(nested.join("summary.json").exists());
    }
}
