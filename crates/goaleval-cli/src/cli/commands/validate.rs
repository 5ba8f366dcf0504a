use super::super::args::ValidateArgs;
use goaleval_core::{filter, model};

/// Load + validate + filter without touching the network. Useful as a CI
/// pre-flight before pointing the harness at a live environment.
pub(crate) fn validate(args: ValidateArgs) -> anyhow::Result<i32> {
    let cases = model::load_eval_data(&args.eval_data)?;
    let total = cases.len();
    let selected = filter::filter_by_tags(cases, &args.tags);
    if selected.is_empty() {
        anyhow::bail!("config error: tag filter {:?} selected no test cases", args.tags);
    }
    eprintln!(
        "{} of {} test case(s) selected; eval data is valid",
        selected.len(),
        total
    );
    Ok(0)
}
