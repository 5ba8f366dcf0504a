use super::super::args::RunArgs;
use goaleval_core::{config, filter, model, report, HarnessConfig, Runner};
use std::time::Duration;

pub(crate) async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let cases = model::load_eval_data(&args.eval_data)?;
    let selected = filter::filter_by_tags(cases, &args.tags);
    if selected.is_empty() {
        anyhow::bail!("config error: tag filter {:?} selected no test cases", args.tags);
    }

    let auth_token = config::read_auth_token(&args.auth_token_file)?;
    let run_id = config::resolve_run_id(&selected)?;

    let cfg = HarnessConfig {
        eval_data: args.eval_data.clone(),
        agent_endpoint: args.agent_endpoint.clone(),
        endpoint_type: args.endpoint_type,
        agent_provider: args.agent_provider.clone(),
        agent_model: args.agent_model.clone(),
        judge_provider: args.judge_provider.clone(),
        judge_model: args.judge_model.clone(),
        auth_token,
        result_dir: args.result_dir.clone(),
        tags: args.tags.clone(),
        run_id,
        request_timeout: Duration::from_secs(args.request_timeout_seconds),
        script_timeout: Duration::from_secs(args.script_timeout_seconds),
        run_deadline: args.run_deadline_seconds.map(Duration::from_secs),
    };

    eprintln!("Running {} test case(s)...", selected.len());
    tracing::info!(
        eval_data = %cfg.eval_data.display(),
        endpoint = %cfg.agent_endpoint,
        endpoint_type = %cfg.endpoint_type,
        model = %cfg.agent_model,
        tags = ?cfg.tags,
        "starting evaluation run"
    );

    let runner = Runner::from_config(&cfg);
    let results = runner.run(&selected).await;

    let summary = report::print_report(&results);
    report::write_artifacts(&cfg.result_dir, &results, &summary)?;

    Ok(report::exit_code(&summary))
}
