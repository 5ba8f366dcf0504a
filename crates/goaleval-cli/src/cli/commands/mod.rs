mod run;
mod validate;

use super::args::{Cli, Command};

/// Route the parsed CLI to its command. Fatal configuration errors bubble up
/// as `Err` and the caller maps them to a nonzero exit.
pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::run(args).await,
        Command::Validate(args) => validate::validate(args),
    }
}
