use super::args::*;

pub mod anchors;
pub mod case;
pub mod plan;
pub mod report;
pub mod run;
pub(crate) mod runtime;
pub mod score;

use crate::exit_codes::SUCCESS;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::run(args).await,
        Command::Case(args) => case::run(args).await,
        Command::Anchors(args) => anchors::run(args),
        Command::Score(args) => score::run(args),
        Command::Plan(args) => plan::run(args).await,
        Command::Report(args) => report::run(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
