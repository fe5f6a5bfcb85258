use clap::Parser;

use wikijudge_cli::cli::args::MultiCasesCli;
use wikijudge_cli::cli::commands::run::run_multi_cases;
use wikijudge_cli::exit_codes::CONFIG_ERROR;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    wikijudge_cli::logging::init();
    let cli = MultiCasesCli::parse();
    let code = match run_multi_cases(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            CONFIG_ERROR
        }
    };
    std::process::exit(code);
}
