use clap::Parser;

use wikijudge_cli::cli::args::Cli;
use wikijudge_cli::cli::commands::dispatch;
use wikijudge_cli::exit_codes::CONFIG_ERROR;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    wikijudge_cli::logging::init();
    let cli = Cli::parse();
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            CONFIG_ERROR
        }
    };
    std::process::exit(code);
}
