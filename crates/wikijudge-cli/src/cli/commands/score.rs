use wikijudge_core::fsio::read_json;
use wikijudge_core::scoring;

use super::super::args::ScoreArgs;
use super::runtime::load_config;
use crate::exit_codes::SUCCESS;

pub fn run(args: ScoreArgs) -> anyhow::Result<i32> {
    let cfg = load_config(args.config.as_deref())?;
    let stage2: serde_json::Value = read_json(&args.stage2)?;
    let stage1: Option<serde_json::Value> = args
        .stage1
        .as_deref()
        .map(read_json::<serde_json::Value>)
        .transpose()?;

    let record = scoring::score(&stage2, stage1.as_ref(), &cfg.scoring)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(SUCCESS)
}
