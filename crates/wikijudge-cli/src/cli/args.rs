use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use wikijudge_core::config::JudgeKind;
use wikijudge_core::engine::RunMode;

#[derive(Parser)]
#[command(
    name = "wikijudge",
    version,
    about = "Judge generated code wikis against their source"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a batch of cases (all | resume | retry)
    Run(RunArgs),
    /// Judge a single source/wiki pair
    Case(CaseArgs),
    /// Extract anchors from one source file
    Anchors(AnchorsArgs),
    /// Score a stage-2 judgement file
    Score(ScoreArgs),
    /// Run the cases named by a plan file and write a plan report
    Plan(PlanArgs),
    /// Rebuild result tables from the status file without judging
    Report(ReportArgs),
    Version,
}

/// Pipeline config and judge overrides.
#[derive(Args, Clone, Debug, Default)]
pub struct JudgeArgs {
    /// Pipeline config file (defaults to ./wikijudge.yaml when present)
    #[arg(long, env = "WIKIJUDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Judge runner: harness | llm | fixtures
    #[arg(long)]
    pub judge: Option<JudgeKind>,

    /// Directory of canned `<template_id>.json` answers (implies --judge fixtures)
    #[arg(long)]
    pub fixtures: Option<PathBuf>,

    /// Allow the harness/runner cache (the default passes --no-cache)
    #[arg(long)]
    pub cache: bool,
}

#[derive(Args, Clone, Debug)]
pub struct BatchPaths {
    /// Batch config YAML
    #[arg(long, default_value = "cases.yaml")]
    pub cases: PathBuf,

    /// Batch output root
    #[arg(long, default_value = "results_output")]
    pub output: PathBuf,
}

#[derive(Parser, Clone, Debug)]
pub struct RunArgs {
    #[arg(default_value = "resume")]
    pub mode: RunMode,

    #[command(flatten)]
    pub paths: BatchPaths,

    #[command(flatten)]
    pub judge: JudgeArgs,
}

#[derive(Parser, Clone, Debug)]
pub struct CaseArgs {
    #[arg(long)]
    pub source: PathBuf,

    #[arg(long)]
    pub wiki: PathBuf,

    /// java | python | sql (inferred from the extension otherwise)
    #[arg(long)]
    pub language: Option<String>,

    /// Case id; a fresh `<uuid8>_<name>` id is generated when omitted
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long, default_value = "results_output")]
    pub output: PathBuf,

    #[command(flatten)]
    pub judge: JudgeArgs,
}

#[derive(Parser, Clone, Debug)]
pub struct AnchorsArgs {
    #[arg(long)]
    pub source: PathBuf,

    #[arg(long)]
    pub language: Option<String>,

    /// Write anchors.json here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, env = "WIKIJUDGE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
pub struct ScoreArgs {
    /// Parsed stage-2 judgement (stage2.json)
    #[arg(long)]
    pub stage2: PathBuf,

    /// Parsed stage-1 judgement; supplies the coverage rate
    #[arg(long)]
    pub stage1: Option<PathBuf>,

    #[arg(long, env = "WIKIJUDGE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
pub struct PlanArgs {
    #[arg(long)]
    pub plan: PathBuf,

    #[arg(default_value = "resume")]
    pub mode: RunMode,

    #[command(flatten)]
    pub paths: BatchPaths,

    #[command(flatten)]
    pub judge: JudgeArgs,
}

#[derive(Parser, Clone, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub paths: BatchPaths,

    /// Name the YAML file as a retry run
    #[arg(long, default_value = "resume")]
    pub mode: RunMode,
}

/// `run_multi_cases <mode> [--cases] [--output]`
#[derive(Parser, Clone, Debug)]
#[command(name = "run_multi_cases", version, about = "Run a batch of wiki judging cases")]
pub struct MultiCasesCli {
    /// all | resume | retry
    #[arg(default_value = "resume")]
    pub mode: RunMode,

    #[command(flatten)]
    pub paths: BatchPaths,

    #[command(flatten)]
    pub judge: JudgeArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults_to_resume() {
        let cli = Cli::try_parse_from(["wikijudge", "run"]).unwrap();
        let Command::Run(args) = cli.cmd else {
            panic!("expected run");
        };
        assert_eq!(args.mode, RunMode::Resume);
        assert_eq!(args.paths.cases, PathBuf::from("cases.yaml"));
        assert!(!args.judge.cache);
    }

    #[test]
    fn modes_and_judge_kinds_parse() {
        let cli =
            Cli::try_parse_from(["wikijudge", "run", "retry", "--judge", "fixtures"]).unwrap();
        let Command::Run(args) = cli.cmd else {
            panic!("expected run");
        };
        assert_eq!(args.mode, RunMode::Retry);
        assert_eq!(args.judge.judge, Some(JudgeKind::Fixtures));
        assert!(Cli::try_parse_from(["wikijudge", "run", "sometimes"]).is_err());
    }

    #[test]
    fn multi_cases_contract() {
        let cli =
            MultiCasesCli::try_parse_from(["run_multi_cases", "all", "--output", "out"]).unwrap();
        assert_eq!(cli.mode, RunMode::All);
        assert_eq!(cli.paths.output, PathBuf::from("out"));
    }
}
