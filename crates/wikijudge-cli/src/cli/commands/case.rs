use anyhow::Context;

use wikijudge_core::model::{new_case_id, validate_case_id, CaseVars};
use wikijudge_core::PipelineError;

use super::super::args::CaseArgs;
use super::runtime::{case_runner, ctrl_c_signal, pipeline_config};
use crate::exit_codes::{INTERRUPTED, SUCCESS};

pub async fn run(args: CaseArgs) -> anyhow::Result<i32> {
    let cfg = pipeline_config(&args.judge)?;
    let runner = case_runner(&cfg)?;

    let mut vars = CaseVars::new(&args.source, &args.wiki);
    if let Some(lang) = &args.language {
        vars = vars.with_language(lang.as_str());
    }
    let case_id = args.id.clone().unwrap_or_else(|| {
        let stem = args
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        new_case_id(&stem)
    });
    validate_case_id(&case_id)?;
    let out_dir = args.output.join(&case_id);

    match runner.run(&case_id, &vars, &out_dir, &ctrl_c_signal()).await {
        Ok(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            eprintln!(
                "Case {}: Final Score = {} Result = {} ({})",
                case_id, record.final_score, record.result, record.engineering_action.level
            );
            Ok(SUCCESS)
        }
        Err(PipelineError::Cancelled) => {
            eprintln!("case {case_id} interrupted");
            Ok(INTERRUPTED)
        }
        Err(e) => Err(e).with_context(|| format!("case {case_id} failed")),
    }
}
