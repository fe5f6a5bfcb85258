use anyhow::Context;

use wikijudge_core::anchors::{extract_anchors, AnchorReport};
use wikijudge_core::fsio::write_json_atomic;
use wikijudge_core::model::Language;

use super::super::args::AnchorsArgs;
use super::runtime::load_config;
use crate::exit_codes::SUCCESS;

pub fn run(args: AnchorsArgs) -> anyhow::Result<i32> {
    let cfg = load_config(args.config.as_deref())?;
    let language = match &args.language {
        Some(lang) => lang.parse::<Language>()?,
        None => Language::from_extension(&args.source),
    };
    let bytes = std::fs::read(&args.source)
        .with_context(|| format!("failed to read {}", args.source.display()))?;
    let source = String::from_utf8_lossy(&bytes);

    let report = AnchorReport::new(language, extract_anchors(&source, language, &cfg.anchors));
    match &args.output {
        Some(path) => {
            write_json_atomic(path, &report)?;
            eprintln!("anchors written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(SUCCESS)
}
