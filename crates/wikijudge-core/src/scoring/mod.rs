//! Deterministic scorer: stage-2 grades in, numeric score, verdict and
//! engineering-action tier out. No I/O, no defaults for unknown grades.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::ScoringError;

/// Stage-2 dimensions carried into `details` without affecting the score.
const PRESERVED_DIMENSIONS: &[&str] = &[
    "comprehension_support",
    "engineering_usefulness",
    "explanation_reasonableness",
    "abstraction_quality",
    "fabrication_risk",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRules {
    pub usefulness_weight: f64,
    pub coverage_weight: f64,
    /// Applied to the stage-1 coverage rate, or to the coverage level when no counts exist.
    pub coverage_rate_weight: f64,
    pub pass_threshold: f64,
    /// Treat SEVERE hallucination as NONE when stage 1 listed no hallucinations.
    pub downgrade_hallucination_without_evidence: bool,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            usefulness_weight: 40.0,
            coverage_weight: 30.0,
            coverage_rate_weight: 20.0,
            pass_threshold: 60.0,
            downgrade_hallucination_without_evidence: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionLevel {
    PrimaryReference,
    SafeWithCaution,
    StructureOnly,
    ReadOnlyWarning,
    Untrustworthy,
}

impl ActionLevel {
    /// Tier for a score; lower bounds are inclusive.
    pub fn for_score(score: f64) -> Self {
        if score >= 90.0 {
            ActionLevel::PrimaryReference
        } else if score >= 70.0 {
            ActionLevel::SafeWithCaution
        } else if score >= 50.0 {
            ActionLevel::StructureOnly
        } else if score >= 40.0 {
            ActionLevel::ReadOnlyWarning
        } else {
            ActionLevel::Untrustworthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionLevel::PrimaryReference => "PRIMARY_REFERENCE",
            ActionLevel::SafeWithCaution => "SAFE_WITH_CAUTION",
            ActionLevel::StructureOnly => "STRUCTURE_ONLY",
            ActionLevel::ReadOnlyWarning => "READ_ONLY_WARNING",
            ActionLevel::Untrustworthy => "UNTRUSTWORTHY",
        }
    }

    fn texts(&self) -> (&'static str, &'static str) {
        match self {
            ActionLevel::PrimaryReference => (
                "may serve as primary reference",
                "usable directly for reading, debugging and modification",
            ),
            ActionLevel::SafeWithCaution => (
                "usable with noted risks",
                "reconfirm flagged risks before modification",
            ),
            ActionLevel::StructureOnly => (
                "structural understanding only",
                "must cross-check source before modifying",
            ),
            ActionLevel::ReadOnlyWarning => (
                "not for modification guidance",
                "initial familiarization only",
            ),
            ActionLevel::Untrustworthy => (
                "not trustworthy",
                "do not base engineering decisions on it",
            ),
        }
    }
}

impl fmt::Display for ActionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeringAction {
    pub level: ActionLevel,
    pub description: String,
    pub recommended_action: String,
}

impl EngineeringAction {
    pub fn for_score(score: f64) -> Self {
        let level = ActionLevel::for_score(score);
        let (description, recommended_action) = level.texts();
        Self {
            level,
            description: description.to_string(),
            recommended_action: recommended_action.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_rate: Option<f64>,
    pub usefulness_level: String,
    pub coverage_level: String,
    pub correctness_level: String,
    pub hallucination_level: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Contents of `final_score.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalScoreRecord {
    pub final_score: f64,
    pub result: Verdict,
    pub summary: String,
    pub details: ScoreDetails,
    pub engineering_action: EngineeringAction,
}

fn level_points(field: &str, level: &str) -> Result<f64, ScoringError> {
    match level {
        "HIGH" => Ok(1.0),
        "MEDIUM" => Ok(0.6),
        "LOW" => Ok(0.3),
        other => Err(ScoringError::unknown(field, format!("\"{other}\""))),
    }
}

fn correctness_penalty(level: &str) -> Result<f64, ScoringError> {
    match level {
        "GOOD" | "HIGH" => Ok(0.0),
        "MINOR_ISSUES" | "MEDIUM" => Ok(5.0),
        "WRONG" | "BAD" | "LOW" => Ok(20.0),
        other => Err(ScoringError::unknown("correctness_level", format!("\"{other}\""))),
    }
}

fn hallucination_penalty(level: &str) -> Result<f64, ScoringError> {
    match level {
        "NONE" => Ok(0.0),
        "MINOR" => Ok(10.0),
        "SEVERE" => Ok(40.0),
        other => Err(ScoringError::unknown("hallucination_level", format!("\"{other}\""))),
    }
}

/// Read a categorical grade, trimmed and upper-cased. Non-strings are rejected verbatim.
fn grade(stage2: &Value, field: &str) -> Result<String, ScoringError> {
    match stage2.get(field) {
        None | Some(Value::Null) => Err(ScoringError::MissingField(field.to_string())),
        Some(Value::String(s)) => Ok(s.trim().to_ascii_uppercase()),
        Some(other) => Err(ScoringError::unknown(field, other.to_string())),
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `covered_items / total_items` from a stage-1 judgement, when counts are present and total > 0.
pub fn coverage_rate(stage1: &Value) -> Option<f64> {
    let coverage = stage1.get("coverage")?;
    let total = coverage.get("total_items")?.as_f64()?;
    let covered = coverage.get("covered_items")?.as_f64()?;
    if total <= 0.0 {
        return None;
    }
    Some((covered / total).clamp(0.0, 1.0))
}

fn stage1_reports_no_hallucination(stage1: Option<&Value>) -> bool {
    stage1
        .and_then(|s| s.get("hallucination"))
        .and_then(Value::as_array)
        .is_some_and(Vec::is_empty)
}

/// Score a stage-2 judgement. `stage1` supplies the coverage rate and hallucination evidence.
pub fn score(
    stage2: &Value,
    stage1: Option<&Value>,
    rules: &ScoringRules,
) -> Result<FinalScoreRecord, ScoringError> {
    let usefulness_level = grade(stage2, "usefulness_level")?;
    let coverage_level = grade(stage2, "coverage_level")?;
    let correctness_level = grade(stage2, "correctness_level")?;
    let mut hallucination_level = grade(stage2, "hallucination_level")?;

    let usefulness = level_points("usefulness_level", &usefulness_level)?;
    let coverage = level_points("coverage_level", &coverage_level)?;
    let correctness = correctness_penalty(&correctness_level)?;
    // validate before a possible downgrade so garbage never slips through
    hallucination_penalty(&hallucination_level)?;

    if rules.downgrade_hallucination_without_evidence
        && hallucination_level == "SEVERE"
        && stage1_reports_no_hallucination(stage1)
    {
        tracing::debug!("stage 1 listed no hallucinations; SEVERE downgraded to NONE");
        hallucination_level = "NONE".to_string();
    }
    let hallucination = hallucination_penalty(&hallucination_level)?;

    let rate = stage1.and_then(coverage_rate);
    let raw = rules.usefulness_weight * usefulness
        + rules.coverage_weight * coverage
        + rules.coverage_rate_weight * rate.unwrap_or(coverage)
        - correctness
        - hallucination;
    let final_score = round_to(raw.clamp(0.0, 100.0), 2);

    let result = if final_score >= rules.pass_threshold {
        Verdict::Pass
    } else {
        Verdict::Fail
    };

    let summary = ["notes", "summary"]
        .iter()
        .find_map(|k| stage2.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    let extra = PRESERVED_DIMENSIONS
        .iter()
        .filter_map(|k| stage2.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect();

    Ok(FinalScoreRecord {
        final_score,
        result,
        summary,
        details: ScoreDetails {
            coverage_rate: rate.map(|r| round_to(r, 3)),
            usefulness_level,
            coverage_level,
            correctness_level,
            hallucination_level,
            extra,
        },
        engineering_action: EngineeringAction::for_score(final_score),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stage2(u: &str, c: &str, k: &str, h: &str) -> Value {
        json!({
            "usefulness_level": u,
            "coverage_level": c,
            "correctness_level": k,
            "hallucination_level": h,
            "notes": "n",
        })
    }

    fn stage1(covered: u64, total: u64) -> Value {
        json!({
            "coverage": {"total_items": total, "covered_items": covered, "missing": []},
            "hallucination": []
        })
    }

    fn run(stage2: &Value, stage1: Option<&Value>) -> Result<FinalScoreRecord, ScoringError> {
        score(stage2, stage1, &ScoringRules::default())
    }

    #[test]
    fn happy_path_scores_ninety() {
        let rec = run(&stage2("HIGH", "HIGH", "GOOD", "NONE"), Some(&stage1(10, 10))).unwrap();
        assert_eq!(rec.final_score, 90.0);
        assert_eq!(rec.result, Verdict::Pass);
        assert_eq!(rec.engineering_action.level, ActionLevel::PrimaryReference);
        assert_eq!(rec.details.coverage_rate, Some(1.0));
        assert_eq!(rec.summary, "n");
    }

    #[test]
    fn worst_case_clamps_to_zero() {
        let rec = run(&stage2("LOW", "LOW", "WRONG", "SEVERE"), Some(&stage1(0, 7))).unwrap();
        assert_eq!(rec.final_score, 0.0);
        assert_eq!(rec.result, Verdict::Fail);
        assert_eq!(rec.engineering_action.level, ActionLevel::Untrustworthy);
    }

    #[test]
    fn level_stands_in_for_missing_coverage_counts() {
        let rec = run(&stage2("MEDIUM", "MEDIUM", "MINOR_ISSUES", "SEVERE"), None).unwrap();
        assert_eq!(rec.final_score, 9.0);
        assert_eq!(rec.details.coverage_rate, None);

        // zero total counts behaves like no counts
        let rec = run(&stage2("HIGH", "HIGH", "HIGH", "NONE"), Some(&stage1(0, 0))).unwrap();
        assert_eq!(rec.final_score, 90.0);
    }

    #[test]
    fn partial_coverage_rate() {
        let rec = run(&stage2("HIGH", "MEDIUM", "GOOD", "NONE"), Some(&stage1(9, 10))).unwrap();
        assert_eq!(rec.final_score, 76.0);
        assert_eq!(rec.engineering_action.level, ActionLevel::SafeWithCaution);
    }

    #[test]
    fn fractional_rate_is_rounded_only_for_display() {
        let rec = run(&stage2("HIGH", "HIGH", "GOOD", "NONE"), Some(&stage1(2, 3))).unwrap();
        // 40 + 30 + 20 * 2/3
        assert_eq!(rec.final_score, 83.33);
        assert_eq!(rec.details.coverage_rate, Some(0.667));
    }

    #[test]
    fn grades_are_normalised() {
        let rec = run(&stage2(" high", "High ", "bad", "minor"), None).unwrap();
        assert_eq!(rec.details.correctness_level, "BAD");
        // 40 + 30 + 20 - 20 - 10
        assert_eq!(rec.final_score, 60.0);
        assert_eq!(rec.result, Verdict::Pass);
    }

    #[test]
    fn unknown_and_missing_grades_fail() {
        let err = run(&stage2("VERY_HIGH", "HIGH", "GOOD", "NONE"), None).unwrap_err();
        assert_eq!(err, ScoringError::unknown("usefulness_level", "\"VERY_HIGH\""));

        let err = run(&stage2("HIGH", "HIGH", "GOOD", "SOME"), None).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::UnknownValue { ref field, .. } if field == "hallucination_level"
        ));

        let mut v = stage2("HIGH", "HIGH", "GOOD", "NONE");
        v.as_object_mut().unwrap().remove("coverage_level");
        let err = score(&v, None, &ScoringRules::default()).unwrap_err();
        assert_eq!(err, ScoringError::MissingField("coverage_level".into()));

        let mut v = stage2("HIGH", "HIGH", "GOOD", "NONE");
        v["usefulness_level"] = json!(3);
        let err = score(&v, None, &ScoringRules::default()).unwrap_err();
        assert_eq!(err, ScoringError::unknown("usefulness_level", "3"));
    }

    #[test]
    fn severe_downgrade_is_opt_in() {
        let s2 = stage2("HIGH", "HIGH", "GOOD", "SEVERE");
        let s1 = stage1(10, 10);

        let off = score(&s2, Some(&s1), &ScoringRules::default()).unwrap();
        assert_eq!(off.final_score, 50.0);

        let rules = ScoringRules {
            downgrade_hallucination_without_evidence: true,
            ..ScoringRules::default()
        };
        let on = score(&s2, Some(&s1), &rules).unwrap();
        assert_eq!(on.final_score, 90.0);
        assert_eq!(on.details.hallucination_level, "NONE");

        let evidence = json!({
            "coverage": {"total_items": 1, "covered_items": 1},
            "hallucination": [{"content": "x"}]
        });
        let kept = score(&s2, Some(&evidence), &rules).unwrap();
        assert_eq!(kept.final_score, 50.0);
    }

    #[test]
    fn extra_dimensions_are_preserved_and_summary_falls_back() {
        let v = json!({
            "usefulness_level": "HIGH",
            "coverage_level": "HIGH",
            "correctness_level": "GOOD",
            "hallucination_level": "NONE",
            "summary": "fallback",
            "fabrication_risk": "LOW",
            "unrelated": 1,
        });
        let rec = score(&v, None, &ScoringRules::default()).unwrap();
        assert_eq!(rec.summary, "fallback");
        assert_eq!(rec.details.extra.get("fabrication_risk"), Some(&json!("LOW")));
        assert!(!rec.details.extra.contains_key("unrelated"));

        let out = serde_json::to_value(&rec).unwrap();
        assert_eq!(out["details"]["fabrication_risk"], "LOW");
        assert_eq!(out["result"], "PASS");
        assert_eq!(out["engineering_action"]["level"], "PRIMARY_REFERENCE");
    }

    #[test]
    fn tiers_partition_the_range() {
        let cases = [
            (100.0, ActionLevel::PrimaryReference),
            (90.0, ActionLevel::PrimaryReference),
            (89.99, ActionLevel::SafeWithCaution),
            (70.0, ActionLevel::SafeWithCaution),
            (69.5, ActionLevel::StructureOnly),
            (50.0, ActionLevel::StructureOnly),
            (49.0, ActionLevel::ReadOnlyWarning),
            (40.0, ActionLevel::ReadOnlyWarning),
            (39.99, ActionLevel::Untrustworthy),
            (0.0, ActionLevel::Untrustworthy),
        ];
        for (s, expected) in cases {
            assert_eq!(ActionLevel::for_score(s), expected, "{s}");
        }
    }
}
