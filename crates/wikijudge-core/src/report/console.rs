use crate::engine::BatchOutcome;

/// Per-case lines and totals on stderr.
pub fn print_batch_summary(outcome: &BatchOutcome) {
    for r in &outcome.results {
        match &r.error {
            Some(err) => eprintln!("Case {}: {} ({})", r.case_id, r.result, first_line(err)),
            None => eprintln!(
                "Case {}: Final Score = {} Result = {}",
                r.case_id, r.final_score, r.result
            ),
        }
    }

    let mut pass = 0;
    let mut fail = 0;
    let mut error = 0;
    let mut pending = 0;
    for r in &outcome.results {
        match r.result.as_str() {
            "PASS" => pass += 1,
            "FAIL" => fail += 1,
            "ERROR" => error += 1,
            _ => pending += 1,
        }
    }
    eprintln!(
        "Results ({}): pass={} fail={} error={} pending={}",
        outcome.mode, pass, fail, error, pending
    );

    let secs = outcome.elapsed.as_secs_f64();
    let executed = outcome.executed.len();
    if executed > 0 {
        eprintln!(
            "Executed {} case(s) in {:.1}s ({:.1}s per case)",
            executed,
            secs,
            secs / executed as f64
        );
    } else {
        eprintln!("Nothing to execute ({:.1}s)", secs);
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
