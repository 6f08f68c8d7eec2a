//! Deterministic quality scoring for execution outcomes and the agent's
//! self-assessment formulas.
//!
//! These formulas are contracts: session reports and regression tests compare
//! raw numbers, so the weights must not drift.

use serde::{Deserialize, Serialize};

/// Test results parsed from an execution's stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    /// Whether the output contained any recognizable test reporting at all.
    pub detected: bool,
}

/// Quality thresholds driving fallback decisions and auto-termination.
///
/// These are tuning values, not derived constants; they are surfaced through
/// configuration rather than hardcoded at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityThresholds {
    /// Below this, fallback decisions keep pushing for improvement.
    pub satisfactory: u8,
    /// At or above this, a fallback decision may stop.
    pub stop: u8,
    /// At or above this, the loop self-terminates regardless of the oracle.
    pub auto_stop: u8,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            satisfactory: 70,
            stop: 80,
            auto_stop: 90,
        }
    }
}

/// Score one execution outcome on a 0–100 scale.
///
/// Weights: +30 for a zero exit status, +10 for non-empty stdout, +10 for
/// empty stderr, and when test output was detected +10 flat plus up to +40
/// scaled linearly by the pass rate. `total == 0` with `detected == true`
/// earns only the flat +10.
pub fn quality_score(exit_code: i32, stdout: &str, stderr: &str, tests: &TestSummary) -> u8 {
    let mut score: u32 = 0;

    if exit_code == 0 {
        score += 30;
    }
    if !stdout.trim().is_empty() {
        score += 10;
    }
    if stderr.trim().is_empty() {
        score += 10;
    }
    if tests.detected {
        score += 10;
        if tests.total > 0 {
            let pass_rate = f64::from(tests.passed) / f64::from(tests.total);
            score += (40.0 * pass_rate) as u32;
        }
    }

    score.min(100) as u8
}

/// Satisfaction after a dispatch: +20 for any artifact, +20 for any
/// execution, plus up to 50 from half the best quality score.
pub fn satisfaction_level(has_artifacts: bool, has_executions: bool, best_quality: u8) -> u8 {
    let mut level: u32 = 0;
    if has_artifacts {
        level += 20;
    }
    if has_executions {
        level += 20;
    }
    if best_quality > 0 {
        level += u32::from(best_quality / 2).min(50);
    }
    level.min(100) as u8
}

/// Confidence after a dispatch: +20 for having acted at all, +50 once the
/// best quality clears the satisfactory threshold, +30 while no issues have
/// been identified.
pub fn confidence_level(
    any_calls: bool,
    best_quality: u8,
    satisfactory: u8,
    no_issues: bool,
) -> u8 {
    let mut level: u32 = 0;
    if any_calls {
        level += 20;
    }
    if best_quality >= satisfactory {
        level += 50;
    }
    if no_issues {
        level += 30;
    }
    level.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tests_with(total: u32, passed: u32) -> TestSummary {
        TestSummary {
            total,
            passed,
            failed: total - passed,
            detected: true,
        }
    }

    #[test]
    fn clean_run_with_most_tests_passing_scores_92() {
        let score = quality_score(0, "8 passed, 2 failed\n", "", &tests_with(10, 8));
        assert_eq!(score, 30 + 10 + 10 + 10 + 32);
    }

    #[test]
    fn nonzero_exit_never_earns_execution_points() {
        for exit_code in [1, -1, 42, 127] {
            let score = quality_score(exit_code, "", "boom", &TestSummary::default());
            assert_eq!(score, 0, "exit {exit_code} must not score");
        }
    }

    #[test]
    fn detected_tests_with_zero_total_earn_only_the_flat_bonus() {
        let summary = TestSummary {
            detected: true,
            ..TestSummary::default()
        };
        assert_eq!(quality_score(1, "", "err", &summary), 10);
    }

    #[test]
    fn score_is_clamped_to_100() {
        let score = quality_score(0, "all good", "", &tests_with(5, 5));
        assert_eq!(score, 100);

        // Pathological pass count above total still stays in range.
        let summary = TestSummary {
            total: 1,
            passed: 10,
            failed: 0,
            detected: true,
        };
        assert!(quality_score(0, "out", "", &summary) <= 100);
    }

    #[test]
    fn perfect_run_without_tests_scores_50() {
        assert_eq!(quality_score(0, "out", "", &TestSummary::default()), 50);
    }

    #[test]
    fn satisfaction_combines_progress_and_quality() {
        assert_eq!(satisfaction_level(false, false, 0), 0);
        assert_eq!(satisfaction_level(true, false, 0), 20);
        assert_eq!(satisfaction_level(true, true, 0), 40);
        assert_eq!(satisfaction_level(true, true, 92), 40 + 46);
        // Quality component caps at 50 even for a perfect score.
        assert_eq!(satisfaction_level(true, true, 100), 90);
    }

    #[test]
    fn confidence_rewards_quality_and_clean_history() {
        assert_eq!(confidence_level(false, 0, 70, true), 30);
        assert_eq!(confidence_level(true, 0, 70, true), 50);
        assert_eq!(confidence_level(true, 70, 70, true), 100);
        assert_eq!(confidence_level(true, 92, 70, false), 70);
    }
}
