//! Set-level grading.
//!
//! Two things live here:
//! - [`apft_points`]: converts a set's counted repetitions into 0-100 test
//!   points using the Army Physical Fitness Test tables (17-21 age group).
//! - [`SetReport`]: what happened to every repetition attempt in a set.
//!   Counted reps keep their form score. Rejected attempts (partial range,
//!   too fast) are tallied separately, and every finished attempt adds its
//!   distinct form issues to a per-issue histogram.
//!
//! Both are pure: the analyzers feed the report, sessions copy it into the
//! summary, and nothing here reads frames.

use serde::{Deserialize, Serialize};

use crate::types::{ExerciseType, FormIssue};

// ============================================================================
// APFT TABLES
// ============================================================================

/// Push-up points, indexed by repetitions (0..=68).
const PUSHUP_POINTS: [u8; 69] = [
    0, 1, 3, 4, 6, 7, 9, 10, 12, 13, // 0-9
    15, 16, 18, 19, 21, 22, 24, 25, 26, 28, // 10-19
    29, 31, 32, 34, 35, 37, 38, 40, 41, 43, // 20-29
    44, 46, 47, 48, 50, 51, 53, 54, 56, 57, // 30-39
    59, 60, 62, 63, 65, 66, 68, 69, 71, 72, // 40-49
    74, 75, 76, 78, 79, 81, 82, 84, 85, 87, // 50-59
    88, 90, 91, 93, 94, 96, 97, 99, 100, // 60-68
];

/// Sit-up points, indexed by repetitions (0..=78).
const SITUP_POINTS: [u8; 79] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, // 0-9
    10, 11, 12, 13, 14, 15, 16, 17, 18, 19, // 10-19
    20, 21, 22, 23, 24, 25, 26, 27, 28, 29, // 20-29
    30, 31, 32, 33, 34, 35, 36, 37, 38, 39, // 30-39
    40, 41, 42, 43, 44, 45, 46, 47, 48, 49, // 40-49
    50, 52, 58, 60, 62, 64, 66, 68, 70, 72, // 50-59
    74, 76, 78, 80, 82, 84, 86, 88, 90, 91, // 60-69
    92, 93, 94, 95, 96, 97, 98, 99, 100, // 70-78
];

/// Pull-up points, indexed by repetitions (0..=25).
const PULLUP_POINTS: [u8; 26] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, // 0-9
    40, 44, 48, 52, 56, 60, 64, 68, 72, 76, // 10-19
    80, 84, 88, 92, 96, 100, // 20-25
];

fn points_table(exercise: ExerciseType) -> &'static [u8] {
    match exercise {
        ExerciseType::Pushup => &PUSHUP_POINTS,
        ExerciseType::Pullup => &PULLUP_POINTS,
        ExerciseType::Situp => &SITUP_POINTS,
    }
}

/// Test points for `reps` counted repetitions.
///
/// Counts past the end of a table score the table's maximum.
pub fn apft_points(exercise: ExerciseType, reps: u32) -> u8 {
    let table = points_table(exercise);
    let index = usize::try_from(reps).unwrap_or(usize::MAX).min(table.len() - 1);
    table[index]
}

/// Fewest repetitions that earn 100 points.
pub fn max_scoring_reps(exercise: ExerciseType) -> u32 {
    (points_table(exercise).len() - 1) as u32
}

// ============================================================================
// SET REPORT
// ============================================================================

/// How many finished attempts showed a given issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCount {
    pub issue: FormIssue,
    pub count: u32,
}

/// Outcome of every repetition attempt in a set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetReport {
    /// Form score of each counted repetition, in order.
    pub rep_scores: Vec<u8>,
    /// Attempts that were not counted.
    pub rejected_reps: u32,
    /// Distinct issues per finished attempt, in order of first appearance.
    pub issue_counts: Vec<IssueCount>,
}

impl SetReport {
    pub fn counted_reps(&self) -> u32 {
        self.rep_scores.len() as u32
    }

    /// Counted plus rejected attempts.
    pub fn attempted_reps(&self) -> u32 {
        self.counted_reps() + self.rejected_reps
    }

    /// Share of attempts that were counted, in percent. Zero with no attempts.
    pub fn valid_rep_percentage(&self) -> f32 {
        match self.attempted_reps() {
            0 => 0.0,
            attempted => self.counted_reps() as f32 * 100.0 / attempted as f32,
        }
    }

    /// Mean score of the counted repetitions.
    pub fn average_form_score(&self) -> Option<u8> {
        if self.rep_scores.is_empty() {
            return None;
        }
        let total: u32 = self.rep_scores.iter().map(|&score| u32::from(score)).sum();
        // Average of u8 values always fits in u8.
        Some((total / self.rep_scores.len() as u32) as u8)
    }

    pub fn issue_count(&self, issue: FormIssue) -> u32 {
        self.issue_counts
            .iter()
            .find(|entry| entry.issue == issue)
            .map_or(0, |entry| entry.count)
    }

    pub(crate) fn record_counted(&mut self, score: u8, issues: &[FormIssue]) {
        self.rep_scores.push(score);
        self.tally(issues);
    }

    pub(crate) fn record_rejected(&mut self, issues: &[FormIssue]) {
        self.rejected_reps += 1;
        self.tally(issues);
    }

    pub(crate) fn clear(&mut self) {
        self.rep_scores.clear();
        self.rejected_reps = 0;
        self.issue_counts.clear();
    }

    fn tally(&mut self, issues: &[FormIssue]) {
        for &issue in issues {
            match self.issue_counts.iter_mut().find(|entry| entry.issue == issue) {
                Some(entry) => entry.count += 1,
                None => self.issue_counts.push(IssueCount { issue, count: 1 }),
            }
        }
    }
}
