//! Exercise analyzer contract and the machinery shared by every analyzer.
//!
//! Each exercise owns its own state machine (see `pushup`, `pullup`,
//! `situp`), but they share:
//! - the [`ExerciseAnalyzer`] capability contract,
//! - the [`Analyzer`] closed set used to hold "whichever exercise is active",
//! - a session core with rep counter, debounced state transitions, the
//!   `Invalid` recovery path, the per-rep form-issue accumulator and the
//!   set report (counted scores, rejected attempts, issue histogram),
//! - landmark requirement checks, bilateral angle selection and scoring.
//!
//! # Per-frame flow
//! 1. Not started or finished: return a snapshot, never advance.
//! 2. Visibility gate: on failure enter `Invalid` (remembering where to
//!    resume) and report the weakest required landmark as confidence.
//! 3. Primary angle from the visible side(s). Degenerate geometry holds the
//!    current state for this frame.
//! 4. Exercise-specific classification into `Down` / `Up` / neither, then a
//!    debounced transition. Reps are counted on the exercise's counting
//!    transition only.

use crate::config::EngineConfig;
use crate::geometry;
use crate::grading::SetReport;
use crate::pullup::PullupAnalyzer;
use crate::pushup::PushupAnalyzer;
use crate::situp::SitupAnalyzer;
use crate::types::{AnalysisResult, ExerciseState, ExerciseType, FormIssue, Frame, PoseLandmark};

/// Capability contract implemented by every exercise analyzer.
///
/// Analyzers are single-threaded and synchronous: one `analyze()` call per
/// frame, in capture order. Nothing here ever fails; bad input shows up as
/// `ExerciseState::Invalid`.
pub trait ExerciseAnalyzer {
    /// Which exercise this analyzer tracks.
    fn exercise(&self) -> ExerciseType;

    /// Consumes one frame, advances the state machine and returns a snapshot.
    fn analyze(&mut self, frame: &Frame) -> AnalysisResult;

    /// True when the frame shows enough of the required landmarks to analyze.
    /// Does not touch session state.
    fn is_valid_pose(&self, frame: &Frame) -> bool;

    /// Clears the session and enters `Starting`.
    fn start(&mut self);

    /// Freezes counting and enters `Finished`.
    fn stop(&mut self);

    /// Clears rep count, extremal trackers and form issues; back to `Idle`.
    fn reset(&mut self);

    fn state(&self) -> ExerciseState;

    fn rep_count(&self) -> u32;

    /// Form issues accumulated during the repetition in progress.
    fn form_issues(&self) -> &[FormIssue];

    /// Mean score of the repetitions counted so far.
    fn average_form_score(&self) -> Option<u8>;

    /// Counted scores, rejected attempts and issue tallies for the set.
    fn set_report(&self) -> &SetReport;
}

/// The analyzer for whichever exercise a session tracks.
#[derive(Debug, Clone)]
pub enum Analyzer {
    Pushup(PushupAnalyzer),
    Pullup(PullupAnalyzer),
    Situp(SitupAnalyzer),
}

impl Analyzer {
    /// Builds the analyzer for `exercise` from its section of `config`.
    pub fn new(exercise: ExerciseType, config: &EngineConfig) -> Self {
        match exercise {
            ExerciseType::Pushup => Analyzer::Pushup(PushupAnalyzer::new(config.pushup.clone())),
            ExerciseType::Pullup => Analyzer::Pullup(PullupAnalyzer::new(config.pullup.clone())),
            ExerciseType::Situp => Analyzer::Situp(SitupAnalyzer::new(config.situp.clone())),
        }
    }

    /// Analyzer with default thresholds.
    pub fn for_exercise(exercise: ExerciseType) -> Self {
        Self::new(exercise, &EngineConfig::default())
    }

    fn inner(&self) -> &dyn ExerciseAnalyzer {
        match self {
            Analyzer::Pushup(a) => a,
            Analyzer::Pullup(a) => a,
            Analyzer::Situp(a) => a,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ExerciseAnalyzer {
        match self {
            Analyzer::Pushup(a) => a,
            Analyzer::Pullup(a) => a,
            Analyzer::Situp(a) => a,
        }
    }
}

impl ExerciseAnalyzer for Analyzer {
    fn exercise(&self) -> ExerciseType {
        self.inner().exercise()
    }

    fn analyze(&mut self, frame: &Frame) -> AnalysisResult {
        self.inner_mut().analyze(frame)
    }

    fn is_valid_pose(&self, frame: &Frame) -> bool {
        self.inner().is_valid_pose(frame)
    }

    fn start(&mut self) {
        self.inner_mut().start()
    }

    fn stop(&mut self) {
        self.inner_mut().stop()
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }

    fn state(&self) -> ExerciseState {
        self.inner().state()
    }

    fn rep_count(&self) -> u32 {
        self.inner().rep_count()
    }

    fn form_issues(&self) -> &[FormIssue] {
        self.inner().form_issues()
    }

    fn average_form_score(&self) -> Option<u8> {
        self.inner().average_form_score()
    }

    fn set_report(&self) -> &SetReport {
        self.inner().set_report()
    }
}

// ============================================================================
// SESSION CORE
// ============================================================================

/// Default shortest time between two counted repetitions.
pub const MIN_REP_DURATION_MS: u64 = 500;

/// A confirmed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub from: ExerciseState,
    pub to: ExerciseState,
}

/// Session state shared by all analyzers.
#[derive(Debug, Clone)]
pub(crate) struct SessionCore {
    rep_count: u32,
    state: ExerciseState,
    /// State to return to once an `Invalid` stretch ends.
    resume_state: ExerciseState,
    candidate: Option<ExerciseState>,
    candidate_frames: u32,
    /// Distinct issues seen during the repetition in progress.
    issues: Vec<FormIssue>,
    report: SetReport,
    min_rep_duration_ms: u64,
    last_rep_ms: Option<u64>,
}

impl SessionCore {
    pub fn new(min_rep_duration_ms: u64) -> Self {
        Self {
            rep_count: 0,
            state: ExerciseState::Idle,
            resume_state: ExerciseState::Idle,
            candidate: None,
            candidate_frames: 0,
            issues: Vec::new(),
            report: SetReport::default(),
            min_rep_duration_ms,
            last_rep_ms: None,
        }
    }

    pub fn reset(&mut self) {
        self.rep_count = 0;
        self.state = ExerciseState::Idle;
        self.resume_state = ExerciseState::Idle;
        self.candidate = None;
        self.candidate_frames = 0;
        self.issues.clear();
        self.report.clear();
        self.last_rep_ms = None;
    }

    pub fn start(&mut self) {
        self.reset();
        self.state = ExerciseState::Starting;
        self.resume_state = ExerciseState::Starting;
    }

    pub fn stop(&mut self) {
        self.state = ExerciseState::Finished;
        self.candidate = None;
        self.candidate_frames = 0;
    }

    pub fn state(&self) -> ExerciseState {
        self.state
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn issues(&self) -> &[FormIssue] {
        &self.issues
    }

    pub fn report(&self) -> &SetReport {
        &self.report
    }

    /// Enters `Invalid`, remembering the state to resume afterwards.
    pub fn mark_invalid(&mut self) {
        if self.state != ExerciseState::Invalid {
            log::debug!("{:?} -> Invalid (landmarks not visible)", self.state);
            self.resume_state = self.state;
            self.state = ExerciseState::Invalid;
        }
        self.candidate = None;
        self.candidate_frames = 0;
    }

    /// Leaves `Invalid` for the last valid state. No-op otherwise.
    pub fn restore(&mut self) {
        if self.state == ExerciseState::Invalid {
            log::debug!("Invalid -> {:?} (landmarks visible again)", self.resume_state);
            self.state = self.resume_state;
        }
    }

    /// Offers the position classified on this frame.
    ///
    /// `None` (between thresholds) or the current state keeps the state and
    /// drops any pending candidate. A different state becomes the current one
    /// after it was offered on `stability_frames` consecutive frames.
    pub fn propose(&mut self, position: Option<ExerciseState>, stability_frames: u32) -> Option<Transition> {
        let target = match position {
            Some(target) if target != self.state => target,
            _ => {
                self.candidate = None;
                self.candidate_frames = 0;
                return None;
            }
        };

        if self.candidate == Some(target) {
            self.candidate_frames += 1;
        } else {
            self.candidate = Some(target);
            self.candidate_frames = 1;
        }

        if self.candidate_frames < stability_frames.max(1) {
            return None;
        }

        let transition = Transition {
            from: self.state,
            to: target,
        };
        log::debug!("{:?} -> {:?}", transition.from, transition.to);
        self.state = target;
        self.candidate = None;
        self.candidate_frames = 0;
        Some(transition)
    }

    /// Records an issue for the repetition in progress.
    pub fn note(&mut self, issue: FormIssue) {
        if !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }

    /// Closes the repetition in progress as counted, with its final score.
    ///
    /// A repetition finishing within `min_rep_duration_ms` of the previous
    /// counted one is rejected instead (tallied as `RepTooFast`). Returns
    /// whether the rep was counted. Either way the issue list starts fresh.
    pub fn complete_rep(&mut self, score: u8, timestamp_ms: u64) -> bool {
        let too_fast = self
            .last_rep_ms
            .is_some_and(|last| timestamp_ms.saturating_sub(last) < self.min_rep_duration_ms);
        if too_fast {
            self.note(FormIssue::RepTooFast);
            self.reject_attempt();
            return false;
        }

        self.rep_count += 1;
        self.last_rep_ms = Some(timestamp_ms);
        self.report.record_counted(score, &self.issues);
        self.issues.clear();
        true
    }

    /// Closes the repetition in progress as an attempt that does not count.
    /// Its issues go to the set report and never reach the next rep.
    pub fn reject_attempt(&mut self) {
        self.report.record_rejected(&self.issues);
        self.issues.clear();
    }

    pub fn average_form_score(&self) -> Option<u8> {
        self.report.average_form_score()
    }

    /// Result for frames that do not advance the state machine.
    pub fn snapshot(&self, confidence: f32, form_score: u8) -> AnalysisResult {
        let feedback = match self.state {
            ExerciseState::Finished => Some("Exercise complete".to_string()),
            _ => None,
        };
        AnalysisResult {
            rep_count: self.rep_count,
            feedback,
            state: self.state,
            confidence,
            form_score,
        }
    }

    /// Result for a frame that failed the visibility gate.
    pub fn invalid(&mut self, confidence: f32) -> AnalysisResult {
        self.mark_invalid();
        AnalysisResult {
            rep_count: self.rep_count,
            feedback: None,
            state: ExerciseState::Invalid,
            confidence,
            form_score: 0,
        }
    }

    pub fn result(&self, feedback: Option<String>, confidence: f32, form_score: u8) -> AnalysisResult {
        AnalysisResult {
            rep_count: self.rep_count,
            feedback,
            state: self.state,
            confidence,
            form_score,
        }
    }
}

// ============================================================================
// LANDMARK REQUIREMENTS
// ============================================================================

/// Landmarks an exercise needs, split into unpaired joints and the two sides
/// of the bilateral primary angle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Requirements {
    /// Joints that must be visible regardless of side.
    pub central: &'static [PoseLandmark],
    /// (first, vertex, last) of the primary angle on the left side.
    pub left_angle: [PoseLandmark; 3],
    pub right_angle: [PoseLandmark; 3],
    /// Left-side joints needed beyond the angle chain.
    pub left_extra: &'static [PoseLandmark],
    pub right_extra: &'static [PoseLandmark],
}

impl Requirements {
    fn all(&self) -> impl Iterator<Item = PoseLandmark> + '_ {
        self.central
            .iter()
            .chain(self.left_angle.iter())
            .chain(self.left_extra.iter())
            .chain(self.right_angle.iter())
            .chain(self.right_extra.iter())
            .copied()
    }

    fn side_visible(frame: &Frame, angle: &[PoseLandmark; 3], extra: &[PoseLandmark], min: f32) -> bool {
        angle
            .iter()
            .chain(extra)
            .all(|&joint| frame.landmark(joint).is_visible(min))
    }

    pub fn left_visible(&self, frame: &Frame, min: f32) -> bool {
        Self::side_visible(frame, &self.left_angle, self.left_extra, min)
    }

    pub fn right_visible(&self, frame: &Frame, min: f32) -> bool {
        Self::side_visible(frame, &self.right_angle, self.right_extra, min)
    }

    /// The visibility gate: all central joints plus at least one full side.
    pub fn is_satisfied(&self, frame: &Frame, min: f32) -> bool {
        self.central
            .iter()
            .all(|&joint| frame.landmark(joint).is_visible(min))
            && (self.left_visible(frame, min) || self.right_visible(frame, min))
    }

    /// Primary angle averaged over the visible sides.
    ///
    /// A side whose geometry is degenerate is skipped; `None` when no side
    /// gives a usable angle.
    pub fn primary_angle(&self, frame: &Frame, min: f32) -> Option<f32> {
        let side_angle = |chain: &[PoseLandmark; 3]| {
            geometry::try_angle(
                frame.landmark(chain[0]),
                frame.landmark(chain[1]),
                frame.landmark(chain[2]),
            )
        };

        let left = self
            .left_visible(frame, min)
            .then(|| side_angle(&self.left_angle))
            .flatten();
        let right = self
            .right_visible(frame, min)
            .then(|| side_angle(&self.right_angle))
            .flatten();

        match (left, right) {
            (Some(l), Some(r)) => Some((l + r) / 2.0),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }

    /// Weakest visibility among all required joints.
    pub fn min_confidence(&self, frame: &Frame) -> f32 {
        self.all()
            .map(|joint| frame.landmark(joint).confidence())
            .fold(1.0, f32::min)
    }

    /// Mean visibility of all required joints.
    pub fn mean_confidence(&self, frame: &Frame) -> f32 {
        let (sum, count) = self
            .all()
            .fold((0.0_f32, 0_u32), |(sum, count), joint| {
                (sum + frame.landmark(joint).confidence(), count + 1)
            });
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }
}

// ============================================================================
// EXTREMAL TRACKING & SCORING
// ============================================================================

/// Smallest and largest angle seen since the last restart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AngleRange {
    pub min: f32,
    pub max: f32,
}

impl AngleRange {
    pub const EMPTY: AngleRange = AngleRange {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    pub fn observe(&mut self, angle: f32) {
        self.min = self.min.min(angle);
        self.max = self.max.max(angle);
    }

    pub fn restart(&mut self, angle: f32) {
        self.min = angle;
        self.max = angle;
    }
}

/// Points lost for `deficit` degrees of missing range of motion.
pub(crate) fn range_penalty(deficit: f32, per_degree: f32, cap: f32) -> f32 {
    if deficit.is_finite() && deficit > 0.0 {
        (deficit * per_degree).min(cap)
    } else {
        0.0
    }
}

/// 100 minus range-of-motion and per-issue deductions, clamped to `[0, 100]`.
pub(crate) fn form_score(range_penalty: f32, issues: &[FormIssue]) -> u8 {
    let issue_penalty: u32 = issues.iter().map(|issue| u32::from(issue.penalty())).sum();
    let score = 100.0 - range_penalty - issue_penalty as f32;
    if score.is_nan() {
        return 0;
    }
    score.clamp(0.0, 100.0).round() as u8
}

/// Joins a positional cue and this frame's issues into one message.
pub(crate) fn compose_feedback(cue: Option<&'static str>, issues: &[FormIssue]) -> Option<String> {
    let parts: Vec<&str> = cue
        .into_iter()
        .chain(issues.iter().map(FormIssue::message))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(". "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic;

    #[test]
    fn test_propose_respects_stability_frames() {
        let mut core = SessionCore::new(MIN_REP_DURATION_MS);
        core.start();

        assert_eq!(core.propose(Some(ExerciseState::Up), 3), None);
        assert_eq!(core.propose(Some(ExerciseState::Up), 3), None);
        let transition = core.propose(Some(ExerciseState::Up), 3).unwrap();
        assert_eq!(transition.from, ExerciseState::Starting);
        assert_eq!(transition.to, ExerciseState::Up);
        assert_eq!(core.state(), ExerciseState::Up);
    }

    #[test]
    fn test_propose_resets_on_interruption() {
        let mut core = SessionCore::new(MIN_REP_DURATION_MS);
        core.start();

        core.propose(Some(ExerciseState::Down), 2);
        core.propose(None, 2);
        assert_eq!(core.propose(Some(ExerciseState::Down), 2), None);
        assert!(core.propose(Some(ExerciseState::Down), 2).is_some());
    }

    #[test]
    fn test_invalid_resumes_previous_state() {
        let mut core = SessionCore::new(MIN_REP_DURATION_MS);
        core.start();
        core.propose(Some(ExerciseState::Down), 1);

        core.mark_invalid();
        core.mark_invalid();
        assert_eq!(core.state(), ExerciseState::Invalid);

        core.restore();
        assert_eq!(core.state(), ExerciseState::Down);
    }

    #[test]
    fn test_issue_accumulator_is_distinct() {
        let mut core = SessionCore::new(MIN_REP_DURATION_MS);
        core.note(FormIssue::HipSag);
        core.note(FormIssue::HipSag);
        core.note(FormIssue::ShouldersUneven);
        assert_eq!(core.issues(), &[FormIssue::HipSag, FormIssue::ShouldersUneven]);

        assert!(core.complete_rep(70, 0));
        assert!(core.issues().is_empty());
        assert_eq!(core.rep_count(), 1);
        assert_eq!(core.average_form_score(), Some(70));
        assert_eq!(core.report().issue_count(FormIssue::HipSag), 1);
    }

    #[test]
    fn test_rejected_attempt_keeps_issues_out_of_next_rep() {
        let mut core = SessionCore::new(MIN_REP_DURATION_MS);
        core.note(FormIssue::InsufficientDepth);
        core.reject_attempt();
        assert!(core.issues().is_empty());
        assert_eq!(core.rep_count(), 0);

        assert!(core.complete_rep(100, 1_000));
        assert_eq!(core.report().rep_scores, vec![100]);
        assert_eq!(core.report().rejected_reps, 1);
        assert_eq!(core.report().attempted_reps(), 2);
        assert_eq!(core.report().issue_count(FormIssue::InsufficientDepth), 1);
    }

    #[test]
    fn test_rep_faster_than_minimum_duration_is_rejected() {
        let mut core = SessionCore::new(500);
        // The first rep has nothing to be compared with.
        assert!(core.complete_rep(100, 100));
        assert!(!core.complete_rep(100, 400));
        assert!(core.complete_rep(100, 600));

        assert_eq!(core.rep_count(), 2);
        assert_eq!(core.report().rejected_reps, 1);
        assert_eq!(core.report().issue_count(FormIssue::RepTooFast), 1);
        assert!(core.issues().is_empty());
    }

    #[test]
    fn test_zero_minimum_duration_counts_every_rep() {
        let mut core = SessionCore::new(0);
        for _ in 0..3 {
            assert!(core.complete_rep(90, 0));
        }
        assert_eq!(core.rep_count(), 3);
    }

    #[test]
    fn test_form_score_bounds() {
        assert_eq!(form_score(0.0, &[]), 100);
        assert_eq!(form_score(500.0, &[]), 0);
        let all = [
            FormIssue::ShouldersUneven,
            FormIssue::HipSag,
            FormIssue::HipPike,
            FormIssue::ChinBelowBar,
            FormIssue::Kipping,
            FormIssue::ArmsNotCrossed,
            FormIssue::JerkyMovement,
        ];
        assert_eq!(form_score(50.0, &all), 0);
        assert_eq!(form_score(f32::NAN, &[]), 0);
    }

    #[test]
    fn test_range_penalty_caps() {
        assert_eq!(range_penalty(10.0, 1.5, 50.0), 15.0);
        assert_eq!(range_penalty(100.0, 1.5, 50.0), 50.0);
        assert_eq!(range_penalty(-5.0, 1.5, 50.0), 0.0);
    }

    #[test]
    fn test_compose_feedback() {
        assert_eq!(compose_feedback(None, &[]), None);
        assert_eq!(
            compose_feedback(Some("Chin above bar"), &[FormIssue::Kipping]).as_deref(),
            Some("Chin above bar. Avoid swinging, keep your body still")
        );
    }

    #[test]
    fn test_angle_range() {
        let mut range = AngleRange::EMPTY;
        range.observe(120.0);
        range.observe(80.0);
        assert_eq!((range.min, range.max), (80.0, 120.0));
        range.restart(100.0);
        assert_eq!((range.min, range.max), (100.0, 100.0));
    }

    #[test]
    fn test_analyzer_dispatch() {
        for exercise in [ExerciseType::Pushup, ExerciseType::Pullup, ExerciseType::Situp] {
            let mut analyzer = Analyzer::for_exercise(exercise);
            assert_eq!(analyzer.exercise(), exercise);
            assert_eq!(analyzer.state(), ExerciseState::Idle);

            analyzer.start();
            assert_eq!(analyzer.state(), ExerciseState::Starting);

            analyzer.stop();
            assert_eq!(analyzer.state(), ExerciseState::Finished);

            analyzer.reset();
            assert_eq!(analyzer.state(), ExerciseState::Idle);
            assert_eq!(analyzer.rep_count(), 0);
        }
    }

    #[test]
    fn test_idle_analyzer_does_not_advance() {
        let mut analyzer = Analyzer::for_exercise(ExerciseType::Pushup);
        let result = analyzer.analyze(&synthetic::pushup_frame(170.0, 0));
        assert_eq!(result.state, ExerciseState::Idle);
        assert_eq!(result.rep_count, 0);
    }

    #[test]
    fn test_finished_analyzer_freezes_count() {
        let mut analyzer = Analyzer::for_exercise(ExerciseType::Pushup);
        analyzer.start();
        analyzer.stop();
        let result = analyzer.analyze(&synthetic::pushup_frame(70.0, 0));
        assert_eq!(result.state, ExerciseState::Finished);
        assert_eq!(result.feedback.as_deref(), Some("Exercise complete"));
    }
}
