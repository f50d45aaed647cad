//! Push-up analysis.
//!
//! Tracks the elbow angle (shoulder-elbow-wrist) from a side view.
//! `Up` is arms locked out (elbow at or above [`UP_ANGLE_THRESHOLD`]), `Down`
//! is the bottom (at or below [`DOWN_ANGLE_THRESHOLD`]). A rep is counted on
//! `Down -> Up`; anything in between holds the current state, so jitter
//! around one threshold can never complete a cycle.
//!
//! Form checks:
//! - shoulders level across the body,
//! - hips on the shoulder-to-ankle line (sag / pike),
//! - controlled tempo (no large mid-range jumps between frames),
//! - depth: turning around above the bottom threshold is a partial rep. It
//!   is scored on its own and rejected, so it never weighs on the next rep.

use crate::analyzer::{
    compose_feedback, form_score, range_penalty, AngleRange, ExerciseAnalyzer, Requirements, SessionCore,
};
use crate::config::PushupConfig;
use crate::geometry::{is_close_to, midpoint, vertical_alignment};
use crate::grading::SetReport;
use crate::types::{AnalysisResult, ExerciseState, ExerciseType, FormIssue, Frame, Landmark, PoseLandmark};

pub const REQUIRED_VISIBILITY: f32 = 0.5;
pub const DOWN_ANGLE_THRESHOLD: f32 = 80.0;
pub const UP_ANGLE_THRESHOLD: f32 = 160.0;
pub const STABILITY_FRAMES: u32 = 1;
pub const SHOULDER_LEVEL_TOLERANCE: f32 = 0.10;
pub const HIP_SAG_TOLERANCE: f32 = 0.10;
pub const HIP_PIKE_TOLERANCE: f32 = 0.12;
pub const MAX_ANGLE_STEP: f32 = 30.0;
pub const PARTIAL_REP_MARGIN: f32 = 20.0;

const DEPTH_PENALTY_PER_DEGREE: f32 = 1.5;
const MAX_DEPTH_PENALTY: f32 = 50.0;

const REQUIREMENTS: Requirements = Requirements {
    central: &[],
    left_angle: [PoseLandmark::LeftShoulder, PoseLandmark::LeftElbow, PoseLandmark::LeftWrist],
    right_angle: [PoseLandmark::RightShoulder, PoseLandmark::RightElbow, PoseLandmark::RightWrist],
    left_extra: &[PoseLandmark::LeftHip],
    right_extra: &[PoseLandmark::RightHip],
};

/// Push-up analyzer.
#[derive(Debug, Clone)]
pub struct PushupAnalyzer {
    config: PushupConfig,
    core: SessionCore,
    /// Elbow range since the current phase began.
    phase_range: AngleRange,
    last_elbow_angle: Option<f32>,
}

impl PushupAnalyzer {
    pub fn new(config: PushupConfig) -> Self {
        Self {
            core: SessionCore::new(config.min_rep_duration_ms),
            config,
            phase_range: AngleRange::EMPTY,
            last_elbow_angle: None,
        }
    }

    /// Analyzer with the default thresholds.
    pub fn default_analyzer() -> Self {
        Self::new(PushupConfig::default())
    }

    pub fn config(&self) -> &PushupConfig {
        &self.config
    }

    fn clear_trackers(&mut self) {
        self.phase_range = AngleRange::EMPTY;
        self.last_elbow_angle = None;
    }

    /// Position implied by the elbow angle; `None` between the thresholds.
    fn determine_state(&self, elbow_angle: f32) -> Option<ExerciseState> {
        if elbow_angle <= self.config.down_angle {
            Some(ExerciseState::Down)
        } else if elbow_angle >= self.config.up_angle {
            Some(ExerciseState::Up)
        } else {
            None
        }
    }

    fn check_shoulders(&self, frame: &Frame) -> Option<FormIssue> {
        let left = frame.landmark(PoseLandmark::LeftShoulder);
        let right = frame.landmark(PoseLandmark::RightShoulder);
        let min = self.config.required_visibility;
        if !(left.is_visible(min) && right.is_visible(min)) {
            return None;
        }
        let level = is_close_to(vertical_alignment(left, right), 0.0, self.config.shoulder_level_tolerance);
        (!level).then_some(FormIssue::ShouldersUneven)
    }

    /// Shoulder, hip and foot (ankle, or knee when ankles are hidden) for
    /// the visible side(s), averaged across sides when both are usable.
    fn body_line(&self, frame: &Frame) -> Option<(Landmark, Landmark, Landmark)> {
        use PoseLandmark::*;
        let min = self.config.required_visibility;
        let side = |shoulder: PoseLandmark, hip: PoseLandmark, ankle: PoseLandmark, knee: PoseLandmark| {
            let s = frame.landmark(shoulder);
            let h = frame.landmark(hip);
            if !(s.is_visible(min) && h.is_visible(min)) {
                return None;
            }
            let foot = [ankle, knee]
                .into_iter()
                .map(|joint| frame.landmark(joint))
                .find(|landmark| landmark.is_visible(min))?;
            Some((*s, *h, *foot))
        };

        match (
            side(LeftShoulder, LeftHip, LeftAnkle, LeftKnee),
            side(RightShoulder, RightHip, RightAnkle, RightKnee),
        ) {
            (Some(l), Some(r)) => Some((midpoint(&l.0, &r.0), midpoint(&l.1, &r.1), midpoint(&l.2, &r.2))),
            (Some(one), None) | (None, Some(one)) => Some(one),
            (None, None) => None,
        }
    }

    /// Compares the hips with the straight line from shoulders to feet.
    fn check_hip_line(&self, frame: &Frame) -> Option<FormIssue> {
        let (shoulder, hip, foot) = self.body_line(frame)?;

        let span = foot.x - shoulder.x;
        let expected_y = if span.abs() > 1e-3 {
            shoulder.y + (foot.y - shoulder.y) * ((hip.x - shoulder.x) / span)
        } else {
            (shoulder.y + foot.y) / 2.0
        };
        let on_line = Landmark { y: expected_y, ..hip };
        let deviation = vertical_alignment(&hip, &on_line);

        if deviation > self.config.hip_sag_tolerance {
            Some(FormIssue::HipSag)
        } else if deviation < -self.config.hip_pike_tolerance {
            Some(FormIssue::HipPike)
        } else {
            None
        }
    }

    fn check_tempo(&self, elbow_angle: f32) -> Option<FormIssue> {
        let previous = self.last_elbow_angle?;
        let mid_range = elbow_angle > self.config.down_angle && elbow_angle < self.config.up_angle;
        (mid_range && (elbow_angle - previous).abs() > self.config.max_angle_step).then_some(FormIssue::JerkyMovement)
    }

    fn current_score(&self) -> u8 {
        form_score(0.0, self.core.issues())
    }

    fn feedback(&self, issues: &[FormIssue]) -> Option<String> {
        let cue = match self.core.state() {
            ExerciseState::Starting => Some("Start in the up position with arms extended"),
            _ => None,
        };
        compose_feedback(cue, issues)
    }
}

impl Default for PushupAnalyzer {
    fn default() -> Self {
        Self::default_analyzer()
    }
}

impl ExerciseAnalyzer for PushupAnalyzer {
    fn exercise(&self) -> ExerciseType {
        ExerciseType::Pushup
    }

    fn analyze(&mut self, frame: &Frame) -> AnalysisResult {
        let min = self.config.required_visibility;
        if !self.core.state().is_counting() {
            return self.core.snapshot(REQUIREMENTS.mean_confidence(frame), self.current_score());
        }
        if !REQUIREMENTS.is_satisfied(frame, min) {
            self.last_elbow_angle = None;
            return self.core.invalid(REQUIREMENTS.min_confidence(frame));
        }
        self.core.restore();
        let confidence = REQUIREMENTS.mean_confidence(frame);

        let Some(elbow_angle) = REQUIREMENTS.primary_angle(frame, min) else {
            return self.core.result(None, confidence, self.current_score());
        };

        let mut issues: Vec<FormIssue> = [
            self.check_shoulders(frame),
            self.check_hip_line(frame),
            self.check_tempo(elbow_angle),
        ]
        .into_iter()
        .flatten()
        .collect();
        self.last_elbow_angle = Some(elbow_angle);
        self.phase_range.observe(elbow_angle);

        let position = self.determine_state(elbow_angle);
        for issue in &issues {
            self.core.note(*issue);
        }
        let mut score = self.current_score();

        // Back at lockout after dipping without reaching the bottom.
        if self.core.state() == ExerciseState::Up
            && position == Some(ExerciseState::Up)
            && self.phase_range.min < self.config.up_angle - self.config.partial_rep_margin
        {
            let deficit = self.phase_range.min - self.config.down_angle;
            if deficit > 0.0 {
                issues.push(FormIssue::InsufficientDepth);
                self.core.note(FormIssue::InsufficientDepth);
                let depth = range_penalty(deficit, DEPTH_PENALTY_PER_DEGREE, MAX_DEPTH_PENALTY);
                score = form_score(depth, self.core.issues());
                log::debug!(
                    "Partial push-up rejected, turned at {:.0}° (score {})",
                    self.phase_range.min,
                    score
                );
                self.core.reject_attempt();
            }
            self.phase_range.restart(elbow_angle);
        }

        if let Some(transition) = self.core.propose(position, self.config.stability_frames) {
            let counted = transition.from == ExerciseState::Down
                && transition.to == ExerciseState::Up
                && self.phase_range.min <= self.config.down_angle;
            if counted {
                if self.core.complete_rep(score, frame.timestamp_ms) {
                    log::info!(
                        "Push-up rep {} counted (bottom {:.0}°, score {})",
                        self.core.rep_count(),
                        self.phase_range.min,
                        score
                    );
                } else {
                    log::debug!("Push-up rep rejected, faster than {} ms", self.config.min_rep_duration_ms);
                    issues.push(FormIssue::RepTooFast);
                }
            }
            self.phase_range.restart(elbow_angle);
        }

        self.core.result(self.feedback(&issues), confidence, score)
    }

    fn is_valid_pose(&self, frame: &Frame) -> bool {
        REQUIREMENTS.is_satisfied(frame, self.config.required_visibility)
    }

    fn start(&mut self) {
        self.core.start();
        self.clear_trackers();
    }

    fn stop(&mut self) {
        self.core.stop();
    }

    fn reset(&mut self) {
        self.core.reset();
        self.clear_trackers();
    }

    fn state(&self) -> ExerciseState {
        self.core.state()
    }

    fn rep_count(&self) -> u32 {
        self.core.rep_count()
    }

    fn form_issues(&self) -> &[FormIssue] {
        self.core.issues()
    }

    fn average_form_score(&self) -> Option<u8> {
        self.core.average_form_score()
    }

    fn set_report(&self) -> &SetReport {
        self.core.report()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{angle_sweep, pushup_frame, pushup_frame_with, with_visibility};

    fn run(analyzer: &mut PushupAnalyzer, angles: &[f32]) -> Vec<AnalysisResult> {
        angles
            .iter()
            .enumerate()
            .map(|(i, &angle)| analyzer.analyze(&pushup_frame(angle, i as u64 * 33)))
            .collect()
    }

    fn full_rep() -> Vec<f32> {
        let mut angles = angle_sweep(170.0, 70.0, 10.0);
        angles.extend(angle_sweep(80.0, 170.0, 10.0));
        angles
    }

    fn started() -> PushupAnalyzer {
        let mut analyzer = PushupAnalyzer::default_analyzer();
        analyzer.start();
        analyzer
    }

    #[test]
    fn test_full_cycle_counts_one_rep() {
        let mut analyzer = started();
        let results = run(&mut analyzer, &full_rep());

        let last = results.last().unwrap();
        assert_eq!(last.rep_count, 1);
        assert_eq!(last.state, ExerciseState::Up);
        assert!(results.iter().any(|r| r.state == ExerciseState::Down));
        assert_eq!(results.iter().filter(|r| r.state == ExerciseState::Invalid).count(), 0);
    }

    #[test]
    fn test_state_sequence() {
        let mut analyzer = started();
        let results = run(&mut analyzer, &full_rep());

        let mut states: Vec<ExerciseState> = vec![ExerciseState::Starting];
        for result in &results {
            if states.last() != Some(&result.state) {
                states.push(result.state);
            }
        }
        assert_eq!(
            states,
            vec![ExerciseState::Starting, ExerciseState::Up, ExerciseState::Down, ExerciseState::Up]
        );
    }

    #[test]
    fn test_clean_rep_scores_full_marks() {
        let mut analyzer = started();
        let results = run(&mut analyzer, &full_rep());

        assert!(results.iter().all(|r| r.form_score == 100));
        assert_eq!(analyzer.average_form_score(), Some(100));
    }

    #[test]
    fn test_jitter_near_bottom_never_counts() {
        let mut analyzer = started();
        let mut angles = angle_sweep(170.0, 90.0, 10.0);
        for _ in 0..20 {
            angles.extend([75.0, 85.0, 79.0, 82.0]);
        }
        let results = run(&mut analyzer, &angles);
        assert!(results.iter().all(|r| r.rep_count == 0));
        assert_eq!(analyzer.state(), ExerciseState::Down);
    }

    #[test]
    fn test_jitter_near_top_never_counts() {
        let mut analyzer = started();
        let mut angles = Vec::new();
        for _ in 0..20 {
            angles.extend([165.0, 155.0, 161.0, 158.0]);
        }
        let results = run(&mut analyzer, &angles);
        assert!(results.iter().all(|r| r.rep_count == 0));
        assert!(analyzer.form_issues().is_empty());
    }

    fn shallow_dip(bottom: f32) -> Vec<f32> {
        let mut angles = angle_sweep(170.0, bottom, 10.0);
        angles.extend(angle_sweep(bottom + 10.0, 170.0, 10.0));
        angles
    }

    #[test]
    fn test_partial_rep_flagged_not_counted() {
        let mut analyzer = started();
        let results = run(&mut analyzer, &shallow_dip(100.0));

        // Lockout is reached again at 160°, closing the partial attempt.
        let closing = results.iter().find(|r| r.feedback.is_some()).unwrap();
        assert_eq!(closing.feedback.as_deref(), Some(FormIssue::InsufficientDepth.message()));
        // 20 degrees short of the bottom at 1.5 points each.
        assert_eq!(closing.form_score, 70);

        let last = results.last().unwrap();
        assert_eq!(last.rep_count, 0);
        assert!(analyzer.form_issues().is_empty());
        assert_eq!(analyzer.set_report().rejected_reps, 1);
        assert_eq!(analyzer.set_report().issue_count(FormIssue::InsufficientDepth), 1);
    }

    #[test]
    fn test_full_rep_after_shallow_dip_scores_full_marks() {
        let mut analyzer = started();
        let mut angles = shallow_dip(100.0);
        angles.extend(full_rep());
        let results = run(&mut analyzer, &angles);

        let counting = results.iter().find(|r| r.rep_count == 1).unwrap();
        assert_eq!(counting.form_score, 100);
        assert_eq!(analyzer.average_form_score(), Some(100));
        assert_eq!(analyzer.set_report().rep_scores, vec![100]);
        assert_eq!(analyzer.set_report().attempted_reps(), 2);
    }

    #[test]
    fn test_rep_faster_than_minimum_duration_rejected() {
        let mut analyzer = started();
        let mut angles = full_rep();
        angles.extend(full_rep());
        // 5 ms per frame puts the second lockout 105 ms after the first.
        let results: Vec<AnalysisResult> = angles
            .iter()
            .enumerate()
            .map(|(i, &angle)| analyzer.analyze(&pushup_frame(angle, i as u64 * 5)))
            .collect();

        assert_eq!(results.last().unwrap().rep_count, 1);
        assert_eq!(analyzer.set_report().rejected_reps, 1);
        assert_eq!(analyzer.set_report().issue_count(FormIssue::RepTooFast), 1);
        assert!(results
            .iter()
            .any(|r| r.feedback.as_deref() == Some(FormIssue::RepTooFast.message())));
    }

    #[test]
    fn test_minimum_duration_disabled() {
        let mut analyzer = PushupAnalyzer::new(PushupConfig {
            min_rep_duration_ms: 0,
            ..PushupConfig::default()
        });
        analyzer.start();
        let mut angles = full_rep();
        angles.extend(full_rep());
        for (i, angle) in angles.into_iter().enumerate() {
            analyzer.analyze(&pushup_frame(angle, i as u64));
        }
        assert_eq!(analyzer.rep_count(), 2);
    }

    #[test]
    fn test_several_reps() {
        let mut analyzer = started();
        let mut angles = Vec::new();
        for _ in 0..5 {
            angles.extend(full_rep());
        }
        let results = run(&mut analyzer, &angles);

        assert_eq!(results.last().unwrap().rep_count, 5);
        for pair in results.windows(2) {
            assert!(pair[1].rep_count >= pair[0].rep_count);
            assert!(pair[1].rep_count - pair[0].rep_count <= 1);
        }
    }

    #[test]
    fn test_low_visibility_is_invalid() {
        use PoseLandmark::*;
        let mut analyzer = started();
        let joints = [
            LeftShoulder, RightShoulder, LeftElbow, RightElbow, LeftWrist, RightWrist, LeftHip, RightHip,
        ];
        let frame = with_visibility(&pushup_frame(170.0, 0), &joints, 0.2);

        assert!(!analyzer.is_valid_pose(&frame));
        let result = analyzer.analyze(&frame);
        assert_eq!(result.state, ExerciseState::Invalid);
        assert_eq!(result.rep_count, 0);
        assert_eq!(result.feedback, None);
        assert!((result.confidence - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_one_side_hidden_still_tracks() {
        use PoseLandmark::*;
        let mut analyzer = started();
        let hidden = [RightShoulder, RightElbow, RightWrist];
        let mut last = None;
        for (i, angle) in full_rep().into_iter().enumerate() {
            let frame = with_visibility(&pushup_frame(angle, i as u64), &hidden, 0.1);
            last = Some(analyzer.analyze(&frame));
        }
        assert_eq!(last.unwrap().rep_count, 1);
    }

    #[test]
    fn test_occlusion_mid_rep_resumes() {
        use PoseLandmark::*;
        let mut analyzer = started();
        run(&mut analyzer, &angle_sweep(170.0, 70.0, 10.0));
        assert_eq!(analyzer.state(), ExerciseState::Down);

        let occluded = with_visibility(&pushup_frame(70.0, 500), &[LeftWrist, RightWrist], 0.0);
        for _ in 0..5 {
            assert_eq!(analyzer.analyze(&occluded).state, ExerciseState::Invalid);
        }

        let results = run(&mut analyzer, &angle_sweep(80.0, 170.0, 10.0));
        assert_eq!(results[0].state, ExerciseState::Down);
        assert_eq!(results.last().unwrap().rep_count, 1);
    }

    #[test]
    fn test_hip_sag_and_pike() {
        let mut analyzer = started();
        let result = analyzer.analyze(&pushup_frame_with(170.0, 0.15, 0.0, 0));
        assert!(analyzer.form_issues().contains(&FormIssue::HipSag));
        assert!(result.feedback.unwrap().contains("hips are sagging"));
        assert!(result.form_score < 100);

        let mut analyzer = started();
        analyzer.analyze(&pushup_frame_with(170.0, -0.15, 0.0, 0));
        assert!(analyzer.form_issues().contains(&FormIssue::HipPike));
    }

    #[test]
    fn test_uneven_shoulders() {
        let mut analyzer = started();
        let result = analyzer.analyze(&pushup_frame_with(170.0, 0.0, 0.15, 0));
        assert!(analyzer.form_issues().contains(&FormIssue::ShouldersUneven));
        assert_eq!(result.form_score, 100 - FormIssue::ShouldersUneven.penalty());
    }

    #[test]
    fn test_jerky_movement() {
        let mut analyzer = started();
        run(&mut analyzer, &[170.0, 150.0, 100.0]);
        assert!(analyzer.form_issues().contains(&FormIssue::JerkyMovement));
    }

    #[test]
    fn test_issues_clear_after_counted_rep() {
        let mut analyzer = started();
        analyzer.analyze(&pushup_frame_with(170.0, 0.15, 0.0, 0));
        assert!(!analyzer.form_issues().is_empty());

        run(&mut analyzer, &full_rep());
        assert_eq!(analyzer.rep_count(), 1);
        assert!(analyzer.form_issues().is_empty());
        assert_eq!(analyzer.average_form_score(), Some(100 - FormIssue::HipSag.penalty()));
    }

    #[test]
    fn test_reset_matches_fresh_analyzer() {
        let mut used = started();
        run(&mut used, &full_rep());
        used.analyze(&pushup_frame_with(120.0, 0.2, 0.2, 0));
        used.reset();

        assert_eq!(used.state(), ExerciseState::Idle);
        assert_eq!(used.rep_count(), 0);
        assert!(used.form_issues().is_empty());

        let mut fresh = PushupAnalyzer::default_analyzer();
        used.start();
        fresh.start();
        assert_eq!(run(&mut used, &full_rep()), run(&mut fresh, &full_rep()));
    }

    #[test]
    fn test_degenerate_geometry_holds_state() {
        use PoseLandmark::*;
        let mut analyzer = started();
        run(&mut analyzer, &[170.0]);

        let mut frame = pushup_frame(170.0, 100);
        for (elbow, wrist) in [(LeftElbow, LeftWrist), (RightElbow, RightWrist)] {
            frame.landmarks[wrist.index()] = frame.landmarks[elbow.index()];
        }
        let result = analyzer.analyze(&frame);
        assert_eq!(result.state, ExerciseState::Up);
        assert_eq!(result.feedback, None);
    }
}
