//! Sit-up analysis.
//!
//! Tracks the hip angle (shoulder-hip-knee) from a side view. The hip is
//! open when lying back and closes as the athlete curls up, so the bands are
//! reversed compared with the arm exercises: `Down` is at or above
//! [`DOWN_ANGLE_THRESHOLD`], `Up` at or below [`UP_ANGLE_THRESHOLD`].
//! A rep is counted on `Down -> Up`.
//!
//! Knees are part of the required set since the hip angle needs them.
//!
//! Lying back before the curl reaches the top, or curling again without
//! lying back first, closes the attempt as rejected.

use crate::analyzer::{
    compose_feedback, form_score, range_penalty, AngleRange, ExerciseAnalyzer, Requirements, SessionCore,
};
use crate::config::SitupConfig;
use crate::geometry::{distance_2d, is_close_to, vertical_alignment};
use crate::grading::SetReport;
use crate::types::{AnalysisResult, ExerciseState, ExerciseType, FormIssue, Frame, PoseLandmark};

pub const REQUIRED_VISIBILITY: f32 = 0.6;
pub const DOWN_ANGLE_THRESHOLD: f32 = 110.0;
pub const UP_ANGLE_THRESHOLD: f32 = 70.0;
pub const STABILITY_FRAMES: u32 = 3;
pub const SHOULDER_LEVEL_TOLERANCE: f32 = 0.15;
pub const ARMS_CROSSED_DISTANCE: f32 = 0.15;
pub const ELBOW_TUCK_DISTANCE: f32 = 0.30;
pub const PARTIAL_REP_MARGIN: f32 = 15.0;

const CURL_PENALTY_PER_DEGREE: f32 = 0.8;
const MAX_CURL_PENALTY: f32 = 40.0;
const LIE_BACK_PENALTY_PER_DEGREE: f32 = 0.5;
const MAX_LIE_BACK_PENALTY: f32 = 30.0;

const REQUIREMENTS: Requirements = Requirements {
    central: &[],
    left_angle: [PoseLandmark::LeftShoulder, PoseLandmark::LeftHip, PoseLandmark::LeftKnee],
    right_angle: [PoseLandmark::RightShoulder, PoseLandmark::RightHip, PoseLandmark::RightKnee],
    left_extra: &[],
    right_extra: &[],
};

/// Sit-up analyzer.
#[derive(Debug, Clone)]
pub struct SitupAnalyzer {
    config: SitupConfig,
    core: SessionCore,
    phase_range: AngleRange,
}

impl SitupAnalyzer {
    pub fn new(config: SitupConfig) -> Self {
        Self {
            core: SessionCore::new(config.min_rep_duration_ms),
            config,
            phase_range: AngleRange::EMPTY,
        }
    }

    pub fn default_analyzer() -> Self {
        Self::new(SitupConfig::default())
    }

    pub fn config(&self) -> &SitupConfig {
        &self.config
    }

    fn clear_trackers(&mut self) {
        self.phase_range = AngleRange::EMPTY;
    }

    fn determine_state(&self, hip_angle: f32) -> Option<ExerciseState> {
        if hip_angle >= self.config.down_angle {
            Some(ExerciseState::Down)
        } else if hip_angle <= self.config.up_angle {
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

    /// Arms crossed over the chest: some wrist rests near the opposite
    /// shoulder and both elbows stay tucked. Skipped unless all arm joints
    /// are visible.
    fn check_arms(&self, frame: &Frame) -> Option<FormIssue> {
        use PoseLandmark::*;
        let min = self.config.required_visibility;
        let joints = [LeftShoulder, RightShoulder, LeftElbow, RightElbow, LeftWrist, RightWrist];
        if !joints.iter().all(|&joint| frame.landmark(joint).is_visible(min)) {
            return None;
        }

        let wrist_on_shoulder = distance_2d(frame.landmark(LeftWrist), frame.landmark(RightShoulder))
            <= self.config.arms_crossed_distance
            || distance_2d(frame.landmark(RightWrist), frame.landmark(LeftShoulder)) <= self.config.arms_crossed_distance;
        let elbows_tucked = distance_2d(frame.landmark(LeftElbow), frame.landmark(LeftShoulder))
            <= self.config.elbow_tuck_distance
            && distance_2d(frame.landmark(RightElbow), frame.landmark(RightShoulder)) <= self.config.elbow_tuck_distance;

        (!(wrist_on_shoulder && elbows_tucked)).then_some(FormIssue::ArmsNotCrossed)
    }

    fn current_score(&self) -> u8 {
        form_score(0.0, self.core.issues())
    }

    /// Closes the attempt in progress as rejected and returns its score.
    fn reject_partial(&mut self, issue: FormIssue, range: f32) -> u8 {
        self.core.note(issue);
        let score = form_score(range, self.core.issues());
        self.core.reject_attempt();
        score
    }

    fn feedback(&self, issues: &[FormIssue]) -> Option<String> {
        let cue = match self.core.state() {
            ExerciseState::Starting => Some("Lie back with your arms crossed over your chest"),
            _ => None,
        };
        compose_feedback(cue, issues)
    }
}

impl Default for SitupAnalyzer {
    fn default() -> Self {
        Self::default_analyzer()
    }
}

impl ExerciseAnalyzer for SitupAnalyzer {
    fn exercise(&self) -> ExerciseType {
        ExerciseType::Situp
    }

    fn analyze(&mut self, frame: &Frame) -> AnalysisResult {
        let min = self.config.required_visibility;
        if !self.core.state().is_counting() {
            return self.core.snapshot(REQUIREMENTS.mean_confidence(frame), self.current_score());
        }
        if !REQUIREMENTS.is_satisfied(frame, min) {
            return self.core.invalid(REQUIREMENTS.min_confidence(frame));
        }
        self.core.restore();
        let confidence = REQUIREMENTS.mean_confidence(frame);

        let Some(hip_angle) = REQUIREMENTS.primary_angle(frame, min) else {
            return self.core.result(None, confidence, self.current_score());
        };

        let mut issues: Vec<FormIssue> = [self.check_shoulders(frame), self.check_arms(frame)]
            .into_iter()
            .flatten()
            .collect();
        self.phase_range.observe(hip_angle);

        let position = self.determine_state(hip_angle);
        for issue in &issues {
            self.core.note(*issue);
        }
        let mut score = self.current_score();

        let state = self.core.state();
        if state == ExerciseState::Down
            && position == Some(ExerciseState::Down)
            && self.phase_range.min < self.config.down_angle - self.config.partial_rep_margin
        {
            // Lay back again without curling all the way up.
            let deficit = self.phase_range.min - self.config.up_angle;
            if deficit > 0.0 {
                issues.push(FormIssue::IncompleteCurl);
                let range = range_penalty(deficit, CURL_PENALTY_PER_DEGREE, MAX_CURL_PENALTY);
                score = self.reject_partial(FormIssue::IncompleteCurl, range);
                log::debug!("Partial sit-up rejected, curled to {:.0}° (score {})", self.phase_range.min, score);
            }
            self.phase_range.restart(hip_angle);
        } else if state == ExerciseState::Up
            && position == Some(ExerciseState::Up)
            && self.phase_range.max > self.config.up_angle + self.config.partial_rep_margin
        {
            // Curled again without lying back.
            let deficit = self.config.down_angle - self.phase_range.max;
            if deficit > 0.0 {
                issues.push(FormIssue::BackNotFlat);
                let range = range_penalty(deficit, LIE_BACK_PENALTY_PER_DEGREE, MAX_LIE_BACK_PENALTY);
                score = self.reject_partial(FormIssue::BackNotFlat, range);
                log::debug!(
                    "Sit-up rejected without lying back, opened to {:.0}° (score {})",
                    self.phase_range.max,
                    score
                );
            }
            self.phase_range.restart(hip_angle);
        }

        if let Some(transition) = self.core.propose(position, self.config.stability_frames) {
            if transition.from == ExerciseState::Down
                && transition.to == ExerciseState::Up
                && self.phase_range.max >= self.config.down_angle
            {
                if self.core.complete_rep(score, frame.timestamp_ms) {
                    log::info!(
                        "Sit-up rep {} counted (lay back to {:.0}°, score {})",
                        self.core.rep_count(),
                        self.phase_range.max,
                        score
                    );
                } else {
                    log::debug!("Sit-up rep rejected, faster than {} ms", self.config.min_rep_duration_ms);
                    issues.push(FormIssue::RepTooFast);
                }
            }
            self.phase_range.restart(hip_angle);
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
