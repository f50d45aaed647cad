//! Pull-up analysis.
//!
//! Tracks the elbow angle from a front view. `Up` is the dead hang (elbow at
//! or above [`UP_ANGLE_THRESHOLD`]) and `Down` is full flexion (at or below
//! [`DOWN_ANGLE_THRESHOLD`]); the names follow the joint angle, not the
//! athlete's height. A rep is counted on `Down -> Up`, i.e. when the athlete
//! returns to the hang after a full pull.
//!
//! The nose must clear the wrist line (the bar) during the flexed phase;
//! a rep that never does is still counted but scored with
//! [`FormIssue::ChinBelowBar`]. Horizontal hip drift relative to the
//! shoulders is reported as kipping.
//!
//! A pull that turns around short of full flexion, or a second pull started
//! before the arms were straight again, closes the attempt as rejected. Its
//! range penalty is reported on the closing frame only.

use crate::analyzer::{
    compose_feedback, form_score, range_penalty, AngleRange, ExerciseAnalyzer, Requirements, SessionCore,
};
use crate::config::PullupConfig;
use crate::geometry::{horizontal_alignment, is_close_to, midpoint, vertical_alignment};
use crate::grading::SetReport;
use crate::types::{AnalysisResult, ExerciseState, ExerciseType, FormIssue, Frame, Landmark, PoseLandmark};

pub const REQUIRED_VISIBILITY: f32 = 0.6;
pub const DOWN_ANGLE_THRESHOLD: f32 = 90.0;
pub const UP_ANGLE_THRESHOLD: f32 = 160.0;
pub const STABILITY_FRAMES: u32 = 3;
pub const CHIN_OVER_BAR_MARGIN: f32 = 0.05;
pub const KIPPING_TOLERANCE: f32 = 0.10;
pub const PARTIAL_REP_MARGIN: f32 = 20.0;

const HEIGHT_PENALTY_PER_DEGREE: f32 = 0.5;
const MAX_HEIGHT_PENALTY: f32 = 20.0;
const EXTENSION_PENALTY_PER_DEGREE: f32 = 0.5;
const MAX_EXTENSION_PENALTY: f32 = 30.0;

const REQUIREMENTS: Requirements = Requirements {
    central: &[PoseLandmark::Nose],
    left_angle: [PoseLandmark::LeftShoulder, PoseLandmark::LeftElbow, PoseLandmark::LeftWrist],
    right_angle: [PoseLandmark::RightShoulder, PoseLandmark::RightElbow, PoseLandmark::RightWrist],
    left_extra: &[],
    right_extra: &[],
};

/// Pull-up analyzer.
#[derive(Debug, Clone)]
pub struct PullupAnalyzer {
    config: PullupConfig,
    core: SessionCore,
    phase_range: AngleRange,
    /// Nose cleared the bar during the current pull.
    chin_cleared: bool,
    /// Hip-to-shoulder horizontal offset in the first hang.
    sway_reference: Option<f32>,
}

impl PullupAnalyzer {
    pub fn new(config: PullupConfig) -> Self {
        Self {
            core: SessionCore::new(config.min_rep_duration_ms),
            config,
            phase_range: AngleRange::EMPTY,
            chin_cleared: false,
            sway_reference: None,
        }
    }

    pub fn default_analyzer() -> Self {
        Self::new(PullupConfig::default())
    }

    pub fn config(&self) -> &PullupConfig {
        &self.config
    }

    fn clear_trackers(&mut self) {
        self.phase_range = AngleRange::EMPTY;
        self.chin_cleared = false;
        self.sway_reference = None;
    }

    fn determine_state(&self, elbow_angle: f32) -> Option<ExerciseState> {
        if elbow_angle <= self.config.down_angle {
            Some(ExerciseState::Down)
        } else if elbow_angle >= self.config.up_angle {
            Some(ExerciseState::Up)
        } else {
            None
        }
    }

    /// Mean of the visible landmarks among a left/right pair.
    fn pair_center(&self, frame: &Frame, left: PoseLandmark, right: PoseLandmark) -> Option<Landmark> {
        let min = self.config.required_visibility;
        let l = frame.landmark(left);
        let r = frame.landmark(right);
        match (l.is_visible(min), r.is_visible(min)) {
            (true, true) => Some(midpoint(l, r)),
            (true, false) => Some(*l),
            (false, true) => Some(*r),
            (false, false) => None,
        }
    }

    /// Nose above the wrist line by at least the configured margin.
    fn chin_over_bar(&self, frame: &Frame) -> bool {
        let nose = frame.landmark(PoseLandmark::Nose);
        self.pair_center(frame, PoseLandmark::LeftWrist, PoseLandmark::RightWrist)
            .map(|bar| vertical_alignment(nose, &bar) <= -self.config.chin_over_bar_margin)
            .unwrap_or(false)
    }

    fn hip_offset(&self, frame: &Frame) -> Option<f32> {
        let hips = self.pair_center(frame, PoseLandmark::LeftHip, PoseLandmark::RightHip)?;
        let shoulders = self.pair_center(frame, PoseLandmark::LeftShoulder, PoseLandmark::RightShoulder)?;
        Some(horizontal_alignment(&hips, &shoulders))
    }

    fn check_kipping(&self, offset: Option<f32>) -> Option<FormIssue> {
        let steady = is_close_to(offset?, self.sway_reference?, self.config.kipping_tolerance);
        (!steady).then_some(FormIssue::Kipping)
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
            ExerciseState::Starting => Some("Hang from the bar with arms fully extended"),
            ExerciseState::Down if !self.chin_cleared && !issues.contains(&FormIssue::ChinBelowBar) => {
                Some(FormIssue::ChinBelowBar.message())
            }
            _ => None,
        };
        compose_feedback(cue, issues)
    }
}

impl Default for PullupAnalyzer {
    fn default() -> Self {
        Self::default_analyzer()
    }
}

impl ExerciseAnalyzer for PullupAnalyzer {
    fn exercise(&self) -> ExerciseType {
        ExerciseType::Pullup
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

        let Some(elbow_angle) = REQUIREMENTS.primary_angle(frame, min) else {
            return self.core.result(None, confidence, self.current_score());
        };

        let position = self.determine_state(elbow_angle);
        let offset = self.hip_offset(frame);
        if self.sway_reference.is_none() && position == Some(ExerciseState::Up) {
            self.sway_reference = offset;
        }

        let mut issues: Vec<FormIssue> = self.check_kipping(offset).into_iter().collect();

        let flexed = self.core.state() == ExerciseState::Down || position == Some(ExerciseState::Down);
        if flexed && self.chin_over_bar(frame) {
            self.chin_cleared = true;
        }
        self.phase_range.observe(elbow_angle);

        for issue in &issues {
            self.core.note(*issue);
        }
        let mut score = self.current_score();

        let state = self.core.state();
        if state == ExerciseState::Up
            && position == Some(ExerciseState::Up)
            && self.phase_range.min < self.config.up_angle - self.config.partial_rep_margin
        {
            // Dropped back to the hang without a full pull.
            let deficit = self.phase_range.min - self.config.down_angle;
            if deficit > 0.0 {
                issues.push(FormIssue::InsufficientHeight);
                let range = range_penalty(deficit, HEIGHT_PENALTY_PER_DEGREE, MAX_HEIGHT_PENALTY);
                score = self.reject_partial(FormIssue::InsufficientHeight, range);
                log::debug!("Partial pull-up rejected, turned at {:.0}° (score {})", self.phase_range.min, score);
            }
            self.phase_range.restart(elbow_angle);
        } else if state == ExerciseState::Down
            && position == Some(ExerciseState::Down)
            && self.phase_range.max > self.config.down_angle + self.config.partial_rep_margin
        {
            // Pulled again without reaching the hang in between.
            let deficit = self.config.up_angle - self.phase_range.max;
            if deficit > 0.0 {
                issues.push(FormIssue::IncompleteExtension);
                let range = range_penalty(deficit, EXTENSION_PENALTY_PER_DEGREE, MAX_EXTENSION_PENALTY);
                score = self.reject_partial(FormIssue::IncompleteExtension, range);
                log::debug!(
                    "Pull-up rejected without full extension, opened to {:.0}° (score {})",
                    self.phase_range.max,
                    score
                );
            }
            self.phase_range.restart(elbow_angle);
        }

        if let Some(transition) = self.core.propose(position, self.config.stability_frames) {
            if transition.from == ExerciseState::Down
                && transition.to == ExerciseState::Up
                && self.phase_range.min <= self.config.down_angle
            {
                if !self.chin_cleared {
                    self.core.note(FormIssue::ChinBelowBar);
                    issues.push(FormIssue::ChinBelowBar);
                }
                score = self.current_score();
                if self.core.complete_rep(score, frame.timestamp_ms) {
                    log::info!(
                        "Pull-up rep {} counted (top {:.0}°, chin over bar: {}, score {})",
                        self.core.rep_count(),
                        self.phase_range.min,
                        self.chin_cleared,
                        score
                    );
                } else {
                    log::debug!("Pull-up rep rejected, faster than {} ms", self.config.min_rep_duration_ms);
                    issues.push(FormIssue::RepTooFast);
                }
            }
            if transition.to == ExerciseState::Up {
                self.chin_cleared = false;
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
