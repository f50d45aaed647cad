//! Core data types for the Exercise Analysis Engine.
//!
//! This module defines the values that flow through every analyzer: the
//! per-frame landmark input, the discrete exercise state, the per-frame
//! analysis output and the closed set of form faults an analyzer can report.
//!
//! Design principle: Types should make intent obvious. Landmarks are addressed
//! through `PoseLandmark`, never through bare indices, and a frame is always a
//! fixed-length set of 33 landmarks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Number of landmarks in a full pose (MediaPipe BlazePose topology).
pub const LANDMARK_COUNT: usize = 33;

/// A single tracked body joint in normalized image space.
///
/// `x` and `y` are in `[0, 1]` relative to the image, `y` grows downward.
/// `z` is the model's relative depth estimate. `visibility` is the detector's
/// confidence that the joint is present and unoccluded, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub visibility: f32,
}

impl Landmark {
    /// A landmark the detector did not report.
    pub const MISSING: Landmark = Landmark {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        visibility: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// True when the coordinates are usable and the detector is at least
    /// `min_visibility` confident. Non-finite data is never visible.
    pub fn is_visible(&self, min_visibility: f32) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
            && self.visibility.is_finite()
            && self.visibility >= min_visibility
    }

    /// Visibility with malformed values mapped to zero.
    pub fn confidence(&self) -> f32 {
        if self.visibility.is_finite() {
            self.visibility.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Canonical anatomical landmark indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    /// Position of this joint inside a frame.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One analyzed unit: the landmarks extracted from a single camera image.
///
/// Produced externally once per camera frame and consumed exactly once by an
/// analyzer. Analyzers never keep a reference to it past `analyze()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Normalized image-space landmarks.
    pub landmarks: [Landmark; LANDMARK_COUNT],
    /// Metric world-space landmarks (hip-centred), parallel to `landmarks`.
    pub world_landmarks: [Landmark; LANDMARK_COUNT],
    /// Monotonic capture timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Time the pose model spent on this frame.
    pub inference_time_ms: u64,
    pub image_width: u32,
    pub image_height: u32,
}

impl Frame {
    /// Creates a frame from complete landmark sets.
    pub fn new(
        landmarks: [Landmark; LANDMARK_COUNT],
        world_landmarks: [Landmark; LANDMARK_COUNT],
        timestamp_ms: u64,
    ) -> Self {
        Self {
            landmarks,
            world_landmarks,
            timestamp_ms,
            inference_time_ms: 0,
            image_width: 0,
            image_height: 0,
        }
    }

    /// A frame in which the detector found no pose.
    pub fn empty(timestamp_ms: u64) -> Self {
        Self::new(
            [Landmark::MISSING; LANDMARK_COUNT],
            [Landmark::MISSING; LANDMARK_COUNT],
            timestamp_ms,
        )
    }

    /// Builds a frame from however many landmarks the detector produced.
    ///
    /// Missing joints are filled with zero-visibility landmarks and extra
    /// entries are ignored, so a short detector output degrades into
    /// low-visibility joints instead of an error.
    pub fn from_slice(landmarks: &[Landmark], timestamp_ms: u64) -> Self {
        let mut frame = Self::empty(timestamp_ms);
        for (slot, landmark) in frame.landmarks.iter_mut().zip(landmarks) {
            *slot = *landmark;
        }
        frame
    }

    /// Strict variant of [`Frame::from_slice`] for callers that must reject
    /// anything but a full pose.
    pub fn try_from_slice(landmarks: &[Landmark], timestamp_ms: u64) -> Result<Self, EngineError> {
        if landmarks.len() != LANDMARK_COUNT {
            return Err(EngineError::LandmarkCount {
                expected: LANDMARK_COUNT,
                actual: landmarks.len(),
            });
        }
        Ok(Self::from_slice(landmarks, timestamp_ms))
    }

    /// Sets the source image metadata.
    pub fn with_image(mut self, width: u32, height: u32, inference_time_ms: u64) -> Self {
        self.image_width = width;
        self.image_height = height;
        self.inference_time_ms = inference_time_ms;
        self
    }

    pub fn landmark(&self, joint: PoseLandmark) -> &Landmark {
        &self.landmarks[joint.index()]
    }

    pub fn world_landmark(&self, joint: PoseLandmark) -> &Landmark {
        &self.world_landmarks[joint.index()]
    }
}

/// Serialized form of a frame, as recorded by the capture layer.
///
/// Uses vectors so that recordings with truncated landmark lists still load;
/// conversion into [`Frame`] is tolerant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameRecord {
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub world_landmarks: Vec<Landmark>,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub inference_time_ms: u64,
    #[serde(default)]
    pub image_width: u32,
    #[serde(default)]
    pub image_height: u32,
}

impl From<FrameRecord> for Frame {
    fn from(record: FrameRecord) -> Self {
        let mut frame = Frame::from_slice(&record.landmarks, record.timestamp_ms);
        for (slot, landmark) in frame.world_landmarks.iter_mut().zip(&record.world_landmarks) {
            *slot = *landmark;
        }
        frame.with_image(record.image_width, record.image_height, record.inference_time_ms)
    }
}

/// Exercises the engine can analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Pushup,
    Pullup,
    Situp,
}

impl ExerciseType {
    pub fn name(&self) -> &'static str {
        match self {
            ExerciseType::Pushup => "pushup",
            ExerciseType::Pullup => "pullup",
            ExerciseType::Situp => "situp",
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExerciseType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "pushup" | "pushups" => Ok(ExerciseType::Pushup),
            "pullup" | "pullups" => Ok(ExerciseType::Pullup),
            "situp" | "situps" => Ok(ExerciseType::Situp),
            _ => Err(EngineError::UnknownExercise(s.to_string())),
        }
    }
}

/// Instantaneous classification of the athlete's position.
///
/// `Down` and `Up` name the two extremes of the tracked joint angle; what
/// they mean anatomically is exercise-specific (see each analyzer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseState {
    /// Constructed or reset; nothing is being counted.
    Idle,
    /// Session started, waiting for the first recognised extreme.
    Starting,
    Down,
    Up,
    /// Session stopped; counting is frozen.
    Finished,
    /// Required landmarks are not visible enough to trust this frame.
    Invalid,
}

impl ExerciseState {
    /// True while the state machine advances on incoming frames.
    pub fn is_counting(&self) -> bool {
        !matches!(self, ExerciseState::Idle | ExerciseState::Finished)
    }

    /// True for the two movement extremes.
    pub fn is_phase(&self) -> bool {
        matches!(self, ExerciseState::Down | ExerciseState::Up)
    }
}

/// Per-frame analyzer output. A snapshot; the caller keeps only the latest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Completed repetitions in this session. Never decreases until `reset()`.
    pub rep_count: u32,
    /// Actionable cue for the athlete, absent when there is nothing to say.
    pub feedback: Option<String>,
    pub state: ExerciseState,
    /// Pose-detection confidence for the landmarks this exercise relies on.
    pub confidence: f32,
    /// Form quality in `[0, 100]`.
    pub form_score: u8,
}

/// Form faults detectable by the analyzers.
///
/// Each fault carries a fixed score penalty. Range-of-motion faults carry no
/// fixed penalty because they are charged per degree of missing range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormIssue {
    /// Shoulders not level across the body.
    ShouldersUneven,
    /// Hips below the shoulder-to-ankle line.
    HipSag,
    /// Hips above the shoulder-to-ankle line.
    HipPike,
    /// Elbow angle jumped between consecutive mid-range frames.
    JerkyMovement,
    /// Push-up turned around before the elbows reached the bottom threshold.
    InsufficientDepth,
    /// Pull-up whose flexed phase never brought the nose above the wrists.
    ChinBelowBar,
    /// Pull-up turned around before reaching full flexion.
    InsufficientHeight,
    /// Pull-up turned around before the arms were straight again.
    IncompleteExtension,
    /// Horizontal hip swing during a pull-up.
    Kipping,
    /// Sit-up turned around before the torso curled far enough.
    IncompleteCurl,
    /// Sit-up turned around before the shoulders went back down.
    BackNotFlat,
    /// Sit-up with the arms not crossed over the chest.
    ArmsNotCrossed,
    /// Repetition finished sooner than the minimum rep duration after the
    /// previous one; not counted.
    RepTooFast,
}

impl FormIssue {
    /// Cue shown to the athlete.
    pub fn message(&self) -> &'static str {
        match self {
            FormIssue::ShouldersUneven => "Keep shoulders level",
            FormIssue::HipSag => "Keep your core tight, hips are sagging",
            FormIssue::HipPike => "Lower your hips, keep your body straight",
            FormIssue::JerkyMovement => "Keep movements slow and controlled",
            FormIssue::InsufficientDepth => "Go lower, upper arms parallel to the ground",
            FormIssue::ChinBelowBar => "Pull higher, chin must clear the bar",
            FormIssue::InsufficientHeight => "Pull all the way up",
            FormIssue::IncompleteExtension => "Extend arms fully at the bottom",
            FormIssue::Kipping => "Avoid swinging, keep your body still",
            FormIssue::IncompleteCurl => "Curl up further",
            FormIssue::BackNotFlat => "Lower your shoulders all the way down",
            FormIssue::ArmsNotCrossed => "Keep arms crossed over your chest",
            FormIssue::RepTooFast => "Slow down, control each repetition",
        }
    }

    /// Fixed score deduction for one occurrence within a repetition.
    pub fn penalty(&self) -> u8 {
        match self {
            FormIssue::ShouldersUneven => 10,
            FormIssue::HipSag => 15,
            FormIssue::HipPike => 10,
            FormIssue::JerkyMovement => 5,
            FormIssue::ChinBelowBar => 20,
            FormIssue::Kipping => 15,
            FormIssue::ArmsNotCrossed => 20,
            FormIssue::InsufficientDepth
            | FormIssue::InsufficientHeight
            | FormIssue::IncompleteExtension
            | FormIssue::IncompleteCurl
            | FormIssue::BackNotFlat
            | FormIssue::RepTooFast => 0,
        }
    }
}

impl fmt::Display for FormIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
