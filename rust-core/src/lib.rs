//! Exercise Form Engine Library
//!
//! Turns per-frame body-pose landmarks into repetition counts, a movement
//! state and form feedback for push-ups, pull-ups and sit-ups.
//!
//! # Design Philosophy
//!
//! - **Geometry in, evidence out**: analyzers see only landmark coordinates
//!   and visibility. Pose detection and presentation live elsewhere.
//! - **Fail-loud, never throw**: untrustworthy frames are reported as
//!   `ExerciseState::Invalid` with no feedback, and never advance a count.
//! - **Hysteresis over smoothing**: every exercise uses a pair of angle
//!   thresholds, so jitter around one of them can never complete a rep.
//! - **O(1) per frame**: each analyzer keeps a handful of scalars and a
//!   bounded issue list, regardless of session length. Only the set report
//!   grows, by one score per counted rep.
//! - **Attempts are judged on their own**: a partial or rushed rep is
//!   rejected with its own score and never penalises the next one. The set
//!   report and APFT points (see [`grading`]) summarise the whole set.
//!
//! # Example
//!
//! ```
//! use exercise_engine::{ExerciseSession, ExerciseType, EngineConfig};
//! use exercise_engine::synthetic::pushup_frame;
//!
//! let mut session = ExerciseSession::new(ExerciseType::Pushup, &EngineConfig::default());
//! session.begin(0);
//! for (i, angle) in [170.0, 120.0, 75.0, 120.0, 170.0].into_iter().enumerate() {
//!     session.process(&pushup_frame(angle, i as u64 * 100));
//! }
//! let summary = session.finish(1_000);
//! assert_eq!(summary.rep_count, 1);
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod geometry;
pub mod grading;
pub mod pullup;
pub mod pushup;
pub mod session;
pub mod situp;
pub mod synthetic;
pub mod types;

#[cfg(test)]
mod integration_tests;

// Re-export commonly used types
pub use analyzer::{Analyzer, ExerciseAnalyzer};
pub use config::{EngineConfig, PullupConfig, PushupConfig, SitupConfig};
pub use error::{EngineError, Result};
pub use grading::{apft_points, IssueCount, SetReport};
pub use pullup::PullupAnalyzer;
pub use pushup::PushupAnalyzer;
pub use session::{ExerciseSession, SessionSummary};
pub use situp::SitupAnalyzer;
pub use types::{
    AnalysisResult, ExerciseState, ExerciseType, FormIssue, Frame, FrameRecord, Landmark, PoseLandmark,
    LANDMARK_COUNT,
};
