//! Exercise session.
//!
//! Wraps one [`Analyzer`] with the bookkeeping a session controller needs:
//! begin/finish timestamps, frame ordering and the summary record handed to
//! the workout-history store when the session ends. The summary carries the
//! set report (per-rep scores, rejected attempts, issue tallies) and the
//! APFT points earned by the counted reps.

use serde::{Deserialize, Serialize};

use crate::analyzer::{Analyzer, ExerciseAnalyzer};
use crate::config::EngineConfig;
use crate::grading::{apft_points, IssueCount};
use crate::types::{AnalysisResult, ExerciseState, ExerciseType, Frame};

/// Completed-session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub exercise: ExerciseType,
    pub rep_count: u32,
    pub duration_ms: u64,
    pub completed_at_ms: u64,
    /// Mean score of the counted repetitions, absent when none were counted.
    pub average_form_score: Option<u8>,
    pub frames_analyzed: u64,
    pub invalid_frames: u64,
    /// Frames discarded for arriving out of order.
    pub dropped_frames: u64,
    /// Counted plus rejected repetition attempts.
    pub attempted_reps: u32,
    pub rejected_reps: u32,
    /// Form score of each counted repetition, in order.
    pub rep_scores: Vec<u8>,
    pub issue_counts: Vec<IssueCount>,
    /// APFT points for `rep_count`.
    pub apft_points: u8,
}

impl SessionSummary {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A single exercise session driven by a stream of frames.
#[derive(Debug, Clone)]
pub struct ExerciseSession {
    analyzer: Analyzer,
    started_at_ms: Option<u64>,
    last_timestamp_ms: Option<u64>,
    last_result: AnalysisResult,
    frames_analyzed: u64,
    invalid_frames: u64,
    dropped_frames: u64,
}

impl ExerciseSession {
    pub fn new(exercise: ExerciseType, config: &EngineConfig) -> Self {
        Self::with_analyzer(Analyzer::new(exercise, config))
    }

    pub fn with_analyzer(analyzer: Analyzer) -> Self {
        let last_result = AnalysisResult {
            rep_count: analyzer.rep_count(),
            feedback: None,
            state: analyzer.state(),
            confidence: 0.0,
            form_score: 0,
        };
        Self {
            analyzer,
            started_at_ms: None,
            last_timestamp_ms: None,
            last_result,
            frames_analyzed: 0,
            invalid_frames: 0,
            dropped_frames: 0,
        }
    }

    /// Starts (or restarts) the session at `timestamp_ms`.
    pub fn begin(&mut self, timestamp_ms: u64) {
        self.analyzer.start();
        self.started_at_ms = Some(timestamp_ms);
        self.last_timestamp_ms = None;
        self.frames_analyzed = 0;
        self.invalid_frames = 0;
        self.dropped_frames = 0;
        self.last_result = AnalysisResult {
            rep_count: 0,
            feedback: None,
            state: self.analyzer.state(),
            confidence: 0.0,
            form_score: 0,
        };
        log::info!("{} session started at {} ms", self.analyzer.exercise(), timestamp_ms);
    }

    /// Analyzes one frame. Frames older than the last processed one are
    /// dropped and the previous result is returned.
    pub fn process(&mut self, frame: &Frame) -> &AnalysisResult {
        if let Some(last) = self.last_timestamp_ms {
            if frame.timestamp_ms < last {
                log::warn!(
                    "Dropping out-of-order frame at {} ms (last processed {} ms)",
                    frame.timestamp_ms,
                    last
                );
                self.dropped_frames += 1;
                return &self.last_result;
            }
        }

        self.last_timestamp_ms = Some(frame.timestamp_ms);
        if self.started_at_ms.is_none() {
            self.started_at_ms = Some(frame.timestamp_ms);
        }

        self.last_result = self.analyzer.analyze(frame);
        self.frames_analyzed += 1;
        if self.last_result.state == ExerciseState::Invalid {
            self.invalid_frames += 1;
        }
        &self.last_result
    }

    /// Stops counting and returns the session record.
    pub fn finish(&mut self, timestamp_ms: u64) -> SessionSummary {
        self.analyzer.stop();
        let started = self.started_at_ms.unwrap_or(timestamp_ms);
        let exercise = self.analyzer.exercise();
        let rep_count = self.analyzer.rep_count();
        let report = self.analyzer.set_report();
        let summary = SessionSummary {
            exercise,
            rep_count,
            duration_ms: timestamp_ms.saturating_sub(started),
            completed_at_ms: timestamp_ms,
            average_form_score: self.analyzer.average_form_score(),
            frames_analyzed: self.frames_analyzed,
            invalid_frames: self.invalid_frames,
            dropped_frames: self.dropped_frames,
            attempted_reps: report.attempted_reps(),
            rejected_reps: report.rejected_reps,
            rep_scores: report.rep_scores.clone(),
            issue_counts: report.issue_counts.clone(),
            apft_points: apft_points(exercise, rep_count),
        };
        log::info!(
            "{} session finished: {}/{} reps in {} ms, {} APFT points ({} frames, {} invalid, {} dropped)",
            summary.exercise,
            summary.rep_count,
            summary.attempted_reps,
            summary.duration_ms,
            summary.apft_points,
            summary.frames_analyzed,
            summary.invalid_frames,
            summary.dropped_frames
        );
        summary
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn last_result(&self) -> &AnalysisResult {
        &self.last_result
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }
}
