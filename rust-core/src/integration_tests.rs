/// Integration tests for complete exercise sessions
/// Drives sessions end to end through the public surface: synthetic or
/// recorded frames in, results and summaries out.

#[cfg(test)]
mod integration_tests {
    use crate::analyzer::{Analyzer, ExerciseAnalyzer};
    use crate::config::EngineConfig;
    use crate::session::ExerciseSession;
    use crate::synthetic::*;
    use crate::types::*;

    const FRAME_INTERVAL_MS: u64 = 33;

    /// Helper: push-up reps from lockout to `bottom` and back, 10° per frame.
    fn pushup_set(reps: usize, bottom: f32) -> Vec<f32> {
        let mut angles = Vec::new();
        for _ in 0..reps {
            angles.extend(angle_sweep(170.0, bottom, 10.0));
            angles.extend(angle_sweep(bottom + 10.0, 170.0, 10.0));
        }
        angles
    }

    /// Helper: pull-up reps with each extreme held for three frames.
    fn pullup_set(reps: usize) -> Vec<f32> {
        let mut angles = Vec::new();
        for _ in 0..reps {
            angles.extend([170.0; 3]);
            angles.extend(angle_sweep(160.0, 70.0, 10.0));
            angles.extend([60.0; 3]);
            angles.extend(angle_sweep(70.0, 160.0, 10.0));
        }
        angles.extend([170.0; 3]);
        angles
    }

    /// Helper: sit-up reps with each extreme held for three frames.
    fn situp_set(reps: usize) -> Vec<f32> {
        let mut angles = Vec::new();
        for _ in 0..reps {
            angles.extend([150.0; 3]);
            angles.extend(angle_sweep(140.0, 60.0, 10.0));
            angles.extend([50.0; 3]);
            angles.extend(angle_sweep(60.0, 140.0, 10.0));
        }
        angles
    }

    fn frame_for(exercise: ExerciseType, angle: f32, timestamp_ms: u64) -> Frame {
        match exercise {
            ExerciseType::Pushup => pushup_frame(angle, timestamp_ms),
            ExerciseType::Pullup => pullup_frame(angle, angle <= 90.0, timestamp_ms),
            ExerciseType::Situp => situp_frame(angle, timestamp_ms),
        }
    }

    fn run_session(exercise: ExerciseType, angles: &[f32]) -> (Vec<AnalysisResult>, ExerciseSession) {
        let mut session = ExerciseSession::new(exercise, &EngineConfig::default());
        session.begin(0);
        let results = angles
            .iter()
            .enumerate()
            .map(|(i, &angle)| {
                session
                    .process(&frame_for(exercise, angle, i as u64 * FRAME_INTERVAL_MS))
                    .clone()
            })
            .collect();
        (results, session)
    }

    // ============================================================================
    // FULL SESSIONS
    // ============================================================================

    #[test]
    fn test_pushup_session_end_to_end() {
        let angles = pushup_set(3, 70.0);
        let (results, mut session) = run_session(ExerciseType::Pushup, &angles);

        assert_eq!(results.last().unwrap().rep_count, 3);
        let summary = session.finish(angles.len() as u64 * FRAME_INTERVAL_MS);
        assert_eq!(summary.rep_count, 3);
        assert_eq!(summary.average_form_score, Some(100));
        assert_eq!(summary.frames_analyzed, angles.len() as u64);
    }

    #[test]
    fn test_pullup_session_end_to_end() {
        let (results, mut session) = run_session(ExerciseType::Pullup, &pullup_set(2));
        assert_eq!(results.last().unwrap().rep_count, 2);
        assert_eq!(session.finish(10_000).rep_count, 2);
    }

    #[test]
    fn test_situp_session_end_to_end() {
        let (results, mut session) = run_session(ExerciseType::Situp, &situp_set(2));
        assert_eq!(results.last().unwrap().rep_count, 2);
        assert_eq!(session.finish(10_000).average_form_score, Some(100));
    }

    #[test]
    fn test_shallow_pushups_never_count() {
        let angles = pushup_set(5, 100.0);
        let (results, mut session) = run_session(ExerciseType::Pushup, &angles);
        assert!(results.iter().all(|r| r.rep_count == 0));
        assert!(results.iter().any(|r| r.form_score < 100));

        let summary = session.finish(angles.len() as u64 * FRAME_INTERVAL_MS);
        assert_eq!(summary.rejected_reps, 5);
        assert_eq!(summary.attempted_reps, 5);
        assert_eq!(summary.average_form_score, None);
        assert_eq!(summary.apft_points, 0);
    }

    #[test]
    fn test_shallow_attempts_do_not_penalise_later_reps() {
        for exercise in [ExerciseType::Pushup, ExerciseType::Situp] {
            let mut angles = match exercise {
                ExerciseType::Pushup => pushup_set(2, 100.0),
                _ => {
                    let mut half = vec![150.0; 3];
                    half.extend(angle_sweep(140.0, 80.0, 10.0));
                    half.extend(angle_sweep(90.0, 150.0, 10.0));
                    half
                }
            };
            angles.extend(match exercise {
                ExerciseType::Pushup => pushup_set(2, 70.0),
                _ => situp_set(2),
            });

            let (_, mut session) = run_session(exercise, &angles);
            let summary = session.finish(angles.len() as u64 * FRAME_INTERVAL_MS);
            assert_eq!(summary.rep_count, 2, "{exercise}");
            assert_eq!(summary.rep_scores, vec![100, 100], "{exercise}");
            assert!(summary.rejected_reps >= 1, "{exercise}");
        }
    }

    #[test]
    fn test_summary_apft_points() {
        let angles = pushup_set(12, 70.0);
        let (_, mut session) = run_session(ExerciseType::Pushup, &angles);
        let summary = session.finish(angles.len() as u64 * FRAME_INTERVAL_MS);
        assert_eq!(summary.rep_count, 12);
        assert_eq!(summary.apft_points, crate::grading::apft_points(ExerciseType::Pushup, 12));
        assert_eq!(summary.apft_points, 18);
    }

    // ============================================================================
    // CROSS-EXERCISE PROPERTIES
    // ============================================================================

    #[test]
    fn test_rep_count_monotonic_and_scores_bounded() {
        let sets = [
            (ExerciseType::Pushup, pushup_set(4, 60.0)),
            (ExerciseType::Pullup, pullup_set(4)),
            (ExerciseType::Situp, situp_set(4)),
        ];
        for (exercise, angles) in sets {
            let (results, _) = run_session(exercise, &angles);
            for pair in results.windows(2) {
                assert!(pair[1].rep_count >= pair[0].rep_count, "{exercise} count decreased");
            }
            for result in &results {
                assert!(result.form_score <= 100);
                assert!((0.0..=1.0).contains(&result.confidence));
            }
        }
    }

    #[test]
    fn test_identical_input_gives_identical_output() {
        for exercise in [ExerciseType::Pushup, ExerciseType::Pullup, ExerciseType::Situp] {
            let angles = match exercise {
                ExerciseType::Pushup => pushup_set(2, 70.0),
                ExerciseType::Pullup => pullup_set(2),
                ExerciseType::Situp => situp_set(2),
            };
            let (first, _) = run_session(exercise, &angles);
            let (second, _) = run_session(exercise, &angles);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_unseen_pose_is_invalid_for_every_exercise() {
        for exercise in [ExerciseType::Pushup, ExerciseType::Pullup, ExerciseType::Situp] {
            let mut analyzer = Analyzer::for_exercise(exercise);
            analyzer.start();
            let frame = Frame::empty(0);

            assert!(!analyzer.is_valid_pose(&frame));
            let result = analyzer.analyze(&frame);
            assert_eq!(result.state, ExerciseState::Invalid);
            assert_eq!(result.feedback, None);
            assert_eq!(result.confidence, 0.0);
            assert_eq!(result.rep_count, 0);
        }
    }

    #[test]
    fn test_is_valid_pose_does_not_touch_state() {
        let mut analyzer = Analyzer::for_exercise(ExerciseType::Situp);
        analyzer.start();
        for _ in 0..10 {
            assert!(analyzer.is_valid_pose(&situp_frame(150.0, 0)));
        }
        assert_eq!(analyzer.state(), ExerciseState::Starting);
    }

    #[test]
    fn test_restart_between_exercises() {
        let mut analyzer = Analyzer::for_exercise(ExerciseType::Pushup);
        analyzer.start();
        for (i, angle) in pushup_set(2, 70.0).into_iter().enumerate() {
            analyzer.analyze(&pushup_frame(angle, i as u64 * FRAME_INTERVAL_MS));
        }
        assert_eq!(analyzer.rep_count(), 2);

        analyzer.stop();
        analyzer.start();
        assert_eq!(analyzer.rep_count(), 0);
        assert_eq!(analyzer.state(), ExerciseState::Starting);
    }

    // ============================================================================
    // CONFIGURATION & RECORDED INPUT
    // ============================================================================

    #[test]
    fn test_config_override_changes_counting() {
        let config = EngineConfig::from_toml_str("[pushup]\ndown_angle = 60.0\n").unwrap();
        let mut session = ExerciseSession::new(ExerciseType::Pushup, &config);
        session.begin(0);
        for (i, angle) in pushup_set(2, 70.0).into_iter().enumerate() {
            session.process(&pushup_frame(angle, i as u64 * FRAME_INTERVAL_MS));
        }
        // A 70° bottom is no longer deep enough.
        assert_eq!(session.finish(5_000).rep_count, 0);
    }

    #[test]
    fn test_recorded_frames_replay() {
        let lines: Vec<String> = pushup_set(1, 70.0)
            .into_iter()
            .enumerate()
            .map(|(i, angle)| {
                let frame = pushup_frame(angle, i as u64 * FRAME_INTERVAL_MS);
                let record = FrameRecord {
                    landmarks: frame.landmarks.to_vec(),
                    world_landmarks: Vec::new(),
                    timestamp_ms: frame.timestamp_ms,
                    inference_time_ms: 12,
                    image_width: 640,
                    image_height: 480,
                };
                serde_json::to_string(&record).unwrap()
            })
            .collect();

        let mut session = ExerciseSession::new(ExerciseType::Pushup, &EngineConfig::default());
        session.begin(0);
        for line in &lines {
            let record: FrameRecord = serde_json::from_str(line).unwrap();
            session.process(&Frame::from(record));
        }
        assert_eq!(session.finish(1_000).rep_count, 1);
    }

    #[test]
    fn test_truncated_recording_is_invalid_not_fatal() {
        let frame = pushup_frame(170.0, 0);
        let record = FrameRecord {
            landmarks: frame.landmarks[..11].to_vec(),
            timestamp_ms: 0,
            ..FrameRecord::default()
        };
        assert!(Frame::try_from_slice(&record.landmarks, 0).is_err());

        let mut analyzer = Analyzer::for_exercise(ExerciseType::Pushup);
        analyzer.start();
        assert_eq!(analyzer.analyze(&Frame::from(record)).state, ExerciseState::Invalid);
    }

    #[test]
    fn test_result_serializes_with_snake_case_state() {
        let mut analyzer = Analyzer::for_exercise(ExerciseType::Pushup);
        analyzer.start();
        let result = analyzer.analyze(&pushup_frame(170.0, 0));
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""state":"up""#));
        assert!(json.contains(r#""feedback":null"#));
    }
}
