/// Basic usage example: Feed pose frames, get rep counts and form feedback
use exercise_engine::synthetic::{angle_sweep, pushup_frame, pushup_frame_with};
use exercise_engine::{AnalysisResult, EngineConfig, ExerciseSession, ExerciseType};

fn main() {
    println!("=== Exercise Form Engine: Basic Example ===\n");

    // Create a push-up session with the default thresholds
    let config = EngineConfig::default();
    let mut session = ExerciseSession::new(ExerciseType::Pushup, &config);
    session.begin(0);

    // Simulate a camera feed: two clean reps, one with sagging hips,
    // then a shallow dip that should not count
    let mut frames = Vec::new();
    for hip_drop in [0.0, 0.0, 0.15] {
        for angle in angle_sweep(170.0, 70.0, 10.0).into_iter().chain(angle_sweep(80.0, 170.0, 10.0)) {
            frames.push((angle, hip_drop));
        }
    }
    for angle in angle_sweep(160.0, 110.0, 10.0).into_iter().chain(angle_sweep(120.0, 170.0, 10.0)) {
        frames.push((angle, 0.0));
    }

    println!("Processing {} frames...\n", frames.len());

    let mut last_reps = 0;
    for (i, (angle, hip_drop)) in frames.into_iter().enumerate() {
        let timestamp = i as u64 * 33;
        let result = session.process(&pushup_frame_with(angle, hip_drop, 0.0, timestamp));
        if result.rep_count != last_reps || result.feedback.is_some() {
            print_result(result, timestamp);
        }
        last_reps = result.rep_count;
    }

    // Frames keep coming after the athlete stops; they no longer count
    let summary = session.finish(3_000);
    let after = session.process(&pushup_frame(70.0, 3_100));
    println!("\nAfter finish: state {:?}, reps {}", after.state, after.rep_count);

    println!("\n=== Summary ===");
    println!("Reps: {}", summary.rep_count);
    println!("Duration: {}ms", summary.duration_ms);
    match summary.average_form_score {
        Some(score) => println!("Average form score: {}", score),
        None => println!("Average form score: n/a"),
    }
    println!("Attempts: {} ({} rejected)", summary.attempted_reps, summary.rejected_reps);
    println!("Rep scores: {:?}", summary.rep_scores);
    for entry in &summary.issue_counts {
        println!("  {:?}: {}", entry.issue, entry.count);
    }
    println!("APFT points: {}", summary.apft_points);
    match summary.to_json() {
        Ok(json) => println!("Record: {}", json),
        Err(err) => eprintln!("Failed to serialize summary: {}", err),
    }
}

fn print_result(result: &AnalysisResult, timestamp: u64) {
    println!(
        "[{:>5}ms] {:?} reps={} score={} confidence={:.2} {}",
        timestamp,
        result.state,
        result.rep_count,
        result.form_score,
        result.confidence,
        result.feedback.as_deref().unwrap_or("")
    );
}
