//! Drifting Stream Simulation Example
//!
//! Runs both active learners on the same synthetic stream with an abrupt
//! concept drift and compares accuracy against labels spent

use alstream::measurement::measurements_to_json;
use alstream::sim::{
    accuracy, accuracy_between, label_rate, run_simulation, CentroidClassifier, StreamConfig,
};
use alstream::{
    ActiveLearner, AdaptiveThresholdSelfLabeler, AlError, ChunkedEnsembleActiveLearner,
    EnsembleParams, SelfLabelingParams, ThresholdRandomization,
};
use std::fs::{self, File};
use std::io::Write;

fn main() -> Result<(), AlError> {
    println!("Running active learning drifting-stream simulation...\n");

    fs::create_dir_all("out")?;

    let config = StreamConfig {
        steps: 3000,
        num_classes: 3,
        dims: 2,
        sigma_noise: 0.6,
        drift_at: 1500,
        seed: 42,
    };

    let self_labeling_params = SelfLabelingParams {
        budget: 0.1,
        threshold: 1.0,
        confidence: 0.9,
        step: 0.01,
        num_init_instances: 20,
        randomization: ThresholdRandomization::Beta,
        seed: 7,
    };

    let ensemble_params = EnsembleParams {
        budget: 0.1,
        random_threshold: 0.25,
        max_classifiers: 5,
        chunk_size: 250,
        stable_weight: 1.0,
        seed: 7,
    };

    println!("Configuration:");
    println!("  Steps: {}", config.steps);
    println!("  Classes: {}", config.num_classes);
    println!("  Noise sigma: {}", config.sigma_noise);
    println!("  Drift at: {}", config.drift_at);
    println!("  Budget: {}", self_labeling_params.budget);
    println!();

    let classifier = || Box::new(CentroidClassifier::new(config.num_classes, config.dims));

    let mut self_labeler = AdaptiveThresholdSelfLabeler::new(self_labeling_params, classifier())?;
    let mut ensemble = ChunkedEnsembleActiveLearner::new(ensemble_params, classifier())?;

    let self_labeling_steps = run_simulation(&mut self_labeler, &config)?;
    let ensemble_steps = run_simulation(&mut ensemble, &config)?;

    let drift_window_end = config.drift_at + 250;

    println!("METRICS SUMMARY");
    println!("===============");
    println!("\nPrequential Accuracy:");
    println!("  Self-labeling:  {:.4}", accuracy(&self_labeling_steps));
    println!("  Ensemble:       {:.4}", accuracy(&ensemble_steps));

    println!(
        "\nAccuracy in the {} steps after drift:",
        drift_window_end - config.drift_at
    );
    println!(
        "  Self-labeling:  {:.4}",
        accuracy_between(&self_labeling_steps, config.drift_at, drift_window_end)
    );
    println!(
        "  Ensemble:       {:.4}",
        accuracy_between(&ensemble_steps, config.drift_at, drift_window_end)
    );

    println!("\nLabel Rate:");
    println!("  Self-labeling:  {:.4}", label_rate(&self_labeling_steps));
    println!("  Ensemble:       {:.4}", label_rate(&ensemble_steps));
    println!(
        "  Self-labeled points: {}",
        self_labeler.num_self_labeled()
    );

    let outputs = [
        ("out/self_labeling_measurements.json", self_labeler.measurements()),
        ("out/ensemble_measurements.json", ensemble.measurements()),
    ];
    for (path, measurements) in &outputs {
        let mut file = File::create(path)?;
        writeln!(file, "{}", measurements_to_json(measurements)?)?;
        println!("\nMeasurements written to: {}", path);
    }

    let steps_path = "out/ensemble_steps.json";
    fs::write(steps_path, serde_json::to_string(&ensemble_steps)?)?;
    println!("Per-step records written to: {}", steps_path);
    println!("Done!");

    Ok(())
}
