use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use riskserve::application::ml::training::{
    ForestParams, TARGET_COLUMN, chronological_split, fit_iris, fit_liquidity, predict_liquidity,
    read_liquidity_csv, regression_report, save_json,
};
use riskserve::config::check_ratio_epsilon;
use riskserve::domain::ml::feature_deriver::FeatureDeriver;
use riskserve::domain::ml::feature_registry::{LIQUIDITY_FEATURES, feature_names};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Train the random forests served by riskserve",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Species classifier on the built-in iris dataset
    Iris {
        /// Path to output model file
        #[arg(long, default_value = "models/iris_model.json")]
        output: PathBuf,

        /// Shuffle seed for the 80/20 split
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Liquidity-ratio regressor from a CSV of raw inputs
    Liquidity {
        /// Path to training data CSV (raw fields plus liquidity_ratio)
        #[arg(long, default_value = "data/liquidity.csv")]
        input: PathBuf,

        /// Path to output model file
        #[arg(long, default_value = "models/liquidity_model.json")]
        output: PathBuf,

        /// Number of trees in the random forest
        #[arg(long, default_value_t = 100)]
        n_trees: usize,

        /// Maximum depth of trees
        #[arg(long, default_value_t = 10)]
        max_depth: u16,

        /// Minimum samples required to split an internal node
        #[arg(long, default_value_t = 5)]
        min_split: usize,

        /// Denominator tolerance for derived ratios; must match the server's RATIO_EPSILON
        #[arg(long, default_value_t = 0.0, value_parser = parse_ratio_epsilon)]
        ratio_epsilon: f64,

        /// Disable train/test split (train on 100% of data). Use after validation.
        #[arg(long)]
        no_split: bool,
    },
}

fn parse_ratio_epsilon(s: &str) -> std::result::Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    check_ratio_epsilon(value).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    match Args::parse().command {
        Command::Iris { output, seed } => train_iris(output, seed),
        Command::Liquidity {
            input,
            output,
            n_trees,
            max_depth,
            min_split,
            ratio_epsilon,
            no_split,
        } => train_liquidity(
            input,
            output,
            ForestParams {
                n_trees,
                max_depth,
                min_split,
            },
            ratio_epsilon,
            no_split,
        ),
    }
}

fn train_iris(output: PathBuf, seed: u64) -> Result<()> {
    info!("Training Random Forest Classifier on iris (seed {})...", seed);
    let training = fit_iris(seed)?;

    println!(
        "Held-out accuracy (train={}, test={}): {:.4}",
        training.train_size, training.test_size, training.accuracy
    );

    save_json(&training.model, &output)?;
    println!("Done. Model saved to {:?}", output);
    Ok(())
}

fn train_liquidity(
    input: PathBuf,
    output: PathBuf,
    params: ForestParams,
    ratio_epsilon: f64,
    no_split: bool,
) -> Result<()> {
    println!("Loading training data from {:?}", input);
    let file =
        File::open(&input).with_context(|| format!("Training data not found at {:?}", input))?;
    let deriver = FeatureDeriver::liquidity(ratio_epsilon);
    let dataset = read_liquidity_csv(BufReader::new(file), &deriver)?;

    if dataset.x.is_empty() {
        anyhow::bail!("No usable rows with a {} target in {:?}", TARGET_COLUMN, input);
    }
    let split = chronological_split(dataset.x.len(), no_split)
        .with_context(|| format!("Not enough training data in {:?}", input))?;
    println!(
        "Loaded {} rows ({} skipped). Features: {:?}",
        dataset.x.len(),
        dataset.skipped,
        feature_names(LIQUIDITY_FEATURES)
    );

    // Chronological split: rows keep their file order
    let (x_train, x_test) = dataset.x.split_at(split);
    let (y_train, y_test) = dataset.y.split_at(split);

    println!(
        "Training Random Forest Regressor (Trees: {}, Depth: {}, MinSplit: {}) on {} samples...",
        params.n_trees,
        params.max_depth,
        params.min_split,
        x_train.len()
    );
    let model = fit_liquidity(x_train, y_train, &params)?;

    if !x_test.is_empty() {
        let predicted = predict_liquidity(&model, x_test)?;
        let report = regression_report(&predicted, y_test);
        println!(
            "OOS Test (n={}): RMSE={:.6}, MAE={:.6}, R²={:.4}",
            x_test.len(),
            report.rmse,
            report.mae,
            report.r2
        );
    }

    save_json(&model, &output)?;
    println!("Done. Model saved to {:?}", output);
    Ok(())
}
