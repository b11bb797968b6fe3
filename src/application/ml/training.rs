//! Model fitting shared by the `train_ml` tool and the test-suite.
//!
//! Liquidity rows go through the same schema and [`FeatureDeriver`] the
//! server uses, so derived features are computed identically at training and
//! serving time.

use super::smartcore_predictor::{IrisForest, LiquidityForest};
use crate::domain::ml::feature_deriver::FeatureDeriver;
use crate::domain::validation::schema::Schema;
use anyhow::{Context, Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use serde_json::{Map, Value};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// Column holding the regression target in liquidity CSVs
pub const TARGET_COLUMN: &str = "liquidity_ratio";

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_split: 5,
        }
    }
}

impl ForestParams {
    /// Fast settings for tests and smoke runs
    pub fn small() -> Self {
        Self {
            n_trees: 5,
            max_depth: 4,
            min_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionReport {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

pub struct IrisTraining {
    pub model: IrisForest,
    pub train_size: usize,
    pub test_size: usize,
    pub accuracy: f64,
}

/// Labeled liquidity rows after validation and derivation
#[derive(Debug, Default)]
pub struct LiquidityDataset {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
    pub skipped: usize,
}

pub fn fit_liquidity(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Result<LiquidityForest> {
    let matrix = DenseMatrix::from_2d_vec(&x.to_vec()).map_err(|e| anyhow!("Matrix error: {}", e))?;
    let parameters = RandomForestRegressorParameters::default()
        .with_n_trees(params.n_trees)
        .with_max_depth(params.max_depth)
        .with_min_samples_split(params.min_split);

    RandomForestRegressor::fit(&matrix, &y.to_vec(), parameters)
        .map_err(|e| anyhow!("Training error: {}", e))
}

pub fn predict_liquidity(model: &LiquidityForest, x: &[Vec<f64>]) -> Result<Vec<f64>> {
    let matrix = DenseMatrix::from_2d_vec(&x.to_vec()).map_err(|e| anyhow!("Matrix error: {}", e))?;
    model
        .predict(&matrix)
        .map_err(|e| anyhow!("Predict error: {}", e))
}

/// Built-in iris measurements as (rows, class indices)
pub fn load_iris() -> (Vec<Vec<f64>>, Vec<u32>) {
    let dataset = smartcore::dataset::iris::load_dataset();
    let x = dataset
        .data
        .chunks(dataset.num_features)
        .map(|row| row.iter().map(|v| *v as f64).collect())
        .collect();
    let y = dataset.target.iter().map(|class| *class as u32).collect();
    (x, y)
}

/// Shuffled hold-out split of `0..n`, reproducible for a given seed.
/// Returns `(train, test)` indices.
pub fn shuffled_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_size = ((n as f64) * test_fraction.clamp(0.0, 1.0)).round() as usize;
    let test = indices.split_off(n - test_size);
    (indices, test)
}

/// Rows needed so both sides of the 80/20 chronological split are non-empty
pub const MIN_SPLIT_ROWS: usize = 2;

/// Training size for a chronological 80/20 split of `n` rows, or all of them
/// with `no_split`.
pub fn chronological_split(n: usize, no_split: bool) -> Result<usize> {
    if no_split {
        if n == 0 {
            anyhow::bail!("need at least 1 usable row, got 0");
        }
        return Ok(n);
    }
    if n < MIN_SPLIT_ROWS {
        anyhow::bail!(
            "need at least {} usable rows for a train/test split, got {} \
             (use --no-split to train on all)",
            MIN_SPLIT_ROWS,
            n
        );
    }
    Ok((n as f64 * 0.8).floor() as usize)
}

/// Fits a default random forest on iris with an 80/20 split.
pub fn fit_iris(seed: u64) -> Result<IrisTraining> {
    let (x, y) = load_iris();
    let (train_idx, test_idx) = shuffled_split(x.len(), 0.2, seed);

    let pick_x = |idx: &[usize]| idx.iter().map(|&i| x[i].clone()).collect::<Vec<_>>();
    let pick_y = |idx: &[usize]| idx.iter().map(|&i| y[i]).collect::<Vec<u32>>();

    let x_train = DenseMatrix::from_2d_vec(&pick_x(&train_idx))
        .map_err(|e| anyhow!("Matrix error: {}", e))?;
    let model = RandomForestClassifier::fit(
        &x_train,
        &pick_y(&train_idx),
        RandomForestClassifierParameters::default(),
    )
    .map_err(|e| anyhow!("Training error: {}", e))?;

    let x_test =
        DenseMatrix::from_2d_vec(&pick_x(&test_idx)).map_err(|e| anyhow!("Matrix error: {}", e))?;
    let predicted = model
        .predict(&x_test)
        .map_err(|e| anyhow!("Predict error: {}", e))?;

    Ok(IrisTraining {
        model,
        train_size: train_idx.len(),
        test_size: test_idx.len(),
        accuracy: accuracy(&predicted, &pick_y(&test_idx)),
    })
}

pub fn accuracy(predicted: &[u32], actual: &[u32]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let correct = predicted
        .iter()
        .zip(actual.iter())
        .filter(|(p, a)| p == a)
        .count();
    correct as f64 / actual.len() as f64
}

pub fn regression_report(predicted: &[f64], actual: &[f64]) -> RegressionReport {
    let n = predicted.len().min(actual.len());
    if n == 0 {
        return RegressionReport {
            rmse: 0.0,
            mae: 0.0,
            r2: 0.0,
        };
    }

    let pairs = || predicted.iter().zip(actual.iter()).take(n);
    let sq_err: f64 = pairs().map(|(p, t)| (p - t).powi(2)).sum();
    let abs_err: f64 = pairs().map(|(p, t)| (p - t).abs()).sum();
    let mean_y = actual.iter().take(n).sum::<f64>() / n as f64;
    let var_y = actual.iter().take(n).map(|t| (t - mean_y).powi(2)).sum::<f64>() / n as f64;

    let mse = sq_err / n as f64;
    RegressionReport {
        rmse: mse.sqrt(),
        mae: abs_err / n as f64,
        r2: if var_y > 0.0 { 1.0 - mse / var_y } else { 0.0 },
    }
}

/// Reads a liquidity CSV (raw schema columns plus [`TARGET_COLUMN`]).
///
/// Rows that fail validation or lack a numeric target are skipped and counted.
pub fn read_liquidity_csv<R: Read>(
    reader: R,
    deriver: &FeatureDeriver,
) -> Result<LiquidityDataset> {
    let schema = Schema::liquidity();
    let mut rdr = csv::Reader::from_reader(reader);
    let mut dataset = LiquidityDataset::default();

    for (line, record) in rdr.deserialize::<HashMap<String, String>>().enumerate() {
        let record = record.with_context(|| format!("Malformed CSV row {}", line + 1))?;

        let target = record
            .get(TARGET_COLUMN)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite());
        let Some(target) = target else {
            warn!("Row {}: missing or invalid {}", line + 1, TARGET_COLUMN);
            dataset.skipped += 1;
            continue;
        };

        let raw: Map<String, Value> = record
            .into_iter()
            .filter(|(key, _)| key != TARGET_COLUMN)
            .map(|(key, value)| (key, Value::String(value)))
            .collect();

        match schema
            .validate(&raw)
            .and_then(|fields| deriver.derive(&fields))
        {
            Ok(features) => {
                dataset.x.push(features.as_slice().to_vec());
                dataset.y.push(target);
            }
            Err(e) => {
                warn!("Row {}: {}", line + 1, e);
                dataset.skipped += 1;
            }
        }
    }

    Ok(dataset)
}

pub fn save_json<T: Serialize>(model: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let mut file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    serde_json::to_writer(&mut file, model).context("Failed to serialize model")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chronological_split_needs_rows_on_both_sides() {
        let err = chronological_split(1, false).unwrap_err();
        assert!(err.to_string().contains("need at least 2 usable rows"));
        assert!(chronological_split(0, true).is_err());

        assert_eq!(chronological_split(1, true).unwrap(), 1);
        assert_eq!(chronological_split(2, false).unwrap(), 1);
        assert_eq!(chronological_split(10, false).unwrap(), 8);
    }

    #[test]
    fn test_shuffled_split_is_reproducible_and_disjoint() {
        let (train_a, test_a) = shuffled_split(150, 0.2, 42);
        let (train_b, test_b) = shuffled_split(150, 0.2, 42);

        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(train_a.len(), 120);
        assert_eq!(test_a.len(), 30);
        assert!(test_a.iter().all(|i| !train_a.contains(i)));
    }

    #[test]
    fn test_iris_forest_is_accurate() {
        let training = fit_iris(42).unwrap();

        assert_eq!(training.train_size + training.test_size, 150);
        assert!(
            training.accuracy > 0.8,
            "accuracy too low: {}",
            training.accuracy
        );
    }

    #[test]
    fn test_regression_report() {
        let report = regression_report(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(report.rmse, 0.0);
        assert_eq!(report.mae, 0.0);
        assert_eq!(report.r2, 1.0);

        let report = regression_report(&[2.0, 2.0], &[1.0, 3.0]);
        assert_eq!(report.mae, 1.0);
        assert_eq!(report.r2, 0.0);
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[0, 1, 2, 2], &[0, 1, 1, 2]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_read_liquidity_csv_derives_ratio_and_skips_bad_rows() {
        let csv = "\
price,volume_24h,market_cap,change_24h,change_7d,day_of_week,month,liquidity_ratio
40000,25000000000,750000000000,2.5,5.5,0,3,0.0333
0.5,50000,0,-5.0,-15.0,0,1,0.0
1.0,10,100,0,0,9,1,0.1
1.0,10,100,0,0,1,1,
";
        let dataset = read_liquidity_csv(csv.as_bytes(), &FeatureDeriver::liquidity(0.0)).unwrap();

        assert_eq!(dataset.x.len(), 2);
        assert_eq!(dataset.skipped, 2);
        assert!((dataset.x[0][5] - 25e9 / 750e9).abs() < 1e-12);
        assert_eq!(dataset.x[1][5], 0.0);
        assert_eq!(dataset.y, vec![0.0333, 0.0]);
    }
}
