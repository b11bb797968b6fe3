//! Command-line front end: one liquidity prediction from flags or a preset.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use riskserve::application::ml::PredictionService;
use riskserve::config::Config;
use riskserve::domain::ml::tier_ladder::display_label;
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

const INTERPRETATION: &str = "\
Interpretation:
  - Liquidity Ratio = 24h Volume / Market Cap
  - Higher ratio = Better liquidity = Lower risk
  - Lower ratio = Poor liquidity = Higher risk";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Sample {
    /// High liquidity large cap
    Bitcoin,
    /// Thinly traded small cap
    SmallCap,
}

impl Sample {
    /// price, volume_24h, market_cap, change_24h, change_7d, day_of_week
    fn values(self) -> (f64, f64, f64, f64, f64, i64) {
        match self {
            Sample::Bitcoin => (40000.0, 25e9, 750e9, 2.5, 5.5, 0),
            Sample::SmallCap => (0.50, 50000.0, 1_000_000.0, -5.0, -15.0, 0),
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Predict cryptocurrency liquidity risk", long_about = None)]
struct Args {
    /// Price (USD)
    #[arg(long, value_parser = finite_number)]
    price: Option<f64>,

    /// 24h Volume (USD)
    #[arg(long, value_parser = finite_number)]
    volume_24h: Option<f64>,

    /// Market Cap (USD)
    #[arg(long, value_parser = finite_number)]
    market_cap: Option<f64>,

    /// 24h Price Change (%)
    #[arg(long, allow_hyphen_values = true, value_parser = finite_number)]
    change_24h: Option<f64>,

    /// 7d Price Change (%)
    #[arg(long, allow_hyphen_values = true, value_parser = finite_number)]
    change_7d: Option<f64>,

    /// Day of week, 0 = Monday
    #[arg(long)]
    day_of_week: Option<i64>,

    /// Month, 1-12
    #[arg(long, default_value_t = 1)]
    month: i64,

    /// Start from a preset; explicit flags still override it
    #[arg(long, value_enum)]
    sample: Option<Sample>,

    /// Model artifact to try (repeatable, in order). Defaults to MODEL_PATHS.
    #[arg(long = "model")]
    models: Vec<PathBuf>,
}

/// JSON has no NaN or infinity, so reject them before building the request
fn finite_number(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(value) => Err(format!("must be a finite number, got {}", value)),
        Err(e) => Err(e.to_string()),
    }
}

impl Args {
    fn request(&self) -> Map<String, Value> {
        let (price, volume, cap, change_24h, change_7d, day) = self
            .sample
            .map(Sample::values)
            .unwrap_or((1000.0, 5e7, 1e9, 0.0, 0.0, 0));

        let mut raw = Map::new();
        raw.insert("price".into(), json!(self.price.unwrap_or(price)));
        raw.insert("volume_24h".into(), json!(self.volume_24h.unwrap_or(volume)));
        raw.insert("market_cap".into(), json!(self.market_cap.unwrap_or(cap)));
        raw.insert("change_24h".into(), json!(self.change_24h.unwrap_or(change_24h)));
        raw.insert("change_7d".into(), json!(self.change_7d.unwrap_or(change_7d)));
        raw.insert("day_of_week".into(), json!(self.day_of_week.unwrap_or(day)));
        raw.insert("month".into(), json!(self.month));
        raw
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let candidates = if args.models.is_empty() {
        config.model_paths.clone()
    } else {
        args.models.clone()
    };

    let service = PredictionService::load(&candidates, config.ratio_epsilon, config.tier_ladder);
    let raw = args.request();
    let request = Value::Object(raw.clone());
    info!("Request: {}", request);

    let result = service.predict(&raw)?;

    println!("Predicted Liquidity Ratio: {:.6}", result.raw_prediction);
    println!("Liquidity Risk: {}", display_label(&result.tier));
    println!();
    println!("{}", INTERPRETATION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskserve::domain::validation::schema::Schema;

    #[test]
    fn test_defaults_mirror_form() {
        let args = Args::parse_from(["riskserve"]);
        let raw = args.request();
        assert_eq!(raw["price"], json!(1000.0));
        assert_eq!(raw["volume_24h"], json!(5e7));
        assert_eq!(raw["market_cap"], json!(1e9));
        assert_eq!(raw["day_of_week"], json!(0));
        assert_eq!(raw["month"], json!(1));
    }

    #[test]
    fn test_sample_with_override() {
        let args = Args::parse_from([
            "riskserve",
            "--sample",
            "small-cap",
            "--change-7d",
            "-20",
            "--month",
            "6",
        ]);
        let raw = args.request();
        assert_eq!(raw["price"], json!(0.5));
        assert_eq!(raw["change_24h"], json!(-5.0));
        assert_eq!(raw["change_7d"], json!(-20.0));
        assert_eq!(raw["month"], json!(6));
    }

    #[test]
    fn test_non_finite_flags_are_rejected() {
        for value in ["nan", "NaN", "inf", "-inf"] {
            assert!(
                Args::try_parse_from(["riskserve", "--price", value]).is_err(),
                "--price {}",
                value
            );
            assert!(Args::try_parse_from(["riskserve", "--change-24h", value]).is_err());
        }

        let args = Args::try_parse_from(["riskserve", "--change-24h", "-3.5"]).unwrap();
        assert_eq!(args.request()["change_24h"], json!(-3.5));
    }

    #[test]
    fn test_request_is_valid_liquidity_input() {
        let args = Args::parse_from(["riskserve", "--sample", "bitcoin", "--price", "1e-3"]);
        let raw = args.request();
        let fields = Schema::liquidity().validate(&raw).unwrap();
        assert_eq!(fields.number("price"), Some(1e-3));
        assert!(!Value::Object(raw).to_string().contains("null"));
    }

    #[test]
    fn test_repeatable_model_flag() {
        let args = Args::parse_from(["riskserve", "--model", "a.json", "--model", "b.onnx"]);
        assert_eq!(args.models, vec![PathBuf::from("a.json"), PathBuf::from("b.onnx")]);
    }
}
