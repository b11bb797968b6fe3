use crate::domain::errors::LadderError;
use serde::{Deserialize, Serialize};

pub const LOW_RISK: &str = "LOW_RISK";
pub const MEDIUM_RISK: &str = "MEDIUM_RISK";
pub const HIGH_RISK: &str = "HIGH_RISK";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRung {
    pub threshold: f64,
    pub label: String,
}

/// On-disk shape of a ladder file:
///
/// ```toml
/// floor = "HIGH_RISK"
///
/// [[rungs]]
/// threshold = 0.1
/// label = "LOW_RISK"
/// ```
#[derive(Debug, Deserialize)]
struct LadderFile {
    #[serde(default)]
    rungs: Vec<TierRung>,
    floor: String,
}

/// Maps a scalar score onto ordered categorical tiers.
///
/// Rungs are checked top-down; the first rung whose threshold is strictly
/// below the score wins. A score equal to a threshold therefore falls to the
/// next (stricter) tier, and anything that clears no rung lands on the floor.
#[derive(Debug, Clone, PartialEq)]
pub struct TierLadder {
    rungs: Vec<TierRung>,
    floor: String,
}

impl TierLadder {
    pub fn new(rungs: Vec<TierRung>, floor: impl Into<String>) -> Result<Self, LadderError> {
        let floor = floor.into();

        for (index, rung) in rungs.iter().enumerate() {
            if rung.label.trim().is_empty() {
                return Err(LadderError::EmptyLabel { index });
            }
            if !rung.threshold.is_finite() {
                return Err(LadderError::NonFiniteThreshold {
                    index,
                    value: rung.threshold,
                });
            }
        }
        if floor.trim().is_empty() {
            return Err(LadderError::EmptyLabel { index: rungs.len() });
        }
        for pair in rungs.windows(2) {
            if pair[1].threshold >= pair[0].threshold {
                return Err(LadderError::NotDescending {
                    previous: pair[0].threshold,
                    current: pair[1].threshold,
                });
            }
        }

        Ok(Self { rungs, floor })
    }

    /// 0.1 / 0.01 cut points of the liquidity-ratio model
    pub fn liquidity_default() -> Self {
        Self {
            rungs: vec![
                TierRung {
                    threshold: 0.1,
                    label: LOW_RISK.to_string(),
                },
                TierRung {
                    threshold: 0.01,
                    label: MEDIUM_RISK.to_string(),
                },
            ],
            floor: HIGH_RISK.to_string(),
        }
    }

    /// Parses `"0.1:LOW_RISK,0.01:MEDIUM_RISK"` style rung lists.
    pub fn parse_rungs(text: &str, floor: &str) -> Result<Self, LadderError> {
        let mut rungs = Vec::new();
        for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (threshold, label) = entry.split_once(':').ok_or_else(|| LadderError::Parse {
                reason: format!("expected threshold:label, got '{}'", entry),
            })?;
            let threshold = threshold
                .trim()
                .parse::<f64>()
                .map_err(|e| LadderError::Parse {
                    reason: format!("bad threshold in '{}': {}", entry, e),
                })?;
            rungs.push(TierRung {
                threshold,
                label: label.trim().to_string(),
            });
        }
        Self::new(rungs, floor.trim())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, LadderError> {
        let file: LadderFile = toml::from_str(content).map_err(|e| LadderError::Parse {
            reason: e.to_string(),
        })?;
        Self::new(file.rungs, file.floor)
    }

    pub fn classify(&self, score: f64) -> &str {
        self.rungs
            .iter()
            .find(|rung| score > rung.threshold)
            .map(|rung| rung.label.as_str())
            .unwrap_or(&self.floor)
    }

    pub fn rungs(&self) -> &[TierRung] {
        &self.rungs
    }

    pub fn floor(&self) -> &str {
        &self.floor
    }
}

impl Default for TierLadder {
    fn default() -> Self {
        Self::liquidity_default()
    }
}

/// `"MEDIUM_RISK"` -> `"MEDIUM RISK"`
pub fn display_label(label: &str) -> String {
    label.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_fall_to_stricter_tier() {
        let ladder = TierLadder::liquidity_default();

        assert_eq!(ladder.classify(0.1), MEDIUM_RISK);
        assert_eq!(ladder.classify(0.1000001), LOW_RISK);
        assert_eq!(ladder.classify(0.01), HIGH_RISK);
        assert_eq!(ladder.classify(0.01000001), MEDIUM_RISK);
    }

    #[test]
    fn test_extremes() {
        let ladder = TierLadder::liquidity_default();

        assert_eq!(ladder.classify(5.0), LOW_RISK);
        assert_eq!(ladder.classify(0.05), MEDIUM_RISK);
        assert_eq!(ladder.classify(0.0), HIGH_RISK);
        assert_eq!(ladder.classify(-1.0), HIGH_RISK);
        assert_eq!(ladder.classify(f64::NAN), HIGH_RISK);
    }

    #[test]
    fn test_parse_rungs_matches_default() {
        let ladder =
            TierLadder::parse_rungs("0.1:LOW_RISK, 0.01:MEDIUM_RISK", "HIGH_RISK").unwrap();
        assert_eq!(ladder, TierLadder::liquidity_default());
    }

    #[test]
    fn test_custom_ladder_with_more_tiers() {
        let ladder = TierLadder::parse_rungs("0.9:A,0.5:B,0.2:C", "D").unwrap();
        assert_eq!(ladder.classify(0.95), "A");
        assert_eq!(ladder.classify(0.5), "C");
        assert_eq!(ladder.classify(0.2), "D");
    }

    #[test]
    fn test_rejects_bad_ladders() {
        assert!(matches!(
            TierLadder::parse_rungs("0.01:LOW,0.1:MEDIUM", "HIGH"),
            Err(LadderError::NotDescending { .. })
        ));
        assert!(matches!(
            TierLadder::parse_rungs("0.1:LOW,0.1:MEDIUM", "HIGH"),
            Err(LadderError::NotDescending { .. })
        ));
        assert!(matches!(
            TierLadder::parse_rungs("0.1:", "HIGH"),
            Err(LadderError::EmptyLabel { index: 0 })
        ));
        assert!(matches!(
            TierLadder::parse_rungs("inf:LOW", "HIGH"),
            Err(LadderError::NonFiniteThreshold { .. })
        ));
        assert!(matches!(
            TierLadder::parse_rungs("abc", "HIGH"),
            Err(LadderError::Parse { .. })
        ));
        assert!(matches!(
            TierLadder::parse_rungs("0.1:LOW", " "),
            Err(LadderError::EmptyLabel { index: 1 })
        ));
    }

    #[test]
    fn test_from_toml() {
        let content = r#"
            floor = "HIGH_RISK"

            [[rungs]]
            threshold = 0.1
            label = "LOW_RISK"

            [[rungs]]
            threshold = 0.01
            label = "MEDIUM_RISK"
        "#;

        let ladder = TierLadder::from_toml_str(content).unwrap();
        assert_eq!(ladder, TierLadder::liquidity_default());
        assert!(TierLadder::from_toml_str("rungs = 3").is_err());
    }

    #[test]
    fn test_display_label() {
        assert_eq!(display_label(MEDIUM_RISK), "MEDIUM RISK");
    }
}
