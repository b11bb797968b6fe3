use serde::ser::{Serialize, SerializeMap, Serializer};

/// Where a model input comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSource {
    /// Copied from a validated request field of the same name
    Field,
    /// `numerator / denominator`, zero when the denominator is degenerate
    Ratio {
        numerator: &'static str,
        denominator: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub source: FeatureSource,
}

const fn field(name: &'static str) -> FeatureSpec {
    FeatureSpec {
        name,
        source: FeatureSource::Field,
    }
}

/// Ordered inputs of the liquidity model.
/// This order MUST match exactly with the order used at training time.
/// Any change here is a breaking change for trained artifacts.
pub const LIQUIDITY_FEATURES: &[FeatureSpec] = &[
    field("price"),
    field("volume_24h"),
    field("market_cap"),
    field("change_24h"),
    field("change_7d"),
    FeatureSpec {
        name: "volume_market_ratio",
        source: FeatureSource::Ratio {
            numerator: "volume_24h",
            denominator: "market_cap",
        },
    },
    field("day_of_week"),
    field("month"),
];

/// Ordered inputs of the iris classifier (centimetres).
pub const IRIS_FEATURES: &[FeatureSpec] = &[
    field("sepal_length"),
    field("sepal_width"),
    field("petal_length"),
    field("petal_width"),
];

pub fn feature_names(layout: &[FeatureSpec]) -> Vec<&'static str> {
    layout.iter().map(|feature| feature.name).collect()
}

/// Fixed-order numeric model input.
///
/// Values always line up one-to-one with `layout`; the only way to build one
/// is through a length-checked constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    layout: &'static [FeatureSpec],
    values: Vec<f64>,
}

impl FeatureVector {
    /// Returns `None` when `values` does not match the layout length.
    pub fn from_values(layout: &'static [FeatureSpec], values: Vec<f64>) -> Option<Self> {
        (values.len() == layout.len()).then_some(Self { layout, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Single-precision copy for ONNX inference.
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.layout
            .iter()
            .position(|feature| feature.name == name)
            .map(|idx| self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.layout
            .iter()
            .zip(self.values.iter())
            .map(|(feature, value)| (feature.name, *value))
    }
}

// Serialized as a JSON object whose keys keep the layout order.
impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}
