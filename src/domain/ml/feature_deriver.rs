use crate::domain::errors::{FieldViolation, ValidationError};
use crate::domain::ml::feature_registry::{
    FeatureSource, FeatureSpec, FeatureVector, IRIS_FEATURES, LIQUIDITY_FEATURES,
};
use crate::domain::validation::schema::{Schema, ValidatedFields};

/// Assembles validated fields into the fixed-order vector a model expects.
///
/// Ratio features use the same degenerate-denominator rule at training and
/// serving time: when `|denominator| <= ratio_epsilon` the feature is exactly 0.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDeriver {
    layout: &'static [FeatureSpec],
    ratio_epsilon: f64,
}

impl FeatureDeriver {
    pub fn new(layout: &'static [FeatureSpec], ratio_epsilon: f64) -> Self {
        let ratio_epsilon = if ratio_epsilon.is_finite() {
            ratio_epsilon.abs()
        } else {
            0.0
        };
        Self {
            layout,
            ratio_epsilon,
        }
    }

    pub fn liquidity(ratio_epsilon: f64) -> Self {
        Self::new(LIQUIDITY_FEATURES, ratio_epsilon)
    }

    pub fn iris() -> Self {
        Self::new(IRIS_FEATURES, 0.0)
    }

    pub fn ratio(&self, numerator: f64, denominator: f64) -> f64 {
        if !denominator.is_finite() || denominator.abs() <= self.ratio_epsilon {
            return 0.0;
        }
        let value = numerator / denominator;
        if value.is_finite() { value } else { 0.0 }
    }

    /// Every field the layout reads must be a numeric field of `schema`.
    pub fn check_schema(&self, schema: &Schema) -> Result<(), ValidationError> {
        let violations: Vec<FieldViolation> = self
            .input_fields()
            .filter(|name| {
                !schema
                    .field(name)
                    .is_some_and(|field| field.kind.is_numeric())
            })
            .map(FieldViolation::missing)
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }

    pub fn derive(&self, fields: &ValidatedFields) -> Result<FeatureVector, ValidationError> {
        let number = |name: &str| {
            fields
                .number(name)
                .ok_or_else(|| ValidationError::single(FieldViolation::missing(name)))
        };

        let mut values = Vec::with_capacity(self.layout.len());
        for feature in self.layout {
            let value = match feature.source {
                FeatureSource::Field => number(feature.name)?,
                FeatureSource::Ratio {
                    numerator,
                    denominator,
                } => self.ratio(number(numerator)?, number(denominator)?),
            };
            values.push(value);
        }

        FeatureVector::from_values(self.layout, values).ok_or_else(|| {
            ValidationError::single(FieldViolation::type_mismatch(
                "features",
                "feature vector does not match model layout",
            ))
        })
    }

    fn input_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.layout.iter().flat_map(|feature| match feature.source {
            FeatureSource::Field => vec![feature.name],
            FeatureSource::Ratio {
                numerator,
                denominator,
            } => vec![numerator, denominator],
        })
    }
}
