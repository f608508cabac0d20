//! Raw form values to typed [`PatientInput`].
//!
//! Every field is checked and every violation is collected, so a client can
//! fix the whole form in one round trip.

use crate::domain::model::{FeatureMap, FeatureValue, PatientInput};
use crate::domain::spec::{DomainSpec, FeatureKind, FeatureSpec};
use crate::utils::error::{ValidationError, Violation};
use serde_json::{Map, Value};

pub fn validate(
    spec: &DomainSpec,
    raw: &Map<String, Value>,
) -> Result<PatientInput, ValidationError> {
    let mut features = FeatureMap::new();
    let mut violations = Vec::new();

    for feature in &spec.features {
        match check_field(feature, raw.get(&feature.name)) {
            Ok(Some(value)) => {
                features.insert(feature.name.clone(), value);
            }
            Ok(None) => {}
            Err(violation) => violations.push(violation),
        }
    }

    for name in raw.keys() {
        if spec.feature(name).is_none() {
            tracing::debug!(domain = %spec.id, field = %name, "ignoring field not in schema");
        }
    }

    if violations.is_empty() {
        Ok(PatientInput::new(spec.id, features))
    } else {
        Err(ValidationError {
            domain: spec.id.to_string(),
            violations,
        })
    }
}

/// `Ok(None)` means an optional field was left empty.
fn check_field(
    feature: &FeatureSpec,
    value: Option<&Value>,
) -> Result<Option<FeatureValue>, Violation> {
    let value = match value {
        None | Some(Value::Null) => return absent(feature),
        Some(Value::String(s)) if s.trim().is_empty() => return absent(feature),
        Some(v) => v,
    };

    let mismatch = || Violation::TypeMismatch {
        field: feature.name.clone(),
        expected: feature.kind.describe(),
    };

    match &feature.kind {
        FeatureKind::Numeric { min, max } => {
            let number = match value {
                Value::Number(n) => n.as_f64(),
                // form inputs arrive as text
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .filter(|n| n.is_finite())
            .ok_or_else(mismatch)?;

            if number < *min || number > *max {
                return Err(Violation::OutOfRange {
                    field: feature.name.clone(),
                    value: number,
                    min: *min,
                    max: *max,
                });
            }
            Ok(Some(FeatureValue::Number(number)))
        }
        FeatureKind::Categorical { options } => {
            let text = value.as_str().ok_or_else(mismatch)?.trim();
            if options.iter().any(|o| o == text) {
                Ok(Some(FeatureValue::Category(text.to_string())))
            } else {
                Err(Violation::NotAnOption {
                    field: feature.name.clone(),
                    value: text.to_string(),
                    options: options.clone(),
                })
            }
        }
        FeatureKind::Boolean => value
            .as_bool()
            .map(|b| Some(FeatureValue::Flag(b)))
            .ok_or_else(mismatch),
    }
}

fn absent(feature: &FeatureSpec) -> Result<Option<FeatureValue>, Violation> {
    if feature.required {
        Err(Violation::Missing {
            field: feature.name.clone(),
        })
    } else {
        Ok(None)
    }
}
