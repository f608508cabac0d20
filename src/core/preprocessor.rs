use crate::core::artifact::ModelArtifact;
use crate::domain::model::{
    FallbackReason, FeatureMap, FeatureValue, PatientInput, PreprocessedVector, SlotProvenance,
    SlotSource,
};
use crate::domain::spec::DomainSpec;
use crate::utils::error::PreprocessError;
use std::sync::Arc;

/// Input ready for exactly one of the two scoring paths.
#[derive(Debug, Clone)]
pub enum Prepared {
    Model {
        vector: PreprocessedVector,
        artifact: Arc<ModelArtifact>,
    },
    Fallback {
        features: FeatureMap,
        reason: FallbackReason,
    },
}

pub fn prepare(
    spec: &DomainSpec,
    input: &PatientInput,
    artifact: Option<Arc<ModelArtifact>>,
) -> Result<Prepared, PreprocessError> {
    match artifact {
        Some(artifact) => {
            let vector = vectorize(spec, input, &artifact)?;
            Ok(Prepared::Model { vector, artifact })
        }
        None => Ok(fallback(input, FallbackReason::NoArtifact)),
    }
}

/// Raw clinical values for the rule scorer. No scaling.
pub fn fallback(input: &PatientInput, reason: FallbackReason) -> Prepared {
    Prepared::Fallback {
        features: input.features().clone(),
        reason,
    }
}

fn encode(spec: &DomainSpec, name: &str, value: &FeatureValue) -> Option<f64> {
    match value {
        FeatureValue::Number(n) => Some(*n),
        FeatureValue::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
        FeatureValue::Category(c) => spec
            .feature(name)
            .and_then(|f| f.ordinal(c))
            .map(|i| i as f64),
    }
}

/// Order, encode, impute, scale and select in the artifact's feature order.
pub fn vectorize(
    spec: &DomainSpec,
    input: &PatientInput,
    artifact: &ModelArtifact,
) -> Result<PreprocessedVector, PreprocessError> {
    let domain = spec.id;
    if let Some(missing) = artifact.missing_transforms().first() {
        return Err(PreprocessError::MissingTransform {
            domain,
            transform: missing.as_str(),
        });
    }

    let scaler = artifact.scaler();
    let selector = artifact.selector();
    let mut values = Vec::with_capacity(artifact.expected_feature_count());
    let mut provenance = Vec::with_capacity(artifact.expected_feature_count());

    for (index, name) in artifact.expected_features().iter().enumerate() {
        if selector.is_some_and(|s| !s.is_selected(index)) {
            continue;
        }

        let observed = input.get(name).and_then(|v| encode(spec, name, v));
        let (raw, source) = match (observed, scaler) {
            (Some(v), _) => (v, SlotSource::Observed),
            (None, Some(scaler)) => (scaler.mean[index], SlotSource::Imputed),
            (None, None) => {
                return Err(PreprocessError::Unimputable {
                    domain,
                    feature: name.clone(),
                })
            }
        };

        let value = match scaler {
            Some(scaler) => scaler.transform_at(index, raw),
            None => raw,
        };
        values.push(value);
        provenance.push(SlotProvenance {
            feature: name.clone(),
            source,
            scaled: scaler.is_some(),
        });
    }

    let expected = artifact.expected_feature_count();
    if values.len() != expected {
        return Err(PreprocessError::WidthMismatch {
            domain,
            expected,
            actual: values.len(),
        });
    }

    Ok(PreprocessedVector {
        domain,
        values,
        provenance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::artifact::{
        ArtifactMetadata, FeatureSelector, LinearClassifier, StandardScaler, TransformKind,
    };
    use crate::domain::model::DomainId;
    use crate::domain::registry::DomainRegistry;

    fn cardio() -> Arc<DomainSpec> {
        DomainRegistry::builtin()
            .unwrap()
            .get(DomainId::Cardiovascular)
            .unwrap()
            .clone()
    }

    fn input(features: &[(&str, FeatureValue)]) -> PatientInput {
        PatientInput::new(
            DomainId::Cardiovascular,
            features
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn artifact(
        spec: &DomainSpec,
        scaler: Option<StandardScaler>,
        selector: Option<FeatureSelector>,
        transforms: Vec<TransformKind>,
        width: usize,
    ) -> ModelArtifact {
        let classifier =
            LinearClassifier::new(vec!["0".into(), "1".into()], vec![vec![0.1; width]], vec![0.0])
                .unwrap();
        let metadata = ArtifactMetadata {
            name: "cad".into(),
            version: "1".into(),
            trained_at: None,
            accuracy: None,
            features: vec!["age".into(), "chestPain".into(), "smoking".into(), "bloodSugar".into()],
            transforms,
        };
        ModelArtifact::new(spec, Arc::new(classifier), scaler, selector, metadata).unwrap()
    }

    #[test]
    fn test_encode_scale_and_impute() {
        let spec = cardio();
        let scaler = StandardScaler {
            mean: vec![50.0, 1.0, 0.5, 100.0],
            scale: vec![10.0, 1.0, 0.5, 20.0],
        };
        let artifact = artifact(&spec, Some(scaler), None, vec![TransformKind::Scaler], 4);
        let input = input(&[
            ("age", FeatureValue::Number(60.0)),
            ("chestPain", FeatureValue::Category("severe".into())),
            ("smoking", FeatureValue::Flag(true)),
        ]);

        let vector = vectorize(&spec, &input, &artifact).unwrap();
        assert_eq!(vector.values, vec![1.0, 2.0, 1.0, 0.0]);
        assert_eq!(vector.provenance[3].source, SlotSource::Imputed);
        assert_eq!(vector.provenance[0].source, SlotSource::Observed);
        assert!(vector.provenance.iter().all(|p| p.scaled));
    }

    #[test]
    fn test_selector_drops_slots() {
        let spec = cardio();
        let selector = FeatureSelector {
            support: vec![true, false, true, false],
        };
        let scaler = StandardScaler {
            mean: vec![0.0; 4],
            scale: vec![1.0; 4],
        };
        let artifact = artifact(
            &spec,
            Some(scaler),
            Some(selector),
            vec![TransformKind::Scaler, TransformKind::Selector],
            2,
        );
        let input = input(&[
            ("age", FeatureValue::Number(70.0)),
            ("chestPain", FeatureValue::Category("none".into())),
            ("smoking", FeatureValue::Flag(false)),
        ]);

        let vector = vectorize(&spec, &input, &artifact).unwrap();
        assert_eq!(vector.values, vec![70.0, 0.0]);
        assert_eq!(vector.provenance[1].feature, "smoking");
    }

    #[test]
    fn test_required_features_without_scaler_stay_raw() {
        let spec = cardio();
        let classifier =
            LinearClassifier::new(vec!["0".into(), "1".into()], vec![vec![0.1; 3]], vec![0.0])
                .unwrap();
        let metadata = ArtifactMetadata {
            name: "cad-raw".into(),
            version: "1".into(),
            trained_at: None,
            accuracy: None,
            features: vec!["age".into(), "chestPain".into(), "smoking".into()],
            transforms: vec![],
        };
        let artifact =
            ModelArtifact::new(&spec, Arc::new(classifier), None, None, metadata).unwrap();
        let input = input(&[
            ("age", FeatureValue::Number(70.0)),
            ("chestPain", FeatureValue::Category("moderate".into())),
            ("smoking", FeatureValue::Flag(true)),
        ]);

        let vector = vectorize(&spec, &input, &artifact).unwrap();
        assert_eq!(vector.values, vec![70.0, 2.0, 1.0]);
        assert!(vector.provenance.iter().all(|p| !p.scaled));
    }

    #[test]
    fn test_missing_declared_transform() {
        let spec = cardio();
        let artifact = artifact(&spec, None, None, vec![TransformKind::Scaler], 4);
        let input = input(&[("age", FeatureValue::Number(70.0))]);

        assert!(matches!(
            prepare(&spec, &input, Some(Arc::new(artifact))),
            Err(PreprocessError::MissingTransform {
                transform: "scaler",
                ..
            })
        ));
    }

    #[test]
    fn test_no_artifact_yields_fallback() {
        let spec = cardio();
        let input = input(&[("age", FeatureValue::Number(70.0))]);
        match prepare(&spec, &input, None).unwrap() {
            Prepared::Fallback { features, reason } => {
                assert_eq!(reason, FallbackReason::NoArtifact);
                assert_eq!(features.get("age"), Some(&FeatureValue::Number(70.0)));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
