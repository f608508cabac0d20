use crate::domain::model::DomainId;
use crate::domain::spec::{DomainSpec, FeatureKind, Predicate};
use crate::utils::error::ConfigError;
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../../config/domains.toml");

/// Static domain configuration: schemas, thresholds, rules, guidance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainCatalog {
    pub domains: Vec<DomainSpec>,
}

impl DomainCatalog {
    /// 內建的三個領域設定
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(BUILTIN_CATALOG, "builtin catalog")
    }

    /// 從 TOML 檔案載入
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content, &path.as_ref().display().to_string())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "inline catalog")
    }

    fn parse(content: &str, source_name: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }

    fn validate_domain(spec: &DomainSpec) -> Result<(), ConfigError> {
        let prefix = spec.id.as_str();

        validate_non_empty_string(&format!("{}.display_name", prefix), &spec.display_name)?;
        validate_range(
            &format!("{}.thresholds.low_max", prefix),
            spec.thresholds.low_max,
            0.0,
            100.0,
        )?;
        validate_range(
            &format!("{}.thresholds.medium_max", prefix),
            spec.thresholds.medium_max,
            spec.thresholds.low_max,
            100.0,
        )?;

        if spec.features.is_empty() {
            return Err(ConfigError::MissingConfigError {
                field: format!("{}.features", prefix),
            });
        }

        let mut seen = HashSet::new();
        for feature in &spec.features {
            let field = format!("{}.features.{}", prefix, feature.name);
            validate_non_empty_string(&field, &feature.name)?;
            if !seen.insert(feature.name.as_str()) {
                return Err(invalid(&field, &feature.name, "duplicate feature name"));
            }
            match &feature.kind {
                FeatureKind::Numeric { min, max } => {
                    if !(min.is_finite() && max.is_finite() && min <= max) {
                        return Err(invalid(
                            &field,
                            &format!("[{}, {}]", min, max),
                            "numeric range must be finite with min <= max",
                        ));
                    }
                }
                FeatureKind::Categorical { options } => {
                    if options.is_empty() {
                        return Err(invalid(&field, "[]", "categorical feature needs options"));
                    }
                }
                FeatureKind::Boolean => {}
            }
        }

        for label in spec.labels.keys() {
            validate_non_empty_string(&format!("{}.labels", prefix), label)?;
        }

        validate_range(
            &format!("{}.fallback.baseline", prefix),
            spec.fallback.baseline,
            0.0,
            100.0,
        )?;
        for rule in &spec.fallback.rules {
            Self::validate_rule(spec, &rule.name, &rule.when, rule.delta)?;
        }

        Ok(())
    }

    fn validate_rule(
        spec: &DomainSpec,
        rule: &str,
        predicate: &Predicate,
        delta: f64,
    ) -> Result<(), ConfigError> {
        let field = format!("{}.fallback.rules.{}", spec.id, rule);
        if !delta.is_finite() {
            return Err(invalid(&field, &delta.to_string(), "delta must be finite"));
        }

        let feature = spec.feature(predicate.feature()).ok_or_else(|| {
            invalid(&field, predicate.feature(), "rule refers to an unknown feature")
        })?;

        let compatible = match (predicate, &feature.kind) {
            (Predicate::Range { gt, gte, lt, lte, .. }, FeatureKind::Numeric { .. }) => {
                gt.is_some() || gte.is_some() || lt.is_some() || lte.is_some()
            }
            (Predicate::Equals { value, .. }, FeatureKind::Categorical { options }) => {
                options.contains(value)
            }
            (Predicate::IsTrue { .. }, FeatureKind::Boolean) => true,
            _ => false,
        };

        if compatible {
            Ok(())
        } else {
            Err(invalid(
                &field,
                predicate.feature(),
                "predicate does not match the feature kind or options",
            ))
        }
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl Validate for DomainCatalog {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for spec in &self.domains {
            if !seen.insert(spec.id) {
                return Err(ConfigError::DuplicateDomain(spec.id));
            }
            Self::validate_domain(spec)?;
        }

        for id in DomainId::ALL {
            if !seen.contains(&id) {
                return Err(ConfigError::MissingDomain(id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = DomainCatalog::builtin().unwrap();
        assert_eq!(catalog.domains.len(), 3);
        catalog.validate().unwrap();
    }

    #[test]
    fn test_rule_on_unknown_feature_is_rejected() {
        let mut catalog = DomainCatalog::builtin().unwrap();
        let spec = catalog
            .domains
            .iter_mut()
            .find(|d| d.id == DomainId::FetalHealth)
            .unwrap();
        spec.fallback.rules[0].when = Predicate::IsTrue {
            feature: "heartbeat".to_string(),
        };

        let err = catalog.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_equals_rule_must_name_an_option() {
        let mut catalog = DomainCatalog::builtin().unwrap();
        let spec = catalog
            .domains
            .iter_mut()
            .find(|d| d.id == DomainId::Cardiovascular)
            .unwrap();
        let rule = spec
            .fallback
            .rules
            .iter_mut()
            .find(|r| matches!(r.when, Predicate::Equals { .. }))
            .unwrap();
        rule.when = Predicate::Equals {
            feature: "chestPain".to_string(),
            value: "Şiddetli".to_string(),
        };

        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_inverted_thresholds_are_rejected() {
        let mut catalog = DomainCatalog::builtin().unwrap();
        catalog.domains[0].thresholds.low_max = 80.0;
        catalog.domains[0].thresholds.medium_max = 40.0;
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_missing_domain_is_rejected() {
        let mut catalog = DomainCatalog::builtin().unwrap();
        catalog.domains.retain(|d| d.id != DomainId::BreastCancer);
        assert!(matches!(
            catalog.validate(),
            Err(ConfigError::MissingDomain(DomainId::BreastCancer))
        ));
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = DomainCatalog::from_toml_str("domains = 3").unwrap_err();
        match err {
            ConfigError::ParseError { source_name, .. } => {
                assert_eq!(source_name, "inline catalog")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
