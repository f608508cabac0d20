use crate::domain::model::{DomainId, RiskBand};
use crate::domain::registry::DomainRegistry;
use crate::domain::spec::BandGuidance;
use crate::utils::error::ConfigError;
use crate::utils::validation::validate_non_empty_string;

fn slot(domain: DomainId, band: RiskBand) -> usize {
    let d = match domain {
        DomainId::Cardiovascular => 0,
        DomainId::BreastCancer => 1,
        DomainId::FetalHealth => 2,
    };
    let b = match band {
        RiskBand::Low => 0,
        RiskBand::Medium => 1,
        RiskBand::High => 2,
    };
    d * RiskBand::ALL.len() + b
}

/// Message and advice for every (domain, band) pair, checked once at start-up.
#[derive(Debug, Clone)]
pub struct RecommendationTable {
    entries: Vec<BandGuidance>,
}

impl RecommendationTable {
    pub fn build(domains: &DomainRegistry) -> Result<Self, ConfigError> {
        let mut entries = Vec::with_capacity(DomainId::ALL.len() * RiskBand::ALL.len());

        for domain in DomainId::ALL {
            let spec = domains
                .get(domain)
                .ok_or(ConfigError::MissingDomain(domain))?;
            for band in RiskBand::ALL {
                let guidance = spec
                    .guidance
                    .get(&band)
                    .ok_or(ConfigError::MissingGuidance { domain, band })?;
                validate_non_empty_string(
                    &format!("{}.guidance.{}.message", domain, band),
                    &guidance.message,
                )?;

                let recommendations: Vec<String> = guidance
                    .recommendations
                    .iter()
                    .map(|r| r.trim())
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect();
                if recommendations.is_empty() {
                    return Err(ConfigError::EmptyRecommendations { domain, band });
                }

                debug_assert_eq!(entries.len(), slot(domain, band));
                entries.push(BandGuidance {
                    message: guidance.message.trim().to_string(),
                    recommendations,
                });
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, domain: DomainId, band: RiskBand) -> &BandGuidance {
        &self.entries[slot(domain, band)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::catalog::DomainCatalog;

    #[test]
    fn test_every_pair_is_covered() {
        let table = RecommendationTable::build(&DomainRegistry::builtin().unwrap()).unwrap();
        for domain in DomainId::ALL {
            for band in RiskBand::ALL {
                let guidance = table.get(domain, band);
                assert!(!guidance.message.is_empty());
                assert!(!guidance.recommendations.is_empty());
            }
        }
        assert!(table
            .get(DomainId::FetalHealth, RiskBand::High)
            .message
            .contains("fetal"));
    }

    #[test]
    fn test_gap_is_config_error() {
        let mut catalog = DomainCatalog::builtin().unwrap();
        catalog.domains[1].guidance.remove(&RiskBand::Medium);
        let registry = DomainRegistry::from_catalog(catalog).unwrap();

        assert!(matches!(
            RecommendationTable::build(&registry),
            Err(ConfigError::MissingGuidance {
                band: RiskBand::Medium,
                ..
            })
        ));
    }

    #[test]
    fn test_blank_recommendations_are_rejected() {
        let mut catalog = DomainCatalog::builtin().unwrap();
        catalog.domains[0]
            .guidance
            .get_mut(&RiskBand::Low)
            .unwrap()
            .recommendations = vec!["  ".to_string()];
        let registry = DomainRegistry::from_catalog(catalog).unwrap();

        assert!(matches!(
            RecommendationTable::build(&registry),
            Err(ConfigError::EmptyRecommendations { .. })
        ));
    }
}
