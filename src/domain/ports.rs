use crate::core::artifact::ModelArtifact;
use crate::domain::spec::DomainSpec;
use crate::utils::error::{InferenceError, ModelLoadError};

/// A trained classifier that can score a preprocessed feature vector.
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Class labels in output order.
    fn classes(&self) -> &[String];

    /// Width of the input vector the classifier expects.
    fn n_features(&self) -> usize;

    /// One probability per class, in `classes()` order.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError>;

    fn kind(&self) -> &str;
}

/// Where the model registry gets artifacts from.
pub trait ArtifactSource: Send + Sync {
    fn load(&self, spec: &DomainSpec) -> Result<ModelArtifact, ModelLoadError>;

    /// Human-readable location for logs.
    fn describe(&self, spec: &DomainSpec) -> String;
}
