//! Pre-trained classifiers and the startup model loader
//!
//! Two artifact kinds are supported:
//! - MLP: burn record (`.mpk`), produces class probabilities
//! - Decision tree: JSON (`.json`), labels only

pub mod mlp;
pub mod tree;

use std::fmt;
use std::path::Path;

use crate::{IrisError, Measurements, ModelConfig, Result};

pub use mlp::{IrisNet, IrisNetConfig, MlpClassifier};
pub use tree::{DecisionTree, TreeNode};

/// Anything that can turn a measurement vector into a class label
pub trait Classifier: Send + Sync {
    /// Predict the class label for one vector
    fn predict(&self, x: &Measurements) -> Result<String>;

    /// Labels this classifier can produce
    fn classes(&self) -> Vec<String>;

    /// Short artifact kind name for diagnostics
    fn kind(&self) -> &'static str;
}

/// A classifier that can also report a probability per class
pub trait ProbabilisticClassifier: Classifier {
    /// Probability distribution over `classes()`, in the same order
    fn predict_proba(&self, x: &Measurements) -> Result<Vec<f32>>;
}

/// The loaded model, with its probability capability fixed at load time
pub enum Predictor {
    Labels(Box<dyn Classifier>),
    Probabilities(Box<dyn ProbabilisticClassifier>),
}

impl Predictor {
    pub fn with_labels(classifier: impl Classifier + 'static) -> Self {
        Predictor::Labels(Box::new(classifier))
    }

    pub fn with_probabilities(classifier: impl ProbabilisticClassifier + 'static) -> Self {
        Predictor::Probabilities(Box::new(classifier))
    }

    pub fn predict(&self, x: &Measurements) -> Result<String> {
        match self {
            Predictor::Labels(c) => c.predict(x),
            Predictor::Probabilities(c) => c.predict(x),
        }
    }

    pub fn has_probabilities(&self) -> bool {
        matches!(self, Predictor::Probabilities(_))
    }

    /// Highest class probability as a percentage
    ///
    /// `None` when the model has no probability capability.
    pub fn confidence(&self, x: &Measurements) -> Option<Result<f64>> {
        match self {
            Predictor::Labels(_) => None,
            Predictor::Probabilities(c) => Some(c.predict_proba(x).and_then(|p| max_percent(&p))),
        }
    }

    pub fn classes(&self) -> Vec<String> {
        match self {
            Predictor::Labels(c) => c.classes(),
            Predictor::Probabilities(c) => c.classes(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Predictor::Labels(c) => c.kind(),
            Predictor::Probabilities(c) => c.kind(),
        }
    }
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor")
            .field("kind", &self.kind())
            .field("probabilities", &self.has_probabilities())
            .finish()
    }
}

fn max_percent(probs: &[f32]) -> Result<f64> {
    let max = probs
        .iter()
        .copied()
        .fold(None, |acc: Option<f32>, p| Some(acc.map_or(p, |a| a.max(p))))
        .ok_or_else(|| IrisError::Inference("empty probability distribution".to_string()))?;

    if !max.is_finite() || probs.iter().any(|p| !p.is_finite()) {
        return Err(IrisError::Inference(format!(
            "non-finite probability in {:?}",
            probs
        )));
    }
    Ok(max as f64 * 100.0)
}

/// Load the model artifact at `path`
///
/// Never fails: a missing or unreadable artifact is logged and yields `None`,
/// and the caller keeps serving without a model.
pub fn load_predictor(path: &str, config: &ModelConfig) -> Option<Predictor> {
    if !Path::new(path).exists() {
        log::error!("Model file not found at: {}", path);
        return None;
    }

    match try_load(path, config) {
        Ok(predictor) => {
            log::info!(
                "Model loaded from {} ({}, {} classes, probabilities: {})",
                path,
                predictor.kind(),
                predictor.classes().len(),
                predictor.has_probabilities()
            );
            Some(predictor)
        }
        Err(e) => {
            log::error!("Failed to load model: {}", e);
            None
        }
    }
}

/// Load the artifact, selecting the format by file extension
pub fn try_load(path: &str, config: &ModelConfig) -> Result<Predictor> {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("mpk") => Ok(Predictor::with_probabilities(MlpClassifier::load(
            path, config,
        )?)),
        Some("json") => Ok(Predictor::with_labels(DecisionTree::load(path)?)),
        _ => Err(IrisError::ModelLoad {
            path: path.to_string(),
            message: "unsupported model format (expected .mpk or .json)".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    struct Fixed;

    impl Classifier for Fixed {
        fn predict(&self, _x: &Measurements) -> Result<String> {
            Ok("setosa".to_string())
        }

        fn classes(&self) -> Vec<String> {
            vec!["setosa".to_string(), "virginica".to_string()]
        }

        fn kind(&self) -> &'static str {
            "fixed"
        }
    }

    impl ProbabilisticClassifier for Fixed {
        fn predict_proba(&self, _x: &Measurements) -> Result<Vec<f32>> {
            Ok(vec![0.25, 0.75])
        }
    }

    fn sample() -> Measurements {
        Measurements::checked([5.1, 3.5, 1.4, 0.2]).unwrap()
    }

    #[test]
    fn test_confidence_capability() {
        let labels = Predictor::with_labels(Fixed);
        assert!(!labels.has_probabilities());
        assert!(labels.confidence(&sample()).is_none());

        let probs = Predictor::with_probabilities(Fixed);
        assert!(probs.has_probabilities());
        let confidence = probs.confidence(&sample()).unwrap().unwrap();
        assert!((confidence - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_percent_rejects_degenerate() {
        assert!(max_percent(&[]).is_err());
        assert!(max_percent(&[0.5, f32::NAN]).is_err());
        assert!((max_percent(&[0.1, 0.9]).unwrap() - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_missing_file() {
        let config = Config::default().model;
        assert!(load_predictor("/nonexistent/iris_model.mpk", &config).is_none());
    }

    #[test]
    fn test_mlp_record_loads_with_probabilities() {
        use burn::backend::NdArray;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iris_model.mpk");
        let path = path.to_str().unwrap();

        let mut config = Config::default().model;
        let device = Default::default();
        IrisNet::<NdArray<f32>>::new(&device, IrisNetConfig::from(&config))
            .save(path)
            .unwrap();

        let predictor = load_predictor(path, &config).unwrap();
        assert_eq!(predictor.kind(), "mlp");
        assert!(predictor.has_probabilities());
        assert!(config.classes.contains(&predictor.predict(&sample()).unwrap()));
        let confidence = predictor.confidence(&sample()).unwrap().unwrap();
        assert!(confidence > 0.0 && confidence <= 100.0);

        config.hidden_dim = 8;
        assert!(load_predictor(path, &config).is_none());
    }

    #[test]
    fn test_default_artifact_loads() {
        let config = Config::default().model;
        let predictor = load_predictor(&config.path, &config).unwrap();
        assert_eq!(predictor.kind(), "decision_tree");
        assert!(!predictor.has_probabilities());
        assert_eq!(predictor.predict(&sample()).unwrap(), "setosa");
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.sav");
        std::fs::write(&path, b"\x80\x04pickle").unwrap();

        let config = Config::default().model;
        let path = path.to_str().unwrap();
        assert!(matches!(
            try_load(path, &config),
            Err(IrisError::ModelLoad { .. })
        ));
        assert!(load_predictor(path, &config).is_none());
    }

    #[test]
    fn test_corrupt_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default().model;

        for name in ["model.mpk", "model.json"] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"not a model").unwrap();
            assert!(load_predictor(path.to_str().unwrap(), &config).is_none());
        }
    }
}
