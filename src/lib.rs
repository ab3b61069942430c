//! Iris flower classification behind a web form
//!
//! Four measurements go in through an HTML form, a pre-trained classifier
//! loaded once at startup predicts the species, and the page comes back with
//! the label (and a confidence score when the model can produce one).

pub mod model;
pub mod predict;
pub mod render;
pub mod server;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A validated measurement vector, in centimetres
///
/// Only constructed through [`Measurements::checked`], so every value that
/// reaches a classifier is finite and inside `[MIN_VALUE, MAX_VALUE]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurements {
    sepal_length: f64,
    sepal_width: f64,
    petal_length: f64,
    petal_width: f64,
}

impl Measurements {
    /// Number of features fed to the classifier
    pub const DIM: usize = 4;

    /// Smallest accepted value (inclusive)
    pub const MIN_VALUE: f64 = 0.0;

    /// Largest accepted value (inclusive)
    pub const MAX_VALUE: f64 = 30.0;

    /// Feature names in canonical order, matching the form field names
    pub const FIELDS: [&'static str; 4] =
        ["sepal_length", "sepal_width", "petal_length", "petal_width"];

    /// Build a vector from values in canonical order, rejecting anything
    /// outside the closed sanity range (NaN and infinities included)
    pub fn checked(values: [f64; 4]) -> Option<Self> {
        let in_range = values
            .iter()
            .all(|v| (Self::MIN_VALUE..=Self::MAX_VALUE).contains(v));
        if !in_range {
            return None;
        }

        let [sepal_length, sepal_width, petal_length, petal_width] = values;
        Some(Measurements {
            sepal_length,
            sepal_width,
            petal_length,
            petal_width,
        })
    }

    pub fn sepal_length(&self) -> f64 {
        self.sepal_length
    }

    pub fn sepal_width(&self) -> f64 {
        self.sepal_width
    }

    pub fn petal_length(&self) -> f64 {
        self.petal_length
    }

    pub fn petal_width(&self) -> f64 {
        self.petal_width
    }

    /// Values in canonical order
    pub fn to_array(&self) -> [f64; 4] {
        [
            self.sepal_length,
            self.sepal_width,
            self.petal_length,
            self.petal_width,
        ]
    }

    /// Values in canonical order as `f32`, the precision the models run at
    pub fn to_f32(&self) -> [f32; 4] {
        self.to_array().map(|v| v as f32)
    }
}

/// Why a prediction request could not produce a label
///
/// Each variant maps to exactly one message shown to the user. None of them
/// carries internal detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PredictError {
    #[error("model not available")]
    ModelUnavailable,

    #[error("all measurements are required")]
    MissingField,

    #[error("invalid numeric input")]
    InvalidNumericFormat,

    #[error("input values out of expected range")]
    OutOfRange,

    #[error("prediction failed")]
    InferenceFailure,
}

/// Result of one prediction request, rendered once and discarded
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Prediction {
        label: String,
        /// Highest class probability as a percentage, if the model has one
        confidence: Option<f64>,
    },
    Failed(PredictError),
}

impl Outcome {
    /// The predicted label, if any
    pub fn label(&self) -> Option<&str> {
        match self {
            Outcome::Prediction { label, .. } => Some(label),
            Outcome::Failed(_) => None,
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            Outcome::Prediction { confidence, .. } => *confidence,
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<PredictError> {
        match self {
            Outcome::Failed(e) => Some(*e),
            Outcome::Prediction { .. } => None,
        }
    }
}

impl From<PredictError> for Outcome {
    fn from(e: PredictError) -> Self {
        Outcome::Failed(e)
    }
}

/// The result line shown on the page: the label, or `Error: <message>`
impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Prediction { label, .. } => write!(f, "{}", label),
            Outcome::Failed(e) => write!(f, "Error: {}", e),
        }
    }
}

/// Internal errors, for operators and the CLI
#[derive(Debug, Error)]
pub enum IrisError {
    #[error("Failed to load model from {path}: {message}")]
    ModelLoad { path: String, message: String },

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IrisError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model artifact; the extension selects the format (`.mpk` or `.json`)
    pub path: String,
    /// Hidden layer width of the MLP artifact
    pub hidden_dim: usize,
    /// Class labels in output order of the MLP artifact
    pub classes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                debug: false,
            },
            model: ModelConfig {
                path: "model/iris_tree.json".to_string(),
                hidden_dim: 16,
                classes: vec![
                    "setosa".to_string(),
                    "versicolor".to_string(),
                    "virginica".to_string(),
                ],
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IrisError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| IrisError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| IrisError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `PORT`, `IRIS_DEBUG` and `IRIS_MODEL_PATH` from the process
    /// environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment-style overrides from an arbitrary lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| IrisError::Config(format!("Invalid PORT: {}", port)))?;
        }
        if let Some(debug) = lookup("IRIS_DEBUG") {
            self.server.debug = debug.trim() == "1";
        }
        if let Some(path) = lookup("IRIS_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.path = path;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_closed_range() {
        assert!(Measurements::checked([0.0, 0.0, 0.0, 0.0]).is_some());
        assert!(Measurements::checked([30.0, 30.0, 30.0, 30.0]).is_some());
        assert!(Measurements::checked([5.1, 3.5, -0.0001, 0.2]).is_none());
        assert!(Measurements::checked([5.1, 30.0001, 1.4, 0.2]).is_none());
        assert!(Measurements::checked([f64::NAN, 3.5, 1.4, 0.2]).is_none());
        assert!(Measurements::checked([5.1, 3.5, f64::INFINITY, 0.2]).is_none());
    }

    #[test]
    fn test_canonical_order() {
        let m = Measurements::checked([5.1, 3.5, 1.4, 0.2]).unwrap();
        assert_eq!(m.to_array(), [5.1, 3.5, 1.4, 0.2]);
        assert_eq!(m.sepal_width(), 3.5);
        assert_eq!(m.petal_length(), 1.4);
    }

    #[test]
    fn test_outcome_display() {
        let ok = Outcome::Prediction {
            label: "setosa".to_string(),
            confidence: Some(98.0),
        };
        assert_eq!(ok.to_string(), "setosa");

        let err = Outcome::from(PredictError::OutOfRange);
        assert_eq!(err.to_string(), "Error: input values out of expected range");
        assert_eq!(
            Outcome::from(PredictError::ModelUnavailable).to_string(),
            "Error: model not available"
        );
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.server.port = 8080;
        config.save(path).unwrap();

        assert_eq!(Config::load(path).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "8123"),
            ("IRIS_DEBUG", "1"),
            ("IRIS_MODEL_PATH", "/srv/tree.json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 8123);
        assert!(config.server.debug);
        assert_eq!(config.model.path, "/srv/tree.json");
    }

    #[test]
    fn test_bad_port_rejected() {
        let mut config = Config::default();
        let result = config.apply_overrides(|k| (k == "PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(IrisError::Config(_))));
        assert_eq!(config.server.port, 5000);
    }
}
