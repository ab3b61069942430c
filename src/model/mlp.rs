//! MLP classifier stored as a burn record
//!
//! Architecture: Input(4) → Hidden(hidden_dim) → ReLU → Output(n_classes)
//!
//! The record is read with burn once at startup, then the weights are copied
//! into plain buffers so inference needs no backend and no locking.

use burn::backend::NdArray;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, Recorder};
use burn::tensor::activation::{relu, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::{Classifier, ProbabilisticClassifier};
use crate::{IrisError, Measurements, ModelConfig, Result};

/// Configuration for the MLP model
#[derive(Debug, Clone)]
pub struct IrisNetConfig {
    /// Hidden layer width
    pub hidden_dim: usize,
    /// Number of output classes
    pub num_classes: usize,
}

impl Default for IrisNetConfig {
    fn default() -> Self {
        IrisNetConfig {
            hidden_dim: 16,
            num_classes: 3,
        }
    }
}

impl From<&ModelConfig> for IrisNetConfig {
    fn from(config: &ModelConfig) -> Self {
        IrisNetConfig {
            hidden_dim: config.hidden_dim,
            num_classes: config.classes.len(),
        }
    }
}

/// Two-layer perceptron over the four measurements
#[derive(Module, Debug)]
pub struct IrisNet<B: Backend> {
    hidden: Linear<B>,
    output: Linear<B>,
}

impl<B: Backend> IrisNet<B> {
    pub fn new(device: &B::Device, config: IrisNetConfig) -> Self {
        IrisNet {
            hidden: LinearConfig::new(Measurements::DIM, config.hidden_dim).init(device),
            output: LinearConfig::new(config.hidden_dim, config.num_classes).init(device),
        }
    }

    /// Class logits [batch, num_classes]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.hidden.forward(x));
        self.output.forward(x)
    }

    /// Class probabilities [batch, num_classes]
    pub fn probabilities(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.forward(x), 1)
    }

    /// Save model to file
    pub fn save(&self, path: &str) -> Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.clone().into_record(), path.into())
            .map_err(|e| IrisError::Io(std::io::Error::other(e.to_string())))
    }

    /// Load model from file
    pub fn load(device: &B::Device, path: &str, config: IrisNetConfig) -> Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.into(), device)
            .map_err(|e| model_load_error(path, e))?;

        let model = Self::new(device, config);
        Ok(model.load_record(record))
    }
}

fn model_load_error(path: &str, e: impl std::fmt::Display) -> IrisError {
    IrisError::ModelLoad {
        path: path.to_string(),
        message: e.to_string(),
    }
}

/// Fully connected layer with row-major `[d_in, d_out]` weights
#[derive(Debug, Clone)]
struct Dense {
    weight: Vec<f32>,
    bias: Vec<f32>,
    d_in: usize,
    d_out: usize,
}

impl Dense {
    fn from_linear<B: Backend>(linear: &Linear<B>, d_in: usize, d_out: usize) -> Result<Self> {
        let weight = linear.weight.val();
        let dims = weight.dims();
        if dims != [d_in, d_out] {
            return Err(IrisError::InvalidModel(format!(
                "layer shape {:?}, expected {:?}",
                dims,
                [d_in, d_out]
            )));
        }

        let weight = weight
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| IrisError::InvalidModel(format!("weight data: {:?}", e)))?;
        let bias = match &linear.bias {
            Some(bias) => bias
                .val()
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| IrisError::InvalidModel(format!("bias data: {:?}", e)))?,
            None => vec![0.0; d_out],
        };
        if bias.len() != d_out {
            return Err(IrisError::InvalidModel(format!(
                "bias length {}, expected {}",
                bias.len(),
                d_out
            )));
        }

        Ok(Dense {
            weight,
            bias,
            d_in,
            d_out,
        })
    }

    fn forward(&self, x: &[f32]) -> Vec<f32> {
        debug_assert_eq!(x.len(), self.d_in);
        let mut out = self.bias.clone();
        for (i, xi) in x.iter().enumerate() {
            let row = &self.weight[i * self.d_out..(i + 1) * self.d_out];
            for (o, w) in out.iter_mut().zip(row) {
                *o += xi * w;
            }
        }
        out
    }
}

/// Read-only MLP inference over weights extracted from an [`IrisNet`]
#[derive(Debug, Clone)]
pub struct MlpClassifier {
    hidden: Dense,
    output: Dense,
    classes: Vec<String>,
}

impl MlpClassifier {
    /// Copy the weights out of a burn module
    pub fn from_module<B: Backend>(model: &IrisNet<B>, classes: Vec<String>) -> Result<Self> {
        let num_classes = classes.len();
        if num_classes == 0 {
            return Err(IrisError::InvalidModel("no class labels configured".to_string()));
        }

        let hidden_dim = model.hidden.weight.val().dims()[1];
        let hidden = Dense::from_linear(&model.hidden, Measurements::DIM, hidden_dim)?;
        let output = Dense::from_linear(&model.output, hidden_dim, num_classes)?;

        Ok(MlpClassifier {
            hidden,
            output,
            classes,
        })
    }

    /// Load a burn record written by [`IrisNet::save`]
    pub fn load(path: &str, config: &ModelConfig) -> Result<Self> {
        let device = Default::default();
        let model = IrisNet::<NdArray<f32>>::load(&device, path, IrisNetConfig::from(config))?;

        let dims = model.hidden.weight.val().dims();
        if dims != [Measurements::DIM, config.hidden_dim] {
            return Err(IrisError::InvalidModel(format!(
                "hidden layer shape {:?}, configured {:?}",
                dims,
                [Measurements::DIM, config.hidden_dim]
            )));
        }
        Self::from_module(&model, config.classes.clone())
    }

    fn logits(&self, x: &Measurements) -> Vec<f32> {
        let hidden: Vec<f32> = self
            .hidden
            .forward(&x.to_f32())
            .into_iter()
            .map(|v| v.max(0.0))
            .collect();
        self.output.forward(&hidden)
    }
}

impl Classifier for MlpClassifier {
    fn predict(&self, x: &Measurements) -> Result<String> {
        let logits = self.logits(x);
        if logits.iter().any(|v| !v.is_finite()) {
            return Err(IrisError::Inference(format!(
                "non-finite logits {:?}",
                logits
            )));
        }

        let best = logits
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .ok_or_else(|| IrisError::Inference("model has no outputs".to_string()))?;

        Ok(self.classes[best].clone())
    }

    fn classes(&self) -> Vec<String> {
        self.classes.clone()
    }

    fn kind(&self) -> &'static str {
        "mlp"
    }
}

impl ProbabilisticClassifier for MlpClassifier {
    fn predict_proba(&self, x: &Measurements) -> Result<Vec<f32>> {
        let logits = self.logits(x);
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        if !sum.is_finite() || sum <= 0.0 {
            return Err(IrisError::Inference(format!(
                "degenerate softmax over {:?}",
                logits
            )));
        }
        Ok(exps.into_iter().map(|e| e / sum).collect())
    }
}
