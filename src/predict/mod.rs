//! Prediction request handling
//!
//! Validate a submitted form and run it through the loaded model.

pub mod handler;

pub use handler::{handle, PredictForm};
