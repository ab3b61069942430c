//! The form → outcome pipeline behind `POST /predict`

use crate::model::Predictor;
use crate::{Measurements, Outcome, PredictError};

/// Raw form submission, exactly as the browser sent it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictForm {
    pub sepal_length: Option<String>,
    pub sepal_width: Option<String>,
    pub petal_length: Option<String>,
    pub petal_width: Option<String>,
}

impl PredictForm {
    pub fn new(sepal_length: &str, sepal_width: &str, petal_length: &str, petal_width: &str) -> Self {
        PredictForm {
            sepal_length: Some(sepal_length.to_string()),
            sepal_width: Some(sepal_width.to_string()),
            petal_length: Some(petal_length.to_string()),
            petal_width: Some(petal_width.to_string()),
        }
    }

    /// Collect decoded form pairs; a repeated field keeps its first value and
    /// unknown fields are ignored
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut form = PredictForm::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "sepal_length" => &mut form.sepal_length,
                "sepal_width" => &mut form.sepal_width,
                "petal_length" => &mut form.petal_length,
                "petal_width" => &mut form.petal_width,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        form
    }

    fn fields(&self) -> [Option<&str>; 4] {
        [
            self.sepal_length.as_deref(),
            self.sepal_width.as_deref(),
            self.petal_length.as_deref(),
            self.petal_width.as_deref(),
        ]
    }

    /// Trimmed field values, or `MissingField` if any is absent or blank
    fn trimmed(&self) -> Result<[&str; 4], PredictError> {
        let mut out = [""; 4];
        for (slot, field) in out.iter_mut().zip(self.fields()) {
            *slot = field
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or(PredictError::MissingField)?;
        }
        Ok(out)
    }

    /// Validate the submission into a measurement vector
    pub fn measurements(&self) -> Result<Measurements, PredictError> {
        let raw = self.trimmed()?;

        let mut values = [0.0; 4];
        for (v, text) in values.iter_mut().zip(raw) {
            *v = text
                .parse::<f64>()
                .map_err(|_| PredictError::InvalidNumericFormat)?;
        }

        Measurements::checked(values).ok_or(PredictError::OutOfRange)
    }
}

/// Turn one form submission into one outcome
///
/// Never fails: every problem becomes an [`Outcome::Failed`] carrying one of
/// the user-facing [`PredictError`] messages.
pub fn handle(predictor: Option<&Predictor>, form: &PredictForm) -> Outcome {
    let Some(predictor) = predictor else {
        return PredictError::ModelUnavailable.into();
    };

    let x = match form.measurements() {
        Ok(x) => x,
        Err(e) => {
            log::debug!("Rejected submission {:?}: {}", form, e);
            return e.into();
        }
    };

    let label = match predictor.predict(&x) {
        Ok(label) => label,
        Err(e) => {
            log::error!("Prediction failed: {}", e);
            return PredictError::InferenceFailure.into();
        }
    };

    let confidence = match predictor.confidence(&x) {
        Some(Ok(c)) => Some(c),
        Some(Err(e)) => {
            log::debug!("Confidence unavailable: {}", e);
            None
        }
        None => None,
    };

    Outcome::Prediction { label, confidence }
}
