//! HTML page for the measurement form

use crate::{Measurements, Outcome};

const STYLE: &str = r#"
body { font-family: sans-serif; max-width: 28rem; margin: 3rem auto; color: #222; }
label { display: block; margin-top: 0.8rem; }
input { width: 100%; padding: 0.3rem; }
button { margin-top: 1.2rem; padding: 0.4rem 1.2rem; }
.result { margin-top: 1.5rem; padding: 0.8rem; border-radius: 4px; background: #eef6ee; }
.result.error { background: #f8e8e8; }
"#;

/// Render the form page, with the outcome of the last submission if any
pub fn page(outcome: Option<&Outcome>) -> String {
    let mut fields = String::new();
    for name in Measurements::FIELDS {
        fields.push_str(&format!(
            "    <label for=\"{name}\">{title} (cm)</label>\n    \
             <input type=\"text\" id=\"{name}\" name=\"{name}\" inputmode=\"decimal\" required>\n",
            name = name,
            title = field_title(name),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Iris Classifier</title>
  <style>{style}</style>
</head>
<body>
  <h1>Iris Classifier</h1>
  <form action="/predict" method="post">
{fields}    <button type="submit">Predict</button>
  </form>
{result}</body>
</html>
"#,
        style = STYLE,
        fields = fields,
        result = outcome.map(result_block).unwrap_or_default(),
    )
}

fn result_block(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Prediction { label, confidence } => {
            let confidence = confidence
                .map(|c| format!("<p>Confidence: {:.1}%</p>\n", c))
                .unwrap_or_default();
            format!(
                "  <div class=\"result\">\n  <p>Predicted species: <strong>{}</strong></p>\n  {}  </div>\n",
                escape(label),
                confidence
            )
        }
        Outcome::Failed(_) => format!(
            "  <div class=\"result error\">\n  <p>{}</p>\n  </div>\n",
            escape(&outcome.to_string())
        ),
    }
}

/// "sepal_length" → "Sepal length"
fn field_title(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PredictError;

    #[test]
    fn test_empty_page() {
        let html = page(None);
        assert!(html.contains(r#"<form action="/predict" method="post">"#));
        for name in Measurements::FIELDS {
            assert!(html.contains(&format!("name=\"{}\"", name)));
        }
        assert!(html.contains("Petal width (cm)"));
        assert!(!html.contains("class=\"result"));
    }

    #[test]
    fn test_prediction_with_confidence() {
        let outcome = Outcome::Prediction {
            label: "versicolor".to_string(),
            confidence: Some(97.345),
        };
        let html = page(Some(&outcome));
        assert!(html.contains("<strong>versicolor</strong>"));
        assert!(html.contains("Confidence: 97.3%"));
    }

    #[test]
    fn test_prediction_without_confidence() {
        let outcome = Outcome::Prediction {
            label: "setosa".to_string(),
            confidence: None,
        };
        let html = page(Some(&outcome));
        assert!(html.contains("<strong>setosa</strong>"));
        assert!(!html.contains("Confidence"));
    }

    #[test]
    fn test_error_message() {
        let html = page(Some(&Outcome::Failed(PredictError::MissingField)));
        assert!(html.contains("Error: all measurements are required"));
        assert!(html.contains("result error"));
    }

    #[test]
    fn test_label_escaped() {
        let outcome = Outcome::Prediction {
            label: "<script>alert('x')</script>".to_string(),
            confidence: None,
        };
        let html = page(Some(&outcome));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
    }
}
