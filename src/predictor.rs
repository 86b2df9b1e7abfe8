use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Single-feature linear model fitted offline and exported as a JSON
/// artifact: `{"coefficient": ..., "intercept": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Predictor {
    coefficient: f64,
    intercept: f64,
}

impl Predictor {
    /// Read the artifact from disk. Loaded per request, so a missing or
    /// corrupt artifact only fails the prediction page.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse model artifact: {}", path.display()))
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.coefficient * x + self.intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_artifact(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_predict_applies_linear_model() {
        let file = write_artifact(r#"{"coefficient": 2.0, "intercept": 1.5}"#);
        let model = Predictor::load(file.path()).unwrap();
        assert_eq!(model.predict(10.0), 21.5);
    }

    #[test]
    fn test_stub_model_renders_expected_value() {
        let file = write_artifact(r#"{"coefficient": 0.0, "intercept": 3.5}"#);
        let model = Predictor::load(file.path()).unwrap();
        let rendered = model.predict(10.0).to_string();
        assert!(rendered.contains("3.5"));
    }

    #[test]
    fn test_missing_artifact_is_an_error() {
        let err = Predictor::load(Path::new("definitely-not-here.json")).unwrap_err();
        assert!(err.to_string().contains("definitely-not-here.json"));
    }

    #[test]
    fn test_corrupt_artifact_is_an_error() {
        let file = write_artifact("not json at all");
        assert!(Predictor::load(file.path()).is_err());
    }
}
