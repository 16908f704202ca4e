//! Supports reading IK solver settings from a YAML file (optional)

use std::path::Path;

use yaml_rust2::{Yaml, YamlLoader};

use crate::ik::IkConfig;
use crate::model_error::ModelError;

impl IkConfig {
    /// Read the solver settings from YAML file. YAML file like this is supported:
    /// ```yaml
    /// # Solver settings for a 7 DOF arm
    /// max_iterations: 500
    /// gradient_tolerance: 1.0e-12
    /// finite_difference_step: 1.0e-7
    /// max_line_search_steps: 30
    /// ```
    /// All keys are optional, missing ones keep their defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
        Self::from_yaml_str(&contents)
    }

    /// Same as [`IkConfig::from_yaml_file`], reading from a string.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ModelError> {
        let docs = YamlLoader::load_from_str(contents).map_err(|e| ModelError::Parse(e.to_string()))?;
        let mut config = IkConfig::default();
        let Some(doc) = docs.first() else {
            return Ok(config);
        };
        if !matches!(doc, Yaml::Hash(_) | Yaml::Null) {
            return Err(ModelError::Parse("IK configuration must be a mapping".into()));
        }

        if let Some(v) = read_count(doc, "max_iterations", 0)? {
            config.max_iterations = v;
        }
        if let Some(v) = read_positive(doc, "gradient_tolerance")? {
            config.gradient_tolerance = v;
        }
        if let Some(v) = read_positive(doc, "finite_difference_step")? {
            config.finite_difference_step = v;
        }
        if let Some(v) = read_count(doc, "max_line_search_steps", 1)? {
            config.max_line_search_steps = v;
        }
        Ok(config)
    }
}

/// Integers are also accepted where a float is expected, so `1` reads as `1.0`.
fn read_positive(doc: &Yaml, key: &str) -> Result<Option<f64>, ModelError> {
    let value = &doc[key];
    if value.is_badvalue() {
        return Ok(None);
    }
    let number = value
        .as_f64()
        .or_else(|| value.as_i64().map(|i| i as f64))
        .ok_or_else(|| ModelError::Parse(format!("'{}' must be a number", key)))?;
    if !number.is_finite() || number <= 0.0 {
        return Err(ModelError::Parse(format!("'{}' must be positive (got {})", key, number)));
    }
    Ok(Some(number))
}

/// Non-negative integer of at least `minimum`.
fn read_count(doc: &Yaml, key: &str, minimum: usize) -> Result<Option<usize>, ModelError> {
    let value = &doc[key];
    if value.is_badvalue() {
        return Ok(None);
    }
    let number = value
        .as_i64()
        .ok_or_else(|| ModelError::Parse(format!("'{}' must be an integer", key)))?;
    match usize::try_from(number) {
        Ok(count) if count >= minimum => Ok(Some(count)),
        _ => Err(ModelError::Parse(format!("'{}' must be at least {} (got {})", key, minimum, number))),
    }
}
