//! Loads a chain from a description file, URDF or MJCF (optional)

use std::fs::read_to_string;
use std::path::Path;

use crate::chain::Chain;
use crate::mjcf::chain_from_mjcf;
use crate::model_error::ModelError;
use crate::urdf::chain_from_urdf;

/// Description formats that can be read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    Urdf,
    Mjcf,
}

impl ModelFormat {
    /// Guess from the file extension, then from the document element (`robot` or `mujoco`).
    pub fn detect(path: &Path, content: &str) -> Option<ModelFormat> {
        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("urdf") => return Some(ModelFormat::Urdf),
            Some("mjcf") => return Some(ModelFormat::Mjcf),
            _ => {}
        }
        let body = content.trim_start();
        let body = strip_prolog(body);
        if body.starts_with("<robot") {
            Some(ModelFormat::Urdf)
        } else if body.starts_with("<mujoco") {
            Some(ModelFormat::Mjcf)
        } else {
            None
        }
    }
}

/// Skips the XML declaration and leading comments.
fn strip_prolog(mut body: &str) -> &str {
    loop {
        let (open, close) = if body.starts_with("<?") {
            ("<?", "?>")
        } else if body.starts_with("<!--") {
            ("<!--", "-->")
        } else {
            return body;
        };
        match body[open.len()..].find(close) {
            Some(end) => body = body[open.len() + end + close.len()..].trim_start(),
            None => return body,
        }
    }
}

fn is_sdf(path: &Path, content: &str) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("sdf"))
        || strip_prolog(content.trim_start()).starts_with("<sdf")
}

/// Reads a chain from a URDF or MJCF file, detecting the format.
///
/// # Errors
/// [`ModelError::InvalidModel`] if the format cannot be recognized, otherwise whatever
/// the reader for the format reports.
pub fn chain_from_file<P: AsRef<Path>>(path: P) -> Result<Chain, ModelError> {
    let path = path.as_ref();
    let content = read_to_string(path).map_err(|e| ModelError::io(path, e))?;
    match ModelFormat::detect(path, &content) {
        Some(ModelFormat::Urdf) => chain_from_urdf(&content),
        Some(ModelFormat::Mjcf) => chain_from_mjcf(&content),
        None if is_sdf(path, &content) => Err(ModelError::InvalidModel(format!(
            "{} is SDF, which is not supported; convert it to URDF", path.display()
        ))),
        None => Err(ModelError::InvalidModel(format!(
            "{} is neither URDF nor MJCF", path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(ModelFormat::detect(Path::new("arm.URDF"), ""), Some(ModelFormat::Urdf));
        assert_eq!(ModelFormat::detect(Path::new("arm.mjcf"), ""), Some(ModelFormat::Mjcf));
    }

    #[test]
    fn test_detect_by_content() {
        let urdf = "<?xml version=\"1.0\"?>\n<!-- generated -->\n<robot name=\"r\"/>";
        assert_eq!(ModelFormat::detect(Path::new("arm.xml"), urdf), Some(ModelFormat::Urdf));
        assert_eq!(ModelFormat::detect(Path::new("ant.xml"), "  <mujoco model=\"ant\"/>"), Some(ModelFormat::Mjcf));
        assert_eq!(ModelFormat::detect(Path::new("x.xml"), "<sdf/>"), None);
        assert_eq!(ModelFormat::detect(Path::new("x.xml"), "<?xml unterminated"), None);
    }

    #[test]
    fn test_sdf_reported_as_unsupported() {
        assert!(is_sdf(Path::new("world.SDF"), ""));
        assert!(is_sdf(Path::new("model.xml"), "<?xml version=\"1.0\"?>\n<sdf version=\"1.6\"/>"));
        assert!(!is_sdf(Path::new("arm.xml"), "<robot/>"));

        let path = std::env::temp_dir().join("rs_chain_kinematics_model.sdf");
        std::fs::write(&path, "<sdf version=\"1.6\"><model name=\"m\"/></sdf>").unwrap();
        let err = chain_from_file(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(&err, ModelError::InvalidModel(msg) if msg.contains("SDF")), "{err}");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(chain_from_file("/nonexistent/robot.urdf"), Err(ModelError::Io { .. })));
    }
}
