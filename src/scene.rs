//! Boundary to rendering: places the visual primitives of links at their world poses.
//!
//! A renderer needs only the output of [`place_visuals`], which combines a pose map from
//! forward kinematics with the visuals map of the chain. Meshes are limited to what the
//! viewer can load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::frame::{Geometry, Visual};
use crate::kinematics_error::KinematicsError;
use crate::transform::Transform;

/// Mesh file extensions a renderer can load.
pub const SUPPORTED_MESH_EXTENSIONS: [&str; 1] = ["stl"];

/// Visual primitive at its world pose.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedVisual {
    pub link: String,
    /// `link pose ∘ visual offset`.
    pub pose: Transform,
    pub geometry: Geometry,
}

/// Places every visual of every posed link, ordered by link name, then by the order of
/// the visuals of the link. Links without visuals contribute nothing.
///
/// # Errors
/// [`KinematicsError::UnsupportedGeometry`] for a mesh file the renderer cannot load.
pub fn place_visuals(poses: &HashMap<String, Transform>, visuals: &HashMap<&str, &[Visual]>)
                     -> Result<Vec<PlacedVisual>, KinematicsError> {
    let mut links: Vec<&String> = poses.keys().collect();
    links.sort();

    let mut placed = Vec::new();
    for link in links {
        let Some(link_visuals) = visuals.get(link.as_str()) else {
            continue;
        };
        let link_pose = poses[link];
        for visual in link_visuals.iter() {
            check_geometry(&visual.geometry)?;
            placed.push(PlacedVisual {
                link: link.clone(),
                pose: link_pose * visual.offset,
                geometry: visual.geometry.clone(),
            });
        }
    }
    Ok(placed)
}

fn check_geometry(geometry: &Geometry) -> Result<(), KinematicsError> {
    if let Geometry::Mesh { filename } = geometry {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !SUPPORTED_MESH_EXTENSIONS.contains(&extension.as_str()) {
            return Err(KinematicsError::UnsupportedGeometry(format!("mesh file {}", filename)));
        }
    }
    Ok(())
}

/// Location of a mesh file named in a model, `package://` and `file://` prefixes
/// removed, relative to `mesh_dir`.
pub fn resolve_mesh_path(mesh_dir: &Path, filename: &str) -> PathBuf {
    let stripped = filename
        .strip_prefix("package://")
        .or_else(|| filename.strip_prefix("file://"))
        .unwrap_or(filename);
    mesh_dir.join(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn visual(geometry: Geometry, z: f64) -> Visual {
        Visual::new(Transform::from_translation(Vector3::new(0.0, 0.0, z)), geometry)
    }

    #[test]
    fn test_place_visuals() {
        let poses = HashMap::from([
            ("arm".to_string(), Transform::from_translation(Vector3::new(1.0, 0.0, 0.0))),
            ("base".to_string(), Transform::identity()),
            ("bare".to_string(), Transform::identity()),
        ]);
        let arm = vec![visual(Geometry::Sphere { radius: 0.1 }, 0.5), visual(Geometry::Mesh { filename: "arm.STL".into() }, 0.0)];
        let base = vec![visual(Geometry::Box { size: Vector3::new(1.0, 1.0, 0.1) }, 0.0)];
        let visuals: HashMap<&str, &[Visual]> = HashMap::from([
            ("arm", arm.as_slice()),
            ("base", base.as_slice()),
            ("bare", &[][..]),
        ]);

        let placed = place_visuals(&poses, &visuals).unwrap();
        let links: Vec<&str> = placed.iter().map(|p| p.link.as_str()).collect();
        assert_eq!(links, vec!["arm", "arm", "base"]);
        assert!((placed[0].pose.pos - Vector3::new(1.0, 0.0, 0.5)).norm() < 1e-12);
        assert_eq!(placed[1].geometry, Geometry::Mesh { filename: "arm.STL".into() });
    }

    #[test]
    fn test_unsupported_mesh() {
        let poses = HashMap::from([("arm".to_string(), Transform::identity())]);
        let arm = vec![visual(Geometry::Mesh { filename: "arm.dae".into() }, 0.0)];
        let visuals: HashMap<&str, &[Visual]> = HashMap::from([("arm", arm.as_slice())]);
        let err = place_visuals(&poses, &visuals).unwrap_err();
        assert_eq!(err, KinematicsError::UnsupportedGeometry("mesh file arm.dae".into()));
    }

    #[test]
    fn test_resolve_mesh_path() {
        let dir = Path::new("/models");
        assert_eq!(resolve_mesh_path(dir, "package://arm/meshes/a.stl"), PathBuf::from("/models/arm/meshes/a.stl"));
        assert_eq!(resolve_mesh_path(dir, "meshes/a.stl"), PathBuf::from("/models/meshes/a.stl"));
    }
}
