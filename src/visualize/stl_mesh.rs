//! Loads STL meshes referenced by visuals and converts them for rendering.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use bevy::prelude::Mesh;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;
use nalgebra::Vector3;
use stl_io::read_stl;

use crate::model_error::ModelError;

/// Reads an STL file (ASCII or binary) into a renderable mesh with per-vertex normals.
pub fn load_stl_mesh(path: &Path) -> Result<Mesh, ModelError> {
    let file = File::open(path).map_err(|e| ModelError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let stl = read_stl(&mut reader).map_err(|e| ModelError::io(path, e))?;

    let vertices: Vec<[f32; 3]> = stl.vertices.iter().map(|v| [v[0], v[1], v[2]]).collect();
    let triangles: Vec<[usize; 3]> = stl.faces.iter().map(|face| face.vertices).collect();
    Ok(to_bevy_mesh(vertices, &triangles))
}

fn to_bevy_mesh(vertices: Vec<[f32; 3]>, triangles: &[[usize; 3]]) -> Mesh {
    // Face normals accumulated at shared vertices
    let mut normals = vec![Vector3::<f32>::zeros(); vertices.len()];
    for triangle in triangles {
        let [v0, v1, v2] = triangle.map(|i| Vector3::from(vertices[i]));
        let normal = (v1 - v0).cross(&(v2 - v0));
        for &i in triangle {
            normals[i] += normal;
        }
    }
    let normals: Vec<[f32; 3]> = normals
        .into_iter()
        .map(|n| n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z).into())
        .collect();
    let indices: Vec<u32> = triangles.iter().flatten().map(|&i| i as u32).collect();

    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, vertices);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}
