//! Provides visualization window with a slider for every joint of the chain.
//!
//! The window shows the visuals of all links at the poses computed by forward kinematics.
//! Moving a slider recomputes the poses. Primitive geometries are generated, STL meshes are
//! read from the directory given when starting the viewer.
//!
//! ```no_run
//! use rs_chain_kinematics::model_file::chain_from_file;
//! use rs_chain_kinematics::visualization;
//!
//! let chain = chain_from_file("src/tests/data/simple_arm.urdf").unwrap();
//! visualization::visualize_chain(chain, "src/tests/data", &[0.0, 45.0]);
//! ```
//!
//! ### Purpose
//! Visualization serves as a verification tool to check that the model is read correctly,
//! rather than as a production feature.

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;
use std::path::PathBuf;

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPlugin};
use tracing::warn;

use crate::camera_controller::{camera_controller_system, CameraController};
use crate::chain::Chain;
use crate::frame::{Geometry, JointType};
use crate::scene::{place_visuals, resolve_mesh_path, PlacedVisual};
use crate::stl_mesh::load_stl_mesh;
use crate::transform::Transform as Pose;

/// Slider position of one joint. Revolute joints are shown in degrees, prismatic in meters.
struct JointControl {
    name: String,
    joint_type: JointType,
    value: f32,
}

impl JointControl {
    fn radians_or_meters(&self) -> f64 {
        match self.joint_type {
            JointType::Revolute => (self.value as f64).to_radians(),
            _ => self.value as f64,
        }
    }
}

/// Joint sliders as shown in the control panel.
#[derive(Resource)]
struct ChainControls {
    joints: Vec<JointControl>,
    changed: bool,
    end_pose: String,
}

impl ChainControls {
    fn values(&self) -> HashMap<String, f64> {
        self.joints.iter().map(|j| (j.name.clone(), j.radians_or_meters())).collect()
    }
}

#[derive(Resource)]
struct ChainScene {
    chain: Chain,
    mesh_dir: PathBuf,
}

/// Marks the entity drawing the `index`-th visual of a link.
#[derive(Component)]
struct LinkVisual {
    link: String,
    index: usize,
}

/// Opens a window showing the chain. `initial_values` are taken in the order of
/// [`Chain::joint_parameter_names`], degrees for revolute joints, meters for prismatic.
/// Missing values are zero. Mesh file names are resolved against `mesh_dir`.
pub fn visualize_chain(chain: Chain, mesh_dir: impl Into<PathBuf>, initial_values: &[f64]) {
    let joints = movable_joints(&chain)
        .into_iter()
        .enumerate()
        .map(|(i, (name, joint_type))| JointControl {
            name,
            joint_type,
            value: initial_values.get(i).copied().unwrap_or(0.0) as f32,
        })
        .collect();

    App::new()
        .add_plugins((DefaultPlugins, EguiPlugin))
        .insert_resource(ChainControls { joints, changed: true, end_pose: String::new() })
        .insert_resource(ChainScene { chain, mesh_dir: mesh_dir.into() })
        .add_systems(Startup, setup)
        .add_systems(Update, (update_chain, camera_controller_system, control_panel))
        .run();
}

/// Distinct movable joint names with the type of the first joint carrying the name.
fn movable_joints(chain: &Chain) -> Vec<(String, JointType)> {
    let names = chain.joint_parameter_names(true);
    names
        .into_iter()
        .map(|name| {
            let joint_type = chain
                .walk()
                .map(|frame| frame.joint())
                .find(|joint| joint.name == name)
                .map(|joint| joint.joint_type)
                .unwrap_or(JointType::Revolute);
            (name, joint_type)
        })
        .collect()
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    scene: Res<ChainScene>,
) {
    let link_material = materials.add(StandardMaterial {
        base_color: Color::srgb(1.0, 1.0, 0.0),
        metallic: 0.7,
        perceptual_roughness: 0.1,
        ..default()
    });

    let mut extent = 0.0f32;
    for (link, visuals) in scene.chain.visuals_map() {
        for (index, visual) in visuals.iter().enumerate() {
            let Some(mesh) = mesh_for(&visual.geometry, &scene, &mut meshes) else {
                continue;
            };
            extent = extent.max(visual.offset.pos.norm() as f32);
            commands.spawn((
                PbrBundle {
                    mesh,
                    material: link_material.clone(),
                    ..default()
                },
                LinkVisual { link: link.to_string(), index },
            ));
        }
    }
    for frame in scene.chain.walk() {
        extent += frame.link().offset.pos.norm() as f32 + frame.joint().offset.pos.norm() as f32;
    }

    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 10000.0,
            ..default()
        },
        transform: Transform::from_xyz(5.0, 8.0, 5.0).looking_at(Vec3::ZERO, Vec3::Z),
        ..default()
    });
    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 10000.0,
            ..default()
        },
        transform: Transform::from_xyz(-5.0, -3.0, -5.0).looking_at(Vec3::ZERO, Vec3::Z),
        ..default()
    });

    let controller = CameraController::framing(Vec3::new(0.0, 0.0, extent * 0.3), extent.max(0.2));
    commands.spawn((
        Camera3dBundle {
            transform: Transform::from_translation(controller.eye()).looking_at(controller.target, Vec3::Z),
            ..default()
        },
        controller,
    ));
}

/// Renderable mesh for the geometry. Cylinders and capsules are generated along Y,
/// [`geometry_frame`] turns them to Z.
fn mesh_for(geometry: &Geometry, scene: &ChainScene, meshes: &mut Assets<Mesh>) -> Option<Handle<Mesh>> {
    let mesh: Mesh = match geometry {
        Geometry::Box { size } => Cuboid::new(size.x as f32, size.y as f32, size.z as f32).into(),
        Geometry::Cylinder { radius, length } => Cylinder::new(*radius as f32, *length as f32).into(),
        Geometry::Sphere { radius } => Sphere::new(*radius as f32).into(),
        Geometry::Capsule { radius, length } => Capsule3d::new(*radius as f32, *length as f32).into(),
        Geometry::Mesh { filename } => {
            let path = resolve_mesh_path(&scene.mesh_dir, filename);
            match load_stl_mesh(&path) {
                Ok(mesh) => mesh,
                Err(err) => {
                    warn!("Mesh {} not shown: {}", path.display(), err);
                    return None;
                }
            }
        }
    };
    Some(meshes.add(mesh))
}

fn geometry_frame(geometry: &Geometry) -> Quat {
    match geometry {
        Geometry::Cylinder { .. } | Geometry::Capsule { .. } => Quat::from_rotation_x(FRAC_PI_2),
        _ => Quat::IDENTITY,
    }
}

fn as_bevy(pose: &Pose) -> (Vec3, Quat) {
    let p = pose.pos.cast::<f32>();
    let q = pose.rot.cast::<f32>();
    (Vec3::new(p.x, p.y, p.z), Quat::from_xyzw(q.i, q.j, q.k, q.w))
}

/// Moves the visuals after a slider has changed.
fn update_chain(
    mut controls: ResMut<ChainControls>,
    scene: Res<ChainScene>,
    mut query: Query<(&LinkVisual, &mut Transform, &mut Visibility)>,
) {
    if !controls.changed {
        return;
    }
    controls.changed = false;

    let values = controls.values();
    let poses = match scene.chain.forward_kinematics(&values) {
        Ok(poses) => poses,
        Err(err) => {
            warn!("Forward kinematics failed: {}", err);
            return;
        }
    };
    if let Some(end) = scene.chain.walk().filter(|frame| frame.is_end()).last() {
        if let Some(pose) = poses.get(&end.link().name) {
            controls.end_pose = format!("{}: {}", end.link().name, crate::utils::format_pose(pose));
        }
    }

    let placed = match place_visuals(&poses, &scene.chain.visuals_map()) {
        Ok(placed) => placed,
        Err(err) => {
            warn!("Visuals not placed: {}", err);
            return;
        }
    };
    let mut by_key: HashMap<(&str, usize), &PlacedVisual> = HashMap::new();
    let mut counters: HashMap<&str, usize> = HashMap::new();
    for visual in &placed {
        let index = counters.entry(visual.link.as_str()).or_insert(0);
        by_key.insert((visual.link.as_str(), *index), visual);
        *index += 1;
    }

    for (marker, mut transform, mut visibility) in query.iter_mut() {
        match by_key.get(&(marker.link.as_str(), marker.index)) {
            Some(visual) => {
                let (translation, rotation) = as_bevy(&visual.pose);
                transform.translation = translation;
                transform.rotation = rotation * geometry_frame(&visual.geometry);
                *visibility = Visibility::Visible;
            }
            None => *visibility = Visibility::Hidden,
        }
    }
}

fn control_panel(mut egui_contexts: EguiContexts, mut controls: ResMut<ChainControls>) {
    let mut changed = false;
    egui::Window::new("Joints").show(egui_contexts.ctx_mut(), |ui| {
        for joint in controls.joints.iter_mut() {
            let (range, unit) = match joint.joint_type {
                JointType::Revolute => (-180.0..=180.0, "°"),
                _ => (-1.0..=1.0, " m"),
            };
            let slider = egui::Slider::new(&mut joint.value, range).suffix(unit).text(joint.name.as_str());
            changed |= ui.add(slider).changed();
        }
        ui.add_space(10.0);
        ui.label(controls.end_pose.as_str());
    });
    if changed {
        controls.changed = true;
    }
}
