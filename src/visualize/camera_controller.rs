use bevy::input::mouse::MouseWheel;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;

/// Orbiting camera. The left button rotates, both buttons pan, the wheel zooms.
/// Z is up, as in the kinematic models.
#[derive(Component)]
pub struct CameraController {
    pub zoom_speed: f32,
    pub sensitivity: f32,
    /// Degrees above the XY plane.
    pub pitch: f32,
    /// Degrees about Z.
    pub yaw: f32,
    pub distance: f32,
    pub last_mouse_position: Option<Vec2>,
    pub target: Vec3,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            zoom_speed: 0.5,
            sensitivity: 0.2,
            pitch: 25.0,
            yaw: 30.0,
            distance: 4.0,
            last_mouse_position: None,
            target: Vec3::new(0.0, 0.0, 0.5),
        }
    }
}

impl CameraController {
    /// Camera position for the current yaw, pitch and distance.
    pub fn eye(&self) -> Vec3 {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        self.target + self.distance * Vec3::new(
            yaw.cos() * pitch.cos(),
            yaw.sin() * pitch.cos(),
            pitch.sin(),
        )
    }

    /// Frames a model of the given radius centered at `target`.
    pub fn framing(target: Vec3, radius: f32) -> Self {
        Self {
            target,
            distance: (radius * 3.0).max(0.5),
            ..default()
        }
    }
}

pub fn camera_controller_system(
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut wheel_events: EventReader<MouseWheel>,
    mut query: Query<(&mut Transform, &mut CameraController)>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut egui_contexts: EguiContexts,
) {
    let egui_ctx = egui_contexts.ctx_mut();
    if egui_ctx.wants_pointer_input() || egui_ctx.wants_keyboard_input() {
        wheel_events.clear();
        return;
    }
    let Ok(window) = windows.get_single() else {
        return;
    };
    let left = mouse_buttons.pressed(MouseButton::Left);
    let right = mouse_buttons.pressed(MouseButton::Right);

    for (mut transform, mut controller) in query.iter_mut() {
        if let Some(cursor) = window.cursor_position() {
            if let Some(last) = controller.last_mouse_position {
                let delta = cursor - last;
                if left && right {
                    // Pan in the view plane, scaled with the distance
                    let scale = controller.distance * controller.sensitivity * 0.01;
                    let side = transform.right();
                    let up = transform.up();
                    controller.target += (-delta.x * *side + delta.y * *up) * scale;
                } else if left {
                    controller.yaw -= delta.x * controller.sensitivity;
                    controller.pitch = (controller.pitch + delta.y * controller.sensitivity).clamp(-89.0, 89.0);
                }
            }
            controller.last_mouse_position = if left || right { Some(cursor) } else { None };
        }

        for event in wheel_events.read() {
            controller.distance = (controller.distance * (1.0 - event.y * controller.zoom_speed * 0.1))
                .clamp(0.05, 100.0);
        }

        transform.translation = controller.eye();
        transform.look_at(controller.target, Vec3::Z);
    }
}
