use glam::{Mat4, Quat, Vec3};

use crate::stage::Stage;

const DEFAULT_FOV_Y_DEGREES: f32 = 60.0;
const DEFAULT_NEAR: f32 = 0.1;
const DEFAULT_FAR: f32 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0 {
            self.width as f32 / self.height as f32
        } else {
            1.0
        }
    }
}

/// Free camera of the 3D viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorCamera {
    pub position: Vec3,
    pub orientation: Quat,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for EditorCamera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            fov_y_radians: DEFAULT_FOV_Y_DEGREES.to_radians(),
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }
}

impl EditorCamera {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position).inverse()
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_radians, aspect.max(0.0001), self.near, self.far)
    }

    pub fn view_projection(&self, size: ViewportSize) -> Mat4 {
        self.projection_matrix(size.aspect()) * self.view_matrix()
    }
}

/// What the renderer gets to see for one frame.
pub struct RenderFrame<'a> {
    pub camera: &'a EditorCamera,
    pub stage: &'a Stage,
    pub stage_generation: u64,
}

/// Rendering backend driven by the editor session.
pub trait Viewport {
    fn render(&mut self, frame: &RenderFrame<'_>);
    fn resize(&mut self, size: ViewportSize);
    /// Drops cached scene resources, e.g. on "new scene".
    fn clear(&mut self);
}

/// Viewport that draws nothing and records what it was asked to draw.
#[derive(Debug, Default, Clone)]
pub struct HeadlessViewport {
    pub frames_rendered: u64,
    pub last_object_count: usize,
    pub last_generation: u64,
    pub last_camera_position: Vec3,
    pub last_view_projection: Option<Mat4>,
    pub size: Option<ViewportSize>,
    pub clears: u32,
}

impl HeadlessViewport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Viewport for HeadlessViewport {
    fn render(&mut self, frame: &RenderFrame<'_>) {
        self.frames_rendered += 1;
        self.last_object_count = frame.stage.object_count();
        self.last_generation = frame.stage_generation;
        self.last_camera_position = frame.camera.position;
        if let Some(size) = self.size {
            self.last_view_projection = Some(frame.camera.view_projection(size));
        }
    }

    fn resize(&mut self, size: ViewportSize) {
        self.size = Some(size);
    }

    fn clear(&mut self) {
        self.clears += 1;
        self.last_object_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_view_projection_is_finite() {
        let camera = EditorCamera { position: Vec3::new(0.0, 1.0, 5.0), ..EditorCamera::default() };
        let vp = camera.view_projection(ViewportSize::new(1280, 720));
        assert!(!vp.to_cols_array().iter().any(|v| v.is_nan() || v.is_infinite()));
    }

    #[test]
    fn zero_height_viewport_uses_unit_aspect() {
        assert_eq!(ViewportSize::new(640, 0).aspect(), 1.0);
    }

    #[test]
    fn headless_viewport_records_frames() {
        let mut viewport = HeadlessViewport::new();
        viewport.resize(ViewportSize::new(800, 600));
        let camera = EditorCamera::default();
        let stage = Stage::empty();
        viewport.render(&RenderFrame { camera: &camera, stage: &stage, stage_generation: 3 });
        assert_eq!(viewport.frames_rendered, 1);
        assert_eq!(viewport.last_generation, 3);
        assert!(viewport.last_view_projection.is_some());
    }
}
