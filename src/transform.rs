use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Rotation order used whenever a quaternion is shown to (or edited by) the user as Euler angles.
pub const DISPLAY_EULER_ORDER: EulerRot = EulerRot::XYZ;

/// Position + orientation of a placed object or a standalone reference point.
///
/// The quaternion is the canonical rotation; Euler angles are only ever derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self { position: Vec3::ZERO, rotation: Quat::IDENTITY }
    }
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::default() }
    }

    /// Rotation as XYZ Euler angles in degrees.
    pub fn euler_degrees(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(DISPLAY_EULER_ORDER);
        Vec3::new(clean_zero(x.to_degrees()), clean_zero(y.to_degrees()), clean_zero(z.to_degrees()))
    }

    pub fn set_euler_degrees(&mut self, degrees: Vec3) {
        self.rotation = Quat::from_euler(
            DISPLAY_EULER_ORDER,
            degrees.x.to_radians(),
            degrees.y.to_radians(),
            degrees.z.to_radians(),
        )
        .normalize();
    }

    pub fn set_position_axis(&mut self, axis: Axis, value: f32) {
        self.position[axis.index()] = value;
    }

    pub fn set_euler_axis(&mut self, axis: Axis, degrees: f32) {
        let mut euler = self.euler_degrees();
        euler[axis.index()] = degrees;
        self.set_euler_degrees(euler);
    }
}

// Keeps "-0" out of the displayed fields.
fn clean_zero(value: f32) -> f32 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Vec3Data {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuatData {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for QuatData {
    fn default() -> Self {
        Quat::IDENTITY.into()
    }
}

/// On-disk form of a [`Transform`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TransformData {
    #[serde(default)]
    pub position: Vec3Data,
    #[serde(default)]
    pub rotation: QuatData,
}

impl From<Vec3> for Vec3Data {
    fn from(value: Vec3) -> Self {
        Self { x: value.x, y: value.y, z: value.z }
    }
}

impl From<Vec3Data> for Vec3 {
    fn from(value: Vec3Data) -> Self {
        Vec3::new(value.x, value.y, value.z)
    }
}

impl From<Quat> for QuatData {
    fn from(value: Quat) -> Self {
        let v = value.normalize();
        Self { x: v.x, y: v.y, z: v.z, w: v.w }
    }
}

impl From<QuatData> for Quat {
    fn from(value: QuatData) -> Self {
        let quat = Quat::from_xyzw(value.x, value.y, value.z, value.w);
        let length_squared = quat.length_squared();
        if !quat.is_finite() || !length_squared.is_finite() || length_squared <= f32::EPSILON {
            Quat::IDENTITY
        } else {
            quat.normalize()
        }
    }
}

impl From<&Transform> for TransformData {
    fn from(value: &Transform) -> Self {
        Self { position: value.position.into(), rotation: value.rotation.into() }
    }
}

impl From<TransformData> for Transform {
    fn from(value: TransformData) -> Self {
        Self { position: value.position.into(), rotation: value.rotation.into() }
    }
}
