//! First-person camera driven by horizontal and vertical look angles, with
//! optional stereoscopic eye views.

use std::f32::consts::{PI, TAU};

use blockview_voxel::{SnapshotError, SnapshotReader, SnapshotWriter};
use glam::{Mat3, Mat4, Vec3};

/// Margin keeping the vertical angle away from the poles.
const POLE_EPSILON: f32 = 1e-4;
pub const NEAR_PLANE: f32 = 0.01;
pub const FAR_PLANE: f32 = 10_000.0;
pub const MIN_ZOOM: f32 = 2.0;
pub const MAX_ZOOM: f32 = 135.0;
pub const DEFAULT_ZOOM: f32 = 60.0;
pub const MIN_FOCAL_DISTANCE: f32 = 0.01;

/// Projection applied after the view transform.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewType {
    /// No projection; view space is passed through.
    Orthogonal = 0,
    Perspective = 1,
}

impl ViewType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Orthogonal),
            1 => Some(Self::Perspective),
            _ => None,
        }
    }
}

/// Which eye a scene pass is rendered for. The discriminant is the shader's eye tag.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StereoMode {
    Normal = 0,
    LeftEye = 1,
    RightEye = 2,
}

/// Matrices and placement for one scene pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EyeView {
    pub mode: StereoMode,
    pub position: Vec3,
    pub target: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
}

/// Player camera.
///
/// The vertical angle ranges over `(-1, 1)` for straight down to straight up and
/// the horizontal angle over `[0, 2π)`.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerCamera {
    position: Vec3,
    vertical_angle: f32,
    horizontal_angle: f32,
    direction: Vec3,
    right: Vec3,
    heading: Vec3,
    pub view_type: ViewType,
    focal_distance: f32,
    field_of_view: f32,
    pub eye_separation: f32,
    pub stereoscopic: bool,
    pub fixed_focus: bool,
    aspect_ratio: f32,
}

impl Default for PlayerCamera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 0.0, 0.0)
    }
}

impl PlayerCamera {
    pub fn new(position: Vec3, horizontal_angle: f32, vertical_angle: f32) -> Self {
        let mut camera = Self {
            position,
            vertical_angle: 0.0,
            horizontal_angle: 0.0,
            direction: Vec3::X,
            right: Vec3::Z,
            heading: Vec3::X,
            view_type: ViewType::Perspective,
            focal_distance: 10.0,
            field_of_view: DEFAULT_ZOOM,
            eye_separation: 0.1,
            stereoscopic: false,
            fixed_focus: false,
            aspect_ratio: 1.0,
        };
        camera.set_vertical_angle(vertical_angle);
        camera.set_horizontal_angle(horizontal_angle);
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit view direction.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Unit vector pointing to the viewer's right.
    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Horizontal component of the view direction.
    pub fn heading(&self) -> Vec3 {
        self.heading
    }

    pub fn vertical_angle(&self) -> f32 {
        self.vertical_angle
    }

    pub fn horizontal_angle(&self) -> f32 {
        self.horizontal_angle
    }

    pub fn focal_distance(&self) -> f32 {
        self.focal_distance
    }

    /// Vertical field of view in degrees.
    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn set_vertical_angle(&mut self, angle: f32) {
        self.vertical_angle = angle.clamp(POLE_EPSILON - 1.0, 1.0 - POLE_EPSILON);
        self.update_directions();
    }

    pub fn set_horizontal_angle(&mut self, angle: f32) {
        self.horizontal_angle = (angle + TAU).rem_euclid(TAU);
        self.update_directions();
    }

    fn update_directions(&mut self) {
        let yaw = Mat3::from_rotation_y(self.horizontal_angle);
        self.direction =
            (yaw * Mat3::from_rotation_z(self.vertical_angle * PI / 2.0) * Vec3::X).normalize();
        let back = -self.direction;
        self.right = Vec3::Y.cross(back).normalize();
        self.heading = yaw * Vec3::X;
    }

    /// Tilt the view up by `degrees`; 90 degrees spans from level to straight up.
    pub fn rotate_up(&mut self, degrees: f32) {
        self.set_vertical_angle(self.vertical_angle + degrees / 90.0);
    }

    pub fn rotate_down(&mut self, degrees: f32) {
        self.rotate_up(-degrees);
    }

    pub fn rotate_left(&mut self, degrees: f32) {
        self.set_horizontal_angle(self.horizontal_angle + degrees.to_radians());
    }

    pub fn rotate_right(&mut self, degrees: f32) {
        self.rotate_left(-degrees);
    }

    /// Move along the horizontal heading, keeping height.
    pub fn move_forwards(&mut self, distance: f32) {
        self.position += self.heading * distance;
    }

    pub fn move_backwards(&mut self, distance: f32) {
        self.move_forwards(-distance);
    }

    pub fn move_right(&mut self, distance: f32) {
        self.position += self.right * distance;
    }

    pub fn move_left(&mut self, distance: f32) {
        self.move_right(-distance);
    }

    pub fn move_up(&mut self, distance: f32) {
        self.position += Vec3::Y * distance;
    }

    pub fn move_down(&mut self, distance: f32) {
        self.move_up(-distance);
    }

    pub fn move_to(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn reset_angles(&mut self) {
        self.set_vertical_angle(0.0);
        self.set_horizontal_angle(0.0);
    }

    pub fn set_focus(&mut self, distance: f32) {
        self.focal_distance = distance.max(MIN_FOCAL_DISTANCE);
    }

    /// Set the field of view in degrees, clamped to the zoom range.
    pub fn set_zoom(&mut self, degrees: f32) {
        self.field_of_view = degrees.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn reset_zoom(&mut self) {
        self.set_zoom(DEFAULT_ZOOM);
    }

    /// Per-frame update with the output's aspect ratio.
    pub fn update(&mut self, aspect_ratio: f32) {
        if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            self.aspect_ratio = aspect_ratio;
        }
    }

    /// Point the stereo eyes converge on.
    pub fn focus_point(&self) -> Vec3 {
        self.position + self.direction * self.focal_distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.direction, Vec3::Y)
    }

    /// Reverse-Z perspective, or identity for [`ViewType::Orthogonal`].
    pub fn projection_matrix(&self) -> Mat4 {
        match self.view_type {
            ViewType::Perspective => Mat4::perspective_rh(
                self.field_of_view.to_radians(),
                self.aspect_ratio,
                FAR_PLANE,
                NEAR_PLANE,
            ),
            ViewType::Orthogonal => Mat4::IDENTITY,
        }
    }

    /// View for a single pass.
    ///
    /// Eye views are offset by half the eye separation along the right vector and
    /// converge on [`focus_point`](Self::focus_point).
    pub fn eye(&self, mode: StereoMode) -> EyeView {
        let (position, target) = match mode {
            StereoMode::Normal => (self.position, self.position + self.direction),
            StereoMode::LeftEye => (
                self.position - self.right * (self.eye_separation / 2.0),
                self.focus_point(),
            ),
            StereoMode::RightEye => (
                self.position + self.right * (self.eye_separation / 2.0),
                self.focus_point(),
            ),
        };
        EyeView {
            mode,
            position,
            target,
            view: Mat4::look_at_rh(position, target, Vec3::Y),
            projection: self.projection_matrix(),
        }
    }

    /// The passes a frame needs: one normal view, or left then right eye.
    pub fn eye_views(&self) -> Vec<EyeView> {
        if self.stereoscopic {
            vec![self.eye(StereoMode::LeftEye), self.eye(StereoMode::RightEye)]
        } else {
            vec![self.eye(StereoMode::Normal)]
        }
    }

    /// Append the camera record.
    pub fn write(&self, w: &mut SnapshotWriter) {
        w.put_i32(self.view_type as i32);
        w.put_f32(self.focal_distance);
        w.put_f32(self.field_of_view);
        w.put_f32(self.eye_separation);
        w.put_bool(self.stereoscopic);
        w.put_vec3(self.direction);
        w.put_vec3(self.position);
        w.put_bool(self.fixed_focus);
        w.put_f32(self.vertical_angle);
        w.put_f32(self.horizontal_angle);
    }

    /// Read a camera record. The stored direction is recomputed from the angles.
    pub fn read(r: &mut SnapshotReader<'_>) -> Result<Self, SnapshotError> {
        let raw_view = r.i32()?;
        let view_type = ViewType::from_raw(raw_view).ok_or(SnapshotError::InvalidEnum {
            field: "camera view type",
            value: raw_view,
        })?;
        let focal_distance = r.f32()?;
        let field_of_view = r.f32()?;
        let eye_separation = r.f32()?;
        let stereoscopic = r.bool()?;
        let _direction = r.vec3()?;
        let position = r.vec3()?;
        let fixed_focus = r.bool()?;
        let vertical_angle = r.f32()?;
        let horizontal_angle = r.f32()?;

        let mut camera = Self::new(position, horizontal_angle, vertical_angle);
        camera.view_type = view_type;
        camera.set_focus(focal_distance);
        camera.set_zoom(field_of_view);
        camera.eye_separation = eye_separation;
        camera.stereoscopic = stereoscopic;
        camera.fixed_focus = fixed_focus;
        Ok(camera)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
