/// Camera transform and projection for outline insertion
///
/// Outlines are given in world space; this module carries the world-to-camera
/// rotation and origin plus the perspective parameters needed to land vertices
/// on the coverage buffer's pixel grid.
use glam::{Mat3, Vec2, Vec3};

/// Camera-space depth of the near plane. Vertices at or in front of this
/// plane cannot be projected normally.
pub const NEAR_Z: f32 = 0.2;

/// Edges crossing this slightly-behind-the-near-plane threshold get split at
/// `NEAR_Z`; the margin keeps the split point itself on the projectable side.
pub(crate) const NEAR_Z_MARGIN: f32 = 0.200001;

/// World-to-screen mapping for `insert_outline`.
#[derive(Copy, Clone, Debug)]
pub struct OutlineCamera {
    /// World-to-camera rotation.
    pub rotation: Mat3,
    /// Camera position in world space.
    pub origin: Vec3,
    /// Projection scale (pixels per unit at z = 1).
    pub focal_length: f32,
    /// Screen-space offset added after projection, typically the viewport
    /// center.
    pub screen_offset: Vec2,
}

impl OutlineCamera {
    /// Transform a world-space point into camera space.
    #[inline]
    pub fn to_camera(&self, world: Vec3) -> Vec3 {
        self.rotation * (world - self.origin)
    }

    /// Camera-space depth of a world point, without the full transform.
    #[inline]
    pub fn camera_z(&self, world: Vec3) -> f32 {
        self.rotation.row(2).dot(world - self.origin)
    }

    /// Perspective-project a camera-space point. Caller guarantees z > 0.
    #[inline]
    pub fn project(&self, cam: Vec3) -> Vec2 {
        let inv_z = self.focal_length / cam.z;
        Vec2::new(
            self.screen_offset.x + cam.x * inv_z,
            self.screen_offset.y + cam.y * inv_z,
        )
    }

    /// Project as if the point sat on the near plane. Used for vertices at or
    /// behind the near plane when splatting is allowed; pushes them outward
    /// so the splatted outline stays conservative.
    #[inline]
    pub fn project_near(&self, cam: Vec3) -> Vec2 {
        let inv_z = self.focal_length / NEAR_Z;
        Vec2::new(
            self.screen_offset.x + cam.x * inv_z,
            self.screen_offset.y + cam.y * inv_z,
        )
    }
}

impl Default for OutlineCamera {
    fn default() -> Self {
        Self {
            rotation: Mat3::IDENTITY,
            origin: Vec3::ZERO,
            focal_length: 1.0,
            screen_offset: Vec2::ZERO,
        }
    }
}

/// Intersect the camera-space segment a-b with the plane z = `z`.
/// Caller guarantees the segment crosses the plane.
pub(crate) fn z_plane_intersect(a: Vec3, b: Vec3, z: f32) -> Vec3 {
    let t = (z - a.z) / (b.z - a.z);
    Vec3::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y), z)
}
