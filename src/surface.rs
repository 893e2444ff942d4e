// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use bitflags::bitflags;
use glam::{IVec3, Vec3};

/// Vertical padding added on each side of a surface's y-range for the cheap wall rejection.
pub const SURFACE_Y_PADDING: i32 = 5;

/// Normals shorter than this before normalisation mark a degenerate triangle.
const MIN_NORMAL_MAGNITUDE: f32 = 0.0001;

/// |ny| threshold separating floors and ceilings from walls.
const PARTITION_NORMAL_Y: f32 = 0.01;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceType {
    #[default]
    Default,
    /// Ceiling the actor can hang from. Its edges are used exactly, without a margin.
    Hangable,
    /// Floor skipped by default so the real floor beneath it is found.
    Intangible,
    /// Only collides with the camera.
    CameraBoundary,
    /// Wall that actors with grate pass-through or the vanish cap walk through.
    VanishCapWalls,
    Other(u16),
}

impl SurfaceType {
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            0x0000 => SurfaceType::Default,
            0x0005 => SurfaceType::Hangable,
            0x0012 => SurfaceType::Intangible,
            0x0072 => SurfaceType::CameraBoundary,
            0x007B => SurfaceType::VanishCapWalls,
            other => SurfaceType::Other(other),
        }
    }

    pub const fn raw(self) -> u16 {
        match self {
            SurfaceType::Default => 0x0000,
            SurfaceType::Hangable => 0x0005,
            SurfaceType::Intangible => 0x0012,
            SurfaceType::CameraBoundary => 0x0072,
            SurfaceType::VanishCapWalls => 0x007B,
            SurfaceType::Other(raw) => raw,
        }
    }
}

impl From<u16> for SurfaceType {
    fn from(raw: u16) -> Self {
        SurfaceType::from_raw(raw)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SurfaceFlags: u8 {
        /// Attached to an object rather than level geometry.
        const DYNAMIC          = 1 << 0;
        const NO_CAM_COLLISION = 1 << 1;
    }
}

/// Which of a cell's three lists a surface belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionKind {
    Floors,
    Walls,
    Ceilings,
}

impl PartitionKind {
    pub(crate) const fn index(self) -> usize {
        match self {
            PartitionKind::Floors => 0,
            PartitionKind::Walls => 1,
            PartitionKind::Ceilings => 2,
        }
    }
}

/// A collision triangle with its plane precomputed.
///
/// For any point `p`, `signed_distance(p) = normal · p + origin_offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub vertex1: IVec3,
    pub vertex2: IVec3,
    pub vertex3: IVec3,
    pub normal: Vec3,
    pub origin_offset: f32,
    pub lower_y: i32,
    pub upper_y: i32,
    pub surface_type: SurfaceType,
    pub flags: SurfaceFlags,
}

impl Surface {
    /// Builds a surface from three vertices, computing the unit normal, the plane
    /// offset and the padded y-range.
    ///
    /// Returns `None` for degenerate (zero-area) triangles.
    pub fn from_vertices(
        vertex1: IVec3,
        vertex2: IVec3,
        vertex3: IVec3,
        surface_type: SurfaceType,
        flags: SurfaceFlags,
    ) -> Option<Self> {
        let v1 = vertex1.as_vec3();
        let v2 = vertex2.as_vec3();
        let v3 = vertex3.as_vec3();

        let normal = Vec3::new(
            (v2.y - v1.y) * (v3.z - v2.z) - (v2.z - v1.z) * (v3.y - v2.y),
            (v2.z - v1.z) * (v3.x - v2.x) - (v2.x - v1.x) * (v3.z - v2.z),
            (v2.x - v1.x) * (v3.y - v2.y) - (v2.y - v1.y) * (v3.x - v2.x),
        );

        let magnitude = normal.length();
        if magnitude < MIN_NORMAL_MAGNITUDE {
            return None;
        }
        let normal = normal / magnitude;
        let origin_offset = -normal.dot(v1);

        let min_y = vertex1.y.min(vertex2.y).min(vertex3.y);
        let max_y = vertex1.y.max(vertex2.y).max(vertex3.y);

        Some(Self {
            vertex1,
            vertex2,
            vertex3,
            normal,
            origin_offset,
            lower_y: min_y - SURFACE_Y_PADDING,
            upper_y: max_y + SURFACE_Y_PADDING,
            surface_type,
            flags,
        })
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.x * point.x
            + self.normal.y * point.y
            + self.normal.z * point.z
            + self.origin_offset
    }

    /// Height of the plane above (x, z). `None` for vertical planes.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        if self.normal.y == 0.0 {
            return None;
        }
        Some(-(x * self.normal.x + self.normal.z * z + self.origin_offset) / self.normal.y)
    }

    pub fn partition_kind(&self) -> PartitionKind {
        if self.normal.y > PARTITION_NORMAL_Y {
            PartitionKind::Floors
        } else if self.normal.y < -PARTITION_NORMAL_Y {
            PartitionKind::Ceilings
        } else {
            PartitionKind::Walls
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.flags.contains(SurfaceFlags::DYNAMIC)
    }

    /// Camera queries ignore `NO_CAM_COLLISION` surfaces, everything else ignores
    /// camera-only boundaries.
    pub fn excluded_for(&self, checking_camera: bool) -> bool {
        if checking_camera {
            self.flags.contains(SurfaceFlags::NO_CAM_COLLISION)
        } else {
            self.surface_type == SurfaceType::CameraBoundary
        }
    }

    /// Horizontal (x, z) extents of the three vertices.
    pub(crate) fn xz_bounds(&self) -> (IVec3, IVec3) {
        let min = self.vertex1.min(self.vertex2).min(self.vertex3);
        let max = self.vertex1.max(self.vertex2).max(self.vertex3);
        (min, max)
    }
}
