// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
//! Triangles shared by the query tests.
use glam::IVec3;

use crate::surface::{Surface, SurfaceFlags, SurfaceType};

/// Wall in the plane z = `z`, facing +z, covering x in [x0, x0 + 1000] and y in [0, 500]
/// (the lower-left half of that rectangle).
pub fn wall_facing_z_with(z: i32, surface_type: SurfaceType, x0: i32) -> Surface {
    Surface::from_vertices(
        IVec3::new(x0, 0, z),
        IVec3::new(x0 + 1000, 0, z),
        IVec3::new(x0, 500, z),
        surface_type,
        SurfaceFlags::empty(),
    )
    .expect("wall should not be degenerate")
}

pub fn wall_facing_z(z: i32) -> Surface {
    wall_facing_z_with(z, SurfaceType::Default, -500)
}

/// Level floor covering at least the square [-1000, 1000]² at height `y`.
pub fn floor_with(y: i32, surface_type: SurfaceType) -> Surface {
    Surface::from_vertices(
        IVec3::new(-1000, y, -1000),
        IVec3::new(-1000, y, 3000),
        IVec3::new(3000, y, -1000),
        surface_type,
        SurfaceFlags::empty(),
    )
    .expect("floor should not be degenerate")
}

pub fn floor(y: i32) -> Surface {
    floor_with(y, SurfaceType::Default)
}

/// Floor sloping up along +x: height = 100 + x / 2.
pub fn sloped_floor() -> Surface {
    Surface::from_vertices(
        IVec3::new(-1000, -400, -1000),
        IVec3::new(-1000, -400, 3000),
        IVec3::new(3000, 1600, -1000),
        SurfaceType::Default,
        SurfaceFlags::empty(),
    )
    .expect("floor should not be degenerate")
}

/// Level ceiling covering at least the square [-1000, 1000]² at height `y`.
pub fn ceiling_with(y: i32, surface_type: SurfaceType) -> Surface {
    Surface::from_vertices(
        IVec3::new(-1000, y, -1000),
        IVec3::new(3000, y, -1000),
        IVec3::new(-1000, y, 3000),
        surface_type,
        SurfaceFlags::empty(),
    )
    .expect("ceiling should not be degenerate")
}

pub fn ceiling(y: i32) -> Surface {
    ceiling_with(y, SurfaceType::Default)
}

/// Small ceiling with its right angle at the origin: x >= 0, z >= 0, x + z <= 100.
pub fn small_ceiling(y: i32, surface_type: SurfaceType) -> Surface {
    Surface::from_vertices(
        IVec3::new(0, y, 0),
        IVec3::new(100, y, 0),
        IVec3::new(0, y, 100),
        surface_type,
        SurfaceFlags::empty(),
    )
    .expect("ceiling should not be degenerate")
}
