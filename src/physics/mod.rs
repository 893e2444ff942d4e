// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
pub mod ceiling_collision;
pub mod environment_regions;
pub mod floor_collision;
pub mod wall_collision;

#[cfg(test)]
pub(crate) mod test_geometry;

use crate::handles::SurfaceHandle;

/// Height returned when no floor (or environment region) is found.
pub const FLOOR_LOWER_LIMIT: f32 = -11000.0;
/// Height returned when no ceiling is found.
pub const CEILING_UPPER_LIMIT: f32 = 20000.0;

/// Result of a floor or ceiling query.
///
/// `surface` is the authority on whether anything was found; a found surface can
/// legitimately sit at a sentinel height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub height: f32,
    pub surface: Option<SurfaceHandle>,
}

impl SurfaceHit {
    pub const fn miss(height: f32) -> Self {
        Self {
            height,
            surface: None,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.surface.is_some()
    }
}
