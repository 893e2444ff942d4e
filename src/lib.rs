// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

pub mod collision_world;
pub mod debug_info;
pub mod handles;
pub mod physics;
pub mod settings;
pub mod surface;
pub mod surface_partition;

pub use collision_world::CollisionWorld;
pub use debug_info::{CallCounts, CellReport};
pub use handles::SurfaceHandle;
pub use physics::{
    CEILING_UPPER_LIMIT, FLOOR_LOWER_LIMIT, SurfaceHit,
    environment_regions::{EnvironmentRegion, EnvironmentRegions, RegionTableError},
    floor_collision::{FloorGeometry, SurfacePushOut, VerticalProbe},
    wall_collision::{MAX_REFERENCED_WALLS, WallCollisionQuery},
};
pub use settings::{CollisionSettings, SettingsError};
pub use surface::{PartitionKind, Surface, SurfaceFlags, SurfaceType};
pub use surface_partition::{
    CELL_SIZE, CellIndex, LEVEL_BOUNDARY_MAX, NUM_CELLS, SurfaceCategory, SurfacePartition,
};
