// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use glam::{IVec3, Vec3};

use crate::{
    handles::SurfaceHandle,
    physics::{CEILING_UPPER_LIMIT, SurfaceHit},
    settings::CollisionSettings,
    surface::{PartitionKind, Surface, SurfaceType},
    surface_partition::{SurfaceCategory, SurfacePartition, cell_for},
};

/// Moves `vertex` horizontally by `margin`, directly away from the midpoint of the
/// edge `a..b` opposite to it.
fn push_vertex_out(vertex: IVec3, a: IVec3, b: IVec3, margin: f32) -> (f32, f32) {
    let (x, z) = (vertex.x as f32, vertex.z as f32);
    let diff_x = a.x as f32 - x + b.x as f32 - x;
    let diff_z = a.z as f32 - z + b.z as f32 - z;
    let length = (diff_x * diff_x + diff_z * diff_z).sqrt();
    if length == 0.0 {
        return (x, z);
    }
    let scale = margin / length;
    (x - diff_x * scale, z - diff_z * scale)
}

fn ceiling_outline(surf: &Surface, margin: f32) -> [(f32, f32); 3] {
    let (v1, v2, v3) = (surf.vertex1, surf.vertex2, surf.vertex3);
    // Hangable ceilings keep their exact edges for ledge grabs.
    if surf.surface_type == SurfaceType::Hangable {
        return [
            (v1.x as f32, v1.z as f32),
            (v2.x as f32, v2.z as f32),
            (v3.x as f32, v3.z as f32),
        ];
    }
    [
        push_vertex_out(v1, v2, v3, margin),
        push_vertex_out(v2, v3, v1, margin),
        push_vertex_out(v3, v1, v2, margin),
    ]
}

/// Ceilings wind clockwise seen from above, so a point is inside when every
/// edge cross product is non-positive.
fn ceiling_contains(outline: &[(f32, f32); 3], x: f32, z: f32) -> bool {
    let [(x1, z1), (x2, z2), (x3, z3)] = *outline;
    if (z1 - z) * (x2 - x1) - (x1 - x) * (z2 - z1) > 0.0 {
        return false;
    }
    if (z2 - z) * (x3 - x2) - (x2 - x) * (z3 - z2) > 0.0 {
        return false;
    }
    (z3 - z) * (x1 - x3) - (x3 - x) * (z1 - z3) <= 0.0
}

/// Lowest ceiling in `list` over (x, z) that the point at `y` is not too far above.
pub(crate) fn find_ceil_from_list(
    partition: &SurfacePartition,
    list: &[SurfaceHandle],
    position: Vec3,
    checking_camera: bool,
    settings: &CollisionSettings,
) -> Option<(SurfaceHandle, f32)> {
    let Vec3 { x, y, z } = position;
    let mut lowest: Option<(SurfaceHandle, f32)> = None;

    for (handle, surf) in partition.surfaces_in(list) {
        if !ceiling_contains(&ceiling_outline(surf, settings.ceiling_margin), x, z) {
            continue;
        }

        if surf.excluded_for(checking_camera) {
            continue;
        }

        // A wall filed as a ceiling.
        let Some(height) = surf.height_at(x, z) else {
            continue;
        };

        if y - (height + settings.ceiling_buffer) > 0.0 {
            continue;
        }

        match lowest {
            Some((_, best)) if height >= best => {}
            _ => lowest = Some((handle, height)),
        }
    }

    lowest
}

/// Finds the lowest ceiling above a point. Level and object ceilings are searched
/// separately and the lower of the two wins, level geometry on ties.
pub fn find_ceil(
    partition: &SurfacePartition,
    position: Vec3,
    checking_camera: bool,
    settings: &CollisionSettings,
) -> SurfaceHit {
    let Some(cell) = cell_for(position.x, position.z) else {
        return SurfaceHit::miss(CEILING_UPPER_LIMIT);
    };

    let search = |category| {
        let list = partition.lists_for(cell, category, PartitionKind::Ceilings);
        match find_ceil_from_list(partition, list, position, checking_camera, settings) {
            Some((handle, height)) => SurfaceHit {
                height,
                surface: Some(handle),
            },
            None => SurfaceHit::miss(CEILING_UPPER_LIMIT),
        }
    };

    let dynamic_ceil = search(SurfaceCategory::Dynamic);
    let static_ceil = search(SurfaceCategory::Static);

    if dynamic_ceil.height < static_ceil.height {
        dynamic_ceil
    } else {
        static_ceil
    }
}
