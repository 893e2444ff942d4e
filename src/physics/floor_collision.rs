// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use glam::Vec3;

use crate::{
    handles::SurfaceHandle,
    physics::{FLOOR_LOWER_LIMIT, SurfaceHit},
    settings::CollisionSettings,
    surface::{PartitionKind, Surface, SurfaceType},
    surface_partition::{SurfaceCategory, SurfacePartition, cell_for, cell_for_int},
};

/// Plane of a floor, copied out of the surface that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorGeometry {
    pub normal: Vec3,
    pub origin_offset: f32,
}

impl From<&Surface> for FloorGeometry {
    fn from(surface: &Surface) -> Self {
        Self {
            normal: surface.normal,
            origin_offset: surface.origin_offset,
        }
    }
}

/// Outcome of a full floor search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorSearch {
    pub hit: SurfaceHit,
    /// No level floor was found, after any intangible re-query.
    pub static_miss: bool,
}

/// Which of the two vertical probes [`push_out_of`] resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalProbe {
    Floor,
    Ceiling,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfacePushOut {
    /// Nothing under (or over) the point.
    NoSurface,
    /// A surface was found, but the point is at least `radius` away from its plane.
    Clear,
    /// The point was inside `radius` and was moved to this position.
    Pushed(Vec3),
}

/// Floors wind counter-clockwise seen from above, so a point is inside when
/// every edge cross product is non-negative.
fn floor_contains(surf: &Surface, x: f32, z: f32) -> bool {
    let (x1, z1) = (surf.vertex1.x as f32, surf.vertex1.z as f32);
    let (x2, z2) = (surf.vertex2.x as f32, surf.vertex2.z as f32);
    if (z1 - z) * (x2 - x1) - (x1 - x) * (z2 - z1) < 0.0 {
        return false;
    }
    let (x3, z3) = (surf.vertex3.x as f32, surf.vertex3.z as f32);
    if (z2 - z) * (x3 - x2) - (x2 - x) * (z3 - z2) < 0.0 {
        return false;
    }
    (z3 - z) * (x1 - x3) - (x3 - x) * (z1 - z3) >= 0.0
}

/// Highest floor in `list` under (x, z) that is no more than `floor_buffer`
/// above `y`.
pub(crate) fn find_floor_from_list(
    partition: &SurfacePartition,
    list: &[SurfaceHandle],
    position: Vec3,
    checking_camera: bool,
    settings: &CollisionSettings,
) -> Option<(SurfaceHandle, f32)> {
    let Vec3 { x, y, z } = position;
    let mut highest: Option<(SurfaceHandle, f32)> = None;

    for (handle, surf) in partition.surfaces_in(list) {
        if !floor_contains(surf, x, z) {
            continue;
        }

        if surf.excluded_for(checking_camera) {
            continue;
        }

        let Some(height) = surf.height_at(x, z) else {
            continue;
        };

        if y - (height - settings.floor_buffer) < 0.0 {
            continue;
        }

        match highest {
            Some((_, best)) if height <= best => {}
            _ => highest = Some((handle, height)),
        }
    }

    highest
}

fn into_hit(found: Option<(SurfaceHandle, f32)>) -> SurfaceHit {
    match found {
        Some((handle, height)) => SurfaceHit {
            height,
            surface: Some(handle),
        },
        None => SurfaceHit::miss(FLOOR_LOWER_LIMIT),
    }
}

/// Finds the highest floor under a point.
///
/// Unless `include_intangible` is set, an intangible level floor is looked through:
/// the level list is searched again from `intangible_drop` units below it, and
/// if nothing is there the result is a miss. Object floors win only when strictly
/// higher than the level floor.
pub fn find_floor(
    partition: &SurfacePartition,
    position: Vec3,
    checking_camera: bool,
    include_intangible: bool,
    settings: &CollisionSettings,
) -> FloorSearch {
    let Some(cell) = cell_for(position.x, position.z) else {
        return FloorSearch {
            hit: SurfaceHit::miss(FLOOR_LOWER_LIMIT),
            static_miss: true,
        };
    };

    let dynamic_list = partition.lists_for(cell, SurfaceCategory::Dynamic, PartitionKind::Floors);
    let dynamic_floor = into_hit(find_floor_from_list(
        partition,
        dynamic_list,
        position,
        checking_camera,
        settings,
    ));

    let static_list = partition.lists_for(cell, SurfaceCategory::Static, PartitionKind::Floors);
    let mut static_floor = find_floor_from_list(partition, static_list, position, checking_camera, settings);

    if !include_intangible {
        if let Some((handle, height)) = static_floor {
            let intangible = partition
                .surface(handle)
                .is_some_and(|surf| surf.surface_type == SurfaceType::Intangible);
            if intangible {
                let below = Vec3::new(position.x, height - settings.intangible_drop, position.z);
                static_floor =
                    find_floor_from_list(partition, static_list, below, checking_camera, settings);
            }
        }
    }

    let static_floor = into_hit(static_floor);
    let static_miss = !static_floor.is_hit();

    let hit = if dynamic_floor.height > static_floor.height {
        dynamic_floor
    } else {
        static_floor
    };

    FloorSearch { hit, static_miss }
}

/// Highest object floor under a point. The position is truncated to whole units
/// first, and intangible floors are not looked through.
pub fn find_dynamic_floor(
    partition: &SurfacePartition,
    position: Vec3,
    checking_camera: bool,
    settings: &CollisionSettings,
) -> SurfaceHit {
    let truncated = position.trunc();
    let Some(cell) = cell_for_int(truncated.x as i32, truncated.z as i32) else {
        return SurfaceHit::miss(FLOOR_LOWER_LIMIT);
    };

    let list = partition.lists_for(cell, SurfaceCategory::Dynamic, PartitionKind::Floors);
    into_hit(find_floor_from_list(partition, list, truncated, checking_camera, settings))
}

/// Pushes `position` out of the plane of `surface` along its full normal when it
/// is closer than `radius` on either side.
pub fn push_out_of(surface: &Surface, position: Vec3, radius: f32) -> SurfacePushOut {
    let offset = surface.signed_distance(position);
    if offset.abs() < radius {
        SurfacePushOut::Pushed(position + surface.normal * (radius - offset))
    } else {
        SurfacePushOut::Clear
    }
}
