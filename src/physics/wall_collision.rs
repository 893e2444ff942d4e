// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use glam::{IVec3, Vec3};

use crate::{
    handles::SurfaceHandle,
    settings::CollisionSettings,
    surface::{PartitionKind, Surface, SurfaceFlags, SurfaceType},
    surface_partition::{SurfaceCategory, SurfacePartition, cell_for_int},
};

/// Only the first four contacted walls are kept. Later contacts still count
/// towards the returned total.
pub const MAX_REFERENCED_WALLS: usize = 4;

/// A cylinder probing for walls, and the result of the probe.
#[derive(Debug, Clone)]
pub struct WallCollisionQuery {
    /// Input position; x and z are replaced by the pushed-out position.
    pub position: Vec3,
    /// Probe height above `position.y`.
    pub offset_y: f32,
    pub radius: f32,
    /// The querying object moves through grates.
    pub passes_through_grates: bool,
    /// The querying object is the player wearing the vanish cap.
    pub has_vanish_cap: bool,
    walls: [SurfaceHandle; MAX_REFERENCED_WALLS],
    num_walls: usize,
}

impl WallCollisionQuery {
    pub fn new(position: Vec3, offset_y: f32, radius: f32) -> Self {
        Self {
            position,
            offset_y,
            radius,
            passes_through_grates: false,
            has_vanish_cap: false,
            walls: [SurfaceHandle::default(); MAX_REFERENCED_WALLS],
            num_walls: 0,
        }
    }

    /// Walls contacted by the last resolution, in contact order.
    pub fn walls(&self) -> &[SurfaceHandle] {
        &self.walls[..self.num_walls]
    }

    fn clear_walls(&mut self) {
        self.num_walls = 0;
    }

    fn record_wall(&mut self, handle: SurfaceHandle) {
        if self.num_walls < MAX_REFERENCED_WALLS {
            self.walls[self.num_walls] = handle;
            self.num_walls += 1;
        }
    }

    fn passes_vanish_walls(&self) -> bool {
        self.passes_through_grates || self.has_vanish_cap
    }
}

/// Steps of the contact cascade for one surface. Each edge state either resolves,
/// rejects or falls through to the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ContactState {
    Face,
    Edge12,
    Edge13,
    Edge23,
    Resolved { dx: f32, dz: f32 },
    Rejected,
}

enum EdgeContact {
    Miss,
    Push { dx: f32, dz: f32 },
    Corner,
}

fn wall_excluded(surf: &Surface, query: &WallCollisionQuery, checking_camera: bool) -> bool {
    if checking_camera {
        return surf.flags.contains(SurfaceFlags::NO_CAM_COLLISION);
    }
    match surf.surface_type {
        SurfaceType::CameraBoundary => true,
        SurfaceType::VanishCapWalls => query.passes_vanish_walls(),
        _ => false,
    }
}

/// Barycentric point-in-triangle test of the probe projected onto the wall plane.
fn probe_inside_face(surf: &Surface, probe: Vec3) -> bool {
    let origin = surf.vertex1.as_vec3();
    let e0 = surf.vertex2.as_vec3() - origin;
    let e1 = surf.vertex3.as_vec3() - origin;
    let rel = probe - origin;

    let d00 = e0.dot(e0);
    let d01 = e0.dot(e1);
    let d11 = e1.dot(e1);
    let d20 = rel.dot(e0);
    let d21 = rel.dot(e1);
    let inv_denom = 1.0 / (d00 * d11 - d01 * d01);

    let v = (d11 * d20 - d01 * d21) * inv_denom;
    if v < 0.0 || v > 1.0 {
        return false;
    }
    let w = (d00 * d21 - d01 * d20) * inv_denom;
    !(w < 0.0 || w > 1.0 || v + w > 1.0)
}

/// Pushes the probe away from the point of edge `start..end` at probe height.
fn edge_contact(
    start: IVec3,
    end: IVec3,
    probe: Vec3,
    normal: Vec3,
    margin_radius: &mut f32,
    settings: &CollisionSettings,
) -> EdgeContact {
    let edge = (end - start).as_vec3();
    if edge.y == 0.0 {
        return EdgeContact::Miss;
    }

    let rel = probe - start.as_vec3();
    let t = rel.y / edge.y;
    if t < 0.0 || t > 1.0 {
        return EdgeContact::Miss;
    }

    let to_edge_x = edge.x * t - rel.x;
    let to_edge_z = edge.z * t - rel.z;
    let distance = (to_edge_x * to_edge_x + to_edge_z * to_edge_z).sqrt();
    let penetration = distance - *margin_radius;
    if penetration > 0.0 {
        return EdgeContact::Miss;
    }
    // Probe sits on the edge itself: no direction to push in.
    if distance == 0.0 {
        return EdgeContact::Corner;
    }

    let scale = penetration / distance;
    let dx = to_edge_x * scale;
    let dz = to_edge_z * scale;
    *margin_radius += settings.edge_margin_growth;

    if dx * normal.x + dz * normal.z < settings.corner_threshold * penetration {
        EdgeContact::Corner
    } else {
        EdgeContact::Push { dx, dz }
    }
}

/// Runs the face / edge cascade for one surface, returning the horizontal push.
fn resolve_contact(
    surf: &Surface,
    probe: Vec3,
    radius: f32,
    offset: f32,
    margin_radius: &mut f32,
    settings: &CollisionSettings,
) -> Option<(f32, f32)> {
    let mut state = ContactState::Face;
    loop {
        state = match state {
            ContactState::Face => {
                if probe_inside_face(surf, probe) {
                    let push = radius - offset;
                    ContactState::Resolved {
                        dx: surf.normal.x * push,
                        dz: surf.normal.z * push,
                    }
                } else if offset < 0.0 {
                    ContactState::Rejected
                } else {
                    ContactState::Edge12
                }
            }
            ContactState::Edge12 => edge_state(
                edge_contact(surf.vertex1, surf.vertex2, probe, surf.normal, margin_radius, settings),
                ContactState::Edge13,
            ),
            ContactState::Edge13 => edge_state(
                edge_contact(surf.vertex1, surf.vertex3, probe, surf.normal, margin_radius, settings),
                ContactState::Edge23,
            ),
            ContactState::Edge23 => edge_state(
                edge_contact(surf.vertex2, surf.vertex3, probe, surf.normal, margin_radius, settings),
                ContactState::Rejected,
            ),
            ContactState::Resolved { dx, dz } => return Some((dx, dz)),
            ContactState::Rejected => return None,
        };
    }
}

fn edge_state(contact: EdgeContact, on_miss: ContactState) -> ContactState {
    match contact {
        EdgeContact::Miss => on_miss,
        EdgeContact::Push { dx, dz } => ContactState::Resolved { dx, dz },
        EdgeContact::Corner => ContactState::Rejected,
    }
}

/// Pushes the query out of every wall in `list`, in order, and returns how many
/// walls were hit.
pub(crate) fn find_wall_collisions_from_list(
    partition: &SurfacePartition,
    list: &[SurfaceHandle],
    query: &mut WallCollisionQuery,
    checking_camera: bool,
    settings: &CollisionSettings,
) -> u32 {
    let mut radius = query.radius;
    let mut margin_radius = radius - settings.edge_margin;
    if radius > settings.max_wall_radius {
        radius = settings.max_wall_radius;
    }

    let y = query.position.y + query.offset_y;
    let mut x = query.position.x;
    let mut z = query.position.z;
    let mut num_cols = 0;

    for (handle, surf) in partition.surfaces_in(list) {
        if y < surf.lower_y as f32 || y > surf.upper_y as f32 {
            continue;
        }

        let probe = Vec3::new(x, y, z);
        let offset = surf.signed_distance(probe);
        if offset < 0.0 || offset > radius {
            continue;
        }

        if wall_excluded(surf, query, checking_camera) {
            continue;
        }

        let Some((dx, dz)) =
            resolve_contact(surf, probe, radius, offset, &mut margin_radius, settings)
        else {
            continue;
        };

        x += dx;
        z += dz;
        query.record_wall(handle);
        num_cols += 1;
    }

    query.position.x = x;
    query.position.z = z;
    num_cols
}

/// Resolves the query against the walls of its cell, dynamic walls first.
///
/// Returns the number of walls hit, which may exceed the number of walls kept
/// in the query.
pub fn find_wall_collisions(
    partition: &SurfacePartition,
    query: &mut WallCollisionQuery,
    checking_camera: bool,
    settings: &CollisionSettings,
) -> u32 {
    query.clear_walls();

    let Some(cell) = cell_for_int(query.position.x as i32, query.position.z as i32) else {
        return 0;
    };

    let mut num_collisions = 0;
    for category in [SurfaceCategory::Dynamic, SurfaceCategory::Static] {
        let list = partition.lists_for(cell, category, PartitionKind::Walls);
        num_collisions +=
            find_wall_collisions_from_list(partition, list, query, checking_camera, settings);
    }
    num_collisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::test_geometry::{wall_facing_z, wall_facing_z_with};
    use approx::assert_relative_eq;

    fn resolve(partition: &SurfacePartition, query: &mut WallCollisionQuery) -> u32 {
        find_wall_collisions(partition, query, false, &CollisionSettings::default())
    }

    #[test]
    fn face_push_lands_exactly_at_radius() {
        let mut partition = SurfacePartition::new();
        let wall = partition.add_surface(wall_facing_z(0), SurfaceCategory::Static);

        let mut query = WallCollisionQuery::new(Vec3::new(-200.0, 0.0, 30.0), 100.0, 50.0);
        let hits = resolve(&partition, &mut query);

        assert_eq!(hits, 1);
        assert_eq!(query.walls(), &[wall]);
        assert_relative_eq!(query.position.z, 50.0, epsilon = 1e-4);
        assert_relative_eq!(query.position.x, -200.0, epsilon = 1e-6);
        let surface = partition.surface(wall).unwrap();
        let probe = query.position + Vec3::Y * query.offset_y;
        assert_relative_eq!(surface.signed_distance(probe), 50.0, epsilon = 1e-4);
    }

    #[test]
    fn resolved_position_is_stable() {
        let mut partition = SurfacePartition::new();
        partition.add_surface(wall_facing_z(0), SurfaceCategory::Static);

        let mut query = WallCollisionQuery::new(Vec3::new(-200.0, 0.0, 30.0), 100.0, 50.0);
        resolve(&partition, &mut query);
        let resolved = query.position;

        resolve(&partition, &mut query);
        assert_relative_eq!(query.position.x, resolved.x, epsilon = 1e-4);
        assert_relative_eq!(query.position.z, resolved.z, epsilon = 1e-4);

        // With clearance beyond the radius nothing registers.
        let mut clear = WallCollisionQuery::new(resolved + Vec3::Z, 100.0, 50.0);
        assert_eq!(resolve(&partition, &mut clear), 0);
        assert!(clear.walls().is_empty());
        assert_eq!(clear.position, resolved + Vec3::Z);
    }

    #[test]
    fn walls_behind_or_out_of_reach_are_ignored() {
        let mut partition = SurfacePartition::new();
        partition.add_surface(wall_facing_z(0), SurfaceCategory::Static);

        let mut behind = WallCollisionQuery::new(Vec3::new(-200.0, 0.0, -10.0), 100.0, 50.0);
        assert_eq!(resolve(&partition, &mut behind), 0);

        let mut far = WallCollisionQuery::new(Vec3::new(-200.0, 0.0, 60.0), 100.0, 50.0);
        assert_eq!(resolve(&partition, &mut far), 0);

        // Probe height above the wall's padded y-range.
        let mut above = WallCollisionQuery::new(Vec3::new(-200.0, 480.0, 30.0), 100.0, 50.0);
        assert_eq!(resolve(&partition, &mut above), 0);
        assert_eq!(above.position, Vec3::new(-200.0, 480.0, 30.0));
    }

    #[test]
    fn edge_push_moves_probe_to_margin_radius() {
        let mut partition = SurfacePartition::new();
        // Vertical edge of the wall at x = -500.
        let wall = partition.add_surface(wall_facing_z(0), SurfaceCategory::Static);

        let mut query = WallCollisionQuery::new(Vec3::new(-505.0, 0.0, 30.0), 100.0, 50.0);
        let hits = resolve(&partition, &mut query);

        assert_eq!(hits, 1);
        assert_eq!(query.walls(), &[wall]);
        assert!(query.position.x < -505.0);
        assert!(query.position.z > 30.0);
        let dx = query.position.x + 500.0;
        let dz = query.position.z;
        assert_relative_eq!((dx * dx + dz * dz).sqrt(), 49.0, epsilon = 1e-3);
    }

    #[test]
    fn corner_graze_beside_edge_is_rejected_without_push() {
        let mut partition = SurfacePartition::new();
        partition.add_surface(wall_facing_z(0), SurfaceCategory::Static);

        // The push away from the edge would be mostly sideways, against the corner.
        let start = Vec3::new(-520.0, 0.0, 10.0);
        let mut query = WallCollisionQuery::new(start, 100.0, 50.0);
        let hits = resolve(&partition, &mut query);

        assert_eq!(hits, 0);
        assert!(query.walls().is_empty());
        assert_eq!(query.position, start);
    }

    #[test]
    fn only_four_walls_are_kept_but_all_are_counted() {
        let mut partition = SurfacePartition::new();
        let handles: Vec<_> = [-25, -20, -15, -10, -5, 0]
            .into_iter()
            .map(|z| partition.add_surface(wall_facing_z(z), SurfaceCategory::Static))
            .collect();

        let mut query = WallCollisionQuery::new(Vec3::new(-200.0, 0.0, 10.0), 100.0, 50.0);
        let hits = resolve(&partition, &mut query);

        assert_eq!(hits, 6);
        assert_eq!(query.walls(), &handles[..MAX_REFERENCED_WALLS]);
        assert_relative_eq!(query.position.z, 50.0, epsilon = 1e-3);
    }

    #[test]
    fn dynamic_and_static_hits_are_summed() {
        let mut partition = SurfacePartition::new();
        let level = partition.add_surface(wall_facing_z(-20), SurfaceCategory::Static);
        let object = partition.add_surface(wall_facing_z(-30), SurfaceCategory::Dynamic);

        let mut query = WallCollisionQuery::new(Vec3::new(-200.0, 0.0, 0.0), 100.0, 50.0);
        let hits = resolve(&partition, &mut query);

        assert_eq!(hits, 2);
        // Object walls are resolved before level walls.
        assert_eq!(query.walls(), &[object, level]);
        assert_relative_eq!(query.position.z, 30.0, epsilon = 1e-4);
    }

    #[test]
    fn radius_is_clamped() {
        let mut partition = SurfacePartition::new();
        partition.add_surface(wall_facing_z(0), SurfaceCategory::Static);

        let mut out_of_reach = WallCollisionQuery::new(Vec3::new(-200.0, 0.0, 250.0), 100.0, 300.0);
        assert_eq!(resolve(&partition, &mut out_of_reach), 0);

        let mut clamped = WallCollisionQuery::new(Vec3::new(-200.0, 0.0, 150.0), 100.0, 300.0);
        assert_eq!(resolve(&partition, &mut clamped), 1);
        assert_relative_eq!(clamped.position.z, 200.0, epsilon = 1e-4);
    }

    #[test]
    fn surface_type_and_mode_exclusions() {
        let mut partition = SurfacePartition::new();
        partition.add_surface(
            wall_facing_z_with(0, SurfaceType::CameraBoundary, -500),
            SurfaceCategory::Static,
        );
        let settings = CollisionSettings::default();
        let start = Vec3::new(-200.0, 0.0, 30.0);

        let mut actor = WallCollisionQuery::new(start, 100.0, 50.0);
        assert_eq!(find_wall_collisions(&partition, &mut actor, false, &settings), 0);
        let mut camera = WallCollisionQuery::new(start, 100.0, 50.0);
        assert_eq!(find_wall_collisions(&partition, &mut camera, true, &settings), 1);

        let mut partition = SurfacePartition::new();
        let mut no_cam = wall_facing_z(0);
        no_cam.flags = SurfaceFlags::NO_CAM_COLLISION;
        partition.add_surface(no_cam, SurfaceCategory::Static);
        let mut camera = WallCollisionQuery::new(start, 100.0, 50.0);
        assert_eq!(find_wall_collisions(&partition, &mut camera, true, &settings), 0);
        let mut actor = WallCollisionQuery::new(start, 100.0, 50.0);
        assert_eq!(find_wall_collisions(&partition, &mut actor, false, &settings), 1);
    }

    #[test]
    fn vanish_cap_walls_let_flagged_actors_through() {
        let mut partition = SurfacePartition::new();
        partition.add_surface(
            wall_facing_z_with(0, SurfaceType::VanishCapWalls, -500),
            SurfaceCategory::Static,
        );
        let start = Vec3::new(-200.0, 0.0, 30.0);

        let mut plain = WallCollisionQuery::new(start, 100.0, 50.0);
        assert_eq!(resolve(&partition, &mut plain), 1);

        let mut grate = WallCollisionQuery::new(start, 100.0, 50.0);
        grate.passes_through_grates = true;
        assert_eq!(resolve(&partition, &mut grate), 0);

        let mut capped = WallCollisionQuery::new(start, 100.0, 50.0);
        capped.has_vanish_cap = true;
        assert_eq!(resolve(&partition, &mut capped), 0);
        assert_eq!(capped.position, start);
    }

    #[test]
    fn out_of_bounds_clears_previous_walls() {
        let mut partition = SurfacePartition::new();
        partition.add_surface(wall_facing_z(0), SurfaceCategory::Static);

        let mut query = WallCollisionQuery::new(Vec3::new(-200.0, 0.0, 30.0), 100.0, 50.0);
        assert_eq!(resolve(&partition, &mut query), 1);

        query.position = Vec3::new(9000.0, 0.0, 30.0);
        assert_eq!(resolve(&partition, &mut query), 0);
        assert!(query.walls().is_empty());
        assert_eq!(query.position, Vec3::new(9000.0, 0.0, 30.0));
    }
}
