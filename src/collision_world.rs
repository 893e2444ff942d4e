// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use glam::Vec3;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    debug_info::{CallCounters, CellReport},
    physics::{
        SurfaceHit,
        ceiling_collision::find_ceil,
        environment_regions::EnvironmentRegions,
        floor_collision::{
            FloorGeometry, SurfacePushOut, VerticalProbe, find_dynamic_floor, find_floor,
            push_out_of,
        },
        wall_collision::{WallCollisionQuery, find_wall_collisions},
        FLOOR_LOWER_LIMIT,
    },
    settings::CollisionSettings,
    surface_partition::{SurfacePartition, cell_for},
};

/// Everything the per-frame collision queries read: the partitioned surfaces,
/// the environment boxes and the query mode.
#[derive(Debug, Default)]
pub struct CollisionWorld {
    partition: SurfacePartition,
    regions: Option<EnvironmentRegions>,
    settings: CollisionSettings,
    checking_camera: bool,
    include_intangible: AtomicBool,
    counters: CallCounters,
}

impl CollisionWorld {
    pub fn new(settings: CollisionSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn partition(&self) -> &SurfacePartition {
        &self.partition
    }

    /// Loader access. Not to be used while a physics step is running.
    pub fn partition_mut(&mut self) -> &mut SurfacePartition {
        &mut self.partition
    }

    pub fn settings(&self) -> &CollisionSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: CollisionSettings) {
        self.settings = settings;
    }

    pub fn checking_camera(&self) -> bool {
        self.checking_camera
    }

    /// Switches every following query between actor and camera collision.
    pub fn set_checking_camera(&mut self, checking_camera: bool) {
        self.checking_camera = checking_camera;
    }

    /// Loads the packed environment region table. A malformed table is logged and
    /// treated as no table at all.
    pub fn load_environment_regions(&mut self, table: &[i16]) {
        self.regions = match EnvironmentRegions::from_packed(table) {
            Ok(regions) => {
                log::debug!("Loaded {} environment regions", regions.len());
                Some(regions)
            }
            Err(e) => {
                log::warn!("Ignoring environment region table: {}", e);
                None
            }
        };
    }

    pub fn clear_environment_regions(&mut self) {
        self.regions = None;
    }

    pub fn environment_regions(&self) -> Option<&EnvironmentRegions> {
        self.regions.as_ref()
    }

    /// Lets the next floor query stop on intangible floors. The permission is used
    /// up by that query.
    pub fn include_intangible_next_floor(&self) {
        self.include_intangible.store(true, Ordering::Relaxed);
    }

    /// Pushes the query cylinder out of nearby walls and returns the number of walls hit.
    pub fn find_wall_collisions(&self, query: &mut WallCollisionQuery) -> u32 {
        CallCounters::bump(&self.counters.wall);
        find_wall_collisions(&self.partition, query, self.checking_camera, &self.settings)
    }

    /// Runs a wall query with default pass-through flags and returns the pushed
    /// position with the number of walls hit.
    pub fn find_wall_collision_at(&self, position: Vec3, offset_y: f32, radius: f32) -> (Vec3, u32) {
        let mut query = WallCollisionQuery::new(position, offset_y, radius);
        let hits = self.find_wall_collisions(&mut query);
        (query.position, hits)
    }

    pub fn find_ceil(&self, position: Vec3) -> SurfaceHit {
        CallCounters::bump(&self.counters.ceil);
        find_ceil(&self.partition, position, self.checking_camera, &self.settings)
    }

    pub fn find_floor(&self, position: Vec3) -> SurfaceHit {
        let include_intangible = self.include_intangible.swap(false, Ordering::Relaxed);
        let search = find_floor(
            &self.partition,
            position,
            self.checking_camera,
            include_intangible,
            &self.settings,
        );
        if search.static_miss {
            CallCounters::bump(&self.counters.floor_misses);
        }
        CallCounters::bump(&self.counters.floor);
        search.hit
    }

    pub fn find_floor_height(&self, position: Vec3) -> f32 {
        self.find_floor(position).height
    }

    /// Floor height together with the plane of the floor, if one was found.
    pub fn find_floor_height_and_data(&self, position: Vec3) -> (f32, Option<FloorGeometry>) {
        let hit = self.find_floor(position);
        let geometry = hit
            .surface
            .and_then(|handle| self.partition.surface(handle))
            .map(FloorGeometry::from);
        (hit.height, geometry)
    }

    /// Highest object floor under the point, ignoring level geometry.
    pub fn find_dynamic_floor(&self, position: Vec3) -> SurfaceHit {
        find_dynamic_floor(&self.partition, position, self.checking_camera, &self.settings)
    }

    /// Finds the floor under (or ceiling over) the point and pushes the point out
    /// of its plane if it is within `radius` of it.
    pub fn resolve_floor_or_ceiling(
        &self,
        position: Vec3,
        radius: f32,
        probe: VerticalProbe,
    ) -> SurfacePushOut {
        let hit = match probe {
            VerticalProbe::Floor => self.find_floor(position),
            VerticalProbe::Ceiling => self.find_ceil(position),
        };
        match hit.surface.and_then(|handle| self.partition.surface(handle)) {
            Some(surface) => push_out_of(surface, position, radius),
            None => SurfacePushOut::NoSurface,
        }
    }

    pub fn find_water_level(&self, x: f32, z: f32) -> f32 {
        self.regions
            .as_ref()
            .map_or(FLOOR_LOWER_LIMIT, |regions| regions.water_level(x, z))
    }

    pub fn find_poison_gas_level(&self, x: f32, z: f32) -> f32 {
        self.regions
            .as_ref()
            .map_or(FLOOR_LOWER_LIMIT, |regions| regions.gas_level(x, z))
    }

    pub fn counters(&self) -> &CallCounters {
        &self.counters
    }

    /// Reports the cell containing (x, z) and resets the call counters. `None`
    /// outside the level.
    pub fn debug_surface_list_info(&self, x: f32, z: f32) -> Option<CellReport> {
        let cell = cell_for(x, z)?;
        Some(CellReport::collect(&self.partition, cell, &self.counters))
    }
}
