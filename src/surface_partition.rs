// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use glam::IVec3;
use slotmap::SlotMap;

use crate::{
    handles::SurfaceHandle,
    surface::{PartitionKind, Surface, SurfaceFlags, SurfaceType},
};

/// Half-width of the level on both horizontal axes.
pub const LEVEL_BOUNDARY_MAX: i32 = 0x2000;
pub const CELL_SIZE: i32 = 0x400;
pub const NUM_CELLS: usize = (2 * LEVEL_BOUNDARY_MAX / CELL_SIZE) as usize;
pub const NUM_CELLS_INDEX: i32 = NUM_CELLS as i32 - 1;

/// Surfaces this close to a cell border are also registered in the neighbouring cell.
const CELL_BORDER_OVERLAP: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellIndex {
    pub x: usize,
    pub z: usize,
}

impl CellIndex {
    /// Row-major index, z major.
    pub fn linear(self) -> usize {
        self.z * NUM_CELLS + self.x
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceCategory {
    /// Level geometry.
    Static,
    /// Object-attached geometry, reloaded every frame.
    Dynamic,
}

/// Maps a point to its cell.
///
/// Points on or beyond `±LEVEL_BOUNDARY_MAX` on either axis have no cell.
pub fn cell_for(x: f32, z: f32) -> Option<CellIndex> {
    let bound = LEVEL_BOUNDARY_MAX as f32;
    // Written so that NaN falls out of bounds.
    if !(x > -bound && x < bound && z > -bound && z < bound) {
        return None;
    }
    Some(CellIndex {
        x: cell_coord(x as i32),
        z: cell_coord(z as i32),
    })
}

/// Maps an integer point to its cell, for queries that truncate their position first.
pub fn cell_for_int(x: i32, z: i32) -> Option<CellIndex> {
    if x <= -LEVEL_BOUNDARY_MAX || x >= LEVEL_BOUNDARY_MAX {
        return None;
    }
    if z <= -LEVEL_BOUNDARY_MAX || z >= LEVEL_BOUNDARY_MAX {
        return None;
    }
    Some(CellIndex {
        x: cell_coord(x),
        z: cell_coord(z),
    })
}

fn cell_coord(coord: i32) -> usize {
    (((coord + LEVEL_BOUNDARY_MAX) / CELL_SIZE) & NUM_CELLS_INDEX) as usize
}

fn lower_cell_index(coord: i32) -> usize {
    let coord = (coord + LEVEL_BOUNDARY_MAX).max(0);
    let mut index = coord / CELL_SIZE;
    if coord % CELL_SIZE < CELL_BORDER_OVERLAP {
        index -= 1;
    }
    index.clamp(0, NUM_CELLS_INDEX) as usize
}

fn upper_cell_index(coord: i32) -> usize {
    let coord = (coord + LEVEL_BOUNDARY_MAX).max(0);
    let mut index = coord / CELL_SIZE;
    if coord % CELL_SIZE > CELL_SIZE - CELL_BORDER_OVERLAP {
        index += 1;
    }
    index.clamp(0, NUM_CELLS_INDEX) as usize
}

#[derive(Debug, Default, Clone)]
struct PartitionCell {
    lists: [Vec<SurfaceHandle>; 3],
}

/// The spatial partition: one arena owning every surface plus two grids of
/// handle lists, one per category.
#[derive(Debug)]
pub struct SurfacePartition {
    surfaces: SlotMap<SurfaceHandle, Surface>,
    static_cells: Vec<PartitionCell>,
    dynamic_cells: Vec<PartitionCell>,
    node_count: usize,
}

impl Default for SurfacePartition {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfacePartition {
    pub fn new() -> Self {
        Self {
            surfaces: SlotMap::with_key(),
            static_cells: vec![PartitionCell::default(); NUM_CELLS * NUM_CELLS],
            dynamic_cells: vec![PartitionCell::default(); NUM_CELLS * NUM_CELLS],
            node_count: 0,
        }
    }

    fn cells(&self, category: SurfaceCategory) -> &[PartitionCell] {
        match category {
            SurfaceCategory::Static => &self.static_cells,
            SurfaceCategory::Dynamic => &self.dynamic_cells,
        }
    }

    fn cells_mut(&mut self, category: SurfaceCategory) -> &mut [PartitionCell] {
        match category {
            SurfaceCategory::Static => &mut self.static_cells,
            SurfaceCategory::Dynamic => &mut self.dynamic_cells,
        }
    }

    pub fn lists_for(
        &self,
        cell: CellIndex,
        category: SurfaceCategory,
        kind: PartitionKind,
    ) -> &[SurfaceHandle] {
        &self.cells(category)[cell.linear()].lists[kind.index()]
    }

    pub fn surface(&self, handle: SurfaceHandle) -> Option<&Surface> {
        self.surfaces.get(handle)
    }

    /// Resolves a handle list, skipping handles whose surface has been removed.
    pub fn surfaces_in<'a>(
        &'a self,
        list: &'a [SurfaceHandle],
    ) -> impl Iterator<Item = (SurfaceHandle, &'a Surface)> + 'a {
        list.iter()
            .filter_map(move |&handle| self.surfaces.get(handle).map(|surf| (handle, surf)))
    }

    /// Stores `surface` and registers it in every cell its horizontal bounds touch.
    pub fn add_surface(&mut self, surface: Surface, category: SurfaceCategory) -> SurfaceHandle {
        let kind = surface.partition_kind();
        self.add_surface_to(surface, category, kind)
    }

    /// Builds and registers a surface from raw vertices. Degenerate triangles are
    /// dropped with a warning.
    pub fn add_triangle(
        &mut self,
        vertices: [IVec3; 3],
        surface_type: SurfaceType,
        flags: SurfaceFlags,
        category: SurfaceCategory,
    ) -> Option<SurfaceHandle> {
        let [v1, v2, v3] = vertices;
        let Some(surface) = Surface::from_vertices(v1, v2, v3, surface_type, flags) else {
            log::warn!("Skipping degenerate surface {:?} {:?} {:?}", v1, v2, v3);
            return None;
        };
        Some(self.add_surface(surface, category))
    }

    /// Registers a surface into a list other than the one its normal selects.
    #[cfg(test)]
    pub(crate) fn add_misfiled_surface(
        &mut self,
        surface: Surface,
        category: SurfaceCategory,
        kind: PartitionKind,
    ) -> SurfaceHandle {
        self.add_surface_to(surface, category, kind)
    }

    fn add_surface_to(
        &mut self,
        mut surface: Surface,
        category: SurfaceCategory,
        kind: PartitionKind,
    ) -> SurfaceHandle {
        surface
            .flags
            .set(SurfaceFlags::DYNAMIC, category == SurfaceCategory::Dynamic);

        let (min, max) = surface.xz_bounds();
        let (min_cell_x, max_cell_x) = (lower_cell_index(min.x), upper_cell_index(max.x));
        let (min_cell_z, max_cell_z) = (lower_cell_index(min.z), upper_cell_index(max.z));

        let handle = self.surfaces.insert(surface);

        let mut added = 0;
        let cells = self.cells_mut(category);
        for cell_z in min_cell_z..=max_cell_z {
            for cell_x in min_cell_x..=max_cell_x {
                let cell = CellIndex {
                    x: cell_x,
                    z: cell_z,
                };
                cells[cell.linear()].lists[kind.index()].push(handle);
                added += 1;
            }
        }
        self.node_count += added;

        log::trace!(
            "Registered {:?} {:?} surface {:?} in {} cells",
            category,
            kind,
            handle,
            added
        );
        handle
    }

    pub fn remove_surface(&mut self, handle: SurfaceHandle) -> Option<Surface> {
        let surface = self.surfaces.remove(handle)?;
        let category = if surface.is_dynamic() {
            SurfaceCategory::Dynamic
        } else {
            SurfaceCategory::Static
        };

        let mut removed = 0;
        for cell in self.cells_mut(category) {
            for list in &mut cell.lists {
                let before = list.len();
                list.retain(|&h| h != handle);
                removed += before - list.len();
            }
        }
        self.node_count -= removed;
        Some(surface)
    }

    /// Drops every object-attached surface, leaving level geometry in place.
    pub fn clear_dynamic_surfaces(&mut self) {
        self.surfaces.retain(|_, surface| !surface.is_dynamic());
        let mut removed = 0;
        for cell in &mut self.dynamic_cells {
            for list in &mut cell.lists {
                removed += list.len();
                list.clear();
            }
        }
        self.node_count -= removed;
    }

    pub fn clear(&mut self) {
        self.surfaces.clear();
        for cell in self.static_cells.iter_mut().chain(self.dynamic_cells.iter_mut()) {
            for list in &mut cell.lists {
                list.clear();
            }
        }
        self.node_count = 0;
    }

    pub fn surface_count(&self, category: SurfaceCategory) -> usize {
        let dynamic = category == SurfaceCategory::Dynamic;
        self.surfaces
            .values()
            .filter(|surface| surface.is_dynamic() == dynamic)
            .count()
    }

    /// Number of cell list entries across both grids.
    pub fn node_count(&self) -> usize {
        self.node_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(x0: i32, z0: i32, size: i32, y: i32) -> Surface {
        Surface::from_vertices(
            IVec3::new(x0, y, z0),
            IVec3::new(x0, y, z0 + size),
            IVec3::new(x0 + size, y, z0),
            SurfaceType::Default,
            SurfaceFlags::empty(),
        )
        .expect("floor should not be degenerate")
    }

    #[test]
    fn cell_for_rejects_boundary_and_beyond() {
        assert!(cell_for(8192.0, 0.0).is_none());
        assert!(cell_for(-8192.0, 0.0).is_none());
        assert!(cell_for(0.0, 9000.0).is_none());
        assert!(cell_for(0.0, -8192.5).is_none());
        assert!(cell_for(f32::NAN, 0.0).is_none());
        assert!(cell_for_int(-8192, 0).is_none());
        assert!(cell_for_int(0, 8192).is_none());
    }

    #[test]
    fn cell_for_maps_edges_of_the_level() {
        assert_eq!(cell_for(-8191.9, -8191.9), Some(CellIndex { x: 0, z: 0 }));
        assert_eq!(cell_for(8191.9, 8191.9), Some(CellIndex { x: 15, z: 15 }));
        assert_eq!(cell_for(0.0, 1024.0), Some(CellIndex { x: 8, z: 9 }));
        // Truncation toward zero puts small negative coordinates in the positive cell.
        assert_eq!(cell_for(-0.5, -1023.0), Some(CellIndex { x: 8, z: 7 }));
        assert_eq!(cell_for_int(-1, 0), Some(CellIndex { x: 7, z: 8 }));
    }

    #[test]
    fn surface_is_registered_in_every_overlapped_cell() {
        let mut partition = SurfacePartition::new();
        // Spans x in [500, 1600] -> cells 8 and 9; z in [100, 200] -> cell 8.
        let wide = Surface::from_vertices(
            IVec3::new(500, 0, 100),
            IVec3::new(500, 0, 200),
            IVec3::new(1600, 0, 100),
            SurfaceType::Default,
            SurfaceFlags::empty(),
        )
        .expect("floor should not be degenerate");
        let handle = partition.add_surface(wide, SurfaceCategory::Static);

        for x in [8, 9] {
            let list = partition.lists_for(
                CellIndex { x, z: 8 },
                SurfaceCategory::Static,
                PartitionKind::Floors,
            );
            assert_eq!(list, &[handle]);
        }
        assert!(partition
            .lists_for(CellIndex { x: 10, z: 8 }, SurfaceCategory::Static, PartitionKind::Floors)
            .is_empty());
        assert!(partition
            .lists_for(CellIndex { x: 8, z: 8 }, SurfaceCategory::Dynamic, PartitionKind::Floors)
            .is_empty());
        assert_eq!(partition.node_count(), 2);
    }

    #[test]
    fn surfaces_near_a_border_spill_into_the_neighbour() {
        let mut partition = SurfacePartition::new();
        // x in [10, 100]: within 50 units of the border at 0, so cell 7 is included.
        let handle = partition.add_surface(floor(10, 300, 90, 0), SurfaceCategory::Static);
        let list = partition.lists_for(
            CellIndex { x: 7, z: 8 },
            SurfaceCategory::Static,
            PartitionKind::Floors,
        );
        assert_eq!(list, &[handle]);
    }

    #[test]
    fn remove_surface_purges_all_nodes() {
        let mut partition = SurfacePartition::new();
        let handle = partition.add_surface(floor(500, 100, 1100, 0), SurfaceCategory::Static);
        let removed = partition.remove_surface(handle);
        assert!(removed.is_some());
        assert_eq!(partition.node_count(), 0);
        assert!(partition.surface(handle).is_none());
        assert!(partition.remove_surface(handle).is_none());
    }

    #[test]
    fn clear_dynamic_keeps_level_geometry() {
        let mut partition = SurfacePartition::new();
        let level = partition.add_surface(floor(100, 100, 100, 0), SurfaceCategory::Static);
        let object = partition.add_surface(floor(100, 100, 100, 50), SurfaceCategory::Dynamic);
        assert!(partition.surface(object).unwrap().is_dynamic());
        assert!(!partition.surface(level).unwrap().is_dynamic());

        partition.clear_dynamic_surfaces();

        assert!(partition.surface(object).is_none());
        assert!(partition.surface(level).is_some());
        assert_eq!(partition.surface_count(SurfaceCategory::Static), 1);
        assert_eq!(partition.surface_count(SurfaceCategory::Dynamic), 0);
        assert_eq!(partition.node_count(), 1);
    }

    #[test]
    fn stale_handles_are_skipped() {
        let mut partition = SurfacePartition::new();
        let keep = partition.add_surface(floor(100, 100, 100, 0), SurfaceCategory::Static);
        let gone = partition.add_surface(floor(100, 100, 100, 20), SurfaceCategory::Static);
        partition.surfaces.remove(gone);

        let cell = CellIndex { x: 8, z: 8 };
        let list = partition.lists_for(cell, SurfaceCategory::Static, PartitionKind::Floors);
        let live: Vec<_> = partition.surfaces_in(list).map(|(h, _)| h).collect();
        assert_eq!(live, vec![keep]);
    }

    #[test]
    fn degenerate_triangles_are_not_registered() {
        let mut partition = SurfacePartition::new();
        let line = [IVec3::new(0, 0, 0), IVec3::new(10, 0, 0), IVec3::new(20, 0, 0)];
        let added = partition.add_triangle(
            line,
            SurfaceType::Default,
            SurfaceFlags::empty(),
            SurfaceCategory::Static,
        );
        assert!(added.is_none());
        assert_eq!(partition.node_count(), 0);

        let triangle = [IVec3::new(0, 0, 0), IVec3::new(0, 0, 100), IVec3::new(100, 0, 0)];
        let handle = partition
            .add_triangle(
                triangle,
                SurfaceType::Default,
                SurfaceFlags::NO_CAM_COLLISION,
                SurfaceCategory::Dynamic,
            )
            .unwrap();
        let surface = partition.surface(handle).unwrap();
        assert_eq!(surface.partition_kind(), PartitionKind::Floors);
        assert!(surface.is_dynamic());
        assert!(surface.flags.contains(SurfaceFlags::NO_CAM_COLLISION));
    }
}
