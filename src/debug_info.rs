// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{
    surface::PartitionKind,
    surface_partition::{CellIndex, SurfaceCategory, SurfacePartition},
};

/// Query counters. Observability only; nothing reads them back during a query.
#[derive(Debug, Default)]
pub struct CallCounters {
    pub(crate) floor: AtomicU32,
    pub(crate) ceil: AtomicU32,
    pub(crate) wall: AtomicU32,
    pub(crate) floor_misses: AtomicU32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub floor: u32,
    pub ceil: u32,
    pub wall: u32,
}

impl CallCounters {
    pub(crate) fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn floor_misses(&self) -> u32 {
        self.floor_misses.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CallCounts {
        CallCounts {
            floor: self.floor.load(Ordering::Relaxed),
            ceil: self.ceil.load(Ordering::Relaxed),
            wall: self.wall.load(Ordering::Relaxed),
        }
    }

    /// Returns the per-query counts and zeroes them. The miss counter is kept.
    pub(crate) fn take(&self) -> CallCounts {
        CallCounts {
            floor: self.floor.swap(0, Ordering::Relaxed),
            ceil: self.ceil.swap(0, Ordering::Relaxed),
            wall: self.wall.swap(0, Ordering::Relaxed),
        }
    }
}

/// Snapshot of one partition cell and the query activity since the last report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellReport {
    /// Linear cell index, `z * NUM_CELLS + x`.
    pub area: usize,
    pub floors: usize,
    pub walls: usize,
    pub ceilings: usize,
    pub calls: CallCounts,
    pub nodes_allocated: usize,
    pub static_surfaces: usize,
    pub dynamic_surfaces: usize,
}

impl CellReport {
    pub(crate) fn collect(
        partition: &SurfacePartition,
        cell: CellIndex,
        counters: &CallCounters,
    ) -> Self {
        let count = |kind: PartitionKind| -> usize {
            [SurfaceCategory::Static, SurfaceCategory::Dynamic]
                .into_iter()
                .map(|category| partition.lists_for(cell, category, kind).len())
                .sum()
        };

        let report = Self {
            area: cell.linear(),
            floors: count(PartitionKind::Floors),
            walls: count(PartitionKind::Walls),
            ceilings: count(PartitionKind::Ceilings),
            calls: counters.take(),
            nodes_allocated: partition.node_count(),
            static_surfaces: partition.surface_count(SurfaceCategory::Static),
            dynamic_surfaces: partition.surface_count(SurfaceCategory::Dynamic),
        };

        log::debug!(
            "area {:x}: floors {} walls {} ceilings {} | calls floor {} wall {} ceil {} | nodes {} static {} dynamic {}",
            report.area,
            report.floors,
            report.walls,
            report.ceilings,
            report.calls.floor,
            report.calls.wall,
            report.calls.ceil,
            report.nodes_allocated,
            report.static_surfaces,
            report.dynamic_surfaces,
        );

        report
    }
}
