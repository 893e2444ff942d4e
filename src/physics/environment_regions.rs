// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use thiserror::Error;

use crate::physics::FLOOR_LOWER_LIMIT;

const RECORD_LEN: usize = 6;
/// Region kinds below this are water boxes.
const GAS_KIND_MIN: i16 = 50;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegionTableError {
    #[error("region table is empty")]
    Empty,
    #[error("region table has a negative count ({0})")]
    NegativeCount(i16),
    #[error("region table declares {declared} regions but only holds data for {available}")]
    Truncated { declared: usize, available: usize },
}

/// Axis-aligned box in the horizontal plane with a surface level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentRegion {
    pub kind: i16,
    pub min_x: i16,
    pub min_z: i16,
    pub max_x: i16,
    pub max_z: i16,
    pub level: i16,
}

impl EnvironmentRegion {
    fn contains(&self, x: f32, z: f32) -> bool {
        (self.min_x as f32) < x
            && x < self.max_x as f32
            && (self.min_z as f32) < z
            && z < self.max_z as f32
    }

    pub fn is_water(&self) -> bool {
        self.kind < GAS_KIND_MIN
    }

    pub fn is_gas(&self) -> bool {
        self.kind >= GAS_KIND_MIN && self.kind % 10 == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentRegions {
    regions: Vec<EnvironmentRegion>,
}

impl EnvironmentRegions {
    /// Parses a count-prefixed table of `kind, min_x, min_z, max_x, max_z, level`
    /// records. Data after the last declared record is ignored.
    pub fn from_packed(table: &[i16]) -> Result<Self, RegionTableError> {
        let (&count, records) = table.split_first().ok_or(RegionTableError::Empty)?;
        if count < 0 {
            return Err(RegionTableError::NegativeCount(count));
        }

        let declared = count as usize;
        let available = records.len() / RECORD_LEN;
        if available < declared {
            return Err(RegionTableError::Truncated {
                declared,
                available,
            });
        }

        let regions = records
            .chunks_exact(RECORD_LEN)
            .take(declared)
            .map(|r| EnvironmentRegion {
                kind: r[0],
                min_x: r[1],
                min_z: r[2],
                max_x: r[3],
                max_z: r[4],
                level: r[5],
            })
            .collect();

        Ok(Self { regions })
    }

    pub fn regions(&self) -> &[EnvironmentRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    fn first_level(&self, x: f32, z: f32, accept: impl Fn(&EnvironmentRegion) -> bool) -> f32 {
        self.regions
            .iter()
            .find(|&region| accept(region) && region.contains(x, z))
            .map_or(FLOOR_LOWER_LIMIT, |region| region.level as f32)
    }

    /// Water level of the first water box containing (x, z).
    pub fn water_level(&self, x: f32, z: f32) -> f32 {
        self.first_level(x, z, EnvironmentRegion::is_water)
    }

    /// Level of the first gas box containing (x, z).
    pub fn gas_level(&self, x: f32, z: f32) -> f32 {
        self.first_level(x, z, EnvironmentRegion::is_gas)
    }
}
