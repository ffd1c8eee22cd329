// Copyright 2024 Kevin Ludwig
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub use sdfs_err::*;

/// Smallest sector size the on-disk format supports. Devices meant for
/// production use shall reject anything below it.
pub const MIN_SECTOR_SIZE: usize = 64;

/// A storage medium addressed in fixed-size sectors.
///
/// Sector writes shall be atomic at the device: after a power loss a sector
/// holds either its previous or its new content, never a mix.
pub trait BlockDevice {
    fn sector_size(&self) -> usize;

    /// Fill `sector` with the contents of sector `index`.
    fn read_sector(&self, index: u32, sector: &mut [u8]) -> Result<()>;

    /// Write exactly one sector at `index`.
    fn write_sector(&mut self, index: u32, sector: &[u8]) -> Result<()>;
}
