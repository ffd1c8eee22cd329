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

use sdfs_ds::{BlockDevice, Result};

/// Block device held entirely in memory, growing on write. Reads past the
/// written region yield zeroes, like a file-backed device does.
///
/// Sector sizes below [`sdfs_ds::MIN_SECTOR_SIZE`] are accepted, which keeps
/// small-sector test images cheap to reason about.
pub struct MemBlockDevice {
    data: Vec<u8>,
    sector_size: usize,
}

impl MemBlockDevice {
    pub fn new(sector_size: usize) -> Self {
        Self {
            data: Vec::new(),
            sector_size,
        }
    }

    /// The raw byte image written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl BlockDevice for MemBlockDevice {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn read_sector(&self, index: u32, sector: &mut [u8]) -> Result<()> {
        let offset = (index as usize * self.sector_size).min(self.data.len());
        let filled = (self.data.len() - offset).min(sector.len());
        sector[..filled].copy_from_slice(&self.data[offset..offset + filled]);
        sector[filled..].fill(0);
        Ok(())
    }

    fn write_sector(&mut self, index: u32, sector: &[u8]) -> Result<()> {
        let offset = index as usize * self.sector_size;
        let end = offset + self.sector_size;
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(sector);
        Ok(())
    }
}
