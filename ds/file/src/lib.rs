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

use std::{
    fs::{File, OpenOptions},
    os::unix::fs::FileExt,
    path::Path,
};

use sdfs_ds::{BlockDevice, DeviceError, Error, Result, MIN_SECTOR_SIZE};

/// Block device backed by a regular file, with sector `n` at byte offset
/// `n * sector_size`. The file is created when absent and grows on write.
pub struct FileBlockDevice {
    file: File,
    sector_size: usize,
}

impl FileBlockDevice {
    pub fn open<P: AsRef<Path>>(path: P, sector_size: usize) -> Result<Self> {
        if sector_size < MIN_SECTOR_SIZE {
            return Err(Error::Device(DeviceError::SectorSize(sector_size)));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self { file, sector_size })
    }
}

impl BlockDevice for FileBlockDevice {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn read_sector(&self, index: u32, sector: &mut [u8]) -> Result<()> {
        let offset = u64::from(index) * self.sector_size as u64;
        // Sectors past the end of the backing file read as zeroes, so a
        // fresh image decodes as an empty chain.
        let mut filled = 0;
        while filled < sector.len() {
            let count = self.file.read_at(&mut sector[filled..], offset + filled as u64)?;
            if count == 0 {
                break;
            }
            filled += count;
        }
        sector[filled..].fill(0);
        Ok(())
    }

    fn write_sector(&mut self, index: u32, sector: &[u8]) -> Result<()> {
        let offset = u64::from(index) * self.sector_size as u64;
        self.file.write_all_at(sector, offset)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_undersized_sectors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileBlockDevice::open(dir.path().join("image"), 32).is_err());
    }

    #[test]
    fn fresh_image_reads_as_zeroes() {
        let dir = tempfile::tempdir().unwrap();
        let device = FileBlockDevice::open(dir.path().join("image"), 64).unwrap();
        let mut sector = [0xffu8; 64];
        device.read_sector(7, &mut sector).unwrap();
        assert_eq!(sector, [0u8; 64]);
    }

    #[test]
    fn sectors_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = FileBlockDevice::open(dir.path().join("image"), 64).unwrap();
        let data = [0xa5u8; 64];
        device.write_sector(3, &data).unwrap();
        let mut sector = [0u8; 64];
        device.read_sector(3, &mut sector).unwrap();
        assert_eq!(sector, data);
        // the skipped sectors before it read back as zeroes
        device.read_sector(1, &mut sector).unwrap();
        assert_eq!(sector, [0u8; 64]);
    }

    #[test]
    fn reopen_preserves_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image");
        let data = [0x5au8; 64];
        {
            let mut device = FileBlockDevice::open(&path, 64).unwrap();
            device.write_sector(0, &data).unwrap();
        }
        let device = FileBlockDevice::open(&path, 64).unwrap();
        let mut sector = [0u8; 64];
        device.read_sector(0, &mut sector).unwrap();
        assert_eq!(sector, data);
    }
}
