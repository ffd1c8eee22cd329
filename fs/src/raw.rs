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

use log::error;
use sdfs_ds::BlockDevice;
use sdfs_err::Result;

use crate::dir::DirectoryIterator;
use crate::entry::DirectoryEntry;

/// Directory iterator reading every header from the device.
///
/// Holds one buffered sector and the previous run's start sector, the latter
/// for coalescing on removal. During a write the cursor walks the run sector
/// by sector; afterwards it rests one past the last written sector.
pub struct RawDirectoryIterator<'d, D: BlockDevice> {
    device: &'d mut D,
    sector: Vec<u8>,
    entry: DirectoryEntry,
    more: bool,
    start_sector: u32,
    next_sector: u32,
    previous_sector: Option<u32>,
    open_for_write: bool,
    header_modified: bool,
    write_position: usize,
    first_unused_sector: u32,
}

impl<'d, D: BlockDevice> RawDirectoryIterator<'d, D> {
    pub fn new(device: &'d mut D) -> Self {
        let sector = vec![0u8; device.sector_size()];
        Self {
            device,
            sector,
            entry: DirectoryEntry::default(),
            more: false,
            start_sector: 0,
            next_sector: 0,
            previous_sector: None,
            open_for_write: false,
            header_modified: false,
            write_position: 0,
            first_unused_sector: 0,
        }
    }
}

impl<D: BlockDevice> DirectoryIterator for RawDirectoryIterator<'_, D> {
    type Device = D;

    fn init(&mut self) -> Result<()> {
        self.next_sector = 0;
        self.previous_sector = None;
        self.next()
    }

    fn next(&mut self) -> Result<()> {
        if self.next_sector > 0 {
            self.previous_sector = Some(self.start_sector);
        }
        self.start_sector = self.next_sector;
        self.more = false;
        self.device.read_sector(self.start_sector, &mut self.sector)?;
        if let Some(entry) = DirectoryEntry::decode(&self.sector, self.start_sector) {
            self.next_sector += entry.allocated();
            self.entry = entry;
            self.more = true;
        }
        Ok(())
    }

    fn more(&self) -> bool {
        self.more
    }

    fn entry(&self) -> &DirectoryEntry {
        &self.entry
    }

    fn start_sector(&self) -> u32 {
        self.start_sector
    }

    fn get_sector(&mut self, sector: &mut [u8]) -> Result<()> {
        sector.copy_from_slice(&self.sector);
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        if let Some(previous_sector) = self.previous_sector.take() {
            // the predecessor absorbs this run, and the cursor stays on it
            let allocated = self.entry.allocated();
            self.start_sector = previous_sector;
            self.device.read_sector(self.start_sector, &mut self.sector)?;
            let Some(mut entry) = DirectoryEntry::decode(&self.sector, self.start_sector) else {
                error!("coalesce target at sector {} is not a header", self.start_sector);
                return Ok(());
            };
            entry.add_allocated(allocated);
            entry.encode(&mut self.sector);
            self.device.write_sector(self.start_sector, &self.sector)?;
            self.entry = entry;
        } else {
            // the chain head has nothing to coalesce into: empty it in place
            self.entry.clear_name();
            self.entry.set_length(0);
            self.entry.encode(&mut self.sector);
            self.device.write_sector(self.start_sector, &self.sector)?;
        }
        Ok(())
    }

    fn open_modify_header(&mut self, sector: u32) -> Result<()> {
        self.previous_sector = None;
        self.start_sector = sector;
        self.device.read_sector(sector, &mut self.sector)?;
        match DirectoryEntry::decode(&self.sector, sector) {
            Some(entry) => self.entry = entry,
            None => {
                error!("no header to modify at sector {sector}");
                return Ok(());
            }
        }
        self.open_for_write = true;
        self.header_modified = false;
        self.write_position = 0;
        Ok(())
    }

    fn clear_name(&mut self) {
        if !self.open_for_write {
            return;
        }
        self.entry.clear_name();
        self.header_modified = true;
    }

    fn set_length(&mut self, length: u32) {
        if !self.open_for_write {
            return;
        }
        self.entry.set_length(length);
        self.header_modified = true;
    }

    fn set_allocated(&mut self, allocated: u32) {
        if !self.open_for_write {
            return;
        }
        self.entry.set_allocated(allocated);
        self.header_modified = true;
    }

    fn open_write(&mut self, sector: u32, name: &str, length: u32, allocated: u32) -> Result<()> {
        self.previous_sector = None;
        self.start_sector = sector;
        self.entry = DirectoryEntry::new(sector, name.as_bytes(), length, allocated);
        self.entry.encode(&mut self.sector);
        self.header_modified = false;
        self.write_position = self.entry.start_of_data();
        self.first_unused_sector = sector + self.entry.used(self.device.sector_size());
        self.open_for_write = true;
        Ok(())
    }

    fn append(&mut self, value: u8) -> Result<()> {
        if !self.open_for_write {
            return Ok(());
        }
        if self.header_modified {
            if self.write_position > 0 {
                error!("header edit staged after payload bytes, dropped");
                return Ok(());
            }
            self.entry.encode(&mut self.sector);
            self.header_modified = false;
            self.write_position = self.entry.start_of_data();
        }
        if self.write_position >= self.device.sector_size() {
            if self.start_sector <= self.first_unused_sector {
                self.device.write_sector(self.start_sector, &self.sector)?;
            } else {
                error!("write past the reserved run at sector {}", self.start_sector);
            }
            self.start_sector += 1;
            self.write_position = 0;
        }
        self.sector[self.write_position] = value;
        self.write_position += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.open_for_write {
            return Ok(());
        }
        if self.header_modified {
            self.entry.encode(&mut self.sector);
        }
        if self.write_position > 0 {
            self.sector[self.write_position..].fill(0);
        }
        if self.header_modified || self.write_position > 0 {
            self.device.write_sector(self.start_sector, &self.sector)?;
            self.start_sector += 1;
        }
        self.open_for_write = false;
        Ok(())
    }

    fn device(&self) -> &D {
        self.device
    }
}

#[cfg(test)]
mod tests {
    use sdfs_ds_mem::MemBlockDevice;

    use super::*;

    fn write(iterator: &mut RawDirectoryIterator<'_, MemBlockDevice>, sector: u32, name: &str, data: &[u8], allocated: u32) {
        iterator
            .open_write(sector, name, data.len() as u32, allocated)
            .unwrap();
        for &value in data {
            iterator.append(value).unwrap();
        }
        iterator.close().unwrap();
    }

    #[test]
    fn empty_device_has_no_entries() {
        let mut device = MemBlockDevice::new(32);
        let mut iterator = RawDirectoryIterator::new(&mut device);
        iterator.init().unwrap();
        assert!(!iterator.more());
        assert_eq!(iterator.start_sector(), 0);
    }

    #[test]
    fn scan_follows_allocations() {
        let mut device = MemBlockDevice::new(32);
        let mut iterator = RawDirectoryIterator::new(&mut device);
        write(&mut iterator, 0, "a", &[1; 10], 1);
        write(&mut iterator, 1, "b", &[2; 40], 2);

        iterator.init().unwrap();
        assert!(iterator.more());
        assert_eq!(iterator.entry().name(), b"a");
        assert_eq!(iterator.entry().start_sector(), 0);
        iterator.next().unwrap();
        assert_eq!(iterator.entry().name(), b"b");
        assert_eq!(iterator.entry().start_sector(), 1);
        assert_eq!(iterator.entry().allocated(), 2);
        iterator.next().unwrap();
        assert!(!iterator.more());
        assert_eq!(iterator.start_sector(), 3);
    }

    #[test]
    fn close_advances_past_the_last_written_sector() {
        let mut device = MemBlockDevice::new(32);
        let mut iterator = RawDirectoryIterator::new(&mut device);
        write(&mut iterator, 0, "a", &[1; 40], 2);
        assert_eq!(iterator.start_sector(), 2);
    }

    #[test]
    fn removing_the_head_empties_it_in_place() {
        let mut device = MemBlockDevice::new(32);
        let mut iterator = RawDirectoryIterator::new(&mut device);
        write(&mut iterator, 0, "a", &[1; 10], 1);
        write(&mut iterator, 1, "b", &[2; 10], 1);

        iterator.init().unwrap();
        iterator.remove().unwrap();

        iterator.init().unwrap();
        assert!(iterator.more());
        assert_eq!(iterator.entry().name(), b"");
        assert_eq!(iterator.entry().length(), 0);
        assert_eq!(iterator.entry().allocated(), 1);
        iterator.next().unwrap();
        assert_eq!(iterator.entry().name(), b"b");
    }

    #[test]
    fn removing_an_inner_entry_coalesces_into_the_predecessor() {
        let mut device = MemBlockDevice::new(32);
        let mut iterator = RawDirectoryIterator::new(&mut device);
        write(&mut iterator, 0, "a", &[1; 10], 1);
        write(&mut iterator, 1, "b", &[2; 40], 2);
        write(&mut iterator, 3, "c", &[3; 10], 1);

        iterator.init().unwrap();
        iterator.next().unwrap();
        iterator.remove().unwrap();
        // the cursor rests on the grown predecessor
        assert_eq!(iterator.start_sector(), 0);
        assert_eq!(iterator.entry().allocated(), 3);

        iterator.init().unwrap();
        assert_eq!(iterator.entry().name(), b"a");
        assert_eq!(iterator.entry().allocated(), 3);
        iterator.next().unwrap();
        assert_eq!(iterator.entry().name(), b"c");
        assert_eq!(iterator.entry().start_sector(), 3);
    }

    #[test]
    fn staged_header_edits_apply_on_close() {
        let mut device = MemBlockDevice::new(32);
        let mut iterator = RawDirectoryIterator::new(&mut device);
        write(&mut iterator, 0, "a", &[1; 10], 4);

        iterator.open_modify_header(0).unwrap();
        iterator.set_allocated(1);
        iterator.close().unwrap();

        iterator.init().unwrap();
        assert_eq!(iterator.entry().allocated(), 1);
        assert_eq!(iterator.entry().length(), 10);
    }

    #[test]
    fn append_without_open_is_dropped() {
        let mut device = MemBlockDevice::new(32);
        let mut iterator = RawDirectoryIterator::new(&mut device);
        iterator.append(0xff).unwrap();
        iterator.close().unwrap();
        assert!(device.as_bytes().is_empty());
    }

    #[test]
    fn appends_after_a_header_edit_are_dropped() {
        let mut device = MemBlockDevice::new(32);
        let mut iterator = RawDirectoryIterator::new(&mut device);
        iterator.open_write(0, "a", 2, 1).unwrap();
        iterator.append(1).unwrap();
        iterator.set_length(0);
        // with an edit staged on top of payload bytes, further appends are
        // dropped; the edit itself still flushes on close
        iterator.append(2).unwrap();
        iterator.close().unwrap();

        iterator.init().unwrap();
        assert!(iterator.more());
        assert_eq!(iterator.entry().length(), 0);
    }
}
