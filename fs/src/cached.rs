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
use crate::raw::RawDirectoryIterator;

/// Directory iterator scanning an in-memory mirror of the chain.
///
/// Construction performs one full scan through an embedded raw iterator and
/// snapshots every header, ordered by start sector. Scans are then served
/// from the mirror; every mutation still writes through to the device, which
/// remains the source of truth.
pub struct CachingDirectoryIterator<'d, D: BlockDevice> {
    raw: RawDirectoryIterator<'d, D>,
    entries: Vec<DirectoryEntry>,
    current: Option<usize>,
    previous: Option<usize>,
    entry: DirectoryEntry,
    more: bool,
    start_sector: u32,
    append_sector: u32,
    open_for_write: bool,
}

impl<'d, D: BlockDevice> CachingDirectoryIterator<'d, D> {
    pub fn new(device: &'d mut D) -> Result<Self> {
        let mut raw = RawDirectoryIterator::new(device);
        let mut entries = Vec::new();
        raw.init()?;
        while raw.more() {
            entries.push(raw.entry().clone());
            raw.next()?;
        }
        let append_sector = raw.start_sector();
        Ok(Self {
            raw,
            entries,
            current: None,
            previous: None,
            entry: DirectoryEntry::default(),
            more: false,
            start_sector: 0,
            append_sector,
            open_for_write: false,
        })
    }

    /// Refresh the cursor snapshot from the cache.
    fn load_current(&mut self) {
        match self.current {
            Some(index) => {
                self.entry = self.entries[index].clone();
                self.start_sector = self.entry.start_sector();
                self.more = true;
            }
            None => {
                self.more = false;
                self.start_sector = self.append_sector;
            }
        }
    }
}

impl<D: BlockDevice> DirectoryIterator for CachingDirectoryIterator<'_, D> {
    type Device = D;

    fn init(&mut self) -> Result<()> {
        self.previous = None;
        self.current = (!self.entries.is_empty()).then_some(0);
        self.load_current();
        Ok(())
    }

    fn next(&mut self) -> Result<()> {
        self.previous = self.current;
        self.current = match self.current {
            Some(index) if index + 1 < self.entries.len() => Some(index + 1),
            _ => None,
        };
        self.load_current();
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
        if self.more {
            self.raw.device().read_sector(self.entry.start_sector(), sector)?;
        }
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        let Some(index) = self.current else {
            return Ok(());
        };
        if let Some(previous_index) = self.previous.take() {
            let removed = self.entries.remove(index);
            self.entries[previous_index].add_allocated(removed.allocated());
            self.current = Some(previous_index);
            self.load_current();

            self.raw.open_modify_header(self.entry.start_sector())?;
            self.raw.set_allocated(self.entry.allocated());
            self.raw.close()
        } else {
            let entry = &mut self.entries[index];
            entry.clear_name();
            entry.set_length(0);
            let sector = entry.start_sector();
            self.load_current();

            self.raw.open_modify_header(sector)?;
            self.raw.clear_name();
            self.raw.set_length(0);
            self.raw.close()
        }
    }

    fn open_modify_header(&mut self, sector: u32) -> Result<()> {
        self.previous = None;
        let Some(index) = self.entries.iter().position(|entry| entry.start_sector() == sector)
        else {
            error!("no cached header at sector {sector}");
            return Ok(());
        };
        self.raw.open_modify_header(sector)?;
        self.current = Some(index);
        self.load_current();
        self.open_for_write = true;
        Ok(())
    }

    fn clear_name(&mut self) {
        if !self.open_for_write {
            return;
        }
        self.raw.clear_name();
        if let Some(index) = self.current {
            self.entries[index].clear_name();
        }
        self.entry.clear_name();
    }

    fn set_length(&mut self, length: u32) {
        if !self.open_for_write {
            return;
        }
        self.raw.set_length(length);
        if let Some(index) = self.current {
            self.entries[index].set_length(length);
        }
        self.entry.set_length(length);
    }

    fn set_allocated(&mut self, allocated: u32) {
        if !self.open_for_write {
            return;
        }
        self.raw.set_allocated(allocated);
        if let Some(index) = self.current {
            self.entries[index].set_allocated(allocated);
        }
        self.entry.set_allocated(allocated);
    }

    fn open_write(&mut self, sector: u32, name: &str, length: u32, allocated: u32) -> Result<()> {
        self.previous = None;
        self.raw.open_write(sector, name, length, allocated)?;
        let entry = self.raw.entry().clone();
        match self.entries.iter().position(|entry| entry.start_sector() == sector) {
            Some(index) => {
                self.entries[index] = entry;
                self.current = Some(index);
            }
            None => {
                let index = self
                    .entries
                    .iter()
                    .position(|entry| entry.start_sector() > sector)
                    .unwrap_or(self.entries.len());
                self.entries.insert(index, entry);
                self.current = Some(index);
            }
        }
        self.load_current();
        self.open_for_write = true;
        Ok(())
    }

    fn append(&mut self, value: u8) -> Result<()> {
        if !self.open_for_write {
            return Ok(());
        }
        self.raw.append(value)
    }

    fn close(&mut self) -> Result<()> {
        if !self.open_for_write {
            return Ok(());
        }
        self.raw.close()?;
        self.open_for_write = false;
        if self.raw.start_sector() > self.append_sector {
            self.append_sector = self.raw.start_sector();
        }
        Ok(())
    }

    fn device(&self) -> &D {
        self.raw.device()
    }
}
