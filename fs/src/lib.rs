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

//! SDfs: a flat filesystem storing named byte blobs as a self-describing
//! chain of runs on a fixed-sector block device, with no metadata outside
//! the chain itself.
//!
//! The chain starts at sector 0. Each run begins with a header sector
//! ([`entry::DirectoryEntry`]) naming the blob and sizing the run; payload
//! bytes follow in place. The chain ends at the first sector that does not
//! decode as a header. Free space only exists as the unused tail of a run or
//! past the last run; removing an entry coalesces its run into the
//! predecessor, and writes reuse tails by splitting runs.

pub use sdfs_err::*;

pub mod cached;
pub mod dir;
pub mod entry;
pub mod raw;
pub mod stream;

use log::debug;
use sdfs_ds::BlockDevice;

use crate::dir::DirectoryIterator;
use crate::entry::{sectors_needed, DirectoryEntry, MAX_FIELD, NAME_LENGTH};
use crate::stream::ReadStream;

/// The filesystem facade over a directory iterator.
///
/// One instance owns its iterator, and through it the device; operations run
/// strictly sequentially. A [`FileSystem::read_stream`] borrows the
/// filesystem for the stream's lifetime, so no write can interleave with a
/// read.
pub struct FileSystem<I> {
    iterator: I,
}

impl<I: DirectoryIterator> FileSystem<I> {
    pub fn new(iterator: I) -> Self {
        Self { iterator }
    }

    /// Store `data` under `name`, replacing any previous blob of that name.
    ///
    /// A single pass over the chain picks the destination: the entry of the
    /// same name when the new payload still fits its run (overwrite in
    /// place), otherwise the unused tail of some run by best fit, otherwise
    /// the append zone. An outgrown same-name entry is removed during the
    /// pass, so at most one entry per name survives.
    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let sector_size = self.iterator.device().sector_size();
        if name.is_empty() {
            return Err(Error::Fs(FsError::NameEmpty));
        }
        if name.len() > NAME_LENGTH || name.len() + 13 > sector_size {
            return Err(Error::Fs(FsError::NameTooLong(name.len())));
        }
        if data.len() > MAX_FIELD as usize {
            return Err(Error::Fs(FsError::FileTooLarge(data.len())));
        }
        let needed = sectors_needed(name.len(), data.len(), sector_size);
        debug!("write {name}, {needed} sectors needed");

        let mut existing = false;
        let mut selected = false;
        let mut selected_sector = 0;
        let mut selected_used = 0;
        let mut selected_allocated = 0;
        self.iterator.init()?;
        while self.iterator.more() {
            if !existing && self.iterator.entry().name() == name.as_bytes() {
                existing = true;
                if needed <= self.iterator.entry().allocated() {
                    // the new payload still fits: overwrite from the header on
                    selected = true;
                    selected_sector = self.iterator.entry().start_sector();
                    selected_used = 0;
                    selected_allocated = self.iterator.entry().allocated();
                    break;
                }
                self.iterator.remove()?;
                // the removed run may have been absorbed by the entry
                // selected earlier; the selection grows with it
                if selected && self.iterator.start_sector() == selected_sector {
                    selected_allocated = self.iterator.entry().allocated();
                }
            }
            let unused = self.iterator.entry().unused(sector_size);
            if needed <= unused && (!selected || unused < selected_allocated) {
                selected = true;
                selected_sector = self.iterator.entry().start_sector();
                selected_used = self.iterator.entry().used(sector_size);
                selected_allocated = self.iterator.entry().allocated();
            }
            self.iterator.next()?;
        }
        if !selected {
            selected_sector = self.iterator.start_sector();
            selected_used = 0;
            selected_allocated = needed;
        }
        if selected_used > 0 {
            // the tail of a live run: shrink it and take the remainder
            self.iterator.open_modify_header(selected_sector)?;
            let total_allocated = self.iterator.entry().allocated();
            let used = self.iterator.entry().used(sector_size);
            self.iterator.set_allocated(used);
            self.iterator.close()?;
            selected_sector += self.iterator.entry().allocated();
            selected_allocated = total_allocated - self.iterator.entry().allocated();
        }
        self.iterator
            .open_write(selected_sector, name, data.len() as u32, selected_allocated)?;
        for &value in data {
            self.iterator.append(value)?;
        }
        self.iterator.close()
    }

    /// Remove the first entry named `name`. Absence is not an error.
    pub fn remove_file(&mut self, name: &str) -> Result<()> {
        debug!("remove {name}");
        self.iterator.init()?;
        while self.iterator.more() {
            if self.iterator.entry().name() == name.as_bytes() {
                return self.iterator.remove();
            }
            self.iterator.next()?;
        }
        Ok(())
    }

    /// Open a payload stream over the first entry named `name`, or `None`
    /// when there is no such entry.
    pub fn read_stream(&mut self, name: &str) -> Result<Option<ReadStream<'_, I::Device>>> {
        self.iterator.init()?;
        while self.iterator.more() {
            if self.iterator.entry().name() == name.as_bytes() {
                let mut sector = vec![0u8; self.iterator.device().sector_size()];
                self.iterator.get_sector(&mut sector)?;
                let entry = self.iterator.entry().clone();
                return Ok(Some(ReadStream::new(self.iterator.device(), &entry, sector)));
            }
            self.iterator.next()?;
        }
        Ok(None)
    }

    /// Snapshot of every entry in chain order, empty runs included.
    pub fn entries(&mut self) -> Result<Vec<DirectoryEntry>> {
        let mut entries = Vec::new();
        self.iterator.init()?;
        while self.iterator.more() {
            entries.push(self.iterator.entry().clone());
            self.iterator.next()?;
        }
        Ok(entries)
    }
}
