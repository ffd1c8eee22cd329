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

use sdfs_ds::BlockDevice;
use sdfs_err::Result;

use crate::entry::DirectoryEntry;

/// Cursor over the chain of runs, which doubles as the write handle.
///
/// Implemented twice: [`crate::raw::RawDirectoryIterator`] scans the device
/// directly, [`crate::cached::CachingDirectoryIterator`] scans an in-memory
/// mirror and writes through. A single instance owns the device for its
/// lifetime; nested iteration is not supported.
///
/// Device failures surface as errors. A header that fails to decode is not
/// an error, it terminates the chain. Calls out of sequence (an `append`
/// without `open_write`, a staged header edit after payload bytes) are
/// dropped, at most with a diagnostic.
pub trait DirectoryIterator {
    type Device: BlockDevice;

    /// Position the cursor on the chain head. With an empty chain, `more`
    /// is false and the cursor reports the append zone.
    fn init(&mut self) -> Result<()>;

    /// Whether the cursor is on a valid entry.
    fn more(&self) -> bool;

    /// Advance past the current run.
    fn next(&mut self) -> Result<()>;

    /// The current entry.
    fn entry(&self) -> &DirectoryEntry;

    /// The cursor sector: the current entry's start, or the append zone once
    /// the chain is exhausted. After [`DirectoryIterator::close`], one past
    /// the last written sector.
    fn start_sector(&self) -> u32;

    /// Copy the current entry's header sector into `sector`.
    fn get_sector(&mut self, sector: &mut [u8]) -> Result<()>;

    /// Remove the current entry: coalesce its run into the predecessor, or,
    /// on the chain head, empty the entry in place keeping its allocation.
    fn remove(&mut self) -> Result<()>;

    /// Begin a header-only edit; the staged setters below apply on `close`.
    fn open_modify_header(&mut self, sector: u32) -> Result<()>;

    fn clear_name(&mut self);

    fn set_length(&mut self, length: u32);

    fn set_allocated(&mut self, allocated: u32);

    /// Begin writing an entry at `sector`: the header is staged immediately,
    /// payload bytes follow through `append`.
    fn open_write(&mut self, sector: u32, name: &str, length: u32, allocated: u32) -> Result<()>;

    /// Append one payload byte, flushing full sectors as they fill.
    fn append(&mut self, value: u8) -> Result<()>;

    /// Flush any staged header edit and any partial sector, zero-padding the
    /// remainder, and advance the cursor past the last written sector.
    fn close(&mut self) -> Result<()>;

    fn device(&self) -> &Self::Device;
}
