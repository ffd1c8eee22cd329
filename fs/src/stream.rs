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

use crate::entry::DirectoryEntry;

/// Sequential reader over the payload of one entry.
///
/// Owns a single sector buffer, seeded with the entry's header sector, and
/// follows the payload across the run. The stream ends after `length` bytes;
/// it also ends early, with a diagnostic, when the payload would continue
/// past the run's used sectors or a sector cannot be read. Callers compare
/// the yielded byte count against [`ReadStream::length`] to detect
/// truncation.
pub struct ReadStream<'d, D: BlockDevice> {
    device: &'d D,
    sector: Vec<u8>,
    length: u32,
    more: bool,
    position: u32,
    position_in_sector: usize,
    current_sector: u32,
    first_unused_sector: u32,
}

impl<'d, D: BlockDevice> ReadStream<'d, D> {
    /// `sector` holds the entry's header sector.
    pub(crate) fn new(device: &'d D, entry: &DirectoryEntry, sector: Vec<u8>) -> Self {
        Self {
            length: entry.length(),
            more: entry.length() > 0,
            position: 0,
            position_in_sector: entry.start_of_data(),
            current_sector: entry.start_sector(),
            first_unused_sector: entry.start_sector() + entry.used(device.sector_size()),
            device,
            sector,
        }
    }

    /// Payload length according to the entry's header.
    pub fn length(&self) -> u32 {
        self.length
    }
}

impl<D: BlockDevice> Iterator for ReadStream<'_, D> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if !self.more {
            return None;
        }
        let value = self.sector[self.position_in_sector];
        self.position += 1;
        if self.position >= self.length {
            self.more = false;
            return Some(value);
        }
        self.position_in_sector += 1;
        if self.position_in_sector >= self.device.sector_size() {
            self.current_sector += 1;
            if self.current_sector >= self.first_unused_sector {
                error!("payload continues past the used sectors at {}", self.current_sector);
                self.more = false;
                return Some(value);
            }
            if let Err(error) = self.device.read_sector(self.current_sector, &mut self.sector) {
                error!("reading sector {} failed: {error}", self.current_sector);
                self.more = false;
                return Some(value);
            }
            self.position_in_sector = 0;
        }
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.length - self.position) as usize;
        if self.more {
            (0, Some(remaining))
        } else {
            (0, Some(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use sdfs_ds_mem::MemBlockDevice;

    use super::*;

    fn device_with_entry(name: &[u8], payload: &[u8], allocated: u32) -> (MemBlockDevice, DirectoryEntry) {
        let mut device = MemBlockDevice::new(32);
        let entry = DirectoryEntry::new(0, name, payload.len() as u32, allocated);
        let mut image = vec![0u8; 32 * allocated as usize];
        entry.encode(&mut image);
        image[entry.start_of_data()..entry.start_of_data() + payload.len()]
            .copy_from_slice(payload);
        for (index, sector) in image.chunks(32).enumerate() {
            device.write_sector(index as u32, sector).unwrap();
        }
        (device, entry)
    }

    fn open<'d>(device: &'d MemBlockDevice, entry: &DirectoryEntry) -> ReadStream<'d, MemBlockDevice> {
        let mut sector = vec![0u8; 32];
        device.read_sector(entry.start_sector(), &mut sector).unwrap();
        ReadStream::new(device, entry, sector)
    }

    #[test]
    fn reads_across_sector_boundaries() {
        let payload: Vec<u8> = (0..40).collect();
        let (device, entry) = device_with_entry(b"a", &payload, 2);
        assert_eq!(open(&device, &entry).collect::<Vec<u8>>(), payload);
    }

    #[test]
    fn empty_payload_yields_nothing() {
        let (device, entry) = device_with_entry(b"a", b"", 1);
        let mut stream = open(&device, &entry);
        assert_eq!(stream.length(), 0);
        assert_eq!(stream.next(), None);
    }

    #[test]
    fn last_byte_lands_on_the_sector_boundary() {
        // 13 + 1 + 50 = 64: the payload saturates two 32 byte sectors
        let payload: Vec<u8> = (0..50).collect();
        let (device, entry) = device_with_entry(b"a", &payload, 2);
        assert_eq!(entry.used(32), 2);
        assert_eq!(open(&device, &entry).collect::<Vec<u8>>(), payload);
    }

    #[test]
    fn tail_reuse_does_not_leak_into_the_stream() {
        // a run longer than its payload needs: the stream must not run into
        // the unused tail
        let payload: Vec<u8> = (0..40).collect();
        let (device, entry) = device_with_entry(b"a", &payload, 5);
        assert_eq!(open(&device, &entry).collect::<Vec<u8>>(), payload);
    }
}
