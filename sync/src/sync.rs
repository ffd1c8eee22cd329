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

use std::fs;
use std::path::Path;

use log::error;
use sdfs_fs::dir::DirectoryIterator;
use sdfs_fs::{FileSystem, Result};

use crate::journal::{self, Record};

/// Apply `<dir>/sd.log` to the filesystem and rewrite it as `<dir>/sd2.log`.
///
/// Records are processed in order: `remove` records call
/// [`FileSystem::remove_file`] and are kept as they are, `add` records store
/// `<dir>/<name>` and are replaced by a marker stamped from the wall clock,
/// staying `add` when the write fails so a later run retries. An `add` whose
/// staged file cannot be read is reported and dropped from the rewritten
/// journal.
pub fn process<I: DirectoryIterator>(filesystem: &mut FileSystem<I>, dir: &Path) -> Result<()> {
    let records = journal::read(dir)?;
    let mut processed = Vec::with_capacity(records.len());
    for record in records {
        match record {
            Record::Remove { name } => {
                filesystem.remove_file(&name)?;
                processed.push(Record::Remove { name });
            }
            Record::Add { name } => match fs::read(dir.join(&name)) {
                Ok(data) => match filesystem.write_file(&name, &data) {
                    Ok(()) => processed.push(Record::synced_now(name)),
                    Err(err) => {
                        error!("storing {name} failed: {err}");
                        processed.push(Record::Add { name });
                    }
                },
                Err(err) => {
                    error!("cannot read staged file {name}: {err}");
                }
            },
            record => processed.push(record),
        }
    }
    journal::write(dir, &processed)?;
    Ok(())
}

/// Check every journaled blob against its staged file and report the
/// differences found. `remove` records are skipped.
pub fn compare<I: DirectoryIterator>(filesystem: &mut FileSystem<I>, dir: &Path) -> Result<Vec<String>> {
    let mut findings = Vec::new();
    for record in journal::read(dir)? {
        if let Record::Remove { .. } = record {
            continue;
        }
        let name = record.name();
        let Some(stream) = filesystem.read_stream(name)? else {
            findings.push(format!("{name} is not stored"));
            continue;
        };
        match fs::read(dir.join(name)) {
            Ok(data) => {
                if stream.length() as usize != data.len() {
                    findings.push(format!(
                        "{name} is stored with length {}, not {}",
                        stream.length(),
                        data.len()
                    ));
                } else if let Some(position) =
                    stream.zip(data.iter()).position(|(stored, &staged)| stored != staged)
                {
                    findings.push(format!("{name} differs at byte {position}"));
                }
            }
            Err(err) => findings.push(format!("cannot read staged file {name}: {err}")),
        }
    }
    Ok(findings)
}
