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

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sdfs_ds_file::FileBlockDevice;
use sdfs_fs::cached::CachingDirectoryIterator;
use sdfs_fs::{FileSystem, Result};
use sdfs_sync::sync;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Filesystem image or block device path
    #[arg(short, long, default_value = "Test.sdfs")]
    device: PathBuf,

    /// Staging directory holding sd.log and the files to sync
    #[arg(short, long, default_value = ".")]
    staging: PathBuf,

    /// Sector size of the device, in bytes
    #[arg(long, default_value_t = 512)]
    sector_size: usize,

    /// Without a subcommand, the journal is processed
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List stored files
    Ls {
        /// Also show every run's start sector and allocation
        #[arg(short, long)]
        long: bool,
    },
    /// Compare journaled files against their stored blobs
    Cmp,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut device = FileBlockDevice::open(&args.device, args.sector_size)?;
    let iterator = CachingDirectoryIterator::new(&mut device)?;
    let mut fs = FileSystem::new(iterator);

    match args.command {
        Some(Command::Ls { long }) => {
            for entry in fs.entries()? {
                let name = String::from_utf8_lossy(entry.name()).into_owned();
                if long {
                    println!(
                        "{:6} {:6} {:6} {name}",
                        entry.start_sector(),
                        entry.allocated(),
                        entry.length()
                    );
                } else if !entry.name().is_empty() {
                    println!("{name} : {}", entry.length());
                }
            }
        }
        Some(Command::Cmp) => {
            for finding in sync::compare(&mut fs, &args.staging)? {
                println!("{finding}");
            }
        }
        None => sync::process(&mut fs, &args.staging)?,
    }
    Ok(())
}
