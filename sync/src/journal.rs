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

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{Datelike, Local, Timelike};

/// One journal record.
///
/// `Synced` carries the stamp of a completed `add`: `date` is decimal
/// YYYYMMDD, `minute` is minutes since midnight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Add { name: String },
    Remove { name: String },
    Synced { date: u32, minute: u32, name: String },
}

impl Record {
    /// Parse one journal line, already stripped of its terminator.
    ///
    /// Anything that is neither an `add` nor a `remove` is read as a synced
    /// marker, with missing numbers as zero.
    pub fn parse(line: &str) -> Self {
        if let Some(name) = line.strip_prefix("add ") {
            return Self::Add { name: name.into() };
        }
        if let Some(name) = line.strip_prefix("remove ") {
            return Self::Remove { name: name.into() };
        }
        let (date, rest) = split_number(line);
        let (minute, name) = split_number(rest);
        Self::Synced { date, minute, name: name.into() }
    }

    /// The marker for an `add` completed now.
    pub fn synced_now(name: String) -> Self {
        let now = Local::now();
        Self::Synced {
            date: now.year() as u32 * 10000 + now.month() * 100 + now.day(),
            minute: now.hour() * 60 + now.minute(),
            name,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Add { name } | Self::Remove { name } | Self::Synced { name, .. } => name,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { name } => write!(f, "add {name}"),
            Self::Remove { name } => write!(f, "remove {name}"),
            Self::Synced { date, minute, name } => write!(f, "{date} {minute} {name}"),
        }
    }
}

fn split_number(text: &str) -> (u32, &str) {
    let digits = text.len() - text.trim_start_matches(|ch: char| ch.is_ascii_digit()).len();
    let number = text[..digits].parse().unwrap_or(0);
    let rest = text[digits..].strip_prefix(' ').unwrap_or(&text[digits..]);
    (number, rest)
}

/// Read `<dir>/sd.log`. A missing journal is an empty one; lines may end in
/// CR, LF, or CRLF.
pub fn read(dir: &Path) -> io::Result<Vec<Record>> {
    let text = match fs::read_to_string(dir.join("sd.log")) {
        Ok(text) => text,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error),
    };
    Ok(text
        .split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .map(Record::parse)
        .collect())
}

/// Write the processed journal to `<dir>/sd2.log`, CRLF terminated.
pub fn write(dir: &Path, records: &[Record]) -> io::Result<()> {
    let mut text = String::new();
    for record in records {
        text.push_str(&record.to_string());
        text.push_str("\r\n");
    }
    fs::write(dir.join("sd2.log"), text)
}
