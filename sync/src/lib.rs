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

//! Host-side driver keeping an SDfs image in sync with a staging directory.
//!
//! The staging directory carries a plain-text journal `sd.log` with one
//! record per line; processing it applies pending `add` and `remove` records
//! to the filesystem and rewrites the journal as `sd2.log`, with every
//! processed `add` replaced by an already-synced marker stamped from the
//! wall clock.

pub mod journal;
pub mod sync;
