// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// How eagerly committed writes reach stable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// fsync on every commit.
    #[default]
    Immediate,
    /// Commits become durable at the next immediate commit or
    /// [`flush`](crate::DurableStore::flush).
    Eventual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault, bon::Builder)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file. Parent directories are created on open.
    #[default(_code = "PathBuf::from(\"./data/addrpool.redb\")")]
    #[builder(into, default = PathBuf::from("./data/addrpool.redb"))]
    pub path: PathBuf,

    #[builder(default)]
    pub sync_mode: SyncMode,
}
