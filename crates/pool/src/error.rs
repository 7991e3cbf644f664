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

use addrpool_common_storage_kv as kv;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to scan '{prefix}' entries"))]
    Scan {
        prefix:   &'static str,
        source:   kv::Error,
        #[snafu(implicit)]
        loc:      snafu::Location,
    },

    #[snafu(display("Failed to read '{key}'"))]
    Read {
        key:    String,
        source: kv::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Malformed key '{key}'"))]
    MalformedKey {
        key: String,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("Malformed value under '{key}': expected 8 bytes, got {len}"))]
    MalformedMeta {
        key: &'static str,
        len: usize,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("Undecodable record under '{key}'"))]
    DecodeRecord {
        key:    String,
        source: serde_json::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Record under '{key}' carries id {found}"))]
    IdMismatch {
        key:   String,
        found: u64,
        #[snafu(implicit)]
        loc:   snafu::Location,
    },

    #[snafu(display("Failed to compact consumed record {id}"))]
    Compact {
        id:     u64,
        source: kv::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Failed to write checkpoint key '{key}'"))]
    Checkpoint {
        key:    &'static str,
        source: kv::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Invalid vanity suffix '{suffix}': {reason}"))]
    InvalidSuffix {
        suffix: String,
        reason: &'static str,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Whether the failure came from the store and may clear up on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Scan { source, .. }
            | Error::Read { source, .. }
            | Error::Compact { source, .. }
            | Error::Checkpoint { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}
