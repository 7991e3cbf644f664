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

use snafu::Snafu;

/// Errors returned by a [`DurableStore`](crate::DurableStore).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to create store directory {path}"))]
    CreateDir {
        path:   String,
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Failed to open store at {path}"))]
    Open {
        path:   String,
        source: redb::DatabaseError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Failed to begin store transaction"))]
    Transaction {
        source: redb::TransactionError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Failed to open store table"))]
    Table {
        source: redb::TableError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Store I/O failed on key {key}"))]
    Storage {
        key:    String,
        source: redb::StorageError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Failed to commit store transaction"))]
    Commit {
        source: redb::CommitError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// Failure reported by a store backend other than redb.
    #[snafu(display("Store backend unavailable: {reason}"))]
    Unavailable {
        reason:    String,
        transient: bool,
        #[snafu(implicit)]
        loc:       snafu::Location,
    },
}

impl Error {
    /// Whether retrying the same operation may succeed.
    ///
    /// Lock contention and I/O hiccups are transient; a corrupted file, a
    /// missing table or a database that failed to open are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transaction { .. } | Error::Commit { .. } => true,
            Error::Storage { source, .. } => matches!(source, redb::StorageError::Io(_)),
            Error::Unavailable { transient, .. } => *transient,
            Error::CreateDir { .. } | Error::Open { .. } | Error::Table { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
