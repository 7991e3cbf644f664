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

//! Durable key-value storage for the address pool.
//!
//! The pool only touches this crate on its cold path: background persistence
//! tasks write through [`DurableStore`], and startup recovery scans it. Keys
//! are UTF-8 strings so prefixes (`address:`, `consumed:`, `meta:`) can be
//! enumerated in order; values are opaque bytes.

pub mod config;
pub mod error;
mod redb_store;
mod store;

pub use config::{StoreConfig, SyncMode};
pub use error::{Error, Result};
pub use redb_store::RedbStore;
pub use store::{DurableStore, KeyValue};
