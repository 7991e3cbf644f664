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

use crate::Result;

/// A key and its stored value, as returned by a prefix scan.
pub type KeyValue = (String, Vec<u8>);

/// Key-value capability the pool needs from its backing store.
///
/// Every method is synchronous and may block on disk. Callers on the async
/// side run them on a blocking pool; nothing on the request path calls them.
pub trait DurableStore: Send + Sync + 'static {
    /// Insert or overwrite `key`. Durable once it returns `Ok`, subject to
    /// the configured [`SyncMode`](crate::SyncMode).
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Force previously committed writes to stable storage.
    fn flush(&self) -> Result<()>;
}
