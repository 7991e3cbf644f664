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

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monotonic identifier handed out by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressId(u64);

impl AddressId {
    pub const fn new(id: u64) -> Self { AddressId(id) }

    pub const fn get(self) -> u64 { self.0 }
}

impl fmt::Display for AddressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl From<u64> for AddressId {
    fn from(id: u64) -> Self { AddressId(id) }
}

/// A generated address and the secret material that controls it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address: String,
    pub secret:  String,
}

impl Address {
    pub fn new(address: impl Into<String>, secret: impl Into<String>) -> Self {
        Address {
            address: address.into(),
            secret:  secret.into(),
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Address")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// An address as it lives in the pool and in the durable store.
///
/// Records are immutable once created. Two records are the same record when
/// their ids match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id:         AddressId,
    pub payload:    Address,
    pub created_at: DateTime<Utc>,
}

impl AddressRecord {
    pub fn new(id: AddressId, payload: Address) -> Self {
        AddressRecord {
            id,
            payload,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn encode(&self) -> serde_json::Result<Vec<u8>> { serde_json::to_vec(self) }

    pub(crate) fn decode(bytes: &[u8]) -> serde_json::Result<Self> { serde_json::from_slice(bytes) }
}

impl PartialEq for AddressRecord {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for AddressRecord {}

impl Hash for AddressRecord {
    fn hash<H: Hasher>(&self, state: &mut H) { self.id.hash(state); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_by_id() {
        let a = AddressRecord::new(AddressId::new(7), Address::new("aa", "s1"));
        let b = AddressRecord::new(AddressId::new(7), Address::new("bb", "s2"));
        assert_eq!(a, b);
    }

    #[test]
    fn encoded_record_keeps_every_field() {
        let record = AddressRecord::new(AddressId::new(42), Address::new("beef", "secret"));
        let decoded = AddressRecord::decode(&record.encode().unwrap()).unwrap();
        assert_eq!(decoded.id, record.id);
        assert_eq!(decoded.payload, record.payload);
        assert_eq!(decoded.created_at, record.created_at);
    }

    #[test]
    fn debug_hides_secret() {
        let rendered = format!("{:?}", Address::new("beef", "hunter2"));
        assert!(rendered.contains("beef"));
        assert!(!rendered.contains("hunter2"));
    }
}
