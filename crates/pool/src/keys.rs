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

//! Key layout of the durable store.
//!
//! Ids are zero-padded to 20 digits so lexicographic key order matches id
//! order.

use crate::record::AddressId;

pub const ADDRESS_PREFIX: &str = "address:";
pub const CONSUMED_PREFIX: &str = "consumed:";
pub const POOL_SIZE_KEY: &str = "meta:pool_size";
pub const NEXT_ID_KEY: &str = "meta:next_id";

pub fn address_key(id: AddressId) -> String { format!("{ADDRESS_PREFIX}{:020}", id.get()) }

pub fn consumed_key(id: AddressId) -> String { format!("{CONSUMED_PREFIX}{:020}", id.get()) }

/// Extract the id from a key under `prefix`.
pub fn parse_id(key: &str, prefix: &str) -> Option<AddressId> {
    let digits = key.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(AddressId::new)
}

pub const fn encode_u64(value: u64) -> [u8; 8] { value.to_be_bytes() }

pub fn decode_u64(bytes: &[u8]) -> Option<u64> {
    <[u8; 8]>::try_from(bytes).ok().map(u64::from_be_bytes)
}
