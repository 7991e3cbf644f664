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

use rand::Rng;
use snafu::ensure;
use tracing::{debug, warn};

use crate::{
    config::GenerationConfig,
    error::{InvalidSuffixSnafu, Result},
    record::Address,
};

const ADDRESS_BYTES: usize = 32;
const PROGRESS_EVERY: u64 = 1_000_000;

/// Source of new addresses for the generation workers.
///
/// `generate` may take a long time and is always called from the blocking
/// pool. `None` means no address could be produced this time.
pub trait AddressGenerator: Send + Sync + 'static {
    fn generate(&self) -> Option<Address>;
}

impl<F> AddressGenerator for F
where
    F: Fn() -> Option<Address> + Send + Sync + 'static,
{
    fn generate(&self) -> Option<Address> { self() }
}

/// Draws random 32-byte addresses until one ends with the vanity suffix.
#[derive(Debug, Clone)]
pub struct RandomAddressGenerator {
    suffix:       String,
    max_attempts: u64,
}

impl RandomAddressGenerator {
    pub fn new(suffix: impl Into<String>, max_attempts: u64) -> Result<Self> {
        let suffix = suffix.into();
        ensure!(
            suffix.len() <= ADDRESS_BYTES * 2,
            InvalidSuffixSnafu {
                suffix: suffix.clone(),
                reason: "longer than an address",
            }
        );
        ensure!(
            suffix.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')),
            InvalidSuffixSnafu {
                suffix: suffix.clone(),
                reason: "must be lowercase hex",
            }
        );
        Ok(RandomAddressGenerator {
            suffix,
            max_attempts: max_attempts.max(1),
        })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Self::new(config.suffix.clone(), config.max_attempts)
    }

    pub fn suffix(&self) -> &str { &self.suffix }
}

impl AddressGenerator for RandomAddressGenerator {
    fn generate(&self) -> Option<Address> {
        let mut rng = rand::rng();
        let mut candidate = [0_u8; ADDRESS_BYTES];
        for attempt in 1..=self.max_attempts {
            rng.fill(&mut candidate);
            let address = hex::encode(candidate);
            if address.ends_with(&self.suffix) {
                let mut secret = [0_u8; ADDRESS_BYTES];
                rng.fill(&mut secret);
                return Some(Address::new(address, hex::encode(secret)));
            }
            if attempt % PROGRESS_EVERY == 0 {
                debug!(attempt, suffix = %self.suffix, "Still searching for vanity address");
            }
        }
        warn!(
            attempts = self.max_attempts,
            suffix = %self.suffix,
            "Failed to generate address"
        );
        None
    }
}
