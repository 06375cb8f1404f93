//! Authority registry
//!
//! The fixed, ordered set of addresses allowed to confirm deposits and sign
//! withdrawals, together with the number of distinct authorities required to
//! finalize a transfer. The registry is immutable after construction and is
//! passed explicitly into every state-machine operation.

use alloy::primitives::Address;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct AuthorityRegistry {
    authorities: Vec<Address>,
    #[serde(skip)]
    positions: HashMap<Address, usize>,
    required_signatures: usize,
}

impl AuthorityRegistry {
    /// Build a registry. Fails unless `1 <= required_signatures <= authorities.len()`
    /// and every authority is distinct.
    pub fn new(authorities: Vec<Address>, required_signatures: usize) -> Result<Self> {
        if required_signatures == 0 || required_signatures > authorities.len() {
            return Err(BridgeError::InvalidThreshold {
                required: required_signatures,
                authorities: authorities.len(),
            });
        }

        let mut positions = HashMap::with_capacity(authorities.len());
        for (index, authority) in authorities.iter().enumerate() {
            if positions.insert(*authority, index).is_some() {
                return Err(BridgeError::DuplicateAuthority {
                    authority: *authority,
                });
            }
        }

        Ok(Self {
            authorities,
            positions,
            required_signatures,
        })
    }

    pub fn is_authority(&self, address: &Address) -> bool {
        self.positions.contains_key(address)
    }

    /// Position of `address` in the authority set, if it is an authority.
    pub fn position(&self, address: &Address) -> Option<usize> {
        self.positions.get(address).copied()
    }

    pub fn required_signatures(&self) -> usize {
        self.required_signatures
    }

    pub fn num_authorities(&self) -> usize {
        self.authorities.len()
    }

    pub fn authorities(&self) -> &[Address] {
        &self.authorities
    }

    pub fn authority_at(&self, index: usize) -> Option<Address> {
        self.authorities.get(index).copied()
    }

    /// Empty signer set sized for this registry.
    pub fn signer_set(&self) -> SignerSet {
        SignerSet::with_capacity(self.authorities.len())
    }
}

/// Insertion-ordered set of authority positions backed by a fixed-capacity bitset.
///
/// Membership can never exceed the authority-set size, so a record cannot
/// grow without bound no matter how many submissions it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerSet {
    words: Vec<u64>,
    order: Vec<usize>,
    capacity: usize,
}

impl SignerSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(64)],
            order: Vec::new(),
            capacity,
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.capacity && self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// Insert a position. Returns `false` if it was already present or out of range.
    pub fn insert(&mut self, index: usize) -> bool {
        if index >= self.capacity || self.contains(index) {
            return false;
        }
        self.words[index / 64] |= 1u64 << (index % 64);
        self.order.push(index);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Positions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().copied()
    }

    /// Resolve positions to authority addresses, in insertion order.
    pub fn addresses(&self, registry: &AuthorityRegistry) -> Vec<Address> {
        self.iter()
            .filter_map(|index| registry.authority_at(index))
            .collect()
    }
}
