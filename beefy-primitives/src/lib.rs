// Copyright (C) 2020 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later WITH Classpath-exception-2.0

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

#![warn(missing_docs)]

//! Primitives for BEEFY protocol and its bridge to a foreign chain.
//!
//! The crate contains the data types shared between the relayer and the light client
//! living on the destination chain: commitments and their signatures, MMR leaves,
//! authority set descriptors and the claimed-signer [`bitfield::Bitfield`].

pub mod bitfield;
pub mod commitment;
pub mod crypto;
pub mod keyring;
pub mod mmr;

pub use commitment::{Commitment, Justifications, Payload, SignedCommitment, VersionedFinalityProof};
pub use primitive_types::{H160, H256, U256};

/// Consensus engine identifier used to tag justifications and digests.
pub type ConsensusEngineId = [u8; 4];

/// The `ConsensusEngineId` of BEEFY.
pub const BEEFY_ENGINE_ID: ConsensusEngineId = *b"BEEF";

/// Identifier of an item in the commitment [`Payload`].
pub type BeefyPayloadId = [u8; 2];

/// Payload id of the MMR root hash.
pub const MMR_ROOT_ID: BeefyPayloadId = *b"mh";

/// Authority set id starts with zero at genesis
pub const GENESIS_AUTHORITY_SET_ID: u64 = 0;

/// A typedef for validator set id.
pub type ValidatorSetId = u64;

/// Source chain block number.
pub type BlockNumber = u32;

/// The MMR root hash committed to by BEEFY validators.
pub type MmrRootHash = H256;

/// Ethereum-style authority identity, derived from the secp256k1 public key.
pub type AuthorityAddress = H160;

/// Compute Keccak-256 of `data`.
pub fn keccak_256(data: &[u8]) -> [u8; 32] {
	use tiny_keccak::{Hasher as _, Keccak};

	let mut keccak = Keccak::v256();
	keccak.update(data);
	let mut output = [0_u8; 32];
	keccak.finalize(&mut output);
	output
}

/// A set of BEEFY authorities, a.k.a. validators.
#[derive(Debug, Clone, PartialEq, Eq, codec::Encode, codec::Decode)]
pub struct ValidatorSet<AuthorityId> {
	/// Public keys (or addresses) of the validator set elements
	pub validators: Vec<AuthorityId>,
	/// Identifier of the validator set
	pub id: ValidatorSetId,
}

impl<AuthorityId> ValidatorSet<AuthorityId> {
	/// Return a validator set with the given id.
	pub fn new(validators: Vec<AuthorityId>, id: ValidatorSetId) -> Self {
		ValidatorSet { validators, id }
	}

	/// Return an empty validator set with id of 0.
	pub fn empty() -> Self {
		ValidatorSet {
			validators: Default::default(),
			id: GENESIS_AUTHORITY_SET_ID,
		}
	}

	/// Number of validators in the set.
	pub fn len(&self) -> usize {
		self.validators.len()
	}

	/// Return `true` if the set has no validators.
	pub fn is_empty(&self) -> bool {
		self.validators.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keccak_of_empty_input() {
		assert_eq!(
			keccak_256(&[]),
			hex_literal::hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
		);
	}

	#[test]
	fn empty_validator_set() {
		let set = ValidatorSet::<AuthorityAddress>::empty();

		assert!(set.is_empty());
		assert_eq!(set.id, GENESIS_AUTHORITY_SET_ID);
	}
}
