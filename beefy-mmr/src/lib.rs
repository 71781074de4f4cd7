// Copyright (C) 2021 Parity Technologies (UK) Ltd.
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

//! BEEFY + MMR utilities.
//!
//! The source chain appends an [`MmrLeaf`] for every block. This crate keeps such an MMR in
//! memory, generates inclusion proofs and converts them into the compact
//! [`SimplifiedMmrProof`] form a foreign light client verifies.

use beefy_merkle_root::Keccak256;
use beefy_primitives::{
	keccak_256,
	mmr::{BeefyNextAuthoritySet, MmrLeaf, MmrLeafVersion},
	AuthorityAddress, BlockNumber, ValidatorSetId, H256,
};
use codec::Encode;

pub mod helper;
mod mmr;
mod simplified;

pub use crate::mmr::{MergeKeccak, Mmr, MmrProof};
pub use simplified::{calculate_root, convert_to_simplified_mmr_proof, verify_leaf_proof, SimplifiedMmrProof};

/// Upper bound of the simplified proof length, the order mask is a single `U256`.
pub const MAX_PROOF_ITEMS: usize = 256;

/// MMR errors.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// The leaf is not part of the MMR.
	#[error("Leaf index {index} is out of bounds for an MMR of {leaf_count} leaves")]
	LeafIndexOutOfBounds {
		/// Requested leaf index.
		index: u64,
		/// Number of leaves in the MMR.
		leaf_count: u64,
	},
	/// Proof has more items than the order mask can describe.
	#[error("MMR proof has {0} items, at most 256 are allowed")]
	ProofSizeExceeded(usize),
	/// Proof items do not match the MMR shape.
	#[error("Corrupted MMR proof: {0}")]
	CorruptedProof(&'static str),
	/// Proof does not reproduce the expected root.
	#[error("MMR proof does not match the root")]
	RootMismatch,
	/// The MMR has no leaves.
	#[error("MMR is empty")]
	EmptyMmr,
	/// The node store failed.
	#[error("MMR store error: {0}")]
	Store(String),
}

/// Merge two MMR nodes.
pub fn merge(left: &H256, right: &H256) -> H256 {
	let mut combined = [0u8; 64];
	combined[..32].copy_from_slice(left.as_bytes());
	combined[32..].copy_from_slice(right.as_bytes());
	H256::from(keccak_256(&combined))
}

/// Describe an authority set: its id, size and the merkle root of the addresses.
pub fn authority_set(id: ValidatorSetId, authorities: &[AuthorityAddress]) -> BeefyNextAuthoritySet {
	let root = beefy_merkle_root::merkle_root::<Keccak256, _, _>(authorities.iter().map(|a| a.as_bytes()));
	BeefyNextAuthoritySet {
		id,
		len: authorities.len() as u32,
		root: H256::from(root),
	}
}

type ParaId = u32;
type ParaHead = Vec<u8>;

/// Returns the root hash of a merkle tree constructed from the given parachain heads.
///
/// Heads are sorted by para id and SCALE-encoded as `(ParaId, ParaHead)` pairs.
pub fn parachain_heads_merkle_root(mut para_heads: Vec<(ParaId, ParaHead)>) -> H256 {
	para_heads.sort();
	let para_heads = para_heads.into_iter().map(|pair| pair.encode()).collect::<Vec<_>>();
	H256::from(beefy_merkle_root::merkle_root::<Keccak256, _, _>(para_heads))
}

/// Builds MMR leaves for consecutive blocks.
///
/// Keeps the next authority set details cached, the merkle tree is only computed when
/// the set id changes.
#[derive(Debug, Clone)]
pub struct LeafBuilder {
	version: MmrLeafVersion,
	next_authorities: Option<BeefyNextAuthoritySet>,
}

impl LeafBuilder {
	/// Create a builder producing leaves of the given version.
	pub fn new(version: MmrLeafVersion) -> Self {
		LeafBuilder { version, next_authorities: None }
	}

	/// Leaf for the block following `parent_number`.
	///
	/// `current_set_id` is the id of the active BEEFY set, `next_authorities` are the
	/// addresses of the set that follows it.
	pub fn leaf(
		&mut self,
		parent_number: BlockNumber,
		parent_hash: H256,
		current_set_id: ValidatorSetId,
		next_authorities: &[AuthorityAddress],
		leaf_extra: H256,
	) -> MmrLeaf {
		MmrLeaf {
			version: self.version,
			parent_number_and_hash: (parent_number, parent_hash),
			beefy_next_authority_set: self.update_beefy_next_authority_set(current_set_id, next_authorities),
			leaf_extra,
		}
	}

	fn update_beefy_next_authority_set(
		&mut self,
		current_set_id: ValidatorSetId,
		next_authorities: &[AuthorityAddress],
	) -> BeefyNextAuthoritySet {
		let id = current_set_id + 1;
		// avoid computing the merkle tree if validator set id didn't change.
		if let Some(current_next) = self.next_authorities.as_ref().filter(|next| next.id == id) {
			return current_next.clone();
		}

		let next_set = authority_set(id, next_authorities);
		log::debug!(
			target: "beefy",
			"🥩 New next authority set #{}: {} authorities, root {:?}",
			next_set.id,
			next_set.len,
			next_set.root,
		);
		self.next_authorities = Some(next_set.clone());
		next_set
	}
}
