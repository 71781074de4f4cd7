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

//! Compact MMR proofs.
//!
//! A simplified proof is a flat list of hashes plus a bitmask. Bit `i` of the mask tells
//! whether item `i` is the left operand when combined with the running hash, so the
//! verifier needs no knowledge of the MMR shape.

use beefy_primitives::{mmr::MmrLeaf, H256, U256};
use codec::{Decode, Encode};

use crate::{
	helper::{get_peaks, leaf_count_to_mmr_size, leaf_index_to_pos, parent_offset, pos_height_in_tree},
	merge, Error, MAX_PROOF_ITEMS,
};

/// MMR inclusion proof of a leaf, in a form cheap to verify on the destination chain.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SimplifiedMmrProof {
	/// Hash of the block the leaf was created for.
	pub block_hash: H256,
	/// The proven leaf.
	pub leaf: MmrLeaf,
	/// Hashes to combine with the leaf hash, in order.
	pub merkle_proof_items: Vec<H256>,
	/// Bit `i` set means item `i` is the left operand.
	pub merkle_proof_order: U256,
}

impl SimplifiedMmrProof {
	/// Recompute the MMR root.
	pub fn root(&self) -> Result<H256, Error> {
		calculate_root(self.leaf.hash(), &self.merkle_proof_items, self.merkle_proof_order)
	}

	/// Check the proof against the expected MMR `root`.
	pub fn verify(&self, root: &H256) -> Result<(), Error> {
		verify_leaf_proof(root, self.leaf.hash(), &self.merkle_proof_items, self.merkle_proof_order)
	}
}

/// Convert a raw MMR proof of the leaf at `leaf_index` in an MMR of `leaf_count` leaves.
///
/// `items` are laid out the way the source chain generates them, see
/// [`crate::MmrProof`].
pub fn convert_to_simplified_mmr_proof(
	block_hash: H256,
	leaf_index: u64,
	leaf: MmrLeaf,
	leaf_count: u64,
	items: &[H256],
) -> Result<SimplifiedMmrProof, Error> {
	if leaf_index >= leaf_count {
		return Err(Error::LeafIndexOutOfBounds { index: leaf_index, leaf_count });
	}
	if items.len() > MAX_PROOF_ITEMS {
		return Err(Error::ProofSizeExceeded(items.len()));
	}

	let leaf_pos = leaf_index_to_pos(leaf_index);
	let peaks = get_peaks(leaf_count_to_mmr_size(leaf_count));

	let mut peak_index = 0;
	let mut peak_pos = 0;
	for (i, pos) in peaks.iter().enumerate() {
		if leaf_pos <= *pos {
			peak_index = i;
			peak_pos = *pos;
			break;
		}
	}
	let has_right_peaks = peak_index + 1 < peaks.len();

	if items.len() < peak_index {
		return Err(Error::CorruptedProof("missing left peaks"));
	}
	let (left_peaks, mut rest) = items.split_at(peak_index);

	let mut merkle_proof_items = Vec::with_capacity(items.len());
	let mut merkle_proof_order = U256::zero();
	let mut pos = leaf_pos;
	let mut height = 0;
	while pos < peak_pos {
		let (sibling, remaining) = rest.split_first().ok_or(Error::CorruptedProof("missing sibling"))?;
		rest = remaining;

		if pos_height_in_tree(pos + 1) > height {
			// we are the right child, sibling goes first
			mark_left(&mut merkle_proof_order, merkle_proof_items.len());
			pos += 1;
		} else {
			pos += parent_offset(height);
		}
		merkle_proof_items.push(*sibling);
		height += 1;
	}

	if has_right_peaks {
		let (bag, remaining) = rest.split_first().ok_or(Error::CorruptedProof("missing right peaks bag"))?;
		rest = remaining;
		mark_left(&mut merkle_proof_order, merkle_proof_items.len());
		merkle_proof_items.push(*bag);
	}

	if !rest.is_empty() {
		return Err(Error::CorruptedProof("unexpected trailing items"));
	}

	merkle_proof_items.extend(left_peaks.iter().rev());

	log::trace!(
		target: "beefy",
		"🥩 Converted MMR proof for leaf {} of {}: {} items, order {:#x}",
		leaf_index,
		leaf_count,
		merkle_proof_items.len(),
		merkle_proof_order,
	);

	Ok(SimplifiedMmrProof { block_hash, leaf, merkle_proof_items, merkle_proof_order })
}

fn mark_left(order: &mut U256, index: usize) {
	order.0[index / 64] |= 1u64 << (index % 64);
}

/// Fold `items` into `leaf_hash` following `order`.
pub fn calculate_root(leaf_hash: H256, items: &[H256], order: U256) -> Result<H256, Error> {
	if items.len() > MAX_PROOF_ITEMS {
		return Err(Error::ProofSizeExceeded(items.len()));
	}

	let root = items.iter().enumerate().fold(leaf_hash, |acc, (i, item)| {
		if order.bit(i) {
			merge(item, &acc)
		} else {
			merge(&acc, item)
		}
	});
	Ok(root)
}

/// Check that `items` and `order` reproduce `root` from `leaf_hash` exactly.
pub fn verify_leaf_proof(root: &H256, leaf_hash: H256, items: &[H256], order: U256) -> Result<(), Error> {
	if &calculate_root(leaf_hash, items, order)? == root {
		Ok(())
	} else {
		Err(Error::RootMismatch)
	}
}
