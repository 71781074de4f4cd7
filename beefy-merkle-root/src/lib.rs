// Copyright (C) 2020-2021 Parity Technologies (UK) Ltd.
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

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! Binary merkle tree used to commit to BEEFY authority sets.
//!
//! Leaves are hashed before they are put into the tree. Inner nodes are `hash(left ++ right)`
//! and an odd node at the end of a layer is promoted to the next layer unchanged, so proofs
//! for such nodes are shorter than the tree height.

extern crate alloc;

use alloc::{vec, vec::Vec};

/// A 32-byte hash of a leaf or an inner node.
pub type Hash = [u8; 32];

/// Hash function used to construct the tree.
pub trait Hasher {
	/// Hash given arbitrary-length piece of data.
	fn hash(data: &[u8]) -> Hash;
}

/// Keccak-256 hasher, the one the destination chain uses.
#[cfg(feature = "keccak")]
pub struct Keccak256;

#[cfg(feature = "keccak")]
impl Hasher for Keccak256 {
	fn hash(data: &[u8]) -> Hash {
		use tiny_keccak::{Hasher as _, Keccak};

		let mut keccak = Keccak::v256();
		keccak.update(data);
		let mut output = [0_u8; 32];
		keccak.finalize(&mut output);
		output
	}
}

/// A merkle proof for a single leaf.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MerkleProof<T> {
	/// Root hash of the tree the proof was generated from.
	pub root: Hash,
	/// Sibling hashes, from the leaf layer upwards.
	///
	/// Layers where the proven node is promoted contribute no item.
	pub proof: Vec<Hash>,
	/// Number of leaves in the tree.
	pub number_of_leaves: usize,
	/// Index of the proven leaf.
	pub leaf_index: usize,
	/// The proven leaf content (not hashed).
	pub leaf: T,
}

/// Construct a root hash of a binary merkle tree created from given leaves.
///
/// An empty set of leaves yields an all-zero root.
pub fn merkle_root<H, I, T>(leaves: I) -> Hash
where
	H: Hasher,
	I: IntoIterator<Item = T>,
	T: AsRef<[u8]>,
{
	let iter = leaves.into_iter().map(|l| H::hash(l.as_ref()));
	let mut next = match merkelize_row::<H, _>(iter) {
		Ok(root) => return root,
		Err(next) if next.is_empty() => return Hash::default(),
		Err(next) => next,
	};

	loop {
		#[cfg(feature = "debug")]
		log::debug!(
			target: "beefy-merkle-root",
			"Layer: {:?}",
			next.iter().map(hex::encode).collect::<Vec<_>>()
		);
		next = match merkelize_row::<H, _>(next.into_iter()) {
			Ok(root) => return root,
			Err(next) => next,
		};
	}
}

/// Construct a merkle proof for the leaf at `leaf_index`.
///
/// Returns `None` if `leaf_index` is out of bounds.
pub fn merkle_proof<H, I, T>(leaves: I, leaf_index: usize) -> Option<MerkleProof<T>>
where
	H: Hasher,
	I: IntoIterator<Item = T>,
	T: AsRef<[u8]>,
{
	let mut leaf = None;
	let mut layer = leaves
		.into_iter()
		.enumerate()
		.map(|(idx, l)| {
			let hash = H::hash(l.as_ref());
			if idx == leaf_index {
				leaf = Some(l);
			}
			hash
		})
		.collect::<Vec<_>>();

	let number_of_leaves = layer.len();
	let leaf = leaf?;

	let mut proof = Vec::new();
	let mut position = leaf_index;

	while layer.len() > 1 {
		let sibling = if position % 2 == 1 {
			Some(position - 1)
		} else if position + 1 < layer.len() {
			Some(position + 1)
		} else {
			None
		};

		if let Some(sibling) = sibling {
			proof.push(layer[sibling]);
		}

		layer = match merkelize_row::<H, _>(layer.into_iter()) {
			Ok(root) => vec![root],
			Err(next) => next,
		};
		position /= 2;
	}

	Some(MerkleProof {
		root: layer[0],
		proof,
		number_of_leaves,
		leaf_index,
		leaf,
	})
}

/// Verify a merkle proof for `leaf` at `leaf_index` in a tree of `number_of_leaves` leaves.
///
/// The proof must be consumed exactly, extra items make it invalid.
pub fn verify_proof<H, P, L>(root: &Hash, proof: P, number_of_leaves: usize, leaf_index: usize, leaf: L) -> bool
where
	H: Hasher,
	P: IntoIterator<Item = Hash>,
	L: AsRef<[u8]>,
{
	if leaf_index >= number_of_leaves {
		return false;
	}

	let mut proof = proof.into_iter();
	let mut computed = H::hash(leaf.as_ref());
	let mut position = leaf_index;
	let mut width = number_of_leaves;
	let mut combined = [0_u8; 64];

	while width > 1 {
		// last node of an odd layer
		let promoted = position % 2 == 0 && position + 1 == width;

		if !promoted {
			let sibling = match proof.next() {
				Some(sibling) => sibling,
				None => return false,
			};

			if position % 2 == 1 {
				combined[0..32].copy_from_slice(&sibling);
				combined[32..64].copy_from_slice(&computed);
			} else {
				combined[0..32].copy_from_slice(&computed);
				combined[32..64].copy_from_slice(&sibling);
			}
			computed = H::hash(&combined);
		}

		position /= 2;
		width = (width + 1) / 2;
	}

	proof.next().is_none() && &computed == root
}

fn merkelize_row<H, I>(mut iter: I) -> Result<Hash, Vec<Hash>>
where
	H: Hasher,
	I: Iterator<Item = Hash>,
{
	let mut next = Vec::with_capacity(iter.size_hint().0);
	let mut combined = [0_u8; 64];
	loop {
		let a = iter.next();
		let b = iter.next();

		match (a, b) {
			(Some(a), Some(b)) => {
				combined[0..32].copy_from_slice(&a);
				combined[32..64].copy_from_slice(&b);

				next.push(H::hash(&combined));
			}
			// Odd number of items. Promote the item to the upper layer.
			(Some(a), None) if !next.is_empty() => {
				next.push(a);
			}
			// Last item = root.
			(Some(a), None) => {
				return Ok(a);
			}
			// Finish up, no more items.
			_ => {
				return Err(next);
			}
		}
	}
}
