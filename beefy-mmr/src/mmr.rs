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

//! In-memory Merkle Mountain Range over keccak-256 hashes.

use beefy_primitives::H256;
use mmr_lib::{util::MemStore, MMR};

use crate::{
	helper::{leaf_count_to_mmr_size, leaf_index_to_pos},
	merge, Error,
};

/// Keccak-256 node merging, `hash(left || right)`.
///
/// Peaks are bagged through the same function with the right peak first.
pub struct MergeKeccak;

impl mmr_lib::Merge for MergeKeccak {
	type Item = H256;

	fn merge(left: &H256, right: &H256) -> mmr_lib::Result<H256> {
		Ok(merge(left, right))
	}
}

/// An append-only MMR keeping every node in memory.
#[derive(Default)]
pub struct Mmr {
	store: MemStore<H256>,
	mmr_size: u64,
	leaf_count: u64,
}

/// A raw MMR inclusion proof, as the source chain produces it.
///
/// Items are `[left peaks, left to right] ++ [siblings, bottom up] ++ [right peaks bag]`,
/// the last one only if there are peaks right of the proven leaf.
#[derive(Debug, Clone, PartialEq, Eq, codec::Encode, codec::Decode)]
pub struct MmrProof {
	/// Index of the proven leaf.
	pub leaf_index: u64,
	/// Number of leaves in the MMR the proof was generated from.
	pub leaf_count: u64,
	/// Proof items.
	pub items: Vec<H256>,
}

impl Mmr {
	/// Create an empty MMR.
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a leaf hash, returning its leaf index.
	pub fn push(&mut self, leaf_hash: H256) -> Result<u64, Error> {
		let mut mmr = MMR::<H256, MergeKeccak, _>::new(self.mmr_size, &self.store);
		mmr.push(leaf_hash).map_err(store_error)?;
		self.mmr_size = mmr.mmr_size();
		mmr.commit().map_err(store_error)?;

		self.leaf_count += 1;
		Ok(self.leaf_count - 1)
	}

	/// Number of leaves.
	pub fn leaf_count(&self) -> u64 {
		self.leaf_count
	}

	/// Number of nodes.
	pub fn size(&self) -> u64 {
		self.mmr_size
	}

	/// Root hash: peaks bagged right to left.
	pub fn root(&self) -> Result<H256, Error> {
		self.root_at(self.leaf_count)
	}

	/// Root of the MMR as it was when it had `leaf_count` leaves.
	pub fn root_at(&self, leaf_count: u64) -> Result<H256, Error> {
		if leaf_count > self.leaf_count {
			return Err(Error::LeafIndexOutOfBounds { index: leaf_count - 1, leaf_count: self.leaf_count });
		}
		if leaf_count == 0 {
			return Err(Error::EmptyMmr);
		}

		MMR::<H256, MergeKeccak, _>::new(leaf_count_to_mmr_size(leaf_count), &self.store)
			.get_root()
			.map_err(store_error)
	}

	/// Generate a proof for `leaf_index` against the current MMR.
	pub fn generate_proof(&self, leaf_index: u64) -> Result<MmrProof, Error> {
		self.generate_proof_at(leaf_index, self.leaf_count)
	}

	/// Generate a proof for `leaf_index` against the MMR as it was with `leaf_count` leaves.
	pub fn generate_proof_at(&self, leaf_index: u64, leaf_count: u64) -> Result<MmrProof, Error> {
		if leaf_index >= leaf_count || leaf_count > self.leaf_count {
			return Err(Error::LeafIndexOutOfBounds { index: leaf_index, leaf_count: leaf_count.min(self.leaf_count) });
		}

		let proof = MMR::<H256, MergeKeccak, _>::new(leaf_count_to_mmr_size(leaf_count), &self.store)
			.gen_proof(vec![leaf_index_to_pos(leaf_index)])
			.map_err(store_error)?;

		Ok(MmrProof { leaf_index, leaf_count, items: proof.proof_items().to_vec() })
	}
}

fn store_error(err: mmr_lib::Error) -> Error {
	Error::Store(format!("{:?}", err))
}
