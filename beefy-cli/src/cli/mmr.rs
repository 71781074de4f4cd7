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

use crate::cli::utils::{parse_h256, parse_u256, Bytes, Hashes};
use beefy_mmr::SimplifiedMmrProof;
use beefy_primitives::{mmr::MmrLeaf, H256, U256};
use parity_scale_codec::Decode;
use structopt::StructOpt;

/// MMR related commands
#[derive(StructOpt)]
#[structopt(about = "Merkle Mountain Range related commands.")]
pub enum Mmr {
	/// Decode an MMR Leaf.
	DecodeLeaf {
		/// A double SCALE-encoded MMR Leaf.
		///
		/// Leaf can be obtained via `mmr_generateProof` custom RPC method.
		/// Since the RPC returns a SCALE-encoding of `Vec<u8>`, this method expects the same.
		leaf: Bytes,
	},
	/// Convert an MMR proof into the compact form the light client verifies.
	ConvertProof {
		/// Index of the proven leaf.
		leaf_index: u64,
		/// Number of leaves in the MMR the proof was generated from.
		leaf_count: u64,
		/// A double SCALE-encoded MMR Leaf.
		leaf: Bytes,
		/// SCALE-encoded vector of proof items.
		items: Hashes,
		/// Hash of the block the leaf belongs to.
		#[structopt(long, parse(try_from_str = parse_h256))]
		block_hash: Option<H256>,
	},
	/// Verify a compact MMR proof against a root.
	Verify {
		/// Expected MMR root.
		#[structopt(parse(try_from_str = parse_h256))]
		root: H256,
		/// A double SCALE-encoded MMR Leaf.
		leaf: Bytes,
		/// SCALE-encoded vector of compact proof items.
		items: Hashes,
		/// Order bitmask of the items.
		#[structopt(parse(try_from_str = parse_u256))]
		order: U256,
	},
}

impl Mmr {
	pub fn run(self) -> anyhow::Result<()> {
		match self {
			Self::DecodeLeaf { leaf } => {
				let leaf = decode_leaf(&leaf.0)?;
				println!("{:?}", leaf);
				println!("Leaf hash: {:?}", leaf.hash());
			}
			Self::ConvertProof {
				leaf_index,
				leaf_count,
				leaf,
				items,
				block_hash,
			} => {
				let leaf = decode_leaf(&leaf.0)?;
				log::debug!(
					target: "beefy",
					"🥩 Converting proof of leaf {} of {}: {} items",
					leaf_index,
					leaf_count,
					items.0.len(),
				);
				let proof = beefy_mmr::convert_to_simplified_mmr_proof(
					block_hash.unwrap_or_default(),
					leaf_index,
					leaf,
					leaf_count,
					&items.0,
				)?;
				print_proof(&proof)?;
			}
			Self::Verify { root, leaf, items, order } => {
				let leaf = decode_leaf(&leaf.0)?;
				beefy_mmr::verify_leaf_proof(&root, leaf.hash(), &items.0, order)?;
				println!("\nProof is correct.\n");
			}
		}
		Ok(())
	}
}

fn decode_leaf(encoded: &[u8]) -> anyhow::Result<MmrLeaf> {
	let leaf: Vec<u8> = Decode::decode(&mut &*encoded)?;
	Ok(MmrLeaf::decode(&mut &*leaf)?)
}

fn print_proof(proof: &SimplifiedMmrProof) -> anyhow::Result<()> {
	println!();
	println!("Items:");
	for item in &proof.merkle_proof_items {
		println!("\t{:?}", item);
	}
	println!("Order: {:#x}", proof.merkle_proof_order);
	println!("Root: {:?}", proof.root()?);
	println!();
	Ok(())
}
