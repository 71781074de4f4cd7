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

use crate::cli::{
	uncompress_authorities::uncompress_beefy_ids,
	utils::{parse_address, parse_h256, Authorities, Hashes},
};
use beefy_merkle_root::{Keccak256, MerkleProof};
use beefy_primitives::{H160, H256};
use parity_scale_codec::Encode;
use structopt::StructOpt;

/// BEEFY validator merkle tree related commands.
#[derive(StructOpt)]
#[structopt(about = "Construct or verify a merkle proof of a BEEFY validator address.")]
pub enum ValidatorMerkleTree {
	/// Construct a merkle tree of validator addresses, given BEEFY authority ids (compressed
	/// keys) and generate a merkle proof.
	GenerateProof {
		/// Leaf index to generate the proof for.
		leaf_index: usize,
		/// A SCALE-encoded vector of BEEFY authority ids (compressed public key).
		authorities: Authorities,
	},
	/// Verify a merkle proof given root hash and the proof content.
	VerifyProof {
		/// Merkle root hash.
		#[structopt(parse(try_from_str = parse_h256))]
		root: H256,
		/// SCALE-encoded vector of proof hashes.
		proof: Hashes,
		/// Number of validators in the set.
		number_of_leaves: usize,
		/// Index of the leaf the proof is for.
		leaf_index: usize,
		/// Validator address.
		#[structopt(parse(try_from_str = parse_address))]
		address: H160,
	},
}

impl ValidatorMerkleTree {
	pub fn run(self) -> anyhow::Result<()> {
		match self {
			Self::GenerateProof { authorities, leaf_index } => {
				let addresses = uncompress_beefy_ids(&authorities.0)?.into_iter().map(|(_, address)| address);
				let proof = generate_merkle_proof(addresses, leaf_index)?;
				println!();
				println!("Root: 0x{}", hex::encode(proof.root));
				println!("SCALE-encoded proof: 0x{}", hex::encode(proof_hashes(&proof).encode()));
				println!("Number of leaves: {}", proof.number_of_leaves);
				println!("\nLeaf: {:?}", proof.leaf);
				println!();
				Ok(())
			}
			Self::VerifyProof {
				root,
				proof,
				number_of_leaves,
				leaf_index,
				address,
			} => {
				verify_merkle_proof(root, &proof.0, number_of_leaves, leaf_index, address)?;
				println!("\nProof is correct.\n");
				Ok(())
			}
		}
	}
}

fn generate_merkle_proof(addresses: impl Iterator<Item = H160>, leaf_index: usize) -> anyhow::Result<MerkleProof<H160>> {
	let addresses = addresses.collect::<Vec<_>>();
	let proof = beefy_merkle_root::merkle_proof::<Keccak256, _, _>(addresses.iter().map(|a| a.as_bytes()), leaf_index)
		.ok_or_else(|| anyhow::format_err!("Leaf index out of bounds: {} vs {}", leaf_index, addresses.len()))?;

	Ok(MerkleProof {
		root: proof.root,
		proof: proof.proof,
		number_of_leaves: proof.number_of_leaves,
		leaf_index: proof.leaf_index,
		leaf: addresses[leaf_index],
	})
}

fn proof_hashes(proof: &MerkleProof<H160>) -> Vec<H256> {
	proof.proof.iter().copied().map(H256::from).collect()
}

fn verify_merkle_proof(
	root: H256,
	proof: &[H256],
	number_of_leaves: usize,
	leaf_index: usize,
	address: H160,
) -> anyhow::Result<()> {
	let valid = beefy_merkle_root::verify_proof::<Keccak256, _, _>(
		&root.0,
		proof.iter().map(|item| item.0),
		number_of_leaves,
		leaf_index,
		address.as_bytes(),
	);
	anyhow::ensure!(valid, "Proof of {:?} at index {} does not match root {:?}", address, leaf_index, root);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;

	#[test]
	fn generate_proof_should_be_verified_correctly() {
		// given
		let addresses = vec![
			H160::from(hex!("E04CC55ebEE1cBCE552f250e85c57B70B2E2625b")),
			H160::from(hex!("25451A4de12dcCc2D166922fA938E900fCc4ED24")),
			H160::repeat_byte(3),
		];

		for leaf_index in 0..3 {
			// when
			let proof = generate_merkle_proof(addresses.clone().into_iter(), leaf_index).unwrap();

			// then
			let root = H256::from(proof.root);
			assert!(verify_merkle_proof(root, &proof_hashes(&proof), 3, leaf_index, addresses[leaf_index]).is_ok());
			assert!(verify_merkle_proof(root, &proof_hashes(&proof), 3, leaf_index, H160::zero()).is_err());
		}
	}

	#[test]
	fn should_reject_index_out_of_bounds() {
		assert!(generate_merkle_proof(vec![H160::zero()].into_iter(), 1).is_err());
	}
}
