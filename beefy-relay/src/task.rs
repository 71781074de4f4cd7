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

use beefy_merkle_root::Keccak256;
use beefy_mmr::SimplifiedMmrProof;
use beefy_primitives::{Commitment, SignedCommitment, H160, H256};
use light_client::ValidatorProof;

/// A commitment ready to be written to the destination chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
	/// Addresses of the set that signed the commitment, in set order.
	pub validators: Vec<H160>,
	/// The commitment and its signatures.
	pub signed_commitment: SignedCommitment,
	/// MMR proof of the leaf of the commitment block.
	pub proof: SimplifiedMmrProof,
	/// The commitment moves the light client to the next validator set.
	pub is_handover: bool,
}

impl Task {
	/// The committed data.
	pub fn commitment(&self) -> &Commitment {
		&self.signed_commitment.commitment
	}

	/// Signed block number.
	pub fn block_number(&self) -> u32 {
		self.signed_commitment.commitment.block_number
	}

	/// Signature and membership proof of validator `index`.
	///
	/// `None` if the validator did not sign.
	pub fn validator_proof(&self, index: usize) -> Option<ValidatorProof> {
		let signature = *self.signed_commitment.signature(index)?;
		let proof =
			beefy_merkle_root::merkle_proof::<Keccak256, _, _>(self.validators.iter().map(|a| a.as_bytes()), index)?;

		Some(ValidatorProof {
			signature,
			index: index as u32,
			account: self.validators[index],
			proof: proof.proof.into_iter().map(H256::from).collect(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use beefy_merkle_root::verify_proof;
	use beefy_primitives::{keyring::Keyring, mmr::MmrLeaf, Payload, U256};
	use codec::Encode;

	fn task() -> Task {
		let commitment = Commitment {
			payload: Payload::from_mmr_root(H256::repeat_byte(1)),
			block_number: 5,
			validator_set_id: 0,
		};
		let keys = [Keyring::Alice, Keyring::Bob, Keyring::Charlie];

		Task {
			validators: keys.iter().map(|k| k.address()).collect(),
			signed_commitment: SignedCommitment {
				signatures: vec![Some(keys[0].sign(&commitment.encode())), None, Some(keys[2].sign(&commitment.encode()))],
				commitment,
			},
			proof: SimplifiedMmrProof {
				block_hash: H256::zero(),
				leaf: MmrLeaf::default(),
				merkle_proof_items: vec![],
				merkle_proof_order: U256::zero(),
			},
			is_handover: false,
		}
	}

	#[test]
	fn should_build_validator_proofs() {
		// given
		let task = task();
		let root = beefy_merkle_root::merkle_root::<Keccak256, _, _>(task.validators.iter().map(|a| a.as_bytes()));

		// when
		let proof = task.validator_proof(2).unwrap();

		// then
		assert_eq!(proof.index, 2);
		assert_eq!(proof.account, Keyring::Charlie.address());
		assert!(proof.signature.verify(&task.commitment().hash().0, &proof.account));
		assert!(verify_proof::<Keccak256, _, _>(
			&root,
			proof.proof.iter().map(|item| item.0),
			3,
			2,
			proof.account.as_bytes(),
		));
	}

	#[test]
	fn no_proof_without_signature() {
		let task = task();

		assert!(task.validator_proof(1).is_none());
		assert!(task.validator_proof(3).is_none());
		assert_eq!(task.block_number(), 5);
	}
}
