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

//! Walks finalized source blocks and extracts relayable commitments.

use codec::Decode;
use log::{debug, warn};

use beefy_mmr::{convert_to_simplified_mmr_proof, SimplifiedMmrProof};
use beefy_primitives::{
	BlockNumber, SignedCommitment, ValidatorSet, VersionedFinalityProof, BEEFY_ENGINE_ID, H160,
};

use crate::{Config, Error, SourceClient};

/// A signed commitment found on the source chain, checked against the source MMR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedCommitment {
	/// The commitment and its signatures.
	pub signed_commitment: SignedCommitment,
	/// Proof of the leaf of the commitment block against the committed MMR root.
	pub proof: SimplifiedMmrProof,
	/// Authorities that signed the commitment.
	pub validators: ValidatorSet<H160>,
	/// Distance of the commitment block from the finalized head.
	pub depth: u32,
}

/// Extracts commitments from source chain justifications.
pub struct Scanner<S> {
	source: S,
	config: Config,
}

impl<S: SourceClient> Scanner<S> {
	/// Return a new [`Scanner`] reading from `source`.
	pub fn new(source: S, config: Config) -> Self {
		Scanner { source, config }
	}

	/// Scan the finalized blocks from `cursor` up to the finalized head.
	///
	/// Returns the found commitments in block order and the cursor to continue from.
	pub async fn scan(&self, cursor: BlockNumber) -> Result<(Vec<ScannedCommitment>, BlockNumber), Error> {
		let head = self.source.finalized_head().await?;
		let mut found = Vec::new();

		for number in cursor..=head {
			if let Some(commitment) = self.scan_block(number, head).await? {
				found.push(commitment);
			}
		}

		Ok((found, cursor.max(head.saturating_add(1))))
	}

	async fn scan_block(&self, number: BlockNumber, head: BlockNumber) -> Result<Option<ScannedCommitment>, Error> {
		let justifications = match self.source.justifications(number).await? {
			Some(justifications) => justifications,
			None => return Ok(None),
		};
		let encoded = match justifications.get(BEEFY_ENGINE_ID) {
			Some(encoded) => encoded,
			None => return Ok(None),
		};

		let signed_commitment = match VersionedFinalityProof::decode(&mut &encoded[..]) {
			Ok(proof) => proof.into_signed_commitment(),
			Err(err) => {
				warn!(target: "beefy", "🥩 Malformed BEEFY justification at block #{}: {:?}", number, err);
				return Ok(None)
			}
		};

		let commitment = &signed_commitment.commitment;
		debug!(
			target: "beefy",
			"🥩 Found commitment {:?} for block #{}, set #{}",
			commitment.hash(),
			commitment.block_number,
			commitment.validator_set_id,
		);

		if commitment.block_number != number {
			warn!(
				target: "beefy",
				"🥩 Justification of block #{} commits to block #{}, skipping",
				number,
				commitment.block_number,
			);
			return Ok(None)
		}

		let leaf_index = match self.config.leaf_index(number) {
			Some(leaf_index) => leaf_index,
			None => {
				warn!(target: "beefy", "🥩 Commitment for block #{} predates the MMR, skipping", number);
				return Ok(None)
			}
		};

		let validators = self.source.authorities(number).await?;
		if validators.id != commitment.validator_set_id || validators.len() != signed_commitment.signatures.len() {
			warn!(
				target: "beefy",
				"🥩 Commitment for block #{} claims set #{} with {} signatures, authorities are set #{} of {}",
				number,
				commitment.validator_set_id,
				signed_commitment.signatures.len(),
				validators.id,
				validators.len(),
			);
			return Ok(None)
		}

		let (leaf, raw) = self.source.generate_mmr_proof(leaf_index, number).await?;
		let block_hash = self.source.block_hash(number).await?;

		let proof = match convert_to_simplified_mmr_proof(block_hash, leaf_index, leaf, raw.leaf_count, &raw.items) {
			Ok(proof) => proof,
			Err(err) => {
				warn!(target: "beefy", "🥩 Invalid MMR proof for block #{}: {}", number, err);
				return Ok(None)
			}
		};

		let root = match proof.root() {
			Ok(root) => root,
			Err(err) => {
				warn!(target: "beefy", "🥩 Invalid MMR proof for block #{}: {}", number, err);
				return Ok(None)
			}
		};
		let stored = self.source.mmr_root(number).await?;

		if root != stored || commitment.payload.mmr_root() != Some(root) {
			warn!(
				target: "beefy",
				"🥩 MMR proof for block #{} gives root {:?}, chain stores {:?}, commitment {:?}",
				number,
				root,
				stored,
				commitment.hash(),
			);
			return Ok(None)
		}

		Ok(Some(ScannedCommitment {
			signed_commitment,
			proof,
			validators,
			depth: head - number,
		}))
	}
}
