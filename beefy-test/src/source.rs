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

use std::sync::Arc;

use codec::Encode;
use parking_lot::Mutex;

use beefy_mmr::{parachain_heads_merkle_root, LeafBuilder, Mmr, MmrProof};
use beefy_primitives::{
	keccak_256,
	keyring::Keyring,
	mmr::{MmrLeaf, MmrLeafVersion},
	BlockNumber, Commitment, Justifications, Payload, SignedCommitment, ValidatorSet, ValidatorSetId,
	VersionedFinalityProof, BEEFY_ENGINE_ID, H160, H256,
};
use beefy_relay::{Error, SourceClient};

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;

struct Block {
	hash: H256,
	set_id: ValidatorSetId,
	authorities: Vec<Keyring>,
	justifications: Option<Justifications>,
}

struct State {
	blocks: Vec<Block>,
	leaves: Vec<MmrLeaf>,
	mmr: Mmr,
	leaf_builder: LeafBuilder,
	activation: BlockNumber,
	set_id: ValidatorSetId,
	authorities: Vec<Keyring>,
	next_authorities: Vec<Keyring>,
	para_heads: Vec<(u32, Vec<u8>)>,
}

/// An in-memory source chain running BEEFY.
///
/// Every produced block is final. Blocks after the activation block append one leaf to
/// the MMR.
#[derive(Clone)]
pub struct SourceChain {
	inner: Arc<Mutex<State>>,
}

impl SourceChain {
	/// Return a chain at genesis, with the MMR active from block 1.
	pub fn new(set_id: ValidatorSetId, authorities: Vec<Keyring>, next_authorities: Vec<Keyring>) -> Self {
		Self::with_activation(0, set_id, authorities, next_authorities)
	}

	/// Return a chain at genesis, with the MMR active after block `activation`.
	pub fn with_activation(
		activation: BlockNumber,
		set_id: ValidatorSetId,
		authorities: Vec<Keyring>,
		next_authorities: Vec<Keyring>,
	) -> Self {
		let genesis = Block {
			hash: H256::from(keccak_256(b"genesis")),
			set_id,
			authorities: authorities.clone(),
			justifications: None,
		};

		let state = State {
			blocks: vec![genesis],
			leaves: Vec::new(),
			mmr: Mmr::new(),
			leaf_builder: LeafBuilder::new(MmrLeafVersion::new(0, 0)),
			activation,
			set_id,
			authorities,
			next_authorities,
			para_heads: Vec::new(),
		};

		SourceChain { inner: Arc::new(Mutex::new(state)) }
	}

	/// Number of the best block.
	pub fn best_number(&self) -> BlockNumber {
		self.inner.lock().blocks.len() as BlockNumber - 1
	}

	/// Produce a block, return its number.
	pub fn produce_block(&self) -> BlockNumber {
		let mut state = self.inner.lock();

		let parent_number = state.blocks.len() as BlockNumber - 1;
		let parent_hash = state.blocks[parent_number as usize].hash;
		let number = parent_number + 1;

		if number > state.activation {
			let next = state.next_authorities.iter().map(|k| k.address()).collect::<Vec<_>>();
			let set_id = state.set_id;
			let leaf_extra = parachain_heads_merkle_root(state.para_heads.clone());
			let leaf = state.leaf_builder.leaf(parent_number, parent_hash, set_id, &next, leaf_extra);
			state.mmr.push(leaf.hash()).expect("in-memory MMR store does not fail; qed");
			state.leaves.push(leaf);
		}

		let block = Block {
			hash: H256::from(keccak_256(&(number, parent_hash).encode())),
			set_id: state.set_id,
			authorities: state.authorities.clone(),
			justifications: None,
		};
		state.blocks.push(block);

		number
	}

	/// Produce blocks until the best block is `number`.
	pub fn produce_blocks_until(&self, number: BlockNumber) {
		while self.best_number() < number {
			self.produce_block();
		}
	}

	/// Parachain heads committed to by the leaves of the following blocks.
	pub fn set_para_heads(&self, para_heads: Vec<(u32, Vec<u8>)>) {
		self.inner.lock().para_heads = para_heads;
	}

	/// Enact the next authority set from the next produced block on.
	///
	/// `next_authorities` become the set announced after that.
	pub fn rotate_authorities(&self, next_authorities: Vec<Keyring>) {
		let mut state = self.inner.lock();
		let enacted = std::mem::replace(&mut state.next_authorities, next_authorities);
		state.authorities = enacted;
		state.set_id += 1;
	}

	/// MMR root committed to at block `number`.
	pub fn mmr_root_at(&self, number: BlockNumber) -> Option<H256> {
		let state = self.inner.lock();
		let leaf_count = number.checked_sub(state.activation)?;
		state.mmr.root_at(u64::from(leaf_count)).ok()
	}

	/// Sign a commitment to the MMR root at block `number` by the authorities at
	/// `signers` positions, and attach it as the block justification.
	///
	/// Panics if the block has no MMR root.
	pub fn sign_block(&self, number: BlockNumber, signers: &[usize]) -> SignedCommitment {
		let root = self.mmr_root_at(number).expect("block has an MMR root; qed");
		self.sign_block_with_payload(number, signers, Payload::from_mmr_root(root))
	}

	/// Like [`SourceChain::sign_block`], committing to an arbitrary `payload`.
	pub fn sign_block_with_payload(&self, number: BlockNumber, signers: &[usize], payload: Payload) -> SignedCommitment {
		let mut state = self.inner.lock();
		let block = &mut state.blocks[number as usize];

		let commitment = Commitment {
			payload,
			block_number: number,
			validator_set_id: block.set_id,
		};
		let encoded = commitment.encode();
		let signatures = block
			.authorities
			.iter()
			.enumerate()
			.map(|(index, key)| signers.contains(&index).then(|| key.sign(&encoded)))
			.collect();
		let signed = SignedCommitment { commitment, signatures };

		let justification = VersionedFinalityProof::V1(signed.clone()).encode();
		block.justifications = Some(Justifications::from((BEEFY_ENGINE_ID, justification)));

		signed
	}

	/// Replace the justifications of block `number`.
	pub fn set_justifications(&self, number: BlockNumber, justifications: Justifications) {
		self.inner.lock().blocks[number as usize].justifications = Some(justifications);
	}
}

fn unknown_block(number: BlockNumber) -> Error {
	Error::Source(format!("Unknown block #{}", number))
}

#[async_trait::async_trait]
impl SourceClient for SourceChain {
	async fn finalized_head(&self) -> Result<BlockNumber, Error> {
		Ok(self.best_number())
	}

	async fn block_hash(&self, number: BlockNumber) -> Result<H256, Error> {
		let state = self.inner.lock();
		state.blocks.get(number as usize).map(|b| b.hash).ok_or_else(|| unknown_block(number))
	}

	async fn justifications(&self, number: BlockNumber) -> Result<Option<Justifications>, Error> {
		let state = self.inner.lock();
		let block = state.blocks.get(number as usize).ok_or_else(|| unknown_block(number))?;
		Ok(block.justifications.clone())
	}

	async fn authorities(&self, number: BlockNumber) -> Result<ValidatorSet<H160>, Error> {
		let state = self.inner.lock();
		let block = state.blocks.get(number as usize).ok_or_else(|| unknown_block(number))?;
		Ok(ValidatorSet::new(block.authorities.iter().map(|k| k.address()).collect(), block.set_id))
	}

	async fn mmr_root(&self, at: BlockNumber) -> Result<H256, Error> {
		self.mmr_root_at(at).ok_or_else(|| Error::Source(format!("No MMR at block #{}", at)))
	}

	async fn generate_mmr_proof(&self, leaf_index: u64, at: BlockNumber) -> Result<(MmrLeaf, MmrProof), Error> {
		let state = self.inner.lock();
		let leaf_count = at.checked_sub(state.activation).ok_or_else(|| Error::Source(format!("No MMR at block #{}", at)))?;
		let proof = state.mmr.generate_proof_at(leaf_index, u64::from(leaf_count))?;
		let leaf = state.leaves[leaf_index as usize].clone();
		Ok((leaf, proof))
	}
}
