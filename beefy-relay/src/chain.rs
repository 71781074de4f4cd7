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

//! Chain access used by the relay.
//!
//! Both sides are abstract so the relay can run against RPC clients as well as in-memory
//! test chains.

use async_trait::async_trait;

use beefy_mmr::MmrProof;
use beefy_primitives::{
	mmr::{BeefyAuthoritySet, MmrLeaf},
	BlockNumber, Commitment, Justifications, ValidatorSet, H160, H256, U256,
};
use light_client::{Bitfield, ValidatorProof};

use crate::Error;

/// Read access to the chain running BEEFY.
#[async_trait]
pub trait SourceClient: Clone + Send + Sync + 'static {
	/// Number of the best finalized block.
	async fn finalized_head(&self) -> Result<BlockNumber, Error>;

	/// Hash of the finalized block `number`.
	async fn block_hash(&self, number: BlockNumber) -> Result<H256, Error>;

	/// Justifications attached to block `number`, if any.
	async fn justifications(&self, number: BlockNumber) -> Result<Option<Justifications>, Error>;

	/// BEEFY authorities active at block `number`.
	async fn authorities(&self, number: BlockNumber) -> Result<ValidatorSet<H160>, Error>;

	/// MMR root stored in the state of block `at`.
	async fn mmr_root(&self, at: BlockNumber) -> Result<H256, Error>;

	/// Leaf `leaf_index` and its proof against the MMR as of block `at`.
	async fn generate_mmr_proof(&self, leaf_index: u64, at: BlockNumber) -> Result<(MmrLeaf, MmrProof), Error>;
}

/// Outcome of an included destination transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
	/// Destination block the transaction was included in.
	pub block_number: u64,
	/// `false` if the light client rejected the call.
	pub success: bool,
}

/// Access to the light client deployed on the destination chain.
///
/// Submitting methods return the hash of the sent transaction, inclusion is tracked
/// through [`DestinationClient::transaction_receipt`].
#[async_trait]
pub trait DestinationClient: Clone + Send + Sync + 'static {
	/// Number of the best destination block.
	async fn block_number(&self) -> Result<u64, Error>;

	/// Last source block verified by the light client.
	async fn latest_beefy_block(&self) -> Result<BlockNumber, Error>;

	/// Validator set the light client currently trusts.
	async fn current_validator_set(&self) -> Result<BeefyAuthoritySet, Error>;

	/// Validator set the light client expects to follow the current one.
	async fn next_validator_set(&self) -> Result<BeefyAuthoritySet, Error>;

	/// Destination blocks to wait between the initial submission and the randomness commit.
	async fn randao_commit_delay(&self) -> Result<u64, Error>;

	/// Destination blocks after the delay within which the randomness commit must land.
	async fn randao_commit_expiration(&self) -> Result<u64, Error>;

	/// Validators our ticket of `commitment_hash` has to prove.
	async fn create_final_bitfield(&self, commitment_hash: H256, bitfield: Bitfield) -> Result<Bitfield, Error>;

	/// Send `submitInitial`.
	async fn submit_initial(
		&self,
		commitment: Commitment,
		bitfield: Bitfield,
		proof: ValidatorProof,
	) -> Result<H256, Error>;

	/// Send `commitPrevRandao`.
	async fn commit_prev_randao(&self, commitment_hash: H256) -> Result<H256, Error>;

	/// Send `submitFinal`.
	#[allow(clippy::too_many_arguments)]
	async fn submit_final(
		&self,
		commitment: Commitment,
		bitfield: Bitfield,
		proofs: Vec<ValidatorProof>,
		leaf: MmrLeaf,
		leaf_proof: Vec<H256>,
		leaf_proof_order: U256,
	) -> Result<H256, Error>;

	/// Receipt of transaction `hash`, `None` while it is pending.
	async fn transaction_receipt(&self, hash: H256) -> Result<Option<Receipt>, Error>;
}
