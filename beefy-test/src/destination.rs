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

use std::{collections::HashMap, sync::Arc};

use codec::Encode;
use log::debug;
use parking_lot::Mutex;

use beefy_primitives::{
	keccak_256,
	mmr::{BeefyAuthoritySet, MmrLeaf},
	BlockNumber, Commitment, H160, H256, U256,
};
use beefy_relay::{DestinationClient, Error, Receipt};
use light_client::{Bitfield, CallContext, LightClient, ValidatorProof};

#[cfg(test)]
#[path = "destination_tests.rs"]
mod tests;

struct State {
	client: LightClient,
	relayer: H160,
	block_number: u64,
	nonce: u64,
	receipts: HashMap<H256, Receipt>,
	rejected: Vec<light_client::Error>,
	initial_submissions: Vec<BlockNumber>,
	failing_submissions: u32,
	offline: bool,
}

/// An in-memory destination chain hosting a [`LightClient`].
///
/// Every query of the block number mines a block. Every transaction is executed right
/// away by the relayer account in a block of its own.
#[derive(Clone)]
pub struct DestinationChain {
	inner: Arc<Mutex<State>>,
}

impl DestinationChain {
	/// Return a chain hosting `client`, transactions are sent from `relayer`.
	pub fn new(client: LightClient, relayer: H160) -> Self {
		let state = State {
			client,
			relayer,
			block_number: 0,
			nonce: 0,
			receipts: HashMap::new(),
			rejected: Vec::new(),
			initial_submissions: Vec::new(),
			failing_submissions: 0,
			offline: false,
		};

		DestinationChain { inner: Arc::new(Mutex::new(state)) }
	}

	/// Snapshot of the light client state.
	pub fn light_client(&self) -> LightClient {
		self.inner.lock().client.clone()
	}

	/// Errors of the reverted transactions, in order.
	pub fn rejected(&self) -> Vec<light_client::Error> {
		self.inner.lock().rejected.clone()
	}

	/// Commitment blocks of the successful initial submissions, in order.
	pub fn initial_submissions(&self) -> Vec<BlockNumber> {
		self.inner.lock().initial_submissions.clone()
	}

	/// Make the next `count` initial submissions fail before reaching the chain.
	pub fn fail_submissions(&self, count: u32) {
		self.inner.lock().failing_submissions = count;
	}

	/// Make queries of the chain state fail while `offline`.
	pub fn set_offline(&self, offline: bool) {
		self.inner.lock().offline = offline;
	}

	fn execute<F>(&self, call: &str, f: F) -> Result<H256, Error>
	where
		F: FnOnce(&mut LightClient, &CallContext) -> Result<(), light_client::Error>,
	{
		let mut state = self.inner.lock();

		state.block_number += 1;
		state.nonce += 1;

		let ctx = CallContext {
			sender: state.relayer,
			block_number: state.block_number,
			prev_randao: U256::from_big_endian(&keccak_256(&state.block_number.encode())),
		};
		let hash = H256::from(keccak_256(&(state.relayer, state.nonce).encode()));

		let result = f(&mut state.client, &ctx);
		debug!(target: "beefy", "🥩 {} in block #{}: {:?}", call, ctx.block_number, result);

		let success = result.is_ok();
		if let Err(err) = result {
			state.rejected.push(err);
		}
		state.receipts.insert(hash, Receipt { block_number: ctx.block_number, success });

		Ok(hash)
	}
}

fn light_client_error(err: light_client::Error) -> Error {
	Error::Destination(err.to_string())
}

fn online(state: &State) -> Result<&State, Error> {
	if state.offline {
		Err(Error::Destination("connection refused".into()))
	} else {
		Ok(state)
	}
}

#[async_trait::async_trait]
impl DestinationClient for DestinationChain {
	async fn block_number(&self) -> Result<u64, Error> {
		let mut state = self.inner.lock();
		state.block_number += 1;
		Ok(state.block_number)
	}

	async fn latest_beefy_block(&self) -> Result<BlockNumber, Error> {
		Ok(online(&self.inner.lock())?.client.latest_beefy_block())
	}

	async fn current_validator_set(&self) -> Result<BeefyAuthoritySet, Error> {
		Ok(online(&self.inner.lock())?.client.current_validator_set().descriptor())
	}

	async fn next_validator_set(&self) -> Result<BeefyAuthoritySet, Error> {
		Ok(online(&self.inner.lock())?.client.next_validator_set().descriptor())
	}

	async fn randao_commit_delay(&self) -> Result<u64, Error> {
		Ok(self.inner.lock().client.randao_commit_delay())
	}

	async fn randao_commit_expiration(&self) -> Result<u64, Error> {
		Ok(self.inner.lock().client.randao_commit_expiration())
	}

	async fn create_final_bitfield(&self, commitment_hash: H256, bitfield: Bitfield) -> Result<Bitfield, Error> {
		let state = self.inner.lock();
		state.client.create_final_bitfield(&state.relayer, &commitment_hash, &bitfield).map_err(light_client_error)
	}

	async fn submit_initial(
		&self,
		commitment: Commitment,
		bitfield: Bitfield,
		proof: ValidatorProof,
	) -> Result<H256, Error> {
		{
			let mut state = self.inner.lock();
			if state.failing_submissions > 0 {
				state.failing_submissions -= 1;
				return Err(Error::Destination("connection lost".into()))
			}
		}

		let block_number = commitment.block_number;
		let hash = self.execute("submitInitial", |client, ctx| {
			client.submit_initial(ctx, &commitment, &bitfield, &proof)
		})?;

		let mut state = self.inner.lock();
		if state.receipts.get(&hash).map_or(false, |r| r.success) {
			state.initial_submissions.push(block_number);
		}
		Ok(hash)
	}

	async fn commit_prev_randao(&self, commitment_hash: H256) -> Result<H256, Error> {
		self.execute("commitPrevRandao", |client, ctx| client.commit_prev_randao(ctx, &commitment_hash))
	}

	async fn submit_final(
		&self,
		commitment: Commitment,
		bitfield: Bitfield,
		proofs: Vec<ValidatorProof>,
		leaf: MmrLeaf,
		leaf_proof: Vec<H256>,
		leaf_proof_order: U256,
	) -> Result<H256, Error> {
		self.execute("submitFinal", |client, ctx| {
			client.submit_final(ctx, &commitment, &bitfield, &proofs, &leaf, &leaf_proof, leaf_proof_order)
		})
	}

	async fn transaction_receipt(&self, hash: H256) -> Result<Option<Receipt>, Error> {
		Ok(self.inner.lock().receipts.get(&hash).copied())
	}
}
