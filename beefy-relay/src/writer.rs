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

use futures::{channel::mpsc, StreamExt};
use log::{debug, info, warn};
use rand::seq::IteratorRandom;

use beefy_mmr::authority_set;
use beefy_primitives::H256;
use light_client::Bitfield;

use crate::{chain::Receipt, Config, DestinationClient, Error, Task};

/// Drives tasks through the three submission phases of the light client.
pub struct Writer<D> {
	destination: D,
	config: Config,
	receiver: mpsc::Receiver<Task>,
}

impl<D: DestinationClient> Writer<D> {
	/// Return a new [`Writer`] consuming tasks from `receiver`.
	pub fn new(destination: D, config: Config, receiver: mpsc::Receiver<Task>) -> Self {
		Writer { destination, config, receiver }
	}

	/// Run until an error occurs or the listener goes away.
	pub async fn run(mut self) -> Result<(), Error> {
		let delay = self.destination.randao_commit_delay().await?;
		let expiration = self.destination.randao_commit_expiration().await?;
		self.config.confirmations = confirmations_within_window(self.config.confirmations, delay, expiration);

		info!(target: "beefy", "🥩 Writer started, waiting for {} confirmations", self.config.confirmations);

		while let Some(task) = self.receiver.next().await {
			self.write(&task).await?;
		}

		Err(Error::ChannelClosed)
	}

	/// Submit `task`: `submitInitial`, wait, `commitPrevRandao`, `submitFinal`.
	pub async fn write(&self, task: &Task) -> Result<(), Error> {
		let commitment = task.commitment();
		let hash = commitment.hash();

		let latest = self.destination.latest_beefy_block().await?;
		if task.block_number() <= latest {
			debug!(
				target: "beefy",
				"🥩 Commitment {:?} for block #{} already covered by #{}",
				hash,
				task.block_number(),
				latest,
			);
			return Ok(())
		}

		if task.is_handover {
			let next = self.destination.next_validator_set().await?;
			let signers = authority_set(commitment.validator_set_id, &task.validators);
			if signers != next {
				warn!(
					target: "beefy",
					"🥩 Handover commitment {:?} for block #{} signed by set #{} (root {:?}), light client expects set #{} (root {:?})",
					hash,
					task.block_number(),
					signers.id,
					signers.root,
					next.id,
					next.root,
				);
				return Ok(())
			}
		}

		let bitfield = Bitfield::from_indices(task.signed_commitment.signed_validators(), task.validators.len())?;
		let proof = match choose_signer(task).and_then(|index| task.validator_proof(index)) {
			Some(proof) => proof,
			None => {
				warn!(target: "beefy", "🥩 No signature to anchor commitment {:?} for block #{}", hash, task.block_number());
				return Ok(())
			}
		};

		let tx = self.destination.submit_initial(commitment.clone(), bitfield.clone(), proof).await?;
		let receipt = self.wait_for_receipt(tx).await?;
		info!(
			target: "beefy",
			"🥩 Initial submission of commitment {:?} for block #{}, set #{} included at #{}",
			hash,
			task.block_number(),
			commitment.validator_set_id,
			receipt.block_number,
		);

		let delay = self.destination.randao_commit_delay().await?;
		self.wait_for_block(receipt.block_number + delay + 1).await?;

		let tx = self.destination.commit_prev_randao(hash).await?;
		let receipt = self.wait_for_receipt(tx).await?;
		debug!(target: "beefy", "🥩 Randomness for commitment {:?} committed at #{}", hash, receipt.block_number);

		let final_bitfield = self.destination.create_final_bitfield(hash, bitfield.clone()).await?;
		let proofs = final_bitfield.iter_set().filter_map(|index| task.validator_proof(index)).collect::<Vec<_>>();

		let tx = self
			.destination
			.submit_final(
				commitment.clone(),
				bitfield,
				proofs,
				task.proof.leaf.clone(),
				task.proof.merkle_proof_items.clone(),
				task.proof.merkle_proof_order,
			)
			.await?;
		let receipt = self.wait_for_receipt(tx).await?;
		info!(
			target: "beefy",
			"🥩 Verified commitment {:?} for block #{}, set #{}{} at #{}",
			hash,
			task.block_number(),
			commitment.validator_set_id,
			if task.is_handover { " (handover)" } else { "" },
			receipt.block_number,
		);

		Ok(())
	}

	async fn wait_for_receipt(&self, tx: H256) -> Result<Receipt, Error> {
		let receipt = loop {
			if let Some(receipt) = self.destination.transaction_receipt(tx).await? {
				break receipt
			}
			async_std::task::sleep(self.config.poll_interval).await;
		};

		if !receipt.success {
			return Err(Error::Reverted(tx))
		}

		self.wait_for_block(receipt.block_number + self.config.confirmations).await?;
		Ok(receipt)
	}

	async fn wait_for_block(&self, number: u64) -> Result<(), Error> {
		while self.destination.block_number().await? < number {
			async_std::task::sleep(self.config.poll_interval).await;
		}
		Ok(())
	}
}

// Uniformly among the validators that signed.
fn choose_signer(task: &Task) -> Option<usize> {
	task.signed_commitment.signed_validators().choose(&mut rand::thread_rng())
}

// The randomness commit waits for the initial submission to be confirmed and has to be
// included before the ticket expires.
fn confirmations_within_window(confirmations: u64, delay: u64, expiration: u64) -> u64 {
	if confirmations < delay.saturating_add(expiration) {
		return confirmations
	}

	warn!(
		target: "beefy",
		"🥩 {} confirmations do not fit the randao window of {} + {} blocks, using {}",
		confirmations,
		delay,
		expiration,
		delay,
	);
	delay
}
