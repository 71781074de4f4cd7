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

//! Turns scanned commitments into writer tasks.

use futures::{channel::mpsc, SinkExt};
use log::{debug, info, warn};

use beefy_primitives::{BlockNumber, ValidatorSetId};

use crate::{
	scanner::{ScannedCommitment, Scanner},
	Config, Error, SourceClient, Task,
};

/// What to do with a scanned commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
	/// Relay a commitment of the current set.
	Relay,
	/// Relay a commitment moving the light client to the next set.
	Handover,
	/// Commitment of the current set, too far below the finalized head.
	Stale,
	/// Commitment of an unexpected set.
	Reject,
}

/// The validator set id the light client is expected to be at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorSetTracker {
	current: ValidatorSetId,
	fast_forward_depth: u32,
}

impl ValidatorSetTracker {
	/// Start tracking from the light client's current set.
	pub fn new(current: ValidatorSetId, fast_forward_depth: u32) -> Self {
		ValidatorSetTracker { current, fast_forward_depth }
	}

	/// Id of the tracked current set.
	pub fn current(&self) -> ValidatorSetId {
		self.current
	}

	/// Decide about `commitment` without changing the tracked set.
	pub fn classify(&self, commitment: &ScannedCommitment) -> Decision {
		let set_id = commitment.signed_commitment.commitment.validator_set_id;
		let next_set_id = commitment.proof.leaf.beefy_next_authority_set.id;

		if set_id == self.current {
			if commitment.depth <= self.fast_forward_depth {
				Decision::Relay
			} else {
				Decision::Stale
			}
		} else if Some(set_id) == self.current.checked_add(1) && Some(next_set_id) == self.current.checked_add(2) {
			Decision::Handover
		} else {
			Decision::Reject
		}
	}

	/// Decide about `commitment`, advancing to the next set on handover.
	pub fn track(&mut self, commitment: &ScannedCommitment) -> Decision {
		let decision = self.classify(commitment);
		if decision == Decision::Handover {
			self.current += 1;
		}
		decision
	}
}

/// Scans the source chain and feeds the writer.
///
/// At most one task waits for the writer. A newer commitment of the current set
/// replaces a waiting one, handovers are never dropped.
pub struct Listener<S> {
	scanner: Scanner<S>,
	config: Config,
	cursor: BlockNumber,
	tracker: ValidatorSetTracker,
	sender: mpsc::Sender<Task>,
	pending: Option<Task>,
}

impl<S: SourceClient> Listener<S> {
	/// Return a new [`Listener`] starting at block `cursor`, with the light client at set
	/// `current_set_id`.
	pub fn new(
		source: S,
		config: Config,
		cursor: BlockNumber,
		current_set_id: ValidatorSetId,
		sender: mpsc::Sender<Task>,
	) -> Self {
		let tracker = ValidatorSetTracker::new(current_set_id, config.fast_forward_depth);
		Listener {
			scanner: Scanner::new(source, config.clone()),
			config,
			cursor,
			tracker,
			sender,
			pending: None,
		}
	}

	/// Run until an error occurs.
	pub async fn run(mut self) -> Result<(), Error> {
		info!(
			target: "beefy",
			"🥩 Listener started at block #{}, validator set #{}",
			self.cursor,
			self.tracker.current(),
		);

		loop {
			let (commitments, cursor) = self.scanner.scan(self.cursor).await?;
			self.cursor = cursor;

			for commitment in commitments {
				self.process(commitment).await?;
			}
			if let Some(task) = self.pending.take() {
				self.pending = self.offer(task)?;
			}

			async_std::task::sleep(self.config.poll_interval).await;
		}
	}

	async fn process(&mut self, commitment: ScannedCommitment) -> Result<(), Error> {
		let block_number = commitment.signed_commitment.commitment.block_number;
		let set_id = commitment.signed_commitment.commitment.validator_set_id;
		let hash = commitment.signed_commitment.commitment.hash();

		match self.tracker.track(&commitment) {
			Decision::Relay => {
				if let Some(older) = self.pending.replace(into_task(commitment, false)) {
					debug!(
						target: "beefy",
						"🥩 Commitment {:?} for block #{} superseded by block #{}",
						older.commitment().hash(),
						older.block_number(),
						block_number,
					);
				}
			}
			Decision::Handover => {
				info!(
					target: "beefy",
					"🥩 Handover to validator set #{} at block #{}, commitment {:?}",
					set_id,
					block_number,
					hash,
				);
				if let Some(older) = self.pending.take() {
					if let Some(dropped) = self.offer(older)? {
						debug!(
							target: "beefy",
							"🥩 Commitment {:?} for block #{} superseded by handover",
							dropped.commitment().hash(),
							dropped.block_number(),
						);
					}
				}
				self.sender.send(into_task(commitment, true)).await.map_err(|_| Error::ChannelClosed)?;
			}
			Decision::Stale => debug!(
				target: "beefy",
				"🥩 Skipping stale commitment {:?} for block #{}, {} blocks behind",
				hash,
				block_number,
				commitment.depth,
			),
			Decision::Reject => warn!(
				target: "beefy",
				"🥩 Rejecting commitment {:?} for block #{}: set #{}, expected #{}",
				hash,
				block_number,
				set_id,
				self.tracker.current(),
			),
		}

		Ok(())
	}

	// Hand `task` to the writer if it is idle, give it back otherwise.
	fn offer(&mut self, task: Task) -> Result<Option<Task>, Error> {
		let (hash, block_number) = (task.commitment().hash(), task.block_number());
		match self.sender.try_send(task) {
			Ok(()) => {
				debug!(target: "beefy", "🥩 Queued commitment {:?} for block #{}", hash, block_number);
				Ok(None)
			}
			Err(err) if err.is_full() => Ok(Some(err.into_inner())),
			Err(_) => Err(Error::ChannelClosed),
		}
	}
}

fn into_task(commitment: ScannedCommitment, is_handover: bool) -> Task {
	Task {
		validators: commitment.validators.validators,
		signed_commitment: commitment.signed_commitment,
		proof: commitment.proof,
		is_handover,
	}
}
