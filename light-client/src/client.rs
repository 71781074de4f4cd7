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

use std::collections::BTreeMap;

use beefy_merkle_root::Keccak256;
use beefy_primitives::{
	bitfield::{self, Bitfield},
	crypto::Signature,
	mmr::{BeefyAuthoritySet, MmrLeaf},
	BlockNumber, Commitment, ValidatorSetId, H160, H256, MMR_ROOT_ID, U256,
};
use codec::{Decode, Encode};

use crate::{
	sampling::{compute_num_required_signatures, quorum, SecurityParams},
	ticket::ticket_id,
	Error, PackedCounters, Ticket, TicketState,
};

/// Light client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	/// Number of destination blocks between `submit_initial` and `commit_prev_randao`.
	pub randao_commit_delay: u64,
	/// Number of destination blocks after the delay within which randomness must be captured.
	pub randao_commit_expiration: u64,
	/// Lower bound of the signature sample size.
	pub min_num_required_signatures: u32,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			randao_commit_delay: 3,
			randao_commit_expiration: 8,
			min_num_required_signatures: SecurityParams::default().min_num_required_signatures(),
		}
	}
}

/// Destination chain details of the call being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
	/// Caller address.
	pub sender: H160,
	/// Current destination block number.
	pub block_number: u64,
	/// Randomness of the current destination block.
	pub prev_randao: U256,
}

/// Proof that `account` is the validator at `index` and signed the commitment.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ValidatorProof {
	/// Signature of the commitment hash.
	pub signature: Signature,
	/// Position of the validator in the set.
	pub index: u32,
	/// Validator address.
	pub account: H160,
	/// Merkle proof of `account` against the validator set root.
	pub proof: Vec<H256>,
}

/// A validator set, as far as the light client knows it.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ValidatorSetState {
	/// Set id.
	pub id: ValidatorSetId,
	/// Number of validators.
	pub len: u32,
	/// Merkle root of the validator addresses.
	pub root: H256,
	/// How many times each validator's signature anchored a `submit_initial`.
	pub usage_counters: PackedCounters,
}

impl From<BeefyAuthoritySet> for ValidatorSetState {
	fn from(set: BeefyAuthoritySet) -> Self {
		ValidatorSetState {
			id: set.id,
			len: set.len,
			root: set.root,
			usage_counters: PackedCounters::new(set.len as usize),
		}
	}
}

impl ValidatorSetState {
	/// The `{id, len, root}` descriptor of the set.
	pub fn descriptor(&self) -> BeefyAuthoritySet {
		BeefyAuthoritySet {
			id: self.id,
			len: self.len,
			root: self.root,
		}
	}

	fn is_member(&self, proof: &ValidatorProof) -> bool {
		proof.index < self.len &&
			beefy_merkle_root::verify_proof::<Keccak256, _, _>(
				&self.root.0,
				proof.proof.iter().map(|item| item.0),
				self.len as usize,
				proof.index as usize,
				proof.account.as_bytes(),
			)
	}
}

/// The light client state.
#[derive(Debug, Clone)]
pub struct LightClient {
	config: Config,
	latest_mmr_root: H256,
	latest_beefy_block: BlockNumber,
	current_validator_set: ValidatorSetState,
	next_validator_set: ValidatorSetState,
	tickets: BTreeMap<H256, Ticket>,
}

impl LightClient {
	/// Return a [`LightClient`] trusting the given initial validator sets.
	pub fn new(
		config: Config,
		initial_beefy_block: BlockNumber,
		current: BeefyAuthoritySet,
		next: BeefyAuthoritySet,
	) -> LightClient {
		LightClient {
			config,
			latest_mmr_root: H256::zero(),
			latest_beefy_block: initial_beefy_block,
			current_validator_set: current.into(),
			next_validator_set: next.into(),
			tickets: BTreeMap::new(),
		}
	}

	/// Latest verified source chain block.
	pub fn latest_beefy_block(&self) -> BlockNumber {
		self.latest_beefy_block
	}

	/// MMR root of the latest verified commitment.
	pub fn latest_mmr_root(&self) -> H256 {
		self.latest_mmr_root
	}

	/// The current validator set.
	pub fn current_validator_set(&self) -> &ValidatorSetState {
		&self.current_validator_set
	}

	/// The next validator set.
	pub fn next_validator_set(&self) -> &ValidatorSetState {
		&self.next_validator_set
	}

	/// Blocks to wait between `submit_initial` and `commit_prev_randao`.
	pub fn randao_commit_delay(&self) -> u64 {
		self.config.randao_commit_delay
	}

	/// Blocks after the delay within which `commit_prev_randao` must be called.
	pub fn randao_commit_expiration(&self) -> u64 {
		self.config.randao_commit_expiration
	}

	/// The ticket of `sender` for `commitment_hash`.
	pub fn ticket(&self, sender: &H160, commitment_hash: &H256) -> Option<&Ticket> {
		self.tickets.get(&ticket_id(sender, commitment_hash))
	}

	/// Build the claimed-signers bitfield for `submit_initial`.
	pub fn create_initial_bitfield(&self, indices: &[u32], length: u32) -> Result<Bitfield, bitfield::Error> {
		Bitfield::from_indices(indices.iter().map(|i| *i as usize), length as usize)
	}

	/// Compute the sample of validators `sender` has to prove in `submit_final`.
	pub fn create_final_bitfield(
		&self,
		sender: &H160,
		commitment_hash: &H256,
		bitfield: &Bitfield,
	) -> Result<Bitfield, Error> {
		let ticket = self.ticket(sender, commitment_hash).ok_or(Error::InvalidTicket)?;
		let prev_randao = ticket.prev_randao().ok_or(Error::PrevRandaoNotCaptured)?;
		subsample(prev_randao, bitfield, ticket)
	}

	/// Check an MMR leaf against the latest verified MMR root.
	pub fn verify_mmr_leaf_proof(&self, leaf_hash: H256, proof: &[H256], proof_order: U256) -> bool {
		beefy_mmr::verify_leaf_proof(&self.latest_mmr_root, leaf_hash, proof, proof_order).is_ok()
	}

	/// Begin the submission of `commitment`.
	///
	/// `bitfield` claims which validators signed, `proof` proves one of the signatures.
	pub fn submit_initial(
		&mut self,
		ctx: &CallContext,
		commitment: &Commitment,
		bitfield: &Bitfield,
		proof: &ValidatorProof,
	) -> Result<(), Error> {
		let commitment_hash = commitment.hash();
		let vset = self.signing_validator_set(commitment)?;

		let len = vset.len as usize;
		if bitfield.words().len() != bitfield::words_for(len) {
			return Err(Error::InvalidBitfieldLength);
		}

		let claims = bitfield.count_set_bits_below(len);
		let want = quorum(vset.len) as usize;
		if claims < want {
			return Err(Error::NotEnoughClaims { got: claims, want });
		}

		if !bitfield.is_set(proof.index as usize) {
			return Err(Error::InvalidValidatorProof);
		}
		verify_validator_proof(vset, &commitment_hash, proof)?;

		let len = vset.len;
		let signing_id = vset.id;
		let vset = if signing_id == self.current_validator_set.id {
			&mut self.current_validator_set
		} else {
			&mut self.next_validator_set
		};
		let usage_count = vset.usage_counters.increment(proof.index as usize);
		let num_required_signatures =
			compute_num_required_signatures(len, usage_count, self.config.min_num_required_signatures);

		self.prune_expired_tickets(ctx.block_number);
		self.tickets.insert(
			ticket_id(&ctx.sender, &commitment_hash),
			Ticket {
				block_number: ctx.block_number,
				validator_set_len: len,
				num_required_signatures,
				bitfield_hash: H256::from(bitfield.hash()),
				state: TicketState::InitialSubmitted,
			},
		);

		log::debug!(
			target: "runtime::beefy",
			"🥩 Initial submission of commitment {:?} for block #{} (set #{}) by {:?}, {} signatures required",
			commitment_hash,
			commitment.block_number,
			commitment.validator_set_id,
			ctx.sender,
			num_required_signatures,
		);

		Ok(())
	}

	/// Capture the randomness for the sender's ticket of `commitment_hash`.
	pub fn commit_prev_randao(&mut self, ctx: &CallContext, commitment_hash: &H256) -> Result<(), Error> {
		let id = ticket_id(&ctx.sender, commitment_hash);
		let ticket = self.tickets.get_mut(&id).ok_or(Error::InvalidTicket)?;

		if ticket.prev_randao().is_some() {
			return Err(Error::PrevRandaoAlreadyCaptured);
		}

		let opens_at = ticket.block_number.saturating_add(self.config.randao_commit_delay);
		if ctx.block_number < opens_at {
			return Err(Error::WaitPeriodNotOver);
		}

		if ctx.block_number > opens_at.saturating_add(self.config.randao_commit_expiration) {
			self.tickets.remove(&id);
			log::debug!(
				target: "runtime::beefy",
				"🥩 Ticket for commitment {:?} by {:?} expired",
				commitment_hash,
				ctx.sender,
			);
			return Err(Error::TicketExpired);
		}

		ticket.state = TicketState::RandaoCommitted { prev_randao: ctx.prev_randao };

		log::debug!(
			target: "runtime::beefy",
			"🥩 Captured randomness {:#x} for commitment {:?} by {:?}",
			ctx.prev_randao,
			commitment_hash,
			ctx.sender,
		);

		Ok(())
	}

	/// Finish the submission of `commitment`.
	///
	/// `proofs` must cover exactly the validators sampled from `bitfield`, `leaf` must be
	/// the MMR leaf of the commitment block.
	#[allow(clippy::too_many_arguments)]
	pub fn submit_final(
		&mut self,
		ctx: &CallContext,
		commitment: &Commitment,
		bitfield: &Bitfield,
		proofs: &[ValidatorProof],
		leaf: &MmrLeaf,
		leaf_proof: &[H256],
		leaf_proof_order: U256,
	) -> Result<(), Error> {
		let commitment_hash = commitment.hash();
		let id = ticket_id(&ctx.sender, &commitment_hash);
		let ticket = self.tickets.get(&id).ok_or(Error::InvalidTicket)?;
		let prev_randao = ticket.prev_randao().ok_or(Error::PrevRandaoNotCaptured)?;

		let vset = self.signing_validator_set(commitment)?;
		let is_handover = commitment.validator_set_id == self.next_validator_set.id;

		if H256::from(bitfield.hash()) != ticket.bitfield_hash {
			return Err(Error::InvalidBitfield);
		}

		let mut sample = subsample(prev_randao, bitfield, ticket)?;
		let want = ticket.num_required_signatures as usize;
		if proofs.len() != want {
			return Err(Error::InvalidValidatorProofLength { got: proofs.len(), want });
		}

		for proof in proofs {
			if !sample.is_set(proof.index as usize) {
				return Err(Error::InvalidValidatorProof);
			}
			// every sampled validator is proven once
			sample.unset(proof.index as usize);
			verify_validator_proof(vset, &commitment_hash, proof)?;
		}

		let mmr_root = commitment.payload.get_raw(&MMR_ROOT_ID).ok_or(Error::CommitmentNotRelevant)?;
		if mmr_root.len() != 32 {
			return Err(Error::InvalidMmrRootLength);
		}
		let mmr_root = H256::from_slice(mmr_root);

		if is_handover && leaf.beefy_next_authority_set.id != self.next_validator_set.id + 1 {
			return Err(Error::InvalidMmrLeaf);
		}

		beefy_mmr::verify_leaf_proof(&mmr_root, leaf.hash(), leaf_proof, leaf_proof_order).map_err(|e| match e {
			beefy_mmr::Error::ProofSizeExceeded(_) => Error::ProofSizeExceeded,
			_ => Error::InvalidMmrLeafProof,
		})?;

		if is_handover {
			let next = ValidatorSetState::from(leaf.beefy_next_authority_set.clone());
			self.current_validator_set = std::mem::replace(&mut self.next_validator_set, next);
		}
		self.latest_mmr_root = mmr_root;
		self.latest_beefy_block = commitment.block_number;
		self.tickets.remove(&id);

		log::info!(
			target: "runtime::beefy",
			"🥩 Verified commitment {:?} for block #{} (set #{}), MMR root {:?}{}",
			commitment_hash,
			commitment.block_number,
			commitment.validator_set_id,
			mmr_root,
			if is_handover { ", validator set handed over" } else { "" },
		);

		Ok(())
	}

	fn signing_validator_set(&self, commitment: &Commitment) -> Result<&ValidatorSetState, Error> {
		let vset = if commitment.validator_set_id == self.current_validator_set.id {
			&self.current_validator_set
		} else if commitment.validator_set_id == self.next_validator_set.id {
			&self.next_validator_set
		} else {
			return Err(Error::InvalidCommitment);
		};

		if commitment.block_number <= self.latest_beefy_block {
			return Err(Error::AlreadyVerified);
		}

		Ok(vset)
	}

	// Tickets still waiting for randomness after their commit window closed can never
	// be finalized.
	fn prune_expired_tickets(&mut self, block_number: u64) {
		let window = self.config.randao_commit_delay.saturating_add(self.config.randao_commit_expiration);
		let before = self.tickets.len();
		self.tickets
			.retain(|_, ticket| ticket.prev_randao().is_some() || block_number <= ticket.block_number.saturating_add(window));

		if self.tickets.len() < before {
			log::debug!(
				target: "runtime::beefy",
				"🥩 Pruned {} expired tickets at block #{}",
				before - self.tickets.len(),
				block_number,
			);
		}
	}
}

fn verify_validator_proof(
	vset: &ValidatorSetState,
	commitment_hash: &H256,
	proof: &ValidatorProof,
) -> Result<(), Error> {
	if !vset.is_member(proof) {
		return Err(Error::InvalidValidatorProof);
	}
	if !proof.signature.verify(commitment_hash.as_fixed_bytes(), &proof.account) {
		return Err(Error::InvalidSignature);
	}
	Ok(())
}

fn subsample(prev_randao: U256, bitfield: &Bitfield, ticket: &Ticket) -> Result<Bitfield, Error> {
	bitfield
		.subsample(
			prev_randao,
			ticket.num_required_signatures as usize,
			ticket.validator_set_len as usize,
		)
		.map_err(|e| match e {
			bitfield::Error::NotEnoughClaims { requested, available } => {
				Error::NotEnoughClaims { got: available, want: requested }
			}
			bitfield::Error::IndexOutOfBounds { .. } => Error::InvalidBitfield,
		})
}
