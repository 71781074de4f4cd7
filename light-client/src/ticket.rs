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

use beefy_primitives::{keccak_256, H160, H256, U256};
use codec::{Decode, Encode};

/// Phase of an in-flight submission.
///
/// A ticket only exists between `submit_initial` and `submit_final`, so the two
/// in-flight phases are all there is to track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum TicketState {
	/// Waiting for the randao commit delay to pass.
	InitialSubmitted,
	/// Randomness captured, final signatures may be submitted.
	RandaoCommitted {
		/// Destination chain randomness the sample is derived from.
		prev_randao: U256,
	},
}

/// Light client state of a commitment submitted by a single relayer.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Ticket {
	/// Destination block of `submit_initial`.
	pub block_number: u64,
	/// Size of the signing validator set.
	pub validator_set_len: u32,
	/// Number of signatures to be checked in `submit_final`.
	pub num_required_signatures: u32,
	/// Hash of the claimed-signers bitfield.
	pub bitfield_hash: H256,
	/// Current phase.
	pub state: TicketState,
}

impl Ticket {
	/// Captured randomness, if any.
	pub fn prev_randao(&self) -> Option<U256> {
		match self.state {
			TicketState::InitialSubmitted => None,
			TicketState::RandaoCommitted { prev_randao } => Some(prev_randao),
		}
	}
}

/// Ticket key: `keccak256(sender || commitment_hash)`.
pub fn ticket_id(sender: &H160, commitment_hash: &H256) -> H256 {
	let mut buf = [0u8; 52];
	buf[..20].copy_from_slice(sender.as_bytes());
	buf[20..].copy_from_slice(commitment_hash.as_bytes());
	H256::from(keccak_256(&buf))
}
