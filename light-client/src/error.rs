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

/// Light client errors, one per reason a submission is rejected.
#[derive(Debug, displaydoc::Display, PartialEq, Eq, Clone)]
pub enum Error {
	/// commitment is not signed by the current or the next validator set
	InvalidCommitment,
	/// commitment block is not newer than the latest verified block
	AlreadyVerified,
	/// bitfield length does not match the validator set size
	InvalidBitfieldLength,
	/// not enough claimed signers: got {got}, want {want}
	NotEnoughClaims {
		/// claimed signers
		got: usize,
		/// required quorum
		want: usize,
	},
	/// validator proof does not match a claimed member of the validator set
	InvalidValidatorProof,
	/// signature does not recover to the validator
	InvalidSignature,
	/// no ticket for this commitment and sender
	InvalidTicket,
	/// randomness was already captured for this ticket
	PrevRandaoAlreadyCaptured,
	/// randao commit delay is not over yet
	WaitPeriodNotOver,
	/// ticket expired before randomness was captured
	TicketExpired,
	/// randomness was not captured for this ticket
	PrevRandaoNotCaptured,
	/// bitfield does not match the one submitted initially
	InvalidBitfield,
	/// wrong number of validator proofs: got {got}, want {want}
	InvalidValidatorProofLength {
		/// submitted proofs
		got: usize,
		/// required signatures
		want: usize,
	},
	/// commitment payload has no MMR root
	CommitmentNotRelevant,
	/// MMR root in the commitment payload is not 32 bytes long
	InvalidMmrRootLength,
	/// MMR leaf does not announce the expected next validator set
	InvalidMmrLeaf,
	/// MMR leaf proof does not match the commitment MMR root
	InvalidMmrLeafProof,
	/// MMR leaf proof is too long
	ProofSizeExceeded,
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
	use super::Error;

	#[test]
	fn should_render_doc_comment() {
		assert_eq!(
			Error::NotEnoughClaims { got: 1, want: 2 }.to_string(),
			"not enough claimed signers: got 1, want 2"
		);
		assert_eq!(Error::TicketExpired.to_string(), "ticket expired before randomness was captured");
	}
}
