// Copyright (C) 2020-2021 Parity Technologies (UK) Ltd.
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

//! BEEFY + MMR utilities.
//!
//! While BEEFY can be used completely independently as an additional consensus gadget,
//! it is designed around a main use case of bridging the source chain to other chains.
//! The MMR leaf describes the block it was created for together with the next BEEFY
//! authority set, so a light client can follow authority set changes.

use codec::{Decode, Encode};

use crate::{keccak_256, BlockNumber, ValidatorSetId, H256};

/// A leaf that gets added every block to the MMR constructed by the source chain.
#[derive(Debug, Default, PartialEq, Eq, Clone, Encode, Decode)]
pub struct MmrLeaf {
	/// Version of the leaf format.
	///
	/// Can be used to enable future format migrations and compatibility.
	pub version: MmrLeafVersion,
	/// Current block parent number and hash.
	pub parent_number_and_hash: (BlockNumber, H256),
	/// A merkle root of the next BEEFY authority set.
	pub beefy_next_authority_set: BeefyNextAuthoritySet,
	/// Arbitrary extra leaf data, the parachain heads root on the source chain.
	pub leaf_extra: H256,
}

impl MmrLeaf {
	/// Keccak-256 of the SCALE-encoded leaf, which is what goes into the MMR.
	pub fn hash(&self) -> H256 {
		H256::from(keccak_256(&self.encode()))
	}
}

/// A MMR leaf versioning scheme.
///
/// Version is a single byte that constist of two components:
/// - `major` - 3 bits
/// - `minor` - 5 bits
///
/// Any change in encoding that adds new items to the structure is considered non-breaking,
/// hence only `minor` version change should be performed.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Encode, Decode)]
pub struct MmrLeafVersion(u8);

impl MmrLeafVersion {
	/// Create new version object from `major` and `minor` components.
	///
	/// Components exceeding their bit width are truncated.
	pub const fn new(major: u8, minor: u8) -> Self {
		Self(((major & 0b111) << 5) | (minor & 0b11111))
	}

	/// Split the version into `major` and `minor` sub-components.
	pub const fn split(&self) -> (u8, u8) {
		let major = self.0 >> 5;
		let minor = self.0 & 0b11111;
		(major, minor)
	}

	/// The raw version byte.
	pub const fn raw(&self) -> u8 {
		self.0
	}
}

/// Details of a BEEFY authority set.
#[derive(Debug, Default, PartialEq, Eq, Clone, Encode, Decode)]
pub struct BeefyAuthoritySet {
	/// Id of the set.
	///
	/// Id is required to correlate BEEFY signed commitments with the validator set.
	/// Light Client can easily verify that the commitment witness it is getting is
	/// produced by the latest validator set.
	pub id: ValidatorSetId,
	/// Number of validators in the set.
	///
	/// Some BEEFY Light Clients may use an interactive protocol to verify only subset
	/// of signatures. We put set length here, so that these clients can verify the minimal
	/// number of required signatures.
	pub len: u32,
	/// Merkle Root Hash build from BEEFY AuthorityIds.
	///
	/// This is used by Light Clients to confirm that the commitments are signed by the correct
	/// validator set. Light Clients using interactive protocol, might verify only subset of
	/// signatures, hence don't require the full list here (will receive inclusion proofs).
	pub root: H256,
}

/// Details of the next BEEFY authority set.
pub type BeefyNextAuthoritySet = BeefyAuthoritySet;
