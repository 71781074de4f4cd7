// Copyright (C) 2020 Parity Technologies (UK) Ltd.
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

use codec::{Decode, Encode};
use core::cmp;

use crate::{
	crypto::Signature, keccak_256, BeefyPayloadId, BlockNumber, ConsensusEngineId, ValidatorSetId, H256, MMR_ROOT_ID,
};

/// A BEEFY payload: a list of `(id, SCALE-encoded data)` items, ordered by id.
///
/// Light clients pick the items they understand and ignore the rest.
#[derive(Debug, Default, PartialEq, Eq, Clone, Encode, Decode)]
pub struct Payload(Vec<(BeefyPayloadId, Vec<u8>)>);

impl Payload {
	/// Construct a payload with a single item.
	pub fn from_single_entry(id: BeefyPayloadId, value: Vec<u8>) -> Self {
		Self(vec![(id, value)])
	}

	/// Construct a payload carrying only the MMR root.
	pub fn from_mmr_root(root: H256) -> Self {
		Self::from_single_entry(MMR_ROOT_ID, root.as_bytes().to_vec())
	}

	/// Return the raw data of the first item identified by `id`.
	///
	/// Decoded payloads are not necessarily ordered, so every item is looked at.
	pub fn get_raw(&self, id: &BeefyPayloadId) -> Option<&Vec<u8>> {
		self.0.iter().find(|(item_id, _)| item_id == id).map(|(_, value)| value)
	}

	/// Add an item, keeping the payload ordered by id.
	///
	/// An existing item with the same id is replaced.
	pub fn push_raw(mut self, id: BeefyPayloadId, value: Vec<u8>) -> Self {
		match self.0.binary_search_by(|(item_id, _)| item_id.cmp(&id)) {
			Ok(index) => self.0[index].1 = value,
			Err(index) => self.0.insert(index, (id, value)),
		}
		self
	}

	/// Return the MMR root stored in the payload, if it is present and 32 bytes long.
	pub fn mmr_root(&self) -> Option<H256> {
		self.get_raw(&MMR_ROOT_ID)
			.filter(|raw| raw.len() == 32)
			.map(|raw| H256::from_slice(raw))
	}

	/// Items of the payload.
	pub fn items(&self) -> &[(BeefyPayloadId, Vec<u8>)] {
		&self.0
	}
}

/// A commitment signed by GRANDPA validators as part of BEEFY protocol.
///
/// The commitment contains a [payload](Commitment::payload) extracted from the finalized block
/// at height [block_number](Commitment::block_number).
/// GRANDPA validators collect signatures on commitments and a stream of such signed commitments
/// (see [SignedCommitment]) forms the BEEFY protocol.
#[derive(Debug, PartialEq, Eq, Clone, Encode, Decode)]
pub struct Commitment {
	/// A collection of payloads to be signed, see [`Payload`] for details.
	///
	/// One of the payloads should be some form of cumulative representation of the chain
	/// (think MMR root hash). Additionally one of the payloads should also contain some details
	/// that allow the light client to verify next validator set.
	pub payload: Payload,

	/// Finalized block number this commitment is for.
	///
	/// GRANDPA validators agree on a block they create a commitment for and start collecting
	/// signatures. This process is called a round.
	/// There might be multiple rounds in progress (depending on the block choice rule), however
	/// since the payload is supposed to be cumulative, it is not required to import all
	/// commitments.
	/// BEEFY light client is expected to import at least one commitment per epoch,
	/// but is free to import as many as it requires.
	pub block_number: BlockNumber,

	/// BEEFY validator set supposed to sign this commitment.
	///
	/// Validator set is changing once per epoch. The Light Client must be provided by details
	/// about the validator set whenever it's importing first commitment with a new
	/// `validator_set_id`. Validator set data MUST be verifiable, for instance using
	/// the next authority set committed to in the MMR leaf.
	pub validator_set_id: ValidatorSetId,
}

impl Commitment {
	/// Keccak-256 of the SCALE-encoded commitment.
	///
	/// This is the message BEEFY validators sign.
	pub fn hash(&self) -> H256 {
		H256::from(keccak_256(&self.encode()))
	}
}

impl cmp::PartialOrd for Commitment {
	fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl cmp::Ord for Commitment {
	fn cmp(&self, other: &Self) -> cmp::Ordering {
		self.validator_set_id
			.cmp(&other.validator_set_id)
			.then_with(|| self.block_number.cmp(&other.block_number))
	}
}

/// A commitment with matching GRANDPA validators' signatures.
#[derive(Debug, PartialEq, Eq, Clone, Encode, Decode)]
pub struct SignedCommitment {
	/// The commitment signatures are collected for.
	pub commitment: Commitment,
	/// GRANDPA validators' signatures for the commitment.
	///
	/// The length of this `Vec` must match number of validators in the current set (see
	/// [Commitment::validator_set_id]).
	pub signatures: Vec<Option<Signature>>,
}

impl SignedCommitment {
	/// Return the number of collected signatures.
	pub fn no_of_signatures(&self) -> usize {
		self.signatures.iter().filter(|x| x.is_some()).count()
	}

	/// Positions of the validators that signed.
	pub fn signed_validators(&self) -> impl Iterator<Item = usize> + '_ {
		self.signatures
			.iter()
			.enumerate()
			.filter_map(|(index, sig)| sig.as_ref().map(|_| index))
	}

	/// Return the signature of the validator at `index`, if any.
	pub fn signature(&self, index: usize) -> Option<&Signature> {
		self.signatures.get(index).and_then(Option::as_ref)
	}
}

/// A versioned BEEFY finality proof, as stored in a block justification.
#[derive(Debug, PartialEq, Eq, Clone, Encode, Decode)]
pub enum VersionedFinalityProof {
	/// Current active version
	#[codec(index = 1)]
	V1(SignedCommitment),
}

impl VersionedFinalityProof {
	/// Return the signed commitment this proof carries.
	pub fn into_signed_commitment(self) -> SignedCommitment {
		match self {
			VersionedFinalityProof::V1(signed) => signed,
		}
	}
}

/// Justifications of a finalized block, one per consensus engine.
#[derive(Debug, Default, PartialEq, Eq, Clone, Encode, Decode)]
pub struct Justifications(Vec<(ConsensusEngineId, Vec<u8>)>);

impl Justifications {
	/// Return the encoded justification for the given consensus engine, if it exists.
	pub fn get(&self, engine_id: ConsensusEngineId) -> Option<&Vec<u8>> {
		self.0.iter().find(|j| j.0 == engine_id).map(|j| &j.1)
	}

	/// Append a justification.
	pub fn append(&mut self, engine_id: ConsensusEngineId, justification: Vec<u8>) {
		self.0.push((engine_id, justification))
	}
}

impl From<(ConsensusEngineId, Vec<u8>)> for Justifications {
	fn from(justification: (ConsensusEngineId, Vec<u8>)) -> Self {
		Self(vec![justification])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::BEEFY_ENGINE_ID;
	use codec::Decode;
	use hex_literal::hex;

	fn commitment(block_number: BlockNumber, validator_set_id: ValidatorSetId) -> Commitment {
		Commitment {
			payload: Payload::from_single_entry(MMR_ROOT_ID, b"Hello World!".to_vec()),
			block_number,
			validator_set_id,
		}
	}

	#[test]
	fn commitment_encode_decode() {
		// given
		let commitment = commitment(5, 0);

		// when
		let encoded = codec::Encode::encode(&commitment);
		let decoded = Commitment::decode(&mut &*encoded);

		// then
		assert_eq!(decoded, Ok(commitment));
		assert_eq!(
			encoded,
			hex!("046d683048656c6c6f20576f726c6421050000000000000000000000").to_vec()
		);
	}

	#[test]
	fn should_find_mmr_root_in_unordered_payload() {
		// given
		let root = H256::repeat_byte(0x2a);
		let encoded = vec![(*b"zz", vec![1u8]), (MMR_ROOT_ID, root.as_bytes().to_vec())].encode();

		// when
		let payload = Payload::decode(&mut &*encoded).unwrap();

		// then
		assert_eq!(payload.mmr_root(), Some(root));
		assert_eq!(payload.get_raw(b"zz"), Some(&vec![1u8]));
		assert_eq!(payload.get_raw(b"xx"), None);
	}

	#[test]
	fn signed_commitment_encode_decode() {
		// given
		let commitment = commitment(5, 0);
		let sig_a = Signature([1u8; 65]);
		let sig_b = Signature([2u8; 65]);
		let signed = SignedCommitment {
			commitment: commitment.clone(),
			signatures: vec![None, None, Some(sig_a), Some(sig_b)],
		};

		// when
		let encoded = codec::Encode::encode(&signed);
		let decoded = SignedCommitment::decode(&mut &*encoded);

		// then
		assert_eq!(decoded, Ok(signed));

		let mut expected = commitment.encode();
		expected.extend_from_slice(&[0x10, 0x00, 0x00, 0x01]);
		expected.extend_from_slice(&[1u8; 65]);
		expected.push(0x01);
		expected.extend_from_slice(&[2u8; 65]);
		assert_eq!(encoded, expected);
	}

	#[test]
	fn signed_commitment_count_signatures() {
		// given
		let mut signed = SignedCommitment {
			commitment: commitment(5, 0),
			signatures: vec![None, None, Some(Signature([1u8; 65])), Some(Signature([2u8; 65]))],
		};
		assert_eq!(signed.no_of_signatures(), 2);
		assert_eq!(signed.signed_validators().collect::<Vec<_>>(), vec![2, 3]);

		// when
		signed.signatures[2] = None;

		// then
		assert_eq!(signed.no_of_signatures(), 1);
		assert_eq!(signed.signed_validators().collect::<Vec<_>>(), vec![3]);
		assert!(signed.signature(2).is_none());
		assert!(signed.signature(7).is_none());
	}

	#[test]
	fn commitment_ordering() {
		// given
		let a = commitment(1, 0);
		let b = commitment(2, 1);
		let c = commitment(10, 0);
		let d = commitment(10, 1);

		// then
		assert!(a < b);
		assert!(a < c);
		assert!(c < b);
		assert!(c < d);
		assert!(b < d);
	}

	#[test]
	fn payload_keeps_items_ordered() {
		// given
		let root = H256::repeat_byte(0x42);

		// when
		let payload = Payload::from_single_entry(*b"xx", vec![1])
			.push_raw(MMR_ROOT_ID, root.as_bytes().to_vec())
			.push_raw(*b"aa", vec![2]);

		// then
		let ids = payload.items().iter().map(|i| i.0).collect::<Vec<_>>();
		assert_eq!(ids, vec![*b"aa", *b"mh", *b"xx"]);
		assert_eq!(payload.mmr_root(), Some(root));
		assert_eq!(payload.get_raw(b"aa"), Some(&vec![2]));
		assert_eq!(payload.get_raw(b"zz"), None);
	}

	#[test]
	fn payload_rejects_malformed_mmr_root() {
		let payload = Payload::from_single_entry(MMR_ROOT_ID, vec![0u8; 31]);

		assert_eq!(payload.mmr_root(), None);
	}

	#[test]
	fn versioned_finality_proof_is_tagged_with_version() {
		// given
		let signed = SignedCommitment {
			commitment: commitment(3, 1),
			signatures: vec![Some(Signature([7u8; 65]))],
		};
		let proof = VersionedFinalityProof::V1(signed.clone());

		// when
		let encoded = proof.encode();
		let justifications = Justifications::from((BEEFY_ENGINE_ID, encoded.clone()));

		// then
		assert_eq!(encoded[0], 1);
		let raw = justifications.get(BEEFY_ENGINE_ID).unwrap();
		let decoded = VersionedFinalityProof::decode(&mut &raw[..]).unwrap();
		assert_eq!(decoded.into_signed_commitment(), signed);
		assert!(justifications.get(*b"FRNK").is_none());
	}
}
