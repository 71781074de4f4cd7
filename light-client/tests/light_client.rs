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

use beefy_merkle_root::Keccak256;
use beefy_mmr::{authority_set, convert_to_simplified_mmr_proof, Mmr, SimplifiedMmrProof};
use beefy_primitives::{
	keyring::Keyring,
	mmr::{BeefyAuthoritySet, MmrLeaf, MmrLeafVersion},
	BlockNumber, Commitment, Payload, ValidatorSetId, H160, H256, MMR_ROOT_ID, U256,
};
use codec::Encode;
use hex_literal::hex;

use light_client::{ticket_id, Bitfield, CallContext, Config, Error, LightClient, TicketState, ValidatorProof};

const CURRENT: [Keyring; 3] = [Keyring::Alice, Keyring::Bob, Keyring::Charlie];
const NEXT: [Keyring; 3] = [Keyring::Dave, Keyring::Eve, Keyring::Ferdie];

fn addresses(keys: &[Keyring]) -> Vec<H160> {
	keys.iter().map(|k| k.address()).collect()
}

fn set(id: ValidatorSetId, keys: &[Keyring]) -> BeefyAuthoritySet {
	authority_set(id, &addresses(keys))
}

fn client() -> LightClient {
	let _ = env_logger::try_init();

	let config = Config {
		randao_commit_delay: 3,
		randao_commit_expiration: 8,
		min_num_required_signatures: 1,
	};
	LightClient::new(config, 0, set(7, &CURRENT), set(8, &NEXT))
}

/// Source chain MMR with one leaf per block, every leaf announcing `next`.
fn mmr(blocks: u32, next: &BeefyAuthoritySet) -> (Mmr, Vec<MmrLeaf>) {
	let mut mmr = Mmr::new();
	let leaves = (0..blocks)
		.map(|parent| MmrLeaf {
			version: MmrLeafVersion::new(0, 0),
			parent_number_and_hash: (parent, H256::repeat_byte(parent as u8)),
			beefy_next_authority_set: next.clone(),
			leaf_extra: H256::zero(),
		})
		.collect::<Vec<_>>();
	for leaf in &leaves {
		mmr.push(leaf.hash()).unwrap();
	}
	(mmr, leaves)
}

fn leaf_proof(mmr: &Mmr, leaves: &[MmrLeaf], block: BlockNumber) -> SimplifiedMmrProof {
	let leaf_index = u64::from(block - 1);
	let raw = mmr.generate_proof_at(leaf_index, u64::from(block)).unwrap();
	convert_to_simplified_mmr_proof(H256::zero(), leaf_index, leaves[leaf_index as usize].clone(), raw.leaf_count, &raw.items)
		.unwrap()
}

fn commitment(block_number: BlockNumber, validator_set_id: ValidatorSetId, mmr: &Mmr) -> Commitment {
	Commitment {
		payload: Payload::from_mmr_root(mmr.root_at(u64::from(block_number)).unwrap()),
		block_number,
		validator_set_id,
	}
}

fn validator_proof(keys: &[Keyring], index: usize, commitment: &Commitment) -> ValidatorProof {
	let addresses = addresses(keys);
	let proof = beefy_merkle_root::merkle_proof::<Keccak256, _, _>(addresses.iter().map(|a| a.as_bytes()), index)
		.unwrap();
	ValidatorProof {
		signature: keys[index].sign(&commitment.encode()),
		index: index as u32,
		account: addresses[index],
		proof: proof.proof.into_iter().map(H256::from).collect(),
	}
}

fn ctx(sender: u8, block_number: u64) -> CallContext {
	CallContext {
		sender: H160::repeat_byte(sender),
		block_number,
		prev_randao: U256::from(0xdead_beef_u64) + U256::from(block_number),
	}
}

struct Submission {
	commitment: Commitment,
	bitfield: Bitfield,
	proof: SimplifiedMmrProof,
}

fn submission(block: BlockNumber, set_id: ValidatorSetId, claimed: &[u32]) -> Submission {
	let (mmr, leaves) = mmr(10, &set(8, &NEXT));
	Submission {
		commitment: commitment(block, set_id, &mmr),
		bitfield: Bitfield::from_indices(claimed.iter().map(|i| *i as usize), 3).unwrap(),
		proof: leaf_proof(&mmr, &leaves, block),
	}
}

fn final_proofs(client: &LightClient, sender: u8, keys: &[Keyring], s: &Submission) -> Vec<ValidatorProof> {
	client
		.create_final_bitfield(&H160::repeat_byte(sender), &s.commitment.hash(), &s.bitfield)
		.unwrap()
		.iter_set()
		.map(|index| validator_proof(keys, index, &s.commitment))
		.collect()
}

fn submit_final(client: &mut LightClient, at: &CallContext, s: &Submission, proofs: &[ValidatorProof]) -> Result<(), Error> {
	client.submit_final(
		at,
		&s.commitment,
		&s.bitfield,
		proofs,
		&s.proof.leaf,
		&s.proof.merkle_proof_items,
		s.proof.merkle_proof_order,
	)
}

#[test]
fn should_verify_commitment_in_three_phases() {
	// given
	let mut client = client();
	let s = submission(5, 7, &[0, 1]);
	assert_eq!(client.create_initial_bitfield(&[0, 1], 3).unwrap(), s.bitfield);

	// when
	client
		.submit_initial(&ctx(1, 100), &s.commitment, &s.bitfield, &validator_proof(&CURRENT, 0, &s.commitment))
		.unwrap();

	// then
	let ticket = client.ticket(&H160::repeat_byte(1), &s.commitment.hash()).unwrap().clone();
	assert_eq!(ticket.num_required_signatures, 2);
	assert_eq!(ticket.validator_set_len, 3);
	assert_eq!(ticket.state, TicketState::InitialSubmitted);
	assert_eq!(client.current_validator_set().usage_counters.get(0), 1);

	// when
	assert_eq!(client.commit_prev_randao(&ctx(1, 102), &s.commitment.hash()), Err(Error::WaitPeriodNotOver));
	client.commit_prev_randao(&ctx(1, 104), &s.commitment.hash()).unwrap();

	// then
	let proofs = final_proofs(&client, 1, &CURRENT, &s);
	assert_eq!(proofs.len(), 2);

	// when
	submit_final(&mut client, &ctx(1, 105), &s, &proofs).unwrap();

	// then
	assert_eq!(client.latest_beefy_block(), 5);
	assert_eq!(Some(client.latest_mmr_root()), s.commitment.payload.mmr_root());
	assert!(client.ticket(&H160::repeat_byte(1), &s.commitment.hash()).is_none());
	assert_eq!(client.current_validator_set().id, 7);
	assert!(client.verify_mmr_leaf_proof(s.proof.leaf.hash(), &s.proof.merkle_proof_items, s.proof.merkle_proof_order));
}

#[test]
fn competing_relayers_finalize_once() {
	// given
	let mut client = client();
	let s = submission(5, 7, &[0, 1, 2]);
	for relayer in [1, 2] {
		client
			.submit_initial(&ctx(relayer, 100), &s.commitment, &s.bitfield, &validator_proof(&CURRENT, 2, &s.commitment))
			.unwrap();
		client.commit_prev_randao(&ctx(relayer, 103), &s.commitment.hash()).unwrap();
	}
	assert_eq!(client.current_validator_set().usage_counters.get(2), 2);
	let first = final_proofs(&client, 1, &CURRENT, &s);
	let second = final_proofs(&client, 2, &CURRENT, &s);

	// when
	let a = submit_final(&mut client, &ctx(1, 104), &s, &first);
	let b = submit_final(&mut client, &ctx(2, 104), &s, &second);

	// then
	assert_eq!(a, Ok(()));
	assert_eq!(b, Err(Error::AlreadyVerified));
	assert_eq!(client.latest_beefy_block(), 5);
}

#[test]
fn should_reject_invalid_initial_submissions() {
	let mut client = client();
	let s = submission(5, 7, &[0, 1]);
	let at = ctx(1, 100);
	let alice = validator_proof(&CURRENT, 0, &s.commitment);

	// unknown validator set
	let unknown = Commitment { validator_set_id: 9, ..s.commitment.clone() };
	assert_eq!(client.submit_initial(&at, &unknown, &s.bitfield, &alice), Err(Error::InvalidCommitment));

	// not newer than the latest block
	let old = Commitment { block_number: 0, ..s.commitment.clone() };
	assert_eq!(client.submit_initial(&at, &old, &s.bitfield, &alice), Err(Error::AlreadyVerified));

	// bitfield sized for another set
	let wide = Bitfield::from_indices(vec![0, 1], 300).unwrap();
	assert_eq!(client.submit_initial(&at, &s.commitment, &wide, &alice), Err(Error::InvalidBitfieldLength));

	// below quorum
	let single = Bitfield::from_indices(vec![0], 3).unwrap();
	assert_eq!(
		client.submit_initial(&at, &s.commitment, &single, &alice),
		Err(Error::NotEnoughClaims { got: 1, want: 2 })
	);

	// claims past the set length do not count
	let padded = Bitfield::from_indices(vec![0, 200], 256).unwrap();
	assert_eq!(
		client.submit_initial(&at, &s.commitment, &padded, &alice),
		Err(Error::NotEnoughClaims { got: 1, want: 2 })
	);

	// proof for a validator that is not claimed
	let charlie = validator_proof(&CURRENT, 2, &s.commitment);
	assert_eq!(client.submit_initial(&at, &s.commitment, &s.bitfield, &charlie), Err(Error::InvalidValidatorProof));

	// account not in the set
	let mut stranger = alice.clone();
	stranger.account = Keyring::Two.address();
	assert_eq!(client.submit_initial(&at, &s.commitment, &s.bitfield, &stranger), Err(Error::InvalidValidatorProof));

	// signature over something else
	let mut forged = alice.clone();
	forged.signature = Keyring::Alice.sign(b"something else");
	assert_eq!(client.submit_initial(&at, &s.commitment, &s.bitfield, &forged), Err(Error::InvalidSignature));

	// nothing got recorded
	assert!(client.ticket(&at.sender, &s.commitment.hash()).is_none());
	assert_eq!(client.current_validator_set().usage_counters.get(0), 0);
}

#[test]
fn should_enforce_randao_window() {
	// given
	let mut client = client();
	let s = submission(5, 7, &[0, 1]);
	let hash = s.commitment.hash();
	let alice = validator_proof(&CURRENT, 0, &s.commitment);

	// no ticket
	assert_eq!(client.commit_prev_randao(&ctx(1, 100), &hash), Err(Error::InvalidTicket));

	client.submit_initial(&ctx(1, 100), &s.commitment, &s.bitfield, &alice).unwrap();

	// final phase before randomness is captured
	assert_eq!(submit_final(&mut client, &ctx(1, 101), &s, &[]), Err(Error::PrevRandaoNotCaptured));
	assert_eq!(
		client.create_final_bitfield(&H160::repeat_byte(1), &hash, &s.bitfield),
		Err(Error::PrevRandaoNotCaptured)
	);

	// last block of the window still works
	client.commit_prev_randao(&ctx(1, 111), &hash).unwrap();
	assert_eq!(client.commit_prev_randao(&ctx(1, 111), &hash), Err(Error::PrevRandaoAlreadyCaptured));

	// another relayer misses the window
	client.submit_initial(&ctx(2, 100), &s.commitment, &s.bitfield, &alice).unwrap();
	assert_eq!(client.commit_prev_randao(&ctx(2, 112), &hash), Err(Error::TicketExpired));
	assert_eq!(client.commit_prev_randao(&ctx(2, 112), &hash), Err(Error::InvalidTicket));
}

#[test]
fn should_reject_invalid_final_submissions() {
	// given
	let mut client = client();
	let s = submission(5, 7, &[0, 1]);
	client
		.submit_initial(&ctx(1, 100), &s.commitment, &s.bitfield, &validator_proof(&CURRENT, 0, &s.commitment))
		.unwrap();
	client.commit_prev_randao(&ctx(1, 103), &s.commitment.hash()).unwrap();
	let proofs = final_proofs(&client, 1, &CURRENT, &s);
	let at = ctx(1, 104);

	// bitfield differs from the initial one
	let other = Submission { bitfield: Bitfield::from_indices(vec![0, 1, 2], 3).unwrap(), ..submission(5, 7, &[]) };
	assert_eq!(submit_final(&mut client, &at, &other, &proofs), Err(Error::InvalidBitfield));

	// missing proof
	assert_eq!(
		submit_final(&mut client, &at, &s, &proofs[..1]),
		Err(Error::InvalidValidatorProofLength { got: 1, want: 2 })
	);

	// same validator twice
	let twice = vec![proofs[0].clone(), proofs[0].clone()];
	assert_eq!(submit_final(&mut client, &at, &s, &twice), Err(Error::InvalidValidatorProof));

	// leaf of another block
	let (mmr, leaves) = mmr(10, &set(8, &NEXT));
	let wrong_leaf = Submission { proof: leaf_proof(&mmr, &leaves, 4), ..submission(5, 7, &[0, 1]) };
	assert_eq!(submit_final(&mut client, &at, &wrong_leaf, &proofs), Err(Error::InvalidMmrLeafProof));

	// oversized leaf proof
	let mut oversized = submission(5, 7, &[0, 1]);
	oversized.proof.merkle_proof_items = vec![H256::zero(); 257];
	assert_eq!(submit_final(&mut client, &at, &oversized, &proofs), Err(Error::ProofSizeExceeded));

	// nothing changed
	assert_eq!(client.latest_beefy_block(), 0);
	submit_final(&mut client, &at, &s, &proofs).unwrap();
	assert_eq!(client.latest_beefy_block(), 5);
}

#[test]
fn should_require_mmr_root_in_payload() {
	let check = |payload: Payload, expected: Error| {
		// given
		let mut client = client();
		let mut s = submission(5, 7, &[0, 1]);
		s.commitment.payload = payload;
		client
			.submit_initial(&ctx(1, 100), &s.commitment, &s.bitfield, &validator_proof(&CURRENT, 0, &s.commitment))
			.unwrap();
		client.commit_prev_randao(&ctx(1, 103), &s.commitment.hash()).unwrap();
		let proofs = final_proofs(&client, 1, &CURRENT, &s);

		// when
		let result = submit_final(&mut client, &ctx(1, 104), &s, &proofs);

		// then
		assert_eq!(result, Err(expected));
	};

	check(Payload::from_single_entry(*b"xx", vec![1; 32]), Error::CommitmentNotRelevant);
	check(Payload::from_single_entry(MMR_ROOT_ID, vec![1; 31]), Error::InvalidMmrRootLength);
}

#[test]
fn should_hand_over_to_next_validator_set() {
	// given
	let mut client = client();
	let following = set(9, &[Keyring::One, Keyring::Two]);
	let (mmr, leaves) = mmr(6, &following);
	let s = Submission {
		commitment: commitment(6, 8, &mmr),
		bitfield: Bitfield::from_indices(vec![1, 2], 3).unwrap(),
		proof: leaf_proof(&mmr, &leaves, 6),
	};
	client
		.submit_initial(&ctx(1, 100), &s.commitment, &s.bitfield, &validator_proof(&NEXT, 1, &s.commitment))
		.unwrap();
	assert_eq!(client.next_validator_set().usage_counters.get(1), 1);
	client.commit_prev_randao(&ctx(1, 103), &s.commitment.hash()).unwrap();
	let proofs = final_proofs(&client, 1, &NEXT, &s);

	// when
	submit_final(&mut client, &ctx(1, 104), &s, &proofs).unwrap();

	// then
	assert_eq!(client.latest_beefy_block(), 6);
	assert_eq!(client.current_validator_set().descriptor(), set(8, &NEXT));
	assert_eq!(client.next_validator_set().descriptor(), following);
	assert_eq!(client.next_validator_set().usage_counters.get(1), 0);

	// the old set is gone
	let s = submission(7, 7, &[0, 1]);
	assert_eq!(
		client.submit_initial(&ctx(1, 105), &s.commitment, &s.bitfield, &validator_proof(&CURRENT, 0, &s.commitment)),
		Err(Error::InvalidCommitment)
	);
}

#[test]
fn should_reject_handover_leaf_skipping_a_set() {
	// given
	let mut client = client();
	let (mmr, leaves) = mmr(6, &set(10, &CURRENT));
	let s = Submission {
		commitment: commitment(6, 8, &mmr),
		bitfield: Bitfield::from_indices(vec![0, 1], 3).unwrap(),
		proof: leaf_proof(&mmr, &leaves, 6),
	};
	client
		.submit_initial(&ctx(1, 100), &s.commitment, &s.bitfield, &validator_proof(&NEXT, 0, &s.commitment))
		.unwrap();
	client.commit_prev_randao(&ctx(1, 103), &s.commitment.hash()).unwrap();
	let proofs = final_proofs(&client, 1, &NEXT, &s);

	// when
	let result = submit_final(&mut client, &ctx(1, 104), &s, &proofs);

	// then
	assert_eq!(result, Err(Error::InvalidMmrLeaf));
	assert_eq!(client.current_validator_set().id, 7);
}

#[test]
fn should_key_tickets_by_sender_and_commitment() {
	// given
	let mut client = client();
	let commitment = Commitment {
		payload: Payload::from_mmr_root(H256::repeat_byte(0x2a)),
		block_number: 5,
		validator_set_id: 7,
	};
	let bitfield = Bitfield::from_indices(vec![0, 1], 3).unwrap();
	let hash = commitment.hash();

	// when
	client
		.submit_initial(&ctx(1, 100), &commitment, &bitfield, &validator_proof(&CURRENT, 0, &commitment))
		.unwrap();

	// then
	assert_eq!(hash, H256::from(hex!("8be0f0311712cc73f3dd815cee773d653645af778ba6ce598d1ce2c791f982d7")));
	assert_eq!(
		ticket_id(&H160::repeat_byte(1), &hash),
		H256::from(hex!("76dbabda0dedee27df16009aa27e5e073c8ad0a275d8d60c28a3a2ff69c308af"))
	);
	assert_eq!(client.ticket(&H160::repeat_byte(1), &hash).map(|t| t.state), Some(TicketState::InitialSubmitted));
	assert!(client.ticket(&H160::repeat_byte(2), &hash).is_none());
}

#[test]
fn should_prune_expired_tickets() {
	// given
	let mut client = client();
	let s = submission(5, 7, &[0, 1]);
	let hash = s.commitment.hash();
	let alice = validator_proof(&CURRENT, 0, &s.commitment);
	let ticket = |client: &LightClient, sender: u8| client.ticket(&H160::repeat_byte(sender), &hash).is_some();

	client.submit_initial(&ctx(1, 100), &s.commitment, &s.bitfield, &alice).unwrap();

	// last block relayer 1 could still capture randomness
	client.submit_initial(&ctx(2, 111), &s.commitment, &s.bitfield, &alice).unwrap();
	assert!(ticket(&client, 1));

	// window of relayer 1 is over
	client.submit_initial(&ctx(3, 112), &s.commitment, &s.bitfield, &alice).unwrap();
	assert!(!ticket(&client, 1));
	assert!(ticket(&client, 2));

	// tickets with captured randomness are kept
	client.commit_prev_randao(&ctx(2, 114), &hash).unwrap();
	client.submit_initial(&ctx(4, 200), &s.commitment, &s.bitfield, &alice).unwrap();
	assert!(ticket(&client, 2));
	assert!(!ticket(&client, 3));
	assert!(ticket(&client, 4));
}
