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

use std::time::Duration;

use codec::Encode;
use futures::{channel::mpsc, executor::block_on, future::FutureExt, pin_mut, select, Future, StreamExt};

use beefy_mmr::authority_set;
use beefy_primitives::{
	keyring::Keyring, BlockNumber, Justifications, Payload, VersionedFinalityProof, BEEFY_ENGINE_ID, H160, H256,
};
use beefy_relay::{Config, Error, Listener, ScannedCommitment, Scanner, Task, Writer};
use light_client::LightClient;

use crate::{DestinationChain, SourceChain};

const ALICE_BOB_CHARLIE: [Keyring; 3] = [Keyring::Alice, Keyring::Bob, Keyring::Charlie];
const DAVE_EVE_FERDIE: [Keyring; 3] = [Keyring::Dave, Keyring::Eve, Keyring::Ferdie];

fn addresses(keys: &[Keyring]) -> Vec<H160> {
	keys.iter().map(|k| k.address()).collect()
}

fn config() -> Config {
	Config {
		fast_forward_depth: 100,
		poll_interval: Duration::from_millis(1),
		confirmations: 1,
		beefy_activation_block: 0,
		restart_delay: Duration::from_millis(10),
	}
}

fn chains() -> (SourceChain, DestinationChain) {
	let _ = env_logger::try_init();

	let source = SourceChain::new(0, ALICE_BOB_CHARLIE.to_vec(), DAVE_EVE_FERDIE.to_vec());

	let config = light_client::Config {
		randao_commit_delay: 3,
		randao_commit_expiration: 8,
		min_num_required_signatures: 1,
	};
	let client = LightClient::new(
		config,
		0,
		authority_set(0, &addresses(&ALICE_BOB_CHARLIE)),
		authority_set(1, &addresses(&DAVE_EVE_FERDIE)),
	);
	let destination = DestinationChain::new(client, H160::repeat_byte(0x42));

	(source, destination)
}

fn verified(destination: DestinationChain, block: BlockNumber) -> impl Future<Output = ()> {
	async move {
		while destination.light_client().latest_beefy_block() < block {
			async_std::task::sleep(Duration::from_millis(1)).await;
		}
	}
}

fn relay_until(source: &SourceChain, destination: &DestinationChain, config: Config, block: BlockNumber) -> Result<(), Error> {
	block_on(async {
		let relay = beefy_relay::run(source.clone(), destination.clone(), config, verified(destination.clone(), block)).fuse();
		let timeout = async_std::task::sleep(Duration::from_secs(30)).fuse();
		pin_mut!(relay, timeout);

		select! {
			result = relay => result,
			_ = timeout => panic!("block #{} not verified in time", block),
		}
	})
}

fn scan(source: &SourceChain, cursor: BlockNumber) -> (Vec<ScannedCommitment>, BlockNumber) {
	block_on(Scanner::new(source.clone(), config()).scan(cursor)).unwrap()
}

fn task(commitment: ScannedCommitment) -> Task {
	Task {
		validators: commitment.validators.validators,
		signed_commitment: commitment.signed_commitment,
		proof: commitment.proof,
		is_handover: false,
	}
}

#[test]
fn scanner_finds_signed_commitments() {
	// given
	let (source, _) = chains();
	source.produce_blocks_until(8);
	source.sign_block(3, &[0, 1]);
	source.sign_block(8, &[0, 1, 2]);

	// when
	let (found, cursor) = scan(&source, 1);

	// then
	assert_eq!(cursor, 9);
	let blocks = found.iter().map(|c| c.signed_commitment.commitment.block_number).collect::<Vec<_>>();
	assert_eq!(blocks, vec![3, 8]);
	assert_eq!(found[0].depth, 5);
	assert_eq!(found[1].depth, 0);
	assert_eq!(found[0].validators.validators, addresses(&ALICE_BOB_CHARLIE));
	assert_eq!(found[0].proof.verify(&source.mmr_root_at(3).unwrap()), Ok(()));
	assert_eq!(found[0].proof.block_hash, block_on(beefy_relay::SourceClient::block_hash(&source, 3)).unwrap());

	// nothing new
	assert_eq!(scan(&source, 9), (vec![], 9));
}

#[test]
fn scanner_skips_invalid_commitments() {
	// given
	let (source, _) = chains();
	source.produce_blocks_until(8);

	// malformed envelope
	source.set_justifications(2, Justifications::from((BEEFY_ENGINE_ID, vec![1, 2, 3])));
	// other engine
	source.set_justifications(3, Justifications::from((*b"FRNK", vec![1, 2, 3])));
	// signature count does not match the set
	let mut signed = source.sign_block(4, &[0, 1]);
	signed.signatures.pop();
	source.set_justifications(4, Justifications::from((BEEFY_ENGINE_ID, VersionedFinalityProof::V1(signed).encode())));
	// payload does not commit to the stored root
	source.sign_block_with_payload(5, &[0, 1], Payload::from_mmr_root(H256::repeat_byte(9)));
	// no MMR root at all
	source.sign_block_with_payload(6, &[0, 1], Payload::from_single_entry(*b"xx", vec![]));
	source.sign_block(7, &[0, 1]);

	// when
	let (found, _) = scan(&source, 1);

	// then
	let blocks = found.iter().map(|c| c.signed_commitment.commitment.block_number).collect::<Vec<_>>();
	assert_eq!(blocks, vec![7]);
}

#[test]
fn writer_drives_three_phases() {
	// given
	let (source, destination) = chains();
	source.produce_blocks_until(5);
	source.sign_block(5, &[0, 1]);
	let (mut found, _) = scan(&source, 1);
	let task = task(found.remove(0));

	let (_sender, receiver) = futures::channel::mpsc::channel(0);
	let writer = Writer::new(destination.clone(), config(), receiver);

	// when
	block_on(writer.write(&task)).unwrap();

	// then
	let client = destination.light_client();
	assert_eq!(client.latest_beefy_block(), 5);
	assert_eq!(client.latest_mmr_root(), source.mmr_root_at(5).unwrap());
	assert_eq!(destination.initial_submissions(), vec![5]);
	assert!(destination.rejected().is_empty());

	// same task again is skipped
	block_on(writer.write(&task)).unwrap();
	assert_eq!(destination.initial_submissions(), vec![5]);
}

#[test]
fn writer_skips_handover_with_unexpected_signers() {
	// given
	let (source, destination) = chains();
	source.produce_blocks_until(5);
	source.sign_block(5, &[0, 1]);
	let (mut found, _) = scan(&source, 1);
	// signed by set #0, the light client expects set #1 to hand over
	let task = Task { is_handover: true, ..task(found.remove(0)) };

	let (_sender, receiver) = mpsc::channel(0);
	let writer = Writer::new(destination.clone(), config(), receiver);

	// when
	block_on(writer.write(&task)).unwrap();

	// then
	assert!(destination.initial_submissions().is_empty());
	assert_eq!(destination.light_client().latest_beefy_block(), 0);
	assert_eq!(destination.light_client().current_validator_set().id, 0);
}

// Runs the listener next to `script`, nobody drains the channel unless `script` does.
fn with_listener<F, T>(source: &SourceChain, script: impl FnOnce(mpsc::Receiver<Task>) -> F) -> T
where
	F: Future<Output = T>,
{
	let (sender, receiver) = mpsc::channel(0);
	let listener = Listener::new(source.clone(), config(), 1, 0, sender);

	block_on(async {
		let listener = listener.run().fuse();
		let script = script(receiver).fuse();
		let timeout = async_std::task::sleep(Duration::from_secs(30)).fuse();
		pin_mut!(listener, script, timeout);

		select! {
			result = listener => panic!("listener stopped: {:?}", result),
			output = script => output,
			_ = timeout => panic!("listener script timed out"),
		}
	})
}

fn pause() -> impl Future<Output = ()> {
	async_std::task::sleep(Duration::from_millis(50))
}

#[test]
fn listener_keeps_latest_commitment() {
	// given
	let (source, _) = chains();
	source.produce_blocks_until(8);
	source.sign_block(3, &[0, 1]);
	source.sign_block(5, &[0, 1]);
	source.sign_block(8, &[0, 1]);

	// when
	let queued = with_listener(&source, |mut receiver| async move {
		pause().await;
		let mut queued = Vec::new();
		while let Ok(Some(task)) = receiver.try_next() {
			queued.push(task.block_number());
		}
		queued
	});

	// then
	assert_eq!(queued, vec![8]);
}

#[test]
fn listener_replaces_waiting_commitment() {
	// given
	let (source, _) = chains();
	source.produce_blocks_until(3);
	source.sign_block(3, &[0, 1]);

	// when
	let received = with_listener(&source, |mut receiver| {
		let source = source.clone();
		async move {
			pause().await;
			// block #3 fills the slot, #5 waits and is replaced by #8
			source.produce_blocks_until(8);
			source.sign_block(5, &[0, 1]);
			source.sign_block(8, &[0, 1]);
			pause().await;

			let first = receiver.next().await.map(|task| task.block_number());
			pause().await;
			let second = receiver.try_next().ok().flatten().map(|task| task.block_number());
			pause().await;
			let idle = receiver.try_next().is_err();
			(first, second, idle)
		}
	});

	// then
	assert_eq!(received, (Some(3), Some(8), true));
}

#[test]
fn listener_waits_to_send_handover() {
	// given
	let (source, _) = chains();
	source.produce_blocks_until(5);
	source.sign_block(3, &[0, 1]);
	source.rotate_authorities(ALICE_BOB_CHARLIE.to_vec());
	source.produce_blocks_until(10);
	source.sign_block(10, &[0, 1, 2]);

	// when
	let received = with_listener(&source, |mut receiver| async move {
		pause().await;
		let first = receiver.next().await.map(|task| (task.block_number(), task.is_handover));
		// the handover only takes the slot once it frees up
		let idle = receiver.try_next().is_err();
		let second = receiver.next().await.map(|task| (task.block_number(), task.is_handover));
		(first, idle, second)
	});

	// then
	assert_eq!(received, (Some((3, false)), true, Some((10, true))));
}

#[test]
fn relay_commitment() {
	// given
	let (source, destination) = chains();
	source.produce_blocks_until(5);
	source.sign_block(5, &[1, 2]);

	// when
	relay_until(&source, &destination, config(), 5).unwrap();

	// then
	let client = destination.light_client();
	assert_eq!(client.latest_beefy_block(), 5);
	assert_eq!(client.latest_mmr_root(), source.mmr_root_at(5).unwrap());
	assert_eq!(client.current_validator_set().id, 0);
	assert!(destination.rejected().is_empty());
}

#[test]
fn relay_handover() {
	// given
	let (source, destination) = chains();
	source.produce_blocks_until(5);
	source.sign_block(5, &[0, 1]);
	source.rotate_authorities(ALICE_BOB_CHARLIE.to_vec());
	source.produce_blocks_until(10);
	source.sign_block(10, &[0, 1, 2]);

	// when
	relay_until(&source, &destination, config(), 10).unwrap();

	// then
	let client = destination.light_client();
	assert_eq!(destination.initial_submissions(), vec![5, 10]);
	assert_eq!(client.latest_beefy_block(), 10);
	assert_eq!(client.current_validator_set().descriptor(), authority_set(1, &addresses(&DAVE_EVE_FERDIE)));
	assert_eq!(client.next_validator_set().descriptor(), authority_set(2, &addresses(&ALICE_BOB_CHARLIE)));
}

#[test]
fn relay_skips_stale_commitments() {
	// given
	let (source, destination) = chains();
	source.produce_blocks_until(20);
	source.sign_block(3, &[0, 1]);
	source.sign_block(19, &[0, 1]);

	let config = Config { fast_forward_depth: 2, ..config() };

	// when
	relay_until(&source, &destination, config, 19).unwrap();

	// then
	assert_eq!(destination.initial_submissions(), vec![19]);
}

#[test]
fn relay_restarts_after_failure() {
	// given
	let (source, destination) = chains();
	source.produce_blocks_until(5);
	source.sign_block(5, &[0, 1]);
	destination.fail_submissions(2);

	// when
	relay_until(&source, &destination, config(), 5).unwrap();

	// then
	assert_eq!(destination.initial_submissions(), vec![5]);
	assert_eq!(destination.light_client().latest_beefy_block(), 5);
}

#[test]
fn relay_fails_when_destination_is_down_on_start() {
	// given
	let (source, destination) = chains();
	destination.set_offline(true);

	// when
	let result = relay_until(&source, &destination, config(), 1);

	// then
	assert!(matches!(result, Err(Error::Startup(_))));
}
