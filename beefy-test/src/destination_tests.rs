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

use super::*;

use beefy_mmr::authority_set;
use beefy_primitives::{crypto::Signature, keyring::Keyring, Payload};
use futures::executor::block_on;
use light_client::Config;

fn chain() -> DestinationChain {
	let config = Config {
		randao_commit_delay: 3,
		randao_commit_expiration: 8,
		min_num_required_signatures: 1,
	};
	let client = LightClient::new(
		config,
		0,
		authority_set(0, &[Keyring::Alice.address()]),
		authority_set(1, &[Keyring::Bob.address()]),
	);
	DestinationChain::new(client, H160::repeat_byte(0x42))
}

fn submit_initial(chain: &DestinationChain, validator_set_id: u64) -> Result<H256, Error> {
	let commitment = Commitment {
		payload: Payload::from_mmr_root(H256::zero()),
		block_number: 1,
		validator_set_id,
	};
	let proof = ValidatorProof {
		signature: Signature::default(),
		index: 0,
		account: Keyring::Alice.address(),
		proof: vec![],
	};
	block_on(chain.submit_initial(commitment, Bitfield::from_indices(vec![0], 1).unwrap(), proof))
}

#[test]
fn block_number_query_mines_block() {
	let chain = chain();

	assert_eq!(1, block_on(chain.block_number()).unwrap());
	assert_eq!(2, block_on(chain.block_number()).unwrap());
}

#[test]
fn reverted_transaction_has_failed_receipt() {
	// given
	let chain = chain();
	block_on(chain.block_number()).unwrap();

	// when
	let tx = submit_initial(&chain, 7).unwrap();

	// then
	let receipt = block_on(chain.transaction_receipt(tx)).unwrap().unwrap();
	assert_eq!(receipt, Receipt { block_number: 2, success: false });
	assert_eq!(chain.rejected(), vec![light_client::Error::InvalidCommitment]);
	assert!(chain.initial_submissions().is_empty());
	assert!(block_on(chain.transaction_receipt(H256::zero())).unwrap().is_none());
}

#[test]
fn transaction_hashes_are_unique() {
	let chain = chain();

	let a = block_on(chain.commit_prev_randao(H256::zero())).unwrap();
	let b = block_on(chain.commit_prev_randao(H256::zero())).unwrap();

	assert_ne!(a, b);
	assert_eq!(chain.rejected(), vec![light_client::Error::InvalidTicket, light_client::Error::InvalidTicket]);
}

#[test]
fn injected_failures() {
	let chain = chain();

	chain.fail_submissions(1);
	assert!(matches!(submit_initial(&chain, 0), Err(Error::Destination(_))));
	assert!(submit_initial(&chain, 0).is_ok());

	chain.set_offline(true);
	assert!(block_on(chain.latest_beefy_block()).is_err());
	assert!(block_on(chain.current_validator_set()).is_err());

	chain.set_offline(false);
	assert_eq!(block_on(chain.current_validator_set()).unwrap().id, 0);
}
