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

use beefy_primitives::BlockNumber;

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	/// Commitments of the current validator set are only relayed while at most this many
	/// blocks below the source chain finalized head. Handovers are always relayed.
	pub fast_forward_depth: u32,
	/// Interval between polls of either chain.
	pub poll_interval: Duration,
	/// Destination blocks to wait on top of a transaction before it is considered final.
	pub confirmations: u64,
	/// Source block the MMR was activated at. The leaf of block `n` has index
	/// `n - beefy_activation_block - 1`.
	pub beefy_activation_block: BlockNumber,
	/// Delay before the workers are restarted after a failure.
	pub restart_delay: Duration,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			fast_forward_depth: 20,
			poll_interval: Duration::from_secs(6),
			confirmations: 3,
			beefy_activation_block: 0,
			restart_delay: Duration::from_secs(10),
		}
	}
}

impl Config {
	/// MMR leaf index of the source block `block_number`.
	///
	/// `None` for blocks at or before the MMR activation.
	pub fn leaf_index(&self, block_number: BlockNumber) -> Option<u64> {
		block_number
			.checked_sub(self.beefy_activation_block)
			.and_then(|n| n.checked_sub(1))
			.map(u64::from)
	}
}
