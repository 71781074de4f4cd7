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

//! Size of the random signature sample the light client checks.

/// Parameters the minimal sample size is derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecurityParams {
	/// Value an attacker could gain relative to the stake that gets slashed.
	pub stake_ratio: f64,
	/// Fraction of the validator set an attacker is assumed to control.
	pub slashable_fraction: f64,
	/// Number of blocks a relayer can wait out to influence the randomness.
	pub randao_window: u64,
}

impl Default for SecurityParams {
	fn default() -> Self {
		SecurityParams {
			stake_ratio: 2.5,
			slashable_fraction: 0.5,
			randao_window: 3,
		}
	}
}

impl SecurityParams {
	/// `ceil(log2(stake_ratio * (randao_window + 1)) / -log2(slashable_fraction))`
	pub fn min_num_required_signatures(&self) -> u32 {
		let numerator = (self.stake_ratio * (self.randao_window as f64 + 1.0)).log2();
		let denominator = -self.slashable_fraction.log2();
		// saturating cast, non-finite results end up at the bounds
		(numerator / denominator).ceil().max(0.0) as u32
	}
}

/// `ceil(log2(x))`, zero for `x <= 1`.
pub fn ceil_log2(x: u64) -> u32 {
	if x <= 1 {
		0
	} else {
		64 - (x - 1).leading_zeros()
	}
}

/// Minimal number of claimed signers: `ceil(2 * len / 3)`.
pub fn quorum(len: u32) -> u32 {
	((2 * u64::from(len) + 2) / 3) as u32
}

/// Number of signatures to sample for a commitment signed by a set of `len` validators,
/// where the initial signature was already used `usage_count` times.
///
/// Never exceeds the quorum.
pub fn compute_num_required_signatures(len: u32, usage_count: u16, min_num_required_signatures: u32) -> u32 {
	let required = min_num_required_signatures
		.saturating_add(ceil_log2(u64::from(len)))
		.saturating_add(1)
		.saturating_add(2 * ceil_log2(u64::from(usage_count)));
	required.min(quorum(len))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn should_compute_ceil_log2() {
		let values = (0..=9).map(ceil_log2).collect::<Vec<_>>();

		assert_eq!(values, vec![0, 0, 1, 2, 2, 3, 3, 3, 3, 4]);
		assert_eq!(ceil_log2(1 << 40), 40);
		assert_eq!(ceil_log2((1 << 40) + 1), 41);
	}

	#[test]
	fn should_compute_quorum() {
		assert_eq!(quorum(0), 0);
		assert_eq!(quorum(1), 1);
		assert_eq!(quorum(3), 2);
		assert_eq!(quorum(4), 3);
		assert_eq!(quorum(300), 200);
		assert_eq!(quorum(301), 201);
	}

	#[test]
	fn should_derive_min_from_security_params() {
		let params = SecurityParams {
			stake_ratio: 2.0,
			slashable_fraction: 0.5,
			randao_window: 1,
		};
		assert_eq!(params.min_num_required_signatures(), 2);

		let params = SecurityParams {
			stake_ratio: 1_000_000.0,
			slashable_fraction: 0.25,
			randao_window: 127,
		};
		assert_eq!(params.min_num_required_signatures(), 14);
	}

	#[test]
	fn sample_grows_with_usage() {
		// given
		let len = 300;

		// when
		let fresh = compute_num_required_signatures(len, 0, 10);
		let reused = compute_num_required_signatures(len, 4, 10);
		let heavily = compute_num_required_signatures(len, u16::MAX, 10);

		// then
		assert_eq!(fresh, 10 + 9 + 1);
		assert_eq!(reused, fresh + 4);
		assert_eq!(heavily, fresh + 32);
	}

	#[test]
	fn sample_is_capped_at_quorum() {
		assert_eq!(compute_num_required_signatures(3, 0, 17), 2);
		assert_eq!(compute_num_required_signatures(1, 9, 17), 1);
	}
}
