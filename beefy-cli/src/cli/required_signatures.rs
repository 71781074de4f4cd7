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

use light_client::sampling::{compute_num_required_signatures, quorum, SecurityParams};
use structopt::StructOpt;

/// Compute how many signatures the light client samples.
#[derive(StructOpt)]
#[structopt(about = "Compute the number of signatures the light client checks for a commitment")]
pub struct RequiredSignatures {
	/// Number of validators in the set.
	pub validators: u32,
	/// How many times the anchoring validator's signature was used before.
	#[structopt(long, default_value = "0")]
	pub usage: u16,
	/// Value an attacker could gain relative to the slashed stake.
	#[structopt(long, default_value = "2.5")]
	pub stake_ratio: f64,
	/// Fraction of the validator set an attacker controls.
	#[structopt(long, default_value = "0.5")]
	pub slashable_fraction: f64,
	/// Blocks a relayer can wait out to influence the randomness.
	#[structopt(long, default_value = "3")]
	pub randao_window: u64,
}

impl RequiredSignatures {
	pub fn run(self) -> anyhow::Result<()> {
		anyhow::ensure!(self.validators > 0, "Validator set must not be empty");
		anyhow::ensure!(
			self.slashable_fraction > 0.0 && self.slashable_fraction < 1.0,
			"Slashable fraction must be in (0, 1)"
		);

		let params = SecurityParams {
			stake_ratio: self.stake_ratio,
			slashable_fraction: self.slashable_fraction,
			randao_window: self.randao_window,
		};
		let min = params.min_num_required_signatures();

		println!("Minimum sample: {}", min);
		println!("Quorum: {}", quorum(self.validators));
		println!("Required signatures: {}", compute_num_required_signatures(self.validators, self.usage, min));
		Ok(())
	}
}
