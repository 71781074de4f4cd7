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

use crate::cli::utils::parse_u256;
use beefy_primitives::{bitfield::Bitfield as Bits, U256};
use structopt::StructOpt;

/// Validator bitfield commands.
#[derive(StructOpt)]
#[structopt(about = "Build and subsample validator bitfields.")]
pub enum Bitfield {
	/// Print the words of the bitfield claiming the given validators.
	Create {
		/// Number of validators in the set.
		length: usize,
		/// Indices of the validators that signed.
		indices: Vec<usize>,
	},
	/// Sample validators from a claimed bitfield the way the light client does.
	Subsample {
		/// Randomness captured by the light client.
		#[structopt(long, parse(try_from_str = parse_u256))]
		seed: U256,
		/// Number of validators to sample.
		#[structopt(long)]
		count: usize,
		/// Number of validators in the set.
		length: usize,
		/// Indices of the validators that signed.
		indices: Vec<usize>,
	},
}

impl Bitfield {
	pub fn run(self) -> anyhow::Result<()> {
		match self {
			Self::Create { length, indices } => {
				let bits = Bits::from_indices(indices, length)?;
				print_bitfield(&bits);
			}
			Self::Subsample {
				seed,
				count,
				length,
				indices,
			} => {
				let sample = subsample(seed, count, length, indices)?;
				print_bitfield(&sample);
			}
		}
		Ok(())
	}
}

fn subsample(seed: U256, count: usize, length: usize, indices: Vec<usize>) -> anyhow::Result<Bits> {
	let prior = Bits::from_indices(indices, length)?;
	Ok(prior.subsample(seed, count, length)?)
}

fn print_bitfield(bits: &Bits) {
	println!("Indices: {:?}", bits.iter_set().collect::<Vec<_>>());
	println!("Set bits: {}", bits.count_set_bits());
	for word in bits.words() {
		println!("\t{:#x}", word);
	}
	println!("Hash: 0x{}", hex::encode(bits.hash()));
}
