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

//! Per-validator signature usage counters packed 16 to a 256-bit word.

use beefy_primitives::U256;
use codec::{Decode, Encode};

const COUNTERS_PER_WORD: usize = 16;
const COUNTERS_PER_LIMB: usize = 4;
const COUNTER_BITS: usize = 16;

/// Packed array of `u16` counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Encode, Decode)]
pub struct PackedCounters(Vec<U256>);

impl PackedCounters {
	/// Zeroed counters for `len` validators.
	pub fn new(len: usize) -> Self {
		PackedCounters(vec![U256::zero(); (len + COUNTERS_PER_WORD - 1) / COUNTERS_PER_WORD])
	}

	/// Counter at `index`. Counters past the end read as zero.
	pub fn get(&self, index: usize) -> u16 {
		let (word, limb, shift) = locate(index);
		self.0
			.get(word)
			.map_or(0, |w| ((w.0[limb] >> shift) & 0xffff) as u16)
	}

	/// Overwrite the counter at `index`, growing the array if needed.
	pub fn set(&mut self, index: usize, value: u16) {
		let (word, limb, shift) = locate(index);
		if word >= self.0.len() {
			self.0.resize(word + 1, U256::zero());
		}
		let limb = &mut self.0[word].0[limb];
		*limb = (*limb & !(0xffff_u64 << shift)) | (u64::from(value) << shift);
	}

	/// Increment the counter at `index`, saturating at `u16::MAX`.
	///
	/// Returns the value before the increment.
	pub fn increment(&mut self, index: usize) -> u16 {
		let value = self.get(index);
		self.set(index, value.saturating_add(1));
		value
	}

	/// Raw words.
	pub fn words(&self) -> &[U256] {
		&self.0
	}
}

fn locate(index: usize) -> (usize, usize, usize) {
	let slot = index % COUNTERS_PER_WORD;
	(index / COUNTERS_PER_WORD, slot / COUNTERS_PER_LIMB, (slot % COUNTERS_PER_LIMB) * COUNTER_BITS)
}
