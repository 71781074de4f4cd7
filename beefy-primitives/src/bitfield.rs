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

//! Packed bit-vector over the validator index space.
//!
//! Bit `i` lives in word `i / 256` at position `i % 256`, counting from the least
//! significant bit. This matches the `uint256[]` layout the destination chain uses.

use codec::{Decode, Encode};

use crate::{keccak_256, U256};

const WORD_BITS: usize = 256;
const LIMB_BITS: usize = 64;

/// Bitfield errors.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// Index outside of the bitfield length.
	#[error("Bit {index} is out of bounds for a bitfield of length {length}")]
	IndexOutOfBounds {
		/// Offending index.
		index: usize,
		/// Bitfield length.
		length: usize,
	},
	/// Not enough bits set in the prior bitfield to sample from.
	#[error("Cannot sample {requested} indices from {available} claimed")]
	NotEnoughClaims {
		/// Number of requested indices.
		requested: usize,
		/// Number of set bits in the prior.
		available: usize,
	},
}

/// A packed bitfield stored as 256-bit words.
#[derive(Debug, Default, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Bitfield(Vec<U256>);

impl Bitfield {
	/// Create an empty bitfield able to hold `length` bits.
	pub fn new(length: usize) -> Self {
		Bitfield(vec![U256::zero(); words_for(length)])
	}

	/// Wrap raw words.
	pub fn from_words(words: Vec<U256>) -> Self {
		Bitfield(words)
	}

	/// Create a bitfield of `length` bits with the given `indices` set.
	pub fn from_indices(indices: impl IntoIterator<Item = usize>, length: usize) -> Result<Self, Error> {
		let mut bitfield = Self::new(length);
		for index in indices {
			if index >= length {
				return Err(Error::IndexOutOfBounds { index, length });
			}
			bitfield.set(index);
		}
		Ok(bitfield)
	}

	/// Raw words of the bitfield.
	pub fn words(&self) -> &[U256] {
		&self.0
	}

	/// Consume the bitfield and return the raw words.
	pub fn into_words(self) -> Vec<U256> {
		self.0
	}

	/// Number of bits the stored words can hold.
	pub fn capacity(&self) -> usize {
		self.0.len() * WORD_BITS
	}

	/// Return `true` if bit `index` is set. Bits past the capacity are never set.
	pub fn is_set(&self, index: usize) -> bool {
		self.0.get(index / WORD_BITS).map_or(false, |word| word.bit(index % WORD_BITS))
	}

	/// Set bit `index`.
	///
	/// Panics if `index` is past the capacity.
	pub fn set(&mut self, index: usize) {
		let (word, limb, bit) = locate(index);
		(self.0[word].0)[limb] |= 1u64 << bit;
	}

	/// Clear bit `index`.
	///
	/// Panics if `index` is past the capacity.
	pub fn unset(&mut self, index: usize) {
		let (word, limb, bit) = locate(index);
		(self.0[word].0)[limb] &= !(1u64 << bit);
	}

	/// Hamming weight of the whole bitfield.
	pub fn count_set_bits(&self) -> usize {
		self.0.iter().flat_map(|word| word.0.iter()).map(|limb| count_set_bits_u64(*limb)).sum()
	}

	/// Hamming weight of the bits below `length`.
	pub fn count_set_bits_below(&self, length: usize) -> usize {
		self.0
			.iter()
			.flat_map(|word| word.0.iter())
			.enumerate()
			.map(|(i, limb)| {
				let start = i * LIMB_BITS;
				if start + LIMB_BITS <= length {
					count_set_bits_u64(*limb)
				} else if start < length {
					count_set_bits_u64(*limb & ((1u64 << (length - start)) - 1))
				} else {
					0
				}
			})
			.sum()
	}

	/// Iterate over indices of set bits, in ascending order.
	pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
		(0..self.capacity()).filter(move |index| self.is_set(*index))
	}

	/// Return `true` if every bit set in `self` is also set in `other`.
	pub fn is_subset_of(&self, other: &Bitfield) -> bool {
		self.0.iter().enumerate().all(|(i, word)| {
			let other = other.0.get(i).copied().unwrap_or_else(U256::zero);
			*word & !other == U256::zero()
		})
	}

	/// Keccak-256 of the big-endian words, packed one after another.
	pub fn hash(&self) -> [u8; 32] {
		let mut packed = vec![0u8; self.0.len() * 32];
		for (word, chunk) in self.0.iter().zip(packed.chunks_mut(32)) {
			word.to_big_endian(chunk);
		}
		keccak_256(&packed)
	}

	/// Deterministically pick `n` distinct indices out of the bits set in `self`.
	///
	/// Indices are derived from `keccak256(be32(seed) || be32(iteration)) mod length`,
	/// candidates that are not set in `self` or are already chosen are skipped.
	/// The result is always a subset of `self`.
	pub fn subsample(&self, seed: U256, n: usize, length: usize) -> Result<Bitfield, Error> {
		let available = self.count_set_bits_below(length);
		if n > available {
			return Err(Error::NotEnoughClaims { requested: n, available });
		}

		let mut result = Bitfield::new(length);
		let mut found = 0;
		let mut iteration = U256::zero();
		while found < n {
			let index = make_index(seed, iteration, length);
			iteration = iteration.overflowing_add(U256::one()).0;

			if !self.is_set(index) || result.is_set(index) {
				continue;
			}

			result.set(index);
			found += 1;
		}

		Ok(result)
	}
}

/// Number of 256-bit words required to hold `length` bits.
pub fn words_for(length: usize) -> usize {
	(length + WORD_BITS - 1) / WORD_BITS
}

/// Hamming weight via parallel bit summation.
pub const fn count_set_bits_u64(mut x: u64) -> usize {
	x -= (x >> 1) & 0x5555_5555_5555_5555;
	x = (x & 0x3333_3333_3333_3333) + ((x >> 2) & 0x3333_3333_3333_3333);
	x = (x + (x >> 4)) & 0x0f0f_0f0f_0f0f_0f0f;
	(x.wrapping_mul(0x0101_0101_0101_0101) >> 56) as usize
}

fn locate(index: usize) -> (usize, usize, usize) {
	let offset = index % WORD_BITS;
	(index / WORD_BITS, offset / LIMB_BITS, offset % LIMB_BITS)
}

fn make_index(seed: U256, iteration: U256, length: usize) -> usize {
	let mut buf = [0u8; 64];
	seed.to_big_endian(&mut buf[..32]);
	iteration.to_big_endian(&mut buf[32..]);
	let hash = U256::from_big_endian(&keccak_256(&buf));
	(hash % U256::from(length as u64)).low_u64() as usize
}
