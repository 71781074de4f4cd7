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

//! MMR position arithmetic.
//!
//! Positions are 0-based indices of nodes in the post-order layout of the MMR, the
//! same layout the source chain uses.

/// Size of an MMR (number of nodes) holding `leaf_count` leaves.
pub fn leaf_count_to_mmr_size(leaf_count: u64) -> u64 {
	2 * leaf_count - u64::from(leaf_count.count_ones())
}

/// Position of the leaf with the given index.
pub fn leaf_index_to_pos(index: u64) -> u64 {
	leaf_count_to_mmr_size(index + 1) - u64::from((index + 1).trailing_zeros()) - 1
}

/// Height of the node at `pos`, leaves are at height 0.
pub fn pos_height_in_tree(mut pos: u64) -> u32 {
	pos += 1;
	while !all_ones(pos) {
		pos = jump_left(pos);
	}
	64 - pos.leading_zeros() - 1
}

/// Distance from a right child at `height` to its parent.
pub fn parent_offset(height: u32) -> u64 {
	2 << height
}

/// Distance between two siblings at `height`.
pub fn sibling_offset(height: u32) -> u64 {
	(2 << height) - 1
}

/// Positions of the mountain peaks, left to right.
pub fn get_peaks(mmr_size: u64) -> Vec<u64> {
	if mmr_size == 0 {
		return Vec::new();
	}

	let mut peaks = Vec::new();
	let (mut height, mut pos) = left_peak_height_pos(mmr_size);
	peaks.push(pos);
	while height > 0 {
		match get_right_peak(height, pos, mmr_size) {
			Some(peak) => {
				height = peak.0;
				pos = peak.1;
				peaks.push(pos);
			}
			None => break,
		}
	}
	peaks
}

fn get_right_peak(mut height: u32, mut pos: u64, mmr_size: u64) -> Option<(u32, u64)> {
	// move to the right sibling
	pos += sibling_offset(height);
	// go down to the left child until we are inside the MMR
	while pos > mmr_size - 1 {
		if height == 0 {
			return None;
		}
		pos -= parent_offset(height - 1);
		height -= 1;
	}
	Some((height, pos))
}

fn get_peak_pos_by_height(height: u32) -> u64 {
	(1 << (height + 1)) - 2
}

fn left_peak_height_pos(mmr_size: u64) -> (u32, u64) {
	let mut height = 1;
	let mut prev_pos = 0;
	let mut pos = get_peak_pos_by_height(height);
	while pos < mmr_size {
		height += 1;
		prev_pos = pos;
		pos = get_peak_pos_by_height(height);
	}
	(height - 1, prev_pos)
}

fn all_ones(num: u64) -> bool {
	num != 0 && num.count_zeros() == num.leading_zeros()
}

fn jump_left(pos: u64) -> u64 {
	let bit_length = 64 - pos.leading_zeros();
	let most_significant_bits = 1 << (bit_length - 1);
	pos - (most_significant_bits - 1)
}
