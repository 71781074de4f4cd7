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

use beefy_primitives::{H160, H256, U256};
use parity_scale_codec::Decode;

/// Parse hex string to a vector of bytes.
pub fn parse_hex(hex: &str) -> anyhow::Result<Vec<u8>> {
	let s = hex.strip_prefix("0x").unwrap_or(hex);
	Ok(hex::decode(s)?)
}

/// Parse a decimal or `0x`-prefixed hex number.
pub fn parse_u256(value: &str) -> anyhow::Result<U256> {
	match value.strip_prefix("0x") {
		Some(hex) => Ok(U256::from_str_radix(hex, 16)?),
		None => Ok(U256::from_dec_str(value)?),
	}
}

/// Parse a 32-byte hash.
pub fn parse_h256(value: &str) -> anyhow::Result<H256> {
	let bytes = parse_hex(value)?;
	anyhow::ensure!(bytes.len() == 32, "Expected 32 bytes, got {}", bytes.len());
	Ok(H256::from_slice(&bytes))
}

/// Parse a 20-byte address.
pub fn parse_address(value: &str) -> anyhow::Result<H160> {
	let bytes = parse_hex(value)?;
	anyhow::ensure!(bytes.len() == 20, "Expected 20 bytes, got {}", bytes.len());
	Ok(H160::from_slice(&bytes))
}

/// A wrapper struct to overcome structopt's `Vec` special handling.
pub struct Bytes(pub Vec<u8>);
impl std::str::FromStr for Bytes {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> anyhow::Result<Self> {
		parse_hex(s).map(Bytes)
	}
}

/// A SCALE-encoded vector of hashes.
pub struct Hashes(pub Vec<H256>);
impl std::str::FromStr for Hashes {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> anyhow::Result<Self> {
		let encoded = parse_hex(s)?;
		Ok(Self(Vec::<H256>::decode(&mut &*encoded)?))
	}
}

/// A SCALE-encoded vector of compressed public keys.
pub struct Authorities(pub Vec<[u8; 33]>);
impl std::str::FromStr for Authorities {
	type Err = anyhow::Error;

	fn from_str(id: &str) -> anyhow::Result<Self> {
		let encoded = parse_hex(id)?;
		let auth_ids = Vec::<[u8; 33]>::decode(&mut &*encoded)?;
		Ok(Self(auth_ids))
	}
}
