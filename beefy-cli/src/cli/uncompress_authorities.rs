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

use crate::cli::utils::{parse_hex, Authorities};
use beefy_primitives::{crypto::public_to_address, H160};
use structopt::StructOpt;

/// Uncompress BEEFY id(s) and derive their addresses.
#[derive(StructOpt)]
#[structopt(about = "Uncompress BEEFY authority ids and print their Ethereum addresses")]
pub struct UncompressAuthorities {
	/// A single BEEFY authority id (compressed public key).
	#[structopt(
		long,
		conflicts_with("authorities"),
		required_unless("authorities"),
		parse(try_from_str = beefy_id_from_hex),
	)]
	pub authority: Option<[u8; 33]>,

	/// A SCALE-encoded vector of BEEFY authority ids (compressed public keys).
	///
	/// This can be obtained by querying `beefy.authorities`/`beefy.nextAuthorities` storage.
	#[structopt(long, conflicts_with("authority"), required_unless("authority"))]
	pub authorities: Option<Authorities>,
}

impl UncompressAuthorities {
	pub fn run(self) -> anyhow::Result<()> {
		let ids = match (self.authority, self.authorities) {
			(Some(id), _) => vec![id],
			(None, Some(ids)) => ids.0,
			(None, None) => anyhow::bail!("Neither argument given"),
		};

		for (id, (uncompressed, address)) in ids.iter().zip(uncompress_beefy_ids(&ids)?) {
			println!("[0x{}] Uncompressed:\n\t {}\n\t Address: {:?}", hex::encode(id), hex::encode(uncompressed), address);
		}
		Ok(())
	}
}

/// Uncompressed (65 bytes) public keys and addresses of the given compressed keys.
pub fn uncompress_beefy_ids(ids: &[[u8; 33]]) -> anyhow::Result<Vec<([u8; 65], H160)>> {
	ids.iter()
		.map(|id| {
			let public = libsecp256k1::PublicKey::parse_compressed(id)
				.map_err(|err| anyhow::format_err!("Invalid public key 0x{}: {:?}", hex::encode(id), err))?;
			Ok((public.serialize(), public_to_address(&public)))
		})
		.collect()
}

fn beefy_id_from_hex(id: &str) -> anyhow::Result<[u8; 33]> {
	let bytes = parse_hex(id)?;
	<[u8; 33]>::try_from(bytes.as_slice())
		.map_err(|_| anyhow::format_err!("Expected 33 bytes compressed public key, got {}", bytes.len()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;

	#[test]
	fn should_derive_address_of_generator() {
		// given
		let id = hex!("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798");

		// when
		let result = uncompress_beefy_ids(&[id]).unwrap();

		// then
		assert_eq!(result[0].0[0], 0x04);
		assert_eq!(result[0].0[1..33], id[1..]);
		assert_eq!(result[0].1, H160::from(hex!("7e5f4552091a69125d5dfcb7b8c2659029395bdf")));
	}

	#[test]
	fn should_reject_invalid_keys() {
		assert!(uncompress_beefy_ids(&[[0u8; 33]]).is_err());
		assert!(beefy_id_from_hex("0x0102").is_err());
	}
}
