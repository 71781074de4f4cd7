// Copyright (C) 2020 Parity Technologies (UK) Ltd.
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

//! BEEFY uses recoverable secp256k1 signatures over keccak hashes. Authorities are
//! identified by their Ethereum-style address.

use codec::{Decode, Encode};
use core::fmt;

use crate::{keccak_256, AuthorityAddress};

/// A 65-byte recoverable ECDSA signature: `r || s || v`.
///
/// `v` is either the raw recovery id (`0..=3`) or the Ethereum flavour (`27..=30`).
#[derive(Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct Signature(pub [u8; 65]);

impl Signature {
	/// Create a signature from the `libsecp256k1` representation.
	pub fn from_parts(signature: &secp256k1::Signature, recovery_id: &secp256k1::RecoveryId) -> Self {
		let mut raw = [0u8; 65];
		raw[..64].copy_from_slice(&signature.serialize());
		raw[64] = recovery_id.serialize();
		Signature(raw)
	}

	/// Recovery id, normalized to `0..=3`.
	pub fn recovery_id(&self) -> u8 {
		let v = self.0[64];
		if v >= 27 {
			v - 27
		} else {
			v
		}
	}

	/// Recover the address of the signer of `message_hash`.
	///
	/// Returns `None` if the signature is malformed.
	pub fn recover_address(&self, message_hash: &[u8; 32]) -> Option<AuthorityAddress> {
		let message = secp256k1::Message::parse(message_hash);
		let mut rs = [0u8; 64];
		rs.copy_from_slice(&self.0[..64]);
		let signature = secp256k1::Signature::parse_standard(&rs).ok()?;
		let recovery_id = secp256k1::RecoveryId::parse(self.recovery_id()).ok()?;
		let public = secp256k1::recover(&message, &signature, &recovery_id).ok()?;
		Some(public_to_address(&public))
	}

	/// Check that the signature was produced by `address` over `message_hash`.
	pub fn verify(&self, message_hash: &[u8; 32], address: &AuthorityAddress) -> bool {
		self.recover_address(message_hash).as_ref() == Some(address)
	}
}

impl fmt::Debug for Signature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Signature(0x{})", hex::encode(&self.0[..]))
	}
}

impl Default for Signature {
	fn default() -> Self {
		Signature([0u8; 65])
	}
}

/// Sign a 32-byte message hash.
pub fn sign(secret: &secp256k1::SecretKey, message_hash: &[u8; 32]) -> Signature {
	let message = secp256k1::Message::parse(message_hash);
	let (signature, recovery_id) = secp256k1::sign(&message, secret);
	Signature::from_parts(&signature, &recovery_id)
}

/// Convert a public key into an Ethereum address: the last 20 bytes of the keccak hash
/// of the uncompressed key (without the `0x04` prefix).
pub fn public_to_address(public: &secp256k1::PublicKey) -> AuthorityAddress {
	let uncompressed = public.serialize();
	let hash = keccak_256(&uncompressed[1..]);
	AuthorityAddress::from_slice(&hash[12..])
}

/// Parse a compressed (33 bytes) or uncompressed (65 bytes) public key and convert it
/// into an Ethereum address.
pub fn address_from_public_bytes(public: &[u8]) -> Option<AuthorityAddress> {
	let public = secp256k1::PublicKey::parse_slice(public, None).ok()?;
	Some(public_to_address(&public))
}
