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

//! Deterministic test accounts.
//!
//! Secret keys are the keccak hash of the seed string, they are NOT derived the way
//! wallets derive `//Alice`. Only to be used in tests and local setups.

use crate::{
	crypto::{self, Signature},
	keccak_256, AuthorityAddress,
};

/// Set of test accounts using [`crate::crypto`] types.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum Keyring {
	Alice,
	Bob,
	Charlie,
	Dave,
	Eve,
	Ferdie,
	One,
	Two,
}

impl Keyring {
	/// Sign `msg`.
	pub fn sign(self, msg: &[u8]) -> Signature {
		let msg = keccak_256(msg);
		crypto::sign(&self.secret(), &msg)
	}

	/// Return the secret key.
	pub fn secret(self) -> secp256k1::SecretKey {
		secp256k1::SecretKey::parse(&keccak_256(self.to_seed().as_bytes()))
			.expect("keccak of a seed string is a valid secret key; qed")
	}

	/// Return public key.
	pub fn public(self) -> secp256k1::PublicKey {
		secp256k1::PublicKey::from_secret_key(&self.secret())
	}

	/// Return the Ethereum-style address.
	pub fn address(self) -> AuthorityAddress {
		crypto::public_to_address(&self.public())
	}

	/// Return seed string.
	pub fn to_seed(self) -> String {
		format!("//{}", self)
	}

	/// Iterator over all test accounts
	pub fn iter() -> impl Iterator<Item = Keyring> {
		<Self as strum::IntoEnumIterator>::iter()
	}
}

impl From<Keyring> for AuthorityAddress {
	fn from(k: Keyring) -> Self {
		k.address()
	}
}
