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

use beefy_primitives::H256;

/// Relay errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Source chain client failure
	#[error("Source client error: {0}")]
	Source(String),
	/// Destination chain client failure
	#[error("Destination client error: {0}")]
	Destination(String),
	/// Transaction was included but reverted by the light client
	#[error("Transaction {0:?} reverted")]
	Reverted(H256),
	/// Task channel between listener and writer was closed
	#[error("Task channel closed")]
	ChannelClosed,
	/// MMR proof generation or conversion failed
	#[error(transparent)]
	Mmr(#[from] beefy_mmr::Error),
	/// Bitfield construction failed
	#[error(transparent)]
	Bitfield(#[from] beefy_primitives::bitfield::Error),
	/// Initial destination state could not be fetched
	#[error("Failed to start relay: {0}")]
	Startup(String),
}

impl Error {
	/// Return `true` if restarting the relay would not help.
	pub fn is_fatal(&self) -> bool {
		matches!(self, Error::Startup(_))
	}
}
