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

#![warn(missing_docs)]

//! BEEFY light client for a foreign chain.
//!
//! Commitments are imported in three phases. A relayer first claims which validators
//! signed and proves a single signature (`submit_initial`). After a delay, randomness
//! of the destination chain is captured (`commit_prev_randao`); it selects the random
//! sample of signatures the relayer then has to provide together with the MMR leaf of
//! the commitment block (`submit_final`).

mod client;
mod counters;
mod error;
pub mod sampling;
mod ticket;

pub use beefy_primitives::bitfield::Bitfield;
pub use client::{CallContext, Config, LightClient, ValidatorProof, ValidatorSetState};
pub use counters::PackedCounters;
pub use error::Error;
pub use ticket::{ticket_id, Ticket, TicketState};
