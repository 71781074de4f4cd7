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

//! BEEFY commitment relay.
//!
//! The [`Listener`] scans the source chain for signed commitments and hands them to the
//! [`Writer`], which pushes them through the interactive submission protocol of the
//! destination light client. [`run`] keeps both alive until the exit signal fires.

use futures::{channel::mpsc, future::FutureExt, pin_mut, select};
use log::{error, info};

use beefy_primitives::{BlockNumber, ValidatorSetId};

mod chain;
mod config;
mod error;
mod listener;
mod scanner;
mod task;
mod writer;

pub use chain::{DestinationClient, Receipt, SourceClient};
pub use config::Config;
pub use error::Error;
pub use listener::{Decision, Listener, ValidatorSetTracker};
pub use scanner::{ScannedCommitment, Scanner};
pub use task::Task;
pub use writer::Writer;

/// Relay commitments from `source` to `destination` until `exit_signal` resolves.
///
/// Workers are restarted after [`Config::restart_delay`] when they fail, resuming from
/// the last block the light client verified. Only fatal errors are returned.
pub async fn run<S, D, E>(source: S, destination: D, config: Config, exit_signal: E) -> Result<(), Error>
where
	S: SourceClient,
	D: DestinationClient,
	E: futures::Future<Output = ()>,
{
	let exit_signal = exit_signal.shared();
	let mut first_start = true;

	loop {
		let result = run_until_failure(
			source.clone(),
			destination.clone(),
			config.clone(),
			first_start,
			exit_signal.clone(),
		)
		.await;
		first_start = false;

		match result {
			Ok(()) => return Ok(()),
			Err(err) if err.is_fatal() => {
				error!(target: "beefy", "🥩 Relay stopped: {}", err);
				return Err(err)
			}
			Err(err) => {
				error!(target: "beefy", "🥩 Relay failed: {}. Restarting in {:?}", err, config.restart_delay);

				let delay = async_std::task::sleep(config.restart_delay).fuse();
				let exit = exit_signal.clone().fuse();
				pin_mut!(delay, exit);
				select! {
					_ = delay => {},
					_ = exit => return Ok(()),
				}
			}
		}
	}
}

async fn run_until_failure<S, D, E>(
	source: S,
	destination: D,
	config: Config,
	first_start: bool,
	exit_signal: E,
) -> Result<(), Error>
where
	S: SourceClient,
	D: DestinationClient,
	E: futures::Future<Output = ()>,
{
	let (cursor, current_set_id) = match start_state(&destination).await {
		Ok(state) => state,
		Err(err) if first_start => return Err(Error::Startup(err.to_string())),
		Err(err) => return Err(err),
	};

	info!(target: "beefy", "🥩 Relaying from block #{}, light client at set #{}", cursor, current_set_id);

	let (sender, receiver) = mpsc::channel(0);
	let listener = Listener::new(source, config.clone(), cursor, current_set_id, sender);
	let writer = Writer::new(destination, config, receiver);

	let workers = futures::future::try_join(listener.run(), writer.run()).fuse();
	let exit_signal = exit_signal.fuse();
	pin_mut!(workers, exit_signal);

	select! {
		result = workers => result.map(|_| ()),
		_ = exit_signal => Ok(()),
	}
}

async fn start_state<D: DestinationClient>(destination: &D) -> Result<(BlockNumber, ValidatorSetId), Error> {
	let latest = destination.latest_beefy_block().await?;
	let current = destination.current_validator_set().await?;
	Ok((latest + 1, current.id))
}
