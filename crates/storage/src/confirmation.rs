// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-use confirmation handed back for every WAL entry
//!
//! The sequencer fills the [`Confirmer`] exactly once; the issuer consumes the
//! [`Confirmation`] exactly once. Both halves are move-only, so neither a
//! second fill nor a second read can be expressed.

use crate::error::WalError;
use std::time::Duration;
use tokio::sync::oneshot;

/// Producer half, carried inside a [`WalEntry`](crate::WalEntry)
#[derive(Debug)]
pub struct Confirmer<T> {
    tx: oneshot::Sender<Result<T, WalError>>,
}

/// Consumer half, held by whoever submitted the entry
#[derive(Debug)]
pub struct Confirmation<T> {
    rx: oneshot::Receiver<Result<T, WalError>>,
}

/// Create a connected confirmer/confirmation pair
pub fn channel<T>() -> (Confirmer<T>, Confirmation<T>) {
    let (tx, rx) = oneshot::channel();
    (Confirmer { tx }, Confirmation { rx })
}

impl<T> Confirmer<T> {
    /// Fill the confirmation
    ///
    /// Returns false if the issuer already gave up waiting. That is not an
    /// error for the sequencer: the entry has been applied either way.
    pub fn confirm(self, result: Result<T, WalError>) -> bool {
        self.tx.send(result).is_ok()
    }

    /// True if the issuer dropped its confirmation
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Confirmation<T> {
    /// Wait for the sequencer's answer
    pub async fn wait(self) -> Result<T, WalError> {
        self.rx.await.unwrap_or(Err(WalError::SequencerStopped))
    }

    /// Wait at most `timeout`; the entry is still sequenced after a timeout
    pub async fn wait_timeout(self, timeout: Duration) -> Result<T, WalError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(received) => received.unwrap_or(Err(WalError::SequencerStopped)),
            Err(_) => Err(WalError::ConfirmationTimeout),
        }
    }

    /// Block the current thread until the answer arrives
    ///
    /// Must not be called from within an async runtime.
    pub fn wait_blocking(self) -> Result<T, WalError> {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(WalError::SequencerStopped))
    }

    /// Take the answer if it has already arrived
    pub fn try_take(&mut self) -> Option<Result<T, WalError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(WalError::SequencerStopped)),
        }
    }
}

#[cfg(test)]
#[path = "confirmation_tests.rs"]
mod tests;
