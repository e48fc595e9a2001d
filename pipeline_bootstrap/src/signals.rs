// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling
//!
//! Listens for SIGINT/SIGTERM (Ctrl-C on all platforms, plus SIGTERM on
//! Unix) and triggers [`ShutdownCoordinator::initiate_shutdown`] exactly
//! once, regardless of which signal arrived first.

use crate::shutdown::ShutdownCoordinator;
use tokio::task::JoinHandle;

/// Spawns a task that waits for the first shutdown-triggering signal and
/// initiates graceful shutdown on the given coordinator.
pub fn spawn_signal_handler(coordinator: ShutdownCoordinator) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received");
        coordinator.initiate_shutdown();
    })
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => tracing::debug!("received SIGTERM"),
        _ = sigint.recv() => tracing::debug!("received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::debug!("received Ctrl-C");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn signal_handler_task_is_cancellable_before_any_signal() {
        let coordinator = ShutdownCoordinator::default();
        let handle = spawn_signal_handler(coordinator.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!coordinator.is_shutting_down());
        handle.abort();
    }
}
