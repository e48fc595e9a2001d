// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! `main.rs` owns exactly one [`ShutdownCoordinator`]. A signal handler
//! (see [`crate::signals`]) calls [`ShutdownCoordinator::initiate_shutdown`]
//! on the first SIGINT/SIGTERM; `main.rs` awaits the coordinator's token,
//! then drives `Supervisor::shutdown` — the Supervisor owns its own bounded
//! wait for in-flight workers, so this coordinator only needs to carry the
//! cancellation signal, not a second grace-period timer.
//!
//! [`CancellationToken`] is the concrete type `main.rs` wires everywhere
//! `pipeline_domain::CancellationSignal` is expected — by the Worker Pool,
//! Discovery, and Watcher — via the bridge implementation below.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared, clonable shutdown flag passed to every long-lived task
/// (`WorkerPool` workers, the Discovery scan, the Watcher's drain loop).
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves immediately if already cancelled, otherwise waits for
    /// [`cancel`](Self::cancel). `main.rs` awaits this directly instead of
    /// polling `is_cancelled` in a loop.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Owns the process-wide [`CancellationToken`] and guards against
/// triggering shutdown twice (a second SIGTERM arriving mid-shutdown must
/// not re-enter `initiate_shutdown`'s logging/cancel path).
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    shutdown_initiated: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a clone of the token to hand to a worker, Discovery, or the
    /// Watcher.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Cancels the token exactly once, regardless of how many times this is
    /// called (the signal handler and, e.g., a future admin-triggered
    /// shutdown path could both race to call it).
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::info!("initiating graceful shutdown");
            self.token.cancel();
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Bridges this bootstrap-local token to the domain's cancellation
/// abstraction, so `pipeline_runtime` components never need to know a
/// concrete tokio type, only `pipeline_domain::CancellationSignal`.
impl pipeline_domain::CancellationSignal for CancellationToken {
    fn is_canceled(&self) -> bool {
        self.is_cancelled()
    }
}
