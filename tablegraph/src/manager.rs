// SPDX-License-Identifier: AGPL-3.0-or-later

use std::future::Future;

use anyhow::Result;
use log::{error, info};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task;
use tokio::task::JoinHandle;
use triggered::{Listener, Trigger};

/// Sends messages through the communication bus between services.
pub type Sender<T> = broadcast::Sender<T>;

/// Receives shutdown signal for services so they can react accordingly.
pub type Shutdown = JoinHandle<()>;

/// A long-running service function receiving the shared context, a shutdown signal and access
/// to the communication bus.
///
/// The `async_trait` macro hides the boxed and pinned function signature generic async
/// functions would otherwise need.
#[async_trait::async_trait]
pub trait Service<D, M>
where
    D: Clone + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
{
    async fn call(&self, context: D, shutdown: Shutdown, tx: Sender<M>) -> Result<()>;
}

#[async_trait::async_trait]
impl<FN, F, D, M> Service<D, M> for FN
where
    FN: Fn(D, Shutdown, Sender<M>) -> F + Sync,
    F: Future<Output = Result<()>> + Send + 'static,
    D: Clone + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
{
    async fn call(&self, context: D, shutdown: Shutdown, tx: Sender<M>) -> Result<()> {
        (self)(context, shutdown, tx).await
    }
}

/// Wrapper around `Trigger` which also fires when it gets dropped, so a panicking service task
/// still signals the exit.
#[derive(Clone)]
struct Signal(Trigger);

impl Signal {
    pub fn trigger(&self) {
        self.0.trigger();
    }
}

impl Drop for Signal {
    fn drop(&mut self) {
        self.trigger();
    }
}

/// Orchestrator for the long-running concurrent processes of a node.
///
/// Offers a broadcast bus for cross-service communication, propagates a graceful shutdown
/// signal into every service and surfaces the first stopped service (error, panic or plain
/// return) through [`ServiceManager::on_exit`]. A stopped service usually indicates system
/// failure, callers are expected to shut the whole process down when it fires.
pub struct ServiceManager<D, M>
where
    D: Clone + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
{
    /// Shared, thread-safe context between services.
    context: D,

    /// Sender of our communication bus.
    tx: Sender<M>,

    /// Sender of exit signal, fired when any service stopped.
    exit_signal: Signal,

    /// Receiver of exit signal.
    exit_handle: Listener,

    /// Sender of shutdown signal.
    ///
    /// This is a broadcast channel so we can wait for all subscribing services to drop their
    /// end before the manager itself finishes shutting down.
    shutdown_signal: broadcast::Sender<bool>,
}

impl<D, M> ServiceManager<D, M>
where
    D: Clone + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
{
    /// Returns a new instance of a service manager.
    ///
    /// The `capacity` argument bounds the number of in-flight messages on the communication
    /// bus.
    pub fn new(capacity: usize, context: D) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        let (shutdown_signal, _) = broadcast::channel(16);
        let (exit_signal, exit_handle) = triggered::trigger();

        Self {
            context,
            tx,
            exit_signal: Signal(exit_signal),
            exit_handle,
            shutdown_signal,
        }
    }

    /// Spawns a new service under this manager.
    pub fn add<F: Service<D, M> + Send + Sync + 'static>(&mut self, name: &'static str, service: F) {
        let tx = self.tx.clone();

        let shutdown_tx = self.shutdown_signal.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();

        // Wait for any signal from the shutdown channel
        let signal = task::spawn(async move {
            let _ = shutdown_rx.recv().await;
        });

        let exit_signal = self.exit_signal.clone();
        let context = self.context.clone();

        task::spawn(async move {
            info!("Start {} service", name);

            let handle = service.call(context, signal, tx).await;

            // Dropping our shutdown sender tells the shutdown procedure this service stopped
            drop(shutdown_tx);

            if let Some(err) = handle.err() {
                error!("Error in {} service: {}", name, err);
                exit_signal.trigger();
            }

            // `exit_signal` drops here and fires even when the service task panicked
        });
    }

    /// Future which resolves as soon as any service returned an error, panicked or stopped.
    pub async fn on_exit(&self) {
        self.exit_handle.clone().await;
    }

    /// Informs all services about the graceful shutdown and waits until they all stopped.
    pub async fn shutdown(self) {
        info!("Received shutdown signal");

        let mut rx = self.shutdown_signal.subscribe();

        let _ = self.shutdown_signal.send(true);

        // Drop our own sender so the loop below does not wait for it
        drop(self.shutdown_signal);

        // When the last service dropped its sender the channel closes, which is the signal
        // that every service finished shutting down
        loop {
            if let Err(RecvError::Closed) = rx.recv().await {
                break;
            }
        }
    }
}
