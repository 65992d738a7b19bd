// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::LifecycleError;
use crate::subscriber::{MessageHandler, Subscriber};

/// Subscribes `handler` to `topic` and waits for `cancel`.
///
/// A subscription failure is returned straight away. Cancellation is a clean
/// shutdown: no new messages are pulled, and `run` returns only after the
/// subscriber has drained the handlers already running.
pub async fn run(
    subscriber: &dyn Subscriber,
    topic: &str,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
) -> Result<(), LifecycleError> {
    subscriber.subscribe(topic, handler).await?;
    info!(topic, "Subscribed, dispatching messages");

    cancel.cancelled().await;
    subscriber.shutdown().await;
    info!("Received done, exiting normally");
    Ok(())
}

/// Cancels `cancel` on SIGINT or SIGTERM. The task also ends quietly if the
/// token is cancelled elsewhere first.
pub fn spawn_signal_listener(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            signal = shutdown_signal() => {
                info!("Received {signal}, shutting down");
                cancel.cancel();
            }
        }
    })
}

async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                Ok(()) = tokio::signal::ctrl_c() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                ctrl_c().await
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await
    }
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for SIGINT: {e}");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
