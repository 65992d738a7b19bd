// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Broker-independent consume loop.
//!
//! A [`RecordSource`] yields records one at a time; [`consume`] hands each to
//! the message handler and keeps going through handler and source errors
//! until cancelled. A record already being handled when the token fires is
//! finished before the loop exits.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::subscriber::MessageHandler;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub payload: Vec<u8>,
    pub headers: HashMap<String, String>,
}

#[async_trait]
pub trait RecordSource: Send + 'static {
    type Error: Display + Send;

    /// Waits for the next record.
    async fn recv(&mut self) -> Result<Record, Self::Error>;
}

pub async fn consume<S: RecordSource>(
    mut source: S,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Consumer stopped");
                break;
            }
            received = source.recv() => match received {
                Ok(record) => {
                    if let Err(e) = handler.handle(&record.payload, &record.headers).await {
                        warn!("Dropped message: {e}");
                    }
                }
                Err(e) => error!(error = %e, "Consumer error"),
            },
        }
    }
}
