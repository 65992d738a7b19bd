// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DispatchError, SubscribeError};

/// Receives every message delivered on a subscribed topic.
///
/// Implementations must tolerate concurrent invocations. An `Ok` return
/// means the message was consumed.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(
        &self,
        payload: &[u8],
        headers: &HashMap<String, String>,
    ) -> Result<(), DispatchError>;
}

/// A publish/subscribe client able to deliver a topic to a handler.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Registers `handler` for `topic`. Delivery continues in the background
    /// after this returns.
    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), SubscribeError>;

    /// Waits for deliveries started by [`Subscriber::subscribe`] to wind down.
    /// Callers stop delivery first, usually by cancelling the token the
    /// subscriber was built with.
    async fn shutdown(&self) {}
}
