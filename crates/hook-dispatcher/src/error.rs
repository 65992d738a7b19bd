// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Reasons an inbound message is rejected before any forwarding happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unexpected message: invalid header")]
    MissingOrInvalidHeader,

    #[error("unexpected message: the payload is empty")]
    EmptyPayload,
}

/// Failures while forwarding a message to the webhook endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("Failed to build request: {0}")]
    RequestConstruction(String),

    #[error("Failed to send request: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration snapshot is unavailable: lock poisoned")]
    Poisoned,
}

#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    #[error("Failed to create consumer: {0}")]
    Client(String),

    #[error("Failed to subscribe to topic {topic}: {reason}")]
    Topic { topic: String, reason: String },
}

/// The only error a message handler reports back to the subscription.
///
/// Forwarding failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Subscription setup failed: {0}")]
    Subscribe(#[from] SubscribeError),
}
