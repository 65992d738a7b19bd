// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Relays messages from a publish/subscribe topic to a webhook endpoint.
//!
//! Each delivered message is checked for the expected `User-Agent` header and
//! a payload, POSTed to the configured endpoint, and counted against a
//! per-second rate ceiling that is re-read from the live configuration.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod config_agent;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod forwarder;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod lifecycle;
pub mod speed_control;
pub mod subscriber;
pub mod validator;
