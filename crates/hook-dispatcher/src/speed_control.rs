// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Outbound rate limiting.
//!
//! A window opens on the first forwarded message after a reset. Messages are
//! let through as fast as they come until the count reaches the ceiling; the
//! accounting call that reaches it then sleeps until one second after the
//! window opened and resets the count. A burst of up to `ceiling` forwards is
//! therefore allowed per window, and windows drift with traffic rather than
//! following a fixed clock tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, error};

use crate::error::ConfigError;

const WINDOW: Duration = Duration::from_secs(1);

/// Source of the live rate ceiling, polled once per forwarded message.
pub trait RateCeiling: Send + Sync {
    fn rate_ceiling(&self) -> Result<i64, ConfigError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Messages forwarded since the last reset
    pub sent: u64,
    /// When the current window opened
    pub started: Option<Instant>,
}

pub struct SpeedControl {
    ceiling: Arc<dyn RateCeiling>,
    window: Mutex<Window>,
}

impl SpeedControl {
    pub fn new(ceiling: Arc<dyn RateCeiling>) -> Self {
        Self {
            ceiling,
            window: Mutex::new(Window::default()),
        }
    }

    /// Accounts for one successfully forwarded message, sleeping if the
    /// current window is full.
    ///
    /// The lock is held across the sleep, so concurrent callers queue up
    /// behind a throttled one.
    pub async fn record_sent(&self) {
        let mut window = self.window.lock().await;
        window.sent += 1;

        if window.sent == 1 {
            window.started = Some(Instant::now());
            return;
        }

        let ceiling = match self.ceiling.rate_ceiling() {
            Ok(ceiling) => ceiling,
            Err(e) => {
                error!("Failed to get concurrent size: {e}");
                return;
            }
        };

        if ceiling <= 0 || window.sent < ceiling.unsigned_abs() {
            return;
        }

        let now = Instant::now();
        let started = window.started.unwrap_or(now);
        let deadline = started + WINDOW;

        if deadline > now {
            let pause = deadline - now;
            debug!("Will sleep {:?} after sending {} events", pause, window.sent);
            sleep(pause).await;
        } else {
            debug!(
                "It took {:?} to send {} events",
                now.duration_since(started),
                window.sent
            );
        }

        window.sent = 0;
    }

    pub async fn window(&self) -> Window {
        *self.window.lock().await
    }
}
