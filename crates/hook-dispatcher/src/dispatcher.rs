// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-message pipeline: validate, forward, then account for the forward in
//! the rate window.
//!
//! Forwarding failures are logged and swallowed so that acknowledgment to the
//! broker never depends on the webhook endpoint being reachable.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use crate::config::Config;
use crate::error::DispatchError;
use crate::forwarder::{build_client, Forwarder};
use crate::speed_control::{RateCeiling, SpeedControl};
use crate::subscriber::MessageHandler;
use crate::validator::validate_message;

pub struct Dispatcher {
    user_agent: String,
    endpoint: String,
    forwarder: Forwarder,
    speed_control: SpeedControl,
}

impl Dispatcher {
    pub fn new(
        user_agent: String,
        endpoint: String,
        forwarder: Forwarder,
        ceiling: Arc<dyn RateCeiling>,
    ) -> Self {
        Self {
            user_agent,
            endpoint,
            forwarder,
            speed_control: SpeedControl::new(ceiling),
        }
    }

    /// Builds a dispatcher from the startup configuration.
    ///
    /// The rate ceiling is taken from `ceiling` on every forward, never from `config`.
    pub fn from_config(config: &Config, ceiling: Arc<dyn RateCeiling>) -> Self {
        let client = build_client(config.https_proxy.as_deref(), config.http_timeout())
            .or_else(|e| {
                error!(
                    "Unable to parse proxy configuration: {}, no proxy will be used",
                    e
                );
                build_client(None, config.http_timeout())
            })
            .unwrap_or_else(|e| {
                error!("Unable to build HTTP client: {}, using defaults", e);
                reqwest::Client::new()
            });

        Self::new(
            config.user_agent.clone(),
            config.access_endpoint.clone(),
            Forwarder::new(client),
            ceiling,
        )
    }

    pub fn speed_control(&self) -> &SpeedControl {
        &self.speed_control
    }
}

#[async_trait]
impl MessageHandler for Dispatcher {
    async fn handle(
        &self,
        payload: &[u8],
        headers: &HashMap<String, String>,
    ) -> Result<(), DispatchError> {
        validate_message(payload, headers, &self.user_agent)?;

        match self.forwarder.forward(payload, headers, &self.endpoint).await {
            Ok(()) => self.speed_control.record_sent().await,
            Err(e) => error!("Failed to send message: {e}"),
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::error::ValidationError;
    use crate::speed_control::tests::FixedCeiling;
    use mockito::Server;
    use tracing_test::traced_test;

    const UA: &str = "Robot-Gitee-Access";

    fn dispatcher(endpoint: String, ceiling: i64) -> Dispatcher {
        let config = Config {
            access_endpoint: endpoint,
            user_agent: UA.to_string(),
            ..test_config()
        };
        Dispatcher::from_config(&config, FixedCeiling::new(ceiling))
    }

    fn valid_headers() -> HashMap<String, String> {
        HashMap::from([
            ("User-Agent".to_string(), UA.to_string()),
            ("X-Gitee-Event".to_string(), "Issue Hook".to_string()),
        ])
    }

    #[tokio::test]
    async fn test_invalid_message_is_not_forwarded() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .expect(0)
            .create_async()
            .await;
        let dispatcher = dispatcher(format!("{}/hook", server.url()), 10);

        let missing_header = dispatcher.handle(b"payload", &HashMap::new()).await;
        assert!(matches!(
            missing_header,
            Err(DispatchError::Validation(ValidationError::MissingOrInvalidHeader))
        ));

        let empty_payload = dispatcher.handle(b"", &valid_headers()).await;
        assert!(matches!(
            empty_payload,
            Err(DispatchError::Validation(ValidationError::EmptyPayload))
        ));

        mock.assert_async().await;
        assert_eq!(dispatcher.speed_control().window().await.sent, 0);
    }

    #[tokio::test]
    async fn test_successful_forward_is_counted() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("X-Gitee-Event", "Issue Hook")
            .with_status(200)
            .expect(2)
            .create_async()
            .await;
        let dispatcher = dispatcher(format!("{}/hook", server.url()), 10);

        dispatcher.handle(b"one", &valid_headers()).await.unwrap();
        dispatcher.handle(b"two", &valid_headers()).await.unwrap();

        mock.assert_async().await;
        let window = dispatcher.speed_control().window().await;
        assert_eq!(window.sent, 2);
        assert!(window.started.is_some());
    }

    #[tokio::test]
    async fn test_error_status_still_counts_as_forwarded() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .create_async()
            .await;
        let dispatcher = dispatcher(format!("{}/hook", server.url()), 10);

        dispatcher.handle(b"payload", &valid_headers()).await.unwrap();

        assert_eq!(dispatcher.speed_control().window().await.sent, 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_forward_failure_is_logged_and_not_counted() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let dispatcher = dispatcher(format!("http://127.0.0.1:{port}/hook"), 10);

        let result = dispatcher.handle(b"payload", &valid_headers()).await;

        assert!(result.is_ok());
        assert_eq!(
            dispatcher.speed_control().window().await,
            crate::speed_control::Window::default()
        );
        assert!(logs_contain("Failed to send message"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_bad_proxy_keeps_request_timeout() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let config = Config {
            access_endpoint: format!("http://127.0.0.1:{port}/hook"),
            user_agent: UA.to_string(),
            http_timeout_secs: 1,
            https_proxy: Some("not a proxy url".to_string()),
            ..test_config()
        };
        let dispatcher = Dispatcher::from_config(&config, FixedCeiling::new(10));
        assert!(logs_contain("Unable to parse proxy configuration"));

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            dispatcher.handle(b"payload", &valid_headers()),
        )
        .await
        .expect("request should time out instead of hanging");

        assert!(result.is_ok());
        assert_eq!(dispatcher.speed_control().window().await.sent, 0);
        assert!(logs_contain("Failed to send message"));
    }
}
