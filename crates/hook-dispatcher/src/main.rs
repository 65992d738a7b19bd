// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, path::Path, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use hook_dispatcher::{
    config::{DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH},
    config_agent::{ConfigAgent, DEFAULT_RELOAD_INTERVAL},
    dispatcher::Dispatcher,
    kafka::KafkaSubscriber,
    lifecycle,
};

const ENV_LOG_LEVEL: &str = "HOOK_DISPATCHER_LOG_LEVEL";
const ENV_ENABLE_DEBUG: &str = "HOOK_DISPATCHER_ENABLE_DEBUG";

#[tokio::main]
pub async fn main() {
    let enable_debug = env::var(ENV_ENABLE_DEBUG)
        .map(|val| val.to_lowercase() == "true")
        .unwrap_or(false);
    let log_level = if enable_debug {
        "debug".to_string()
    } else {
        env::var(ENV_LOG_LEVEL)
            .map(|val| val.to_lowercase())
            .unwrap_or("info".to_string())
    };

    let env_filter = format!("h2=off,hyper=off,rustls=off,rdkafka=warn,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config_path = env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config_agent = match ConfigAgent::start(Path::new(&config_path)) {
        Ok(agent) => agent,
        Err(e) => {
            error!("Error starting config agent: {e}");
            return;
        }
    };
    let config = match config_agent.config() {
        Ok(config) => config,
        Err(e) => {
            error!("Get config failed: {e}");
            return;
        }
    };

    let cancel = CancellationToken::new();
    let signal_listener = lifecycle::spawn_signal_listener(cancel.clone());
    let config_watcher = tokio::spawn(
        Arc::clone(&config_agent).watch(DEFAULT_RELOAD_INTERVAL, cancel.clone()),
    );

    let dispatcher = Arc::new(Dispatcher::from_config(&config, config_agent));
    let kafka = KafkaSubscriber::new(&config.kafka, cancel.clone());

    info!(
        topic = %config.topic,
        endpoint = %config.access_endpoint,
        "Starting hook dispatcher"
    );

    // Returns once the consumer has finished the record it was handling.
    if let Err(e) = lifecycle::run(&kafka, &config.topic, dispatcher, cancel.clone()).await {
        error!("Subscribe failed: {e}");
    }

    cancel.cancel();
    if let Err(e) = signal_listener.await {
        error!("Signal listener failed: {e}");
    }
    if let Err(e) = config_watcher.await {
        error!("Config watcher failed: {e}");
    }
}
