// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! ShelfWatch - warehouse shelf monitor
//!
//! Subscribes to the sensor namespace on an MQTT broker, keeps shelf state,
//! raises alerts, drives the alarm and serves the dashboard API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use shelfwatch::actuator::outputs_from_config;
use shelfwatch::db::{Database, PersistenceSink};
use shelfwatch::{Config, Monitor, MqttSubscriber, VERSION};

/// ShelfWatch - warehouse shelf monitor
#[derive(Parser, Debug)]
#[command(name = "shelfwatch")]
#[command(version = VERSION)]
#[command(about = "Warehouse shelf monitoring over MQTT with stock and security alerts")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// MQTT broker address
    #[arg(long)]
    mqtt_broker: Option<String>,

    /// MQTT broker port
    #[arg(long)]
    mqtt_port: Option<u16>,

    /// Dashboard API port
    #[arg(long)]
    http_port: Option<u16>,

    /// Disable the dashboard API
    #[arg(long)]
    no_http: bool,

    /// Database file
    #[arg(long)]
    db: Option<PathBuf>,

    /// Run without persistence
    #[arg(long)]
    no_db: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(broker) = &self.mqtt_broker {
            config.mqtt.broker = broker.clone();
        }
        if let Some(port) = self.mqtt_port {
            config.mqtt.port = port;
        }
        if let Some(port) = self.http_port {
            config.http.port = port;
        }
        if self.no_http {
            config.http.enabled = false;
        }
        if let Some(path) = &self.db {
            config.database.path = path.clone();
        }
        if self.no_db {
            config.database.enabled = false;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("ShelfWatch v{}", VERSION);

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;
    args.apply(&mut config);
    config.validate()?;
    info!("Configuration loaded from {:?}", config_path);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let sink: Option<Arc<dyn PersistenceSink>> = if config.database.enabled {
        let db: Arc<dyn PersistenceSink> = Arc::new(Database::open(&config.database)?);
        Some(db)
    } else {
        info!("Persistence disabled");
        None
    };

    let outputs = outputs_from_config(&config.actuator)?;
    let monitor = Monitor::new(config.clone(), sink, outputs, Handle::current())?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let subscriber = MqttSubscriber::new(&config.mqtt);
    let mut mqtt_task = tokio::spawn(subscriber.run(monitor.ingestor(), shutdown_tx.subscribe()));

    #[cfg(feature = "http")]
    let http_task = if config.http.enabled {
        Some(tokio::spawn(shelfwatch::api::serve(
            monitor.dashboard(),
            config.http.clone(),
            shutdown_tx.subscribe(),
        )))
    } else {
        None
    };

    info!("ShelfWatch running");
    info!("   Press Ctrl+C to shutdown");

    // The subscriber only returns early on a fatal error
    let finished = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received, cleaning up...");
            None
        }
        result = &mut mqtt_task => Some(result),
    };

    let _ = shutdown_tx.send(());

    let mqtt_result = match finished {
        Some(result) => result,
        None => mqtt_task.await,
    };
    match mqtt_result {
        Ok(Err(e)) => error!("MQTT subscriber failed: {}", e),
        Err(e) => error!("MQTT subscriber task panicked: {}", e),
        Ok(Ok(())) => {}
    }

    #[cfg(feature = "http")]
    if let Some(task) = http_task {
        match task.await {
            Ok(Err(e)) => error!("Dashboard API failed: {}", e),
            Err(e) => error!("Dashboard API task panicked: {}", e),
            Ok(Ok(())) => {}
        }
    }

    monitor.shutdown().await;
    info!("ShelfWatch shutdown complete");

    Ok(())
}
