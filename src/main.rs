//! mesh-midi node
//!
//! Listens for MIDI on the serial and BLE inputs and plays it across the synth mesh.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mesh_midi::config::{AppConfig, LogFormat};
use mesh_midi::sink::{ConsoleSink, FanoutSink, LogSink, MeshSink};
use mesh_midi::transport::{midi_port, MidiPortTransport, NodeClock, Transport, UartTransport};
use mesh_midi::{InterpreterActor, MidiInterpreter, Source};

/// Mesh MIDI node - turns serial and BLE MIDI into mesh synth events
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Print every emitted event to the console
    #[arg(long)]
    monitor: bool,

    /// List available MIDI input ports
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    // The log format lives in the config, so logging starts after the load
    // and reports how the load went
    let loaded = AppConfig::load_optional(&args.config).await?;
    let from_file = loaded.is_some();
    let config = loaded.unwrap_or_default();

    init_logging(&args.log_level, config.log_format)?;

    info!("Starting mesh-midi node...");
    if from_file {
        info!("Configuration file: {}", args.config);
    } else {
        info!("Config file {} not found, using defaults", args.config);
    }

    if args.list_ports {
        midi_port::print_input_ports(&config.ble.port)?;
        return Ok(());
    }

    run_node(config, args.monitor, shutdown_signal()).await?;

    info!("mesh-midi shutdown complete");
    Ok(())
}

async fn run_node(
    config: AppConfig,
    monitor: bool,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let mut sinks = FanoutSink::new();
    sinks.push(Arc::new(LogSink));
    if config.mesh.enabled {
        let mesh = MeshSink::bind(config.mesh.group, config.mesh.port, config.mesh.ttl)?;
        sinks.push(Arc::new(mesh));
    }
    if config.console.enabled || monitor {
        sinks.push(Arc::new(ConsoleSink::new(config.mesh.local_id)));
    }

    let interpreter = MidiInterpreter::new(config.voices, config.template.to_event(), Arc::new(sinks));
    let (handle, actor_task) = InterpreterActor::spawn(interpreter);
    info!("Interpreter ready with {} voices", config.voices);

    let clock = NodeClock::new();
    let mut transports: Vec<Box<dyn Transport>> = Vec::new();
    if config.uart.enabled {
        transports.push(Box::new(UartTransport::new(config.uart.clone())));
    }
    if config.ble.enabled {
        transports.push(Box::new(MidiPortTransport::new(config.ble.port.clone(), Source::Ble)));
    }

    let mut active = 0;
    for transport in &transports {
        match transport.start(handle.clone(), clock.clone()).await {
            Ok(()) => {
                info!("{} MIDI input started", transport.source());
                active += 1;
            }
            Err(e) => warn!("Failed to start {} input '{}': {:#}", transport.source(), transport.name(), e),
        }
    }
    if active == 0 {
        warn!("No MIDI inputs active; enable uart or ble in the config");
    }

    info!("Ready to process MIDI messages!");
    shutdown.await;

    info!("Shutting down...");
    for transport in &transports {
        if let Err(e) = transport.shutdown().await {
            warn!("Failed to stop {} input: {}", transport.source(), e);
        }
    }

    handle.shutdown();
    let interpreter = actor_task.await?;
    info!(
        "Final interpreter state: {}",
        serde_json::to_string(&interpreter.snapshot())?
    );

    Ok(())
}

fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init(),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
