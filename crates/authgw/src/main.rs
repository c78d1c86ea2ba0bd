use authgw::{Config, Gateway, ServerParams};
use clap::Parser;
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Credential-check gateway with RADIUS and LDAP backends
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "authgw")]
struct Cli {
    /// Path to configuration file
    #[arg(value_name = "CONFIG", default_value = "config.json")]
    config_path: String,

    /// Validate configuration and exit
    #[arg(short, long)]
    validate: bool,
}

fn print_summary(config: &Config) {
    println!("Configuration summary:");
    println!("  Backend: {}", config.auth_provider.kind);
    println!("  Log level: {}", config.log_level());

    let check = &config.auth_provider.auth_check;
    if check.enable {
        println!("  Health checks: every {}s as {}", check.interval_sec, check.user);
    } else {
        println!("  Health checks: disabled");
    }

    if let Ok(servers) = config.server_descriptors() {
        println!("Servers:");
        for server in servers.iter() {
            let detail = match &server.params {
                ServerParams::Radius { method, .. } => method.to_string(),
                ServerParams::Ldap { ssl: true } => "ldaps".to_string(),
                ServerParams::Ldap { ssl: false } => "ldap".to_string(),
            };
            println!(
                "  [{}] {} - {} ({}, timeout {}s)",
                server.ordinal,
                server.name,
                server.endpoint(),
                detail,
                server.response_timeout.as_secs()
            );
        }
    }
}

/// Resolve when the process is asked to stop
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            if cli.validate {
                eprintln!("Configuration validation failed!");
                eprintln!("   Error: {}", e);
            } else {
                eprintln!("Failed to load configuration from {}: {}", cli.config_path, e);
            }
            process::exit(1);
        }
    };

    if cli.validate {
        println!("Configuration validated successfully!");
        println!();
        print_summary(&config);
        process::exit(0);
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level())))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("authgw v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from: {}", cli.config_path);

    let token = CancellationToken::new();
    let (gateway, monitor) = match Gateway::launch(&config, token.clone()) {
        Ok(running) => running,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let status = gateway.current_status();
    info!(status = %status.status_id, "Gateway started, press Ctrl+C to stop");

    shutdown_signal().await;
    info!("Shutdown requested");
    token.cancel();

    if let Some(handle) = monitor
        && let Err(e) = handle.await
    {
        error!("Health monitor task failed: {}", e);
    }

    info!("Gateway stopped");
}
