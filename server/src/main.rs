use anyhow::Context;
use clap::Parser;
use commonware_utils::hex;
use rand::{rngs::OsRng, RngCore};
use skytrax_engine::MemoryWallet;
use skytrax_server::{
    archive::Archive,
    room::{self, Actor},
    room_seed, Api, Config,
};
use std::{collections::BTreeMap, path::PathBuf, sync::Arc};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Crash game server for skytrax.", long_about = None)]
struct Args {
    /// YAML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args
    let args = Args::parse();

    // Load config
    let config = match &args.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("could not read config file {}", path.display()))?;
            serde_yaml::from_str::<Config>(&contents)
                .with_context(|| format!("could not parse config file {}", path.display()))?
        }
        None => Config::default(),
    };
    let mut config = config.validate().context("invalid config")?;
    if let Some(port) = args.port {
        config.port = port;
    }

    // Create logger
    let subscriber = tracing_subscriber::fmt().with_max_level(config.log_level);
    if config.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    // Draw a seed if none was configured
    let master_seed = match config.seed {
        Some(seed) => seed,
        None => {
            let mut seed = [0u8; 32];
            OsRng.fill_bytes(&mut seed);
            warn!(seed = %hex(&seed), "no seed configured, drew one at random");
            seed
        }
    };

    // Start rooms
    let wallet = Arc::new(MemoryWallet::new(config.initial_balance));
    let mut rooms = BTreeMap::new();
    let mut handles = Vec::new();
    for name in &config.rooms {
        let (actor, mailbox) = Actor::new(
            room::Config {
                name: name.clone(),
                game: config.game.clone(),
                seed: room_seed(&master_seed, name),
                mailbox_size: config.mailbox_size,
                event_buffer: config.event_buffer,
                tick_interval: config.tick_interval,
            },
            wallet.clone(),
        )
        .with_context(|| format!("invalid game config for room {name}"))?;
        if let Some(path) = &config.archive_path {
            Archive::new(name.clone(), path.clone()).start(mailbox.subscribe());
        }
        handles.push(actor.start());
        rooms.insert(name.clone(), mailbox);
    }
    info!(rooms = ?config.rooms, "rooms started");

    // Start server
    let app = Api::new(rooms.clone(), wallet, config.rate_limit).router();
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
        }
        info!("shutting down");
    })
    .await
    .context("axum server error")?;

    // Stop rooms
    for (name, mailbox) in &rooms {
        if let Err(e) = mailbox.stop().await {
            warn!(room = %name, error = %e, "failed to stop room");
        }
    }
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "room task failed");
        }
    }
    Ok(())
}
