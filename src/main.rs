mod bot;
mod cli;
mod command;
mod config;
mod context;
mod diagnostics;
mod dispatch;
mod event;
mod handler;
mod helper;
mod listener;
mod logging;
mod permission;
mod rate_limit;
mod registry;
mod reply;
mod stats;

use anyhow::{anyhow, bail};
use clap::Parser;
use serenity::{all::GatewayIntents, Client};
use std::{sync::Arc, time::Duration};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    // A missing `.env` is fine, the environment or config file may hold everything.
    let _ = dotenvy::dotenv();
    logging::init(cli.debug);

    let mut cfg = config::Config::load(cli.config.as_deref()).await?;
    cfg.apply_env();
    if cli.maintenance {
        cfg.general.maintenance = true;
    }
    logging::install_panic_hook(&cfg.logging.directory);

    let core = Arc::new(bot::BotCore::new(
        cfg,
        command::manifest(),
        listener::listeners(),
    ));

    if cli.stats {
        print!("{}", diagnostics::summary(&core));
        return Ok(());
    }
    if cli.test {
        let checks = diagnostics::run(&core);
        if !diagnostics::report(&checks) {
            bail!("Diagnostics failed");
        }
        return Ok(());
    }

    let problems = core.cfg.problems();
    if !problems.is_empty() {
        bail!("Invalid configuration: {}", problems.join("; "));
    }
    if core.maintenance() {
        log_internal!("Starting in maintenance mode");
    }

    // Things we want discord to tell us about.
    let intents = GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&core.cfg.general.discord_token, intents)
        .event_handler(handler::Handler::new(core.clone()))
        .await?;

    tokio::spawn(housekeeping(core.clone()));

    let shard_manager = client.shard_manager.clone();
    let shutdown_core = core.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        log_internal!("Shutting down");
        shutdown_core.begin_shutdown();
        let grace = shutdown_core.cfg.timeouts.shutdown_grace();
        if !shutdown_core.drain(grace).await {
            log::warn!(
                "Abandoning {} command(s) still running after {:?}",
                shutdown_core.in_flight(),
                grace
            );
        }
        shard_manager.shutdown_all().await;
    });

    let result = match cli.shard {
        true => client.start_autosharded().await,
        false => client.start().await,
    };
    result.map_err(|e| anyhow!("Gateway connection failed: {}", e))?;

    log_internal!("Stopped");
    Ok(())
}

/// Periodically forget idle rate limit buckets and log activity counters.
async fn housekeeping(core: Arc<bot::BotCore>) {
    let period = core.limiter.settings().window.max(Duration::from_secs(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let swept = core.limiter.sweep();
        if swept > 0 {
            log::debug!(
                "Swept {} idle rate limit buckets, {} still tracked",
                swept,
                core.limiter.tracked()
            );
        }
        match serde_json::to_string(&core.stats.snapshot()) {
            Ok(json) => log::debug!("Stats {}", json),
            Err(e) => log::warn!("Could not serialize stats: {}", e),
        }
    }
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Could not listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::error!("Could not listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}
