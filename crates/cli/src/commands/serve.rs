//! `kitsmith serve`: HTTP gateway plus the chat relay when enabled.

use kitsmith_channels::{DiscordChannel, Relay};
use kitsmith_workflow::Controller;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::Context;

pub async fn run(ctx: &Context, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let session = ctx.session()?;
    let mut config = session.config().clone();
    if let Some(port) = port {
        config.gateway.port = port;
    }
    let controller = Controller::new(session);

    println!("kitsmith gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "   Chat relay: {}",
        if config.discord.enabled { "enabled" } else { "disabled" }
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
                shutdown.cancel();
            }
        });
    }

    let relay_task = if config.discord.enabled {
        let channel = Arc::new(DiscordChannel::new(config.discord.clone()));
        let relay = Relay::new(channel, controller.clone(), &config.discord);
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = relay.run(shutdown).await {
                error!(error = %e, "Chat relay stopped with an error");
            }
        }))
    } else {
        None
    };

    let served = kitsmith_gateway::serve(&config, controller.clone(), shutdown.clone()).await;

    shutdown.cancel();
    controller.cancel();
    if let Some(task) = relay_task {
        let _ = task.await;
    }
    served
}
