//! Bot runner: wire context, channel, weather client and dispatcher, then serve until shutdown.

use crate::channels::{ChannelHandle, InboundMessage, QqApi, QqChannel};
use crate::config::Config;
use crate::context::BotContext;
use crate::dispatcher::Dispatcher;
use crate::weather::WeatherClient;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

const INBOUND_CAPACITY: usize = 64;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the bot. Blocks until SIGINT/SIGTERM.
/// `config` must already be validated (see `config::load_config`).
pub async fn run_bot(config: Config) -> Result<()> {
    let ctx = BotContext::new(config)?;
    let channel = Arc::new(QqChannel::new(QqApi::new(&ctx), ctx.timeout()));
    let weather = Arc::new(WeatherClient::new(&ctx));
    let dispatcher = Arc::new(Dispatcher::new(weather, channel.clone()));

    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(INBOUND_CAPACITY);
    let session = channel.clone().start_inbound(inbound_tx);
    let processor = tokio::spawn(process_inbound(dispatcher, inbound_rx));
    log::info!("weather bot running (appid {})", ctx.config.appid);

    shutdown_signal().await;
    log::info!("shutdown signal received, stopping {} channel", channel.id());
    channel.stop();
    let _ = session.await;
    let _ = processor.await;
    log::info!("weather bot stopped");
    Ok(())
}

/// Hand each inbound message to its own task so a slow lookup does not hold up the rest.
/// Returns once the inbound channel closes and in-flight replies finish, waiting at most
/// `DRAIN_TIMEOUT` for the stragglers.
pub async fn process_inbound(
    dispatcher: Arc<Dispatcher>,
    mut inbound_rx: mpsc::Receiver<InboundMessage>,
) {
    let mut tasks = JoinSet::new();
    loop {
        tokio::select! {
            msg = inbound_rx.recv() => {
                let Some(msg) = msg else { break };
                let dispatcher = dispatcher.clone();
                tasks.spawn(async move {
                    let id = msg.id.clone();
                    if let Err(e) = dispatcher.handle(msg).await {
                        log::warn!("inbound {}: {}", id, e);
                    }
                });
            }
            Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = res {
                    log::warn!("inbound task failed: {}", e);
                }
            }
        }
    }
    if tasks.is_empty() {
        return;
    }
    log::info!("draining {} in-flight message(s)", tasks.len());
    let drain = async { while tasks.join_next().await.is_some() {} };
    if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
        log::warn!("gave up on {} in-flight message(s) at shutdown", tasks.len());
        tasks.abort_all();
    }
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
