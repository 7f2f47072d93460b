use anyhow::{Context, Result};
use settler::{
    config, db::SettlerDb, metrics::SettlerTelemetry, runner::Settler, secrets::SecretBox,
    wallet::SidecarConnector,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = config::load_config()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let telemetry = SettlerTelemetry::new();

    tracing::info!("settler starting");
    tracing::info!(
        signer = %cfg.signer.url,
        tick_interval_secs = cfg.jobs.tick_interval.as_secs(),
        safety_margin_secs = cfg.jobs.safety_margin.as_secs(),
        "config loaded"
    );

    let db = SettlerDb::connect(&cfg.db.url, cfg.db.max_connections, cfg.db.acquire_timeout).await?;
    db.migrate().await?;

    let http = reqwest::Client::builder()
        .timeout(cfg.signer.http_timeout)
        .build()
        .context("build http client")?;

    let settler = Arc::new(Settler::new(
        Arc::new(db),
        Arc::new(SidecarConnector::new(http, &cfg.signer.url)),
        SecretBox::new(&cfg.encryption_key),
        cfg.jobs.clone(),
        telemetry,
    ));

    let shutdown = CancellationToken::new();

    let mut join_set = tokio::task::JoinSet::new();
    {
        let shutdown = shutdown.clone();
        let settler = Arc::clone(&settler);
        join_set.spawn(async move { settler.run_forever(shutdown).await });
    }

    tracing::info!("settler started");

    let mut fatal: Option<anyhow::Error> = None;
    tokio::select! {
        res = shutdown_signal() => {
            res?;
            tracing::info!("shutdown requested");
        },
        res = join_set.join_next() => {
            if let Some(res) = res {
                let res = res.context("settler task panicked")?;
                match res {
                    Ok(()) => fatal = Some(anyhow::anyhow!("settler task exited unexpectedly")),
                    Err(e) => fatal = Some(e.context("settler task failed")),
                }
            }
        }
    }

    shutdown.cancel();

    while let Some(res) = join_set.join_next().await {
        let res = res.context("settler task panicked")?;
        if let Err(e) = res {
            fatal.get_or_insert_with(|| e.context("settler task failed"));
        }
    }

    fatal.map_or(Ok(()), Err)
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.context("ctrl-c")?;
        Ok(())
    }
}
