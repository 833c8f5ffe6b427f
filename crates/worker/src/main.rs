use chrono::Utc;
use clap::Parser;
use salonmail::api;
use salonmail::config;
use salonmail::db;
use salonmail::emails::{dispatcher_from_config, ScheduledEmailsRepo};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "salonmail-worker", about = "Scheduled email dispatcher")]
struct Args {
    /// Run a single batch and exit (for cron / external schedulers)
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    salonmail::telemetry::init_tracing();

    let args = Args::parse();
    let cfg = config::Config::from_env()?;

    info!(
        once = args.once,
        page_size = cfg.page_size,
        send_timeout_secs = cfg.send_timeout_secs,
        tick_secs = cfg.tick_secs,
        admin_api = cfg.admin_addr.as_deref().unwrap_or("disabled"),
        api_auth = if cfg.api_token.is_some() { "enabled" } else { "disabled" },
        smtp = cfg.smtp.as_ref().map(|s| s.host.as_str()).unwrap_or("disabled"),
        migrate_on_startup = cfg.migrate_on_startup,
        "salonmail worker starting"
    );

    let pool = db::make_pool(&cfg.database_url).await?;
    if cfg.migrate_on_startup {
        db::run_migrations(&pool).await?;
    }

    let dispatcher = dispatcher_from_config(&pool, &cfg)?;

    if args.once {
        let report = dispatcher.run(Utc::now()).await?;
        info!(
            lock_busy = report.lock_busy,
            selected = report.selected,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            errored = report.errored,
            "dispatch run complete"
        );
        return Ok(());
    }

    // ---- API task ----
    let api_addr = cfg.admin_addr.clone();
    let app = api::router(api::ApiState {
        emails: ScheduledEmailsRepo::new(pool.clone()),
        api_token: cfg.api_token.clone(),
    });

    let api_handle = tokio::spawn(async move {
        if let Some(addr) = api_addr {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("admin api listening on http://{addr}");
            axum::serve(listener, app).await?;
        } else {
            std::future::pending::<()>().await;
        }
        Ok::<(), anyhow::Error>(())
    });

    // ---- Shutdown signal ----
    // Only checked between ticks, so a run in progress always finishes.
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested, waiting for the current run");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!(error = %e, "cannot listen for ctrl-c");
                // keep the sender alive so the ticker never sees a closed channel
                let _keep = shutdown_tx;
                std::future::pending::<()>().await;
            }
        }
    });

    // ---- Dispatch ticker ----
    let tick = cfg.tick_interval();
    let dispatch_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        // a slow run must not be followed by a burst of catch-up runs
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown_rx.changed() => break,
            }
            if let Err(e) = dispatcher.run(Utc::now()).await {
                error!(error = %e, "dispatch run aborted");
            }
        }

        Ok::<(), anyhow::Error>(())
    });

    tokio::select! {
        res = api_handle => res??,
        res = dispatch_handle => res??,
    }

    info!("salonmail worker stopped");
    Ok(())
}
