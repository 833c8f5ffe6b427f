use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use salonmail::config::Config;
use salonmail::db;
use salonmail::emails::{
    dispatcher_from_config, plan_for_reservation, EmailStatus, RequeueOutcome, ScheduledEmail,
    ScheduledEmailsRepo,
};
use salonmail::reservations::ReservationsRepo;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "salonmailctl", about = "Operate the scheduled email queue")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply database migrations
    Migrate,
    /// Run one dispatch batch now
    Dispatch,
    /// Plan and insert the reminder/thanks emails for a reservation
    Schedule { reservation_id: i64 },
    /// List scheduled emails, newest first
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Copy a failed email into a new pending one
    Requeue {
        id: Uuid,
        /// RFC 3339 send time (default: now)
        #[arg(long)]
        send_at: Option<DateTime<Utc>>,
    },
    /// Counts per status
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    salonmail::telemetry::init_tracing();

    let cli = Cli::parse();
    let cfg = Config::from_env()?;
    let pool = db::make_pool(&cfg.database_url).await?;
    let emails = ScheduledEmailsRepo::new(pool.clone());

    match cli.command {
        Command::Migrate => {
            db::run_migrations(&pool).await?;
            println!("migrations applied");
        }
        Command::Dispatch => {
            let dispatcher = dispatcher_from_config(&pool, &cfg)?;
            let report = dispatcher.run(Utc::now()).await?;
            if report.lock_busy {
                println!("another dispatch run is active; nothing done");
            } else {
                println!(
                    "selected={} sent={} failed={} skipped={} errored={}",
                    report.selected, report.sent, report.failed, report.skipped, report.errored
                );
            }
        }
        Command::Schedule { reservation_id } => {
            let reservations = ReservationsRepo::new(pool.clone());
            let Some(reservation) = reservations.find(reservation_id).await? else {
                anyhow::bail!("reservation {reservation_id} not found");
            };

            let planned = plan_for_reservation(&reservation, &cfg.schedule, Utc::now());
            let ids = emails.enqueue_many(&planned).await?;
            for (new, id) in planned.iter().zip(ids) {
                println!("+ {} {} send_at={}", id, new.email_type, new.send_at.to_rfc3339());
            }
            if planned.is_empty() {
                println!("nothing to schedule");
            }
        }
        Command::List { status, limit } => {
            if let Some(s) = status.as_deref() {
                if EmailStatus::parse(s).is_none() {
                    anyhow::bail!("unknown status {s:?} (pending | sent | failed)");
                }
            }
            for email in emails.list(status.as_deref(), limit, None, None).await? {
                print_row(&email);
            }
        }
        Command::Requeue { id, send_at } => {
            match emails
                .requeue_failed(id, send_at.unwrap_or_else(Utc::now))
                .await?
            {
                RequeueOutcome::Requeued(new_id) => println!("requeued {id} as {new_id}"),
                RequeueOutcome::NotFound => anyhow::bail!("scheduled email {id} not found"),
                RequeueOutcome::NotFailed(status) => {
                    anyhow::bail!("scheduled email {id} is {status}; only failed can be requeued")
                }
            }
        }
        Command::Stats => {
            let c = emails.status_counts(Utc::now()).await?;
            println!(
                "pending={} (due={}) sent={} failed={}",
                c.pending, c.due, c.sent, c.failed
            );
        }
    }

    Ok(())
}

fn print_row(e: &ScheduledEmail) {
    println!(
        "{} {:<8} {:<28} {} {}#{} send_at={}{}",
        e.id,
        e.status,
        e.email_type,
        e.email,
        e.related_type,
        e.related_id,
        e.send_at.to_rfc3339(),
        e.error_message
            .as_deref()
            .map(|m| format!(" error={m:?}"))
            .unwrap_or_default()
    );
}
