//! # tripcount: daily trip countdown notifications
//!
//! Usage:
//!   tripcount                          # Run the daily scheduler (default)
//!   tripcount send-now                 # Send today's reminder immediately
//!   tripcount send-now --force         # ...even if today was already sent
//!   tripcount countdown                # Print the countdown and message
//!   tripcount check-config             # Validate config and list recipients
//!   tripcount --dry-run send-now       # Log messages instead of sending

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tripcount_core::TripConfig;
use tripcount_core::config::TransportKind;
use tripcount_scheduler::{
    DailyRunSummary, DailyScheduler, DailyTrigger, SchedulerConfig, countdown, run_daily_loop,
};

#[derive(Parser)]
#[command(
    name = "tripcount",
    version,
    about = "✈️ tripcount — daily trip countdown via SMS / WhatsApp"
)]
struct Cli {
    /// Config file (default: ~/.tripcount/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log messages instead of sending them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daily scheduler until Ctrl+C
    Run,
    /// Run today's notification now (same once-per-day rule)
    SendNow {
        /// Clear today's completion first
        #[arg(long)]
        force: bool,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the current countdown and rendered message
    Countdown,
    /// Validate configuration and list recipients
    CheckConfig,
}

fn load_config(cli: &Cli) -> Result<TripConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = PathBuf::from(shellexpand::tilde(path).to_string());
            TripConfig::load_from(&path)?
        }
        None => TripConfig::load()?,
    };
    config.apply_env()?;
    if cli.dry_run {
        config.transport.kind = TransportKind::Log;
    }
    Ok(config)
}

fn build_scheduler(config: &TripConfig) -> Result<DailyScheduler> {
    config.validate().context("Invalid configuration")?;
    let transport = tripcount_channels::build_transport(&config.transport)?;
    Ok(DailyScheduler::new(
        SchedulerConfig::from_config(config)?,
        config.trip_target()?,
        config.messages.clone(),
        config.recipients()?,
        transport,
    ))
}

fn print_summary(summary: &DailyRunSummary) {
    if summary.skipped {
        println!("⏭️  Skipped ({}): {:?}", summary.today_str(), summary.skip_reason);
        return;
    }
    println!(
        "📊 {}: {} sent, {} failed{}",
        summary.today_str(),
        summary.success_count,
        summary.failure_count,
        if summary.interrupted { " (interrupted)" } else { "" }
    );
    for attempt in &summary.attempts {
        match (&attempt.error, &attempt.message_id) {
            (Some(e), _) => println!("   ❌ {} — {e}", attempt.recipient),
            (None, id) => println!("   ✅ {} {}", attempt.recipient, id.as_deref().unwrap_or("")),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "tripcount=debug,tripcount_core=debug,tripcount_scheduler=debug,tripcount_channels=debug"
    } else {
        "tripcount=info,tripcount_core=info,tripcount_scheduler=info,tripcount_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = load_config(&cli)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            tracing::info!("🚀 Starting tripcount...");
            let scheduler = Arc::new(build_scheduler(&config)?);
            let target = scheduler.target();
            tracing::info!("📅 Trip date: {}", target.instant.with_timezone(&target.timezone));
            tracing::info!("🌎 Timezone: {}", scheduler.config().timezone);
            tracing::info!("📝 Description: {}", target.description);
            tracing::info!("👥 Recipients loaded: {}", scheduler.recipients().len());

            let trigger = DailyTrigger::new(
                scheduler.config().trigger_time,
                scheduler.config().timezone,
            );

            let cancel = scheduler.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("🛑 Ctrl+C received, finishing current send...");
                    cancel.cancel();
                }
            });

            tracing::info!("🤖 Running. Press Ctrl+C to stop...");
            run_daily_loop(scheduler, trigger).await;
        }
        Command::SendNow { force, json } => {
            let scheduler = build_scheduler(&config)?;
            if force {
                scheduler.reset();
            }
            let summary = scheduler.run_once(Utc::now()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
            if summary.is_run_failure() {
                anyhow::bail!("No messages sent successfully for {}", summary.today_str());
            }
        }
        Command::Countdown => {
            let target = config.trip_target()?;
            let now = Utc::now();
            let remaining = countdown::remaining(&target, now);
            let notice = countdown::notice(&remaining, &config.messages, &target);
            println!("✈️  {}", target.description);
            println!(
                "📅 {}",
                target.instant.with_timezone(&target.timezone).format("%Y-%m-%d %H:%M %Z")
            );
            if remaining.arrived {
                println!("⏱️  Trip has started");
            } else {
                println!("⏱️  {} days, {} hours", remaining.days, remaining.hours);
            }
            println!("\n{}", notice.body);
        }
        Command::CheckConfig => {
            config.validate().context("Invalid configuration")?;
            println!("✅ Configuration OK");
            println!("   Trip:      {} ({})", config.trip.date, config.trip.timezone);
            println!("   Schedule:  {} {}", config.schedule.time, config.schedule.timezone);
            println!(
                "   Transport: {}",
                serde_json::to_value(config.transport.kind)?.as_str().unwrap_or("?")
            );
            let recipients = config.recipients()?;
            println!("   Recipients ({}):", recipients.len());
            for r in &recipients {
                println!("     • {r}");
            }
        }
    }

    Ok(())
}
