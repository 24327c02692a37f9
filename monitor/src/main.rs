//! `seat-monitor` command: polls tracked courses and manages subscriptions.
//!
//! Settings come from `SEAT_MONITOR_*` environment variables (see
//! [`MonitorSettings`]); subcommands choose what to run. Results are written
//! to stdout as JSON, logs go to the JSON tracing subscriber.

use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use serde::Serialize;
use serde_json::json;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use seat_monitor::config::{MonitorSettings, SourceMode};
use seat_monitor::domain::ports::{AvailabilitySource, MonitorStore};
use seat_monitor::domain::{
    CourseId, LoopRuntime, SeatMonitor, SeatMonitorPorts, SharedSession, UserId,
};
use seat_monitor::outbound::notify::TracingNotifier;
use seat_monitor::outbound::store::JsonFileMonitorStore;
use seat_monitor::outbound::upstream::{
    DirectoryPayloadSource, HttpPayloadCapture, RefreshingPayloadSource, StoredPayloadSource,
};

/// `seat-monitor` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "seat-monitor",
    about = "Watch tracked course sections and notify subscribers when seats open",
    version
)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single scan cycle and print its summary.
    Once,
    /// Poll forever using the configured interval and jitter.
    Run,
    /// Check one subscription immediately, forcing a refresh.
    Check {
        /// Subscribing user.
        user_id: String,
        /// Course section (cart id).
        course_id: String,
    },
    /// Start tracking a course for a user.
    Track {
        /// Subscribing user.
        user_id: String,
        /// Course section (cart id).
        course_id: String,
        /// Address notified when the course opens.
        email: String,
    },
    /// Stop tracking a course for a user.
    Untrack {
        /// Subscribing user.
        user_id: String,
        /// Course section (cart id).
        course_id: String,
    },
    /// Print the stored shared session and its effective state.
    Session,
    /// Re-establish the shared session through the configured source.
    Login,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %error, "tracing init failed");
    }

    let args = CliArgs::parse();
    let settings = MonitorSettings::load_from_iter([OsString::from("seat-monitor")])
        .wrap_err("failed to load seat monitor settings")?;

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build seat monitor runtime")?;
    runtime.block_on(run(args.command, &settings))
}

async fn run(command: Command, settings: &MonitorSettings) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let state_path = settings.state_path();
    let file_store = Arc::new(
        JsonFileMonitorStore::open(&state_path, Arc::clone(&clock))
            .wrap_err_with(|| format!("failed to open state file {}", state_path.display()))?,
    );

    match command {
        Command::Track {
            user_id,
            course_id,
            email,
        } => {
            let user = UserId::parse(&user_id).wrap_err("invalid user id")?;
            let course = CourseId::new(&course_id).wrap_err("invalid course id")?;
            let tracked = file_store
                .track_course(user, course, email)
                .wrap_err("failed to track course")?;
            match tracked {
                Some(target) => emit(&json!({ "status": "tracking", "target": target })),
                None => emit(&json!({ "status": "already_tracking" })),
            }
        }
        Command::Untrack { user_id, course_id } => {
            let user = UserId::parse(&user_id).wrap_err("invalid user id")?;
            let course = CourseId::new(&course_id).wrap_err("invalid course id")?;
            let removed = file_store
                .untrack_course(user, &course)
                .wrap_err("failed to untrack course")?;
            emit(&json!({ "removed": removed }))
        }
        Command::Session => {
            let state = file_store.snapshot().wrap_err("failed to read state")?;
            let effective =
                SharedSession::effective_state_of(state.shared_session.as_ref(), clock.utc());
            emit(&json!({
                "effective_state": effective,
                "session": state.shared_session,
            }))
        }
        Command::Once => {
            let monitor = build_monitor(settings, file_store, clock)?;
            let summary = monitor
                .run_scan_cycle()
                .await
                .wrap_err("scan cycle failed")?;
            emit(&summary)
        }
        Command::Run => {
            let monitor = build_monitor(settings, file_store, clock)?;
            monitor
                .run_forever(&settings.loop_schedule(), &LoopRuntime::default())
                .await;
            Ok(())
        }
        Command::Check { user_id, course_id } => {
            let user = UserId::parse(&user_id).wrap_err("invalid user id")?;
            let course = CourseId::new(&course_id).wrap_err("invalid course id")?;
            let monitor = build_monitor(settings, file_store, clock)?;
            let outcome = monitor
                .run_immediate_check(user, &course)
                .await
                .wrap_err("immediate check failed")?;
            emit(&outcome)
        }
        Command::Login => {
            let monitor = build_monitor(settings, file_store, clock)?;
            let outcome = monitor.restore_session().await;
            emit(&outcome)
        }
    }
}

fn build_monitor(
    settings: &MonitorSettings,
    file_store: Arc<JsonFileMonitorStore>,
    clock: Arc<dyn Clock>,
) -> Result<SeatMonitor> {
    let store: Arc<dyn MonitorStore> = file_store;
    let mode = settings.source_mode()?;
    let source: Arc<dyn AvailabilitySource> = match mode {
        SourceMode::Stored => Arc::new(StoredPayloadSource::new(Arc::clone(&store))),
        SourceMode::Directory => {
            let dir = settings.payload_dir()?;
            Arc::new(
                DirectoryPayloadSource::open(&dir)
                    .wrap_err_with(|| format!("failed to open payload dir {}", dir.display()))?,
            )
        }
        SourceMode::Http => {
            let capture = HttpPayloadCapture::new(
                settings.upstream_url()?,
                settings.request_timeout(),
                settings.cookie_header.clone(),
                Arc::clone(&clock),
            )
            .wrap_err("failed to build upstream http client")?;
            Arc::new(RefreshingPayloadSource::new(
                capture,
                Arc::clone(&store),
                Arc::clone(&clock),
                settings.refresh_window(),
            ))
        }
    };
    info!(?mode, "availability source selected");

    let ports = SeatMonitorPorts::new(store, source, Arc::new(TracingNotifier));
    Ok(SeatMonitor::new(ports, clock, settings.monitor_config()))
}

fn emit(value: &impl Serialize) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).wrap_err("failed to encode result")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").wrap_err("failed to write result")
}
