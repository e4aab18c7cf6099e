//! Turnstile command-line client.
//!
//! Usage:
//!     turnstile scan --event evt-1 --camera-feed /tmp/scans
//!     turnstile stats evt-1
//!     turnstile admin users --role host --page 2

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turnstile_api::types::{TransactionQuery, UserQuery};
use turnstile_api::{Health, Role, Session};
use turnstile_checkin::metrics::register_checkin_metrics;
use turnstile_checkin::presenter::{
    render_events, render_history, render_modal, render_platform_stats, render_stats,
    render_status, render_transactions, render_user_details, render_users,
};
use turnstile_checkin::{
    CheckinAction, CheckinController, CheckinEnvironment, Config, ConsoleNotifier, LineDecoder,
};
use turnstile_core::environment::SystemClock;
use turnstile_runtime::metrics::MetricsServer;

#[derive(Parser, Debug)]
#[command(name = "turnstile", version, about = "Event check-in and admin client")]
struct Cli {
    /// API base URL (overrides TURNSTILE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token (overrides TURNSTILE_API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive check-in at the door
    Scan {
        /// Event to check attendees into
        #[arg(long)]
        event: Option<String>,

        /// File or FIFO with decoded QR payloads, one per line
        #[arg(long)]
        camera_feed: Option<PathBuf>,
    },

    /// List your events
    Events,

    /// Attendee stats of one event
    Stats {
        /// Event id
        event_id: String,
    },

    /// Platform administration
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },

    /// Request a password reset link
    PasswordReset {
        /// Account email
        #[arg(long, env = "TURNSTILE_USER_EMAIL")]
        email: Option<String>,
    },

    /// Check that the API answers
    Health,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Platform-wide counters
    Stats,

    /// List users
    Users {
        /// Match name, username or email
        #[arg(long)]
        search: Option<String>,

        /// Only this role ("all" for every role)
        #[arg(long)]
        role: Option<String>,

        /// Page number, from 1
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// One user with tickets and events
    User {
        /// User id
        id: String,
    },

    /// Change a user's role
    SetRole {
        /// User id
        id: String,

        /// guest, user, host, superhost or admin
        role: Role,
    },

    /// List payment transactions
    Transactions {
        /// Only this status ("all" for every status)
        #[arg(long)]
        status: Option<String>,

        /// Page number, from 1
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turnstile=info,turnstile_checkin=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(url) = cli.api_url {
        config.api.url = url;
    }
    if let Some(token) = cli.token {
        config.api.token = Some(token);
    }
    tracing::debug!(api_url = %config.api.url, "Configuration loaded");

    let _metrics = start_metrics(&config)?;
    let session = config.session()?;

    match cli.command {
        Command::Scan { event, camera_feed } => {
            let feed = camera_feed.or_else(|| config.scanner.camera_feed.clone());
            run_scan(&config, &session, event, feed).await?;
        },
        Command::Events => {
            session.require_host()?;
            let events = session.client(config.api_timeout())?.fetch_events().await?;
            println!("{}", render_events(&events, None));
        },
        Command::Stats { event_id } => {
            session.require_host()?;
            let client = session.client(config.api_timeout())?;
            let stats = client.fetch_event_stats(&event_id).await?;
            println!("{}", render_stats(&stats));
        },
        Command::Admin { command } => run_admin(&config, &session, command).await?,
        Command::PasswordReset { email } => {
            let email = email
                .or_else(|| config.user.email.clone())
                .ok_or("No email given, pass --email")?;
            let client = session.client(config.api_timeout())?;
            println!("{}", client.forgot_password(&email).await?);
        },
        Command::Health => {
            let client = session.client(config.api_timeout())?;
            match client.health().await? {
                Health::Reachable => println!("API reachable at {}", client.base_url()),
                Health::Unhealthy(status) => println!("API unhealthy (status {status})"),
            }
        },
    }

    Ok(())
}

fn start_metrics(config: &Config) -> Result<Option<MetricsServer>, Box<dyn Error>> {
    let Some(addr) = config.metrics_addr()? else {
        return Ok(None);
    };
    let mut server = MetricsServer::new(addr);
    server.start()?;
    register_checkin_metrics();
    tracing::info!(%addr, "Metrics exporter listening");
    Ok(Some(server))
}

async fn run_admin(
    config: &Config,
    session: &Session,
    command: AdminCommand,
) -> Result<(), Box<dyn Error>> {
    session.require_admin()?;
    let client = session.client(config.api_timeout())?;

    match command {
        AdminCommand::Stats => {
            println!("{}", render_platform_stats(&client.platform_stats().await?));
        },
        AdminCommand::Users { search, role, page } => {
            let query = UserQuery {
                page,
                search,
                role,
                ..UserQuery::default()
            };
            println!("{}", render_users(&client.list_users(&query).await?));
        },
        AdminCommand::User { id } => {
            println!("{}", render_user_details(&client.user_details(&id).await?));
        },
        AdminCommand::SetRole { id, role } => {
            client.set_user_role(&id, role).await?;
            println!("{id} is now {role}");
        },
        AdminCommand::Transactions { status, page } => {
            let query = TransactionQuery {
                page,
                status,
                ..TransactionQuery::default()
            };
            println!("{}", render_transactions(&client.list_transactions(&query).await?));
        },
    }
    Ok(())
}

// ============================================================================
// Interactive scan session
// ============================================================================

const SCAN_HELP: &str = "Type a ticket code and press enter to check it in.\n\
Commands: :events  :select <n|id>  :camera  :stats  :history  :close  :quit";

async fn run_scan(
    config: &Config,
    session: &Session,
    event: Option<String>,
    feed: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let user = session.require_host()?;
    tracing::info!(user = %user.name, role = %user.role, "Starting check-in session");

    let env = CheckinEnvironment::new(
        Arc::new(SystemClock),
        Arc::new(session.client(config.api_timeout())?),
        Arc::new(LineDecoder::new(feed)),
        Arc::new(ConsoleNotifier),
    )
    .with_timings(config.timings());
    let controller = CheckinController::new(env);

    let watcher = tokio::spawn(watch_results(controller.clone(), controller.subscribe()));

    controller.start().await?;
    if let Some(event) = event {
        controller.select_event(event).await?;
    }
    println!("{SCAN_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(&controller, line.trim()).await? {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    watcher.abort();
    controller.shutdown(config.shutdown_timeout()).await?;
    Ok(())
}

/// Returns `false` when the session should end
async fn handle_line(controller: &CheckinController, line: &str) -> Result<bool, Box<dyn Error>> {
    let (command, argument) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(command, rest)| (command, rest.trim()));

    match command {
        "" => {},
        ":quit" | ":q" => return Ok(false),
        ":help" => println!("{SCAN_HELP}"),
        ":events" => {
            let state = controller.snapshot().await;
            println!("{}", render_events(&state.events, state.selected_event.as_deref()));
        },
        ":select" => {
            let events = controller.state(|s| s.events.clone()).await;
            let event_id = argument
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|index| events.get(index))
                .map_or_else(|| argument.to_string(), |event| event.id.clone());
            if event_id.is_empty() {
                println!("Usage: :select <n|id>");
            } else {
                controller.select_event(event_id).await?;
            }
        },
        ":camera" => {
            controller.toggle_camera().await?;
            println!("{}", controller.state(render_status).await);
        },
        ":stats" => {
            controller.refresh_stats().await?;
            println!("{}", controller.state(|s| render_stats(&s.stats)).await);
        },
        ":history" => println!("{}", controller.state(|s| render_history(&s.history)).await),
        ":close" => {
            controller.dismiss_modal().await?;
        },
        other if other.starts_with(':') => println!("Unknown command {other}, try :help"),
        _ => {
            controller.submit_manual(line).await?;
        },
    }
    Ok(true)
}

/// Prints what the workflow's effects bring back
async fn watch_results(
    controller: CheckinController,
    mut actions: broadcast::Receiver<CheckinAction>,
) {
    loop {
        let action = match actions.recv().await {
            Ok(action) => action,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Result printer lagged");
                continue;
            },
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let state = controller.snapshot().await;
        match action {
            CheckinAction::EventsLoaded { .. } => {
                println!("{}", render_events(&state.events, state.selected_event.as_deref()));
            },
            CheckinAction::StatsLoaded { .. } => println!("{}", render_stats(&state.stats)),
            CheckinAction::CheckinCompleted { .. } | CheckinAction::CheckinFailed { .. } => {
                if let Some(modal) = &state.modal {
                    println!("{}", render_modal(modal));
                }
            },
            CheckinAction::CameraStarted { .. }
            | CheckinAction::CameraStopped { .. }
            | CheckinAction::CameraFailed { .. }
            | CheckinAction::CameraAvailability { .. } => println!("{}", render_status(&state)),
            _ => {},
        }
    }
}
