//! bidcollab - command line client for the bidcollab document platform.
//!
//! Signs in against the backend, keeps the session between runs, and checks
//! client routes against the same navigation guard the web front end uses.

mod app;

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bidcollab_core::{Config, Navigation};

use app::App;

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and store the session
    Login {
        /// Username; prompts when omitted
        #[arg(short, long, env = "BIDCOLLAB_USERNAME")]
        username: Option<String>,

        /// Password; prompts without echo when omitted
        #[arg(long, env = "BIDCOLLAB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account and sign in with it
    Register {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Status,
    /// Resolve a client route, applying the login guard
    Navigate {
        /// Route path, e.g. `/projects/3` or `/exam-link/<token>`
        path: String,
    },
    /// Authenticated GET against the backend, printing the JSON body
    Get {
        /// Path below `/api`, e.g. `/projects`
        path: String,
    },
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Backend base URL (without `/api`)
    #[arg(long)]
    api_url: Option<String>,

    /// Keep the session in memory only; nothing is read from or written to disk
    #[arg(long)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` controls the level (default `warn`). Logs also go to a daily
/// file in the cache directory when it can be created; the returned guard
/// must live until exit so buffered lines are flushed.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = Config::log_dir().ok().and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("bidcollab")
            .filename_suffix("log")
            .build(dir)
            .ok()
    });

    let (file_layer, guard) = match file_appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let _log_guard = init_tracing();
    info!("bidcollab starting");

    let mut app = App::new(args.ephemeral, args.api_url)?;

    match args.command {
        Command::Login { username, password } => {
            let username = match username {
                Some(u) => u,
                None => prompt_username(app.config().last_username.as_deref())?,
            };
            let password = match password {
                Some(p) => p,
                None => prompt_password()?,
            };
            app.login(&username, &password).await?;
            println!("Logged in as {}", app.session().username());
            if !app.storage_is_persistent() {
                println!("(session will not survive a reboot)");
            }
        }
        Command::Register { username } => {
            let username = match username {
                Some(u) => u,
                None => prompt_username(None)?,
            };
            let password = prompt_password()?;
            let confirm = rpassword::prompt_password("Confirm password: ")?;
            if password != confirm {
                anyhow::bail!("Passwords do not match");
            }
            app.register(&username, &password).await?;
            println!("Registered and logged in as {}", app.session().username());
        }
        Command::Logout => {
            let was = app.session().username().to_string();
            let nav = app.logout()?;
            if was.is_empty() {
                println!("Not logged in");
            } else {
                println!("Logged out {}", was);
            }
            print_navigation(&nav);
        }
        Command::Status => {
            if app.is_authenticated() {
                let session = app.session();
                println!("Logged in as {} (token {})", session.username(), session.token_preview());
            } else {
                println!("Not logged in");
            }
            println!(
                "Backend: {}\nStorage: {}{}",
                app.config().api_base_url(),
                app.config().storage,
                if app.storage_is_persistent() { "" } else { " (not persistent)" }
            );
        }
        Command::Navigate { path } => {
            let nav = app.navigate(&path)?;
            print_navigation(&nav);
        }
        Command::Get { path } => {
            let value = app.get_json(&path).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    info!("bidcollab finished");
    Ok(())
}

fn print_navigation(nav: &Navigation) {
    if nav.redirected {
        println!("{} -> {} [{}]", nav.requested, nav.path, nav.route.title());
    } else {
        println!("{} [{}]", nav.path, nav.route.title());
    }
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read username")?;
    let input = input.trim();

    Ok(match last {
        Some(last) if input.is_empty() => last.to_string(),
        _ => input.to_string(),
    })
}

fn prompt_password() -> Result<String> {
    rpassword::prompt_password("Password: ").context("Failed to read password")
}
