//! # Lodge CLI
//!
//! Guest-side client for the Lodge verification service. Requests a code for
//! an email address and runs an interactive verification prompt that locks
//! for a while after too many wrong codes.
//!
//! ## Usage
//! ```bash
//! # Email a fresh code
//! lodge-cli send --email guest@example.com
//!
//! # Request a code and prompt for it
//! lodge-cli verify --email guest@example.com --resend
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use lodge_common::constants::{
    DEFAULT_SERVER_URL, LOCKOUT_DURATION_SECS, LOCKOUT_TICK_SECS, MAX_FAILED_ATTEMPTS,
    MAX_LOCKOUT_SECS,
};
use lodge_common::{AttemptLimiter, LimiterConfig, LimiterState, SystemClock};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod client;
mod countdown;
mod session;

use client::LodgeClient;
use session::{SubmitResult, VerificationSession};

/// Lodge verification client
#[derive(Parser, Debug)]
#[command(name = "lodge-cli")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the Lodge service
    #[arg(short, long, default_value = DEFAULT_SERVER_URL, env = "LODGE_SERVER")]
    server: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the service to email a verification code
    Send {
        #[arg(short, long)]
        email: String,
    },
    /// Prompt for codes until one is accepted
    Verify {
        #[arg(short, long)]
        email: String,

        /// Request a fresh code before prompting
        #[arg(long)]
        resend: bool,

        /// Wrong codes tolerated before the prompt locks
        #[arg(long, default_value_t = MAX_FAILED_ATTEMPTS)]
        max_failures: u32,

        /// Lockout length in seconds
        #[arg(
            long,
            default_value_t = LOCKOUT_DURATION_SECS,
            value_parser = clap::value_parser!(u64).range(1..=MAX_LOCKOUT_SECS)
        )]
        lockout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    let client = LodgeClient::new(&args.server, Duration::from_secs(args.timeout))?;

    match args.command {
        Command::Send { email } => send(&client, &email).await,
        Command::Verify {
            email,
            resend,
            max_failures,
            lockout_secs,
        } => {
            if resend {
                send(&client, &email).await?;
            }
            let limiter = AttemptLimiter::new(
                LimiterConfig::from_secs(max_failures, lockout_secs)?,
                Arc::new(SystemClock),
            );
            let session = VerificationSession::new(
                client,
                email,
                limiter,
                Duration::from_secs(LOCKOUT_TICK_SECS),
            );
            prompt(session).await
        }
    }
}

async fn send(client: &LodgeClient, email: &str) -> Result<()> {
    let response = client.request_code(email).await?;
    println!(
        "📧 Code sent to {} (valid for {}s)",
        email, response.expires_in_secs
    );
    Ok(())
}

async fn prompt(mut session: VerificationSession<LodgeClient>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("Enter code: ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            session.end();
            bail!("No code entered");
        };

        let code = line.trim();
        if code.is_empty() {
            continue;
        }

        match session.submit(code).await? {
            SubmitResult::Accepted => {
                println!("✅ Email verified");
                session.end();
                return Ok(());
            }
            SubmitResult::Rejected { attempts_left } => {
                println!("❌ Invalid or expired code ({attempts_left} attempts before lockout)");
            }
            SubmitResult::LockedOut { remaining_secs } => {
                println!("🔒 Too many attempts, locked for {remaining_secs}s");
                session
                    .wait_for_unlock(|view| {
                        if view.state == LimiterState::Locked {
                            print!("\r⏳ Try again in {:>3}s", view.remaining_secs);
                            let _ = std::io::stdout().flush();
                        }
                    })
                    .await;
                if session.state() == LimiterState::Active {
                    println!("\r🔓 You can try again      ");
                }
            }
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}
