//! Watch a live room and print its chat.
//!
//! Demonstrates:
//! - Building a session with the default HTTP resolver
//! - Registering handlers for typed events
//! - Running the read loop with a Ctrl+C stop handle
//!
//! Usage:
//!   cargo run --example watch_room -- --room 25348832
//!   cargo run --example watch_room -- --room 25348832 --count 50
//!   cargo run --example watch_room -- --room 25348832 --debug

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use anyhow::{Context, bail};
use blive::{EventType, ParsedEvent, Session, TokioScheduler};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    room_id: u64,
    count: i32,
    debug: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
        };

        let Some(room) = value_of("--room") else {
            bail!("missing --room <id>");
        };

        Ok(Self {
            room_id: room.parse().context("--room must be a number")?,
            count: match value_of("--count") {
                Some(count) => count.parse().context("--count must be a number")?,
                None => -1,
            },
            debug: args.iter().any(|a| a == "--debug"),
        })
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug { "blive=debug" } else { "blive=info" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();
}

fn register_handlers(session: &Session) {
    session.set_handler(EventType::DanmuMsg, |_, event| {
        if let ParsedEvent::Danmaku { uname, text, .. } = event.parse() {
            println!("[chat] {uname}: {text}");
        }
    });

    session.set_handler(EventType::SendGift, |_, event| {
        if let ParsedEvent::Gift {
            uname,
            gift_name,
            num,
            ..
        } = event.parse()
        {
            println!("[gift] {uname} x{num} {gift_name}");
        }
    });

    session.set_handler(EventType::InteractWord, |_, event| {
        if let ParsedEvent::Interact { uname, msg_type, .. } = event.parse() {
            let action = match msg_type {
                1 => "entered",
                2 => "followed",
                3 => "shared",
                _ => "interacted",
            };
            println!("[room] {uname} {action}");
        }
    });

    session.set_handler(EventType::PopValueUpdate, |session, _| {
        println!("[info] popularity {}", session.popularity());
    });
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            eprintln!("usage: watch_room --room <id> [--count <n>] [--debug]");
            std::process::exit(2);
        }
    };
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== Watching room {} ===\n", args.room_id);

    let session = Arc::new(Session::builder().room_id(args.room_id).build()?);
    register_handlers(&session);

    session
        .connect(TokioScheduler::shared())
        .await
        .context("connect failed")?;
    println!("[1] Connected to {:?}\n", session.peer_addr());

    let stop = session.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        stop.stop();
    });

    let result = session.run(args.count).await;
    session.close().await;
    result.context("read loop failed")?;

    println!("\n[2] Done");
    Ok(())
}
