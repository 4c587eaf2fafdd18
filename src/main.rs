//! dominion-ops -- an espionage operation resolver speaking a line protocol.
//!
//! This binary reads commands from stdin and writes responses to stdout.
//! Diagnostics, including rejected commands, go to stderr; `RUST_LOG`
//! overrides the default `warn` filter.

use std::io::{self, BufRead, Write};

use dominion_ops::engine::Engine;
use dominion_ops::protocol::parser::parse_command;

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

/// Runs the main protocol loop, reading commands from stdin
/// and writing responses to stdout.
fn main() {
    init_logging();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut engine = Engine::new();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let cmd = match parse_command(&line) {
            Some(c) => c,
            None => continue,
        };

        match engine.handle_command(cmd, &mut out) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                eprintln!("output error: {}", e);
                break;
            }
        }
    }

    let _ = out.flush();
}
