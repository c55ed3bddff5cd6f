//! Rotostage — host runner.
//!
//! Hexagonal layout: the domain core is wired to concrete adapters here
//! and driven from a line-oriented console.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  LogEventSink    SettingsStore    MonotonicClock         │
//! │  (EventSink)     (StoragePort)    (timer pump clock)     │
//! │                                                          │
//! │  ──────────────── Port Trait Boundary ────────────       │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │          StageService (pure logic)             │      │
//! │  │  Registry · Rotor · FlushTimer                 │      │
//! │  └────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `rotostage [stages.json] [settings.json]`
//!
//! Console commands: the management surface (`status`, `get <name>`,
//! `set <name> <angle>`) plus `feed <name> <code> <value>` to push a
//! raw axis event through a stage, and `quit`.

#![deny(unused_must_use)]

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};

use rotostage::adapters::log_sink::LogEventSink;
use rotostage::adapters::settings::SettingsStore;
use rotostage::adapters::time::MonotonicClock;
use rotostage::app::service::StageService;
use rotostage::config::StageConfig;
use rotostage::event::AxisEvent;
use rotostage::shell;

fn load_configs(path: Option<&PathBuf>) -> Result<Vec<StageConfig>> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("reading stage config {}", p.display()))?;
            let configs: Vec<StageConfig> = serde_json::from_str(&text)
                .with_context(|| format!("parsing stage config {}", p.display()))?;
            Ok(configs)
        }
        None => {
            info!("no stage config given, using a single default stage");
            Ok(vec![StageConfig::default()])
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("rotostage v{}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let settings_path = args
        .next()
        .map_or_else(|| PathBuf::from("rotostage_settings.json"), PathBuf::from);

    // ── Wire the domain core to its adapters ──────────────────
    let configs = load_configs(config_path.as_ref())?;
    let service = StageService::new(configs).context("registering stages")?;

    let mut storage = SettingsStore::load_from_file(&settings_path)
        .with_context(|| format!("loading settings {}", settings_path.display()))?;
    service.replay_persisted(&storage);

    let clock = MonotonicClock::new();
    let mut sink = LogEventSink::new();

    // ── Console loop ──────────────────────────────────────────
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut line = String::new();
    loop {
        // Fire any flush whose idle window has elapsed before reading
        // the next command.
        service.poll_timeouts(clock.now_ms(), &mut sink);

        print!("rotostage> ");
        stdout.flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let args: Vec<&str> = line.split_whitespace().collect();
        if args.is_empty() {
            continue;
        }

        match args.as_slice() {
            ["quit"] | ["exit"] => break,
            ["feed", name, code, value] => {
                feed_event(&service, &clock, &mut sink, name, code, value);
            }
            other => {
                let (reply, rc) = shell::run_command(&service, &mut storage, other);
                println!("{reply}");
                if rc != shell::EXIT_OK {
                    println!("(exit code {rc})");
                }
            }
        }
    }

    storage
        .flush_to_file(&settings_path)
        .with_context(|| format!("writing settings {}", settings_path.display()))?;
    info!("rotostage shut down");
    Ok(())
}

fn feed_event(
    service: &StageService,
    clock: &MonotonicClock,
    sink: &mut LogEventSink,
    name: &str,
    code: &str,
    value: &str,
) {
    let Some(id) = service.lookup(name) else {
        warn!("feed: no stage named '{name}'");
        return;
    };
    let (Ok(code), Ok(value)) = (code.parse::<u16>(), value.parse::<i32>()) else {
        warn!("feed: code and value must be integers");
        return;
    };

    let mut event = AxisEvent::relative(code, value, true);
    service.handle_event(id, &mut event, clock.now_ms(), sink);
    if event.value != 0 {
        info!("PASS | code={} value={} (bypassed)", event.code, event.value);
    }
}
