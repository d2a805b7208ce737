//! Scripted host for the Outbreak controller.
//!
//! Reads a JSON-lines script of `{"wait_ms": .., "event": {..}}` entries,
//! advances the clock frame by frame between them, plays each event against
//! an in-memory host and prints the final controller snapshot.
//!
//! ```text
//! outbreak-sim <script.jsonl> [config.json]
//! RUST_LOG=outbreak=debug outbreak-sim scripts/infection.jsonl scripts/quick.json
//! ```

use std::error::Error;
use std::time::Duration;
use std::{env, fs, process};

use outbreak::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MAX_CLIENTS: u32 = 32;
const MAX_ENTITIES: u32 = 2048;
const SEED: u64 = 0x5eed;

type Sim = Controller<SimHost, SimPresentation>;

#[derive(Debug, Deserialize)]
struct ScriptLine {
    /// Host time that passes before `event` is delivered.
    #[serde(default)]
    wait_ms: u64,
    event: HostEvent,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let Some(script_path) = args.next() else {
        eprintln!("usage: outbreak-sim <script.jsonl> [config.json]");
        process::exit(2);
    };
    let config = match args.next() {
        Some(path) => ModeConfig::from_json(&fs::read_to_string(path)?)?,
        None => ModeConfig::default(),
    };
    let script = fs::read_to_string(&script_path)?;

    let host = SimHost::new(MAX_CLIENTS, MAX_ENTITIES);
    let mut controller = Controller::with_seed(config, host, SimPresentation::default(), SEED);
    let codec = JsonCodec;

    let mut played = 0;
    for (n, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry: ScriptLine = codec
            .decode(line.as_bytes())
            .map_err(|e| format!("{script_path}:{}: {e}", n + 1))?;
        run_frames(&mut controller, Duration::from_millis(entry.wait_ms));
        play(&mut controller, entry.event);
        played += 1;
    }
    info!(played, "script finished");

    println!("{}", serde_json::to_string_pretty(&controller.snapshot())?);
    Ok(())
}

/// Moves time forward one frame at a time, the way the game server would.
fn run_frames(controller: &mut Sim, mut remaining: Duration) {
    let frame = Duration::from_secs(1) / controller.config().frame_rate_hz.max(1);
    while !remaining.is_zero() {
        let step = remaining.min(frame);
        controller.advance(step);
        remaining -= step;
        feed_spawns(controller);
    }
}

/// Delivers one event, keeping the host's own view of clients in step.
fn play(controller: &mut Sim, event: HostEvent) {
    let leaving = match event {
        HostEvent::Disconnect { user } => controller.registry().resolve(user),
        _ => None,
    };
    match event {
        HostEvent::Connect { slot, bot, .. } => controller.engine_mut().add_client(slot, bot),
        HostEvent::Spawn { slot } => controller.engine_mut().set_alive(slot, true),
        HostEvent::Death { victim, .. } => controller.engine_mut().set_alive(victim, false),
        _ => {}
    }

    let kind = event.kind();
    if let Err(e) = controller.dispatch(event) {
        warn!(kind, error = %e, "event rejected");
    }
    if let Some(slot) = leaving {
        controller.engine_mut().remove_client(slot);
    }
    feed_spawns(controller);
}

/// Revivals requested through the engine come back as spawn events.
fn feed_spawns(controller: &mut Sim) {
    for slot in controller.engine_mut().drain_spawns() {
        if let Err(e) = controller.dispatch(HostEvent::Spawn { slot }) {
            warn!(%slot, error = %e, "spawn rejected");
        }
    }
}
