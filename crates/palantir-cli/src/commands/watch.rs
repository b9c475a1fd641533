use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use palantir_core::{CharacterExtractor, CharacterSnapshot, Error};
use tracing::{info, warn};

use crate::shutdown::ShutdownSignal;

use super::snapshot::print_snapshot;

/// Delay between attach attempts while the client is not running.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub fn run(game_path: &Path, interval: u64, json: bool) -> Result<()> {
    let signal = Arc::new(ShutdownSignal::new());
    {
        let signal = Arc::clone(&signal);
        ctrlc::set_handler(move || signal.notify()).context("failed to install ctrl-c handler")?;
    }

    let mut extractor =
        CharacterExtractor::new(game_path).context("failed to open the game archives")?;
    let mut last: Option<CharacterSnapshot> = None;

    info!("Watching for character changes every {}s", interval);
    while !signal.is_shutdown() {
        if !extractor.is_attached() {
            match extractor.attach() {
                Ok(()) => info!("Attached to the game client"),
                Err(e) => {
                    info!("Waiting for the game client: {}", e);
                    if signal.wait(RECONNECT_DELAY) {
                        break;
                    }
                    continue;
                }
            }
        }

        match extractor.snapshot() {
            Ok(snapshot) => {
                let changed = last
                    .as_ref()
                    .is_none_or(|previous| snapshot_changed(previous, &snapshot));
                if changed {
                    if json {
                        println!("{}", serde_json::to_string(&snapshot)?);
                    } else {
                        println!("--- {} ---", snapshot.captured_at.to_rfc3339());
                        print_snapshot(&snapshot);
                    }
                }
                last = Some(snapshot);
            }
            Err(Error::PlayerNotFound) => {
                info!("No player character in the world yet");
            }
            Err(e) => {
                warn!("Snapshot failed: {}; reattaching", e);
                extractor.detach();
                last = None;
            }
        }

        if signal.wait(Duration::from_secs(interval)) {
            break;
        }
    }

    info!("Watch loop stopped");
    Ok(())
}

/// Compare two snapshots, ignoring the capture timestamp.
fn snapshot_changed(previous: &CharacterSnapshot, current: &CharacterSnapshot) -> bool {
    let strip = |snapshot: &CharacterSnapshot| {
        let mut value = serde_json::to_value(snapshot).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.remove("captured_at");
        }
        value
    };
    strip(previous) != strip(current)
}
