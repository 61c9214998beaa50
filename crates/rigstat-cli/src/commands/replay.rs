//! `rigstat replay`: feed recorded telemetry frames through a rig.

use serde::{Deserialize, Serialize};

use rigstat_core::{DeviceLogger, LatencyTriple, Rig, TelemetryBatch, unix_now};

use super::{format_duration_secs, format_rate, truncate};

/// One recorded polling cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub batch: TelemetryBatch,
    /// Pool, remote and local round trips in ms.
    #[serde(default)]
    pub latency: [i32; 3],
    /// Receipt time of the batch; frames without one are stamped on replay.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

pub struct ReplayCommandConfig<'a> {
    pub frames_path: &'a str,
    pub config_path: Option<&'a str>,
    pub output_path: Option<&'a str>,
    pub device: Option<i32>,
}

/// Run the replay command.
pub fn run(cfg: ReplayCommandConfig<'_>) {
    let config = super::load_config(cfg.config_path);

    let contents = match std::fs::read_to_string(cfg.frames_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", cfg.frames_path);
            std::process::exit(1);
        }
    };

    let frames = parse_frames(&contents);
    if frames.is_empty() {
        eprintln!("No telemetry frames in {}", cfg.frames_path);
        std::process::exit(1);
    }

    let rig = replay(Rig::new(config), &frames);

    let devices: Vec<&DeviceLogger> = match cfg.device {
        Some(bus) => match rig.device(bus) {
            Some(device) => vec![device],
            None => {
                eprintln!("No device on bus {bus} in {}", cfg.frames_path);
                std::process::exit(1);
            }
        },
        None => rig.devices().iter().collect(),
    };

    println!("Replayed {} frame(s) from {}\n", frames.len(), cfg.frames_path);
    print_summary(&devices);

    if let Some(path) = cfg.output_path {
        let json = match serde_json::to_string_pretty(&rig) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Failed to serialize rig state: {e}");
                std::process::exit(1);
            }
        };
        match std::fs::write(path, json) {
            Ok(()) => println!("\nRig state written to {path}"),
            Err(e) => {
                eprintln!("\nFailed to write {path}: {e}");
                std::process::exit(1);
            }
        }
    }
}

/// Parse newline-delimited frames, skipping blank and malformed lines.
pub fn parse_frames(contents: &str) -> Vec<ReplayFrame> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| match serde_json::from_str::<ReplayFrame>(line) {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::warn!("skipping malformed frame on line {}: {e}", n + 1);
                None
            }
        })
        .collect()
}

/// Feed every frame through `rig`, discovering devices as they appear.
pub fn replay(mut rig: Rig, frames: &[ReplayFrame]) -> Rig {
    for frame in frames {
        rig.sync_devices(&frame.batch);
        let now = frame.timestamp.unwrap_or_else(unix_now);
        rig.update_at(&frame.batch, LatencyTriple::from(frame.latency), now);
    }
    rig
}

fn print_summary(devices: &[&DeviceLogger]) {
    println!(
        "{:<8} {:>4} {:<20} {:<14} {:>8} {:>8} {:>14} {:>14} {:>9}",
        "Device", "Bus", "Card", "Algorithm", "Sessions", "Samples", "Median", "Counted", "Running"
    );
    println!("{}", "-".repeat(107));

    for device in devices {
        let identity = device.identity();
        let Some(session) = device.current_session() else {
            println!(
                "{:<8} {:>4} {:<20} {:<14} {:>8}",
                identity.to_string(),
                identity.bus,
                truncate(&identity.name, 20),
                "-",
                device.sessions().len()
            );
            continue;
        };

        let (median, counted, running) = match session.latest_snapshot() {
            Some(snap) => (
                format_rate(snap.median()),
                format_rate(snap.counted_hash_rate),
                format_duration_secs(snap.running_time),
            ),
            None => ("-".to_string(), "-".to_string(), "-".to_string()),
        };

        println!(
            "{:<8} {:>4} {:<20} {:<14} {:>8} {:>8} {:>14} {:>14} {:>9}",
            identity.to_string(),
            identity.bus,
            truncate(&identity.name, 20),
            truncate(session.algorithm(), 14),
            device.sessions().len(),
            session.hash_samples().len(),
            median,
            counted,
            running,
        );
    }

    println!("\n{} device(s)", devices.len());
}
