//! `rigstat inspect`: show the sessions stored in a rig state file.

use std::path::Path;

use rigstat_core::{BenchmarkSession, DeviationAggregate, DeviationBasis, Rig, StatSnapshot};

use super::{format_duration_secs, format_rate};

/// Run the inspect command.
pub fn run(state_path: &str, show_percentiles: bool) {
    let rig = match read_rig(Path::new(state_path)) {
        Ok(rig) => rig,
        Err(e) => {
            eprintln!("Failed to load rig state {state_path}: {e}");
            std::process::exit(1);
        }
    };

    if rig.devices().is_empty() {
        println!("No devices in {state_path}");
        return;
    }

    for device in rig.devices() {
        let identity = device.identity();
        println!(
            "{} on bus {}: {} (SM {}), {} session(s)",
            identity,
            identity.bus,
            identity.name,
            identity.compute_capability,
            device.sessions().len()
        );
        for (index, session) in device.sessions().iter().enumerate() {
            let marker = if device.active_index() == Some(index) {
                "*"
            } else {
                " "
            };
            show_session(marker, session, show_percentiles);
        }
        println!();
    }
}

/// Read a rig state written by `rigstat replay --output`.
pub fn read_rig(path: &Path) -> std::io::Result<Rig> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(std::io::Error::other)
}

fn show_session(marker: &str, session: &BenchmarkSession, show_percentiles: bool) {
    let setup = session.configuration();
    println!("{marker} Session {}", session.id());
    println!("    Algorithm:    {}", session.algorithm());
    println!("    Miner:        {setup}");
    println!("    Pool:         {}", setup.pool_url);
    println!(
        "    Device:       intensity {}, {} / BIOS {}",
        setup.intensity, setup.performance_state, setup.bios_version
    );
    println!(
        "    Host:         driver {}, {}",
        setup.driver_version, setup.operating_system
    );
    println!(
        "    Window:       {} .. {} (created {})",
        session.started_at(),
        session.updated_at(),
        session.created_at()
    );
    println!(
        "    Samples:      {} hash, {} sensor, {} snapshot(s)",
        session.hash_samples().len(),
        session.sensor_log().len(),
        session.snapshots().len()
    );

    let marks: Vec<String> = session
        .availability()
        .marks()
        .iter()
        .map(|m| {
            format!(
                "{}{}@{}",
                if m.available { "up" } else { "down" },
                if m.closed_by_request { "*" } else { "" },
                m.timestamp
            )
        })
        .collect();
    println!("    Availability: {}", marks.join(" "));

    if let Some(snap) = session.latest_snapshot() {
        show_snapshot(snap, show_percentiles);
    }
    if let Some(histogram) = session.histogram() {
        let modes: Vec<String> = histogram.modes.iter().map(|m| format_rate(*m)).collect();
        println!(
            "    Histogram:    {} bin(s), {} outlier(s), mode {} (weight {})",
            histogram.bins.len(),
            histogram.outliers.len(),
            modes.join(", "),
            histogram.mode_weight
        );
    }
}

fn show_snapshot(snap: &StatSnapshot, show_percentiles: bool) {
    println!(
        "    Running:      {} ({} hashes over {} entries)",
        format_duration_secs(snap.running_time),
        snap.total_hash_count,
        snap.total_entries
    );
    println!(
        "    Rates:        median {}  harmonic {}  counted {}",
        format_rate(snap.median()),
        format_rate(snap.harmonic_mean),
        format_rate(snap.counted_hash_rate)
    );
    println!(
        "    Moving:       {} / {} / {}",
        format_rate(snap.moving_spread_bottom),
        format_rate(snap.moving_median),
        format_rate(snap.moving_spread_top)
    );
    println!(
        "    Spread:       sd {:.3}  MAD {:.3}  CV {:.2}%  QCD {:.2}%",
        snap.standard_deviation,
        snap.absolute_deviation(DeviationBasis::Median, DeviationAggregate::Median),
        snap.variation_coefficient,
        snap.quartile_coefficient
    );
    println!(
        "    Shape:        skew {:.3}  kurtosis {:.3}  np-skew {:.3}",
        snap.skewness, snap.kurtosis, snap.non_parametric_skew
    );
    println!(
        "    Sensors:      {:.1} C avg, {:.0} ms pool latency, {} found",
        snap.average_temperature, snap.average_pool_latency, snap.found
    );

    if show_percentiles {
        println!("    Percentiles:");
        for (level, value) in snap.percentiles.iter() {
            println!("      {:>6}  {}", level.label(), format_rate(value));
        }
    }
}
