pub mod inspect;
pub mod replay;

use rigstat_core::EngineConfig;

/// Load the engine configuration, or the defaults when no path is given.
/// Exits the process when the file cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> EngineConfig {
    let Some(path) = path else {
        return EngineConfig::default();
    };
    match EngineConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config {path}: {e}");
            std::process::exit(1);
        }
    }
}

/// Render a kH/s rate with a readable unit.
pub fn format_rate(khs: f64) -> String {
    if khs >= 1_000_000.0 {
        format!("{:.2} GH/s", khs / 1_000_000.0)
    } else if khs >= 1000.0 {
        format!("{:.2} MH/s", khs / 1000.0)
    } else {
        format!("{khs:.2} kH/s")
    }
}

/// Render a duration in seconds.
pub fn format_duration_secs(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{:.1}m", secs as f64 / 60.0)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // format helpers
    // -----------------------------------------------------------------------

    #[test]
    fn test_format_rate_units() {
        assert_eq!(format_rate(950.0), "950.00 kH/s");
        assert_eq!(format_rate(2500.5), "2.50 MH/s");
        assert_eq!(format_rate(1_250_000.0), "1.25 GH/s");
        assert_eq!(format_rate(0.0), "0.00 kH/s");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_secs(42), "42s");
        assert_eq!(format_duration_secs(90), "1.5m");
        assert_eq!(format_duration_secs(5400), "1.5h");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("lyra2v2", 10), "lyra2v2");
        assert_eq!(truncate("GeForce GTX 1080 Ti", 10), "GeForce...");
        assert_eq!(truncate("ÄÖÜäöüßÄÖÜ", 5), "ÄÖ...");
    }

    // -----------------------------------------------------------------------
    // load_config
    // -----------------------------------------------------------------------

    #[test]
    fn test_load_config_default() {
        assert_eq!(load_config(None), EngineConfig::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("engine.json");
        std::fs::write(&path, r#"{ "moving_window_items": 20 }"#).unwrap();

        let config = load_config(path.to_str());
        assert_eq!(config.moving_window_items, 20);
        assert_eq!(config.histogram_bins, 100);
    }
}
