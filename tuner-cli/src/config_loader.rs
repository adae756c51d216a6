//! Loads the tuner configuration from JSON and applies command-line overrides.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tuner_core::{Algorithm, TunerConfig};

/// Reads a configuration file, or returns the defaults when no path is given.
///
/// The file may be partial; every missing field keeps its default.
pub fn load_config(path: Option<&Path>) -> Result<TunerConfig> {
    let Some(path) = path else {
        log::debug!("[CONFIG] No configuration file, using defaults");
        return Ok(TunerConfig::default());
    };
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading configuration file {}", path.display()))?;
    let config = parse_config(&data)
        .with_context(|| format!("parsing configuration file {}", path.display()))?;
    log::info!("[CONFIG] Loaded {}", path.display());
    Ok(config)
}

pub fn parse_config(json: &str) -> Result<TunerConfig> {
    Ok(serde_json::from_str(json)?)
}

/// Command-line flags win over the file.
pub fn apply_overrides(
    config: &mut TunerConfig,
    algorithm: Option<Algorithm>,
    frame_size: Option<usize>,
) {
    if let Some(algorithm) = algorithm {
        config.algorithm = algorithm;
    }
    if let Some(frame_size) = frame_size {
        config.frame_size = frame_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_path_gives_defaults() {
        assert_eq!(load_config(None).unwrap(), TunerConfig::default());
    }

    #[test]
    fn test_file_values_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuner.json");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{ "algorithm": "amdf", "frame_size": 4096, "filter": {{ "process_noise": 0.2 }} }}"#
        )
        .unwrap();

        let mut config = load_config(Some(&path)).unwrap();
        assert_eq!(config.algorithm, Algorithm::Amdf);
        assert_eq!(config.frame_size, 4096);
        assert_eq!(config.filter.process_noise, 0.2);
        assert_eq!(config.filter.measurement_noise, 1.0);

        apply_overrides(&mut config, Some(Algorithm::Yin), None);
        assert_eq!(config.algorithm, Algorithm::Yin);
        assert_eq!(config.frame_size, 4096);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(parse_config("{ \"algorithm\": \"fourier\" }").is_err());
        assert!(parse_config("not json").is_err());
    }
}
