//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<SynthConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let config: SynthConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {:?}", path))?;
    config.validate()?;
    Ok(config)
}

/// Load the given file, or fall back to the built-in defaults
pub fn load_or_default(path: Option<&Path>) -> Result<SynthConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(SynthConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::Waveform;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_minimal_config() {
        let yaml = r#"
audio:
  sample_rate: 44100
  buffer_size: 512

master:
  volume: 0.7
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.master.volume, 0.7);
        assert_eq!(config.voice.partials.len(), 3);
    }

    #[test]
    fn test_load_voice_section() {
        let yaml = r#"
voice:
  envelope:
    attack: 0.1
    release: 1.0
  partials:
    - ratio: 1
      waveform: square
      mix: 0.8
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.voice.envelope.attack, 0.1);
        assert_eq!(config.voice.envelope.decay, 0.01);
        assert_eq!(config.voice.partials[0].waveform, Waveform::Square);
        assert_eq!(config.voice.partials[0].mix, 0.8);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"master:\n  volume: 3.0\n").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/keysynth.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_example_config_is_valid() {
        let config: SynthConfig =
            serde_yaml::from_str(include_str!("../../keysynth.example.yaml")).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = load_or_default(None).unwrap();
        assert_eq!(config.audio.sample_rate, 44100);
    }
}
