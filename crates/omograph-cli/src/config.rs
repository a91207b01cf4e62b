//! YAML configuration loading for the CLI.
//!
//! Loads [`OmographConfig`] from a YAML file on disk, falling back to defaults
//! when no file is specified.

use omograph_core::OmographConfig;
use std::path::Path;

/// Load an [`OmographConfig`] from a YAML file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn load_config(path: &Path) -> anyhow::Result<OmographConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
    let config: OmographConfig = serde_yaml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {}", e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use omograph_core::DevicePreference;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    /// Helper to write YAML to a temp file and return the path.
    fn write_yaml(yaml: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_config_full() {
        let yaml = r#"
classifier:
  max_length: 256
  stress_marker: "+"
  strict: false
  special_words: ["начала", "замок"]
model:
  path: "/models/ruaccent-omograph"
  device: "cpu"
logging:
  level: "debug"
  format: "json"
"#;
        let f = write_yaml(yaml);
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.classifier.max_length, 256);
        assert!(!config.classifier.strict);
        assert_eq!(config.classifier.special_words.len(), 2);
        assert_eq!(
            config.model.path,
            Some(PathBuf::from("/models/ruaccent-omograph"))
        );
        assert_eq!(config.model.device, DevicePreference::Cpu);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_partial_uses_defaults() {
        let yaml = r#"
model:
  model_id: "ruaccent/omograph"
"#;
        let f = write_yaml(yaml);
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.classifier.max_length, 512);
        assert_eq!(config.classifier.stress_marker, '+');
        assert!(config.classifier.strict);
        assert_eq!(config.model.device, DevicePreference::Auto);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_without_model_fails_validation() {
        let f = write_yaml("classifier:\n  max_length: 128\n");
        let config = load_config(f.path()).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_unknown_device() {
        let f = write_yaml("model:\n  device: \"tpu\"\n");
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/omograph.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let f = write_yaml("classifier: [not, a, map");
        assert!(load_config(f.path()).is_err());
    }
}
