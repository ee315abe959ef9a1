//! Unit tests for configuration structures and parsing.

#[cfg(test)]
mod config_tests {
    use std::path::PathBuf;

    use crate::config::*;
    use crate::error::FusionError;

    // ============= Defaults Tests =============

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.alerts.backend, StoreBackend::File);
        assert_eq!(config.alerts.dir, PathBuf::from("data/alerts"));
        assert_eq!(config.alerts.history_limit, 1000);
        assert_eq!(config.alerts.bus_capacity, 256);
    }

    #[test]
    fn test_empty_yaml_matches_default() {
        let config = AppConfig::from_yaml("{}").unwrap();
        let default = AppConfig::default();

        assert_eq!(config.log_level, default.log_level);
        assert_eq!(config.server.port, default.server.port);
        assert_eq!(config.alerts.history_limit, default.alerts.history_limit);
    }

    // ============= YAML Parsing Tests =============

    #[test]
    fn test_full_config_deserialize() {
        let yaml = r#"
log_level: "debug"
server:
  host: "0.0.0.0"
  port: 9100
alerts:
  backend: "memory"
  dir: "/tmp/fusion"
  history_limit: 50
  bus_capacity: 16
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.alerts.backend, StoreBackend::Memory);
        assert_eq!(config.alerts.dir, PathBuf::from("/tmp/fusion"));
        assert_eq!(config.alerts.history_limit, 50);
        assert_eq!(config.alerts.bus_capacity, 16);
        assert_eq!(config.bind_addr(), "0.0.0.0:9100");
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let yaml = r#"
alerts:
  history_limit: 10
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.alerts.history_limit, 10);
        assert_eq!(config.alerts.backend, StoreBackend::File);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_bom_is_stripped() {
        let yaml = "\u{feff}log_level: \"warn\"\n";
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_unknown_backend_is_config_error() {
        let yaml = r#"
alerts:
  backend: "redis"
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, FusionError::Config(_)));
    }

    // ============= Validation Tests =============

    #[test]
    fn test_validate_rejects_zero_history_limit() {
        let mut config = AppConfig::default();
        config.alerts.history_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_bus_capacity() {
        let mut config = AppConfig::default();
        config.alerts.bus_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(AppConfig::default().validate().is_ok());
    }

    // ============= File Loading Tests =============

    #[test]
    fn test_from_file_reads_yaml() {
        let dir = std::env::temp_dir().join(format!("fusion-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, "server:\n  port: 8123\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.server.port, 8123);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_from_file_missing_is_config_error() {
        let path = std::env::temp_dir().join(format!("missing-{}.yaml", uuid::Uuid::new_v4()));
        let err = AppConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, FusionError::Config(_)));
    }
}
