use cloudenv_config::{LogFormat, LogLevel, LoggingConfig};
use cloudenv_logging::{build_env_filter, init_logging_from_config, init_simple_tracing};

#[test]
fn test_logging_config_integration() {
    let yaml_config = r#"
level: debug
format: json
directives:
  - "sea_orm=warn"
include_location: true
"#;

    let config: LoggingConfig = serde_yaml::from_str(yaml_config).unwrap();

    assert_eq!(config.level, LogLevel::Debug);
    assert_eq!(config.format, LogFormat::Json);
    assert!(config.include_location);

    let filter = build_env_filter(&config);
    assert!(filter.to_string().contains("sea_orm=warn"));

    assert!(init_logging_from_config(&config).is_ok());
    // A second initialisation must not fail
    assert!(init_logging_from_config(&config).is_ok());
    tracing::info!(target: "cloudenv", "logging initialised");
}

#[test]
fn test_minimal_logging_config() {
    let config = LoggingConfig::default();
    assert_eq!(config.level, LogLevel::Info);
    assert_eq!(config.format, LogFormat::Text);
    assert_eq!(config.filter_string(), "info");
}

#[test]
fn test_simple_tracing_tolerates_bad_level() {
    assert!(init_simple_tracing("not a level ===").is_ok());
}
