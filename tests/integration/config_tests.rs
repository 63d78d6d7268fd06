//! Configuration files feeding feed settings

use oracle_feeds::{Address, ErrorKind, FeedSettings, Network, SdkConfig};
use std::io::Write;
use std::time::Duration;

fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_from_yaml_file() {
    let file = yaml_file(
        r#"
network: coston2
rpc_url: "http://127.0.0.1:9650/ext/C/rpc"
cache:
  ttl_seconds: 15
subscriptions:
  default_interval_ms: 2000
"#,
    );

    let config = SdkConfig::from_file(file.path()).unwrap();
    assert_eq!(config.network().unwrap(), Network::Coston2);
    assert_eq!(config.rpc_url().unwrap(), "http://127.0.0.1:9650/ext/C/rpc");
    // Unset keys keep their defaults
    assert!(config.cache.enabled);

    let settings = FeedSettings::from_config(&config).unwrap();
    assert_eq!(settings.network, Network::Coston2);
    assert_eq!(settings.cache_ttl_secs, 15);
    assert_eq!(settings.default_interval, Duration::from_secs(2));
    assert_eq!(
        settings.registry.to_string(),
        "0xad67fe66660fb8dfe9d6b1b4240d8650e30f6019"
    );
}

#[test]
fn test_registry_override() {
    let file = yaml_file(
        r#"
network: flare
registry_address: "0x1000000000000000000000000000000000000003"
"#,
    );

    let config = SdkConfig::from_file(file.path()).unwrap();
    let settings = FeedSettings::from_config(&config).unwrap();
    let expected: Address = "0x1000000000000000000000000000000000000003".parse().unwrap();
    assert_eq!(settings.registry, expected);
}

#[test]
fn test_invalid_file_values_are_configuration_errors() {
    let file = yaml_file(
        r#"
network: flare
registry_address: "0x0000000000000000000000000000000000000000"
"#,
    );
    let config = SdkConfig::from_file(file.path()).unwrap();
    let err = FeedSettings::from_config(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let file = yaml_file("cache:\n  ttl_seconds: soon\n");
    let err = SdkConfig::from_file(file.path()).unwrap_err();
    let err: oracle_feeds::SdkError = err.into();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
