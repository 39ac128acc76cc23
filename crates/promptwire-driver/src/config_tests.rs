use super::*;

#[test]
fn test_defaults() {
    let config = DriverConfig::default();
    assert_eq!(config.endpoint, "http://localhost:9222");
    assert_eq!(config.default_timeout_secs, 300);
    assert_eq!(config.sites.len(), 2);
    assert!(config.allowed_hosts().any(|h| h == "chatgpt.com"));
    assert!(config.allowed_hosts().any(|h| h == "claude.ai"));
}

#[test]
fn test_profile_for_url() {
    let config = DriverConfig::default();

    let profile = config.profile_for_url("https://chatgpt.com/c/abc").unwrap();
    assert_eq!(profile.name, "chatgpt");

    let profile = config.profile_for_url("https://chat.openai.com/").unwrap();
    assert_eq!(profile.name, "chatgpt");

    let profile = config.profile_for_url("https://claude.ai/new").unwrap();
    assert_eq!(profile.name, "claude");

    assert!(config.profile_for_url("https://example.com/").is_none());
    assert!(config.profile_for_url("not a url").is_none());
}

#[test]
fn test_subdomain_matching() {
    assert!(host_matches("www.chatgpt.com", "chatgpt.com"));
    assert!(host_matches("chatgpt.com", "chatgpt.com"));
    assert!(!host_matches("notchatgpt.com", "chatgpt.com"));
    assert!(!host_matches("chatgpt.com.evil.example", "chatgpt.com"));
}

#[test]
fn test_url_allowed_is_stateless() {
    let config = DriverConfig::default();
    assert!(config.url_allowed("https://chatgpt.com/"));
    assert!(!config.url_allowed("https://github.com/"));
    // Same answers on repeat calls; nothing is cached or mutated.
    assert!(config.url_allowed("https://chatgpt.com/"));
}

#[test]
fn test_toml_roundtrip() {
    let config = DriverConfig::default();
    let raw = toml::to_string(&config).unwrap();
    let back: DriverConfig = toml::from_str(&raw).unwrap();
    assert_eq!(back.endpoint, config.endpoint);
    assert_eq!(back.sites.len(), config.sites.len());
    assert_eq!(back.sites[0].name, "chatgpt");
}

#[test]
fn test_partial_toml_uses_defaults() {
    let raw = r#"endpoint = "http://localhost:9333""#;
    let config: DriverConfig = toml::from_str(raw).unwrap();
    assert_eq!(config.endpoint, "http://localhost:9333");
    assert_eq!(config.default_timeout_secs, 300);
    assert_eq!(config.sites.len(), 2);
}
