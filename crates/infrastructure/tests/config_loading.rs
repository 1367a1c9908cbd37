use domain::config::ProviderKind;
use infrastructure::{ConfigLoader, ConfigSource, ConfigValidator};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

const OVERRIDES: &[&str] = &["REDMINE_URL", "AI_PROVIDER", "POLLING_INTERVAL_MINUTES"];

fn clear_overrides() {
    for key in OVERRIDES {
        env::remove_var(key);
    }
}

#[tokio::test]
#[serial]
async fn test_environment_wins_over_file() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("remindmine.toml");
    fs::write(
        &path,
        r#"
[tracker]
url = "http://from-file:3000"
api_key = "file-key"

[schedule]
polling_interval_minutes = 15
"#,
    )
    .unwrap();

    env::set_var("REDMINE_URL", "https://from-env.example");
    let (config, source) = ConfigLoader::new()
        .with_path(path.clone())
        .without_dotenv()
        .load()
        .await
        .unwrap();
    clear_overrides();

    assert_eq!(source, ConfigSource::File(path));
    assert_eq!(config.tracker.url, "https://from-env.example");
    assert_eq!(config.tracker.api_key, "file-key");
    assert_eq!(config.schedule.polling_interval_minutes, 15);
    // Untouched sections keep their defaults
    assert_eq!(config.schedule.update_interval_minutes, 60);
    assert_eq!(config.advice.signature, "AI自動アドバイス");
}

#[tokio::test]
#[serial]
async fn test_first_existing_search_path_wins() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("remindmine.toml");
    let present = dir.path().join("config.json");
    fs::write(&present, r#"{"ai": {"provider": "openai", "openai": {"api_key": "sk-json"}}}"#).unwrap();

    let (config, source) = ConfigLoader::new()
        .with_search_paths(vec![missing, present.clone()])
        .without_dotenv()
        .load()
        .await
        .unwrap();

    assert_eq!(source, ConfigSource::File(present));
    assert_eq!(config.ai.provider, ProviderKind::OpenAi);
    assert!(ConfigValidator::new().validate(&config).is_ok());
}

#[tokio::test]
#[serial]
async fn test_defaults_without_any_file() {
    clear_overrides();
    let dir = TempDir::new().unwrap();

    let (config, source) = ConfigLoader::new()
        .with_search_paths(vec![dir.path().join("nothing.toml")])
        .without_dotenv()
        .load()
        .await
        .unwrap();

    assert_eq!(source, ConfigSource::Default);
    assert_eq!(config.tracker.url, "http://localhost:3000");
    assert!(ConfigValidator::new().validate(&config).is_ok());
}

#[tokio::test]
#[serial]
async fn test_explicit_missing_file_is_an_error() {
    clear_overrides();
    let dir = TempDir::new().unwrap();

    let result = ConfigLoader::new()
        .with_path(dir.path().join("absent.toml"))
        .without_dotenv()
        .load()
        .await;

    assert!(result.is_err());
}

#[tokio::test]
#[serial]
async fn test_invalid_environment_value_fails_loading() {
    clear_overrides();
    env::set_var("POLLING_INTERVAL_MINUTES", "every-now-and-then");
    let result = ConfigLoader::new()
        .with_search_paths(vec![])
        .without_dotenv()
        .load()
        .await;
    clear_overrides();

    assert!(result.is_err());
}

#[tokio::test]
#[serial]
async fn test_saved_config_is_loadable() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let loader = ConfigLoader::new().without_dotenv();

    let mut config = domain::config::AgentConfig::default();
    config.advice.top_k = 7;
    loader.save_config(&config, &path).await.unwrap();

    let (loaded, _) = ConfigLoader::new()
        .with_path(path)
        .without_dotenv()
        .load()
        .await
        .unwrap();
    assert_eq!(loaded.advice.top_k, 7);
}
