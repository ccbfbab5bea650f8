use glow_advisor::config::{AppConfig, DEFAULT_BASE_URL};
use serial_test::serial;
use std::env;
use std::fs;

const ARGS: [&str; 1] = ["glow-advisor"];

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        for key in [
            "CONFIG_FILE",
            "HOST",
            "PORT",
            "VITE_API_BASE",
            "VITE_API_KEY",
            "GLOW_SERVER__PORT",
            "GLOW_SERVER__HOST",
            "GLOW_GENERATION__BASE_URL",
            "GLOW_GENERATION__API_KEY",
            "GLOW_SESSION__IDLE_TIMEOUT_SECS",
        ] {
            env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(ARGS).expect("defaults should load");
    assert_eq!(config.server.port, 5173);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.generation.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.generation.api_key, "");
    assert_eq!(config.session.idle_timeout_secs, 1800);
    assert_eq!(
        config.generation.endpoint().unwrap().as_str(),
        "http://127.0.0.1:8000/generate"
    );
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("GLOW_SERVER__PORT", "9090");
        env::set_var("GLOW_GENERATION__BASE_URL", "http://backend.internal:8000");
        env::set_var("GLOW_GENERATION__API_KEY", "from-glow-env");
    }

    let config = AppConfig::load_from_args(ARGS).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.generation.base_url, "http://backend.internal:8000");
    assert_eq!(config.generation.api_key, "from-glow-env");

    clear_env_vars();
}

#[test]
#[serial]
fn test_legacy_env_names_win_over_prefixed() {
    clear_env_vars();
    unsafe {
        env::set_var("GLOW_GENERATION__API_KEY", "prefixed");
        env::set_var("VITE_API_KEY", "legacy");
        env::set_var("VITE_API_BASE", "http://legacy.example:8000");
    }

    let config = AppConfig::load_from_args(ARGS).expect("Failed to load config");
    assert_eq!(config.generation.api_key, "legacy");
    assert_eq!(config.generation.base_url, "http://legacy.example:8000");

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_flags_win() {
    clear_env_vars();
    unsafe {
        env::set_var("GLOW_SERVER__PORT", "9090");
    }

    let config = AppConfig::load_from_args([
        "glow-advisor",
        "--port",
        "4000",
        "--api-base",
        "http://cli.example",
        "--api-key",
        "cli-key",
    ])
    .expect("Failed to load config");
    assert_eq!(config.server.port, 4000);
    assert_eq!(config.generation.base_url, "http://cli.example");
    assert_eq!(config.generation.api_key, "cli-key");

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::tempdir().expect("tempdir");
    let file_path = dir.path().join("settings.yaml");
    fs::write(
        &file_path,
        r#"
server:
  port: 7070
generation:
  base_url: "http://file.example:9000/"
"#,
    )
    .expect("Failed to write temp config");

    unsafe {
        env::set_var("CONFIG_FILE", &file_path);
    }

    let config = AppConfig::load_from_args(ARGS).expect("Failed to load config from file");
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(
        config.generation.endpoint().unwrap().as_str(),
        "http://file.example:9000/generate"
    );

    clear_env_vars();
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    clear_env_vars();

    let result = AppConfig::load_from_args(["glow-advisor", "--config", "does-not-exist.yaml"]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    let cwd_path = "glow.yaml";
    fs::write(cwd_path, "server:\n  port: 6060\n").expect("Failed to write ./glow.yaml");

    let config = AppConfig::load_from_args(ARGS);

    fs::remove_file(cwd_path).unwrap();

    assert_eq!(config.expect("Failed to load config").server.port, 6060);
}

#[test]
#[serial]
fn test_invalid_base_url_rejected() {
    clear_env_vars();
    unsafe {
        env::set_var("GLOW_GENERATION__BASE_URL", "not a url");
    }

    let result = AppConfig::load_from_args(ARGS);
    clear_env_vars();

    let err = result.expect_err("invalid base url should fail validation");
    assert!(err.to_string().contains("generation.base_url"));
}
