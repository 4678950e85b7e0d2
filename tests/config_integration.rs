use rag_portal::config::AppConfig;
use serial_test::serial;
use std::env;
use std::fs;
use std::io::Write;

const FLAG_VARS: [&str; 6] = [
    "PORT",
    "BACKEND_URL",
    "PUBLIC_API_BASE",
    "LOG_JSON",
    "TIMEOUT_DISABLED",
    "CONFIG_FILE",
];

// Clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        for var in FLAG_VARS {
            env::remove_var(var);
        }
        env::remove_var("PORTAL_SERVER__PORT");
        env::remove_var("PORTAL_BACKEND__URL");
        env::remove_var("PORTAL_GATE__COOKIE_NAME");
    }
}

fn load(args: &[&str]) -> AppConfig {
    let mut argv = vec!["rag-portal"];
    argv.extend_from_slice(args);
    AppConfig::load_from_args(argv).expect("Failed to load config")
}

fn yaml_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("Failed to create temp config");
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = load(&[]);
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.backend.url, "http://localhost:8000");
    assert_eq!(config.backend.public_url(), "http://localhost:8000");
    assert_eq!(config.gate.cookie_name, "session");
    assert_eq!(config.resilience.request_timeout_secs, 30);
    assert!(!config.log.json);
}

#[test]
#[serial]
fn test_prefixed_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("PORTAL_SERVER__PORT", "9090");
        env::set_var("PORTAL_GATE__COOKIE_NAME", "sid");
    }

    let config = load(&[]);
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.gate.cookie_name, "sid");
    assert_eq!(config.gate.signin_path, "/signin");

    clear_env_vars();
}

#[test]
#[serial]
fn test_flag_env_beats_prefixed_env() {
    clear_env_vars();
    unsafe {
        env::set_var("PORTAL_BACKEND__URL", "http://prefixed:8000");
        env::set_var("BACKEND_URL", "http://flag-env:8000");
        env::set_var("PUBLIC_API_BASE", "https://api.example.com");
    }

    let config = load(&[]);
    assert_eq!(config.backend.url, "http://flag-env:8000");
    assert_eq!(config.backend.public_url(), "https://api.example.com");

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_flag_beats_everything() {
    clear_env_vars();
    unsafe {
        env::set_var("PORTAL_SERVER__PORT", "9090");
    }
    let file = yaml_file("server:\n  port: 7070\n");

    let config = load(&[
        "--config",
        file.path().to_str().unwrap(),
        "--port",
        "4000",
        "--timeout-disabled",
        "true",
    ]);
    assert_eq!(config.server.port, 4000);
    assert!(config.resilience.timeout_disabled);
    assert!(config.request_timeout().as_secs() > 300 * 24 * 60 * 60);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let file = yaml_file(
        r#"
server:
  port: 7070
backend:
  url: "http://rag-backend:8000"
gate:
  landing_path: "/home"
"#,
    );
    unsafe {
        env::set_var("CONFIG_FILE", file.path());
    }

    let config = load(&[]);
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.backend.url, "http://rag-backend:8000");
    assert_eq!(config.gate.landing_path, "/home");
    assert_eq!(config.gate.cookie_name, "session");

    clear_env_vars();
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yaml"), "server:\n  port: 6060\n").unwrap();
    let previous = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();

    let config = AppConfig::load_from_args(["rag-portal"]);

    env::set_current_dir(previous).unwrap();
    assert_eq!(config.unwrap().server.port, 6060);
}

#[test]
#[serial]
fn test_invalid_backend_url_is_rejected() {
    clear_env_vars();

    let result = AppConfig::load_from_args(["rag-portal", "--backend-url", "not a url"]);
    assert!(result.is_err());
}
