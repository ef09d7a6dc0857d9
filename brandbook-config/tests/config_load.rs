use brandbook_common::{LlmConfig, ProviderKind};
use brandbook_config::BrandbookConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r#"
model:
  provider: claude
  model: claude-opus-4-1
providers:
  claude:
    api_key: "${BRANDBOOK_TEST_CLAUDE_KEY}"
fetch:
  max_chars: 500
"#;

#[test]
#[serial]
fn file_values_merge_over_defaults() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "brandbook.yaml", FILE_YAML);

    temp_env::with_var("BRANDBOOK_TEST_CLAUDE_KEY", Some("claude-secret"), || {
        let config = BrandbookConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load config");

        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert_eq!(config.fetch.max_chars, 500);
        assert_eq!(config.fetch.timeout_secs, 15);

        let llm = config.selected_llm_config().expect("claude session");
        assert_eq!(
            llm,
            LlmConfig::Claude {
                api_key: "claude-secret".into(),
                model: "claude-opus-4-1".into(),
                base_url: None,
            }
        );
    });
}

#[test]
#[serial]
fn environment_overrides_files() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "brandbook.yaml", FILE_YAML);

    temp_env::with_vars(
        [
            ("BRANDBOOK__MODEL__PROVIDER", Some("ollama")),
            ("BRANDBOOK__MODEL__MODEL", Some("llama3")),
            ("BRANDBOOK__SERVER__BIND", Some("127.0.0.1:9000")),
            ("BRANDBOOK__FETCH__MAX_CHARS", Some("1234")),
        ],
        || {
            let config = BrandbookConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load config");

            assert_eq!(config.server.bind, "127.0.0.1:9000");
            assert_eq!(config.fetch.max_chars, 1234);
            let llm = config.selected_llm_config().expect("ollama session");
            assert_eq!(llm.kind(), ProviderKind::Ollama);
            assert_eq!(llm.model(), "llama3");
        },
    );
}

#[test]
#[serial]
fn conventional_key_variables_feed_defaults() {
    temp_env::with_vars(
        [
            ("OPENAI_API_KEY", Some("sk-from-environment")),
            ("GOOGLE_API_KEY", None::<&str>),
        ],
        || {
            let config = BrandbookConfigLoader::new().load().expect("defaults");

            let openai = config.llm_config(ProviderKind::OpenAi, None).unwrap();
            assert_eq!(
                openai,
                LlmConfig::OpenAi {
                    api_key: "sk-from-environment".into(),
                    model: "gpt-5.1".into(),
                    base_url: None,
                }
            );

            let err = config.llm_config(ProviderKind::Gemini, None).unwrap_err();
            assert!(err.to_string().contains("GOOGLE_API_KEY not found"));
        },
    );
}

#[test]
#[serial]
fn missing_required_file_fails_but_optional_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let absent = tmp.path().join("absent.yaml");

    assert!(BrandbookConfigLoader::new().with_file(&absent).load().is_err());

    let config = BrandbookConfigLoader::new()
        .with_optional_file(&absent)
        .load()
        .expect("optional file skipped");
    assert!(config.model.is_none());
}

#[test]
#[serial]
fn later_sources_win() {
    let config = BrandbookConfigLoader::new()
        .with_yaml_str("search:\n  timeout_secs: 3\n")
        .with_yaml_str("search:\n  timeout_secs: 7\n")
        .load()
        .expect("yaml snippets");
    assert_eq!(config.search_timeout(), std::time::Duration::from_secs(7));
}
