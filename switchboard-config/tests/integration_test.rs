//! Integration tests for switchboard-config

use std::fs;
use std::path::PathBuf;
use switchboard_config::*;
use switchboard_core::{ErrorPolicy, FormatterCatalog, Verb, VerbSet};

fn write_temp(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("switchboard-config-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_settings_from_toml_file() {
    let path = write_temp(
        "dispatch.toml",
        r#"
        default_verbs = ["POST"]
        default_formatter = "xml"
        extra_formatters = ["json"]
        error_policy = "include_error_details"
        "#,
    );

    let settings = DispatchSettings::from_file(&path).unwrap();
    assert_eq!(settings.default_verbs, vec![Verb::Post]);
    assert_eq!(settings.default_formatter, "xml");

    let config = settings
        .into_config(&FormatterCatalog::with_builtins())
        .unwrap();
    assert_eq!(config.default_verbs, VerbSet::only(Verb::Post));
    assert_eq!(config.formatters.default_formatter().extension(), "xml");
    assert!(config.formatters.by_extension("json").is_some());
    assert_eq!(config.error_policy, ErrorPolicy::IncludeErrorDetails);
}

#[test]
fn test_settings_from_json_file() {
    let path = write_temp("dispatch.json", r#"{"error_policy": "rethrow"}"#);
    let settings = DispatchSettings::from_file(&path).unwrap();
    assert_eq!(settings.error_policy, ErrorPolicy::Rethrow);
    assert_eq!(settings.default_verbs, Verb::ALL.to_vec());
}

#[test]
fn test_settings_from_env_file() {
    let path = write_temp(
        "dispatch.env",
        "# overrides\nDEFAULT_VERBS=GET\nDEFAULT_FORMATTER=txt\n",
    );
    let settings = DispatchSettings::from_file(&path).unwrap();
    assert_eq!(settings.default_verbs, vec![Verb::Get]);
    assert_eq!(settings.default_formatter, "txt");
}

#[test]
fn test_missing_file_is_a_load_error() {
    let result = DispatchSettings::from_file("/definitely/not/here/dispatch.toml");
    assert!(matches!(result, Err(ConfigError::LoadError(_))));
}

#[test]
fn test_malformed_toml_is_a_parse_error() {
    let path = write_temp("broken.toml", "default_verbs = [");
    let result = DispatchSettings::from_file(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_environment_overrides_file() {
    let path = write_temp("base.toml", r#"error_policy = "rethrow""#);

    unsafe {
        std::env::set_var("SWITCHBOARD_EXTRA_FORMATTERS", "xml");
    }

    let settings = DispatchSettings::load(Some(&path)).unwrap();
    assert_eq!(settings.error_policy, ErrorPolicy::Rethrow);
    assert_eq!(settings.extra_formatters, vec!["xml"]);

    unsafe {
        std::env::remove_var("SWITCHBOARD_EXTRA_FORMATTERS");
    }
}

#[test]
fn test_custom_catalog_entries_resolve() {
    let catalog = FormatterCatalog::new().with(switchboard_core::XmlFormatter::with_root("result"));
    let settings = DispatchSettings {
        default_formatter: "xml".to_string(),
        ..Default::default()
    };
    let config = settings.into_config(&catalog).unwrap();
    assert_eq!(config.formatters.default_formatter().media_type(), "application/xml");

    let missing = DispatchSettings::default().into_config(&catalog);
    assert!(matches!(missing, Err(ConfigError::UnknownFormatter(name)) if name == "json"));
}
