//! Integration tests for source selection, priorities, caching and coercion.

use settings_collector::prelude::*;
use settings_collector::sources::ConfigRsSource;
use std::sync::Arc;

fn mock_registry() -> Arc<SourceRegistry> {
    let registry = Arc::new(SourceRegistry::new());
    registry.register(
        MapSource::new("MockLow")
            .with_priority(-17)
            .with_values([("common", "common low"), ("low_only", "low")]),
    );
    registry.register(
        MapSource::new("MockHigh")
            .with_priority(17)
            .with_values([("common", "common high"), ("high_only", "high")]),
    );
    registry
}

fn mock_settings(load_all: bool) -> SettingsCollector {
    SettingsCollector::builder()
        .with_load_all(load_all)
        .with_defaults([
            ("common", "common default"),
            ("low_only", "low default"),
            ("high_only", "high default"),
            ("neither", "neither default"),
        ])
        .build(mock_registry())
        .unwrap()
}

#[test]
fn test_priority_load_all_true() {
    let settings = mock_settings(true);
    assert_eq!(settings.get("common").unwrap(), "common high".into());
    assert_eq!(settings.get("low_only").unwrap(), "low".into());
    assert_eq!(settings.get("high_only").unwrap(), "high".into());
    assert_eq!(settings.get("neither").unwrap(), "neither default".into());
}

#[test]
fn test_priority_load_all_false() {
    let settings = mock_settings(false);
    assert_eq!(settings.get("common").unwrap(), "common high".into());
    assert_eq!(settings.get("low_only").unwrap(), "low default".into());
    assert_eq!(settings.get("high_only").unwrap(), "high".into());
    assert_eq!(settings.get("neither").unwrap(), "neither default".into());
    assert_eq!(settings.registry().last_successful().as_deref(), Some("MockHigh"));
}

#[test]
fn test_disabled_source_is_skipped() {
    let registry = mock_registry();
    assert!(registry.set_enabled("MockHigh", false));
    let settings = SettingsCollector::builder()
        .with_defaults([("common", "common default")])
        .build(registry)
        .unwrap();

    assert_eq!(settings.get("common").unwrap(), "common low".into());
}

#[test]
fn test_include_and_exclude_loaders() {
    let included = SettingsCollector::builder()
        .with_loaders(["MockLow"])
        .with_defaults([("common", "common default")])
        .build(mock_registry())
        .unwrap();
    assert_eq!(included.get("common").unwrap(), "common low".into());

    let excluded = SettingsCollector::builder()
        .without_loaders(["MockHigh"])
        .with_defaults([("common", "common default")])
        .build(mock_registry())
        .unwrap();
    assert_eq!(excluded.get("common").unwrap(), "common low".into());

    let mixed = SettingsCollector::builder()
        .with_loaders(["MockHigh", "NoSuchLoader"])
        .with_defaults([("common", "common default")])
        .build(mock_registry())
        .unwrap();
    assert_eq!(mixed.get("common").unwrap(), "common high".into());
}

#[test]
fn test_only_unknown_loaders() {
    let settings = SettingsCollector::builder()
        .with_loaders(["Nope", "Nada"])
        .with_defaults([("common", "common default")])
        .build(mock_registry())
        .unwrap();

    let err = settings.get("common").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Configuration error: attempting to use only unknown loaders: Nada, Nope"
    );
}

#[test]
fn test_no_loaders_to_include() {
    let err = SettingsCollector::builder()
        .with_loaders(Vec::<&str>::new())
        .with_defaults([("common", "common default")])
        .build(mock_registry())
        .unwrap_err();
    assert!(err.to_string().contains("no loaders listed to include"));
}

#[test]
fn test_reserved_names() {
    for name in ["SC_Config", "__private"] {
        let err = SettingsCollector::builder()
            .with_defaults([(name, 1)])
            .build(mock_registry())
            .unwrap_err();
        assert!(matches!(err, SettingsError::Config(_)), "{} should be rejected", name);
    }

    let err = SettingsCollector::builder()
        .with_separator(".")
        .with_defaults([(".dotted", 1)])
        .build(mock_registry())
        .unwrap_err();
    assert!(matches!(err, SettingsError::Config(_)));
}

#[test]
fn test_caching() {
    let shared = SharedSettings::new();
    shared.update("test__cached", "first");
    shared.update("test__uncached", "first");
    let settings = SettingsCollector::builder()
        .with_prefix("test")
        .with_setting("cached", Setting::new("default"))
        .with_setting("uncached", Setting::new("default").no_cache())
        .build(Arc::new(SourceRegistry::builtin(&shared)))
        .unwrap();

    assert_eq!(settings.get("cached").unwrap(), "first".into());
    assert_eq!(settings.get("uncached").unwrap(), "first".into());

    shared.update("test__cached", "second");
    shared.update("test__uncached", "second");
    assert_eq!(settings.get("cached").unwrap(), "first".into());
    assert_eq!(settings.get("uncached").unwrap(), "second".into());

    settings.clear_cache();
    assert_eq!(settings.get("cached").unwrap(), "second".into());
}

#[test]
fn test_clear_cache_reaches_child_scopes() {
    let shared = SharedSettings::new();
    shared.update("x__foo", "first");
    let settings = SettingsCollector::builder()
        .with_setting("foo", Setting::new("default"))
        .build(Arc::new(SourceRegistry::builtin(&shared)))
        .unwrap();

    let x = settings.scope("x").unwrap();
    assert_eq!(x.get("foo").unwrap(), "first".into());

    shared.update("x__foo", "second");
    settings.clear_cache();
    assert_eq!(x.get("foo").unwrap(), "second".into());
}

#[test]
fn test_cast_falls_back_to_default() {
    let registry = Arc::new(SourceRegistry::new());
    registry.register(MapSource::new("Values").with_values([("lenient", "abc"), ("strict", "abc")]));
    let settings = SettingsCollector::builder()
        .with_greedy_load(false)
        .with_setting("lenient", Setting::new(23.29).value_type(ValueType::Int))
        .with_setting(
            "strict",
            Setting::new(23.29)
                .value_type(ValueType::Int)
                .default_on_cast_error(false),
        )
        .build(registry)
        .unwrap();

    assert_eq!(settings.get("lenient").unwrap(), SettingValue::Float(23.29));
    assert_eq!(
        settings.get("strict").unwrap_err().to_string(),
        "invalid value 'abc' for setting strict (it should be of type int)"
    );
}

#[test]
fn test_greedy_and_lazy_loading() {
    let registry = Arc::new(SourceRegistry::new());
    registry.register(MapSource::new("Values").with_value("present", "yes"));

    let greedy = SettingsCollector::builder()
        .with_setting("present", Setting::required())
        .with_setting("absent", Setting::required())
        .build(Arc::clone(&registry))
        .unwrap();
    assert_eq!(greedy.get("present").unwrap_err(), SettingsError::missing("absent"));

    let lazy = SettingsCollector::builder()
        .with_greedy_load(false)
        .with_setting("present", Setting::required())
        .with_setting("absent", Setting::required())
        .build(registry)
        .unwrap();
    assert_eq!(lazy.get("present").unwrap(), "yes".into());
    assert!(lazy.get("absent").unwrap_err().is_missing());
}

#[test]
fn test_env_source() {
    let registry = Arc::new(SourceRegistry::new());
    registry.register(
        EnvSource::from_vars([("MYAPP__PORT", "9000"), ("MYAPP__DB__DEBUG", "yes")]).with_enabled(true),
    );
    let settings = SettingsCollector::builder()
        .with_prefix("myapp")
        .with_setting("port", Setting::new(8080).value_type(ValueType::Int))
        .with_setting("debug", Setting::new(false).value_type(ValueType::Bool))
        .build(registry)
        .unwrap();

    assert_eq!(settings.get_as::<i64>("port").unwrap(), 9000);
    assert!(!settings.get_as::<bool>("debug").unwrap());
    assert!(settings.scope("db").unwrap().get_as::<bool>("debug").unwrap());
}

#[test]
fn test_env_source_disabled_by_default() {
    let registry = Arc::new(SourceRegistry::new());
    registry.register(EnvSource::from_vars([("PORT", "9000")]));
    let settings = SettingsCollector::builder()
        .with_defaults([("port", 8080)])
        .build(Arc::clone(&registry))
        .unwrap();
    assert_eq!(settings.get("port").unwrap(), 8080.into());

    registry.set_enabled("Env", true);
    settings.clear_cache();
    assert_eq!(settings.get("port").unwrap(), "9000".into());
}

#[test]
fn test_dict_overrides_env() {
    let shared = SharedSettings::new();
    shared.update("port", "1");
    let registry = Arc::new(SourceRegistry::builtin(&shared));
    registry.register(EnvSource::from_vars([("PORT", "2"), ("HOST", "env-host")]).with_enabled(true));

    let settings = SettingsCollector::builder()
        .with_load_all(true)
        .with_defaults([("port", "0"), ("host", "localhost")])
        .build(Arc::clone(&registry))
        .unwrap();
    assert_eq!(settings.get("port").unwrap(), "1".into());
    assert_eq!(settings.get("host").unwrap(), "env-host".into());
}

#[test]
fn test_config_rs_source() {
    let source = Arc::new(ConfigRsSource::new());
    let registry = Arc::new(SourceRegistry::new());
    registry.register_arc(source.clone());

    let settings = SettingsCollector::builder()
        .with_prefix("MyApp")
        .with_setting("port", Setting::new(8080).value_type(ValueType::Int))
        .with_setting("hosts", Setting::new(Vec::<String>::new()).value_type(ValueType::List))
        .build(registry)
        .unwrap();

    // Not installed yet: the source is skipped.
    assert_eq!(settings.get_as::<i64>("port").unwrap(), 8080);

    let config = config::Config::builder()
        .add_source(config::File::from_str(
            r#"
myapp__port = 9000
myapp__hosts = ["a", "b"]
"#,
            config::FileFormat::Toml,
        ))
        .build()
        .unwrap();
    source.install(config);
    settings.clear_cache();

    assert_eq!(settings.get_as::<i64>("port").unwrap(), 9000);
    assert_eq!(settings.get("hosts").unwrap(), SettingValue::from(vec!["a", "b"]));
}

#[test]
fn test_collector_config_from_toml() {
    let config: CollectorConfig = config::Config::builder()
        .add_source(config::File::from_str(
            r#"
prefix = "svc"
load_all = true
loaders = ["MockHigh"]
exclude = false
"#,
            config::FileFormat::Toml,
        ))
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();

    let settings = SettingsCollector::builder()
        .with_config(config)
        .with_defaults([("common", "common default")])
        .build(mock_registry())
        .unwrap();

    assert_eq!(settings.prefix(), "svc__");
    assert!(settings.config().load_all);
    // Keys are prefixed now, so nothing matches.
    assert_eq!(settings.get("common").unwrap(), "common default".into());
}

#[test]
fn test_failing_source_propagates() {
    struct Broken;

    impl SettingsSource for Broken {
        fn load_settings(&self, _prefix: &str, _names: &[String]) -> std::result::Result<Loaded, SourceError> {
            Err(SourceError::failed("backend exploded"))
        }
    }

    let registry = Arc::new(SourceRegistry::new());
    registry.register(Broken);
    let settings = SettingsCollector::builder()
        .with_defaults([("foo", 1)])
        .build(registry)
        .unwrap();

    let err = settings.get("foo").unwrap_err();
    assert_eq!(
        err,
        SettingsError::Source {
            loader: "Broken".to_string(),
            message: "backend exploded".to_string(),
        }
    );
}
