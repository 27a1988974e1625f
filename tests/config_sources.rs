// tests/config_sources.rs
use risk_radar::config::{load_sources_default, load_sources_from, SourcesConfig, ENV_SOURCES_PATH};
use std::{env, fs};

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("sources.toml");
    fs::write(
        &p_toml,
        r#"
rss_feeds = [" https://a.test/rss ", "", "https://b.test/atom", "https://a.test/rss"]
tanker_prefixes = ["shell", "IRON"]
"#,
    )
    .unwrap();
    let v = load_sources_from(&p_toml).unwrap();
    assert_eq!(
        v.rss_feeds,
        vec!["https://a.test/rss".to_string(), "https://b.test/atom".to_string()]
    );
    assert_eq!(v.tanker_prefixes, vec!["SHELL".to_string(), "IRON".to_string()]);

    let p_json = dir.path().join("sources.json");
    fs::write(&p_json, r#"{"tanker_prefixes": [" QUID ", ""]}"#).unwrap();
    let vj = load_sources_from(&p_json).unwrap();
    assert_eq!(vj.tanker_prefixes, vec!["QUID".to_string()]);
    assert_eq!(vj.rss_feeds, SourcesConfig::default().rss_feeds);

    let p_bad = dir.path().join("sources.json");
    fs::write(&p_bad, "rss_feeds = nope").unwrap();
    assert!(load_sources_from(&p_bad).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Keep the repo's own config/ out of the way.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var(ENV_SOURCES_PATH);

    // 1) nothing on disk: built-in lists
    let v = load_sources_default().unwrap();
    assert_eq!(v, SourcesConfig::default());
    assert_eq!(v.rss_feeds.len(), 2);

    // 2) config/sources.toml
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("sources.toml"), r#"rss_feeds = ["https://c.test/rss"]"#).unwrap();
    let vt = load_sources_default().unwrap();
    assert_eq!(vt.rss_feeds, vec!["https://c.test/rss".to_string()]);

    // 3) env wins
    let p_env = tmp.path().join("override.json");
    fs::write(&p_env, r#"{"rss_feeds": ["https://d.test/rss"]}"#).unwrap();
    env::set_var(ENV_SOURCES_PATH, p_env.display().to_string());
    let ve = load_sources_default().unwrap();
    assert_eq!(ve.rss_feeds, vec!["https://d.test/rss".to_string()]);

    env::remove_var(ENV_SOURCES_PATH);
    env::set_current_dir(&old).unwrap();
}
