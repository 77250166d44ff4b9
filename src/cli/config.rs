use anyhow::{bail, Context, Result};
use inactive_user::config::LifecycleConfig;
use inactive_user::storage::path_utils;

/// Current config as JSON, defaults when no file exists.
fn load_value() -> Result<serde_json::Value> {
    let config_path = path_utils::config_path();
    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        serde_json::from_str(&content).with_context(|| "Invalid JSON in config.json")
    } else {
        Ok(serde_json::to_value(LifecycleConfig::default())?)
    }
}

/// `config show`: display the full config.
pub fn run_show() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&load_value()?)?);
    Ok(())
}

/// `config get <key>`: display a single config value.
///
/// Key uses dot notation: `thresholds.block_after_secs`, `delivery.mode`
pub fn run_get(key: &str) -> Result<()> {
    let config = load_value()?;
    match resolve_path(&config, key) {
        Some(v) => println!("{}", serde_json::to_string_pretty(v)?),
        None => bail!("Key not found: {}", key),
    }
    Ok(())
}

/// `config set <key> <value>`: set a config value.
///
/// Value is parsed as JSON (bool, number, array), falling back to a string.
/// The result must still deserialize as a full config, else nothing is written.
pub fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = load_value()?;

    let parsed: serde_json::Value = serde_json::from_str(value)
        .unwrap_or(serde_json::Value::String(value.to_string()));

    set_path(&mut config, key, parsed.clone())?;

    let typed: LifecycleConfig = serde_json::from_value(config)
        .with_context(|| format!("Invalid value for {}", key))?;
    typed.save_to(&path_utils::config_path())?;

    println!("{} = {}", key, serde_json::to_string(&parsed)?);
    if let Err(e) = typed.validate() {
        println!("Warning: {}", e);
    }
    Ok(())
}

/// `config validate`: strict load plus semantic checks.
pub fn run_validate() -> Result<()> {
    let config_path = path_utils::config_path();
    let config = LifecycleConfig::load_from(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    config.validate()?;
    println!("Configuration OK");
    Ok(())
}

/// Resolve a dot-separated path in a JSON value.
fn resolve_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Set a value at a dot-separated path, creating intermediate objects as needed.
fn set_path(root: &mut serde_json::Value, path: &str, value: serde_json::Value) -> Result<()> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        bail!("Empty key path");
    };

    let mut current = root;
    for segment in parents {
        if !current.is_object() {
            *current = serde_json::json!({});
        }
        let serde_json::Value::Object(map) = current else {
            bail!("Cannot descend into {}", segment);
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| serde_json::json!({}));
    }

    if !current.is_object() {
        *current = serde_json::json!({});
    }
    let serde_json::Value::Object(map) = current else {
        bail!("Cannot set {}", path);
    };
    map.insert(last.to_string(), value);
    Ok(())
}
