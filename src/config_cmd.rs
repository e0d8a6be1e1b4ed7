//! `mdai config`: read and write the persisted key/value store.

use anyhow::{bail, Result};

use crate::config::{key_spec, ConfigStore, Settings, KEYS};

/// Show at most the first four characters of a secret.
pub fn mask_secret(value: &str) -> String {
    if value.chars().count() <= 8 {
        return "****".to_string();
    }
    let prefix: String = value.chars().take(4).collect();
    format!("{}****", prefix)
}

pub fn run_config_set(store: &mut ConfigStore, key: &str, value: &str) -> Result<()> {
    store.set(key, value)?;
    store.save()?;
    println!("config: set {} in {}", key, store.path().display());
    Ok(())
}

pub fn run_config_get(store: &ConfigStore, key: &str) -> Result<()> {
    println!("{}", effective_value(store, key)?);
    Ok(())
}

pub fn run_config_unset(store: &mut ConfigStore, key: &str) -> Result<()> {
    if key_spec(key).is_none() {
        bail!("Unknown config key: '{}'", key);
    }
    if store.unset(key) {
        store.save()?;
        println!("config: unset {}", key);
    } else {
        println!("config: {} was not set", key);
    }
    Ok(())
}

pub fn run_config_list(store: &ConfigStore) -> Result<()> {
    for line in list_lines(store)? {
        println!("{}", line);
    }
    Ok(())
}

pub fn run_config_path(store: &ConfigStore) -> Result<()> {
    println!("{}", store.path().display());
    Ok(())
}

/// The value a key resolves to: stored, provider-derived, or default.
fn effective_value(store: &ConfigStore, key: &str) -> Result<String> {
    let Some(spec) = key_spec(key) else {
        bail!("Unknown config key: '{}'", key);
    };
    if let Some(value) = store.get(key) {
        return Ok(value.to_string());
    }
    let settings = Settings::from_store_with_env(store, |_| None)?;
    Ok(match key {
        "model" => settings.llm.model,
        "base_url" => settings.llm.base_url,
        _ => spec.default.unwrap_or("").to_string(),
    })
}

fn list_lines(store: &ConfigStore) -> Result<Vec<String>> {
    let width = KEYS.iter().map(|k| k.name.len()).max().unwrap_or(0);
    let mut lines = Vec::with_capacity(KEYS.len());

    for spec in KEYS {
        let shown = match store.get(spec.name) {
            Some(value) if spec.secret => mask_secret(value),
            Some(value) => value.to_string(),
            None => {
                let value = effective_value(store, spec.name)?;
                if value.is_empty() {
                    "(not set)".to_string()
                } else {
                    format!("{} (default)", value)
                }
            }
        };
        lines.push(format!("{:<width$}  {}", spec.name, shown, width = width));
    }

    Ok(lines)
}
