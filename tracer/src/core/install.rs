//! Host agent registration.
//!
//! The host runs the external event hooks it finds in its JSON config.
//! `install` merges an entry pointing at this binary, `uninstall` removes
//! it; everything else in the file is preserved untouched.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value as JsonValue, json};

use super::constants::{APP_NAME_LOWER, HOST_CONFIG_DIR, HOST_CONFIG_FILE};

/// Key under which the host looks up external event hooks.
const HOOK_KEY: &str = "event_hooks";

/// Default host config location under the platform config dir.
pub fn default_host_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(HOST_CONFIG_DIR).join(HOST_CONFIG_FILE))
}

/// Merge an event-hook entry for `exe` into the host config.
///
/// Returns the path that was written.
pub fn install(host_config: Option<PathBuf>, exe: &Path) -> Result<PathBuf> {
    let path = resolve(host_config)?;
    let mut root = read_config(&path)?;
    let hooks = root
        .entry(HOOK_KEY.to_string())
        .or_insert_with(|| json!({}));
    let Some(hooks) = hooks.as_object_mut() else {
        bail!("`{}` in {} is not an object", HOOK_KEY, path.display());
    };
    hooks.insert(
        APP_NAME_LOWER.to_string(),
        json!({ "command": [exe.to_string_lossy(), "run"] }),
    );
    write_config(&path, &root)?;
    Ok(path)
}

/// Remove the event-hook entry from the host config.
pub fn uninstall(host_config: Option<PathBuf>) -> Result<PathBuf> {
    let path = resolve(host_config)?;
    let mut root = read_config(&path)?;
    if let Some(hooks) = root.get_mut(HOOK_KEY).and_then(JsonValue::as_object_mut) {
        hooks.remove(APP_NAME_LOWER);
        if hooks.is_empty() {
            root.remove(HOOK_KEY);
        }
        write_config(&path, &root)?;
    }
    Ok(path)
}

fn resolve(host_config: Option<PathBuf>) -> Result<PathBuf> {
    host_config
        .or_else(default_host_config_path)
        .context("Could not determine host config path; pass --host-config")
}

fn read_config(path: &Path) -> Result<Map<String, JsonValue>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read host config: {}", path.display()))?;
    let value: JsonValue = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid host config: {}", path.display()))?;
    match value {
        JsonValue::Object(map) => Ok(map),
        _ => bail!("Host config {} is not a JSON object", path.display()),
    }
}

fn write_config(path: &Path, root: &Map<String, JsonValue>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
    }
    let rendered = serde_json::to_string_pretty(&JsonValue::Object(root.clone()))?;
    fs::write(path, rendered + "\n")
        .with_context(|| format!("Failed to write host config: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_creates_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host/opencode.json");
        install(Some(path.clone()), Path::new("/usr/local/bin/traceline")).unwrap();

        let root: JsonValue = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            root["event_hooks"]["traceline"]["command"],
            json!(["/usr/local/bin/traceline", "run"])
        );
    }

    #[test]
    fn test_install_preserves_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opencode.json");
        fs::write(&path, r#"{"theme": "dark", "event_hooks": {"other": {}}}"#).unwrap();

        install(Some(path.clone()), Path::new("/bin/traceline")).unwrap();

        let root: JsonValue = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(root["theme"], json!("dark"));
        assert!(root["event_hooks"]["other"].is_object());
        assert!(root["event_hooks"]["traceline"].is_object());
    }

    #[test]
    fn test_install_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opencode.json");
        install(Some(path.clone()), Path::new("/bin/traceline")).unwrap();
        install(Some(path.clone()), Path::new("/bin/traceline")).unwrap();

        let root: JsonValue = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(root["event_hooks"].as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_uninstall_removes_entry_and_empty_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opencode.json");
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();
        install(Some(path.clone()), Path::new("/bin/traceline")).unwrap();
        uninstall(Some(path.clone())).unwrap();

        let root: JsonValue = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(root["theme"], json!("dark"));
        assert!(root.get("event_hooks").is_none());
    }

    #[test]
    fn test_uninstall_missing_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        uninstall(Some(path.clone())).unwrap();
        assert!(!path.exists());
    }
}
