use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{DescriptorError, ExitError};

/// Config file name constants.
pub const CONFIG_TOML: &str = "ecosystem.toml";
pub const CONFIG_JSON: &str = "ecosystem.json";

/// Find the descriptor file in `dir`, preferring ecosystem.toml over ecosystem.json.
/// Returns None if neither exists.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    let toml_path = dir.join(CONFIG_TOML);
    if toml_path.exists() {
        return Some(toml_path);
    }
    let json_path = dir.join(CONFIG_JSON);
    if json_path.exists() {
        return Some(json_path);
    }
    None
}

/// Pick the descriptor file for a command.
///
/// An explicit `--config` path wins; a directory is searched with [`find_config`].
/// Without one, the current directory is searched.
pub fn locate(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = match explicit {
        Some(path) if path.is_file() => return Ok(path.to_path_buf()),
        Some(path) if path.is_dir() => path.to_path_buf(),
        Some(path) => {
            return Err(
                ExitError::Config(format!("config file not found: {}", path.display())).into(),
            );
        }
        None => std::env::current_dir().context("could not determine current directory")?,
    };

    find_config(&dir).ok_or_else(|| {
        ExitError::Config(format!(
            "no {CONFIG_TOML} or {CONFIG_JSON} found in {}",
            dir.display()
        ))
        .into()
    })
}

/// Top-level descriptor file.
///
/// Every struct rejects unknown keys, so a typo such as `env_prod` fails loudly
/// instead of silently dropping a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EcosystemConfig {
    pub apps: Vec<AppConfig>,
}

/// One managed process as written in the descriptor file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Unique process name.
    pub name: String,
    /// Entry point, relative to `cwd`.
    pub script: PathBuf,
    /// Runtime used to execute `script` (e.g. `python`).
    pub interpreter: String,
    /// Working directory, relative to the descriptor file.
    #[serde(default = "default_cwd")]
    pub cwd: PathBuf,
    /// Restart-on-change hint for the supervisor.
    #[serde(default)]
    pub watch: bool,
    /// Default profile.
    pub env: BTreeMap<String, EnvValue>,
    /// Production profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_production: Option<BTreeMap<String, EnvValue>>,
}

/// A scalar environment value as written in the file.
///
/// Booleans and integers are accepted for convenience and stringified when the
/// process environment is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum EnvValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl EnvValue {
    /// String form used in the process environment.
    pub fn to_env_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Integer(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

fn default_cwd() -> PathBuf {
    PathBuf::from("./")
}

impl EcosystemConfig {
    /// Load a descriptor file (TOML or JSON, auto-detected by extension).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let parsed = match ext {
            "toml" => Self::parse_toml(&contents),
            "json" => Self::parse_json(&contents),
            _ => Self::parse_toml(&contents).or_else(|_| Self::parse_json(&contents)),
        };
        Ok(parsed?)
    }

    /// Parse a descriptor from a TOML string.
    pub fn parse_toml(toml_str: &str) -> Result<Self, DescriptorError> {
        toml::from_str(toml_str)
            .map_err(|e| DescriptorError::malformed(format!("invalid {CONFIG_TOML}: {e}")))
    }

    /// Parse a descriptor from a JSON string.
    pub fn parse_json(json: &str) -> Result<Self, DescriptorError> {
        serde_json::from_str(json)
            .map_err(|e| DescriptorError::malformed(format!("invalid {CONFIG_JSON}: {e}")))
    }

    /// The watcher descriptor written by `warden init`.
    pub fn starter() -> Self {
        let env = BTreeMap::from([
            ("NODE_ENV".to_string(), EnvValue::from("development")),
            ("DRY_RUN".to_string(), EnvValue::from("true")),
        ]);
        let env_production = BTreeMap::from([
            ("NODE_ENV".to_string(), EnvValue::from("production")),
            ("DRY_RUN".to_string(), EnvValue::from("false")),
        ]);

        Self {
            apps: vec![AppConfig {
                name: "personal-ai-employee".to_string(),
                script: PathBuf::from("src/filesystem_watcher.py"),
                interpreter: "python".to_string(),
                cwd: default_cwd(),
                watch: false,
                env,
                env_production: Some(env_production),
            }],
        }
    }

    /// Serialize to a TOML string with helpful comments.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        let raw = toml::to_string_pretty(self).context("serializing descriptor to TOML")?;

        let mut doc: toml_edit::DocumentMut = raw
            .parse()
            .context("parsing generated TOML for comment injection")?;

        doc.decor_mut().set_prefix(
            "# Process descriptors for warden\n# Select a profile with `--env default` or `--env production`\n\n",
        );

        if let Some(apps) = doc
            .get_mut("apps")
            .and_then(toml_edit::Item::as_array_of_tables_mut)
        {
            for app in apps.iter_mut() {
                set_table_comment(app, "env", "\n# Default profile (NODE_ENV and DRY_RUN are required)\n");
                set_table_comment(app, "env_production", "\n# Production profile\n");
            }
        }

        Ok(doc.to_string())
    }
}

fn set_table_comment(parent: &mut toml_edit::Table, key: &str, comment: &str) {
    let Some(item) = parent.get_mut(key) else {
        return;
    };
    // Inline tables cannot carry a leading comment; promote them to [apps.env] form.
    if let Some(inline) = item.as_inline_table() {
        *item = toml_edit::Item::Table(inline.clone().into_table());
    }
    if let Some(tbl) = item.as_table_mut() {
        tbl.decor_mut().set_prefix(comment);
    }
}

/// Convert a JSON descriptor to commented TOML.
pub fn json_to_toml(json: &str) -> anyhow::Result<String> {
    let config = EcosystemConfig::parse_json(json)?;
    config.to_toml()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATCHER_TOML: &str = r#"
[[apps]]
name = "personal-ai-employee"
script = "src/filesystem_watcher.py"
interpreter = "python"
cwd = "./"
watch = false

[apps.env]
NODE_ENV = "development"
DRY_RUN = "true"

[apps.env_production]
NODE_ENV = "production"
DRY_RUN = "false"
"#;

    #[test]
    fn parse_watcher_toml() {
        let config = EcosystemConfig::parse_toml(WATCHER_TOML).unwrap();
        assert_eq!(config, EcosystemConfig::starter());
    }

    #[test]
    fn parse_watcher_json() {
        let json = r#"{
            "apps": [{
                "name": "personal-ai-employee",
                "script": "src/filesystem_watcher.py",
                "interpreter": "python",
                "cwd": "./",
                "watch": false,
                "env": { "NODE_ENV": "development", "DRY_RUN": "true" },
                "env_production": { "NODE_ENV": "production", "DRY_RUN": "false" }
            }]
        }"#;
        let config = EcosystemConfig::parse_json(json).unwrap();
        assert_eq!(config, EcosystemConfig::starter());
    }

    #[test]
    fn optional_fields_take_defaults() {
        let config = EcosystemConfig::parse_toml(
            r#"
[[apps]]
name = "w"
script = "w.py"
interpreter = "python3"
env = { NODE_ENV = "development", DRY_RUN = true, WORKERS = 4 }
"#,
        )
        .unwrap();
        let app = &config.apps[0];
        assert_eq!(app.cwd, PathBuf::from("./"));
        assert!(!app.watch);
        assert!(app.env_production.is_none());
        assert_eq!(app.env["DRY_RUN"], EnvValue::Bool(true));
        assert_eq!(app.env["WORKERS"].to_env_string(), "4");
    }

    #[test]
    fn rejects_unknown_app_key() {
        let err = EcosystemConfig::parse_toml(
            r#"
[[apps]]
name = "w"
script = "w.py"
interpreter = "python"
env_staging = { NODE_ENV = "staging", DRY_RUN = "true" }
env = { NODE_ENV = "development", DRY_RUN = "true" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, DescriptorError::MalformedDescriptor(_)));
        assert!(err.to_string().contains("env_staging"), "got: {err}");
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let err = EcosystemConfig::parse_json(r#"{"apps": [], "deploy": {}}"#).unwrap_err();
        assert!(err.to_string().contains("deploy"), "got: {err}");
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = EcosystemConfig::parse_json(
            r#"{"apps": [{"name": "w", "interpreter": "python", "env": {}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DescriptorError::MalformedDescriptor(_)));
        assert!(err.to_string().contains("script"), "got: {err}");
    }

    #[test]
    fn parse_malformed_toml() {
        let err = EcosystemConfig::parse_toml("not valid toml [[[").unwrap_err();
        assert!(err.to_string().contains("invalid ecosystem.toml"));
    }

    #[test]
    fn to_toml_roundtrips_with_comments() {
        let config = EcosystemConfig::starter();
        let output = config.to_toml().unwrap();
        assert!(output.contains("# Process descriptors for warden"));
        assert!(output.contains("# Production profile"));
        assert_eq!(EcosystemConfig::parse_toml(&output).unwrap(), config);
    }

    #[test]
    fn json_to_toml_conversion() {
        let json = serde_json::to_string(&EcosystemConfig::starter()).unwrap();
        let toml_str = json_to_toml(&json).unwrap();
        let config = EcosystemConfig::parse_toml(&toml_str).unwrap();
        assert_eq!(config.apps[0].name, "personal-ai-employee");
    }

    #[test]
    fn load_detects_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        std::fs::write(&path, serde_json::to_string(&EcosystemConfig::starter()).unwrap()).unwrap();
        let config = EcosystemConfig::load(&path).unwrap();
        assert_eq!(config.apps.len(), 1);
    }

    #[test]
    fn find_config_prefers_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_TOML), "").unwrap();
        std::fs::write(dir.path().join(CONFIG_JSON), "").unwrap();

        let found = find_config(dir.path()).unwrap();
        assert!(found.to_string_lossy().ends_with(CONFIG_TOML));
    }

    #[test]
    fn find_config_falls_back_to_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_JSON), "").unwrap();

        let found = find_config(dir.path()).unwrap();
        assert!(found.to_string_lossy().ends_with(CONFIG_JSON));
    }

    #[test]
    fn locate_accepts_directory_and_rejects_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_TOML), "").unwrap();

        let found = locate(Some(dir.path())).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_TOML));

        let err = locate(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExitError>(),
            Some(ExitError::Config(_))
        ));
    }
}
