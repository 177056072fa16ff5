use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::Serialize;

use crate::config::EnvValue;
use crate::error::DescriptorError;

pub const NODE_ENV: &str = "NODE_ENV";
pub const DRY_RUN: &str = "DRY_RUN";

/// Profile declared by the `env` key.
pub const DEFAULT_PROFILE: &str = "default";
/// Profile declared by the `env_production` key.
pub const PRODUCTION_PROFILE: &str = "production";

fn re_var_name() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

/// A validated environment profile.
///
/// `dry_run` is a real boolean here; it only becomes the string `"true"` or
/// `"false"` in [`Profile::to_env`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub node_env: String,
    pub dry_run: bool,
    /// Every other variable, already stringified.
    pub vars: BTreeMap<String, String>,
}

impl Profile {
    /// Validate one `env*` table from the descriptor file.
    pub fn from_table(
        app: &str,
        profile: &str,
        table: &BTreeMap<String, EnvValue>,
    ) -> Result<Self, DescriptorError> {
        let malformed =
            |what: String| DescriptorError::malformed(format!("app {app:?}, profile {profile:?}: {what}"));

        let mut node_env = None;
        let mut dry_run = None;
        let mut vars = BTreeMap::new();

        for (key, value) in table {
            if !re_var_name().is_match(key) {
                return Err(malformed(format!("invalid variable name {key:?}")));
            }
            match key.as_str() {
                DRY_RUN => {
                    let parsed = parse_dry_run(value).ok_or_else(|| {
                        malformed(format!(
                            "{DRY_RUN} must be true or false, got {:?}",
                            value.to_env_string()
                        ))
                    })?;
                    dry_run = Some(parsed);
                }
                NODE_ENV => {
                    let text = value.to_env_string();
                    if text.trim().is_empty() {
                        return Err(malformed(format!("{NODE_ENV} must not be empty")));
                    }
                    node_env = Some(text);
                }
                _ => {
                    let text = value.to_env_string();
                    if text.contains('\0') {
                        return Err(malformed(format!("value of {key} contains a NUL byte")));
                    }
                    vars.insert(key.clone(), text);
                }
            }
        }

        let node_env = node_env.ok_or_else(|| malformed(format!("missing {NODE_ENV}")))?;
        if node_env.contains('\0') {
            return Err(malformed(format!("value of {NODE_ENV} contains a NUL byte")));
        }
        let dry_run = dry_run.ok_or_else(|| malformed(format!("missing {DRY_RUN}")))?;

        Ok(Self {
            node_env,
            dry_run,
            vars,
        })
    }

    /// Environment overrides contributed by this profile.
    pub fn to_env(&self) -> BTreeMap<String, String> {
        let mut env = self.vars.clone();
        env.insert(NODE_ENV.to_string(), self.node_env.clone());
        env.insert(DRY_RUN.to_string(), self.dry_run.to_string());
        env
    }
}

/// Interpret a `DRY_RUN` value. Strings accept true/1/yes and false/0/no, case-insensitively.
pub fn parse_dry_run(value: &EnvValue) -> Option<bool> {
    match value {
        EnvValue::Bool(b) => Some(*b),
        EnvValue::Integer(1) => Some(true),
        EnvValue::Integer(0) => Some(false),
        EnvValue::Integer(_) => None,
        EnvValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
    }
}

/// Descriptor file key that declares `profile`.
pub fn profile_key(profile: &str) -> String {
    if profile == DEFAULT_PROFILE {
        "env".to_string()
    } else {
        format!("env_{profile}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, EnvValue)]) -> BTreeMap<String, EnvValue> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn dry_run_becomes_bool_and_back() {
        let t = table(&[
            ("NODE_ENV", "production".into()),
            ("DRY_RUN", "False".into()),
            ("VAULT_PATH", "./vault".into()),
        ]);
        let profile = Profile::from_table("w", "production", &t).unwrap();
        assert!(!profile.dry_run);
        assert_eq!(profile.node_env, "production");

        let env = profile.to_env();
        assert_eq!(env["DRY_RUN"], "false");
        assert_eq!(env["NODE_ENV"], "production");
        assert_eq!(env["VAULT_PATH"], "./vault");
    }

    #[test]
    fn dry_run_spellings() {
        assert_eq!(parse_dry_run(&"yes".into()), Some(true));
        assert_eq!(parse_dry_run(&" 1 ".into()), Some(true));
        assert_eq!(parse_dry_run(&"NO".into()), Some(false));
        assert_eq!(parse_dry_run(&EnvValue::Bool(true)), Some(true));
        assert_eq!(parse_dry_run(&EnvValue::Integer(0)), Some(false));
        assert_eq!(parse_dry_run(&EnvValue::Integer(2)), None);
        assert_eq!(parse_dry_run(&"maybe".into()), None);
    }

    #[test]
    fn missing_dry_run_is_malformed() {
        let t = table(&[("NODE_ENV", "development".into())]);
        let err = Profile::from_table("w", "default", &t).unwrap_err();
        assert!(matches!(err, DescriptorError::MalformedDescriptor(_)));
        assert!(err.to_string().contains("missing DRY_RUN"), "got: {err}");
    }

    #[test]
    fn missing_node_env_is_malformed() {
        let t = table(&[("DRY_RUN", "true".into())]);
        let err = Profile::from_table("w", "default", &t).unwrap_err();
        assert!(err.to_string().contains("missing NODE_ENV"), "got: {err}");
    }

    #[test]
    fn empty_node_env_is_malformed() {
        let t = table(&[("NODE_ENV", "  ".into()), ("DRY_RUN", "true".into())]);
        assert!(Profile::from_table("w", "default", &t).is_err());
    }

    #[test]
    fn bad_dry_run_value_is_malformed() {
        let t = table(&[("NODE_ENV", "development".into()), ("DRY_RUN", "sometimes".into())]);
        let err = Profile::from_table("w", "default", &t).unwrap_err();
        assert!(err.to_string().contains("sometimes"), "got: {err}");
    }

    #[test]
    fn invalid_variable_name_is_malformed() {
        let t = table(&[
            ("NODE_ENV", "development".into()),
            ("DRY_RUN", "true".into()),
            ("1BAD-NAME", "x".into()),
        ]);
        let err = Profile::from_table("w", "default", &t).unwrap_err();
        assert!(err.to_string().contains("1BAD-NAME"), "got: {err}");
    }

    #[test]
    fn profile_keys() {
        assert_eq!(profile_key(DEFAULT_PROFILE), "env");
        assert_eq!(profile_key(PRODUCTION_PROFILE), "env_production");
    }
}
