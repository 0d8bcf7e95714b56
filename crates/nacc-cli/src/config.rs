//! Gear configuration loaded from `nacc.toml`.
//!
//! The file is optional. Settings a command needs but the file (and the
//! command line) leave unset are reported as [`ConfigError::Missing`].

use std::path::{Path, PathBuf};

use nacc_model::{CenterId, DefaultModules, FieldNames, ModuleName};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "NACC_CONFIG";

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "nacc.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{setting}`: {message}")]
    Invalid {
        setting: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GearConfig {
    pub identifiers: IdentifiersConfig,
    pub scheduler: SchedulerConfig,
    pub lookup: LookupConfig,
    pub provisioning: ProvisioningConfig,
    pub transform: TransformConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentifiersConfig {
    /// SQLite registry file.
    pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub module_order: Vec<String>,
    pub queue_tags: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            module_order: Vec::new(),
            queue_tags: vec!["queued".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookupConfig {
    pub adcid: Option<u32>,
    pub module: Option<String>,
    pub date_field: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            adcid: None,
            module: None,
            date_field: FieldNames::VISITDATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisioningConfig {
    pub form_name: String,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            form_name: DefaultModules::ENROLLMENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformConfig {
    /// JSON file of per-module field filters.
    pub transformations: Option<PathBuf>,
}

fn module_setting(setting: &'static str, value: &str) -> Result<ModuleName, ConfigError> {
    ModuleName::new(value).map_err(|err| ConfigError::Invalid {
        setting,
        message: err.to_string(),
    })
}

impl GearConfig {
    /// Loads `path`, else the file named by `NACC_CONFIG`, else `nacc.toml`
    /// when present. Without any file the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .or_else(|| {
                    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                    default.is_file().then_some(default)
                }),
        };
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn database(&self) -> Result<&Path, ConfigError> {
        self.identifiers
            .database
            .as_deref()
            .ok_or(ConfigError::Missing("identifiers.database"))
    }

    pub fn module_order(&self) -> Result<Vec<ModuleName>, ConfigError> {
        if self.scheduler.module_order.is_empty() {
            return Err(ConfigError::Missing("scheduler.module_order"));
        }
        self.scheduler
            .module_order
            .iter()
            .map(|module| module_setting("scheduler.module_order", module))
            .collect()
    }

    pub fn lookup_center(&self) -> Result<CenterId, ConfigError> {
        self.lookup
            .adcid
            .map(CenterId::new)
            .ok_or(ConfigError::Missing("lookup.adcid"))
    }

    pub fn lookup_module(&self) -> Result<ModuleName, ConfigError> {
        let module = self
            .lookup
            .module
            .as_deref()
            .ok_or(ConfigError::Missing("lookup.module"))?;
        module_setting("lookup.module", module)
    }

    pub fn form_name(&self) -> Result<ModuleName, ConfigError> {
        module_setting("provisioning.form_name", &self.provisioning.form_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: GearConfig = toml::from_str("").unwrap();
        assert_eq!(config, GearConfig::default());
        assert_eq!(config.scheduler.queue_tags, vec!["queued"]);
        assert_eq!(config.form_name().unwrap().as_str(), "enroll");
        assert!(matches!(
            config.database(),
            Err(ConfigError::Missing("identifiers.database"))
        ));
    }

    #[test]
    fn sections_are_read() {
        let config: GearConfig = toml::from_str(
            r#"
            [identifiers]
            database = "registry.db"

            [scheduler]
            module_order = ["enroll", "UDS"]

            [lookup]
            adcid = 12
            module = "uds"
            "#,
        )
        .unwrap();
        assert_eq!(config.database().unwrap(), Path::new("registry.db"));
        let order: Vec<String> = config
            .module_order()
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(order, vec!["enroll", "uds"]);
        assert_eq!(config.lookup_center().unwrap(), CenterId::new(12));
        assert_eq!(config.lookup.date_field, "visitdate");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<GearConfig>("[lookup]\ncenter = 1\n").is_err());
    }

    #[test]
    fn bad_module_name_is_invalid() {
        let mut config = GearConfig::default();
        config.scheduler.module_order = vec!["uds4".to_string()];
        assert!(matches!(
            config.module_order(),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
