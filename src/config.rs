use crate::errors::{AppError, AppResult};
use crate::models::{Role, User};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "CALLCENTER_KPI_CONFIG";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    pub log_level: String,
    pub seed_users: Vec<SeedUser>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".callcenter-kpi"),
            database_file: "dashboard.sqlite".to_string(),
            log_level: "info".to_string(),
            seed_users: Vec::new(),
        }
    }
}

impl DashboardConfig {
    /// Resolves the config file: explicit path, then the env var, then
    /// `config.yaml` inside the data dir. A missing default file means defaults.
    pub fn load(explicit: Option<&Path>, data_dir_override: Option<&Path>) -> AppResult<Self> {
        let from_env = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        let required = explicit.map(Path::to_path_buf).or(from_env);

        let mut config = match required {
            Some(path) => Self::from_file(&path)?,
            None => {
                let data_dir = data_dir_override
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| Self::default().data_dir);
                let candidate = data_dir.join(CONFIG_FILE_NAME);
                if candidate.exists() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(data_dir) = data_dir_override {
            config.data_dir = data_dir.to_path_buf();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|error| AppError::Config(format!("cannot read {}: {}", path.display(), error)))?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> AppResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn seed_users(&self) -> Vec<User> {
        self.seed_users
            .iter()
            .map(|seed| User {
                email: seed.email.clone(),
                role: seed.role,
            })
            .collect()
    }

    fn validate(&self) -> AppResult<()> {
        if self.database_file.trim().is_empty() {
            return Err(AppError::Config("databaseFile must not be empty".to_string()));
        }
        if self.seed_users.iter().any(|seed| seed.email.trim().is_empty()) {
            return Err(AppError::Config("seedUsers entries need an email".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = DashboardConfig::from_yaml("").expect("parse");
        assert_eq!(config, DashboardConfig::default());
        assert!(config.database_path().ends_with("dashboard.sqlite"));
    }

    #[test]
    fn parses_seed_users_and_fills_missing_fields() {
        let config = DashboardConfig::from_yaml(
            "dataDir: /var/lib/kpi\nseedUsers:\n  - email: Boss@Example.com\n    role: Manager\n  - email: agent@example.com\n    role: Agent\n",
        )
        .expect("parse");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/kpi"));
        assert_eq!(config.log_level, "info");

        let users = config.seed_users();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].email, "Boss@Example.com");
        assert_eq!(users[1].role, Role::Agent);
    }

    #[test]
    fn rejects_unknown_role_as_config_error() {
        let error = DashboardConfig::from_yaml("seedUsers:\n  - email: a@example.com\n    role: Admin\n")
            .expect_err("bad role");
        assert!(matches!(error, AppError::Config(_)));
    }

    #[test]
    fn data_dir_override_wins_and_reads_config_inside_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "logLevel: debug\ndataDir: /elsewhere\n")
            .expect("write config");

        let config = DashboardConfig::load(Some(&dir.path().join(CONFIG_FILE_NAME)), Some(dir.path()))
            .expect("load");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.data_dir, dir.path());
    }
}
