use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use shelf_container::ArchiveContainer;
use std::path::{Path, PathBuf};
use tracing::instrument;

const ENV_PREFIX: &str = "SHELF_";
const FILE_STEM: &str = "config";

/// Settings for archive import and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Read/write buffer size for archive streams, in bytes.
    pub buffer_size: usize,
    /// Minimum time between two progress updates.
    pub progress_interval_ms: u64,
    /// Covers smaller than this are treated as corrupt and skipped on import.
    pub min_cover_size: u64,
    /// How many failed lines an import report lists before eliding the rest.
    pub report_failed_lines: usize,
    /// Container written when the caller does not ask for one.
    pub container: ArchiveContainer,
}
impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            buffer_size: 64 * 1024,
            progress_interval_ms: 200,
            min_cover_size: 2048,
            report_failed_lines: 10,
            container: ArchiveContainer::Zip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding cover images.
    pub covers: PathBuf,
    /// Catalog database file, needed to export a raw database copy.
    pub database: Option<PathBuf>,
    pub backup: BackupConfig,
}
impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs().map(|dirs| dirs.data_dir().to_path_buf());
        Self {
            covers: data_dir.clone().unwrap_or_default().join("covers"),
            database: data_dir.map(|dir| dir.join("catalog.db")),
            backup: BackupConfig::default(),
        }
    }
}

impl Config {
    /// Load from defaults, every config file found in the platform config
    /// directory, then the environment.
    #[instrument]
    pub fn load() -> Result<Self> {
        let mut figment = Self::defaults();
        if let Some(dirs) = project_dirs() {
            let dir = dirs.config_dir();
            tracing::debug!(dir = %dir.display(), "looking for configuration files");
            figment = figment
                .merge(Toml::file(dir.join(format!("{FILE_STEM}.toml"))))
                .merge(Yaml::file(dir.join(format!("{FILE_STEM}.yaml"))))
                .merge(Json::file(dir.join(format!("{FILE_STEM}.json"))));
        }
        Self::finish(figment)
    }

    /// Load from defaults, one explicit file (format chosen by extension),
    /// then the environment.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_lowercase);
        let figment = match extension.as_deref() {
            Some("yaml" | "yml") => Self::defaults().merge(Yaml::file(path)),
            Some("json") => Self::defaults().merge(Json::file(path)),
            _ => Self::defaults().merge(Toml::file(path)),
        };
        Self::finish(figment)
    }

    /// Reject values that load fine but cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.backup.buffer_size == 0 {
            exn::bail!(ErrorKind::Invalid { field: "backup.buffer_size", reason: "must not be zero".to_string() });
        }
        if !self.covers.is_absolute() {
            exn::bail!(ErrorKind::Invalid {
                field: "covers",
                reason: format!("must be an absolute path, got {}", self.covers.display()),
            });
        }
        if let Some(database) = &self.database
            && !database.is_absolute()
        {
            exn::bail!(ErrorKind::Invalid {
                field: "database",
                reason: format!("must be an absolute path, got {}", database.display()),
            });
        }
        Ok(())
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    fn finish(figment: Figment) -> Result<Self> {
        let config: Config =
            figment.merge(Env::prefixed(ENV_PREFIX).split("__")).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "shelf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn valid() -> Config {
        Config { covers: PathBuf::from("/var/lib/shelf/covers"), database: None, ..Default::default() }
    }

    #[test]
    fn test_defaults() {
        let config = BackupConfig::default();
        assert_eq!(config.buffer_size, 65536);
        assert_eq!(config.min_cover_size, 2048);
        assert_eq!(config.report_failed_lines, 10);
        assert_eq!(config.container, ArchiveContainer::Zip);
    }

    #[test]
    fn test_validate_accepts_absolute_paths() {
        assert!(valid().validate().is_ok());
    }

    #[rstest]
    #[case(Config { backup: BackupConfig { buffer_size: 0, ..Default::default() }, ..valid() }, "backup.buffer_size")]
    #[case(Config { covers: PathBuf::from("covers"), ..valid() }, "covers")]
    #[case(Config { database: Some(PathBuf::from("catalog.db")), ..valid() }, "database")]
    fn test_validate_rejects(#[case] config: Config, #[case] expected: &str) {
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid { field, .. } if *field == expected));
    }

    #[test]
    fn test_load_from_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "shelf.toml",
                r#"
                covers = "/srv/covers"
                [backup]
                container = "json"
                min_cover_size = 10
                "#,
            )?;
            jail.set_env("SHELF_BACKUP__MIN_COVER_SIZE", "20");
            let config = Config::load_from(jail.directory().join("shelf.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.covers, PathBuf::from("/srv/covers"));
            assert_eq!(config.backup.container, ArchiveContainer::Json);
            assert_eq!(config.backup.min_cover_size, 20);
            assert_eq!(config.backup.buffer_size, 65536);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file("shelf.yaml", "covers: /srv/covers\nbackup:\n  report_failed_lines: 3\n")?;
            let config = Config::load_from(jail.directory().join("shelf.yaml")).map_err(|e| e.to_string())?;
            assert_eq!(config.backup.report_failed_lines, 3);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.create_file("shelf.toml", "covers = \"/srv/covers\"\n[backup]\nbuffer_size = 0\n")?;
            let err = Config::load_from(jail.directory().join("shelf.toml")).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid { .. }));
            Ok(())
        });
    }
}
