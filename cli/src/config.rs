use eyre::WrapErr;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use storefront_stacks::{Code, Settings};

pub(crate) const CONFIG_FILE: &str = "storefront.toml";

/// Handlers' code directory bundled on deploy, unless configured otherwise
pub(crate) const CODE_DIR: &str = "lambda";

/// Overrides the bucket of the handlers' code bundle, e.g. per CI environment
pub(crate) const CODE_BUCKET_ENV: &str = "STOREFRONT_CODE_BUCKET";

/// Lambda limits
const MEMORY_RANGE: std::ops::RangeInclusive<u32> = 128..=10240;
const TIMEOUT_RANGE: std::ops::RangeInclusive<u32> = 1..=900;

/// ConfigFile is the structure of storefront.toml
///
/// Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigFile {
    /// [project]
    /// prefix = "staging"
    /// region = "eu-west-1"
    #[serde(default)]
    project: ProjectSection,

    /// [code]
    /// path = "lambda"
    /// bucket = "storefront-handlers"
    /// key = "lambda.zip"
    /// runtime = "nodejs20.x"
    #[serde(default)]
    code: CodeSection,

    /// [handler]
    /// memory = 256
    /// timeout = 10
    #[serde(default)]
    handler: HandlerSection,

    /// [api]
    /// stage = "prod"
    #[serde(default)]
    api: ApiSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectSection {
    prefix: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CodeSection {
    path: Option<PathBuf>,
    bucket: Option<String>,
    key: Option<String>,
    runtime: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HandlerSection {
    memory: Option<u32>,
    timeout: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApiSection {
    stage: Option<String>,
}

impl ConfigFile {
    /// Reads the config from storefront.toml in a given directory
    ///
    /// Returns a default config if the file does not exist.
    pub(crate) fn from_path(path: &Path) -> eyre::Result<Self> {
        let config_toml_path = path.join(CONFIG_FILE);

        let toml_string = match fs::read_to_string(&config_toml_path) {
            Ok(toml_string) => toml_string,

            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("{config_toml_path:?} not found, using defaults");
                return Ok(Self::default());
            }

            // An unreadable config must not fall back to the unprefixed stacks
            Err(e) => return Err(e).wrap_err(format!("Failed to read {config_toml_path:?}")),
        };

        toml::from_str(&toml_string).wrap_err(format!("Failed to parse {config_toml_path:?}"))
    }
}

/// Resolved configuration of the CLI
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Config {
    pub(crate) settings: Settings,

    /// Falls back to the AWS SDK's region resolution when not set
    pub(crate) region: Option<String>,

    /// Directory of the handlers' code to bundle and upload on deploy
    ///
    /// When `None`, handlers refer to a bundle uploaded beforehand at `code.key`.
    pub(crate) code_dir: Option<PathBuf>,
}

impl Config {
    /// Load the config of the project in the current directory
    pub(crate) fn from_current_dir() -> eyre::Result<Self> {
        let dir = std::env::current_dir().wrap_err("Failed to get current dir")?;
        let config = Config::from(ConfigFile::from_path(&dir)?)
            .with_code_bucket(std::env::var(CODE_BUCKET_ENV).ok())
            .with_code_dir_in(&dir)?;

        config.validate()?;
        Ok(config)
    }

    fn with_code_bucket(mut self, bucket: Option<String>) -> Self {
        if let Some(bucket) = bucket.filter(|b| !b.is_empty()) {
            self.settings.code.bucket = bucket;
        }

        self
    }

    /// Resolve the handlers' code directory against the project directory
    ///
    /// A configured path must exist, the default one is used only if it does.
    fn with_code_dir_in(mut self, project: &Path) -> eyre::Result<Self> {
        self.code_dir = match self.code_dir.take() {
            Some(path) => {
                let path = project.join(path);

                if !path.is_dir() {
                    eyre::bail!("Handlers' code directory {path:?} does not exist");
                }

                Some(path)
            }

            None => Some(project.join(CODE_DIR)).filter(|path| path.is_dir()),
        };

        Ok(self)
    }

    fn validate(&self) -> eyre::Result<()> {
        if !MEMORY_RANGE.contains(&self.settings.memory_size) {
            eyre::bail!(
                "Handler memory must be within {}..={} MB, got {}",
                MEMORY_RANGE.start(),
                MEMORY_RANGE.end(),
                self.settings.memory_size
            );
        }

        if !TIMEOUT_RANGE.contains(&self.settings.timeout) {
            eyre::bail!(
                "Handler timeout must be within {}..={} seconds, got {}",
                TIMEOUT_RANGE.start(),
                TIMEOUT_RANGE.end(),
                self.settings.timeout
            );
        }

        if self.settings.stage.is_empty() {
            eyre::bail!("API stage name can't be empty");
        }

        Ok(())
    }
}

impl From<ConfigFile> for Config {
    fn from(cfg: ConfigFile) -> Self {
        let defaults = Settings::default();

        Config {
            settings: Settings {
                prefix: cfg.project.prefix.filter(|p| !p.is_empty()),
                code: Code {
                    bucket: cfg.code.bucket.unwrap_or(defaults.code.bucket),
                    key: cfg.code.key.unwrap_or(defaults.code.key),
                },
                runtime: cfg.code.runtime.unwrap_or(defaults.runtime),
                memory_size: cfg.handler.memory.unwrap_or(defaults.memory_size),
                timeout: cfg.handler.timeout.unwrap_or(defaults.timeout),
                stage: cfg.api.stage.unwrap_or(defaults.stage),
            },
            region: cfg.project.region,
            code_dir: cfg.code.path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, content: &str) {
        fs::write(dir.join(CONFIG_FILE), content).unwrap();
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from(ConfigFile::from_path(dir.path()).unwrap());

        assert_eq!(config.settings, Settings::default());
        assert_eq!(config.region, None);
    }

    #[test]
    fn sections_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            r#"
            [project]
            prefix = "staging"
            region = "eu-west-1"

            [code]
            bucket = "acme-artifacts"

            [handler]
            memory = 512

            [api]
            stage = "v1"
            "#,
        );

        let config = Config::from(ConfigFile::from_path(dir.path()).unwrap());

        assert_eq!(config.settings.prefix.as_deref(), Some("staging"));
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.settings.code.bucket, "acme-artifacts");
        assert_eq!(config.settings.code.key, "lambda.zip");
        assert_eq!(config.settings.memory_size, 512);
        assert_eq!(config.settings.timeout, 3);
        assert_eq!(config.settings.stage, "v1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), b"[project]\nprefix = \"staging\xff\"\n").unwrap();

        let error = ConfigFile::from_path(dir.path()).unwrap_err();
        assert!(error.to_string().starts_with("Failed to read"));
    }

    #[test]
    fn config_path_taken_by_a_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(CONFIG_FILE)).unwrap();
        assert!(ConfigFile::from_path(dir.path()).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "[project]\nname = \"shop\"\n");
        assert!(ConfigFile::from_path(dir.path()).is_err());
    }

    #[test]
    fn env_bucket_overrides_file() {
        let config = Config::from(ConfigFile::default());

        let overridden = config.clone().with_code_bucket(Some("ci-bucket".into()));
        assert_eq!(overridden.settings.code.bucket, "ci-bucket");

        let unchanged = config.clone().with_code_bucket(Some("".into()));
        assert_eq!(unchanged.settings.code.bucket, config.settings.code.bucket);
    }

    #[test]
    fn default_code_dir_is_used_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from(ConfigFile::default());

        let without = config.clone().with_code_dir_in(dir.path()).unwrap();
        assert_eq!(without.code_dir, None);

        fs::create_dir(dir.path().join(CODE_DIR)).unwrap();
        let with = config.with_code_dir_in(dir.path()).unwrap();
        assert_eq!(with.code_dir, Some(dir.path().join(CODE_DIR)));
    }

    #[test]
    fn configured_code_dir_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "[code]\npath = \"handlers/dist\"\n");

        let config = Config::from(ConfigFile::from_path(dir.path()).unwrap());
        assert!(config.clone().with_code_dir_in(dir.path()).is_err());

        fs::create_dir_all(dir.path().join("handlers").join("dist")).unwrap();
        let resolved = config.with_code_dir_in(dir.path()).unwrap();
        assert_eq!(resolved.code_dir, Some(dir.path().join("handlers/dist")));
    }

    #[test]
    fn out_of_range_handler_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "[handler]\ntimeout = 1000\n");

        let config = Config::from(ConfigFile::from_path(dir.path()).unwrap());
        assert!(config.validate().is_err());
    }
}
