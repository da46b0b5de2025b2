//! Configuration for opdsfeed.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (OPDSFEED_API_KEY, OPDSFEED_DATABASE, OPDSFEED_OUTPUT_DIR)
//! 2. Config file (`--config <path>`, else .opdsfeed/config.yaml)
//! 3. Defaults (~/.opdsfeed)
//!
//! Config file discovery:
//! - Searches current directory and parents for .opdsfeed/config.yaml
//! - Paths in config file are relative to the directory holding .opdsfeed/

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::catalog::client::{DEFAULT_BASE_URL, DEFAULT_PAGE_LENGTH};

/// Feed title used when none is configured
pub const DEFAULT_FEED_TITLE: &str = "Springer Test Feed";

/// Publications per feed page used when none is configured
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// File name stem of feed pages used when none is configured
pub const DEFAULT_BASE_NAME: &str = "springer";

const CONFIG_DIR: &str = ".opdsfeed";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub springer: SpringerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedConfig {
    pub title: Option<String>,
    /// Page address template; `{page}` is replaced by the page number
    pub base_url: Option<String>,
    /// Directory the pages are written to
    pub output_dir: Option<String>,
    /// Page files are named `<base_name>_<page>.json`
    pub base_name: Option<String>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpringerConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub page_length: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Default location for state (~/.opdsfeed)
    pub home: PathBuf,
    /// SQLite database file
    pub database: PathBuf,
    /// Directory feed pages are written to
    pub output_dir: PathBuf,
    /// Feed settings
    pub feed: FeedSettings,
    /// Catalog API settings
    pub springer: SpringerSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub title: String,
    pub base_url: String,
    pub base_name: String,
    pub page_size: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct SpringerSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub page_length: usize,
}

impl SpringerSettings {
    /// API key, required for any catalog request
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().context(
            "No Springer API key configured (set springer.api_key or OPDSFEED_API_KEY)",
        )
    }
}

impl ResolvedConfig {
    /// Load from an explicit file, or discover one from the current directory
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let default_home = dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(CONFIG_DIR);

        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(),
        };

        let file = match config_path {
            Some(ref path) => Some((path.as_path(), load_config_file(path)?)),
            None => None,
        };

        resolve(file, default_home, |key| std::env::var(key).ok())
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's base directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Directory relative config paths are resolved against
fn base_dir(config_path: &Path) -> PathBuf {
    let parent = config_path.parent().unwrap_or(Path::new("."));
    if parent.file_name().is_some_and(|name| name == CONFIG_DIR) {
        parent.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        parent.to_path_buf()
    }
}

/// Merge defaults, file values and environment overrides
fn resolve(
    file: Option<(&Path, ConfigFile)>,
    default_home: PathBuf,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let (config_file, base, config) = match file {
        Some((path, config)) => (Some(path.to_path_buf()), Some(base_dir(path)), Some(config)),
        None => (None, None, None),
    };

    let feed = config.as_ref().map(|c| c.feed.clone()).unwrap_or_default();
    let springer = config.as_ref().map(|c| c.springer.clone()).unwrap_or_default();
    let database = config.as_ref().map(|c| c.database.clone()).unwrap_or_default();

    let configured = |value: Option<&String>| -> Option<PathBuf> {
        match (value, base.as_deref()) {
            (Some(v), Some(base)) => Some(resolve_path(base, v)),
            (Some(v), None) => Some(PathBuf::from(v)),
            _ => None,
        }
    };

    let database = env("OPDSFEED_DATABASE")
        .map(PathBuf::from)
        .or_else(|| configured(database.path.as_ref()))
        .unwrap_or_else(|| default_home.join("books.db"));

    let output_dir = env("OPDSFEED_OUTPUT_DIR")
        .map(PathBuf::from)
        .or_else(|| configured(feed.output_dir.as_ref()))
        .unwrap_or_else(|| default_home.join("feed"));

    let page_size = NonZeroUsize::new(feed.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
        .context("feed.page_size must be at least 1")?;

    let base_name = feed
        .base_name
        .unwrap_or_else(|| DEFAULT_BASE_NAME.to_string());

    let base_url = feed
        .base_url
        .unwrap_or_else(|| format!("{}_{{page}}.json", base_name));

    let feed = FeedSettings {
        title: feed.title.unwrap_or_else(|| DEFAULT_FEED_TITLE.to_string()),
        base_url,
        base_name,
        page_size,
    };

    let springer = SpringerSettings {
        api_key: env("OPDSFEED_API_KEY").or(springer.api_key),
        base_url: springer
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        page_length: springer.page_length.unwrap_or(DEFAULT_PAGE_LENGTH),
    };

    Ok(ResolvedConfig {
        home: default_home,
        database,
        output_dir,
        feed,
        springer,
        config_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let home = PathBuf::from("/home/user/.opdsfeed");
        let config = resolve(None, home.clone(), no_env).unwrap();

        assert_eq!(config.database, home.join("books.db"));
        assert_eq!(config.output_dir, home.join("feed"));
        assert_eq!(config.feed.title, DEFAULT_FEED_TITLE);
        assert_eq!(config.feed.page_size.get(), DEFAULT_PAGE_SIZE);
        assert_eq!(config.feed.base_url, "springer_{page}.json");
        assert_eq!(config.springer.base_url, DEFAULT_BASE_URL);
        assert!(config.springer.api_key.is_none());
        assert!(config.springer.require_api_key().is_err());
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_dir = temp.path().join(".opdsfeed");
        std::fs::create_dir_all(&config_dir).unwrap();

        let config_path = config_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1"
feed:
  title: "Columbia Springer Books"
  base_url: "https://example.org/opds/springer_{{page}}.json"
  output_dir: ./out
  page_size: 250
springer:
  api_key: abc123
  page_length: 20
database:
  path: ./data/books.db
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        assert_eq!(parsed.version, "1");
        assert_eq!(parsed.feed.page_size, Some(250));
        assert_eq!(parsed.springer.api_key.as_deref(), Some("abc123"));

        let config = resolve(
            Some((&config_path, parsed)),
            PathBuf::from("/unused"),
            no_env,
        )
        .unwrap();

        assert_eq!(config.feed.title, "Columbia Springer Books");
        assert_eq!(
            config.feed.base_url,
            "https://example.org/opds/springer_{page}.json"
        );
        assert_eq!(config.feed.page_size.get(), 250);
        assert_eq!(config.springer.page_length, 20);
        // Relative to the directory holding .opdsfeed/
        assert_eq!(config.database, temp.path().join("./data/books.db"));
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_env_overrides_file() {
        let parsed: ConfigFile = serde_yaml::from_str(
            "version: \"1\"\nspringer:\n  api_key: from-file\ndatabase:\n  path: /srv/books.db\n",
        )
        .unwrap();
        let env: HashMap<&str, &str> = [
            ("OPDSFEED_API_KEY", "from-env"),
            ("OPDSFEED_OUTPUT_DIR", "/srv/feed"),
        ]
        .into_iter()
        .collect();

        let config = resolve(
            Some((Path::new("/etc/opdsfeed/config.yaml"), parsed)),
            PathBuf::from("/home/user/.opdsfeed"),
            |key| env.get(key).map(|v| v.to_string()),
        )
        .unwrap();

        assert_eq!(config.springer.require_api_key().unwrap(), "from-env");
        assert_eq!(config.output_dir, PathBuf::from("/srv/feed"));
        assert_eq!(config.database, PathBuf::from("/srv/books.db"));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let parsed: ConfigFile =
            serde_yaml::from_str("version: \"1\"\nfeed:\n  page_size: 0\n").unwrap();
        let result = resolve(
            Some((Path::new("/tmp/config.yaml"), parsed)),
            PathBuf::from("/home/user/.opdsfeed"),
            no_env,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }

    #[test]
    fn test_base_dir() {
        assert_eq!(
            base_dir(Path::new("/proj/.opdsfeed/config.yaml")),
            PathBuf::from("/proj")
        );
        assert_eq!(
            base_dir(Path::new("/etc/opdsfeed/config.yaml")),
            PathBuf::from("/etc/opdsfeed")
        );
    }
}
