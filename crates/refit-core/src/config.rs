//! Configuration file loading and parsing

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;

/// Configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["refit.yaml", "refit.yml"];

/// Default image registry host
pub const DEFAULT_REGISTRY: &str = "ghcr.io";

/// Group label applied to templates that do not declare one
pub const DEFAULT_GROUP: &str = "default";

/// One image-reference template from configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateEntry {
    /// Template string, e.g. `myorg/app:{v1.x}`
    pub pattern: String,

    /// Label clustering related replacements into one upgrade unit
    #[serde(default)]
    pub group: Option<String>,
}

impl TemplateEntry {
    /// Create an entry with the default group
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            group: None,
        }
    }

    /// The entry's group, falling back to [`DEFAULT_GROUP`]
    pub fn group(&self) -> &str {
        self.group.as_deref().unwrap_or(DEFAULT_GROUP)
    }
}

/// Per-repository registry credentials parsed from
/// `owner/repo=username,password`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEntry {
    /// Repository the credentials apply to, e.g. `myorg/app`
    pub repository: String,
    pub username: String,
    pub password: String,
}

impl AuthEntry {
    /// Parse an `owner/repo=username,password` entry
    pub fn parse(entry: &str) -> Result<Self> {
        let (repository, credentials) = entry
            .split_once('=')
            .ok_or_else(|| Error::invalid_auth_entry(entry))?;

        let (username, password) = credentials
            .split_once(',')
            .ok_or_else(|| Error::invalid_auth_entry(entry))?;

        if repository.is_empty() || !repository.contains('/') || username.is_empty() {
            return Err(Error::invalid_auth_entry(entry));
        }

        Ok(Self {
            repository: repository.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// The refit.yaml file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Registry host (or base URL) to resolve references against
    #[serde(default)]
    pub registry: Option<String>,

    /// Token-service host when it differs from the registry host
    #[serde(default)]
    pub auth_host: Option<String>,

    /// Image-reference templates to scan for
    #[serde(default)]
    pub templates: Vec<TemplateEntry>,

    /// Include globs (relative to the search root); empty means everything
    #[serde(default)]
    pub include: Vec<String>,

    /// Exclude globs (relative to the search root)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// `owner/repo=username,password` authentication entries
    #[serde(default)]
    pub auth: Vec<String>,
}

/// Loaded refit configuration merged with CLI-provided values
#[derive(Debug, Clone)]
pub struct RefitConfig {
    /// The parsed configuration file (defaulted when none was found)
    pub file: ConfigFile,

    /// Path the configuration was loaded from, if any
    pub config_path: Option<Utf8PathBuf>,
}

impl RefitConfig {
    /// Load configuration from the specified path or search for it.
    ///
    /// An explicit path must exist; when searching, a missing file is not
    /// an error since every setting can also come from CLI flags.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let found = match path {
            Some(p) => {
                let content = fs::read_to_string(p).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::config_not_found(p.as_str())
                    } else {
                        Error::Io(e)
                    }
                })?;
                Some((p.to_owned(), content))
            }
            None => Self::find_config()?,
        };

        match found {
            Some((config_path, content)) => {
                let file: ConfigFile = serde_yaml_ng::from_str(&content)?;
                Ok(Self {
                    file,
                    config_path: Some(config_path),
                })
            }
            None => Ok(Self {
                file: ConfigFile::default(),
                config_path: None,
            }),
        }
    }

    /// Search the current directory for a config file
    fn find_config() -> Result<Option<(Utf8PathBuf, String)>> {
        for name in CONFIG_FILE_NAMES {
            let candidate = Utf8PathBuf::from(name);
            match fs::read_to_string(&candidate) {
                Ok(content) => return Ok(Some((candidate, content))),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(None)
    }

    /// Merge CLI-provided values over the file contents.
    ///
    /// Templates and auth entries are additive; the registry and token
    /// host are overridden when given.
    pub fn merge_cli(
        mut self,
        registry: Option<String>,
        templates: Vec<String>,
        auth: Vec<String>,
        include: Vec<String>,
        exclude: Vec<String>,
    ) -> Self {
        if registry.is_some() {
            self.file.registry = registry;
        }
        self.file
            .templates
            .extend(templates.into_iter().map(TemplateEntry::new));
        self.file.auth.extend(auth);
        self.file.include.extend(include);
        self.file.exclude.extend(exclude);
        self
    }

    /// The effective registry host
    pub fn registry(&self) -> &str {
        self.file.registry.as_deref().unwrap_or(DEFAULT_REGISTRY)
    }

    /// Parse every configured authentication entry
    pub fn auth_entries(&self) -> Result<Vec<AuthEntry>> {
        self.file.auth.iter().map(|e| AuthEntry::parse(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth_entry() {
        let entry = AuthEntry::parse("myorg/app=robot,s3cret").unwrap();
        assert_eq!(entry.repository, "myorg/app");
        assert_eq!(entry.username, "robot");
        assert_eq!(entry.password, "s3cret");
    }

    #[test]
    fn test_parse_auth_entry_password_may_contain_commas() {
        let entry = AuthEntry::parse("myorg/app=robot,a,b,c").unwrap();
        assert_eq!(entry.password, "a,b,c");
    }

    #[test]
    fn test_parse_auth_entry_rejects_malformed() {
        assert!(AuthEntry::parse("myorg/app").is_err());
        assert!(AuthEntry::parse("myorg/app=nopassword").is_err());
        assert!(AuthEntry::parse("noslash=user,pass").is_err());
        assert!(AuthEntry::parse("=user,pass").is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refit.yaml");
        std::fs::write(
            &path,
            r#"
registry: registry.example.com
templates:
  - pattern: "myorg/app:{v1.x}"
    group: app-bump
  - pattern: "myorg/tool:{vx}"
include:
  - "**/*.yaml"
auth:
  - "myorg/app=robot,s3cret"
"#,
        )
        .unwrap();

        let utf8 = Utf8PathBuf::from_path_buf(path).unwrap();
        let config = RefitConfig::load(Some(&utf8)).unwrap();

        assert_eq!(config.registry(), "registry.example.com");
        assert_eq!(config.file.templates.len(), 2);
        assert_eq!(config.file.templates[0].group(), "app-bump");
        assert_eq!(config.file.templates[1].group(), DEFAULT_GROUP);
        assert_eq!(config.auth_entries().unwrap().len(), 1);
    }

    #[test]
    fn test_load_missing_explicit_path_is_an_error() {
        let result = RefitConfig::load(Some(Utf8Path::new("/nonexistent/refit.yaml")));
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }

    #[test]
    fn test_merge_cli_is_additive_for_templates() {
        let config = RefitConfig {
            file: ConfigFile {
                templates: vec![TemplateEntry::new("myorg/app:{v1.x}")],
                ..Default::default()
            },
            config_path: None,
        };

        let merged = config.merge_cli(
            Some("ghcr.io".to_string()),
            vec!["myorg/tool:{vx}".to_string()],
            vec![],
            vec![],
            vec![],
        );

        assert_eq!(merged.file.templates.len(), 2);
        assert_eq!(merged.registry(), "ghcr.io");
    }
}
