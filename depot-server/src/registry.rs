//! The repository registry: an immutable map from repository name to its
//! descriptor, built once at startup and shared read-only by every request.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, ConfigError, DEFAULT_MAX_ARTIFACT_SIZE};

/// Everything the request path needs to know about one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    pub name: String,
    /// Document root on the filesystem
    pub root: PathBuf,
    /// `user:password` entries granting read access. Empty means public.
    pub read_credentials: Vec<String>,
    pub deploy_enabled: bool,
    /// `user:password` entries granting deployment (and read) access
    pub deploy_credentials: Vec<String>,
    /// Upper bound on uploaded artifact size in bytes, always > 0
    pub max_artifact_size: u64,
}

impl RepositoryDescriptor {
    /// A public, read-only repository with the default size limit.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            read_credentials: Vec::new(),
            deploy_enabled: false,
            deploy_credentials: Vec::new(),
            max_artifact_size: DEFAULT_MAX_ARTIFACT_SIZE,
        }
    }

    pub fn with_read_credentials<I, S>(mut self, credentials: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read_credentials = credentials.into_iter().map(Into::into).collect();
        self
    }

    /// Enables deployment, gated by `credentials` when non-empty.
    pub fn with_deploy<I, S>(mut self, credentials: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deploy_enabled = true;
        self.deploy_credentials = credentials.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the size limit. Zero falls back to the default.
    pub fn with_max_artifact_size(mut self, limit: u64) -> Self {
        self.max_artifact_size = if limit == 0 {
            DEFAULT_MAX_ARTIFACT_SIZE
        } else {
            limit
        };
        self
    }

    /// A repository without read credentials can be read by anyone.
    pub fn is_public(&self) -> bool {
        self.read_credentials.is_empty()
    }

    /// URL prefix the repository is served under.
    pub fn route(&self) -> String {
        format!("/repository/{}/", self.name)
    }
}

/// Checks a repository name can be used verbatim as a single path segment.
pub fn validate_repository_name(name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.contains('/') {
        Some("name contains '/'")
    } else if name == "." || name == ".." {
        Some("name is a relative path component")
    } else if name.chars().any(char::is_control) {
        Some("name contains control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidRepositoryName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Read-only repository lookup, sorted by name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    repositories: BTreeMap<String, Arc<RepositoryDescriptor>>,
}

impl Registry {
    /// Builds the registry from validated configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::from_descriptors(config.repositories.iter().map(|(name, repo)| {
            RepositoryDescriptor {
                name: name.clone(),
                root: repo.path.clone(),
                read_credentials: repo.credentials.clone(),
                deploy_enabled: repo.deploy,
                deploy_credentials: repo.deploy_credentials.clone(),
                max_artifact_size: repo.max_artifact_size,
            }
            .with_max_artifact_size(repo.max_artifact_size)
        }))
    }

    /// Builds the registry from descriptors, rejecting invalid or duplicate names.
    pub fn from_descriptors<I>(descriptors: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = RepositoryDescriptor>,
    {
        let mut repositories = BTreeMap::new();
        for descriptor in descriptors {
            validate_repository_name(&descriptor.name)?;
            if descriptor.root.as_os_str().is_empty() {
                return Err(ConfigError::MissingRepositoryPath {
                    name: descriptor.name,
                });
            }
            if repositories.contains_key(&descriptor.name) {
                return Err(ConfigError::DuplicateRepository {
                    name: descriptor.name,
                });
            }
            repositories.insert(descriptor.name.clone(), Arc::new(descriptor));
        }
        Ok(Self { repositories })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RepositoryDescriptor>> {
        self.repositories.get(name)
    }

    /// Descriptors in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RepositoryDescriptor>> {
        self.repositories.values()
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepositoryConfig;

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.repositories.insert(
            "releases".to_string(),
            RepositoryConfig {
                path: "/srv/releases".into(),
                credentials: vec!["alice:secret".to_string()],
                deploy: true,
                deploy_credentials: vec!["bob:topsecret".to_string()],
                max_artifact_size: 0,
            },
        );

        let registry = Registry::from_config(&config).unwrap();
        let releases = registry.get("releases").unwrap();

        assert_eq!(releases.root, PathBuf::from("/srv/releases"));
        assert!(!releases.is_public());
        assert!(releases.deploy_enabled);
        assert_eq!(releases.max_artifact_size, DEFAULT_MAX_ARTIFACT_SIZE);
        assert_eq!(releases.route(), "/repository/releases/");
    }

    #[test]
    fn test_rejects_invalid_names() {
        for name in ["", "a/b", "/", ".", "..", "bad\nname"] {
            let result = Registry::from_descriptors([RepositoryDescriptor::new(name, "/srv")]);
            assert!(
                matches!(result, Err(ConfigError::InvalidRepositoryName { .. })),
                "{name:?} accepted"
            );
        }
    }

    #[test]
    fn test_rejects_duplicates() {
        let result = Registry::from_descriptors([
            RepositoryDescriptor::new("libs", "/srv/a"),
            RepositoryDescriptor::new("libs", "/srv/b"),
        ]);
        assert!(matches!(
            result,
            Err(ConfigError::DuplicateRepository { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_path() {
        let result = Registry::from_descriptors([RepositoryDescriptor::new("libs", "")]);
        assert!(matches!(
            result,
            Err(ConfigError::MissingRepositoryPath { .. })
        ));
    }

    #[test]
    fn test_iteration_is_sorted() {
        let registry = Registry::from_descriptors([
            RepositoryDescriptor::new("snapshots", "/srv/s"),
            RepositoryDescriptor::new("libs", "/srv/l"),
            RepositoryDescriptor::new("releases", "/srv/r"),
        ])
        .unwrap();

        let names: Vec<&str> = registry.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["libs", "releases", "snapshots"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_builder_zero_limit_uses_default() {
        let repo = RepositoryDescriptor::new("libs", "/srv").with_max_artifact_size(0);
        assert_eq!(repo.max_artifact_size, DEFAULT_MAX_ARTIFACT_SIZE);
    }
}
