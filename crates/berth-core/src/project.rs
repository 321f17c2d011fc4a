//! Deployment descriptor model
//!
//! A typed view of a Compose project, covering only the parts berth reads or
//! writes: services with their volumes, networks, dependencies and labels, the
//! root network and volume declarations, and extension keys. Everything else
//! is carried through untouched in `extra` maps so that a project can be
//! written back to YAML and handed to the orchestrator.
//!
//! Short-syntax `depends_on` and `networks` lists are normalized to the long
//! map syntax on load.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ValidationError;

/// Condition that a dependency must reach before a service starts
pub const SERVICE_STARTED: &str = "service_started";

/// A loaded Compose project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub working_dir: PathBuf,

    #[serde(default)]
    pub services: BTreeMap<String, Service>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, Option<serde_yaml::Value>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, Option<serde_yaml::Value>>,

    /// Extension keys (`x-*`) and every other top-level key
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Project {
    /// Parse a project from YAML text
    pub fn from_yaml(
        yaml: &str,
        name: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Result<Self, ValidationError> {
        let mut project: Project =
            serde_yaml::from_str(yaml).map_err(ValidationError::InvalidDescriptor)?;
        let name = name.into();
        if !name.is_empty() {
            project.name = name;
        }
        project.working_dir = working_dir.into();
        Ok(project)
    }

    /// Load a project file, naming the project after its directory unless
    /// `name` or the file's own `name` key says otherwise
    pub fn load(path: &Path, name: Option<&str>) -> Result<Self, crate::BerthError> {
        let content = std::fs::read_to_string(path)?;
        let working_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let working_dir = if working_dir.is_absolute() {
            working_dir
        } else {
            std::env::current_dir()?.join(working_dir)
        };

        let mut project = Self::from_yaml(&content, name.unwrap_or_default(), &working_dir)?;
        if project.name.is_empty() {
            project.name = working_dir
                .file_name()
                .map(|n| normalize_project_name(&n.to_string_lossy()))
                .unwrap_or_default();
        }
        Ok(project)
    }

    /// Render the project as YAML
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Raw value of an extension key
    pub fn extension(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.extra.get(key)
    }

    /// Names of all services, in order
    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }
}

/// Lowercase and strip characters the orchestrator does not allow in names
fn normalize_project_name(raw: &str) -> String {
    raw.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect()
}

/// A `depends_on` entry in long syntax
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDependency {
    #[serde(default = "default_condition")]
    pub condition: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl ServiceDependency {
    /// Dependency that waits for the service to start
    pub fn started() -> Self {
        Self {
            condition: SERVICE_STARTED.to_string(),
            extra: BTreeMap::new(),
        }
    }
}

fn default_condition() -> String {
    SERVICE_STARTED.to_string()
}

/// A service volume mount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceVolume {
    /// `source:target[:mode]`
    Short(String),
    /// Long syntax mount
    Long(VolumeMount),
}

/// Long-syntax volume mount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeMount {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub target: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl VolumeMount {
    /// Named-volume mount
    pub fn volume(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: "volume".to_string(),
            source: Some(source.into()),
            target: target.into(),
            extra: BTreeMap::new(),
        }
    }
}

impl ServiceVolume {
    /// Name of the named volume this mount uses, if any
    pub fn named_volume(&self) -> Option<&str> {
        match self {
            ServiceVolume::Long(mount) if mount.kind == "volume" => mount.source.as_deref(),
            ServiceVolume::Long(_) => None,
            ServiceVolume::Short(spec) => {
                let (source, _) = spec.split_once(':')?;
                let is_path = source.starts_with(['.', '/', '~', '\\'])
                    || (source.len() >= 2 && source.as_bytes()[1] == b':');
                if source.is_empty() || is_path {
                    None
                } else {
                    Some(source)
                }
            }
        }
    }
}

/// A service definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Service {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<ServiceVolume>,

    #[serde(
        default,
        deserialize_with = "deserialize_networks",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub networks: BTreeMap<String, Option<serde_yaml::Value>>,

    #[serde(
        default,
        deserialize_with = "deserialize_depends_on",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub depends_on: BTreeMap<String, ServiceDependency>,

    #[serde(
        default,
        deserialize_with = "deserialize_labels",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub labels: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Service {
    /// Whether the service mounts any of the given named volumes
    pub fn mounts_any<'a>(&self, mut volumes: impl Iterator<Item = &'a String>) -> bool {
        let mounted: Vec<&str> = self
            .volumes
            .iter()
            .filter_map(ServiceVolume::named_volume)
            .collect();
        volumes.any(|v| mounted.contains(&v.as_str()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrMap<T> {
    List(Vec<String>),
    Map(BTreeMap<String, T>),
}

fn deserialize_networks<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Option<serde_yaml::Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match ListOrMap::<Option<serde_yaml::Value>>::deserialize(deserializer)? {
            ListOrMap::List(names) => names.into_iter().map(|n| (n, None)).collect(),
            ListOrMap::Map(map) => map,
        },
    )
}

fn deserialize_depends_on<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, ServiceDependency>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match ListOrMap::<Option<ServiceDependency>>::deserialize(deserializer)? {
            ListOrMap::List(names) => names
                .into_iter()
                .map(|n| (n, ServiceDependency::started()))
                .collect(),
            ListOrMap::Map(map) => map
                .into_iter()
                .map(|(n, d)| (n, d.unwrap_or_else(ServiceDependency::started)))
                .collect(),
        },
    )
}

fn deserialize_labels<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    match ListOrMap::<Option<String>>::deserialize(deserializer)? {
        ListOrMap::List(entries) => entries
            .into_iter()
            .map(|entry| match entry.split_once('=') {
                Some((k, v)) => Ok((k.to_string(), v.to_string())),
                None if !entry.is_empty() => Ok((entry, String::new())),
                None => Err(D::Error::custom("empty label")),
            })
            .collect(),
        ListOrMap::Map(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, v.unwrap_or_default()))
            .collect()),
    }
}
