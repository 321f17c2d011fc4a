//! Endpoint classification
//!
//! Session endpoints in the descriptor are plain strings. This module turns
//! them into typed [`Endpoint`]s and rejects combinations the sidecar cannot
//! serve.
//!
//! Address forms:
//!
//! - `volume://<volume>[/<subpath>]` - a named volume mounted into the sidecar
//! - `network://<network>:<protocol>:<address>` - a forwarding address reached
//!   from inside the sidecar, attached to `<network>`
//! - `<protocol>:<address>` - a local forwarding address (`tcp:localhost:8080`)
//! - anything else without a scheme - a local filesystem path

use berth_protocol::SessionUrl;
use std::path::{Component, Path, PathBuf};

use crate::error::EndpointError;
use crate::types::OsType;

/// Prefix of volume endpoints
pub const VOLUME_PREFIX: &str = "volume://";

/// Prefix of network endpoints
pub const NETWORK_PREFIX: &str = "network://";

/// Forwarding protocols understood by the daemon
const FORWARDING_PROTOCOLS: [&str; 5] = ["tcp", "tcp4", "tcp6", "unix", "npipe"];

/// A classified endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A path or forwarding address on the local machine
    Local { path: String },

    /// A location inside a named volume, as seen from the sidecar
    Volume { volume: String, mount_path: String },

    /// A forwarding address reachable on a named network
    Network { network: String, address: String },
}

impl Endpoint {
    /// Whether this endpoint lives in a volume
    pub fn is_volume(&self) -> bool {
        matches!(self, Endpoint::Volume { .. })
    }

    /// Session URL for this endpoint.
    ///
    /// Volume and network endpoints point into the sidecar and therefore
    /// become placeholders until the sidecar container exists.
    pub fn to_url(&self) -> SessionUrl {
        match self {
            Endpoint::Local { path } => SessionUrl::local(path.clone()),
            Endpoint::Volume { mount_path, .. } => SessionUrl::sidecar(mount_path.clone()),
            Endpoint::Network { address, .. } => SessionUrl::sidecar(address.clone()),
        }
    }
}

/// Coarse shape of an address string, before role-specific checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressForm {
    Local,
    Volume,
    Network,
    /// Some other remote protocol (`docker://`, `user@host:path`, ...)
    Unsupported,
}

/// Determine the shape of an address string
pub fn address_form(raw: &str) -> AddressForm {
    if raw.starts_with(VOLUME_PREFIX) {
        AddressForm::Volume
    } else if raw.starts_with(NETWORK_PREFIX) {
        AddressForm::Network
    } else if raw.contains("://") || is_scp_style(raw) {
        AddressForm::Unsupported
    } else {
        AddressForm::Local
    }
}

/// `[user@]host:path` where the colon comes before any path separator.
///
/// Windows drive letters are treated as local paths on Windows hosts.
fn is_scp_style(raw: &str) -> bool {
    let Some(colon) = raw.find(':') else {
        return false;
    };
    if raw[..colon].contains('/') || raw[..colon].contains('\\') {
        return false;
    }
    if cfg!(windows) && colon == 1 && raw.as_bytes()[0].is_ascii_alphabetic() {
        return false;
    }
    true
}

/// Whether a volume or network name is well formed
pub fn is_valid_resource_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Classifies endpoint strings for one descriptor-processing pass
#[derive(Debug, Clone)]
pub struct Classifier {
    working_dir: PathBuf,
    os_type: OsType,
}

impl Classifier {
    /// Create a classifier resolving relative paths against `working_dir`
    pub fn new(working_dir: impl Into<PathBuf>, os_type: OsType) -> Self {
        Self {
            working_dir: working_dir.into(),
            os_type,
        }
    }

    /// Classify a forwarding source: a local TCP address
    pub fn forwarding_source(&self, raw: &str) -> Result<Endpoint, EndpointError> {
        if raw.starts_with(NETWORK_PREFIX) {
            return Err(EndpointError::InvalidEndpoint {
                endpoint: raw.to_string(),
                reason: "network endpoints cannot be forwarding sources".to_string(),
            });
        }
        if raw.contains("://") {
            return Err(EndpointError::InvalidEndpoint {
                endpoint: raw.to_string(),
                reason: "forwarding sources must be local addresses".to_string(),
            });
        }

        ensure_tcp_address(raw, raw)?;
        Ok(Endpoint::Local {
            path: raw.to_string(),
        })
    }

    /// Classify a forwarding destination: a TCP address on a named network
    pub fn forwarding_destination(&self, raw: &str) -> Result<Endpoint, EndpointError> {
        let Some(rest) = raw.strip_prefix(NETWORK_PREFIX) else {
            return Err(EndpointError::ExpectedNetworkEndpoint {
                endpoint: raw.to_string(),
            });
        };

        let (network, address) = rest.split_once(':').ok_or_else(|| {
            EndpointError::InvalidEndpoint {
                endpoint: raw.to_string(),
                reason: "expected network://<network>:<protocol>:<address>".to_string(),
            }
        })?;

        if !is_valid_resource_name(network) {
            return Err(EndpointError::InvalidEndpoint {
                endpoint: raw.to_string(),
                reason: format!("invalid network name {:?}", network),
            });
        }

        ensure_tcp_address(raw, address)?;
        Ok(Endpoint::Network {
            network: network.to_string(),
            address: address.to_string(),
        })
    }

    /// Classify a single synchronization endpoint
    pub fn synchronization(&self, raw: &str) -> Result<Endpoint, EndpointError> {
        match address_form(raw) {
            AddressForm::Volume => self.volume(raw),
            AddressForm::Local => Ok(Endpoint::Local {
                path: self.resolve_local_path(raw)?,
            }),
            AddressForm::Network | AddressForm::Unsupported => {
                Err(EndpointError::UnsupportedProtocol {
                    endpoint: raw.to_string(),
                })
            }
        }
    }

    /// Classify both sides of a synchronization session.
    ///
    /// Exactly one side must be a volume.
    pub fn synchronization_pair(
        &self,
        alpha: &str,
        beta: &str,
    ) -> Result<(Endpoint, Endpoint), EndpointError> {
        let alpha_endpoint = self.synchronization(alpha)?;
        let beta_endpoint = self.synchronization(beta)?;

        if alpha_endpoint.is_volume() == beta_endpoint.is_volume() {
            return Err(EndpointError::AmbiguousVolumeRole {
                alpha: alpha.to_string(),
                beta: beta.to_string(),
            });
        }

        Ok((alpha_endpoint, beta_endpoint))
    }

    fn volume(&self, raw: &str) -> Result<Endpoint, EndpointError> {
        let rest = raw.strip_prefix(VOLUME_PREFIX).unwrap_or(raw);
        let (volume, subpath) = match rest.split_once('/') {
            Some((volume, subpath)) => (volume, subpath.trim_end_matches('/')),
            None => (rest, ""),
        };

        if !is_valid_resource_name(volume) {
            return Err(EndpointError::InvalidEndpoint {
                endpoint: raw.to_string(),
                reason: format!("invalid volume name {:?}", volume),
            });
        }
        if subpath.split('/').any(|c| c == "..") {
            return Err(EndpointError::InvalidEndpoint {
                endpoint: raw.to_string(),
                reason: "volume subpaths cannot leave the volume".to_string(),
            });
        }

        Ok(Endpoint::Volume {
            volume: volume.to_string(),
            mount_path: mount_path(self.os_type, volume, subpath),
        })
    }

    fn resolve_local_path(&self, raw: &str) -> Result<String, EndpointError> {
        if raw.is_empty() {
            return Err(EndpointError::PathResolutionFailed {
                path: raw.to_string(),
                reason: "empty path".to_string(),
            });
        }

        let expanded = expand_home(raw)?;
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            self.working_dir.join(expanded)
        };

        if !absolute.is_absolute() {
            return Err(EndpointError::PathResolutionFailed {
                path: raw.to_string(),
                reason: format!(
                    "working directory {} is not absolute",
                    self.working_dir.display()
                ),
            });
        }

        let normalized = normalize(&absolute);
        normalized
            .to_str()
            .map(str::to_string)
            .ok_or_else(|| EndpointError::PathResolutionFailed {
                path: raw.to_string(),
                reason: "path is not valid UTF-8".to_string(),
            })
    }
}

/// Directory the sidecar mounts a volume at
pub fn volume_mount_root(os_type: OsType, volume: &str) -> String {
    match os_type {
        OsType::Linux => format!("/volumes/{}", volume),
        OsType::Windows => format!("c:\\volumes\\{}", volume),
    }
}

fn mount_path(os_type: OsType, volume: &str, subpath: &str) -> String {
    let root = volume_mount_root(os_type, volume);
    if subpath.is_empty() {
        return root;
    }
    match os_type {
        OsType::Linux => format!("{}/{}", root, subpath),
        OsType::Windows => format!("{}\\{}", root, subpath.replace('/', "\\")),
    }
}

fn ensure_tcp_address(endpoint: &str, address: &str) -> Result<(), EndpointError> {
    let (protocol, target) = address.split_once(':').unwrap_or(("", address));
    if !FORWARDING_PROTOCOLS.contains(&protocol) || !protocol.starts_with("tcp") {
        return Err(EndpointError::UnsupportedTransport {
            endpoint: endpoint.to_string(),
        });
    }

    let valid = target
        .rsplit_once(':')
        .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
        .unwrap_or(false);
    if !valid {
        return Err(EndpointError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: format!("{:?} is not a host:port address", target),
        });
    }
    Ok(())
}

fn expand_home(raw: &str) -> Result<PathBuf, EndpointError> {
    let rest = match raw.strip_prefix('~') {
        Some(rest) => rest,
        None => return Ok(PathBuf::from(raw)),
    };

    if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\')) {
        return Err(EndpointError::PathResolutionFailed {
            path: raw.to_string(),
            reason: "only the current user's home directory can be referenced".to_string(),
        });
    }

    let home = dirs::home_dir().ok_or_else(|| EndpointError::PathResolutionFailed {
        path: raw.to_string(),
        reason: "unable to determine home directory".to_string(),
    })?;

    let rest = rest.trim_start_matches(['/', '\\']);
    Ok(if rest.is_empty() { home } else { home.join(rest) })
}

/// Lexically normalize an absolute path (no filesystem access)
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new("/srv/project", OsType::Linux)
    }

    #[test]
    fn test_address_forms() {
        assert_eq!(address_form("./data"), AddressForm::Local);
        assert_eq!(address_form("/abs/path"), AddressForm::Local);
        assert_eq!(address_form("volume://cache"), AddressForm::Volume);
        assert_eq!(address_form("network://backend:tcp:api:80"), AddressForm::Network);
        assert_eq!(address_form("docker://web/app"), AddressForm::Unsupported);
        assert_eq!(address_form("user@host:path"), AddressForm::Unsupported);
    }

    #[test]
    fn test_forwarding_source() {
        let endpoint = classifier().forwarding_source("tcp:localhost:8080").unwrap();
        assert_eq!(
            endpoint,
            Endpoint::Local {
                path: "tcp:localhost:8080".to_string()
            }
        );
        assert!(classifier().forwarding_source("tcp6:[::1]:8080").is_ok());
    }

    #[test]
    fn test_forwarding_source_rejects_non_tcp() {
        assert!(matches!(
            classifier().forwarding_source("./data"),
            Err(EndpointError::UnsupportedTransport { .. })
        ));
        assert!(matches!(
            classifier().forwarding_source("unix:/tmp/app.sock"),
            Err(EndpointError::UnsupportedTransport { .. })
        ));
        assert!(matches!(
            classifier().forwarding_source("network://backend:tcp:api:80"),
            Err(EndpointError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            classifier().forwarding_source("tcp:localhost"),
            Err(EndpointError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_forwarding_destination() {
        let endpoint = classifier()
            .forwarding_destination("network://backend:tcp:api:80")
            .unwrap();
        assert_eq!(
            endpoint,
            Endpoint::Network {
                network: "backend".to_string(),
                address: "tcp:api:80".to_string(),
            }
        );
        assert_eq!(endpoint.to_url(), SessionUrl::sidecar("tcp:api:80"));

        assert!(matches!(
            classifier().forwarding_destination("tcp:api:80"),
            Err(EndpointError::ExpectedNetworkEndpoint { .. })
        ));
        assert!(matches!(
            classifier().forwarding_destination("network://backend:unix:/x.sock"),
            Err(EndpointError::UnsupportedTransport { .. })
        ));
        assert!(matches!(
            classifier().forwarding_destination("network://-bad:tcp:api:80"),
            Err(EndpointError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_synchronization_pair() {
        let (alpha, beta) = classifier()
            .synchronization_pair("./app/../web", "volume://cache/assets/")
            .unwrap();
        assert_eq!(
            alpha,
            Endpoint::Local {
                path: "/srv/project/web".to_string()
            }
        );
        assert_eq!(
            beta,
            Endpoint::Volume {
                volume: "cache".to_string(),
                mount_path: "/volumes/cache/assets".to_string(),
            }
        );
    }

    #[test]
    fn test_synchronization_pair_requires_one_volume() {
        assert!(matches!(
            classifier().synchronization_pair("./a", "./b"),
            Err(EndpointError::AmbiguousVolumeRole { .. })
        ));
        assert!(matches!(
            classifier().synchronization_pair("volume://a", "volume://b"),
            Err(EndpointError::AmbiguousVolumeRole { .. })
        ));
    }

    #[test]
    fn test_synchronization_unsupported_protocols() {
        for raw in ["docker://web/app", "network://n:tcp:a:1", "host:path", "ssh://x/y"] {
            assert!(
                matches!(
                    classifier().synchronization(raw),
                    Err(EndpointError::UnsupportedProtocol { .. })
                ),
                "{} should be unsupported",
                raw
            );
        }
    }

    #[test]
    fn test_windows_mount_path() {
        let classifier = Classifier::new("/srv/project", OsType::Windows);
        let endpoint = classifier.synchronization("volume://cache/a/b").unwrap();
        assert_eq!(
            endpoint,
            Endpoint::Volume {
                volume: "cache".to_string(),
                mount_path: "c:\\volumes\\cache\\a\\b".to_string(),
            }
        );
    }

    #[test]
    fn test_home_expansion() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let endpoint = classifier().synchronization("~/code").unwrap();
        assert_eq!(
            endpoint,
            Endpoint::Local {
                path: home.join("code").to_string_lossy().into_owned()
            }
        );
        assert!(matches!(
            classifier().synchronization("~other/code"),
            Err(EndpointError::PathResolutionFailed { .. })
        ));
    }

    #[test]
    fn test_relative_working_dir_fails() {
        let classifier = Classifier::new("relative", OsType::Linux);
        assert!(matches!(
            classifier.synchronization("./data"),
            Err(EndpointError::PathResolutionFailed { .. })
        ));
    }

    #[test]
    fn test_invalid_volume_endpoints() {
        assert!(classifier().synchronization("volume://").is_err());
        assert!(classifier().synchronization("volume://cache/../etc").is_err());
    }
}
