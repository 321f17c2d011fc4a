//! Session endpoint URLs
//!
//! A session URL is what the daemon is told to connect to for one side of a
//! session. URLs that point into the sidecar container are built before the
//! container exists, so they start out as [`SessionUrl::Sidecar`] placeholders
//! and are rewritten into [`SessionUrl::Container`] once the container
//! identifier is known.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Environment variable carrying the container engine host for container URLs
pub const DAEMON_HOST_ENVIRONMENT_VARIABLE: &str = "DOCKER_HOST";

/// One endpoint of a session, as understood by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "snake_case")]
pub enum SessionUrl {
    /// A path or forwarding address on the local machine
    Local { path: String },

    /// A path or forwarding address inside the not-yet-created sidecar
    Sidecar { path: String },

    /// A path or forwarding address inside a concrete container
    Container {
        /// Full container identifier
        container: String,
        /// Path or forwarding address inside the container
        path: String,
        /// Environment used by the daemon to reach the container engine
        #[serde(default)]
        environment: BTreeMap<String, String>,
    },
}

impl SessionUrl {
    /// Create a local URL
    pub fn local(path: impl Into<String>) -> Self {
        SessionUrl::Local { path: path.into() }
    }

    /// Create a sidecar placeholder URL
    pub fn sidecar(path: impl Into<String>) -> Self {
        SessionUrl::Sidecar { path: path.into() }
    }

    /// The path or forwarding address carried by this URL
    pub fn path(&self) -> &str {
        match self {
            SessionUrl::Local { path }
            | SessionUrl::Sidecar { path }
            | SessionUrl::Container { path, .. } => path,
        }
    }

    /// Whether this URL still references the sidecar placeholder
    pub fn is_placeholder(&self) -> bool {
        matches!(self, SessionUrl::Sidecar { .. })
    }

    /// Rewrite a sidecar placeholder into a concrete container URL.
    ///
    /// Returns `true` if the URL was rewritten. Local and container URLs are
    /// left untouched.
    pub fn reify(&mut self, container: &str, daemon_host: &str) -> bool {
        let path = match self {
            SessionUrl::Sidecar { path } => std::mem::take(path),
            _ => return false,
        };

        let mut environment = BTreeMap::new();
        environment.insert(
            DAEMON_HOST_ENVIRONMENT_VARIABLE.to_string(),
            daemon_host.to_string(),
        );

        *self = SessionUrl::Container {
            container: container.to_string(),
            path,
            environment,
        };
        true
    }
}

impl fmt::Display for SessionUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionUrl::Local { path } => write!(f, "{}", path),
            SessionUrl::Sidecar { path } => write!(f, "sidecar:{}", path),
            SessionUrl::Container {
                container, path, ..
            } => {
                if path.starts_with('/') {
                    write!(f, "docker://{}{}", container, path)
                } else {
                    write!(f, "docker://{}:{}", container, path)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reify_placeholder() {
        let mut url = SessionUrl::sidecar("/volumes/cache");
        assert!(url.is_placeholder());
        assert!(url.reify("abc123", "unix:///var/run/docker.sock"));

        match &url {
            SessionUrl::Container {
                container,
                path,
                environment,
            } => {
                assert_eq!(container, "abc123");
                assert_eq!(path, "/volumes/cache");
                assert_eq!(
                    environment.get(DAEMON_HOST_ENVIRONMENT_VARIABLE).map(String::as_str),
                    Some("unix:///var/run/docker.sock")
                );
            }
            other => panic!("Expected container URL, got {:?}", other),
        }
        assert_eq!(url.to_string(), "docker://abc123/volumes/cache");
    }

    #[test]
    fn test_reify_leaves_local_untouched() {
        let mut url = SessionUrl::local("tcp:localhost:8080");
        assert!(!url.reify("abc123", "unix:///var/run/docker.sock"));
        assert_eq!(url, SessionUrl::local("tcp:localhost:8080"));
    }

    #[test]
    fn test_display_forwarding_container_url() {
        let mut url = SessionUrl::sidecar("tcp:api:80");
        url.reify("abc123", "tcp://engine:2375");
        assert_eq!(url.to_string(), "docker://abc123:tcp:api:80");
    }
}
