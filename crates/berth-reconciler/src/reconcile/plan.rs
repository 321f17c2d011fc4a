//! Classification and diffing of listed sessions
//!
//! Pure functions over listings; nothing here talks to the daemon.

use std::collections::BTreeMap;

use berth_protocol::{
    ForwardingSessionState, ForwardingSpecification, SessionId, SynchronizationSessionState,
    SynchronizationSpecification,
};

/// A session as reported by the daemon
pub trait ListedSession {
    fn identifier(&self) -> &SessionId;
    fn name(&self) -> &str;
}

impl ListedSession for ForwardingSessionState {
    fn identifier(&self) -> &SessionId {
        &self.identifier
    }

    fn name(&self) -> &str {
        &self.specification.name
    }
}

impl ListedSession for SynchronizationSessionState {
    fn identifier(&self) -> &SessionId {
        &self.identifier
    }

    fn name(&self) -> &str {
        &self.specification.name
    }
}

/// A specification that can be compared against a listed session
pub trait DesiredSession {
    type State: ListedSession;

    fn is_realized_by(&self, state: &Self::State) -> bool;
}

impl DesiredSession for ForwardingSpecification {
    type State = ForwardingSessionState;

    fn is_realized_by(&self, state: &ForwardingSessionState) -> bool {
        ForwardingSpecification::is_realized_by(self, state)
    }
}

impl DesiredSession for SynchronizationSpecification {
    type State = SynchronizationSessionState;

    fn is_realized_by(&self, state: &SynchronizationSessionState) -> bool {
        SynchronizationSpecification::is_realized_by(self, state)
    }
}

/// Listed sessions sorted into those to keep examining and those to drop
#[derive(Debug)]
pub struct Classification<'a, S> {
    /// First listed session for each desired name
    pub current: BTreeMap<&'a str, &'a S>,
    /// Orphans and duplicates, in listing order
    pub prune: Vec<SessionId>,
}

/// Sort listed sessions against the desired names.
///
/// A session whose name is not desired is an orphan. A session whose name
/// was already claimed by an earlier entry in the listing is a duplicate.
/// Both are pruned; the first claimant is current.
pub fn classify<'a, D, S>(
    desired: &BTreeMap<String, D>,
    listed: &'a [S],
) -> Classification<'a, S>
where
    S: ListedSession,
{
    let mut current = BTreeMap::new();
    let mut prune = Vec::new();

    for session in listed {
        let name = session.name();
        if !desired.contains_key(name) {
            tracing::debug!(name, id = %session.identifier(), "Orphaned session");
            prune.push(session.identifier().clone());
        } else if current.contains_key(name) {
            tracing::debug!(name, id = %session.identifier(), "Duplicate session");
            prune.push(session.identifier().clone());
        } else {
            current.insert(name, session);
        }
    }

    Classification { current, prune }
}

/// Changes needed to reach the desired set for one session kind
#[derive(Debug)]
pub struct Changes<'a, D> {
    /// Sessions to terminate, in classification order
    pub prune: Vec<SessionId>,
    /// Specifications to create, in name order
    pub create: Vec<&'a D>,
}

impl<D> Changes<'_, D> {
    /// Whether nothing needs to change
    pub fn is_empty(&self) -> bool {
        self.prune.is_empty() && self.create.is_empty()
    }
}

/// Compare desired specifications against current sessions.
///
/// Missing sessions are created. A current session whose endpoints or
/// configuration differ is pruned and its specification recreated.
pub fn diff<'a, D>(
    desired: &'a BTreeMap<String, D>,
    classification: Classification<'_, D::State>,
) -> Changes<'a, D>
where
    D: DesiredSession,
{
    let Classification { current, mut prune } = classification;
    let mut create = Vec::new();

    for (name, specification) in desired {
        match current.get(name.as_str()) {
            Some(state) if specification.is_realized_by(state) => {}
            Some(state) => {
                tracing::debug!(name = %name, id = %state.identifier(), "Stale session");
                prune.push(state.identifier().clone());
                create.push(specification);
            }
            None => create.push(specification),
        }
    }

    Changes { prune, create }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_protocol::{SessionStatus, SessionUrl};

    fn spec(name: &str, destination: &str) -> ForwardingSpecification {
        ForwardingSpecification {
            name: name.to_string(),
            source: SessionUrl::local("tcp:localhost:8080"),
            destination: SessionUrl::local(destination),
            configuration: Default::default(),
            configuration_source: Default::default(),
            configuration_destination: Default::default(),
            labels: BTreeMap::new(),
        }
    }

    fn state(id: &str, specification: ForwardingSpecification) -> ForwardingSessionState {
        ForwardingSessionState {
            identifier: SessionId::new(id),
            specification,
            status: SessionStatus::Forwarding,
            last_error: None,
        }
    }

    fn desired(specs: &[ForwardingSpecification]) -> BTreeMap<String, ForwardingSpecification> {
        specs.iter().map(|s| (s.name.clone(), s.clone())).collect()
    }

    #[test]
    fn test_classify_orphans_and_duplicates() {
        let desired = desired(&[spec("web", "tcp:api:80")]);
        let listed = vec![
            state("fwd_1", spec("web", "tcp:api:80")),
            state("fwd_2", spec("old", "tcp:api:80")),
            state("fwd_3", spec("web", "tcp:api:80")),
        ];

        let classification = classify(&desired, &listed);
        assert_eq!(classification.current.len(), 1);
        assert_eq!(classification.current["web"].identifier.as_str(), "fwd_1");
        assert_eq!(
            classification.prune,
            vec![SessionId::new("fwd_2"), SessionId::new("fwd_3")]
        );
    }

    #[test]
    fn test_diff_current_is_kept() {
        let desired = desired(&[spec("web", "tcp:api:80")]);
        let listed = vec![state("fwd_1", spec("web", "tcp:api:80"))];

        let changes = diff(&desired, classify(&desired, &listed));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_diff_stale_is_recreated() {
        let desired = desired(&[spec("web", "tcp:api:80")]);
        let listed = vec![state("fwd_1", spec("web", "tcp:api:8080"))];

        let changes = diff(&desired, classify(&desired, &listed));
        assert_eq!(changes.prune, vec![SessionId::new("fwd_1")]);
        assert_eq!(changes.create.len(), 1);
        assert_eq!(changes.create[0].name, "web");
    }

    #[test]
    fn test_diff_missing_is_created_in_name_order() {
        let desired = desired(&[spec("zeta", "tcp:a:1"), spec("alpha", "tcp:b:2")]);

        let changes = diff(&desired, classify(&desired, &[]));
        assert!(changes.prune.is_empty());
        let names: Vec<&str> = changes.create.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_nothing_desired_prunes_everything() {
        let desired: BTreeMap<String, ForwardingSpecification> = BTreeMap::new();
        let listed = vec![
            state("fwd_1", spec("web", "tcp:api:80")),
            state("fwd_2", spec("web", "tcp:api:80")),
            state("fwd_3", spec("db", "tcp:db:5432")),
        ];

        let changes = diff(&desired, classify(&desired, &listed));
        assert_eq!(changes.prune.len(), 3);
        assert!(changes.create.is_empty());
    }

    #[test]
    fn test_labels_do_not_make_a_session_stale() {
        let desired = desired(&[spec("web", "tcp:api:80")]);
        let mut listed_spec = spec("web", "tcp:api:80");
        listed_spec
            .labels
            .insert("extra".to_string(), "value".to_string());
        let listed = vec![state("fwd_1", listed_spec)];

        let changes = diff(&desired, classify(&desired, &listed));
        assert!(changes.is_empty());
    }
}
