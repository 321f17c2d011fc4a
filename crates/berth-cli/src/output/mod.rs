//! Output formatting utilities for the CLI
//!
//! Tables for planned and live sessions, and colored status messages.

use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use berth_protocol::{ForwardingSessionState, SynchronizationSessionState};
use berth_reconciler::spec::Dependencies;
use berth_reconciler::Specifications;

/// Format planned sessions as an ASCII table
///
/// Forwarding sessions are listed first, then synchronization sessions, each
/// in name order.
pub fn format_specifications(specifications: &Specifications) -> String {
    if specifications.is_empty() {
        return "No sessions defined".to_string();
    }

    #[derive(Tabled)]
    struct SpecificationRow {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "KIND")]
        kind: &'static str,
        #[tabled(rename = "FROM")]
        from: String,
        #[tabled(rename = "TO")]
        to: String,
    }

    let forwarding = specifications
        .forwarding
        .values()
        .map(|s| SpecificationRow {
            name: s.name.clone(),
            kind: "forward",
            from: s.source.to_string(),
            to: s.destination.to_string(),
        });
    let synchronization = specifications
        .synchronization
        .values()
        .map(|s| SpecificationRow {
            name: s.name.clone(),
            kind: "sync",
            from: s.alpha.to_string(),
            to: s.beta.to_string(),
        });
    let rows: Vec<SpecificationRow> = forwarding.chain(synchronization).collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format the networks and volumes the sidecar attaches to
pub fn format_dependencies(dependencies: &Dependencies) -> String {
    let join = |names: &std::collections::BTreeSet<String>| {
        if names.is_empty() {
            "-".to_string()
        } else {
            names.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    format!(
        "Networks: {}\nVolumes: {}",
        join(&dependencies.networks),
        join(&dependencies.volumes)
    )
}

/// Format live forwarding sessions as an ASCII table
pub fn format_forwarding_sessions(sessions: &[ForwardingSessionState]) -> String {
    if sessions.is_empty() {
        return "No forwarding sessions".to_string();
    }

    #[derive(Tabled)]
    struct ForwardingRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "SOURCE")]
        source: String,
        #[tabled(rename = "DESTINATION")]
        destination: String,
        #[tabled(rename = "STATUS")]
        status: String,
    }

    let rows: Vec<ForwardingRow> = sessions
        .iter()
        .map(|s| ForwardingRow {
            id: truncate(s.identifier.as_str(), 12),
            name: s.specification.name.clone(),
            source: s.specification.source.path().to_string(),
            destination: s.specification.destination.path().to_string(),
            status: status_text(&s.status.to_string(), s.last_error.as_deref()),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format live synchronization sessions as an ASCII table
pub fn format_synchronization_sessions(sessions: &[SynchronizationSessionState]) -> String {
    if sessions.is_empty() {
        return "No synchronization sessions".to_string();
    }

    #[derive(Tabled)]
    struct SynchronizationRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "ALPHA")]
        alpha: String,
        #[tabled(rename = "BETA")]
        beta: String,
        #[tabled(rename = "STATUS")]
        status: String,
    }

    let rows: Vec<SynchronizationRow> = sessions
        .iter()
        .map(|s| SynchronizationRow {
            id: truncate(s.identifier.as_str(), 12),
            name: s.specification.name.clone(),
            alpha: s.specification.alpha.path().to_string(),
            beta: s.specification.beta.path().to_string(),
            status: status_text(&s.status.to_string(), s.last_error.as_deref()),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(120))
        .to_string()
}

fn status_text(status: &str, last_error: Option<&str>) -> String {
    match last_error {
        Some(error) => format!("{} ({})", status, error),
        None => status.to_string(),
    }
}

/// Truncate a string with ellipsis if too long
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow to stderr
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 12), "abc");
        assert_eq!(truncate("0123456789abcdef", 12), "012345678...");
    }

    #[test]
    fn test_empty_tables() {
        assert_eq!(
            format_specifications(&Specifications::default()),
            "No sessions defined"
        );
        assert_eq!(format_forwarding_sessions(&[]), "No forwarding sessions");
        assert_eq!(
            format_synchronization_sessions(&[]),
            "No synchronization sessions"
        );
    }

    #[test]
    fn test_format_dependencies() {
        let mut dependencies = Dependencies::default();
        dependencies.volumes.insert("cache".to_string());
        assert_eq!(
            format_dependencies(&dependencies),
            "Networks: -\nVolumes: cache"
        );
    }
}
