//! Session naming rules

/// Reserved entry name holding per-kind defaults
pub const DEFAULTS_ENTRY_NAME: &str = "defaults";

/// Check a session name against the naming grammar.
///
/// Names start with a letter and continue with letters, digits or `-`.
/// Letters and digits are Unicode-aware. The reserved `defaults` name is
/// never a valid session name.
pub fn is_valid_session_name(name: &str) -> bool {
    if name == DEFAULTS_ENTRY_NAME {
        return false;
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => {}
        _ => return false,
    }

    chars.all(|c| c.is_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_session_name("web"));
        assert!(is_valid_session_name("data-2"));
        assert!(is_valid_session_name("A"));
        assert!(is_valid_session_name("défaut"));
        assert!(is_valid_session_name("données-2"));
        assert!(is_valid_session_name("Ωmega"));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid_session_name(""));
        assert!(!is_valid_session_name("2fast"));
        assert!(!is_valid_session_name("-web"));
        assert!(!is_valid_session_name("web_app"));
        assert!(!is_valid_session_name("web app"));
        assert!(!is_valid_session_name("٣web"));
        assert!(!is_valid_session_name("web.app"));
        assert!(!is_valid_session_name("defaults"));
    }
}
