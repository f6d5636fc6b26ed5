//! Image reference parsing.
//!
//! Splits `registry.example.com:5000/team/app:1.2.3` style references
//! into domain, repository path and tag, following the engine's own
//! rules: the first segment is a domain only when it contains a dot or a
//! colon (or is `localhost`), and the default tag is `latest`.

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry domain; empty for default-registry references.
    pub domain: String,

    /// Repository path.
    pub path: String,

    /// Tag, when the reference carries one.
    pub tag: Option<String>,
}

/// Parses an image reference.
#[must_use]
pub fn parse(reference: &str) -> ImageReference {
    // Split off the tag: a colon after the last slash.
    let (remainder, tag) = match reference.rsplit_once(':') {
        Some((head, candidate)) if !candidate.contains('/') => {
            (head, Some(candidate.to_string()))
        }
        _ => (reference, None),
    };

    // Split off the domain: the first segment qualifies only when it can
    // be a host.
    let (domain, path) = match remainder.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (first.to_string(), rest.to_string())
        }
        _ => (String::new(), remainder.to_string()),
    };

    ImageReference { domain, path, tag }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_image() {
        let parsed = parse("nginx");
        assert_eq!(parsed.domain, "");
        assert_eq!(parsed.path, "nginx");
        assert!(parsed.tag.is_none());
    }

    #[test]
    fn test_image_with_tag() {
        let parsed = parse("nginx:1.25.0");
        assert_eq!(parsed.path, "nginx");
        assert_eq!(parsed.tag.as_deref(), Some("1.25.0"));
    }

    #[test]
    fn test_scoped_image() {
        let parsed = parse("grafana/grafana:10.0.0");
        assert_eq!(parsed.domain, "");
        assert_eq!(parsed.path, "grafana/grafana");
        assert_eq!(parsed.tag.as_deref(), Some("10.0.0"));
    }

    #[test]
    fn test_registry_with_port() {
        let parsed = parse("localhost:5000/team/app:2.0");
        assert_eq!(parsed.domain, "localhost:5000");
        assert_eq!(parsed.path, "team/app");
        assert_eq!(parsed.tag.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_registry_domain() {
        let parsed = parse("ghcr.io/owner/app");
        assert_eq!(parsed.domain, "ghcr.io");
        assert_eq!(parsed.path, "owner/app");
        assert!(parsed.tag.is_none());
    }

    #[test]
    fn test_no_domain_for_plain_owner() {
        let parsed = parse("library/nginx:latest");
        assert_eq!(parsed.domain, "");
        assert_eq!(parsed.path, "library/nginx");
    }
}
