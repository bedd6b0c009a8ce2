/// Checks whether `candidate` is `base` itself or one of its subdomains
///
/// # Arguments
///
/// * `candidate` - The domain to check
/// * `base` - The registered domain
///
/// # Examples
///
/// ```
/// use dirhunt::url::is_subdomain_of;
///
/// assert!(is_subdomain_of("example.com", "example.com"));
/// assert!(is_subdomain_of("api.v2.example.com", "example.com"));
/// assert!(!is_subdomain_of("badexample.com", "example.com"));
/// ```
pub fn is_subdomain_of(candidate: &str, base: &str) -> bool {
    candidate == base
        || candidate
            .strip_suffix(base)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Walks a domain up its parents, stopping at the two-label registrable part
///
/// `a.b.example.com` yields `a.b.example.com`, `b.example.com`, `example.com`.
pub fn parent_domains(domain: &str) -> impl Iterator<Item = &str> {
    let mut current = Some(domain);
    std::iter::from_fn(move || {
        let domain = current?;
        current = match domain.split_once('.') {
            Some((_, rest)) if rest.contains('.') => Some(rest),
            _ => None,
        };
        Some(domain)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(is_subdomain_of("example.com", "example.com"));
    }

    #[test]
    fn test_subdomain_match() {
        assert!(is_subdomain_of("blog.example.com", "example.com"));
        assert!(is_subdomain_of("api.v2.example.com", "example.com"));
    }

    #[test]
    fn test_no_partial_label_match() {
        assert!(!is_subdomain_of("myexample.com", "example.com"));
        assert!(!is_subdomain_of("example.com", "blog.example.com"));
        assert!(!is_subdomain_of("example.org", "example.com"));
    }

    #[test]
    fn test_parent_domains() {
        let parents: Vec<&str> = parent_domains("a.b.example.com").collect();
        assert_eq!(parents, vec!["a.b.example.com", "b.example.com", "example.com"]);
    }

    #[test]
    fn test_parent_domains_of_registrable_domain() {
        let parents: Vec<&str> = parent_domains("example.com").collect();
        assert_eq!(parents, vec!["example.com"]);

        let parents: Vec<&str> = parent_domains("localhost").collect();
        assert_eq!(parents, vec!["localhost"]);
    }
}
