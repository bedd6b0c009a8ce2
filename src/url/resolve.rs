use crate::url::Url;

/// Schemes that lead to a crawlable resource
const ACCEPTED_SCHEMES: &[&str] = &["http", "https"];

/// Resolves a reference found in markup against the page it was found on
///
/// Rules, in order:
/// - an explicit scheme other than http or https is rejected (`mailto:`,
///   `javascript:`, `data:`, ...)
/// - a protocol-relative `//host/path` takes the scheme of `base`
/// - a reference without `://`, or starting with `/`, is resolved as a path
///   relative to `base`
/// - anything else is parsed as an absolute address
///
/// # Arguments
///
/// * `address` - The reference as written in the document
/// * `base` - The URL of the document
///
/// # Returns
///
/// * `Some(Url)` - A valid absolute URL
/// * `None` - The reference is not a navigable web resource
///
/// # Examples
///
/// ```
/// use dirhunt::{full_url_address, Url};
///
/// let base = Url::new("http://domain.com/path/");
/// let url = full_url_address("../spam/eggs", &base).unwrap();
/// assert_eq!(url.as_str(), "http://domain.com/spam/eggs");
/// assert!(full_url_address("mailto:admin@domain.com", &base).is_none());
/// ```
pub fn full_url_address(address: &str, base: &Url) -> Option<Url> {
    let address = address.trim();

    // Skip empty and fragment-only references
    if address.is_empty() || address.starts_with('#') {
        return None;
    }

    if let Some((scheme, _)) = address.split_once(':') {
        let looks_like_scheme = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if looks_like_scheme
            && !ACCEPTED_SCHEMES
                .iter()
                .any(|accepted| scheme.eq_ignore_ascii_case(accepted))
        {
            return None;
        }
    }

    let protocol_relative;
    let address = if address.starts_with("//") {
        protocol_relative = format!("{}:{}", base.protocol()?, address);
        protocol_relative.as_str()
    } else {
        address
    };

    let url = if !address.contains("://") || address.starts_with('/') {
        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.set_path(address);
        url
    } else {
        Url::new(address)
    };

    url.is_valid().then_some(url)
}
