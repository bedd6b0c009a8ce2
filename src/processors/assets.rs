//! Reference scanners for stylesheets and scripts

use crate::url::{full_url_address, Url};
use regex::Regex;
use std::sync::LazyLock;

static CSS_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*(?:"|')?(.+?)(?:"|')?\s*\)"#).expect("hardcoded regex pattern is valid")
});

// Quoted strings that look like absolute URLs, relative paths or file names
static JS_PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = concat!(
        r#"(?:"|')("#,
        r#"(?:[a-zA-Z]{1,10}://|//)[^"'/]{1,}\.[a-zA-Z]{2,}[^"']{0,}"#,
        r#"|"#,
        r#"(?:/|\.\./|\./)[^"'><,;| *()%$^/\\\[\]][^"'><,;|()]{1,}"#,
        r#"|"#,
        r#"[a-zA-Z0-9_\-/]{1,}/[a-zA-Z0-9_\-/]{1,}\.(?:[a-zA-Z]{1,4}|action)(?:[\?|/][^"|']{0,}|)"#,
        r#"|"#,
        r#"[a-zA-Z0-9_\-]{1,}\.(?:php|asp|aspx|jsp|json|action|html|js|txt|xml)(?:\?[^"|']{0,}|)"#,
        r#")(?:"|')"#,
    );
    Regex::new(pattern).expect("hardcoded regex pattern is valid")
});

/// `url(...)` references of a stylesheet, resolved against `base`
pub fn css_references(text: &str, base: &Url) -> Vec<Url> {
    CSS_URL_REGEX
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .filter_map(|reference| full_url_address(reference.as_str(), base))
        .collect()
}

/// Path-like string literals of a script, resolved against `base`
pub fn js_references(text: &str, base: &Url) -> Vec<Url> {
    JS_PATH_REGEX
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .filter_map(|reference| full_url_address(reference.as_str(), base))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::new("http://domain.com/path/")
    }

    fn addresses(urls: Vec<Url>) -> Vec<String> {
        urls.into_iter().map(|url| url.to_string()).collect()
    }

    #[test]
    fn test_css_url() {
        let css = r#"body { background-image: url("img/foo.png"); }"#;
        assert_eq!(
            addresses(css_references(css, &base())),
            vec!["http://domain.com/path/img/foo.png"]
        );
    }

    #[test]
    fn test_css_url_variants() {
        let css = "a { background: url( '/img/a.gif' ) } b { background: url(b.png) } \
                   c { background: url(data:image/png;base64,AAAA) }";
        assert_eq!(
            addresses(css_references(css, &base())),
            vec![
                "http://domain.com/img/a.gif",
                "http://domain.com/path/b.png"
            ]
        );
    }

    #[test]
    fn test_js_paths() {
        let js = r#"
            var a = "http://example.com" + "/wrong/file/test<>b" + "api/create.php?user=test";
            load("index.html");
        "#;
        let urls = js_references(js, &base());
        let paths: Vec<String> = urls
            .iter()
            .map(|url| format!("{}{}", url.domain().unwrap_or(""), url.path()))
            .collect();
        assert_eq!(
            paths,
            vec![
                "example.com/",
                "domain.com/path/api/create.php",
                "domain.com/path/index.html"
            ]
        );
    }

    #[test]
    fn test_js_ignores_plain_strings() {
        let js = r#"var greeting = "hello world"; var n = 'value';"#;
        assert!(js_references(js, &base()).is_empty());
    }
}
