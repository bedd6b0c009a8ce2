use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

/// Standard HTTP status codes, used to expand `NNN-MMM` flag ranges
const STATUS_CODES: &[u16] = &[
    100, 101, 102, //
    200, 201, 202, 203, 204, 205, 206, 207, 208, 226, //
    300, 301, 302, 303, 304, 305, 306, 307, 308, //
    400, 401, 402, 403, 404, 405, 406, 407, 408, 409, 410, 411, 412, 413, 414, 415, 416, 417,
    418, 421, 422, 423, 424, 425, 426, 428, 429, 431, 451, //
    500, 501, 502, 503, 504, 505, 506, 507, 508, 509, 510, 511,
];

/// Proxy alias for a local Tor client
const TOR_PROXY: &str = "socks5h://127.0.0.1:9150";

static STATUS_RANGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{3})-(\d{3})$").expect("hardcoded regex pattern is valid")
});

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use dirhunt::config::load_config;
///
/// let config = load_config(Path::new("dirhunt.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = read_config(path)?;
    validate(&config)?;
    Ok(config)
}

/// Reads a configuration file without validating it
///
/// Used when command-line values still have to be merged in.
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Returns true for values written like a local path
fn value_is_file_path(value: &str) -> bool {
    (value.starts_with('/') || value.starts_with("./")) && Path::new(value).is_file()
}

/// Non-empty, trimmed lines of a file
fn read_file_lines(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Splits a comma separated value, replacing file paths with their lines
///
/// # Example
///
/// ```
/// use dirhunt::config::comma_separated_files;
///
/// let values = comma_separated_files("php,zip").unwrap();
/// assert_eq!(values, vec!["php", "zip"]);
/// ```
pub fn comma_separated_files(value: &str) -> Result<Vec<String>, ConfigError> {
    let mut items = Vec::new();
    for item in value.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        if value_is_file_path(item) {
            items.extend(read_file_lines(Path::new(item))?);
        } else {
            items.push(item.to_string());
        }
    }
    Ok(items)
}

/// Expands seed arguments
///
/// An argument naming an existing file contributes the file's lines. Seeds
/// without a scheme are assumed to be plain HTTP.
pub fn expand_seeds(values: &[String]) -> Result<Vec<String>, ConfigError> {
    let mut seeds = Vec::new();
    for value in values {
        let path = Path::new(value);
        if path.is_file() {
            seeds.extend(read_file_lines(path)?);
        } else {
            seeds.push(value.trim().to_string());
        }
    }
    Ok(seeds.into_iter().map(|seed| force_scheme(&seed)).collect())
}

fn force_scheme(seed: &str) -> String {
    if seed.contains("://") {
        seed.to_string()
    } else {
        format!("http://{}", seed)
    }
}

/// Replaces every `NNN-MMM` flag with the known status codes in that range
pub fn flags_range(flags: &[String]) -> Vec<String> {
    let mut expanded = Vec::new();
    let mut ranges = Vec::new();
    for flag in flags {
        match STATUS_RANGE_REGEX.captures(flag) {
            Some(captures) => {
                let start: u16 = captures[1].parse().unwrap_or(0);
                let end: u16 = captures[2].parse().unwrap_or(0);
                ranges.extend(
                    STATUS_CODES
                        .iter()
                        .filter(|code| (start..=end).contains(*code))
                        .map(|code| code.to_string()),
                );
            }
            None => expanded.push(flag.clone()),
        }
    }
    expanded.extend(ranges);
    expanded
}

/// Parses `key:value` pairs such as cookies and headers
pub fn key_values(values: &[String]) -> Result<BTreeMap<String, String>, ConfigError> {
    values
        .iter()
        .map(|item| match item.split_once(':') {
            Some((key, value)) => Ok((key.trim().to_string(), value.trim().to_string())),
            None => Err(ConfigError::Validation(format!(
                "Expected a value with format key:value, got '{}'",
                item
            ))),
        })
        .collect()
}

/// Resolves proxy aliases
pub fn expand_proxies(proxies: &[String]) -> Vec<String> {
    proxies
        .iter()
        .map(|proxy| {
            if proxy.eq_ignore_ascii_case("tor") {
                TOR_PROXY.to_string()
            } else {
                proxy.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
urls = ["http://example.com/"]

[crawler]
max-depth = 5
threads = 4
delay = 0.5
follow-subdomains = false

[http]
user-agent = "TestCrawler/1.0"
headers = { "X-Test" = "yes" }

[filters]
exclude-flags = ["404"]

[sources]
exclude = ["google", "virustotal"]
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_depth, 5);
        assert_eq!(config.crawler.threads, 4);
        assert_eq!(config.crawler.concurrency, 10);
        assert!(!config.crawler.follow_subdomains);
        assert_eq!(config.http.user_agent.as_deref(), Some("TestCrawler/1.0"));
        assert_eq!(config.http.headers.get("X-Test").map(String::as_str), Some("yes"));
        assert_eq!(config.sources.exclude.len(), 2);
        assert!(config.filters.interesting_extensions.contains(&"php".to_string()));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
urls = ["http://example.com/"]

[filters]
include-flags = ["html"]
exclude-flags = ["404"]
"#;
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::ConflictingFlags)));
    }

    #[test]
    fn test_read_config_skips_validation() {
        let file = create_temp_config("[crawler]\nlimit = 0\n");
        let config = read_config(file.path()).unwrap();
        assert_eq!(config.crawler.limit, 0);
        assert!(config.urls.is_empty());
    }

    #[test]
    fn test_flags_range() {
        let flags = vec!["html".to_string(), "400-404".to_string()];
        assert_eq!(
            flags_range(&flags),
            vec!["html", "400", "401", "402", "403", "404"]
        );
    }

    #[test]
    fn test_flags_range_skips_unknown_codes() {
        let flags = vec!["418-428".to_string()];
        assert_eq!(
            flags_range(&flags),
            vec!["418", "421", "422", "423", "424", "425", "426", "428"]
        );
    }

    #[test]
    fn test_comma_separated_files() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "bak\n\n  old  ").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let values = comma_separated_files(&format!("php,{}", path)).unwrap();
        assert_eq!(values, vec!["php", "bak", "old"]);

        // Paths that do not exist are kept as values
        let values = comma_separated_files("/nonexistent/list.txt").unwrap();
        assert_eq!(values, vec!["/nonexistent/list.txt"]);
    }

    #[test]
    fn test_expand_seeds() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "https://one.com/\ntwo.com/path").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let seeds = expand_seeds(&[path, "three.com".to_string()]).unwrap();
        assert_eq!(
            seeds,
            vec!["https://one.com/", "http://two.com/path", "http://three.com"]
        );
    }

    #[test]
    fn test_key_values() {
        let values = key_values(&["session: abc:def".to_string()]).unwrap();
        assert_eq!(values.get("session").map(String::as_str), Some("abc:def"));

        let result = key_values(&["broken".to_string()]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_expand_proxies() {
        let proxies = vec!["tor".to_string(), "http://127.0.0.1:8080".to_string()];
        assert_eq!(
            expand_proxies(&proxies),
            vec!["socks5h://127.0.0.1:9150", "http://127.0.0.1:8080"]
        );
    }
}
