use crate::config::types::{Config, CrawlerConfig, FiltersConfig, SourcesConfig};
use crate::sources::SOURCE_NAMES;
use crate::url::Url;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_urls(&config.urls)?;
    validate_crawler_config(&config.crawler)?;
    validate_filters(&config.filters)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Seeds must be absolute http(s) URLs
fn validate_urls(urls: &[String]) -> Result<(), ConfigError> {
    if urls.is_empty() {
        return Err(ConfigError::NoUrls);
    }

    for address in urls {
        let url = Url::new(address);
        let is_http = matches!(url.protocol(), Some("http") | Some("https"));
        if !url.is_valid() || !is_http {
            return Err(ConfigError::InvalidUrl(format!(
                "Seed URL '{}' must be an absolute http(s) URL",
                address
            )));
        }
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.threads < 1 {
        return Err(ConfigError::Validation(format!(
            "threads must be >= 1, got {}",
            config.threads
        )));
    }

    if config.concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be >= 1, got {}",
            config.concurrency
        )));
    }

    if config.timeout < 1 {
        return Err(ConfigError::Validation(
            "timeout must be at least 1 second".to_string(),
        ));
    }

    if !config.delay.is_finite() || config.delay < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay must be a non-negative number of seconds, got {}",
            config.delay
        )));
    }

    Ok(())
}

fn validate_filters(config: &FiltersConfig) -> Result<(), ConfigError> {
    if !config.include_flags.is_empty() && !config.exclude_flags.is_empty() {
        return Err(ConfigError::ConflictingFlags);
    }
    Ok(())
}

fn validate_sources(config: &SourcesConfig) -> Result<(), ConfigError> {
    match config
        .exclude
        .iter()
        .find(|name| !SOURCE_NAMES.contains(&name.as_str()))
    {
        Some(unknown) => Err(ConfigError::UnknownSource(unknown.clone())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            urls: vec!["http://example.com/".to_string()],
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config_with_seed_is_valid() {
        assert!(validate(&config()).is_ok());
    }

    #[test]
    fn test_no_urls() {
        let result = validate(&Config::default());
        assert!(matches!(result, Err(ConfigError::NoUrls)));
    }

    #[test]
    fn test_invalid_seed() {
        let mut config = config();
        config.urls.push("ftp://example.com/".to_string());
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        let mut config = self::config();
        config.urls = vec!["not a url".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_conflicting_flags() {
        let mut config = config();
        config.filters.include_flags = vec!["html".to_string()];
        config.filters.exclude_flags = vec!["404".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::ConflictingFlags)));
    }

    #[test]
    fn test_crawler_bounds() {
        let mut config = config();
        config.crawler.threads = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        let mut config = self::config();
        config.crawler.concurrency = 0;
        assert!(validate(&config).is_err());

        let mut config = self::config();
        config.crawler.timeout = 0;
        assert!(validate(&config).is_err());

        let mut config = self::config();
        config.crawler.delay = -1.0;
        assert!(validate(&config).is_err());

        let mut config = self::config();
        config.crawler.delay = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_source() {
        let mut config = config();
        config.sources.exclude = vec!["robots".to_string(), "bing".to_string()];
        match validate(&config) {
            Err(ConfigError::UnknownSource(name)) => assert_eq!(name, "bing"),
            other => panic!("expected UnknownSource, got {:?}", other),
        }
    }
}
