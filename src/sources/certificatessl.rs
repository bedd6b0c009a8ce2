//! Subject alternative names of the certificate served by the domain

use super::{Source, SourceError};
use async_trait::async_trait;
use std::time::Duration;
use x509_parser::prelude::*;

const TIMEOUT: Duration = Duration::from_secs(10);

pub struct CertificateSsl;

impl CertificateSsl {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CertificateSsl {
    fn default() -> Self {
        Self::new()
    }
}

/// DNS names in the SAN extension of a DER certificate, as https roots
pub fn certificate_urls(der: &[u8]) -> Result<Vec<String>, SourceError> {
    let (_, certificate) = X509Certificate::from_der(der)
        .map_err(|e| SourceError::Tls(format!("invalid certificate: {}", e)))?;
    let Some(san) = certificate
        .subject_alternative_name()
        .map_err(|e| SourceError::Tls(e.to_string()))?
    else {
        return Ok(Vec::new());
    };

    let mut urls = Vec::new();
    for name in &san.value.general_names {
        if let GeneralName::DNSName(host) = name {
            let url = format!("https://{}/", host.trim_start_matches("*."));
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    Ok(urls)
}

#[async_trait]
impl Source for CertificateSsl {
    fn name(&self) -> &'static str {
        "certificatessl"
    }

    async fn search_by_domain(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        let client = reqwest::Client::builder()
            .tls_info(true)
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(TIMEOUT)
            .build()?;
        let response = client.head(format!("https://{}/", domain)).send().await?;
        let der = response
            .extensions()
            .get::<reqwest::tls::TlsInfo>()
            .and_then(|info| info.peer_certificate())
            .ok_or_else(|| SourceError::Tls(format!("no certificate presented by {}", domain)))?;
        certificate_urls(der)
    }
}
