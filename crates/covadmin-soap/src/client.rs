use std::time::Duration;

use covadmin_config::{ConnectionSettings, Credentials};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use crate::protocol::{encode_envelope, parse_fault, SoapError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Configuration,
    Defect,
}

impl ServiceKind {
    pub fn path(&self) -> &'static str {
        match self {
            ServiceKind::Configuration => "configurationservice",
            ServiceKind::Defect => "defectservice",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::Configuration => "Configuration Service",
            ServiceKind::Defect => "Defect Service",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub request_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from(&ConnectionSettings::default())
    }
}

impl From<&ConnectionSettings> for ClientOptions {
    fn from(settings: &ConnectionSettings) -> Self {
        Self {
            request_timeout: Duration::from_secs(settings.request_timeout),
            accept_invalid_certs: settings.accept_invalid_certs,
        }
    }
}

pub fn endpoint_url(base_url: &str, kind: ServiceKind) -> String {
    format!("{}/ws/v9/{}", base_url.trim_end_matches('/'), kind.path())
}

pub fn wsdl_url(base_url: &str, kind: ServiceKind) -> String {
    format!("{}?wsdl", endpoint_url(base_url, kind))
}

/// An authenticated connection to one web-service endpoint. Every call
/// carries the username token; the WSDL is fetched once on connect to prove
/// the endpoint is reachable.
pub struct SoapClient {
    http: reqwest::Client,
    kind: ServiceKind,
    endpoint: String,
    username: String,
    password: String,
}

impl SoapClient {
    pub async fn connect(
        kind: ServiceKind,
        credentials: &Credentials,
        options: &ClientOptions,
    ) -> Result<Self, SoapError> {
        Self::connect_to(kind, &credentials.base_url(), credentials, options).await
    }

    pub async fn connect_to(
        kind: ServiceKind,
        base_url: &str,
        credentials: &Credentials,
        options: &ClientOptions,
    ) -> Result<Self, SoapError> {
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;

        let wsdl = wsdl_url(base_url, kind);
        debug!("Fetching WSDL {}", wsdl);
        let response = http
            .get(&wsdl)
            .send()
            .await
            .map_err(|e| SoapError::Connection {
                url: wsdl.clone(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(SoapError::Status {
                status: response.status().as_u16(),
                url: wsdl,
            });
        }

        info!("Connected to {} at {}", kind.display_name(), base_url);

        Ok(Self {
            http,
            kind,
            endpoint: endpoint_url(base_url, kind),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Posts one operation and returns the raw response envelope. Faults sent
    /// with an error status are surfaced as `SoapError::Fault`.
    pub async fn call(&self, operation: &str, body: &str) -> Result<String, SoapError> {
        let envelope = encode_envelope(operation, &self.username, &self.password, body);
        debug!("{} -> {}", self.kind.path(), operation);

        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", "\"\"")
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if let Some(fault) = parse_fault(&text) {
                debug!("{} <- {} fault: {}", self.kind.path(), operation, fault);
                return Err(SoapError::Fault(fault));
            }
            return Err(SoapError::Status {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_urls() {
        let base = "https://build.example.com:8443";
        assert_eq!(
            wsdl_url(base, ServiceKind::Configuration),
            "https://build.example.com:8443/ws/v9/configurationservice?wsdl"
        );
        assert_eq!(
            endpoint_url(base, ServiceKind::Defect),
            "https://build.example.com:8443/ws/v9/defectservice"
        );
    }

    #[test]
    fn test_options_from_settings() {
        let settings = ConnectionSettings {
            use_tls: true,
            request_timeout: 5,
            accept_invalid_certs: true,
        };
        let options = ClientOptions::from(&settings);
        assert_eq!(options.request_timeout, Duration::from_secs(5));
        assert!(options.accept_invalid_certs);
    }
}
