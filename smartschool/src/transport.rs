//! Transport HTTP des enveloppes SOAP

use crate::error::{Result, SmartschoolError};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, warn};

/// Envoi d'une enveloppe vers le endpoint des webservices
///
/// Le corps de la réponse est toujours rendu, quel que soit le statut HTTP :
/// les fautes SOAP passent par le même décodeur que les réponses normales.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_envelope(&self, endpoint: &str, envelope: String) -> Result<String>;
}

/// Transport par défaut, basé sur reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Crée un transport avec un délai maximal optionnel
    ///
    /// Sans délai, la requête attend la réponse indéfiniment.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Réutilise un client reqwest existant
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_envelope(&self, endpoint: &str, envelope: String) -> Result<String> {
        debug!("POST {} ({} bytes)", endpoint, envelope.len());

        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/xml")
            .body(envelope)
            .send()
            .await
            .map_err(SmartschoolError::Http)?;

        let status = response.status();
        if !status.is_success() {
            warn!("Webservice answered with HTTP status {}", status);
        }

        Ok(response.text().await?)
    }
}
