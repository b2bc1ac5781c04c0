//! Gestion des erreurs pour le client Smartschool

use crate::soap::DecodeError;
use thiserror::Error;

/// Type Result personnalisé pour smartschool
pub type Result<T> = std::result::Result<T, SmartschoolError>;

/// Erreurs possibles lors d'un appel aux webservices Smartschool
#[derive(Error, Debug)]
pub enum SmartschoolError {
    /// La requête HTTP elle-même a échoué (réseau, DNS, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Aucune stratégie de décodage n'a pu interpréter la réponse
    #[error("Failed to parse response: {0}")]
    Decode(#[from] DecodeError),

    /// Code d'erreur métier reconnu par le catalogue du serveur
    ///
    /// `message` est le texte lisible (entités HTML décodées), `code` la
    /// valeur brute renvoyée par le webservice.
    #[error("{message}")]
    Api { message: String, code: String },

    /// Échec de l'écriture de l'enveloppe XML
    #[error("SOAP envelope error: {0}")]
    Envelope(String),

    /// Méthode absente du registre
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// Paramètre obligatoire manquant ou nul
    #[error("Missing required parameter '{parameter}' for {method}")]
    MissingParameter { method: String, parameter: String },

    /// Paramètre réservé fourni par l'appelant
    #[error("Parameter '{0}' is injected by the client and cannot be supplied by the caller")]
    ReservedParameter(String),

    /// Erreur de (dé)sérialisation JSON d'une requête ou d'un résultat typé
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration du client invalide
    #[error("Invalid client configuration: {0}")]
    Configuration(String),

    /// Erreur de la couche de configuration (smartschool-config)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl SmartschoolError {
    /// Crée une erreur métier depuis un code et son message
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            code: code.into(),
        }
    }

    /// Vérifie si l'erreur provient du catalogue d'erreurs du serveur
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    /// Code brut de l'erreur métier, s'il y en a un
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}
