//! Extension pour construire un client à partir de smartschool-config
//!
//! Ce module fournit le trait `SmartschoolConfigExt`, qui regroupe les
//! paramètres de connexion stockés dans `smartschool_config::Config`.

use crate::client::{ClientBuilder, SmartschoolClient, SmartschoolConfig};
use crate::error::Result;
use smartschool_config::Config;

/// Trait d'extension de `smartschool_config::Config`
///
/// # Exemple
///
/// ```rust,ignore
/// use smartschool::SmartschoolConfigExt;
/// use smartschool_config::get_config;
///
/// let config = get_config();
/// let settings = config.get_smartschool_config()?;
/// println!("Endpoint: {}", settings.api_endpoint);
/// ```
pub trait SmartschoolConfigExt {
    /// Endpoint et code d'accès (déchiffré)
    ///
    /// # Errors
    ///
    /// Retourne une erreur si l'un des deux n'est pas configuré
    fn get_smartschool_config(&self) -> anyhow::Result<SmartschoolConfig>;

    /// Enregistre l'endpoint et le code d'accès (chiffré)
    fn set_smartschool_config(&self, config: &SmartschoolConfig) -> anyhow::Result<()>;

    /// Builder pré-rempli : connexion, namespace et délai configurés
    fn smartschool_client_builder(&self) -> anyhow::Result<ClientBuilder>;
}

impl SmartschoolConfigExt for Config {
    fn get_smartschool_config(&self) -> anyhow::Result<SmartschoolConfig> {
        Ok(SmartschoolConfig {
            api_endpoint: self.get_api_endpoint()?,
            accesscode: self.get_accesscode()?,
        })
    }

    fn set_smartschool_config(&self, config: &SmartschoolConfig) -> anyhow::Result<()> {
        self.set_api_endpoint(&config.api_endpoint)?;
        self.set_accesscode(&config.accesscode)
    }

    fn smartschool_client_builder(&self) -> anyhow::Result<ClientBuilder> {
        let settings = self.get_smartschool_config()?;
        let mut builder = SmartschoolClient::builder(settings.api_endpoint, settings.accesscode)
            .namespace(self.get_service_namespace());
        if let Some(timeout) = self.get_request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(builder)
    }
}

impl SmartschoolClient {
    /// Crée un client depuis la configuration globale
    pub fn from_config() -> Result<Self> {
        let config = smartschool_config::get_config();
        Self::from_config_obj(config.as_ref())
    }

    /// Crée un client depuis un objet Config spécifique
    pub fn from_config_obj(config: &Config) -> Result<Self> {
        config.smartschool_client_builder()?.build()
    }
}
