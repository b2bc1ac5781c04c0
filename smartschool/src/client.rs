//! Client des webservices Smartschool
//!
//! Un appel suit toujours le même chemin : construction de l'enveloppe,
//! POST vers le endpoint, décodage de la réponse, puis interprétation du
//! résultat à l'aide du catalogue des codes d'erreur.

use crate::catalog::{CatalogCell, CatalogState, ErrorCatalog};
use crate::error::{Result, SmartschoolError};
use crate::methods::Method;
use crate::requests::{DelUser, GetAbsents, SaveUser, SendMsg, SmartschoolRequest, UserDetails};
use crate::soap::{build_soap_request, decode, decode_str};
use crate::transport::{HttpTransport, Transport};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smartschool_config::DEFAULT_SERVICE_NAMESPACE;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Paramètres d'une opération, émis dans l'ordre d'insertion
pub type ParameterMap = Map<String, Value>;

/// Nom du paramètre portant le code d'accès
pub const ACCESSCODE_PARAM: &str = "accesscode";

/// Paramètres de connexion au webservice d'une école
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartschoolConfig {
    /// URL complète du webservice (ex: `https://school.smartschool.be/Webservices/V3`)
    pub api_endpoint: String,
    /// Code d'accès aux webservices, en clair
    pub accesscode: String,
}

impl SmartschoolConfig {
    pub fn new(api_endpoint: impl Into<String>, accesscode: impl Into<String>) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
            accesscode: accesscode.into(),
        }
    }
}

// Le code d'accès ne doit jamais apparaître dans les logs
impl fmt::Debug for SmartschoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartschoolConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("accesscode", &"***")
            .finish()
    }
}

/// Options d'un appel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    /// Injecter le code d'accès dans les paramètres
    pub needs_auth: bool,
}

impl CallOptions {
    /// Appel d'une opération publique, sans code d'accès
    pub fn public() -> Self {
        Self { needs_auth: false }
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self { needs_auth: true }
    }
}

/// Client des webservices d'une école
///
/// Le catalogue des codes d'erreur est propre à chaque instance ; il est
/// chargé au premier appel puis conservé.
///
/// # Example
///
/// ```no_run
/// use smartschool::SmartschoolClient;
/// use smartschool::requests::UserDetails;
///
/// # async fn example() -> smartschool::Result<()> {
/// let client = SmartschoolClient::builder(
///     "https://school.smartschool.be/Webservices/V3",
///     "access-code",
/// )
/// .build()?;
///
/// let details = client
///     .get_user_details(&UserDetails {
///         user_identifier: "john.doe".into(),
///         ..Default::default()
///     })
///     .await?;
/// println!("{}", details);
/// # Ok(())
/// # }
/// ```
pub struct SmartschoolClient {
    config: SmartschoolConfig,
    namespace: String,
    transport: Arc<dyn Transport>,
    catalog: CatalogCell,
}

impl fmt::Debug for SmartschoolClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartschoolClient")
            .field("config", &self.config)
            .field("namespace", &self.namespace)
            .field("catalog", &self.catalog.snapshot())
            .finish()
    }
}

impl SmartschoolClient {
    /// Crée un client avec le transport HTTP par défaut
    pub fn new(config: SmartschoolConfig) -> Result<Self> {
        Self::builder(config.api_endpoint, config.accesscode).build()
    }

    pub fn builder(api_endpoint: impl Into<String>, accesscode: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(api_endpoint, accesscode)
    }

    pub fn api_endpoint(&self) -> &str {
        &self.config.api_endpoint
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Phase de chargement du catalogue des codes d'erreur
    pub fn error_catalog_state(&self) -> CatalogState {
        self.catalog.snapshot()
    }

    /// Appelle une opération distante
    ///
    /// Le résultat vaut `true` lorsque le serveur répond par le code `0`.
    /// Un code présent dans le catalogue devient [`SmartschoolError::Api`].
    ///
    /// # Errors
    ///
    /// - [`SmartschoolError::ReservedParameter`] si `params` contient déjà
    ///   `accesscode` pour un appel authentifié
    /// - [`SmartschoolError::Http`] si la requête échoue
    /// - [`SmartschoolError::Api`] pour un code d'erreur connu
    /// - [`SmartschoolError::Decode`] si la réponse est vide de sens
    pub async fn call(&self, method: &str, params: ParameterMap, options: CallOptions) -> Result<Value> {
        let params = self.prepare_params(params, options.needs_auth)?;
        let catalog = self.error_catalog().await;

        debug!("Calling {} with {} parameters", method, params.len());
        let decoded = self.exchange(method, &params).await?;

        if let Some(code) = result_code(&decoded) {
            if let Some(message) = catalog.as_deref().and_then(|c| c.message_for(&code)) {
                debug!("{} answered with error code {}", method, code);
                return Err(SmartschoolError::Api { message, code });
            }
            if code == "0" {
                return Ok(Value::Bool(true));
            }
        }

        // Un résultat encore textuel peut contenir un second niveau de balises
        Ok(decode(&decoded)?)
    }

    /// Appelle une opération du registre après vérification des paramètres
    /// obligatoires
    ///
    /// Un paramètre obligatoire absent ou nul est refusé avant tout échange
    /// réseau.
    pub async fn call_method(&self, method: Method, params: ParameterMap) -> Result<Value> {
        if let Some(missing) = method
            .required_params()
            .iter()
            .find(|name| params.get(**name).is_none_or(Value::is_null))
        {
            return Err(SmartschoolError::MissingParameter {
                method: method.name().to_string(),
                parameter: missing.to_string(),
            });
        }

        let options = CallOptions {
            needs_auth: method.needs_auth(),
        };
        self.call(method.name(), params, options).await
    }

    /// Comme [`call_method`](Self::call_method), à partir du nom distant
    pub async fn call_by_name(&self, method: &str, params: ParameterMap) -> Result<Value> {
        let method: Method = method.parse()?;
        self.call_method(method, params).await
    }

    /// Envoie une requête typée
    pub async fn send<R: SmartschoolRequest>(&self, request: &R) -> Result<Value> {
        self.call_method(R::METHOD, request.to_params()?).await
    }

    /// Envoie une requête typée et désérialise le résultat
    pub async fn send_as<R, T>(&self, request: &R) -> Result<T>
    where
        R: SmartschoolRequest,
        T: DeserializeOwned,
    {
        let value = self.send(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn save_user(&self, request: &SaveUser) -> Result<Value> {
        self.send(request).await
    }

    pub async fn send_msg(&self, request: &SendMsg) -> Result<Value> {
        self.send(request).await
    }

    pub async fn get_user_details(&self, request: &UserDetails) -> Result<Value> {
        self.send(request).await
    }

    pub async fn del_user(&self, request: &DelUser) -> Result<Value> {
        self.send(request).await
    }

    pub async fn get_absents(&self, request: &GetAbsents) -> Result<Value> {
        self.send(request).await
    }

    /// Table code → message des erreurs, telle que publiée par le serveur
    pub async fn return_json_error_codes(&self) -> Result<Value> {
        self.call_method(Method::ReturnJsonErrorCodes, ParameterMap::new())
            .await
    }

    /// Même table, au format CSV
    pub async fn return_csv_error_codes(&self) -> Result<Value> {
        self.call_method(Method::ReturnCsvErrorCodes, ParameterMap::new())
            .await
    }

    fn prepare_params(&self, params: ParameterMap, needs_auth: bool) -> Result<ParameterMap> {
        if !needs_auth {
            return Ok(params);
        }
        if params.contains_key(ACCESSCODE_PARAM) {
            return Err(SmartschoolError::ReservedParameter(
                ACCESSCODE_PARAM.to_string(),
            ));
        }

        let mut full = ParameterMap::new();
        full.insert(
            ACCESSCODE_PARAM.to_string(),
            Value::String(self.config.accesscode.clone()),
        );
        full.extend(params);
        Ok(full)
    }

    /// Enveloppe, POST et premier décodage, sans interprétation du résultat
    async fn exchange(&self, method: &str, params: &ParameterMap) -> Result<Value> {
        let envelope = build_soap_request(&self.namespace, method, params)?;
        let body = self
            .transport
            .post_envelope(&self.config.api_endpoint, envelope)
            .await?;
        Ok(decode_str(&body))
    }

    /// Catalogue à utiliser pour l'appel en cours
    ///
    /// Seul le premier appel le charge. Un échec est journalisé et laisse un
    /// catalogue vide, sans nouvelle tentative.
    async fn error_catalog(&self) -> Option<Arc<ErrorCatalog>> {
        if !self.catalog.begin() {
            return self.catalog.current();
        }

        let guard = LoadingGuard::new(&self.catalog);
        let catalog = match self
            .exchange(Method::ReturnJsonErrorCodes.name(), &ParameterMap::new())
            .await
        {
            Ok(value) => {
                let catalog = ErrorCatalog::from_value(&value);
                info!("Loaded {} error codes", catalog.len());
                catalog
            }
            Err(e) => {
                warn!("Failed to load error codes, continuing without them: {}", e);
                ErrorCatalog::default()
            }
        };
        guard.complete();

        Some(self.catalog.finish(catalog))
    }
}

/// Remet le catalogue à `Uninitialized` si le chargement est abandonné
/// (future annulée) avant la fin
struct LoadingGuard<'a> {
    cell: &'a CatalogCell,
    completed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(cell: &'a CatalogCell) -> Self {
        Self {
            cell,
            completed: false,
        }
    }

    fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.cell.abandon();
        }
    }
}

/// Forme textuelle d'un résultat susceptible d'être un code
///
/// Seuls les scalaires portent un code ; un objet ou un tableau est
/// toujours un résultat.
fn result_code(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Builder pour [`SmartschoolClient`]
pub struct ClientBuilder {
    config: SmartschoolConfig,
    namespace: String,
    timeout: Option<Duration>,
    http_client: Option<Client>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new(api_endpoint: impl Into<String>, accesscode: impl Into<String>) -> Self {
        Self {
            config: SmartschoolConfig::new(api_endpoint, accesscode),
            namespace: DEFAULT_SERVICE_NAMESPACE.to_string(),
            timeout: None,
            http_client: None,
            transport: None,
        }
    }

    /// Namespace déclaré pour le préfixe `tns` des enveloppes
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Délai maximal d'une requête (aucun par défaut)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Utilise un client reqwest existant ; le délai du builder est alors
    /// ignoré
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Remplace complètement le transport HTTP
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<SmartschoolClient> {
        if self.config.api_endpoint.trim().is_empty() {
            return Err(SmartschoolError::Configuration(
                "API endpoint is empty".to_string(),
            ));
        }
        if self.namespace.trim().is_empty() {
            return Err(SmartschoolError::Configuration(
                "service namespace is empty".to_string(),
            ));
        }

        let transport: Arc<dyn Transport> = match (self.transport, self.http_client) {
            (Some(transport), _) => transport,
            (None, Some(client)) => Arc::new(HttpTransport::with_client(client)),
            (None, None) => Arc::new(HttpTransport::new(self.timeout)?),
        };

        Ok(SmartschoolClient {
            config: self.config,
            namespace: self.namespace,
            transport,
            catalog: CatalogCell::default(),
        })
    }
}
