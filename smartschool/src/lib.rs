//! # smartschool - Client des webservices Smartschool
//!
//! Cette crate fournit un client Rust pour les webservices SOAP (V3) de
//! Smartschool : gestion des comptes, des classes, des cours, messagerie,
//! absences...
//!
//! ## Vue d'ensemble
//!
//! Toutes les opérations passent par le même point d'entrée, un POST d'une
//! enveloppe SOAP vers le endpoint de l'école. Le client s'occupe de :
//! - construire l'enveloppe à partir d'une map de paramètres
//! - injecter le code d'accès pour les opérations authentifiées
//! - décoder des réponses aux formats hétérogènes (code nu, JSON, base64, XML)
//! - traduire les codes d'erreur du serveur en erreurs lisibles
//!
//! ## Architecture
//!
//! - `SmartschoolClient` : dispatcher des appels, propriétaire du catalogue d'erreurs
//! - `soap` : encodage des enveloppes et décodage des réponses
//! - `catalog` : catalogue des codes d'erreur et décodage des entités HTML
//! - `methods` : registre des opérations distantes
//! - `requests` : requêtes typées pour les opérations courantes
//! - `transport` : envoi HTTP (reqwest), remplaçable pour les tests
//!
//! ## Structure des modules
//!
//! ```text
//! smartschool/
//! ├── src/
//! │   ├── lib.rs              # Module principal (ce fichier)
//! │   ├── client.rs           # Client et dispatcher
//! │   ├── catalog.rs          # Catalogue des codes d'erreur
//! │   ├── methods.rs          # Registre des opérations
//! │   ├── requests.rs         # Requêtes typées
//! │   ├── transport.rs        # Transport HTTP
//! │   ├── config_ext.rs       # Intégration smartschool-config
//! │   ├── soap/
//! │   │   ├── mod.rs
//! │   │   ├── envelope.rs     # Enveloppes de requête
//! │   │   └── decoder.rs      # Cascade de décodage des réponses
//! │   └── error.rs            # Gestion des erreurs
//! ```
//!
//! ## Utilisation
//!
//! ### Exemple basique avec configuration automatique
//!
//! ```rust,no_run
//! use smartschool::SmartschoolClient;
//! use smartschool::requests::SendMsg;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Utilise la configuration de smartschool-config
//!     let client = SmartschoolClient::from_config()?;
//!
//!     client
//!         .send_msg(&SendMsg {
//!             user_identifier: "jane.roe".into(),
//!             title: "Hallo".into(),
//!             body: "Lorem ipsum".into(),
//!             sender_identifier: "admin".into(),
//!             ..Default::default()
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Appel par nom d'opération
//!
//! ```rust,no_run
//! use serde_json::json;
//! use smartschool::{SmartschoolClient, SmartschoolError};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = SmartschoolClient::builder(
//!     "https://school.smartschool.be/Webservices/V3",
//!     "access-code",
//! )
//! .build()?;
//!
//! let mut params = serde_json::Map::new();
//! params.insert("userIdentifier".into(), json!("jane.roe"));
//! params.insert("schoolYear".into(), json!("2025"));
//!
//! match client.call_by_name("getAbsents", params).await {
//!     Ok(absents) => println!("{:#}", absents),
//!     Err(SmartschoolError::Api { message, code }) => eprintln!("[{}] {}", code, message),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Codes d'erreur
//!
//! Le serveur signale la plupart des échecs par un simple code. Au premier
//! appel, le client charge la table des codes (`returnJsonErrorCodes`) ; un
//! échec de ce chargement est journalisé et n'empêche pas l'appel. Un code
//! `0` est traduit en `true`.

pub mod catalog;
pub mod client;
pub mod config_ext;
pub mod error;
pub mod methods;
pub mod requests;
pub mod soap;
pub mod transport;

pub use catalog::{CatalogState, ErrorCatalog, decode_entities};
pub use client::{CallOptions, ClientBuilder, ParameterMap, SmartschoolClient, SmartschoolConfig};
pub use config_ext::SmartschoolConfigExt;
pub use error::{Result, SmartschoolError};
pub use methods::Method;
pub use requests::SmartschoolRequest;
pub use transport::{HttpTransport, Transport};
