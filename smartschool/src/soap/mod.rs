//! # Module SOAP - encodage des requêtes et décodage des réponses
//!
//! Les webservices Smartschool (V3) attendent une enveloppe SOAP 1.1 dont
//! chaque paramètre est un élément enfant de l'opération appelée. Les
//! réponses, en revanche, ne suivent aucun format unique : selon
//! l'opération on reçoit un code numérique nu, du JSON dans le corps SOAP,
//! du XML encodé en base64, un élément `<return>` ou une simple suite de
//! balises.
//!
//! ## Architecture
//!
//! - [`build_soap_request`] : construit l'enveloppe d'une requête
//! - [`decode`] / [`decode_str`] : cascade de stratégies de décodage
//!   produisant une valeur JSON normalisée
//!
//! ## Example
//!
//! ```
//! use serde_json::{json, Map};
//! use smartschool::soap::{build_soap_request, decode_str, DEFAULT_SERVICE_NAMESPACE};
//!
//! let mut params = Map::new();
//! params.insert("userIdentifier".to_string(), json!("john.doe"));
//! let xml = build_soap_request(DEFAULT_SERVICE_NAMESPACE, "getUserDetails", &params).unwrap();
//! assert!(xml.contains("<userIdentifier>john.doe</userIdentifier>"));
//!
//! let body = r#"<soap:Envelope><soap:Body><return>0</return></soap:Body></soap:Envelope>"#;
//! assert_eq!(decode_str(body), json!(0));
//! ```

mod decoder;
mod envelope;

pub use decoder::{DecodeError, decode, decode_str};
pub use envelope::{SOAP_ENVELOPE_NS, XSI_NS, build_soap_request, param_text};
pub use smartschool_config::DEFAULT_SERVICE_NAMESPACE;
