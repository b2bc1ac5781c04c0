//! Catalogue des codes d'erreur renvoyés par les webservices
//!
//! Les opérations signalent un échec métier en renvoyant un simple code
//! (`"12"`, `"4"`...). Le serveur publie la table code → message via
//! l'opération `returnJsonErrorCodes` ; le client la charge une seule fois
//! puis s'en sert pour transformer ces codes en [`SmartschoolError::Api`].
//!
//! [`SmartschoolError::Api`]: crate::SmartschoolError::Api

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

lazy_static! {
    static ref LINE_BREAK: Regex = Regex::new(r"(?i)<br\s*/?>").expect("valid regex");
}

/// Remplace les entités HTML des messages du catalogue
///
/// `&amp;` est traité en dernier : `&amp;lt;` donne `&lt;` et non `<`.
/// Les balises `<br>`, `<br/>` et `<br />` deviennent des retours à la ligne.
pub fn decode_entities(text: &str) -> String {
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    LINE_BREAK.replace_all(&text, "\n").into_owned()
}

/// Table code → message telle que publiée par le serveur
///
/// Les messages sont conservés bruts ; [`ErrorCatalog::message_for`] rend
/// la version lisible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorCatalog {
    entries: HashMap<String, String>,
}

impl ErrorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construit le catalogue depuis la réponse décodée de
    /// `returnJsonErrorCodes`
    ///
    /// Seul un objet est exploitable ; toute autre forme donne un catalogue
    /// vide. Les messages non textuels sont conservés sous leur forme JSON,
    /// les valeurs nulles ignorées.
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            debug!("Error catalog response is not an object, ignoring it");
            return Self::default();
        };

        let entries = map
            .iter()
            .filter_map(|(code, message)| match message {
                Value::Null => None,
                Value::String(s) => Some((code.clone(), s.clone())),
                other => Some((code.clone(), other.to_string())),
            })
            .collect();

        Self { entries }
    }

    /// Message brut associé à un code
    pub fn lookup(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    /// Message lisible (entités décodées) associé à un code
    pub fn message_for(&self, code: &str) -> Option<String> {
        self.lookup(code).map(decode_entities)
    }

    pub fn is_populated(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for ErrorCatalog {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Phase de chargement du catalogue d'un client
#[derive(Debug, Clone, Default)]
pub enum CatalogState {
    /// Aucun appel n'a encore eu lieu
    #[default]
    Uninitialized,
    /// Le premier appel est en train de charger le catalogue
    Initializing,
    /// Chargement terminé (le catalogue peut être vide si le serveur n'a pas répondu)
    Ready(Arc<ErrorCatalog>),
}

impl CatalogState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Catalogue disponible, s'il y en a un
    pub fn catalog(&self) -> Option<Arc<ErrorCatalog>> {
        match self {
            Self::Ready(catalog) => Some(Arc::clone(catalog)),
            _ => None,
        }
    }
}

/// État partagé du catalogue, propre à une instance de client
///
/// Le verrou ne protège que les transitions ; il n'est jamais tenu pendant
/// une requête réseau. Un appel concurrent qui trouve l'état
/// `Initializing` continue sans catalogue.
#[derive(Debug, Default)]
pub(crate) struct CatalogCell {
    state: Mutex<CatalogState>,
}

impl CatalogCell {
    pub(crate) fn snapshot(&self) -> CatalogState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Passe de `Uninitialized` à `Initializing`
    ///
    /// Renvoie `true` si l'appelant est chargé du chargement.
    pub(crate) fn begin(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            CatalogState::Uninitialized => {
                *state = CatalogState::Initializing;
                true
            }
            _ => false,
        }
    }

    /// Termine le chargement ; le catalogue n'est plus jamais rechargé
    pub(crate) fn finish(&self, catalog: ErrorCatalog) -> Arc<ErrorCatalog> {
        let catalog = Arc::new(catalog);
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) =
            CatalogState::Ready(Arc::clone(&catalog));
        catalog
    }

    /// Chargement interrompu : le prochain appel pourra le relancer
    pub(crate) fn abandon(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, CatalogState::Initializing) {
            *state = CatalogState::Uninitialized;
        }
    }

    pub(crate) fn current(&self) -> Option<Arc<ErrorCatalog>> {
        self.snapshot().catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Fout&lt;br&gt;volgende regel"), "Fout\nvolgende regel");
        assert_eq!(decode_entities("a &quot;b&quot; &apos;c&apos;"), "a \"b\" 'c'");
        assert_eq!(decode_entities("Profiel &gt; Gebruikersnaam"), "Profiel > Gebruikersnaam");
    }

    #[test]
    fn test_ampersand_is_decoded_last() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("Jan &amp; Piet"), "Jan & Piet");
    }

    #[test]
    fn test_line_break_variants() {
        assert_eq!(decode_entities("a<br>b<BR/>c<br />d"), "a\nb\nc\nd");
    }

    #[test]
    fn test_catalog_from_value() {
        let catalog = ErrorCatalog::from_value(&json!({
            "4": "Het nieuwe wachtwoord is niet complex genoeg.&lt;br&gt;Bekijk de voorwaarden.",
            "12": "Deze gebruiker bestaat niet",
            "99": null,
            "100": 7,
        }));

        assert!(catalog.is_populated());
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.lookup("12"), Some("Deze gebruiker bestaat niet"));
        assert_eq!(
            catalog.message_for("4").as_deref(),
            Some("Het nieuwe wachtwoord is niet complex genoeg.\nBekijk de voorwaarden.")
        );
        assert_eq!(catalog.lookup("100"), Some("7"));
        assert_eq!(catalog.lookup("99"), None);
        assert_eq!(catalog.lookup("0"), None);
    }

    #[test]
    fn test_non_object_response_gives_empty_catalog() {
        for value in [json!("1;Invalid username"), json!(0), json!([1, 2])] {
            let catalog = ErrorCatalog::from_value(&value);
            assert!(!catalog.is_populated());
            assert!(catalog.is_empty());
        }
    }

    #[test]
    fn test_cell_transitions() {
        let cell = CatalogCell::default();
        assert!(matches!(cell.snapshot(), CatalogState::Uninitialized));
        assert!(cell.current().is_none());

        assert!(cell.begin());
        assert!(matches!(cell.snapshot(), CatalogState::Initializing));
        assert!(!cell.begin());
        assert!(cell.current().is_none());

        let catalog: ErrorCatalog = [("12".to_string(), "Onbekend".to_string())]
            .into_iter()
            .collect();
        cell.finish(catalog);

        assert!(cell.snapshot().is_ready());
        assert!(!cell.begin());
        assert_eq!(cell.current().unwrap().lookup("12"), Some("Onbekend"));

        // Un catalogue chargé n'est jamais remis en cause
        cell.abandon();
        assert!(cell.snapshot().is_ready());
    }

    #[test]
    fn test_abandoned_loading_can_restart() {
        let cell = CatalogCell::default();
        assert!(cell.begin());
        cell.abandon();
        assert!(matches!(cell.snapshot(), CatalogState::Uninitialized));
        assert!(cell.begin());
    }
}
