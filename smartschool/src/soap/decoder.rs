//! Décodage des réponses des webservices
//!
//! Le serveur répond selon l'opération avec des formats très différents.
//! Plutôt qu'une grammaire unique, le décodeur essaie une suite de
//! stratégies dans un ordre fixe et retient la première qui aboutit :
//!
//! 1. valeur déjà structurée : rendue telle quelle
//! 2. document JSON complet (y compris un code nu comme `0`)
//! 3. JSON contenu dans `<SOAP-ENV:Body>`
//! 4. texte base64 contenant du XML
//! 5. contenu du premier élément `<return>`
//! 6. balises de premier niveau aplaties en objet

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::trace;

lazy_static! {
    static ref SOAP_ENV_BODY: Regex =
        Regex::new(r"(?is)<SOAP-ENV:Body[^>]*>(.*?)</SOAP-ENV:Body>").expect("valid regex");
    static ref BASE64_TEXT: Regex = Regex::new(r"^[A-Za-z0-9+/=]+$").expect("valid regex");
    static ref RETURN_ELEMENT: Regex =
        Regex::new(r"(?is)<return[^>]*>(.*?)</return>").expect("valid regex");
    static ref OPENING_TAG: Regex = Regex::new(r"<([^>\s]+)>").expect("valid regex");
}

// Tolère l'absence de padding, comme le décodeur base64 des navigateurs
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Erreur de décodage d'une réponse
#[derive(Debug, Error)]
pub enum DecodeError {
    /// La valeur à décoder n'est ni un texte ni une valeur structurée
    #[error("response must be either an object or a string, got {0}")]
    Unsupported(&'static str),
}

/// Décode une réponse déjà partiellement interprétée
///
/// Une chaîne passe par toute la cascade de [`decode_str`] ; un nombre, un
/// booléen, un objet ou un tableau est rendu inchangé. Décoder une seconde
/// fois une valeur structurée est donc sans effet.
///
/// # Errors
///
/// [`DecodeError::Unsupported`] pour `null`, qui ne porte aucune réponse.
pub fn decode(raw: &Value) -> Result<Value, DecodeError> {
    match raw {
        Value::String(text) => Ok(decode_str(text)),
        Value::Null => Err(DecodeError::Unsupported("null")),
        structured => Ok(structured.clone()),
    }
}

/// Décode le corps texte d'une réponse HTTP
pub fn decode_str(raw: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        trace!("Response decoded as plain JSON");
        return value;
    }

    if let Some(value) = json_in_soap_body(raw) {
        trace!("Response decoded from JSON inside SOAP-ENV:Body");
        return value;
    }

    if let Some(value) = unwrap_base64(raw) {
        trace!("Response decoded from base64 payload");
        return value;
    }

    decode_markup(raw).unwrap_or_else(|| plain_text(raw))
}

/// Premier objet ou tableau JSON situé dans `<SOAP-ENV:Body>`
fn json_in_soap_body(raw: &str) -> Option<Value> {
    let body = SOAP_ENV_BODY.captures(raw)?.get(1)?.as_str().trim();
    let start = body.find(['[', '{'])?;

    // Seule la première valeur compte, le reste du corps est ignoré
    serde_json::Deserializer::from_str(&body[start..])
        .into_iter::<Value>()
        .next()?
        .ok()
}

/// Texte entièrement base64 dont le contenu décodé est du XML exploitable
fn unwrap_base64(raw: &str) -> Option<Value> {
    if !BASE64_TEXT.is_match(raw) {
        return None;
    }
    let bytes = LENIENT_BASE64.decode(raw).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    decode_markup(&text)
}

/// Stratégies 5 et 6 : élément `<return>` puis aplatissement des balises
fn decode_markup(text: &str) -> Option<Value> {
    if let Some(content) = RETURN_ELEMENT.captures(text).and_then(|c| c.get(1)) {
        return Some(return_value(content.as_str().trim()));
    }

    let fields = flatten_tags(text);
    (!fields.is_empty()).then_some(Value::Object(fields))
}

fn return_value(content: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(content) {
        return value;
    }

    // Un code comme "007" n'est pas du JSON valide
    if !content.is_empty() && content.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = content.parse::<u64>() {
            return Value::from(n);
        }
    }

    Value::String(content.to_string())
}

/// Associe chaque paire `<tag>...</tag>` de premier niveau à sa valeur
///
/// Le préfixe de namespace est retiré du nom (`ns1:foo` devient `foo`).
/// Les balises imbriquées dans une paire déjà reconnue restent dans sa
/// valeur textuelle.
fn flatten_tags(text: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    let mut cursor = 0;

    while let Some(caps) = OPENING_TAG.captures(&text[cursor..]) {
        let (Some(tag), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let name = name.as_str();
        let content_start = cursor + tag.end();
        let closing = format!("</{}>", name);

        match text[content_start..].find(&closing) {
            Some(offset) => {
                let content = &text[content_start..content_start + offset];
                let key = name.rsplit(':').next().unwrap_or(name);
                let value = serde_json::from_str::<Value>(content)
                    .unwrap_or_else(|_| Value::String(content.trim().to_string()));
                fields.insert(key.to_string(), value);
                cursor = content_start + offset + closing.len();
            }
            // Pas de fermeture : on reprend juste après le '<'
            None => cursor += tag.start() + 1,
        }
    }

    fields
}

/// Texte sans balise reconnue : rendu tel quel, une réponse vide devient
/// un objet vide
fn plain_text(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Value::Object(Map::new())
    } else {
        Value::String(trimmed.to_string())
    }
}
