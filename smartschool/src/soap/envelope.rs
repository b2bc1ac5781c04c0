//! Construction des enveloppes SOAP de requête

use crate::client::ParameterMap;
use crate::error::{Result, SmartschoolError};
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::Value;
use std::borrow::Cow;

/// Namespace de l'enveloppe SOAP 1.1
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Namespace XML Schema instance
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Représentation textuelle d'un paramètre, avant échappement XML
///
/// Objets et tableaux sont transmis en JSON compact, les scalaires sous
/// leur forme textuelle. `None` pour une valeur nulle : le paramètre ne
/// doit alors pas apparaître dans l'enveloppe.
pub fn param_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Array(_) | Value::Object(_) => Some(Cow::Owned(value.to_string())),
    }
}

/// Construit l'enveloppe SOAP d'une requête
///
/// # Arguments
///
/// * `namespace` - Namespace du service, déclaré avec le préfixe `tns`
/// * `method` - Nom de l'opération distante (ex: "saveUser")
/// * `params` - Paramètres, émis dans l'ordre de la map
///
/// Les paramètres nuls sont omis : le serveur distingue un élément vide
/// d'un élément absent pour les champs optionnels.
///
/// # Returns
///
/// Le document XML complet, déclaration comprise
pub fn build_soap_request(namespace: &str, method: &str, params: &ParameterMap) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let operation = format!("tns:{}", method);

    let envelope = BytesStart::new("soap:Envelope").with_attributes([
        ("xmlns:soap", SOAP_ENVELOPE_NS),
        ("xmlns:xsi", XSI_NS),
        ("xmlns:tns", namespace),
    ]);

    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    write(&mut writer, Event::Start(envelope))?;
    write(&mut writer, Event::Start(BytesStart::new("soap:Body")))?;
    write(&mut writer, Event::Start(BytesStart::new(operation.as_str())))?;

    for (key, value) in params {
        let Some(text) = param_text(value) else {
            continue;
        };
        write(&mut writer, Event::Start(BytesStart::new(key.as_str())))?;
        write(&mut writer, Event::Text(BytesText::from_escaped(escape(text.as_ref()))))?;
        write(&mut writer, Event::End(BytesEnd::new(key.as_str())))?;
    }

    write(&mut writer, Event::End(BytesEnd::new(operation.as_str())))?;
    write(&mut writer, Event::End(BytesEnd::new("soap:Body")))?;
    write(&mut writer, Event::End(BytesEnd::new("soap:Envelope")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| SmartschoolError::Envelope(e.to_string()))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| SmartschoolError::Envelope(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NS: &str = "https://example.smartschool.be/Webservices/V3";

    fn params(value: Value) -> ParameterMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("params must be an object"),
        }
    }

    #[test]
    fn test_build_request_envelope() {
        let xml = build_soap_request(
            NS,
            "saveUser",
            &params(json!({
                "username": "john.doe",
                "passwd1": "password123",
                "name": "John",
                "surname": "Doe",
            })),
        )
        .unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(xml.contains("<soap:Envelope"));
        assert!(xml.contains(&format!(r#"xmlns:soap="{}""#, SOAP_ENVELOPE_NS)));
        assert!(xml.contains(&format!(r#"xmlns:xsi="{}""#, XSI_NS)));
        assert!(xml.contains(&format!(r#"xmlns:tns="{}""#, NS)));
        assert!(xml.contains("<soap:Body>"));
        assert!(xml.contains("<tns:saveUser>"));
        assert!(xml.contains("</tns:saveUser>"));
        assert!(xml.contains("<username>john.doe</username>"));
        assert!(xml.contains("<passwd1>password123</passwd1>"));
        assert!(xml.contains("<name>John</name>"));
        assert!(xml.contains("<surname>Doe</surname>"));
        assert!(xml.trim_end().ends_with("</soap:Envelope>"));
    }

    #[test]
    fn test_null_parameters_are_omitted() {
        let xml = build_soap_request(
            NS,
            "saveUser",
            &params(json!({
                "username": "john.doe",
                "email": null,
                "phone": null,
            })),
        )
        .unwrap();

        assert!(xml.contains("<username>john.doe</username>"));
        assert!(!xml.contains("email"));
        assert!(!xml.contains("phone"));
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let xml = build_soap_request(
            NS,
            "saveUser",
            &params(json!({
                "username": "john & doe",
                "description": "<test>",
                "quote": "it's \"quoted\"",
            })),
        )
        .unwrap();

        assert!(xml.contains("<username>john &amp; doe</username>"));
        assert!(xml.contains("<description>&lt;test&gt;</description>"));
        assert!(xml.contains("<quote>it&apos;s &quot;quoted&quot;</quote>"));
        assert!(!xml.contains("john & doe"));
    }

    #[test]
    fn test_structured_values_are_json_encoded() {
        let xml = build_soap_request(
            NS,
            "sendMsg",
            &params(json!({
                "attachments": [{"filename": "a.txt", "filedata": "SGk="}],
                "coaccount": 1,
                "copyToLVS": false,
            })),
        )
        .unwrap();

        assert!(xml.contains(
            "<attachments>[{&quot;filename&quot;:&quot;a.txt&quot;,&quot;filedata&quot;:&quot;SGk=&quot;}]</attachments>"
        ));
        assert!(xml.contains("<coaccount>1</coaccount>"));
        assert!(xml.contains("<copyToLVS>false</copyToLVS>"));
    }

    #[test]
    fn test_parameters_keep_their_order() {
        let xml = build_soap_request(
            NS,
            "getAbsents",
            &params(json!({"userIdentifier": "jane.roe", "schoolYear": "2025"})),
        )
        .unwrap();

        let user = xml.find("<userIdentifier>").unwrap();
        let year = xml.find("<schoolYear>").unwrap();
        assert!(user < year);
    }

    #[test]
    fn test_operation_without_parameters() {
        let xml = build_soap_request(NS, "returnJsonErrorCodes", &ParameterMap::new()).unwrap();
        assert!(xml.contains("<tns:returnJsonErrorCodes>"));
        assert!(xml.contains("</tns:returnJsonErrorCodes>"));
    }

    #[test]
    fn test_param_text() {
        assert_eq!(param_text(&Value::Null), None);
        assert_eq!(param_text(&json!("x")).as_deref(), Some("x"));
        assert_eq!(param_text(&json!(42)).as_deref(), Some("42"));
        assert_eq!(param_text(&json!(1.5)).as_deref(), Some("1.5"));
        assert_eq!(param_text(&json!(true)).as_deref(), Some("true"));
        assert_eq!(param_text(&json!({"a": 1})).as_deref(), Some(r#"{"a":1}"#));
    }
}
