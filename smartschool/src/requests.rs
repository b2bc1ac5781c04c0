//! Requêtes typées pour les opérations les plus courantes
//!
//! Chaque structure porte les paramètres connus de l'opération. Les champs
//! optionnels à `None` sont sérialisés en `null` et donc absents de
//! l'enveloppe. Le champ `extra` transmet des paramètres supplémentaires
//! tels quels, le serveur acceptant des champs que le client ne connaît pas.
//!
//! ```
//! use smartschool::requests::{SaveUser, SmartschoolRequest};
//!
//! let request = SaveUser {
//!     username: "john.doe".into(),
//!     name: "John".into(),
//!     surname: "Doe".into(),
//!     basisrol: "leerkracht".into(),
//!     email: Some("john@example.com".into()),
//!     ..Default::default()
//! };
//! let params = request.to_params().unwrap();
//! assert_eq!(params["username"], "john.doe");
//! assert!(params["phone"].is_null());
//! ```

use crate::client::ParameterMap;
use crate::error::{Result, SmartschoolError};
use crate::methods::Method;
use serde::Serialize;
use serde_json::Value;

/// Requête associée à une opération fixe
pub trait SmartschoolRequest: Serialize {
    const METHOD: Method;

    /// Paramètres de l'opération, dans l'ordre de déclaration des champs
    fn to_params(&self) -> Result<ParameterMap> {
        match serde_json::to_value(self)? {
            Value::Object(params) => Ok(params),
            other => Err(SmartschoolError::Envelope(format!(
                "parameters for {} must be an object, got {}",
                Self::METHOD,
                other
            ))),
        }
    }
}

macro_rules! impl_request {
    ($($request:ty => $method:ident),* $(,)?) => {
        $(
            impl SmartschoolRequest for $request {
                const METHOD: Method = Method::$method;
            }
        )*
    };
}

/// Création ou mise à jour d'un compte
#[derive(Debug, Clone, Default, Serialize)]
pub struct SaveUser {
    pub username: String,
    pub name: String,
    pub surname: String,
    /// Rôle de base (`leerling`, `leerkracht`, ...)
    pub basisrol: String,
    pub passwd1: Option<String>,
    pub passwd2: Option<String>,
    pub passwd3: Option<String>,
    pub internnumber: Option<String>,
    pub extranames: Option<String>,
    pub initials: Option<String>,
    pub sex: Option<String>,
    /// Format `YYYY-MM-DD`
    pub birthdate: Option<String>,
    pub birthcity: Option<String>,
    pub birthcountry: Option<String>,
    pub nationality: Option<String>,
    pub address: Option<String>,
    pub postalcode: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: ParameterMap,
}

/// Envoi d'un message dans la messagerie Smartschool
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMsg {
    pub user_identifier: String,
    pub title: String,
    pub body: String,
    pub sender_identifier: String,
    /// Pièces jointes, transmises en JSON
    pub attachments: Option<Vec<Attachment>>,
    /// Co-compte destinataire (0 = compte principal)
    pub coaccount: Option<u32>,
    #[serde(rename = "copyToLVS")]
    pub copy_to_lvs: Option<bool>,
    #[serde(flatten)]
    pub extra: ParameterMap,
}

/// Pièce jointe d'un message, contenu encodé en base64
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub filename: String,
    pub filedata: String,
}

/// Détails d'un utilisateur à partir de son identifiant
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub user_identifier: String,
    #[serde(flatten)]
    pub extra: ParameterMap,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelUser {
    pub user_identifier: String,
    /// Date de suppression officielle, `YYYY-MM-DD`
    pub official_date: Option<String>,
    #[serde(flatten)]
    pub extra: ParameterMap,
}

/// Absences d'un élève pour une année scolaire (`YYYY`)
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAbsents {
    pub user_identifier: String,
    pub school_year: String,
    #[serde(flatten)]
    pub extra: ParameterMap,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveClass {
    pub name: String,
    pub desc: String,
    pub code: String,
    pub parent: String,
    pub untis: String,
    pub institute_number: Option<String>,
    pub admin_number: Option<String>,
    pub school_year_date: Option<String>,
    #[serde(flatten)]
    pub extra: ParameterMap,
}

/// Statut du compte : `actief`, `niet actief` ou une autre valeur serveur
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAccountStatus {
    pub user_identifier: String,
    pub account_status: String,
    #[serde(flatten)]
    pub extra: ParameterMap,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePassword {
    pub user_identifier: String,
    /// 0 pour le compte principal, sinon numéro du co-compte
    pub account_type: u32,
    pub password: String,
    pub change_password_at_next_login: u8,
    #[serde(flatten)]
    pub extra: ParameterMap,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AddCourse {
    pub coursename: String,
    pub coursedesc: String,
    pub visibility: Option<u8>,
    #[serde(flatten)]
    pub extra: ParameterMap,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveUserToClass {
    pub user_identifier: String,
    pub class: String,
    pub official_date: Option<String>,
    #[serde(flatten)]
    pub extra: ParameterMap,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveUserFromGroup {
    pub user_identifier: String,
    pub class: String,
    pub official_date: Option<String>,
    #[serde(flatten)]
    pub extra: ParameterMap,
}

impl_request! {
    SaveUser => SaveUser,
    SendMsg => SendMsg,
    UserDetails => GetUserDetails,
    DelUser => DelUser,
    GetAbsents => GetAbsents,
    SaveClass => SaveClass,
    SetAccountStatus => SetAccountStatus,
    SavePassword => SavePassword,
    AddCourse => AddCourse,
    SaveUserToClass => SaveUserToClass,
    RemoveUserFromGroup => RemoveUserFromGroup,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(params: &ParameterMap) -> Vec<&str> {
        params.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_send_msg_uses_remote_names() {
        let params = SendMsg {
            user_identifier: "jane.roe".into(),
            title: "Hallo".into(),
            body: "Lorem ipsum".into(),
            sender_identifier: "admin".into(),
            attachments: Some(vec![Attachment {
                filename: "a.txt".into(),
                filedata: "SGk=".into(),
            }]),
            copy_to_lvs: Some(true),
            ..Default::default()
        }
        .to_params()
        .unwrap();

        assert_eq!(
            keys(&params),
            [
                "userIdentifier",
                "title",
                "body",
                "senderIdentifier",
                "attachments",
                "coaccount",
                "copyToLVS"
            ]
        );
        assert_eq!(params["attachments"], json!([{"filename": "a.txt", "filedata": "SGk="}]));
        assert!(params["coaccount"].is_null());
        assert_eq!(params["copyToLVS"], json!(true));
    }

    #[test]
    fn test_typed_fields_cover_required_params() {
        fn check<R: SmartschoolRequest + Default>() {
            let params = R::default().to_params().unwrap();
            for name in R::METHOD.required_params() {
                assert!(params.contains_key(*name), "{} misses {}", R::METHOD, name);
            }
            for name in params.keys() {
                assert!(
                    R::METHOD.params().any(|p| p == name),
                    "{} has unexpected {}",
                    R::METHOD,
                    name
                );
            }
        }

        check::<SaveUser>();
        check::<SendMsg>();
        check::<UserDetails>();
        check::<DelUser>();
        check::<GetAbsents>();
        check::<SaveClass>();
        check::<SetAccountStatus>();
        check::<SavePassword>();
        check::<AddCourse>();
        check::<SaveUserToClass>();
        check::<RemoveUserFromGroup>();
    }

    #[test]
    fn test_extra_fields_are_flattened() {
        let mut extra = ParameterMap::new();
        extra.insert("number".to_string(), json!("12345"));

        let params = UserDetails {
            user_identifier: "john.doe".into(),
            extra,
        }
        .to_params()
        .unwrap();

        assert_eq!(params["userIdentifier"], json!("john.doe"));
        assert_eq!(params["number"], json!("12345"));
        assert_eq!(UserDetails::METHOD, Method::GetUserDetails);
    }

    #[test]
    fn test_class_keeps_its_name() {
        let params = SaveUserToClass {
            user_identifier: "john.doe".into(),
            class: "3A".into(),
            ..Default::default()
        }
        .to_params()
        .unwrap();

        assert_eq!(keys(&params), ["userIdentifier", "class", "officialDate"]);
    }
}
