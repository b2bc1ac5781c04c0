//! Registre des opérations exposées par les webservices V3
//!
//! Chaque opération distante est une variante de [`Method`], avec son nom
//! exact côté serveur, ses paramètres obligatoires et optionnels, et le
//! fait qu'elle exige ou non le code d'accès. Le paramètre `accesscode`
//! n'est jamais listé : le client l'injecte lui-même.

use crate::error::SmartschoolError;
use std::fmt;
use std::str::FromStr;

/// Génère l'énumération des méthodes et ses tables
///
/// ```ignore
/// define_methods! {
///     SaveUser = "saveUser" {
///         required: ["username", "name"],
///         optional: ["email"],
///     },
///     ReturnCsvErrorCodes = "returnCsvErrorCodes", auth = false {
///         required: [],
///         optional: [],
///     },
/// }
/// ```
macro_rules! define_methods {
    (@auth) => { true };
    (@auth $auth:literal) => { $auth };

    ($(
        $variant:ident = $name:literal $(, auth = $auth:literal)? {
            required: [$($req:literal),* $(,)?],
            optional: [$($opt:literal),* $(,)?] $(,)?
        }
    ),* $(,)?) => {
        /// Opération distante des webservices
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Method {
            $($variant,)*
        }

        impl Method {
            /// Toutes les opérations connues, par ordre alphabétique
            pub const ALL: &'static [Method] = &[$(Method::$variant,)*];

            /// Nom de l'opération côté serveur
            pub fn name(self) -> &'static str {
                match self {
                    $(Method::$variant => $name,)*
                }
            }

            /// `false` seulement pour les opérations publiques
            pub fn needs_auth(self) -> bool {
                match self {
                    $(Method::$variant => define_methods!(@auth $($auth)?),)*
                }
            }

            pub fn required_params(self) -> &'static [&'static str] {
                match self {
                    $(Method::$variant => &[$($req),*],)*
                }
            }

            pub fn optional_params(self) -> &'static [&'static str] {
                match self {
                    $(Method::$variant => &[$($opt),*],)*
                }
            }
        }

        impl FromStr for Method {
            type Err = SmartschoolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Method::$variant),)*
                    other => Err(SmartschoolError::UnknownMethod(other.to_string())),
                }
            }
        }
    };
}

define_methods! {
    AddCourse = "addCourse" {
        required: ["coursename", "coursedesc"],
        optional: ["visibility"],
    },
    AddCourseStudents = "addCourseStudents" {
        required: ["coursename", "coursedesc", "groupIds"],
        optional: [],
    },
    AddCourseTeacher = "addCourseTeacher" {
        required: ["coursename", "coursedesc", "userIdentifier", "internnummer"],
        optional: [],
    },
    AddHelpdeskTicket = "addHelpdeskTicket" {
        required: ["userIdentifier", "title", "description", "priority", "miniDbItem"],
        optional: [],
    },
    ChangeGroupOwners = "changeGroupOwners" {
        required: ["code", "userlist"],
        optional: [],
    },
    ChangeInternNumber = "changeInternNumber" {
        required: ["username", "newInternNumber"],
        optional: [],
    },
    ChangePasswordAtNextLogin = "changePasswordAtNextLogin" {
        required: ["userIdentifier", "accountType"],
        optional: [],
    },
    ChangeUsername = "changeUsername" {
        required: ["internNumber", "newUsername"],
        optional: [],
    },
    CheckStatus = "checkStatus" {
        required: ["serviceId"],
        optional: [],
    },
    ClearGroup = "clearGroup" {
        required: ["group"],
        optional: ["officialDate"],
    },
    DeactivateTwoFactorAuthentication = "deactivateTwoFactorAuthentication" {
        required: ["userIdentifier", "accountType"],
        optional: [],
    },
    DelClass = "delClass" {
        required: ["code"],
        optional: [],
    },
    DelUser = "delUser" {
        required: ["userIdentifier"],
        optional: ["officialDate"],
    },
    ForcePasswordReset = "forcePasswordReset" {
        required: ["userIdentifier", "accountType"],
        optional: [],
    },
    GetAbsents = "getAbsents" {
        required: ["userIdentifier", "schoolYear"],
        optional: [],
    },
    GetAbsentsByDate = "getAbsentsByDate" {
        required: ["date"],
        optional: [],
    },
    GetAbsentsByDateAndGroup = "getAbsentsByDateAndGroup" {
        required: ["date", "code"],
        optional: [],
    },
    GetAbsentsWithAlias = "getAbsentsWithAlias" {
        required: ["userIdentifier", "schoolYear"],
        optional: [],
    },
    GetAbsentsWithAliasByDate = "getAbsentsWithAliasByDate" {
        required: ["date"],
        optional: [],
    },
    GetAbsentsWithInternalNumberByDate = "getAbsentsWithInternalNumberByDate" {
        required: ["date"],
        optional: [],
    },
    GetAccountPhoto = "getAccountPhoto" {
        required: ["userIdentifier"],
        optional: [],
    },
    GetAllAccounts = "getAllAccounts" {
        required: ["code", "recursive"],
        optional: [],
    },
    GetAllAccountsExtended = "getAllAccountsExtended" {
        required: ["code", "recursive"],
        optional: [],
    },
    GetAllGroupsAndClasses = "getAllGroupsAndClasses" {
        required: [],
        optional: [],
    },
    GetClassList = "getClassList" {
        required: [],
        optional: [],
    },
    GetClassListJson = "getClassListJson" {
        required: [],
        optional: [],
    },
    GetClassTeachers = "getClassTeachers" {
        required: [],
        optional: ["getAllOwners"],
    },
    GetCourses = "getCourses" {
        required: [],
        optional: [],
    },
    GetHelpdeskMiniDbItems = "getHelpdeskMiniDbItems" {
        required: [],
        optional: [],
    },
    GetReferenceField = "getReferenceField" {
        required: [],
        optional: [],
    },
    GetSchoolyearDataOfClass = "getSchoolyearDataOfClass" {
        required: ["classCode"],
        optional: [],
    },
    GetSkoreClassTeacherCourseRelation = "getSkoreClassTeacherCourseRelation" {
        required: [],
        optional: [],
    },
    GetStudentCareer = "getStudentCareer" {
        required: ["userIdentifier"],
        optional: [],
    },
    GetUserDetails = "getUserDetails" {
        required: ["userIdentifier"],
        optional: [],
    },
    GetUserDetailsByNumber = "getUserDetailsByNumber" {
        required: ["number"],
        optional: [],
    },
    GetUserDetailsByScannableCode = "getUserDetailsByScannableCode" {
        required: ["scannableCode"],
        optional: [],
    },
    GetUserDetailsByUsername = "getUserDetailsByUsername" {
        required: ["username"],
        optional: [],
    },
    GetUserOfficialClass = "getUserOfficialClass" {
        required: ["userIdentifier", "date"],
        optional: [],
    },
    RemoveCoAccount = "removeCoAccount" {
        required: ["userIdentifier", "accountType"],
        optional: [],
    },
    RemoveUserFromGroup = "removeUserFromGroup" {
        required: ["userIdentifier", "class"],
        optional: ["officialDate"],
    },
    ReplaceInum = "replaceInum" {
        required: ["oldInum", "newInum"],
        optional: [],
    },
    ReturnCsvErrorCodes = "returnCsvErrorCodes", auth = false {
        required: [],
        optional: [],
    },
    ReturnJsonErrorCodes = "returnJsonErrorCodes", auth = false {
        required: [],
        optional: [],
    },
    SaveClass = "saveClass" {
        required: ["name", "desc", "code", "parent", "untis"],
        optional: ["instituteNumber", "adminNumber", "schoolYearDate"],
    },
    SaveClassList = "saveClassList" {
        required: ["serializedList"],
        optional: [],
    },
    SaveClassListJson = "saveClassListJson" {
        required: ["jsonList"],
        optional: [],
    },
    SaveGroup = "saveGroup" {
        required: ["name", "desc", "code", "parent", "untis"],
        optional: [],
    },
    SavePassword = "savePassword" {
        required: ["userIdentifier", "accountType", "password", "changePasswordAtNextLogin"],
        optional: [],
    },
    SaveSchoolyearDataOfClass = "saveSchoolyearDataOfClass" {
        required: [
            "classCode",
            "date",
            "instituteNumber",
            "administrativeGroupNumber",
            "residence",
            "domain",
            "principal",
        ],
        optional: [],
    },
    SaveSignature = "saveSignature" {
        required: ["userIdentifier", "accountType", "signature"],
        optional: [],
    },
    SaveUser = "saveUser" {
        required: ["username", "name", "surname", "basisrol"],
        optional: [
            "passwd1",
            "internnumber",
            "extranames",
            "initials",
            "sex",
            "birthdate",
            "birthcity",
            "birthcountry",
            "nationality",
            "address",
            "postalcode",
            "city",
            "country",
            "phone",
            "mobile",
            "email",
            "passwd2",
            "passwd3",
        ],
    },
    SaveUserParameter = "saveUserParameter" {
        required: ["userIdentifier", "paramName", "paramValue"],
        optional: [],
    },
    SaveUserToClass = "saveUserToClass" {
        required: ["userIdentifier", "class"],
        optional: ["officialDate"],
    },
    SaveUserToClasses = "saveUserToClasses" {
        required: ["userIdentifier", "csvList"],
        optional: [],
    },
    SaveUserToClassesAndGroups = "saveUserToClassesAndGroups" {
        required: ["userIdentifier", "csvList", "keepOld"],
        optional: [],
    },
    SendMsg = "sendMsg" {
        required: ["userIdentifier", "title", "body", "senderIdentifier"],
        optional: ["attachments", "coaccount", "copyToLVS"],
    },
    SetAccountPhoto = "setAccountPhoto" {
        required: ["userIdentifier", "photo"],
        optional: [],
    },
    SetAccountStatus = "setAccountStatus" {
        required: ["userIdentifier", "accountStatus"],
        optional: [],
    },
    StartSkoreSync = "startSkoreSync" {
        required: [],
        optional: [],
    },
    UnregisterStudent = "unregisterStudent" {
        required: ["userIdentifier"],
        optional: ["officialDate"],
    },
}

impl Method {
    /// Tous les paramètres acceptés, obligatoires d'abord
    pub fn params(self) -> impl Iterator<Item = &'static str> {
        self.required_params()
            .iter()
            .chain(self.optional_params())
            .copied()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_size_and_unique_names() {
        assert_eq!(Method::ALL.len(), 60);
        let names: HashSet<_> = Method::ALL.iter().map(|m| m.name()).collect();
        assert_eq!(names.len(), Method::ALL.len());
    }

    #[test]
    fn test_names_round_trip_through_from_str() {
        for method in Method::ALL {
            assert_eq!(method.name().parse::<Method>().unwrap(), *method);
            assert_eq!(method.to_string(), method.name());
        }
    }

    #[test]
    fn test_unknown_method() {
        let err = "doesNotExist".parse::<Method>().unwrap_err();
        assert!(matches!(err, SmartschoolError::UnknownMethod(ref name) if name == "doesNotExist"));
        // Le nom distant est sensible à la casse
        assert!("SaveUser".parse::<Method>().is_err());
    }

    #[test]
    fn test_only_error_code_listings_are_public() {
        let public: Vec<_> = Method::ALL
            .iter()
            .filter(|m| !m.needs_auth())
            .map(|m| m.name())
            .collect();
        assert_eq!(public, ["returnCsvErrorCodes", "returnJsonErrorCodes"]);
    }

    #[test]
    fn test_accesscode_is_never_listed() {
        for method in Method::ALL {
            assert!(method.params().all(|p| p != "accesscode"), "{}", method);
        }
    }

    #[test]
    fn test_parameter_shapes() {
        assert_eq!(
            Method::SendMsg.required_params(),
            ["userIdentifier", "title", "body", "senderIdentifier"]
        );
        assert_eq!(
            Method::SendMsg.optional_params(),
            ["attachments", "coaccount", "copyToLVS"]
        );
        assert!(Method::GetCourses.required_params().is_empty());
        assert_eq!(Method::DelUser.params().collect::<Vec<_>>(), ["userIdentifier", "officialDate"]);
    }
}
