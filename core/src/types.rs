//! Typed shapes of vault API envelopes.
//!
//! # Design
//! Classification never depends on these types; it reads the raw envelope.
//! They describe what each endpoint is expected to return and are reached
//! through `ApiResponse::data`. Every field is defaulted so that a server
//! omitting one does not turn a good reply into a deserialization error.
//! Ids travel as strings; numeric ids in a reply are accepted too.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Login variants carried in the `logintype` field of `POST /auth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginType {
    Totp,
    Smartcard,
}

impl LoginType {
    pub fn as_str(self) -> &'static str {
        match self {
            LoginType::Totp => "totp",
            LoginType::Smartcard => "smartcard",
        }
    }
}

/// Common `CALLINFO` block. Endpoint-specific members land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CallInfo {
    pub status: String,
    #[serde(deserialize_with = "lenient_u64")]
    pub errors: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub errorcodes: u64,
    pub general: Vec<String>,
    pub handler: String,
    pub token: Option<String>,
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Envelope fields every reply may carry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Envelope {
    #[serde(rename = "CALLINFO")]
    pub call_info: CallInfo,
    #[serde(rename = "ERRORS")]
    pub errors: Vec<String>,
    #[serde(rename = "ERRORCODES")]
    pub error_codes: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Vault {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub groupname: String,
    pub policy: String,
    pub description: String,
    pub status: String,
    pub statustext: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileInfo {
    pub objectid: String,
    pub name: String,
    pub size: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub filepath: String,
    pub created: String,
    pub ext: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VaultObject {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub parentid: String,
    #[serde(deserialize_with = "lenient_string")]
    pub templateid: String,
    #[serde(deserialize_with = "lenient_string")]
    pub groupid: String,
    pub status: String,
    pub objectname: String,
    pub filename: String,
    #[serde(deserialize_with = "lenient_string")]
    pub children: String,
    pub tags: String,
    pub public: BTreeMap<String, String>,
    /// Present only on decrypted reads.
    pub crypted: Option<BTreeMap<String, String>>,
    pub fileinfo: Option<FileInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TemplateInfo {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub name: String,
    pub ico: String,
    pub active: bool,
    pub wb: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TemplateField {
    pub translation: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub encrypted: bool,
    pub show: bool,
    pub policy: bool,
    pub alarm: bool,
    pub opt: bool,
    pub options: Option<Vec<String>>,
    pub placeholder: Option<String>,
    pub fieldname: String,
}

/// Template as embedded in object replies.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Template {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub info: TemplateInfo,
    pub structure: Vec<TemplateField>,
}

/// Template as returned by the template endpoints, which keep the older
/// upper-case layout with fields keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LegacyTemplate {
    #[serde(rename = "INFO")]
    pub info: TemplateInfo,
    #[serde(rename = "STRUCTURE")]
    pub structure: BTreeMap<String, TemplateField>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub fingerprint: String,
    pub otpprefix: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VaultMember {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub status: String,
    pub groupstatus: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    #[serde(deserialize_with = "lenient_u64")]
    pub id: u64,
    pub name: String,
    pub rules: BTreeMap<String, Value>,
}

macro_rules! envelope {
    ($(#[$meta:meta])* $name:ident { $($(#[$fmeta:meta])* $field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
        #[serde(default)]
        pub struct $name {
            #[serde(rename = "CALLINFO")]
            pub call_info: CallInfo,
            $($(#[$fmeta])* pub $field: $ty,)*
        }
    };
}

envelope!(
    /// Reply to the login family. `CALLINFO` carries the token and the
    /// user's profile.
    LoginData {}
);
envelope!(LogoutData {});
envelope!(CheckData {});
envelope!(StatusData {});
envelope!(VaultsData {
    #[serde(rename = "VAULTS")]
    vaults: Vec<Vault>,
});
envelope!(VaultData {
    #[serde(rename = "VAULT")]
    vault: Vec<Vault>,
});
envelope!(VaultObjectsData {
    #[serde(rename = "VAULT")]
    vault: Vec<Vault>,
    #[serde(rename = "OBJECTS")]
    objects: Vec<VaultObject>,
    #[serde(rename = "TEMPLATES")]
    templates: Vec<Template>,
});
envelope!(
    /// Members are reported inside `CALLINFO.vaultmembers`.
    VaultMembersData {}
);
envelope!(ObjectData {
    #[serde(rename = "OBJECT")]
    object: Vec<VaultObject>,
    #[serde(rename = "TEMPLATES")]
    templates: Vec<Template>,
});
envelope!(
    /// The new object's id is reported as `CALLINFO.objectid`.
    CreateObjectData {}
);
envelope!(TemplateData {
    #[serde(rename = "TEMPLATE")]
    template: Vec<LegacyTemplate>,
});
envelope!(UsersData {});
envelope!(PoliciesData {});
envelope!(VersionData {});
envelope!(PasswordData {});

impl VaultMembersData {
    pub fn members(&self) -> Result<Vec<VaultMember>, serde_json::Error> {
        call_info_list(&self.call_info, "vaultmembers")
    }
}

impl UsersData {
    pub fn users(&self) -> Result<Vec<User>, serde_json::Error> {
        call_info_list(&self.call_info, "users")
    }
}

impl PoliciesData {
    pub fn policies(&self) -> Result<Vec<PasswordPolicy>, serde_json::Error> {
        call_info_list(&self.call_info, "policies")
    }
}

impl VersionData {
    pub fn version(&self) -> Option<&str> {
        self.call_info.extra.get("version")?.as_str()
    }
}

impl PasswordData {
    pub fn passphrase(&self) -> Option<&str> {
        self.call_info.extra.get("passphrase")?.as_str()
    }
}

impl CreateObjectData {
    pub fn object_id(&self) -> Option<String> {
        match self.call_info.extra.get("objectid")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

fn call_info_list<T: for<'de> Deserialize<'de>>(
    call_info: &CallInfo,
    key: &str,
) -> Result<Vec<T>, serde_json::Error> {
    match call_info.extra.get(key) {
        Some(value) => Vec::<T>::deserialize(value),
        None => Ok(Vec::new()),
    }
}

/// Password generator flavours understood by `/utils/pwgen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordType {
    Pronouncable,
    Diceword,
    Opie,
    Secure,
    Pin,
    Bytes,
}

impl PasswordType {
    pub fn as_str(self) -> &'static str {
        match self {
            PasswordType::Pronouncable => "pronouncable",
            PasswordType::Diceword => "diceword",
            PasswordType::Opie => "opie",
            PasswordType::Secure => "secure",
            PasswordType::Pin => "pin",
            PasswordType::Bytes => "bytes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PasswordLanguage {
    #[serde(rename = "en_US")]
    English,
    #[serde(rename = "sv_SE")]
    Swedish,
}

impl PasswordLanguage {
    pub fn as_str(self) -> &'static str {
        match self {
            PasswordLanguage::English => "en_US",
            PasswordLanguage::Swedish => "sv_SE",
        }
    }
}

/// Query parameters of `GET /utils/pwgen`. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordParams {
    pub kind: Option<PasswordType>,
    pub length: Option<u32>,
    pub language: Option<PasswordLanguage>,
    pub delimiter: Option<String>,
    pub words: Option<u32>,
    pub min_char: Option<u32>,
    pub max_char: Option<u32>,
    pub policy_id: Option<String>,
}

impl PasswordParams {
    /// Query pairs in wire order, using the server's parameter names.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                query.push((key.to_string(), value));
            }
        };
        push("type", self.kind.map(|k| k.as_str().to_string()));
        push("length", self.length.map(|n| n.to_string()));
        push("language", self.language.map(|l| l.as_str().to_string()));
        // The server spells it this way.
        push("delimeter", self.delimiter.clone());
        push("words", self.words.map(|n| n.to_string()));
        push("min_char", self.min_char.map(|n| n.to_string()));
        push("max_char", self.max_char.map(|n| n.to_string()));
        push("policyid", self.policy_id.clone());
        query
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}
