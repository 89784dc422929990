//! Doppelganger API credentials.
//!
//! The descriptor is pure declaration: two fields and one authentication
//! rule. The rule is applied to every outgoing request by
//! [`DoppelgangerCredentials::authenticate`].

use std::fmt;

use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CredentialsError;

/// Credential type name the node asks its host for.
pub const CREDENTIAL_TYPE: &str = "doppelgangerApi";

/// Base URL offered when an operator has not configured one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11345";

/// Request header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// One configurable credential field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialField {
    pub name: &'static str,
    pub display_name: &'static str,
    pub default: &'static str,
    pub required: bool,
    /// Rendered as a password input and never echoed back.
    pub secret: bool,
    pub description: &'static str,
}

/// How credentials are attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthRule {
    /// Send the value of credential field `field` in header `header`.
    Header {
        header: &'static str,
        field: &'static str,
    },
}

/// Static declaration of the Doppelganger credential type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub documentation_url: &'static str,
    pub fields: Vec<CredentialField>,
    pub authenticate: AuthRule,
}

/// The descriptor for [`CREDENTIAL_TYPE`].
pub fn descriptor() -> CredentialDescriptor {
    CredentialDescriptor {
        name: CREDENTIAL_TYPE,
        display_name: "Doppelganger API",
        documentation_url: "https://doppelgangerdev.com/docs/api-authentication-and-secure-access",
        fields: vec![
            CredentialField {
                name: "baseUrl",
                display_name: "Base URL",
                default: DEFAULT_BASE_URL,
                required: true,
                secret: false,
                description: "Doppelganger server base URL",
            },
            CredentialField {
                name: "apiKey",
                display_name: "API Key",
                default: "",
                required: true,
                secret: true,
                description: "API key from Doppelganger Settings",
            },
        ],
        authenticate: AuthRule::Header {
            header: API_KEY_HEADER,
            field: "apiKey",
        },
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Credential values as stored by the host.
///
/// Fields absent from the stored object decode as empty strings; the
/// [`DEFAULT_BASE_URL`] only applies to freshly created credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoppelgangerCredentials {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl DoppelgangerCredentials {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Decode the JSON object returned by a host.
    pub fn from_value(value: Value) -> Result<Self, CredentialsError> {
        serde_json::from_value(value).map_err(|e| CredentialsError::Invalid {
            credential_type: CREDENTIAL_TYPE.to_owned(),
            message: e.to_string(),
        })
    }

    /// The base URL with every trailing `/` removed. May be empty.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Apply the header authentication rule to a request.
    pub fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.api_key)
    }
}

impl Default for DoppelgangerCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, "")
    }
}

impl fmt::Debug for DoppelgangerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoppelgangerCredentials")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
