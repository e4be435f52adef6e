//! Authentication strategies applied to request drafts.
//!
//! The security *requirement* on an operation says which scheme applies; the
//! security *scheme* in `components.securitySchemes` says how. A strategy
//! holds the credential material and writes it into a [`RequestDraft`]
//! according to the scheme it is handed.
//!
//! Supported strategies:
//! - Pass-through (no credentials)
//! - API Key (header, query parameter or cookie)
//! - HTTP Basic and Bearer
//! - OAuth2 access token

use crate::error::{OpenApiError, Result};
use crate::request::RequestDraft;
use crate::spec::OpenApiSpec;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Writes credentials into a request draft for a given security scheme.
pub trait AuthenticationStrategy: Send + Sync + fmt::Debug {
    /// Mutate `request` according to `security_scheme`.
    fn apply_auth(&self, security_scheme: &Value, request: &mut RequestDraft) -> Result<()>;
}

fn scheme_field<'a>(security_scheme: &'a Value, key: &str) -> &'a str {
    security_scheme
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn require_non_empty(value: impl Into<String>, what: &str) -> Result<String> {
    let value = value.into();
    if value.is_empty() {
        return Err(OpenApiError::InvalidCredentials(format!(
            "{} must not be empty",
            what
        )));
    }
    Ok(value)
}

/// No-op strategy used when no credentials were supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughAuthentication;

impl AuthenticationStrategy for PassThroughAuthentication {
    fn apply_auth(&self, _security_scheme: &Value, _request: &mut RequestDraft) -> Result<()> {
        Ok(())
    }
}

/// API key placed in a header, query parameter or cookie, as named by the scheme.
#[derive(Clone)]
pub struct ApiKeyAuthentication {
    api_key: String,
}

impl ApiKeyAuthentication {
    /// Create API key authentication.
    ///
    /// # Example
    ///
    /// ```
    /// use openapi_service_client::ApiKeyAuthentication;
    ///
    /// let auth = ApiKeyAuthentication::new("my-secret-key").unwrap();
    /// assert!(ApiKeyAuthentication::new("").is_err());
    /// ```
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: require_non_empty(api_key, "API key")?,
        })
    }
}

impl fmt::Debug for ApiKeyAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuthentication")
            .field("api_key", &"***")
            .finish()
    }
}

impl AuthenticationStrategy for ApiKeyAuthentication {
    fn apply_auth(&self, security_scheme: &Value, request: &mut RequestDraft) -> Result<()> {
        let name = scheme_field(security_scheme, "name").to_string();
        let location = scheme_field(security_scheme, "in");
        debug!("Applying API key auth in {} as '{}'", location, name);

        match location {
            "header" => {
                request.headers.insert(name, self.api_key.clone());
            }
            "query" => {
                request
                    .params
                    .insert(name, Value::String(self.api_key.clone()));
            }
            "cookie" => {
                request.cookies.insert(name, self.api_key.clone());
            }
            other => return Err(OpenApiError::UnsupportedAuthLocation(other.to_string())),
        }
        Ok(())
    }
}

/// HTTP authentication: Basic (username + password) or Bearer (token).
///
/// Which one is written is decided by the scheme's `scheme` field.
#[derive(Clone)]
pub struct HttpAuthentication {
    username: Option<String>,
    password: Option<String>,
    token: Option<String>,
}

impl HttpAuthentication {
    /// Create basic authentication.
    ///
    /// # Example
    ///
    /// ```
    /// use openapi_service_client::HttpAuthentication;
    ///
    /// let auth = HttpAuthentication::basic("username", "password").unwrap();
    /// ```
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        Ok(Self {
            username: Some(require_non_empty(username, "Basic auth username")?),
            password: Some(require_non_empty(password, "Basic auth password")?),
            token: None,
        })
    }

    /// Create bearer token authentication.
    pub fn bearer(token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            username: None,
            password: None,
            token: Some(require_non_empty(token, "Bearer token")?),
        })
    }
}

impl fmt::Debug for HttpAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAuthentication")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl AuthenticationStrategy for HttpAuthentication {
    fn apply_auth(&self, security_scheme: &Value, request: &mut RequestDraft) -> Result<()> {
        let scheme_type = scheme_field(security_scheme, "type");
        if scheme_type != "http" {
            return Err(OpenApiError::SchemeMismatch {
                strategy: "HTTP",
                scheme_type: scheme_type.to_string(),
            });
        }

        let scheme = scheme_field(security_scheme, "scheme");
        let value = match scheme.to_ascii_lowercase().as_str() {
            "basic" => {
                let (Some(username), Some(password)) = (&self.username, &self.password) else {
                    return Err(OpenApiError::InvalidCredentials(
                        "username and password must be provided for Basic auth".to_string(),
                    ));
                };
                let encoded = STANDARD.encode(format!("{}:{}", username, password));
                format!("Basic {}", encoded)
            }
            "bearer" => {
                let Some(token) = &self.token else {
                    return Err(OpenApiError::InvalidCredentials(
                        "a token must be provided for Bearer auth".to_string(),
                    ));
                };
                format!("Bearer {}", token)
            }
            _ => return Err(OpenApiError::UnsupportedAuthScheme(scheme.to_string())),
        };

        request.headers.insert("Authorization".to_string(), value);
        Ok(())
    }
}

/// OAuth2 access token sent as `Authorization: <token_type> <access_token>`.
#[derive(Clone)]
pub struct OAuthAuthentication {
    access_token: String,
    token_type: String,
}

impl OAuthAuthentication {
    /// Create OAuth2 authentication with the default "Bearer" token type.
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            access_token: require_non_empty(access_token, "OAuth access token")?,
            token_type: "Bearer".to_string(),
        })
    }

    /// Override the token type.
    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }
}

impl fmt::Debug for OAuthAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthAuthentication")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .finish()
    }
}

impl AuthenticationStrategy for OAuthAuthentication {
    fn apply_auth(&self, security_scheme: &Value, request: &mut RequestDraft) -> Result<()> {
        let scheme_type = scheme_field(security_scheme, "type");
        if scheme_type != "oauth2" {
            return Err(OpenApiError::SchemeMismatch {
                strategy: "OAuth2",
                scheme_type: scheme_type.to_string(),
            });
        }
        request.headers.insert(
            "Authorization".to_string(),
            format!("{} {}", self.token_type, self.access_token),
        );
        Ok(())
    }
}

/// User-supplied credential material.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A bare secret; its meaning is taken from the spec's security schemes
    Raw(String),
    /// A mapping such as `{username, password}`, `{api_key}`, `{token}`
    /// or `{access_token, token_type}`
    Structured(Map<String, Value>),
    /// An already-built strategy, used as-is
    Strategy(Arc<dyn AuthenticationStrategy>),
}

impl From<&str> for Credentials {
    fn from(value: &str) -> Self {
        Credentials::Raw(value.to_string())
    }
}

impl From<String> for Credentials {
    fn from(value: String) -> Self {
        Credentials::Raw(value)
    }
}

impl From<Map<String, Value>> for Credentials {
    fn from(value: Map<String, Value>) -> Self {
        Credentials::Structured(value)
    }
}

impl From<Arc<dyn AuthenticationStrategy>> for Credentials {
    fn from(strategy: Arc<dyn AuthenticationStrategy>) -> Self {
        Credentials::Strategy(strategy)
    }
}

impl Credentials {
    /// Wrap an already-built strategy.
    pub fn strategy(strategy: impl AuthenticationStrategy + 'static) -> Self {
        Credentials::Strategy(Arc::new(strategy))
    }
}

impl TryFrom<Value> for Credentials {
    type Error = OpenApiError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Credentials::Raw(s)),
            Value::Object(map) => Ok(Credentials::Structured(map)),
            other => Err(OpenApiError::UnresolvableCredentials(format!(
                "unsupported credentials type: {}",
                crate::error::json_type_name(&other)
            ))),
        }
    }
}

/// Chooses an [`AuthenticationStrategy`] for a set of credentials.
pub trait AuthenticationFactory: Send + Sync {
    fn create_authentication(
        &self,
        spec: &OpenApiSpec,
        credentials: Option<Credentials>,
    ) -> Result<Arc<dyn AuthenticationStrategy>>;
}

/// Default credential resolution:
/// - none → pass-through
/// - a strategy → used as-is
/// - a bare string → first apiKey, http or oauth2 scheme in the spec decides
/// - a mapping → matched by key shape
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAuthenticationFactory;

impl AuthenticationFactory for DefaultAuthenticationFactory {
    fn create_authentication(
        &self,
        spec: &OpenApiSpec,
        credentials: Option<Credentials>,
    ) -> Result<Arc<dyn AuthenticationStrategy>> {
        match credentials {
            None => Ok(Arc::new(PassThroughAuthentication)),
            Some(Credentials::Strategy(strategy)) => Ok(strategy),
            Some(Credentials::Raw(secret)) => from_raw(&secret, spec.security_schemes()),
            Some(Credentials::Structured(fields)) => from_structured(&fields),
        }
    }
}

fn from_raw(
    secret: &str,
    security_schemes: &Map<String, Value>,
) -> Result<Arc<dyn AuthenticationStrategy>> {
    for (name, scheme) in security_schemes {
        let strategy: Arc<dyn AuthenticationStrategy> = match scheme_field(scheme, "type") {
            "apiKey" => Arc::new(ApiKeyAuthentication::new(secret)?),
            "http" => Arc::new(HttpAuthentication::bearer(secret)?),
            "oauth2" => Arc::new(OAuthAuthentication::new(secret)?),
            _ => continue,
        };
        debug!("Credentials matched security scheme '{}'", name);
        return Ok(strategy);
    }

    Err(OpenApiError::UnresolvableCredentials(
        "no apiKey, http or oauth2 security scheme in spec".to_string(),
    ))
}

fn from_structured(fields: &Map<String, Value>) -> Result<Arc<dyn AuthenticationStrategy>> {
    let field = |key: &str| -> Result<Option<&str>> {
        match fields.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(OpenApiError::InvalidCredentials(format!(
                "'{}' must be a string, got {}",
                key,
                crate::error::json_type_name(other)
            ))),
        }
    };

    if let (Some(username), Some(password)) = (field("username")?, field("password")?) {
        return Ok(Arc::new(HttpAuthentication::basic(username, password)?));
    }
    if let Some(api_key) = field("api_key")? {
        return Ok(Arc::new(ApiKeyAuthentication::new(api_key)?));
    }
    if let Some(token) = field("token")? {
        return Ok(Arc::new(HttpAuthentication::bearer(token)?));
    }
    if let Some(access_token) = field("access_token")? {
        let mut oauth = OAuthAuthentication::new(access_token)?;
        if let Some(token_type) = field("token_type")? {
            oauth = oauth.with_token_type(token_type);
        }
        return Ok(Arc::new(oauth));
    }

    let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
    Err(OpenApiError::UnresolvableCredentials(format!(
        "unrecognized credential fields [{}]",
        keys.join(", ")
    )))
}
