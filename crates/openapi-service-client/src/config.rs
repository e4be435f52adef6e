//! Client configuration
//!
//! Two layers:
//! 1. [`ClientConfig`]: the serializable file form (`client.toml`)
//! 2. [`ClientConfiguration`]: the resolved runtime object (spec, auth
//!    strategy, transport, provider), built directly or from a file config

use crate::auth::{
    AuthenticationFactory, AuthenticationStrategy, Credentials, DefaultAuthenticationFactory,
};
use crate::error::{OpenApiError, Result};
use crate::extractor::FunctionPayloadExtractor;
use crate::provider::LlmProvider;
use crate::spec::{OpenApiSpec, SpecPolicy};
use crate::telemetry::init_logging;
use crate::transport::{HttpTransport, ReqwestTransport};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// File-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub spec: SpecConfig,

    /// Bare secret or a credential table (`username`/`password`, `api_key`,
    /// `token`, `access_token`/`token_type`). Strings may be `${VAR_NAME}`.
    #[serde(default)]
    pub credentials: Option<Value>,

    #[serde(default)]
    pub provider: LlmProvider,

    #[serde(default)]
    pub http: HttpClientConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the OpenAPI document comes from. Exactly one source must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecConfig {
    pub path: Option<PathBuf>,
    pub url: Option<String>,
    /// Inline JSON or YAML text
    pub content: Option<String>,

    /// Require `openapi`, `paths` and `servers` at the document root
    #[serde(default = "default_strict")]
    pub strict: bool,
}

/// A single, validated spec source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    Path(PathBuf),
    Url(Url),
    Content(String),
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sent with every request unless the request sets the same header.
    /// Values can reference env vars with ${VAR_NAME}.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            default_headers: BTreeMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl SpecConfig {
    pub fn source(&self) -> Result<SpecSource> {
        match (&self.path, &self.url, &self.content) {
            (Some(path), None, None) => Ok(SpecSource::Path(path.clone())),
            (None, Some(url), None) => Url::parse(url).map(SpecSource::Url).map_err(|e| {
                OpenApiError::Config(format!("invalid spec url '{}': {}", url, e))
            }),
            (None, None, Some(content)) => Ok(SpecSource::Content(content.clone())),
            (None, None, None) => Err(OpenApiError::config_error(
                "[spec] needs one of 'path', 'url' or 'content'",
            )),
            _ => Err(OpenApiError::config_error(
                "[spec] accepts only one of 'path', 'url' or 'content'",
            )),
        }
    }

    pub fn policy(&self) -> SpecPolicy {
        if self.strict {
            SpecPolicy::Strict
        } else {
            SpecPolicy::Lenient
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file and resolve `${VAR}` references.
    pub fn load_from(path: &Path) -> Result<Self> {
        read_config(path).map_err(|e| OpenApiError::Config(format!("{:#}", e)))
    }

    /// Parse configuration from TOML text and resolve `${VAR}` references.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: ClientConfig = toml::from_str(contents)
            .map_err(|e| OpenApiError::Config(format!("failed to parse config: {}", e)))?;
        config.resolve_env_vars()?;
        Ok(config)
    }

    /// Credentials from the `credentials` entry, if any.
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        self.credentials
            .clone()
            .map(Credentials::try_from)
            .transpose()
    }

    fn resolve_env_vars(&mut self) -> Result<()> {
        if let Some(credentials) = self.credentials.as_mut() {
            resolve_value(credentials)?;
        }
        for value in self.http.default_headers.values_mut() {
            *value = resolve_env_var(value)?;
        }
        if let Some(url) = self.spec.url.as_mut() {
            *url = resolve_env_var(url)?;
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> anyhow::Result<ClientConfig> {
    debug!("Loading configuration from: {:?}", path);

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    ClientConfig::from_toml_str(&contents)
        .with_context(|| format!("Failed to load config file: {:?}", path))
}

/// Resolve a single ${VAR_NAME} reference; other strings pass through.
fn resolve_env_var(value: &str) -> Result<String> {
    match value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(var_name) => env::var(var_name).map_err(|_| {
            OpenApiError::Config(format!("environment variable '{}' is not set", var_name))
        }),
        None => Ok(value.to_string()),
    }
}

fn resolve_value(value: &mut Value) -> Result<()> {
    match value {
        Value::String(s) => *s = resolve_env_var(s)?,
        Value::Object(map) => {
            for nested in map.values_mut() {
                resolve_value(nested)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn default_strict() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Everything an [`OpenApiServiceClient`](crate::OpenApiServiceClient) needs.
///
/// Read-only after construction and cheap to clone.
#[derive(Clone)]
pub struct ClientConfiguration {
    spec: Arc<OpenApiSpec>,
    auth: Arc<dyn AuthenticationStrategy>,
    transport: Arc<dyn HttpTransport>,
    payload_extractor: Arc<dyn FunctionPayloadExtractor>,
    provider: LlmProvider,
}

impl fmt::Debug for ClientConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfiguration")
            .field("title", &self.spec.title())
            .field("auth", &self.auth)
            .field("payload_extractor", &self.payload_extractor)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl ClientConfiguration {
    pub fn builder() -> ClientConfigurationBuilder {
        ClientConfigurationBuilder::default()
    }

    /// Resolve a file configuration: install the `[logging]` subscriber,
    /// load the spec, pick the auth strategy, build the reqwest transport.
    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        init_logging(&config.logging)?;

        let policy = config.spec.policy();
        let spec = match config.spec.source()? {
            SpecSource::Path(path) => OpenApiSpec::from_file_with_policy(path, policy)?,
            SpecSource::Url(url) => OpenApiSpec::from_url_with_policy(url.as_str(), policy).await?,
            SpecSource::Content(content) => OpenApiSpec::from_str_with_policy(&content, policy)?,
        };

        let mut builder = Self::builder()
            .with_openapi_spec(spec)
            .with_http_client_config(config.http.clone())
            .with_provider(config.provider);
        if let Some(credentials) = config.credentials()? {
            builder = builder.with_credentials(credentials);
        }
        builder.build()
    }

    pub fn openapi_spec(&self) -> &OpenApiSpec {
        &self.spec
    }

    pub fn authentication(&self) -> &Arc<dyn AuthenticationStrategy> {
        &self.auth
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    pub fn payload_extractor(&self) -> &Arc<dyn FunctionPayloadExtractor> {
        &self.payload_extractor
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Tool definitions for the configured provider.
    pub fn tools_definitions(&self) -> Result<Vec<Value>> {
        self.provider.schema_converter().convert(&self.spec)
    }
}

/// Builder for [`ClientConfiguration`].
#[derive(Default)]
pub struct ClientConfigurationBuilder {
    spec: Option<OpenApiSpec>,
    credentials: Option<Credentials>,
    transport: Option<Arc<dyn HttpTransport>>,
    http_config: HttpClientConfig,
    provider: LlmProvider,
    payload_extractor: Option<Arc<dyn FunctionPayloadExtractor>>,
    auth_factory: Option<Arc<dyn AuthenticationFactory>>,
}

impl ClientConfigurationBuilder {
    pub fn with_openapi_spec(mut self, spec: OpenApiSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    pub fn with_credentials(mut self, credentials: impl Into<Credentials>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    /// Use a custom transport instead of the reqwest one.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Settings for the default reqwest transport; ignored with [`Self::with_transport`].
    pub fn with_http_client_config(mut self, config: HttpClientConfig) -> Self {
        self.http_config = config;
        self
    }

    pub fn with_provider(mut self, provider: LlmProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Override the provider's payload extractor.
    pub fn with_payload_extractor(mut self, extractor: Arc<dyn FunctionPayloadExtractor>) -> Self {
        self.payload_extractor = Some(extractor);
        self
    }

    pub fn with_auth_factory(mut self, factory: Arc<dyn AuthenticationFactory>) -> Self {
        self.auth_factory = Some(factory);
        self
    }

    pub fn build(self) -> Result<ClientConfiguration> {
        let spec = self
            .spec
            .ok_or_else(|| OpenApiError::config_error("an OpenAPI spec is required"))?;

        let factory = self
            .auth_factory
            .unwrap_or_else(|| Arc::new(DefaultAuthenticationFactory));
        let auth = factory.create_authentication(&spec, self.credentials)?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.http_config)?),
        };
        let payload_extractor = self
            .payload_extractor
            .unwrap_or_else(|| self.provider.payload_extractor());

        debug!(
            "Client configured for '{}' with {} payloads",
            spec.title(),
            self.provider
        );

        Ok(ClientConfiguration {
            spec: Arc::new(spec),
            auth,
            transport,
            payload_extractor,
            provider: self.provider,
        })
    }
}
