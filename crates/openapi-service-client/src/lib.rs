//! # OpenAPI Service Client
//!
//! Invokes OpenAPI operations from LLM function-calling output.
//!
//! ## Features
//!
//! - Load OpenAPI v3 specifications from files, URLs or text (JSON and YAML)
//! - Look up operations by path, path substring or operationId
//! - Extract function calls from OpenAI, Anthropic and Cohere payloads
//! - Build requests with path, query, header and cookie parameters and JSON bodies
//! - Apply API key, HTTP basic/bearer and OAuth2 authentication from the spec's security schemes
//! - Export operations as tool definitions for each provider
//!
//! ## Example
//!
//! ```no_run
//! use openapi_service_client::{ClientConfiguration, OpenApiServiceClient, OpenApiSpec};
//! use serde_json::json;
//! use std::env;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = ClientConfiguration::builder()
//!     .with_openapi_spec(OpenApiSpec::from_file("./api/openapi.yaml")?)
//!     .with_credentials(env::var("API_KEY")?)
//!     .build()?;
//! let client = OpenApiServiceClient::new(config);
//!
//! // Tool definitions to hand to the model
//! let tools = client.configuration().tools_definitions()?;
//! println!("Exposing {} tools", tools.len());
//!
//! // A function call the model made back
//! let completion = json!({
//!     "choices": [{"message": {"tool_calls": [{
//!         "type": "function",
//!         "function": {"name": "greet", "arguments": "{\"name\": \"John\"}"}
//!     }]}}]
//! });
//! let response = client.invoke(&completion).await?;
//! println!("{}", response);
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod config;
mod converter;
mod error;
mod extractor;
mod operation;
mod provider;
mod refs;
mod request;
mod spec;
mod telemetry;
mod transport;
mod types;

pub use auth::{
    ApiKeyAuthentication, AuthenticationFactory, AuthenticationStrategy, Credentials,
    DefaultAuthenticationFactory, HttpAuthentication, OAuthAuthentication,
    PassThroughAuthentication,
};
pub use client::OpenApiServiceClient;
pub use config::{
    ClientConfig, ClientConfiguration, ClientConfigurationBuilder, HttpClientConfig,
    LoggingConfig, SpecConfig, SpecSource,
};
pub use converter::{CohereSchemaConverter, OpenAiSchemaConverter, SchemaConverter};
pub use error::{OpenApiError, Result};
pub use extractor::{
    DefaultPayloadExtractor, FunctionInvocation, FunctionPayloadExtractor, ToJsonValue, search,
};
pub use operation::Operation;
pub use provider::LlmProvider;
pub use refs::resolve_refs;
pub use request::{BasicCredentials, RequestBuilder, RequestDraft};
pub use spec::{OpenApiSpec, SpecPolicy};
pub use telemetry::init_logging;
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::{ApiParameter, HttpMethod, ParameterLocation};
