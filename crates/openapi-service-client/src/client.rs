//! The service client: LLM payload in, API response out.

use crate::config::ClientConfiguration;
use crate::error::{OpenApiError, Result, truncate_for_display};
use crate::extractor::ToJsonValue;
use crate::request::{RequestBuilder, RequestDraft};
use serde_json::Value;
use tracing::{info, instrument};

/// Longest payload excerpt carried by a [`OpenApiError::PayloadExtractionFailed`].
const PAYLOAD_EXCERPT_LEN: usize = 200;

/// Invokes OpenAPI operations on behalf of LLM function calls.
#[derive(Debug, Clone)]
pub struct OpenApiServiceClient {
    config: ClientConfiguration,
    request_builder: RequestBuilder,
}

impl OpenApiServiceClient {
    pub fn new(config: ClientConfiguration) -> Self {
        let request_builder = RequestBuilder::new(config.authentication().clone());
        Self {
            config,
            request_builder,
        }
    }

    pub fn configuration(&self) -> &ClientConfiguration {
        &self.config
    }

    /// Turn a completion payload into the HTTP request it asks for, without
    /// sending it.
    pub fn prepare<P: ToJsonValue + ?Sized>(&self, payload: &P) -> Result<RequestDraft> {
        let payload = payload.to_json_value()?;
        let extractor = self.config.payload_extractor();

        let invocation = extractor
            .extract_function_invocation(&payload)?
            .ok_or_else(|| OpenApiError::PayloadExtractionFailed {
                fields: extractor.required_fields().join(", "),
                payload: truncate_for_display(&payload, PAYLOAD_EXCERPT_LEN),
            })?;

        let operation = self
            .config
            .openapi_spec()
            .find_operation_by_id(&invocation.name, None)?;
        self.request_builder
            .build_request(&operation, &invocation.arguments)
    }

    /// Extract the function call from `payload`, invoke the matching
    /// operation and return the decoded JSON response.
    #[instrument(skip_all)]
    pub async fn invoke<P: ToJsonValue + ?Sized>(&self, payload: &P) -> Result<Value> {
        let draft = self.prepare(payload)?;
        info!("Invoking {} {}", draft.method, draft.url);
        self.config.transport().send_request(&draft).await
    }
}
