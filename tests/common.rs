//! Shared fixtures for the end-to-end tests.

#![allow(dead_code)]

use async_trait::async_trait;
use openapi_service_client::{HttpTransport, OpenApiSpec, RequestDraft, Result};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

pub const API_KEY: &str = "secret_api_key";
pub const BASIC_AUTH_USERNAME: &str = "admin";
pub const BASIC_AUTH_PASSWORD: &str = "secret_password";
pub const BEARER_TOKEN: &str = "secret_bearer_token";
pub const OAUTH_TOKEN: &str = "secret-oauth-token";

const GREETING_SERVICE: &str = r#"
openapi: 3.0.0
info:
  title: Greeting Service
  version: 1.0.0
servers:
  - url: __SERVER_URL__
paths:
  /greet-api-key/{name}:
    get:
      operationId: greetApiKey
      summary: Greet a person, authenticated with an API key header
      parameters:
        - $ref: '#/components/parameters/Name'
      security:
        - apiKeyAuth: []
      responses:
        200:
          description: Greeting
  /greet-api-key-query/{name}:
    get:
      operationId: greetApiKeyQuery
      summary: Greet a person, authenticated with an API key query parameter
      parameters:
        - $ref: '#/components/parameters/Name'
      security:
        - apiKeyQuery: []
  /greet-api-key-cookie/{name}:
    get:
      operationId: greetApiKeyCookie
      summary: Greet a person, authenticated with an API key cookie
      parameters:
        - $ref: '#/components/parameters/Name'
      security:
        - apiKeyCookie: []
  /greet-basic-auth/{name}:
    get:
      operationId: greetBasicAuth
      summary: Greet a person, authenticated with HTTP basic
      parameters:
        - $ref: '#/components/parameters/Name'
      security:
        - basicAuth: []
  /greet-bearer-auth/{name}:
    get:
      operationId: greetBearerAuth
      summary: Greet a person, authenticated with a bearer token
      parameters:
        - $ref: '#/components/parameters/Name'
      security:
        - bearerAuth: []
  /greet-oauth/{name}:
    get:
      operationId: greetOAuth
      summary: Greet a person, authenticated with OAuth2
      parameters:
        - $ref: '#/components/parameters/Name'
      security:
        - oauthAuth: []
  /new_payment:
    post:
      operationId: processPayment
      description: Process a payment
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/PaymentRequest'
  /error/{status_code}:
    get:
      operationId: raiseHttpError
      summary: Respond with the given status code
      parameters:
        - name: status_code
          in: path
          required: true
          schema:
            type: integer
components:
  parameters:
    Name:
      name: name
      in: path
      required: true
      description: Who to greet
      schema:
        type: string
  schemas:
    PaymentRequest:
      type: object
      required: [transaction_amount, payer]
      properties:
        transaction_amount:
          type: number
        description:
          type: string
        payment_method_id:
          type: string
        payer:
          type: object
          properties:
            name:
              type: string
            email:
              type: string
            identification:
              type: object
              properties:
                type:
                  type: string
                number:
                  type: string
  securitySchemes:
    apiKeyAuth:
      type: apiKey
      in: header
      name: X-API-Key
    apiKeyQuery:
      type: apiKey
      in: query
      name: api_key
    apiKeyCookie:
      type: apiKey
      in: cookie
      name: api_key
    basicAuth:
      type: http
      scheme: basic
    bearerAuth:
      type: http
      scheme: bearer
    oauthAuth:
      type: oauth2
      flows:
        clientCredentials:
          tokenUrl: https://auth.example.com/token
          scopes: {}
"#;

/// Greeting service spec text with the given server URL.
pub fn greeting_service_yaml(server_url: &str) -> String {
    GREETING_SERVICE.replace("__SERVER_URL__", server_url)
}

pub fn greeting_service(server_url: &str) -> OpenApiSpec {
    OpenApiSpec::from_str(&greeting_service_yaml(server_url)).expect("greeting service spec")
}

/// An OpenAI tool call as found in `choices[].message.tool_calls[]`.
pub fn openai_tool_call(name: &str, arguments: Value) -> Value {
    json!({
        "id": "call_NJr1NBz2Th7iUWJpRIJZoJIA",
        "function": {
            "arguments": arguments.to_string(),
            "name": name,
        },
        "type": "function",
    })
}

/// Records every draft it is asked to send and answers with a canned response.
#[derive(Debug)]
pub struct RecordingTransport {
    response: Value,
    requests: Mutex<Vec<RequestDraft>>,
}

impl RecordingTransport {
    pub fn new(response: Value) -> Arc<Self> {
        Arc::new(Self {
            response,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RequestDraft> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn last_request(&self) -> RequestDraft {
        self.requests()
            .pop()
            .expect("transport received no request")
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send_request(&self, draft: &RequestDraft) -> Result<Value> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(draft.clone());
        Ok(self.response.clone())
    }
}
