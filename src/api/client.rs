//! reqwest-backed API client

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, error, info, instrument};

use crate::api::envelope::{Envelope, ErrorBody};
use crate::api::{ApiError, Transport};
use crate::config::Config;
use crate::session::Session;

const LOGIN_ENDPOINT: &str = "/auth/login";

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(alias = "accessToken", alias = "access_token")]
    token: String,
}

/// HTTP client bound to one API base URL and one session
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    session: Session,
}

impl HttpClient {
    pub fn new(config: &Config, session: Session) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(&config.http.user_agent)
            .timeout(config.http_timeout())
            .build()?;

        debug!("HttpClient created with base URL: {}", config.api_url);

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and return the JSON body of a successful response
    async fn execute(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = self.authorize(request).send().await?;
        self.update_token_from_response(&response);
        read_body(response).await
    }

    fn update_token_from_response(&self, response: &Response) {
        if let Some(new_token) = response
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            debug!("Server rotated session token");
            self.session.rotate(new_token);
        }
    }

    /// Authenticate and start the session
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let url = self.url(LOGIN_ENDPOINT);
        debug!("Logging in at {}", url);

        // No bearer header on the login call itself
        let response = self.client.post(url).json(credentials).send().await?;
        let body = read_body(response).await?;
        let data: LoginData = Envelope::decode(body)?;

        self.session.login(data.token)?;
        info!("Logged in as {}", credentials.email);
        Ok(())
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.session.logout()?;
        Ok(())
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!("PUT {}", url);
        self.execute(self.client.put(url).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!("DELETE {}", url);
        self.execute(self.client.delete(url)).await
    }

    /// Multipart upload of a single file under `field`
    pub async fn upload(&self, path: &str, field: &str, file: &Path) -> Result<Value, ApiError> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        let url = self.url(path);
        debug!("POST (multipart) {} <- {}", url, file.display());
        self.execute(self.client.post(url).multipart(form)).await
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!("GET {} {:?}", url, query);
        self.execute(self.client.get(url).query(query)).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!("POST {}", url);
        self.execute(self.client.post(url).json(body)).await
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

async fn read_body(response: Response) -> Result<Value, ApiError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        error!("Unauthorized request to {}", response.url());
        return Err(ApiError::Unauthorized);
    }

    if !status.is_success() {
        let response_text = response.text().await?;
        if let Ok(error_body) = serde_json::from_str::<ErrorBody>(&response_text) {
            return Err(ApiError::Application {
                status_code: error_body.status_code.unwrap_or(status.as_u16()),
                message: error_body.message,
            });
        }
        return Err(ApiError::Application {
            status_code: status.as_u16(),
            message: response_text,
        });
    }

    if status == StatusCode::NO_CONTENT {
        return Ok(serde_json::json!({ "success": true }));
    }

    Ok(response.json::<Value>().await?)
}
