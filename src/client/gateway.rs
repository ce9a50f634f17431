/**
 * API Gateway Client
 *
 * The single point every REST call goes through. It resolves the URL,
 * attaches `Authorization: Bearer <token>` when the session holds one, and
 * turns non-success responses into `ClientError` carrying the server's
 * `message` field. Callers never touch auth headers themselves.
 *
 * A 401/403 on a request that carried the session's token means the token is
 * dead: the session is expired on the spot, which also clears the persisted
 * token and closes the realtime channel.
 */
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::config::Config;
use super::error::ClientError;
use super::session::SessionHandle;
use crate::shared::User;

/// Error body shape used by the server
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Which token a request carries
#[derive(Debug, Clone, Copy)]
enum Credentials<'a> {
    /// The session's token; a rejection expires the session
    Session,
    /// The session's token, but a rejection is about the request itself (login, register)
    SessionKeep,
    /// A caller-supplied token
    Explicit(&'a str),
}

/// REST client bound to the current session
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: Config,
    client: Client,
    session: SessionHandle,
}

impl ApiClient {
    pub fn new(config: Config, session: SessionHandle) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            client,
            session,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(self.request(Method::GET, path), &Method::GET, path, Credentials::Session).await?;
        read_json(response).await
    }

    pub async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path).query(query);
        let response = self.send(builder, &Method::GET, path, Credentials::Session).await?;
        read_json(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).json(body);
        let response = self.send(builder, &Method::POST, path, Credentials::Session).await?;
        read_json(response).await
    }

    /// POST whose 401 means "bad credentials", not "session over"
    pub(crate) async fn post_credentials<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).json(body);
        let response = self
            .send(builder, &Method::POST, path, Credentials::SessionKeep)
            .await?;
        read_json(response).await
    }

    /// POST without a body (e.g. joining a team)
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(self.request(Method::POST, path), &Method::POST, path, Credentials::Session).await?;
        read_json(response).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path).json(body);
        let response = self.send(builder, &Method::PUT, path, Credentials::Session).await?;
        read_json(response).await
    }

    /// DELETE; the response body is ignored
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, path), &Method::DELETE, path, Credentials::Session)
            .await
            .map(drop)
    }

    /// Fetch the current user with an explicitly supplied token.
    ///
    /// Only used to restore a persisted session, before the session holds the token.
    pub async fn fetch_me_with(&self, token: &str) -> Result<User, ClientError> {
        let path = "/api/auth/me";
        let response = self
            .send(self.request(Method::GET, path), &Method::GET, path, Credentials::Explicit(token))
            .await?;
        read_json(response).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.config.api_url(path))
    }

    async fn send(
        &self,
        builder: RequestBuilder,
        method: &Method,
        path: &str,
        credentials: Credentials<'_>,
    ) -> Result<Response, ClientError> {
        let token = match credentials {
            Credentials::Explicit(token) => Some(token.to_string()),
            Credentials::Session | Credentials::SessionKeep => self.session.token(),
        };
        let builder = match &token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        tracing::debug!(%method, path, "api request");
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "api request failed");
            ClientError::Network(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message);
        tracing::debug!(%method, path, status = status.as_u16(), "api error response");
        let error = ClientError::from_status(status.as_u16(), message);

        if error.is_unauthorized() && matches!(credentials, Credentials::Session) {
            if let Some(token) = &token {
                if self.session.expire(token) {
                    tracing::warn!(%method, path, status = status.as_u16(), "session expired by server");
                }
            }
        }
        Err(error)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}
