use super::{
    model::{
        ProcessGroupFlowEntity,
        ProcessGroupStatusEntity,
        ProvenanceEntity,
        ProvenanceRequest,
    },
    ApiFuture,
    NifiApi,
};
use crate::error::{
    NifiError,
    Result,
};
use reqwest::{
    Client as HttpClient,
    Method,
    RequestBuilder,
    StatusCode,
};
use serde::{
    de::DeserializeOwned,
    Serialize,
};
use std::{
    fmt,
    time::Duration,
};
use url::Url;

/// Longest response body excerpt carried in an error message.
const MAX_BODY_EXCERPT: usize = 512;

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl ToString, password: impl ToString) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Reject servers whose certificate does not validate.
    pub verify_tls: bool,
    /// Applied to every single request.
    pub timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            verify_tls: true,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
enum Authorization {
    Bearer(String),
    Basic(Credentials),
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authorization::Bearer(token) => write!(f, "Bearer(<{} bytes>)", token.len()),
            Authorization::Basic(credentials) => write!(f, "Basic({})", credentials.username),
        }
    }
}

/// An authenticated connection to one NiFi instance.
///
/// The underlying HTTP client pools connections, so a session should be reused for all calls of a
/// run. It keeps no other state between calls.
#[derive(Debug)]
pub struct Session {
    http: HttpClient,
    base_url: Url,
    api_url: Url,
    authorization: Authorization,
}

/// Turns whatever the user configured into the UI base (`.../nifi`) and API root (`.../nifi-api`).
pub fn normalize_base_url(raw: &str) -> Result<(Url, Url)> {
    let invalid = |reason: String| NifiError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let mut trimmed = raw.trim().trim_end_matches('/');
    if trimmed.ends_with("/nifi-api") {
        trimmed = &trimmed[..trimmed.len() - "-api".len()];
    }
    let base = if trimmed.ends_with("/nifi") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/nifi")
    };

    let base_url = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", base_url.scheme())));
    }
    let api_url = Url::parse(&format!("{base}-api")).map_err(|e| invalid(e.to_string()))?;
    Ok((base_url, api_url))
}

fn join(api_url: &Url, path: &str) -> Result<Url> {
    let joined = format!("{}/{}", api_url.as_str().trim_end_matches('/'), path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|e| NifiError::InvalidUrl {
        url: joined.clone(),
        reason: e.to_string(),
    })
}

fn build_http_client(options: &SessionOptions) -> reqwest::Result<HttpClient> {
    HttpClient::builder()
        .danger_accept_invalid_certs(!options.verify_tls)
        .timeout(options.timeout)
        .build()
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_BODY_EXCERPT {
        body.to_string()
    } else {
        format!("{}...", body.chars().take(MAX_BODY_EXCERPT).collect::<String>())
    }
}

impl Session {
    /// Connect and authenticate. Fails early on bad credentials rather than on the first real call.
    #[instrument(level = "debug", skip(credentials, options), fields(verify_tls = options.verify_tls))]
    pub async fn open(base_url: &str, credentials: &Credentials, options: &SessionOptions) -> Result<Self> {
        let (base_url, api_url) = normalize_base_url(base_url)?;
        let http = build_http_client(options).map_err(|e| NifiError::from_transport(&base_url, e))?;
        let authorization = Self::authenticate(&api_url, credentials, options).await?;
        info!(%base_url, "connected to NiFi");
        Ok(Self {
            http,
            base_url,
            api_url,
            authorization,
        })
    }

    async fn authenticate(api_url: &Url, credentials: &Credentials, options: &SessionOptions) -> Result<Authorization> {
        let token_url = join(api_url, "access/token")?;
        debug!(%token_url, username = %credentials.username, "requesting access token");

        // Some NiFi versions answer 403 when the token request shares a connection with later calls.
        let response = build_http_client(options)
            .map_err(|e| NifiError::from_transport(&token_url, e))?
            .post(token_url.clone())
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| NifiError::from_transport(&token_url, e))?;

        let status = response.status();
        debug!(%status, "token endpoint answered");
        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let token = response
                    .text()
                    .await
                    .map_err(|e| NifiError::from_transport(&token_url, e))?;
                let token = token.trim();
                if token.is_empty() {
                    return Err(NifiError::Decode {
                        url: token_url.to_string(),
                        reason: "empty access token".to_string(),
                    });
                }
                info!("authenticated with access token");
                Ok(Authorization::Bearer(token.to_string()))
            }
            StatusCode::NOT_FOUND | StatusCode::CONFLICT => {
                info!(%status, "token login not offered by the server, using basic credentials");
                Ok(Authorization::Basic(credentials.clone()))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(NifiError::Authentication {
                    url: token_url.to_string(),
                    status,
                })
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(NifiError::Status {
                    method: Method::POST.to_string(),
                    url: token_url.to_string(),
                    status,
                    body: excerpt(&body),
                })
            }
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn uses_token(&self) -> bool {
        matches!(self.authorization, Authorization::Bearer(_))
    }

    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<(StatusCode, String)> {
        self.send::<()>(Method::GET, path, params, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(StatusCode, String)> {
        self.send(Method::POST, path, &[], Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, String)> {
        self.send::<()>(Method::DELETE, path, &[], None).await
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.authorization {
            Authorization::Bearer(token) => request.bearer_auth(token),
            Authorization::Basic(credentials) => request.basic_auth(&credentials.username, Some(&credentials.password)),
        }
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<(StatusCode, String)> {
        let url = join(&self.api_url, path)?;
        trace!(%method, %url, "sending request");

        let mut request = self.http.request(method.clone(), url.clone());
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| NifiError::from_transport(&url, e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| NifiError::from_transport(&url, e))?;
        debug!(%method, %url, %status, bytes = text.len(), "response");

        match status {
            s if s.is_success() => Ok((s, text)),
            StatusCode::UNAUTHORIZED => Err(NifiError::Authentication {
                url: url.to_string(),
                status,
            }),
            _ => Err(NifiError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status,
                body: excerpt(&text),
            }),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let (_, body) = self.get(path, params).await?;
        self.decode(path, &body)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let (_, body) = self.post(path, body).await?;
        self.decode(path, &body)
    }

    fn decode<T: DeserializeOwned>(&self, path: &str, body: &str) -> Result<T> {
        serde_json::from_str(body).map_err(|e| NifiError::Decode {
            url: join(&self.api_url, path)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| path.to_string()),
            reason: e.to_string(),
        })
    }
}

impl NifiApi for Session {
    fn process_group_flow<'a>(&'a self, group_id: &'a str) -> ApiFuture<'a, ProcessGroupFlowEntity> {
        Box::pin(async move { self.get_json(&format!("flow/process-groups/{group_id}"), &[]).await })
    }

    fn process_group_status<'a>(&'a self, group_id: &'a str) -> ApiFuture<'a, ProcessGroupStatusEntity> {
        Box::pin(async move {
            self.get_json(
                &format!("flow/process-groups/{group_id}/status"),
                &[("recursive", "false")],
            )
            .await
        })
    }

    fn submit_provenance<'a>(&'a self, request: &'a ProvenanceRequest) -> ApiFuture<'a, ProvenanceEntity> {
        Box::pin(async move { self.post_json("provenance", &request.clone().into_entity()).await })
    }

    fn provenance_status<'a>(&'a self, query_id: &'a str) -> ApiFuture<'a, ProvenanceEntity> {
        Box::pin(async move {
            self.get_json(
                &format!("provenance/{query_id}"),
                &[("summarize", "true"), ("incrementalResults", "false")],
            )
            .await
        })
    }

    fn discard_provenance<'a>(&'a self, query_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.delete(&format!("provenance/{query_id}")).await?;
            Ok(())
        })
    }
}
