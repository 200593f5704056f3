//! Platform API client
//!
//! Authenticated HTTP access to the Platform service. Every call carries a
//! bearer credential: the end-user session token when one was forwarded,
//! otherwise a short-lived token this application mints for itself, scoped to
//! the company being queried.
//!
//! Errors are returned as-is; deciding whether a failure degrades to "no data"
//! is the adapter's job, not the transport's.

use anyhow::{anyhow, bail, Context, Result};
use base64::Engine;
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::types::{into_item, into_items, ArtifactUpload, InstallationMapping};
use crate::context::FederationContext;
use crate::model::{ArtifactKind, ArtifactReference};
use crate::store::Blob;

/// Lifetime of a self-issued outbound token.
pub const SELF_ISSUED_TTL_SECS: i64 = 60 * 60;

/// Claims of the token this application mints for itself.
#[derive(Debug, Serialize, serde::Deserialize)]
pub struct OutboundClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub app_id: String,
    /// Absent on app-scoped calls that are not tied to one company.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct PlatformClient {
    http: Client,
    base_url: String,
    app_id: String,
    audience: String,
    signing_secret: String,
    upload_limit: usize,
    session_token: Option<String>,
}

impl PlatformClient {
    pub fn new(ctx: &FederationContext) -> Self {
        Self {
            http: ctx.http.clone(),
            base_url: ctx.config.platform_base_url.clone(),
            app_id: ctx.config.app_id.clone(),
            audience: ctx.config.federation_issuer.clone(),
            signing_secret: ctx.config.platform_jwt_secret.clone(),
            upload_limit: ctx.config.upload_limit_bytes,
            session_token: None,
        }
    }

    /// Same client, but every call forwards `token` so Platform applies the
    /// end user's own authorization.
    pub fn with_session_token(&self, token: impl Into<String>) -> Self {
        Self {
            session_token: Some(token.into()),
            ..self.clone()
        }
    }

    /// The bearer credential for a call scoped to `company_id`.
    pub fn bearer_for(&self, company_id: &str) -> Result<String> {
        match &self.session_token {
            Some(token) => Ok(token.clone()),
            None => self.mint_token(Some(company_id)),
        }
    }

    fn mint_token(&self, company_id: Option<&str>) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = OutboundClaims {
            iss: self.app_id.clone(),
            sub: self.app_id.clone(),
            aud: self.audience.clone(),
            app_id: self.app_id.clone(),
            company_id: company_id.map(str::to_string),
            iat: now,
            exp: now + SELF_ISSUED_TTL_SECS,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.signing_secret.as_bytes()),
        )
        .context("Failed to sign outbound Platform token")
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid Platform base URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Platform base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, company_id: &str) -> Result<RequestBuilder> {
        let bearer = self.bearer_for(company_id)?;
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(bearer)
            .header("Accept", "application/json"))
    }

    /// Send and decode. `Ok(None)` means the resource does not exist (404).
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Option<Value>> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to call Platform for {what}"))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "Platform API error {} for {}: {}",
                status,
                what,
                body.chars().take(200).collect::<String>()
            );
        }

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Platform response for {what}"))?;
        Ok(Some(body))
    }

    // ── Reads ────────────────────────────────────────────────

    pub async fn fetch_actors(
        &self,
        company_id: &str,
        actor_type: &str,
        status: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut url = self.endpoint(&["api", "v1", "actors"])?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("companyId", company_id)
                .append_pair("type", actor_type);
            if let Some(status) = status {
                query.append_pair("status", status);
            }
        }
        let request = self.request(Method::GET, url, company_id)?;
        Ok(self
            .send(request, "actor list")
            .await?
            .map(into_items)
            .unwrap_or_default())
    }

    pub async fn fetch_actor(&self, id: &str, company_id: &str) -> Result<Option<Value>> {
        let mut url = self.endpoint(&["api", "v1", "actors", id])?;
        url.query_pairs_mut().append_pair("companyId", company_id);
        let request = self.request(Method::GET, url, company_id)?;
        Ok(self.send(request, "actor").await?.and_then(into_item))
    }

    pub async fn fetch_entities(
        &self,
        company_id: &str,
        types: Option<&[String]>,
    ) -> Result<Vec<Value>> {
        let mut url = self.endpoint(&["api", "v1", "entities"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("companyId", company_id);
            if let Some(types) = types {
                query.append_pair("types", &types.join(","));
            }
        }
        let request = self.request(Method::GET, url, company_id)?;
        Ok(self
            .send(request, "entity list")
            .await?
            .map(into_items)
            .unwrap_or_default())
    }

    /// Open an artifact Platform holds, streaming the body as it arrives.
    /// `Ok(None)` when Platform does not know the handle.
    ///
    /// Artifact links carry no company, so the call uses the forwarded
    /// session token or an app-scoped self-issued token.
    pub async fn fetch_artifact(&self, kind: ArtifactKind, handle: &str) -> Result<Option<Blob>> {
        let url = self.endpoint(&["api", "v1", "artifacts", kind.as_str(), handle])?;
        let bearer = match &self.session_token {
            Some(token) => token.clone(),
            None => self.mint_token(None)?,
        };
        let response = self
            .http
            .get(url)
            .bearer_auth(bearer)
            .send()
            .await
            .with_context(|| format!("Failed to call Platform for artifact {handle}"))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            bail!("Platform API error {} for artifact {}", status, handle);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let size = response.content_length();
        let stream = response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(std::io::Error::other)
            .boxed();
        Ok(Some(Blob {
            content_type,
            size,
            stream,
        }))
    }

    /// The company's installation mapping for this application.
    /// `Ok(None)` when Platform has nothing configured.
    pub async fn fetch_installation_mapping(
        &self,
        company_id: &str,
    ) -> Result<Option<InstallationMapping>> {
        let url = self.endpoint(&[
            "api",
            "v1",
            "installations",
            company_id,
            "apps",
            &self.app_id,
            "mappings",
        ])?;
        let request = self.request(Method::GET, url, company_id)?;
        let Some(body) = self.send(request, "installation mapping").await? else {
            return Ok(None);
        };

        let mappings = match body {
            Value::Object(mut map) if map.contains_key("mappings") => {
                map.remove("mappings").unwrap_or(Value::Null)
            }
            other => other,
        };
        if mappings.is_null() {
            return Ok(None);
        }
        let parsed = serde_json::from_value(mappings)
            .context("Installation mapping has an unrecognized shape")?;
        Ok(Some(parsed))
    }

    // ── Writes (used by sync flows, same credentials) ────────

    pub async fn update_actor(&self, company_id: &str, id: &str, patch: &Value) -> Result<Value> {
        let mut url = self.endpoint(&["api", "v1", "actors", id])?;
        url.query_pairs_mut().append_pair("companyId", company_id);
        let request = self.request(Method::PATCH, url, company_id)?.json(patch);
        self.send(request, "actor update")
            .await?
            .and_then(into_item)
            .ok_or_else(|| anyhow!("Actor {id} not found on Platform"))
    }

    /// Embed an artifact inline. The whole payload is in memory, so it is
    /// capped at the configured upload limit.
    pub async fn upload_actor_artifact(
        &self,
        company_id: &str,
        id: &str,
        model: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<ArtifactReference> {
        if bytes.len() > self.upload_limit {
            bail!(
                "Artifact for actor {id} is {} bytes, limit is {}",
                bytes.len(),
                self.upload_limit
            );
        }

        let mut url = self.endpoint(&["api", "v1", "actors", id, "artifacts"])?;
        url.query_pairs_mut().append_pair("companyId", company_id);
        let body = ArtifactUpload {
            model,
            content_type,
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        };
        let request = self.request(Method::POST, url, company_id)?.json(&body);
        let response = self
            .send(request, "artifact upload")
            .await?
            .and_then(into_item)
            .ok_or_else(|| anyhow!("Actor {id} not found on Platform"))?;
        serde_json::from_value(response).context("Failed to parse artifact descriptor")
    }
}
