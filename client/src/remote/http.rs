//! HTTP transport for a Payload-style collection REST API.

use super::document::{create_body, patch_body, CreateResponse, FindResponse};
use super::{RemoteCollection, RemoteCollections, RemoteError};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tote_engine::{CollectionKind, Credentials, EntityList, RemoteId};

/// Talks to `<base_url>/<slug>` endpoints with `Authorization: JWT <token>`.
#[derive(Debug, Clone)]
pub struct PayloadHttp {
    base_url: String,
    client: reqwest::Client,
}

impl PayloadHttp {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    fn collection_url(&self, kind: CollectionKind) -> String {
        format!("{}/{}", self.base_url, kind.api_slug())
    }

    fn document_url(&self, kind: CollectionKind, remote_id: &str) -> String {
        format!("{}/{}", self.collection_url(kind), remote_id)
    }

    fn authorize(request: RequestBuilder, credentials: Credentials<'_>) -> RequestBuilder {
        request.header(AUTHORIZATION, format!("JWT {}", credentials.token))
    }
}

/// Map non-success statuses onto [`RemoteError`].
async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => Err(RemoteError::NotFound),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(RemoteError::Unauthorized(status.as_u16()))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl RemoteCollections for PayloadHttp {
    async fn find_owned(
        &self,
        kind: CollectionKind,
        credentials: Credentials<'_>,
    ) -> Result<Option<RemoteCollection>, RemoteError> {
        let request = self.client.get(self.collection_url(kind)).query(&[
            ("where[user][equals]", credentials.user_id),
            ("depth", "2"),
            ("limit", "1"),
        ]);

        let response = match check_status(Self::authorize(request, credentials).send().await?).await {
            Ok(response) => response,
            Err(RemoteError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        let found: FindResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;

        Ok(found
            .docs
            .into_iter()
            .next()
            .map(|doc| doc.into_collection(kind)))
    }

    async fn create(
        &self,
        kind: CollectionKind,
        credentials: Credentials<'_>,
        entities: &EntityList,
    ) -> Result<RemoteId, RemoteError> {
        let request = self
            .client
            .post(self.collection_url(kind))
            .json(&create_body(kind, credentials.user_id, entities));

        let response = check_status(Self::authorize(request, credentials).send().await?).await?;
        let created: CreateResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;

        created
            .doc
            .map(|doc| doc.id)
            .ok_or_else(|| RemoteError::Decode("create response has no doc id".into()))
    }

    async fn patch(
        &self,
        kind: CollectionKind,
        credentials: Credentials<'_>,
        remote_id: &str,
        entities: &EntityList,
    ) -> Result<(), RemoteError> {
        let request = self
            .client
            .patch(self.document_url(kind, remote_id))
            .json(&patch_body(kind, entities));

        check_status(Self::authorize(request, credentials).send().await?).await?;
        Ok(())
    }

    async fn delete(
        &self,
        kind: CollectionKind,
        credentials: Credentials<'_>,
        remote_id: &str,
    ) -> Result<(), RemoteError> {
        let request = self.client.delete(self.document_url(kind, remote_id));
        check_status(Self::authorize(request, credentials).send().await?).await?;
        Ok(())
    }
}
