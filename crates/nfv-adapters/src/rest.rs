//! HTTP/JSON control plane.
//!
//! Selectors map onto a resource-collection URL layout:
//!
//! | call | request |
//! |------|---------|
//! | `read_document`, `probe_state` | `GET {endpoint}/{collection}/{id}` |
//! | create action | `POST {endpoint}/{collection}` |
//! | `delete` action | `DELETE {endpoint}/{collection}/{target}` |
//! | other actions | `POST {endpoint}/{collection}/{target}/{action}` |
//!
//! A 404 on a read means the record is absent.

use async_trait::async_trait;
use nfv_lcm_common::{
    state_of, ActionRequest, AdapterConstructionError, ControlPlane, LcmError, LcmResult, Selector,
    Vendor,
};
use reqwest::{header, Client, Method, StatusCode};
use std::time::Duration;

/// Control plane reached over a REST API.
#[derive(Debug, Clone)]
pub struct RestPlane {
    name: String,
    base_url: String,
    client: Client,
}

impl RestPlane {
    /// Creates a plane rooted at `endpoint`.
    pub fn new(
        vendor: Vendor,
        name: impl Into<String>,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, AdapterConstructionError> {
        let name = name.into();
        let base_url = endpoint.trim_end_matches('/').to_string();
        if reqwest::Url::parse(&base_url).is_err() {
            return Err(AdapterConstructionError::failed(
                vendor,
                format!("invalid endpoint '{}' for plane '{}'", endpoint, name),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterConstructionError::failed(vendor, e.to_string()))?;

        Ok(Self {
            name,
            base_url,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, id)
    }

    fn action_route(&self, request: &ActionRequest) -> (Method, String) {
        match request.target.as_deref() {
            None => (Method::POST, format!("{}/{}", self.base_url, request.collection)),
            Some(target) if request.action == "delete" => {
                (Method::DELETE, self.record_url(&request.collection, target))
            }
            Some(target) => (
                Method::POST,
                format!("{}/{}", self.record_url(&request.collection, target), request.action),
            ),
        }
    }

    fn transport_error(&self, operation: &str, e: reqwest::Error) -> LcmError {
        LcmError::backend(&self.name, operation, e.to_string())
    }
}

/// Picks the correlation id out of an action response: the body's `id`,
/// else the last segment of the `Location` header.
fn correlation_id(body: &serde_json::Value, location: Option<&str>) -> Option<String> {
    if let Some(id) = body.get("id").and_then(|v| v.as_str()) {
        return Some(id.to_string());
    }
    location
        .and_then(|loc| loc.trim_end_matches('/').rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl ControlPlane for RestPlane {
    fn name(&self) -> &str {
        &self.name
    }

    async fn issue_action(&self, request: &ActionRequest) -> LcmResult<String> {
        let (method, url) = self.action_route(request);
        tracing::debug!(plane = %self.name, %method, %url, "Issuing action");

        let mut builder = self.client.request(method, &url);
        if !request.body.is_null() {
            builder = builder.json(&request.body);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error("issue_action", e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LcmError::invalid_precondition(
                &request.action,
                request.target.as_deref().unwrap_or(&request.collection),
                "resource not found",
            ));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LcmError::backend(
                &self.name,
                "issue_action",
                format!("{} returned {}: {}", url, status.as_u16(), message),
            ));
        }

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error("issue_action", e))?;
        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text)
                .map_err(|e| LcmError::invalid_document(&self.name, e.to_string()))?
        };

        correlation_id(&body, location.as_deref())
            .or_else(|| request.target.clone())
            .ok_or_else(|| {
                LcmError::invalid_document(&self.name, format!("no correlation id in response from {}", url))
            })
    }

    async fn probe_state(&self, selector: &Selector) -> LcmResult<Option<String>> {
        let doc = self.read_document(selector).await?;
        Ok(state_of(doc.as_ref(), &selector.attribute))
    }

    async fn read_document(&self, selector: &Selector) -> LcmResult<Option<serde_json::Value>> {
        let url = self.record_url(&selector.collection, &selector.id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error("read_document", e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LcmError::backend(
                &self.name,
                "read_document",
                format!("{} returned {}: {}", url, status.as_u16(), message),
            ));
        }

        let doc = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| LcmError::invalid_document(&self.name, e.to_string()))?;
        Ok(Some(doc))
    }
}
