//! Cloud Vision REST client.
//!
//! Each feature is a separate `images:annotate` call carrying one image and
//! one feature type. The wire types mirror the JSON of the v1 API; proto3
//! JSON drops zero values, so every numeric field defaults to 0.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use url::Url;

use super::auth::{ServiceAccountAuth, ServiceAccountKey};
use crate::detect::{
    AnnotationService, BoundingPoly, DetectedLabel, DetectedObject, NormalizedVertex,
};

const ANNOTATE_PATH: &str = "v1/images:annotate";
const FEATURE_OBJECT_LOCALIZATION: &str = "OBJECT_LOCALIZATION";
const FEATURE_LABEL_DETECTION: &str = "LABEL_DETECTION";

#[derive(Debug, Deserialize)]
struct BatchAnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    localized_object_annotations: Vec<WireObject>,
    #[serde(default)]
    label_annotations: Vec<WireLabel>,
    #[serde(default)]
    error: Option<WireStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireObject {
    #[serde(default)]
    name: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    bounding_poly: WirePoly,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePoly {
    #[serde(default)]
    normalized_vertices: Vec<WireVertex>,
}

#[derive(Debug, Deserialize)]
struct WireVertex {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

#[derive(Debug, Deserialize)]
struct WireLabel {
    #[serde(default)]
    description: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: WireStatus,
}

impl From<WireObject> for DetectedObject {
    fn from(obj: WireObject) -> Self {
        DetectedObject {
            name: obj.name,
            confidence: obj.score,
            bounding: BoundingPoly::new(
                obj.bounding_poly
                    .normalized_vertices
                    .into_iter()
                    .map(|v| NormalizedVertex::new(v.x, v.y))
                    .collect(),
            ),
        }
    }
}

impl From<WireLabel> for DetectedLabel {
    fn from(label: WireLabel) -> Self {
        DetectedLabel {
            description: label.description,
            confidence: label.score,
        }
    }
}

enum Auth {
    ServiceAccount(ServiceAccountAuth),
    Static(String),
}

impl Auth {
    fn bearer(&self) -> Result<String> {
        match self {
            Auth::ServiceAccount(auth) => auth.access_token(),
            Auth::Static(token) => Ok(token.clone()),
        }
    }
}

/// Authenticated handle to the Vision API.
pub struct VisionClient {
    agent: ureq::Agent,
    annotate_url: String,
    auth: Auth,
}

impl VisionClient {
    /// Build a client from a service-account key file.
    ///
    /// Fails on an unreadable file, a malformed key, or an unusable private
    /// key. The first token is fetched lazily on the first request.
    pub fn from_service_account_file(endpoint: &str, credentials: &Path) -> Result<Self> {
        let key = ServiceAccountKey::from_file(credentials)?;
        let auth = ServiceAccountAuth::new(key)?;
        log::info!("vision client authenticated as {}", auth.client_email());
        Self::new(endpoint, Auth::ServiceAccount(auth))
    }

    /// Build a client that sends a fixed bearer token.
    pub fn with_access_token(endpoint: &str, token: impl Into<String>) -> Result<Self> {
        Self::new(endpoint, Auth::Static(token.into()))
    }

    fn new(endpoint: &str, auth: Auth) -> Result<Self> {
        let annotate_url = annotate_url(endpoint)?;
        Ok(Self {
            agent: ureq::Agent::new(),
            annotate_url,
            auth,
        })
    }

    fn annotate(&self, image: &[u8], feature: &str) -> Result<AnnotateImageResponse> {
        let token = self.auth.bearer()?;
        let body = json!({
            "requests": [{
                "image": { "content": BASE64.encode(image) },
                "features": [{ "type": feature }],
            }]
        });
        log::debug!(
            "POST {} {} ({} image bytes)",
            self.annotate_url,
            feature,
            image.len()
        );

        let response = match self
            .agent
            .post(&self.annotate_url)
            .set("Authorization", &format!("Bearer {}", token))
            .send_json(body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                let message = serde_json::from_str::<ErrorEnvelope>(&body)
                    .map(|envelope| envelope.error.message)
                    .unwrap_or(body);
                return Err(anyhow!(
                    "vision {} returned HTTP {}: {}",
                    feature,
                    code,
                    message.trim()
                ));
            }
            Err(err) => {
                return Err(anyhow::Error::new(err).context(format!("send {} request", feature)))
            }
        };

        let batch: BatchAnnotateResponse = response
            .into_json()
            .with_context(|| format!("decode {} response", feature))?;
        let image_response = batch
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("vision {} response has no results", feature))?;
        if let Some(status) = image_response.error.as_ref() {
            if status.code != 0 || !status.message.is_empty() {
                return Err(anyhow!(
                    "vision {} failed (code {}): {}",
                    feature,
                    status.code,
                    status.message
                ));
            }
        }
        Ok(image_response)
    }
}

impl AnnotationService for VisionClient {
    fn name(&self) -> &'static str {
        "cloud-vision"
    }

    fn object_localization(&self, image: &[u8]) -> Result<Vec<DetectedObject>> {
        let response = self.annotate(image, FEATURE_OBJECT_LOCALIZATION)?;
        Ok(response
            .localized_object_annotations
            .into_iter()
            .map(DetectedObject::from)
            .collect())
    }

    fn label_detection(&self, image: &[u8]) -> Result<Vec<DetectedLabel>> {
        let response = self.annotate(image, FEATURE_LABEL_DETECTION)?;
        Ok(response
            .label_annotations
            .into_iter()
            .map(DetectedLabel::from)
            .collect())
    }
}

fn annotate_url(endpoint: &str) -> Result<String> {
    let url = Url::parse(endpoint).with_context(|| format!("parse vision endpoint {}", endpoint))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(anyhow!(
                "unsupported vision endpoint scheme '{}'; expected http(s)",
                other
            ))
        }
    }
    Ok(format!(
        "{}/{}",
        url.as_str().trim_end_matches('/'),
        ANNOTATE_PATH
    ))
}
