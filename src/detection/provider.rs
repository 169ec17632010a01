//! Detection provider
//!
//! HTTP client for the remote Roboflow object-detection API. The provider
//! fails open: transport errors, bad responses and missing configuration all
//! produce an empty outcome marked degraded instead of an error, so a
//! detection outage never fails a compliance check.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::DetectorConfig;
use super::normalize::RawDetection;

/// What the detection service returned for one image
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub raw: Vec<RawDetection>,
    /// True when the service was unreachable, unconfigured or returned an
    /// unusable response
    pub degraded: bool,
}

impl DetectionOutcome {
    pub fn unavailable() -> Self {
        Self {
            raw: Vec::new(),
            degraded: true,
        }
    }
}

/// Image reference handed to the provider
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    Url(&'a str),
    Base64(&'a str),
}

#[async_trait]
pub trait DetectionProvider: Send + Sync {
    async fn detect(&self, image: ImageSource<'_>) -> DetectionOutcome;
}

/// Roboflow hosted-inference client
pub struct RoboflowDetector {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(rename = "class")]
    label: String,
    confidence: f32,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

impl RoboflowDetector {
    pub fn new(config: &DetectorConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let base_url = config
            .project_id
            .as_ref()
            .map(|project| {
                format!(
                    "https://detect.roboflow.com/{}/{}",
                    project, config.model_version
                )
            });

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url,
        })
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.api_key, &self.base_url) {
            (Some(key), Some(url)) => Some((key.as_str(), url.as_str())),
            _ => None,
        }
    }

    async fn detect_from_url(
        &self,
        api_key: &str,
        base_url: &str,
        image_url: &str,
    ) -> Result<Vec<RawDetection>, reqwest::Error> {
        let response: DetectResponse = self
            .http
            .get(base_url)
            .query(&[("api_key", api_key), ("image", image_url)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(into_raw(response))
    }

    async fn detect_from_base64(
        &self,
        api_key: &str,
        base_url: &str,
        image: &str,
    ) -> Result<Vec<RawDetection>, reqwest::Error> {
        // Strip a data-URL prefix if the caller passed one through
        let payload = image.rsplit(',').next().unwrap_or(image);

        let response: DetectResponse = self
            .http
            .post(base_url)
            .query(&[("api_key", api_key)])
            .form(&[("image", payload)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(into_raw(response))
    }
}

fn into_raw(response: DetectResponse) -> Vec<RawDetection> {
    response
        .predictions
        .into_iter()
        .map(|p| RawDetection {
            label: p.label,
            confidence: p.confidence,
        })
        .collect()
}

#[async_trait]
impl DetectionProvider for RoboflowDetector {
    async fn detect(&self, image: ImageSource<'_>) -> DetectionOutcome {
        let Some((api_key, base_url)) = self.credentials() else {
            tracing::warn!("Detection API not configured, skipping detection");
            return DetectionOutcome::unavailable();
        };

        let result = match image {
            ImageSource::Url(url) => self.detect_from_url(api_key, base_url, url).await,
            ImageSource::Base64(data) => self.detect_from_base64(api_key, base_url, data).await,
        };

        match result {
            Ok(raw) => DetectionOutcome {
                raw,
                degraded: false,
            },
            Err(e) => {
                tracing::error!("Detection request failed: {}", e);
                DetectionOutcome::unavailable()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_detector_degrades_without_a_request() {
        let detector = RoboflowDetector::new(&DetectorConfig {
            api_key: None,
            project_id: None,
            model_version: "1".to_string(),
        })
        .unwrap();

        let outcome = detector
            .detect(ImageSource::Url("https://example.com/frame.jpg"))
            .await;

        assert!(outcome.degraded);
        assert!(outcome.raw.is_empty());
    }

    #[test]
    fn test_base_url_includes_project_and_version() {
        let detector = RoboflowDetector::new(&DetectorConfig {
            api_key: Some("key".to_string()),
            project_id: Some("ppe-detection".to_string()),
            model_version: "3".to_string(),
        })
        .unwrap();

        let (_, base_url) = detector.credentials().unwrap();
        assert_eq!(base_url, "https://detect.roboflow.com/ppe-detection/3");
    }
}
