//! `POST /generate-image`: renders one page.

use async_trait::async_trait;
use panelkit_core::artifact::ReferenceImage;
use panelkit_core::error::Result;
use panelkit_core::generation::{PageImageGenerator, PageImageRequest, PageImageResult};
use panelkit_core::page::Page;
use serde::{Deserialize, Serialize};

use crate::client::BackendClient;

const ENDPOINT: &str = "generate-image";

/// [`PageImageGenerator`] backed by the HTTP backend.
#[derive(Debug, Clone, Default)]
pub struct HttpPageImageGenerator {
    client: BackendClient,
}

impl HttpPageImageGenerator {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageImageGenerator for HttpPageImageGenerator {
    async fn generate(&self, request: PageImageRequest) -> Result<PageImageResult> {
        let body = GenerateImageBody::from(&request);
        let response: GenerateImageResponse = self.client.post_json(ENDPOINT, &body).await?;
        Ok(response.into())
    }
}

#[derive(Debug, Serialize)]
struct GenerateImageBody<'a> {
    page_data: &'a Page,
    google_api_key: Option<&'a str>,
    /// Layout sketch; not produced without a renderer
    reference_img: Option<&'a str>,
    /// Context images, oldest first
    extra_body: Option<Vec<ReferencePayload<'a>>>,
    comic_style: &'a str,
    rows_per_page: u32,
    language: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ReferencePayload<'a> {
    User(&'a str),
    #[serde(rename_all = "camelCase")]
    Page {
        page_index: usize,
        image_url: &'a str,
        page_title: &'a str,
    },
}

impl<'a> From<&'a ReferenceImage> for ReferencePayload<'a> {
    fn from(image: &'a ReferenceImage) -> Self {
        match image {
            ReferenceImage::User(image) => ReferencePayload::User(image),
            ReferenceImage::Page {
                page_index,
                page_title,
                image_reference,
            } => ReferencePayload::Page {
                page_index: *page_index,
                image_url: image_reference,
                page_title,
            },
        }
    }
}

impl<'a> From<&'a PageImageRequest> for GenerateImageBody<'a> {
    fn from(request: &'a PageImageRequest) -> Self {
        let references: Vec<ReferencePayload<'a>> =
            request.references.iter().map(ReferencePayload::from).collect();
        Self {
            page_data: &request.page,
            google_api_key: request.credentials.as_deref(),
            reference_img: None,
            extra_body: (!references.is_empty()).then_some(references),
            comic_style: &request.style,
            rows_per_page: request.rows_per_page,
            language: &request.language,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateImageResponse {
    #[serde(default)]
    success: bool,
    image_url: Option<String>,
    error: Option<String>,
}

impl From<GenerateImageResponse> for PageImageResult {
    fn from(response: GenerateImageResponse) -> Self {
        PageImageResult {
            success: response.success,
            image_reference: response.image_url,
            error_message: response.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelkit_core::page::{Panel, Row};

    fn request(references: Vec<ReferenceImage>) -> PageImageRequest {
        PageImageRequest {
            page: Page {
                title: "Opening".into(),
                rows: vec![Row::new(vec![Panel::new("Hello")])],
            },
            style: "manga".into(),
            language: "ja".into(),
            rows_per_page: 4,
            references,
            credentials: Some("key".into()),
        }
    }

    #[test]
    fn test_request_wire_format() {
        let request = request(vec![
            ReferenceImage::User("user.png".into()),
            ReferenceImage::Page {
                page_index: 0,
                page_title: "Opening".into(),
                image_reference: "p0.png".into(),
            },
        ]);
        let json = serde_json::to_value(GenerateImageBody::from(&request)).unwrap();

        assert_eq!(json["page_data"]["title"], "Opening");
        assert_eq!(json["google_api_key"], "key");
        assert_eq!(json["comic_style"], "manga");
        assert_eq!(json["rows_per_page"], 4);
        assert_eq!(json["language"], "ja");
        assert_eq!(json["extra_body"][0], "user.png");
        assert_eq!(json["extra_body"][1]["pageIndex"], 0);
        assert_eq!(json["extra_body"][1]["imageUrl"], "p0.png");
        assert!(json["reference_img"].is_null());
    }

    #[test]
    fn test_no_references_sends_null() {
        let request = request(Vec::new());
        let json = serde_json::to_value(GenerateImageBody::from(&request)).unwrap();
        assert!(json["extra_body"].is_null());
    }

    #[test]
    fn test_response_mapping() {
        let ok: GenerateImageResponse =
            serde_json::from_str(r#"{"success": true, "image_url": "http://img"}"#).unwrap();
        assert_eq!(
            PageImageResult::from(ok).into_image().unwrap(),
            "http://img"
        );

        let failed: GenerateImageResponse =
            serde_json::from_str(r#"{"success": false, "error": "blocked"}"#).unwrap();
        assert_eq!(PageImageResult::from(failed).into_image().unwrap_err(), "blocked");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_generation_failure() {
        let generator = HttpPageImageGenerator::new(BackendClient::new("http://127.0.0.1:9/api"));
        let err = generator.generate(request(Vec::new())).await.unwrap_err();
        assert!(err.is_generation_failed());
    }
}
