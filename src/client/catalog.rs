//! # Image Catalog Operations
//!
//! Paginated catalog fetches, the collect/star toggle, favorites, the
//! deploy stub, and pure client-side label filtering.
//!
//! ## Response-shape normalization
//!
//! The backend has answered the image list in three shapes over time: a
//! bare array, a `{data, total}` envelope, and (when misbehaving) something
//! else entirely. [`normalize_image_page`] reduces all of them to
//! [`ImagePage`]; an unrecognized shape becomes an empty page and logs a
//! warning so the unstable contract shows up in logs instead of silently
//! rendering nothing.
//!
//! ## Stale-response discard
//!
//! Rapid page navigation can make an older fetch resolve after a newer one.
//! Each logical list owns a fetch sequence; a response that comes back for
//! a superseded fetch is discarded with [`ApiError::Superseded`] instead of
//! overwriting newer results. There is no caching layer; views re-fetch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use serde::Deserialize;

use crate::api::{ApiClient, ApiError};
use crate::common::models::{
    ContainerImage, DeployRequest, DeployResponse, ImagePage, ImageQuery,
};

/// Monotonic sequence identifying the newest fetch of one logical list.
#[derive(Default)]
struct FetchSequence(AtomicU64);

impl FetchSequence {
    /// Start a fetch, superseding any fetch started earlier.
    fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether the fetch holding `ticket` is still the newest one.
    fn is_current(&self, ticket: u64) -> bool {
        self.0.load(Ordering::SeqCst) == ticket
    }
}

/// Catalog operations bound to one API client.
pub struct CatalogClient {
    api: Arc<ApiClient>,
    image_fetches: FetchSequence,
    favorite_fetches: FetchSequence,
}

impl CatalogClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            image_fetches: FetchSequence::default(),
            favorite_fetches: FetchSequence::default(),
        }
    }

    /// Fetch one page of the catalog, normalized to `{items, total}`.
    ///
    /// # Returns
    /// - `Ok(ImagePage)`: the requested page
    /// - `Err(ApiError::Superseded)`: a newer `list_images` call started
    ///   while this one was in flight; the response was discarded
    pub async fn list_images(&self, query: &ImageQuery) -> Result<ImagePage, ApiError> {
        let ticket = self.image_fetches.begin();

        let mut params: Vec<(&str, String)> = vec![
            ("page", query.page.to_string()),
            ("page_size", query.page_size.to_string()),
        ];
        if !query.search.is_empty() {
            params.push(("search", query.search.clone()));
        }

        let value: serde_json::Value = self.api.get_query("/v1/images", &params).await?;

        if !self.image_fetches.is_current(ticket) {
            debug!("discarding superseded image list response (fetch #{ticket})");
            return Err(ApiError::Superseded);
        }
        Ok(normalize_image_page(value))
    }

    /// Fetch one page of the caller's collected images.
    ///
    /// Same envelope and stale-response discard as [`Self::list_images`],
    /// on its own fetch sequence.
    pub async fn list_favorites(&self, page: u32, page_size: u32) -> Result<ImagePage, ApiError> {
        let ticket = self.favorite_fetches.begin();

        let params = [
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
        ];
        let value: serde_json::Value = self.api.get_query("/v1/favorites", &params).await?;

        if !self.favorite_fetches.is_current(ticket) {
            debug!("discarding superseded favorites response (fetch #{ticket})");
            return Err(ApiError::Superseded);
        }
        Ok(normalize_image_page(value))
    }

    /// Star an image for the authenticated user.
    pub async fn collect(&self, image_id: &str) -> Result<(), ApiError> {
        self.api
            .post_unit::<()>(&format!("/v1/images/{image_id}/collect"), None)
            .await
    }

    /// Remove the star from an image.
    pub async fn uncollect(&self, image_id: &str) -> Result<(), ApiError> {
        self.api
            .delete_unit(&format!("/v1/images/{image_id}/collect"))
            .await
    }

    /// Fetch the deployment parameters configured for an image/provider pair.
    pub async fn deploy_info(
        &self,
        image_id: &str,
        provider_id: &str,
    ) -> Result<DeployResponse, ApiError> {
        self.api
            .get_query(
                &format!("/v1/deploy/{image_id}"),
                &[("provider_id", provider_id)],
            )
            .await
    }

    /// Request a deployment of an image through a provider.
    pub async fn deploy(
        &self,
        image_id: &str,
        request: &DeployRequest,
    ) -> Result<DeployResponse, ApiError> {
        self.api
            .post(&format!("/v1/deploy/{image_id}"), Some(request))
            .await
    }
}

/// The list shapes the backend has been observed to answer with.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawImageList {
    Envelope {
        data: Vec<ContainerImage>,
        total: i64,
    },
    Bare(Vec<ContainerImage>),
}

/// Reduce any observed backend list shape to `{items, total}`.
///
/// Bare arrays carry no total, so their length stands in for it.
/// Unrecognized shapes yield an empty page and a warning.
pub fn normalize_image_page(value: serde_json::Value) -> ImagePage {
    match serde_json::from_value::<RawImageList>(value) {
        Ok(RawImageList::Envelope { data, total }) => ImagePage { items: data, total },
        Ok(RawImageList::Bare(items)) => ImagePage {
            total: items.len() as i64,
            items,
        },
        Err(e) => {
            warn!("unrecognized image list shape, treating as empty: {e}");
            ImagePage::default()
        }
    }
}

/// Keep only images carrying every selected label (AND semantics).
///
/// An empty selection matches everything. The filter runs over the
/// currently loaded page only; it never triggers a fetch.
pub fn filter_by_labels(images: &[ContainerImage], selected: &[String]) -> Vec<ContainerImage> {
    if selected.is_empty() {
        return images.to_vec();
    }
    images
        .iter()
        .filter(|image| {
            selected
                .iter()
                .all(|wanted| image.labels.iter().any(|label| label.name == *wanted))
        })
        .cloned()
        .collect()
}
