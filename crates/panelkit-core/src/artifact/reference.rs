//! Reference chain construction.
//!
//! Each generation request carries images of earlier pages so the generator
//! can keep characters and style consistent across a batch.

use super::store::ArtifactVersionStore;

/// Number of preceding pages sent as references unless configured otherwise.
pub const DEFAULT_REFERENCE_CAPACITY: usize = 6;

/// One image in a reference chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceImage {
    /// An image the user supplied for the whole session
    User(String),
    /// The selected version of an earlier page
    Page {
        page_index: usize,
        page_title: String,
        image_reference: String,
    },
}

impl ReferenceImage {
    pub fn image_reference(&self) -> &str {
        match self {
            ReferenceImage::User(image) => image,
            ReferenceImage::Page {
                image_reference, ..
            } => image_reference,
        }
    }
}

/// Builds the ordered reference images for generating `target_page_index`.
///
/// Takes the `capacity` nearest pages before the target that have an
/// artifact, in ascending page order, using each page's *current* version.
/// The user reference image, if any, is prepended and does not count against
/// `capacity`. An empty result means unconstrained generation.
pub fn build_reference_chain(
    store: &ArtifactVersionStore,
    target_page_index: usize,
    user_reference_image: Option<&str>,
    capacity: usize,
) -> Vec<ReferenceImage> {
    let mut nearest: Vec<ReferenceImage> = store
        .entries_before(target_page_index)
        .rev()
        .take(capacity)
        .map(|entry| ReferenceImage::Page {
            page_index: entry.page_index(),
            page_title: entry.page_title().to_string(),
            image_reference: entry.current().image_reference.clone(),
        })
        .collect();
    nearest.reverse();

    match user_reference_image.filter(|image| !image.is_empty()) {
        Some(image) => std::iter::once(ReferenceImage::User(image.to_string()))
            .chain(nearest)
            .collect(),
        None => nearest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_pages(pages: impl IntoIterator<Item = usize>) -> ArtifactVersionStore {
        let mut store = ArtifactVersionStore::new();
        for page in pages {
            store.append_version(page, format!("Page {}", page + 1), format!("img-{page}"));
        }
        store
    }

    fn page_indices(chain: &[ReferenceImage]) -> Vec<usize> {
        chain
            .iter()
            .filter_map(|image| match image {
                ReferenceImage::Page { page_index, .. } => Some(*page_index),
                ReferenceImage::User(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_takes_six_nearest_preceding_pages_in_order() {
        let store = store_with_pages(0..10);
        let chain = build_reference_chain(&store, 9, None, DEFAULT_REFERENCE_CAPACITY);
        assert_eq!(page_indices(&chain), vec![3, 4, 5, 6, 7, 8]);
        assert_eq!(chain[0].image_reference(), "img-3");
    }

    #[test]
    fn test_user_image_alone() {
        let store = ArtifactVersionStore::new();
        let chain = build_reference_chain(&store, 0, Some("user.png"), DEFAULT_REFERENCE_CAPACITY);
        assert_eq!(chain, vec![ReferenceImage::User("user.png".to_string())]);
    }

    #[test]
    fn test_user_image_does_not_count_against_capacity() {
        let store = store_with_pages(0..10);
        let chain = build_reference_chain(&store, 9, Some("user.png"), DEFAULT_REFERENCE_CAPACITY);
        assert_eq!(chain.len(), 7);
        assert_eq!(chain[0], ReferenceImage::User("user.png".to_string()));
        assert_eq!(page_indices(&chain), vec![3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_skips_gaps_and_later_pages() {
        let store = store_with_pages([0, 2, 5, 7]);
        let chain = build_reference_chain(&store, 5, None, DEFAULT_REFERENCE_CAPACITY);
        assert_eq!(page_indices(&chain), vec![0, 2]);
    }

    #[test]
    fn test_uses_selected_version_not_latest() {
        let mut store = store_with_pages([0]);
        store.append_version(0, "Page 1", "img-0-v2");
        store.select_version(0, 0).unwrap();
        let chain = build_reference_chain(&store, 1, None, DEFAULT_REFERENCE_CAPACITY);
        assert_eq!(chain[0].image_reference(), "img-0");
    }

    #[test]
    fn test_first_page_without_user_image_is_unconstrained() {
        let store = store_with_pages(0..3);
        assert!(build_reference_chain(&store, 0, None, DEFAULT_REFERENCE_CAPACITY).is_empty());
    }

    #[test]
    fn test_capacity_is_configurable() {
        let store = store_with_pages(0..10);
        let chain = build_reference_chain(&store, 9, None, 2);
        assert_eq!(page_indices(&chain), vec![7, 8]);
    }
}
