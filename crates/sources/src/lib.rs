mod memory;
mod retry;

use std::sync::Arc;

use travelmind_core::{CategorySet, Place, RouterError};

pub use memory::{CatalogFile, MemoryCatalog};
pub use retry::{RetryPolicy, Retrying};

/// Finds candidate places in a city.
///
/// An empty list is a valid answer. `NoPlacesFound` means the upstream could
/// not resolve the city at all; `UpstreamUnavailable` is transient.
pub trait PlaceSource: Send + Sync {
    async fn search(
        &self,
        city: &str,
        categories: Option<&CategorySet>,
    ) -> Result<Vec<Place>, RouterError>;
}

/// Looks up extended text for one place.
pub trait DetailSource: Send + Sync {
    async fn describe(&self, place_id: &str) -> Result<String, RouterError>;
}

impl<T: PlaceSource> PlaceSource for Arc<T> {
    async fn search(
        &self,
        city: &str,
        categories: Option<&CategorySet>,
    ) -> Result<Vec<Place>, RouterError> {
        self.as_ref().search(city, categories).await
    }
}

impl<T: DetailSource> DetailSource for Arc<T> {
    async fn describe(&self, place_id: &str) -> Result<String, RouterError> {
        self.as_ref().describe(place_id).await
    }
}
