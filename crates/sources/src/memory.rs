use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use travelmind_core::{normalize_text, CategorySet, Place, RouterError};

use crate::{DetailSource, PlaceSource};

/// On-disk catalog layout: places grouped by city name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    pub cities: BTreeMap<String, Vec<Place>>,
}

/// In-process place and detail source backed by a city catalog.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    cities: Arc<RwLock<HashMap<String, Vec<Place>>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading catalog {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("failed parsing catalog {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Ok(Self::from_catalog(file))
    }

    pub fn from_catalog(file: CatalogFile) -> Self {
        let catalog = Self::new();
        for (city, places) in file.cities {
            catalog.insert_city(&city, places);
        }
        catalog
    }

    pub fn insert_city(&self, city: &str, places: Vec<Place>) {
        self.cities.write().insert(city_key(city), places);
    }

    pub fn city_count(&self) -> usize {
        self.cities.read().len()
    }

    pub fn place_count(&self) -> usize {
        self.cities.read().values().map(Vec::len).sum()
    }
}

impl PlaceSource for MemoryCatalog {
    async fn search(
        &self,
        city: &str,
        categories: Option<&CategorySet>,
    ) -> Result<Vec<Place>, RouterError> {
        let guard = self.cities.read();
        let Some(places) = guard.get(&city_key(city)) else {
            return Err(RouterError::no_places_found(city));
        };

        let categories = categories.filter(|set| !set.is_empty());
        let found = places
            .iter()
            .filter(|place| categories.map_or(true, |set| set.contains(&place.category)))
            .map(|place| Place {
                description: None,
                ..place.clone()
            })
            .collect();

        Ok(found)
    }
}

impl DetailSource for MemoryCatalog {
    async fn describe(&self, place_id: &str) -> Result<String, RouterError> {
        let guard = self.cities.read();
        let place = guard
            .values()
            .flat_map(|places| places.iter())
            .find(|place| place.id == place_id)
            .ok_or_else(|| RouterError::place_not_found(place_id))?;

        Ok(place
            .description
            .clone()
            .unwrap_or_else(|| format!("No description is available for {}.", place.name)))
    }
}

fn city_key(city: &str) -> String {
    normalize_text(city).to_lowercase()
}
