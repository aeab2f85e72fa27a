//! Seeded listings: the local laptop catalog and the fixed listings the
//! simulated stores return.

use std::collections::BTreeMap;

use crate::domain::product::{Category, Feature, FeatureLevel, Product, ProductId};

use Category::{Coding, Gaming, Office, Student};
use FeatureLevel::{Excellent, Good, Heavy, High, Light, Medium, VeryHigh, VeryLight};

pub const LOCAL_STORE: &str = "local";

#[derive(Debug, Clone, Copy)]
struct LaptopSeed {
    id: &'static str,
    name: &'static str,
    price: u64,
    original_price: Option<u64>,
    rating: f64,
    category: Category,
    tags: &'static [&'static str],
    /// performance, battery, weight, display
    levels: [FeatureLevel; 4],
    /// ram, storage, processor, graphics
    specs: [&'static str; 4],
}

const LOCAL_SEEDS: &[LaptopSeed] = &[
    LaptopSeed {
        id: "1",
        name: "Gaming Laptop Pro",
        price: 65_000,
        original_price: None,
        rating: 4.5,
        category: Gaming,
        tags: &["gaming", "high performance", "graphics", "gpu", "rgb", "display"],
        levels: [High, Medium, Heavy, High],
        specs: ["16GB", "512GB SSD", "Intel i7", "RTX 3050"],
    },
    LaptopSeed {
        id: "2",
        name: "Coding Laptop Elite",
        price: 60_000,
        original_price: None,
        rating: 4.2,
        category: Coding,
        tags: &["coding", "development", "programming", "developer", "tech"],
        levels: [High, Good, Medium, High],
        specs: ["16GB", "512GB SSD", "AMD Ryzen 7", "Integrated"],
    },
    LaptopSeed {
        id: "3",
        name: "Student Laptop Budget",
        price: 48_000,
        original_price: None,
        rating: 4.0,
        category: Student,
        tags: &["student", "study", "budget", "affordable", "college", "school"],
        levels: [Medium, Excellent, Light, Medium],
        specs: ["8GB", "256GB SSD", "Intel i5", "Integrated"],
    },
    LaptopSeed {
        id: "4",
        name: "Office Laptop Standard",
        price: 42_000,
        original_price: None,
        rating: 3.9,
        category: Office,
        tags: &["office", "work", "business", "professional", "corporate"],
        levels: [Medium, Good, Light, Medium],
        specs: ["8GB", "256GB SSD", "Intel i5", "Integrated"],
    },
    LaptopSeed {
        id: "5",
        name: "Ultrabook Lightweight",
        price: 55_000,
        original_price: None,
        rating: 4.4,
        category: Student,
        tags: &["lightweight", "portable", "thin", "student", "travel", "compact"],
        levels: [Medium, Excellent, VeryLight, High],
        specs: ["8GB", "256GB SSD", "Intel i5", "Integrated"],
    },
    LaptopSeed {
        id: "6",
        name: "Workstation Powerhouse",
        price: 75_000,
        original_price: None,
        rating: 4.6,
        category: Coding,
        tags: &["workstation", "powerful", "coding", "development", "professional"],
        levels: [VeryHigh, Medium, Heavy, VeryHigh],
        specs: ["32GB", "1TB SSD", "Intel i9", "RTX 3060"],
    },
    LaptopSeed {
        id: "7",
        name: "Budget Gaming Laptop",
        price: 52_000,
        original_price: None,
        rating: 4.1,
        category: Gaming,
        tags: &["gaming", "budget", "affordable", "entry", "gpu"],
        levels: [Medium, Medium, Heavy, Medium],
        specs: ["8GB", "512GB SSD", "AMD Ryzen 5", "GTX 1650"],
    },
    LaptopSeed {
        id: "8",
        name: "Business Pro Laptop",
        price: 58_000,
        original_price: None,
        rating: 4.3,
        category: Office,
        tags: &["business", "professional", "office", "corporate", "enterprise"],
        levels: [High, Excellent, Light, High],
        specs: ["16GB", "512GB SSD", "Intel i7", "Integrated"],
    },
];

const AMAZON_SEEDS: &[LaptopSeed] = &[
    LaptopSeed {
        id: "amz-laptop-1",
        name: "Dell Inspiron 15 3000",
        price: 42_000,
        original_price: Some(48_000),
        rating: 4.0,
        category: Office,
        tags: &["office", "business", "budget"],
        levels: [Medium, Good, Light, Medium],
        specs: ["8GB DDR4", "256GB SSD", "Intel Core i5 11th Gen", "Integrated Intel UHD"],
    },
    LaptopSeed {
        id: "amz-laptop-2",
        name: "Lenovo IdeaPad Gaming 3",
        price: 58_000,
        original_price: Some(65_000),
        rating: 4.3,
        category: Gaming,
        tags: &["gaming", "budget", "performance"],
        levels: [High, Medium, Heavy, Medium],
        specs: ["8GB DDR4", "512GB SSD", "AMD Ryzen 5", "NVIDIA GTX 1650"],
    },
];

const FLIPKART_SEEDS: &[LaptopSeed] = &[
    LaptopSeed {
        id: "fk-laptop-1",
        name: "ASUS VivoBook 15",
        price: 45_000,
        original_price: Some(52_000),
        rating: 4.2,
        category: Student,
        tags: &["student", "budget", "portable"],
        levels: [Medium, Good, Light, Medium],
        specs: ["8GB DDR4", "512GB SSD", "Intel Core i5 11th Gen", "Integrated Intel UHD"],
    },
    LaptopSeed {
        id: "fk-laptop-2",
        name: "HP Pavilion Gaming",
        price: 65_000,
        original_price: Some(72_000),
        rating: 4.5,
        category: Gaming,
        tags: &["gaming", "performance", "graphics"],
        levels: [High, Medium, Heavy, High],
        specs: ["16GB DDR4", "512GB SSD", "AMD Ryzen 7", "NVIDIA GTX 1650"],
    },
];

/// Simulated marketplaces with fixed listings and search-page affiliate links.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MockStore {
    Amazon,
    Flipkart,
}

impl MockStore {
    pub fn name(self) -> &'static str {
        match self {
            Self::Amazon => "amazon",
            Self::Flipkart => "flipkart",
        }
    }

    pub fn search_url(self, query: &str) -> String {
        let query = if query.trim().is_empty() { "laptop" } else { query.trim() };
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        match self {
            Self::Amazon => format!("https://www.amazon.in/s?k={encoded}"),
            Self::Flipkart => format!("https://www.flipkart.com/search?q={encoded}"),
        }
    }

    /// Listings tagged with this store and a search link for `query`.
    pub fn listings(self, query: &str) -> Vec<Product> {
        let seeds = match self {
            Self::Amazon => AMAZON_SEEDS,
            Self::Flipkart => FLIPKART_SEEDS,
        };
        let url = self.search_url(query);
        seeds.iter().map(|seed| seed.to_product(self.name(), Some(url.clone()))).collect()
    }
}

impl LaptopSeed {
    fn to_product(&self, store: &str, affiliate_url: Option<String>) -> Product {
        let features = Feature::ALL.into_iter().zip(self.levels).collect();
        let specs: BTreeMap<String, String> = ["ram", "storage", "processor", "graphics"]
            .into_iter()
            .zip(self.specs)
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Product {
            id: ProductId(self.id.to_string()),
            name: self.name.to_string(),
            price: self.price,
            original_price: self.original_price,
            rating: self.rating,
            category: self.category,
            store: store.to_string(),
            tags: self.tags.iter().map(|tag| (*tag).to_string()).collect(),
            features,
            specs,
            affiliate_url,
        }
    }
}

/// The eight-laptop local catalog, in catalog order.
pub fn local_catalog() -> Vec<Product> {
    LOCAL_SEEDS.iter().map(|seed| seed.to_product(LOCAL_STORE, None)).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{local_catalog, MockStore};
    use crate::domain::product::{Category, Feature, FeatureLevel};

    #[test]
    fn local_catalog_ids_are_unique_and_cover_every_category() {
        let catalog = local_catalog();
        assert_eq!(catalog.len(), 8);

        let ids: HashSet<_> = catalog.iter().map(|product| product.id.clone()).collect();
        assert_eq!(ids.len(), catalog.len());

        let categories: HashSet<_> = catalog.iter().map(|product| product.category).collect();
        assert_eq!(categories.len(), Category::ALL.len());
        assert!(catalog.iter().all(|product| product.features.len() == Feature::ALL.len()));
    }

    #[test]
    fn seed_levels_map_onto_feature_dimensions() {
        let catalog = local_catalog();
        let ultrabook = catalog.iter().find(|product| product.id.as_str() == "5").expect("seed 5");

        assert_eq!(ultrabook.feature(Feature::Weight), Some(FeatureLevel::VeryLight));
        assert_eq!(ultrabook.feature(Feature::Battery), Some(FeatureLevel::Excellent));
        assert_eq!(ultrabook.specs.get("ram").map(String::as_str), Some("8GB"));
    }

    #[test]
    fn mock_store_links_encode_the_query() {
        let listings = MockStore::Amazon.listings("gaming laptop & mouse");
        assert_eq!(listings.len(), 2);
        assert!(listings.iter().all(|product| product.store == "amazon"));
        assert_eq!(
            listings[0].affiliate_url.as_deref(),
            Some("https://www.amazon.in/s?k=gaming+laptop+%26+mouse")
        );

        assert_eq!(MockStore::Flipkart.search_url("  "), "https://www.flipkart.com/search?q=laptop");
    }
}
