use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Gaming,
    Coding,
    Student,
    Office,
}

impl Category {
    /// Declaration order. Category detection breaks ties in this order.
    pub const ALL: [Category; 4] =
        [Category::Gaming, Category::Coding, Category::Student, Category::Office];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gaming => "gaming",
            Self::Coding => "coding",
            Self::Student => "student",
            Self::Office => "office",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gaming" => Ok(Self::Gaming),
            "coding" => Ok(Self::Coding),
            "student" => Ok(Self::Student),
            "office" => Ok(Self::Office),
            other => Err(ParseEnumError { kind: "category", value: other.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Performance,
    Battery,
    Weight,
    Display,
}

impl Feature {
    pub const ALL: [Feature; 4] =
        [Feature::Performance, Feature::Battery, Feature::Weight, Feature::Display];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Battery => "battery",
            Self::Weight => "weight",
            Self::Display => "display",
        }
    }

    /// Ordinal scale for the dimension, lowest first.
    pub fn hierarchy(self) -> &'static [FeatureLevel] {
        use FeatureLevel::*;
        match self {
            Self::Performance => &[Low, Medium, High, VeryHigh],
            Self::Battery => &[Medium, Good, Excellent],
            Self::Weight => &[Heavy, Medium, Light, VeryLight],
            Self::Display => &[Medium, High, VeryHigh],
        }
    }

    pub fn rank_of(self, level: FeatureLevel) -> Option<usize> {
        self.hierarchy().iter().position(|candidate| *candidate == level)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "performance" => Ok(Self::Performance),
            "battery" => Ok(Self::Battery),
            "weight" => Ok(Self::Weight),
            "display" => Ok(Self::Display),
            other => Err(ParseEnumError { kind: "feature", value: other.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureLevel {
    Low,
    Medium,
    High,
    VeryHigh,
    Good,
    Excellent,
    Heavy,
    Light,
    VeryLight,
}

impl FeatureLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
            Self::Good => "good",
            Self::Excellent => "excellent",
            Self::Heavy => "heavy",
            Self::Light => "light",
            Self::VeryLight => "very_light",
        }
    }
}

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureLevel {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "very_high" => Ok(Self::VeryHigh),
            "good" => Ok(Self::Good),
            "excellent" => Ok(Self::Excellent),
            "heavy" => Ok(Self::Heavy),
            "light" => Ok(Self::Light),
            "very_light" => Ok(Self::VeryLight),
            other => Err(ParseEnumError { kind: "feature level", value: other.to_string() }),
        }
    }
}

pub type FeatureLevels = BTreeMap<Feature, FeatureLevel>;

/// A listing as supplied by a catalog source. Scoring never mutates it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<u64>,
    pub rating: f64,
    pub category: Category,
    pub store: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub features: FeatureLevels,
    #[serde(default)]
    pub specs: BTreeMap<String, String>,
    #[serde(default)]
    pub affiliate_url: Option<String>,
}

impl Product {
    pub fn feature(&self, feature: Feature) -> Option<FeatureLevel> {
        self.features.get(&feature).copied()
    }

    /// Clamps the rating into `0..=5`; non-finite ratings become zero.
    pub fn sanitized(mut self) -> Self {
        self.rating = if self.rating.is_finite() { self.rating.clamp(0.0, 5.0) } else { 0.0 };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, Feature, FeatureLevel, Product, ProductId};

    fn product(rating: f64) -> Product {
        Product {
            id: ProductId::from("p-1"),
            name: "Test Laptop".to_string(),
            price: 40_000,
            original_price: None,
            rating,
            category: Category::Office,
            store: "local".to_string(),
            tags: Vec::new(),
            features: Default::default(),
            specs: Default::default(),
            affiliate_url: None,
        }
    }

    #[test]
    fn hierarchy_ranks_follow_declared_scale() {
        assert_eq!(Feature::Weight.rank_of(FeatureLevel::Heavy), Some(0));
        assert_eq!(Feature::Weight.rank_of(FeatureLevel::VeryLight), Some(3));
        assert_eq!(Feature::Battery.rank_of(FeatureLevel::Excellent), Some(2));
        assert_eq!(Feature::Battery.rank_of(FeatureLevel::Low), None);
    }

    #[test]
    fn enums_parse_from_wire_names() {
        assert_eq!("Gaming".parse::<Category>(), Ok(Category::Gaming));
        assert_eq!("very_light".parse::<FeatureLevel>(), Ok(FeatureLevel::VeryLight));
        assert!("tablet".parse::<Category>().is_err());
    }

    #[test]
    fn sanitized_clamps_out_of_range_ratings() {
        assert_eq!(product(7.5).sanitized().rating, 5.0);
        assert_eq!(product(-1.0).sanitized().rating, 0.0);
        assert_eq!(product(f64::NAN).sanitized().rating, 0.0);
        assert_eq!(product(4.2).sanitized().rating, 4.2);
    }

    #[test]
    fn product_serializes_with_camel_case_wire_names() {
        let mut listing = product(4.0);
        listing.affiliate_url = Some("https://example.test/p-1".to_string());
        listing.features.insert(Feature::Battery, FeatureLevel::Good);

        let value = serde_json::to_value(&listing).expect("serialize");
        assert_eq!(value["affiliateUrl"], "https://example.test/p-1");
        assert_eq!(value["category"], "office");
        assert_eq!(value["features"]["battery"], "good");
        assert!(value.get("originalPrice").is_none());
    }
}
