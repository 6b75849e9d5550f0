use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;

use super::keyword::KeywordTable;

/// Deployment variant, each with its own fixed category set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyVariant {
    Events,
    Packages,
}

impl Display for TaxonomyVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxonomyVariant::Events => write!(f, "events"),
            TaxonomyVariant::Packages => write!(f, "packages"),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("taxonomy has no categories")]
    Empty,

    #[error("category label '{0}' must be non-empty lower-case")]
    InvalidLabel(String),

    #[error("category label '{0}' is declared twice")]
    DuplicateLabel(String),

    #[error("keyword table references unknown category '{0}'")]
    UnknownKeywordCategory(String),

    #[error("trigger '{trigger}' for category '{label}' must be non-empty lower-case")]
    InvalidTrigger { label: String, trigger: String },

    #[error("prompt example references unknown category '{0}'")]
    UnknownExampleCategory(String),
}

/// A category label with the one-line definition shown to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDef {
    pub label: String,
    pub description: String,
}

/// Ordered, immutable set of valid category labels
#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: Vec<CategoryDef>,
}

impl Taxonomy {
    pub fn new(categories: Vec<CategoryDef>) -> Result<Self, TaxonomyError> {
        if categories.is_empty() {
            return Err(TaxonomyError::Empty);
        }

        let mut seen = HashSet::new();
        for category in &categories {
            if category.label.is_empty() || category.label != category.label.to_lowercase() {
                return Err(TaxonomyError::InvalidLabel(category.label.clone()));
            }
            if !seen.insert(category.label.as_str()) {
                return Err(TaxonomyError::DuplicateLabel(category.label.clone()));
            }
        }

        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[CategoryDef] {
        &self.categories
    }

    /// Labels in declaration order
    pub fn labels(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.label.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Case-insensitive membership; returns the canonical lower-case label.
    /// Surrounding whitespace is not ignored.
    pub fn canonical(&self, label: &str) -> Option<&str> {
        let wanted = label.to_lowercase();
        self.categories
            .iter()
            .find(|c| c.label == wanted)
            .map(|c| c.label.as_str())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.canonical(label).is_some()
    }
}

/// Few-shot example included in the category mapping prompt
#[derive(Debug, Clone)]
pub struct PromptExample {
    pub input: String,
    pub labels: Vec<String>,
}

/// Everything the mapper needs for one deployment variant
#[derive(Debug, Clone)]
pub struct TaxonomyConfig {
    pub variant: TaxonomyVariant,
    /// Noun used in prompts and messages ("event", "travel package")
    pub subject: String,
    pub taxonomy: Taxonomy,
    pub keywords: KeywordTable,
    pub examples: Vec<PromptExample>,
    /// Shown to callers when nothing could be mapped
    pub hint: String,
}

impl TaxonomyConfig {
    /// Validates that the keyword table and prompt examples only reference taxonomy members
    pub fn new(
        variant: TaxonomyVariant,
        subject: impl Into<String>,
        taxonomy: Taxonomy,
        keywords: KeywordTable,
        examples: Vec<PromptExample>,
        hint: impl Into<String>,
    ) -> Result<Self, TaxonomyError> {
        for (label, triggers) in keywords.entries() {
            if !taxonomy.contains(label) {
                return Err(TaxonomyError::UnknownKeywordCategory(label.clone()));
            }
            if let Some(bad) = triggers
                .iter()
                .find(|t| t.is_empty() || **t != t.to_lowercase())
            {
                return Err(TaxonomyError::InvalidTrigger {
                    label: label.clone(),
                    trigger: bad.clone(),
                });
            }
        }

        for example in &examples {
            if let Some(unknown) = example.labels.iter().find(|l| !taxonomy.contains(l)) {
                return Err(TaxonomyError::UnknownExampleCategory(unknown.clone()));
            }
        }

        Ok(Self {
            variant,
            subject: subject.into(),
            taxonomy,
            keywords,
            examples,
            hint: hint.into(),
        })
    }

    /// Built-in configuration for a deployment variant
    pub fn for_variant(variant: TaxonomyVariant) -> Result<Self, TaxonomyError> {
        let data = match variant {
            TaxonomyVariant::Events => &EVENTS,
            TaxonomyVariant::Packages => &PACKAGES,
        };

        let taxonomy = Taxonomy::new(
            data.categories
                .iter()
                .map(|(label, description, _)| CategoryDef {
                    label: label.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        )?;

        let keywords = KeywordTable::new(
            data.categories
                .iter()
                .map(|(label, _, triggers)| {
                    (
                        label.to_string(),
                        triggers.iter().map(|t| t.to_string()).collect(),
                    )
                })
                .collect(),
        );

        let examples = data
            .examples
            .iter()
            .map(|(input, labels)| PromptExample {
                input: input.to_string(),
                labels: labels.iter().map(|l| l.to_string()).collect(),
            })
            .collect();

        Self::new(variant, data.subject, taxonomy, keywords, examples, data.hint)
    }
}

struct VariantData {
    subject: &'static str,
    hint: &'static str,
    /// (label, definition, keyword triggers) in declaration order
    categories: &'static [(&'static str, &'static str, &'static [&'static str])],
    examples: &'static [(&'static str, &'static [&'static str])],
}

static EVENTS: VariantData = VariantData {
    subject: "event",
    hint: "Try: music, comedy, sports, outdoor, food, spiritual, cultural, kids",
    categories: &[
        (
            "concert",
            "music events, live performances, DJ nights, music festivals, bands, singing",
            &["music", "concert", "band", "dj", "singing", "song", "live music", "performance", "festival"],
        ),
        (
            "sports",
            "marathons, cricket, football, fitness events, gym, exercise, running",
            &["sport", "fitness", "exercise", "gym", "marathon", "running", "cricket", "football", "game", "athletic"],
        ),
        (
            "outdoor",
            "trekking, hiking, nature activities, adventure sports, camping, cycling",
            &["outdoor", "trek", "hike", "nature", "adventure", "camping", "cycling", "mountain", "trail"],
        ),
        (
            "food",
            "food festivals, buffet events, culinary experiences, dining, gastronomy",
            &["food", "buffet", "culinary", "dining", "cuisine", "feast", "gastronomy", "eat"],
        ),
        (
            "spiritual",
            "religious events, meditation, temple visits, spiritual gatherings, devotional",
            &["spiritual", "meditation", "temple", "religious", "prayer", "worship", "devotion", "peace", "mandir"],
        ),
        (
            "cultural",
            "art exhibitions, theater, dance performances, traditional events, heritage, museums",
            &["cultural", "art", "theater", "theatre", "dance", "traditional", "heritage", "museum", "exhibition", "classical"],
        ),
        (
            "kids",
            "children activities, family events, kids workshops, family-friendly",
            &["kid", "child", "children", "family", "family-friendly"],
        ),
        (
            "entertainment",
            "general entertainment, movies, games, leisure, shows",
            &["entertainment", "show", "movie", "film", "leisure", "general fun"],
        ),
        (
            "comedy",
            "standup comedy, comedy shows, humor, laughter",
            &["comedy", "standup", "stand-up", "humor", "laugh", "comic", "comedian", "funny"],
        ),
    ],
    examples: &[
        ("comedy", &["comedy"]),
        ("standup", &["comedy"]),
        ("music", &["concert"]),
        ("trekking", &["outdoor"]),
        ("meditation", &["spiritual"]),
        ("music, dancing", &["concert"]),
        ("family fun", &["kids"]),
        ("adventure, nature", &["outdoor"]),
        ("food, traditional", &["food", "cultural"]),
        ("fitness, gym", &["sports"]),
        ("comedy, music", &["comedy", "concert"]),
    ],
};

static PACKAGES: VariantData = VariantData {
    subject: "travel package",
    hint: "Try: honeymoon, beach, hills, adventure, wildlife, pilgrimage, family, weekend",
    categories: &[
        (
            "honeymoon",
            "romantic trips for couples, newlyweds, anniversaries",
            &["honeymoon", "romantic", "couple", "newlywed", "anniversary"],
        ),
        (
            "beach",
            "coastal holidays, islands, sea-side resorts, water sports",
            &["beach", "coast", "island", "seaside", "goa", "surf", "andaman"],
        ),
        (
            "hill_station",
            "mountain towns, snow, cool-climate getaways",
            &["hill", "mountain", "snow", "manali", "shimla", "ooty", "munnar", "kodaikanal"],
        ),
        (
            "adventure",
            "trekking, rafting, paragliding, scuba diving, thrill activities",
            &["adventure", "trek", "rafting", "paragliding", "scuba", "bungee", "thrill", "camping"],
        ),
        (
            "wildlife",
            "safaris, national parks, jungle stays, bird watching",
            &["wildlife", "safari", "jungle", "tiger", "national park", "bird"],
        ),
        (
            "pilgrimage",
            "temple circuits, yatras, holy sites, spiritual journeys",
            &["pilgrimage", "temple", "yatra", "darshan", "holy", "spiritual", "char dham"],
        ),
        (
            "heritage",
            "forts, palaces, monuments, historical cities, culture tours",
            &["heritage", "fort", "palace", "history", "historical", "monument", "culture"],
        ),
        (
            "family",
            "family-friendly holidays with kids and parents",
            &["family", "kid", "children", "parents", "group"],
        ),
        (
            "luxury",
            "premium stays, five-star resorts, private villas",
            &["luxury", "premium", "5-star", "five star", "villa", "lavish"],
        ),
        (
            "budget",
            "affordable trips, backpacking, low-cost travel",
            &["budget", "cheap", "affordable", "backpack", "low cost"],
        ),
        (
            "international",
            "trips abroad, overseas destinations",
            &["international", "abroad", "overseas", "europe", "dubai", "thailand", "bali", "singapore"],
        ),
        (
            "cruise",
            "cruises, houseboats, backwater stays",
            &["cruise", "ship", "houseboat", "backwater"],
        ),
        (
            "wellness",
            "spa retreats, yoga, ayurveda, detox holidays",
            &["wellness", "spa", "yoga", "ayurveda", "retreat", "detox", "relax"],
        ),
        (
            "weekend_getaway",
            "short trips of two or three days close to the city",
            &["weekend", "getaway", "short trip", "staycation"],
        ),
    ],
    examples: &[
        ("honeymoon", &["honeymoon"]),
        ("beach holiday", &["beach"]),
        ("snow and mountains", &["hill_station"]),
        ("safari", &["wildlife"]),
        ("temple tour", &["pilgrimage"]),
        ("trip with kids", &["family"]),
        ("honeymoon, beach", &["honeymoon", "beach"]),
        ("cheap weekend trip", &["budget", "weekend_getaway"]),
        ("yoga retreat", &["wellness"]),
    ],
};
