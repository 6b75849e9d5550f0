use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scheduled event (events deployment)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub location: Option<String>,
    #[sqlx(rename = "event_date")]
    pub date: Option<String>,
    #[sqlx(rename = "event_time")]
    pub time: Option<String>,
    pub price: Option<String>,
    pub image_url: Option<String>,
    pub booking_link: Option<String>,
}

/// A bookable travel package (packages deployment)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct TravelPackage {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub destination: Option<String>,
    pub duration_days: Option<i32>,
    pub price: Option<String>,
    /// Travel agent offering the package
    pub agent_id: Option<String>,
    pub image_url: Option<String>,
    pub booking_link: Option<String>,
}

/// A record returned by a discovery query, whichever variant is deployed.
/// Output only: the untagged form cannot tell the variants apart on input.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Listing {
    Event(Event),
    Package(TravelPackage),
}

impl Listing {
    pub fn id(&self) -> Uuid {
        match self {
            Listing::Event(e) => e.id,
            Listing::Package(p) => p.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Listing::Event(e) => &e.name,
            Listing::Package(p) => &p.name,
        }
    }

    pub fn category(&self) -> &str {
        match self {
            Listing::Event(e) => &e.category,
            Listing::Package(p) => &p.category,
        }
    }

    /// Whether the listing falls inside an optional scope filter.
    ///
    /// Events match on a case-insensitive location substring, packages on
    /// exact agent id.
    pub fn in_scope(&self, scope: Option<&str>) -> bool {
        let Some(scope) = scope else {
            return true;
        };
        match self {
            Listing::Event(e) => e
                .location
                .as_deref()
                .map(|l| l.to_lowercase().contains(&scope.to_lowercase()))
                .unwrap_or(false),
            Listing::Package(p) => p.agent_id.as_deref() == Some(scope),
        }
    }

    /// Template variables for the suggestion prompt, with defaults for missing fields
    pub fn prompt_variables(&self) -> Vec<(&'static str, String)> {
        match self {
            Listing::Event(e) => vec![
                ("name", e.name.clone()),
                ("category", e.category.clone()),
                ("description", or(&e.description, "An exciting event")),
                ("location", or(&e.location, "Bangalore")),
                ("date", or(&e.date, "Soon")),
                ("time", or(&e.time, "TBA")),
                ("price", or(&e.price, "Contact organizer")),
            ],
            Listing::Package(p) => vec![
                ("name", p.name.clone()),
                ("category", p.category.clone()),
                ("description", or(&p.description, "A memorable trip")),
                ("destination", or(&p.destination, "a great destination")),
                ("duration", duration_text(p.duration_days)),
                ("price", or(&p.price, "Contact agent")),
            ],
        }
    }

    /// Deterministic blurb used when the model is unavailable or fails
    pub fn fallback_suggestion(&self) -> String {
        match self {
            Listing::Event(e) => format!(
                "Check out {} at {}! {} It's on {} at {}.",
                non_empty(&e.name, "this event"),
                or(&e.location, "Bangalore"),
                or(&e.description, "An exciting event."),
                or(&e.date, "soon"),
                or(&e.time, "TBA"),
            ),
            Listing::Package(p) => format!(
                "Explore {} to {}! {} {} for {}.",
                non_empty(&p.name, "this package"),
                or(&p.destination, "a great destination"),
                or(&p.description, "A memorable trip."),
                duration_text(p.duration_days),
                or(&p.price, "a price on request"),
            ),
        }
    }
}

fn or(value: &Option<String>, default: &str) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

fn non_empty(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn duration_text(days: Option<i32>) -> String {
    match days {
        Some(1) => "1 day".to_string(),
        Some(d) if d > 1 => format!("{} days", d),
        _ => "Flexible duration".to_string(),
    }
}
