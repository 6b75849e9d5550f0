use super::taxonomy::Taxonomy;

/// Maximum number of categories the keyword matcher ever returns
pub const KEYWORD_MATCH_LIMIT: usize = 3;

/// Category label -> lower-case substring triggers, in declaration order
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    entries: Vec<(String, Vec<String>)>,
}

impl KeywordTable {
    pub fn new(entries: Vec<(String, Vec<String>)>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[(String, Vec<String>)] {
        &self.entries
    }

    /// Maps free text to categories by substring search.
    ///
    /// Labels are visited in table order; a label is taken on its first
    /// trigger found anywhere in the lower-cased text. Only labels that are
    /// members of `taxonomy` are eligible, and at most
    /// [`KEYWORD_MATCH_LIMIT`] labels are returned in discovery order.
    pub fn match_categories(&self, text: &str, taxonomy: &Taxonomy) -> Vec<String> {
        let text = text.to_lowercase();

        let mut matched: Vec<String> = Vec::new();
        for (label, triggers) in &self.entries {
            if matched.len() == KEYWORD_MATCH_LIMIT {
                break;
            }
            let Some(label) = taxonomy.canonical(label) else {
                continue;
            };
            if matched.iter().any(|m| m == label) {
                continue;
            }
            if triggers.iter().any(|trigger| text.contains(trigger.as_str())) {
                matched.push(label.to_string());
            }
        }

        matched
    }
}
