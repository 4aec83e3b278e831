use std::collections::BTreeSet;

use crate::catalog::{Catalog, Subtopic, Topic};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseFilter {
    pub query: String,
    pub category: Option<String>,
}

impl BrowseFilter {
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty() && self.category.is_none()
    }

    fn matches(&self, topic: &Topic, sub: &Subtopic) -> bool {
        if let Some(category) = &self.category {
            if sub.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        let needle = self.query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            topic.title.as_str(),
            topic.id.as_str(),
            sub.title.as_str(),
            sub.id.as_str(),
            sub.category.as_deref().unwrap_or_default(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BrowseEntry<'a> {
    pub topic: &'a Topic,
    pub subtopic: &'a Subtopic,
}

/// Every subtopic passing the filter, in catalog order.
pub fn filter<'a>(catalog: &'a Catalog, filter: &BrowseFilter) -> Vec<BrowseEntry<'a>> {
    catalog
        .list_topics()
        .iter()
        .flat_map(|topic| {
            topic
                .subtopics
                .iter()
                .map(move |subtopic| BrowseEntry { topic, subtopic })
        })
        .filter(|entry| filter.matches(entry.topic, entry.subtopic))
        .collect()
}

/// Distinct categories, sorted.
pub fn categories(catalog: &Catalog) -> Vec<String> {
    catalog
        .list_topics()
        .iter()
        .flat_map(|topic| topic.subtopics.iter())
        .filter_map(|sub| sub.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Advances `current` through `None` and then each category in order.
pub fn next_category(categories: &[String], current: Option<&str>) -> Option<String> {
    match current {
        None => categories.first().cloned(),
        Some(current) => categories
            .iter()
            .position(|c| c == current)
            .and_then(|idx| categories.get(idx + 1))
            .cloned(),
    }
}
