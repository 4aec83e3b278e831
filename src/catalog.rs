use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

const EMBEDDED_CATALOG: &str = include_str!("../content/catalog.yaml");

/// Top-level catalog entry. Subtopic order is the sidebar display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub subtopics: Vec<Subtopic>,
}

impl Topic {
    pub fn subtopic(&self, id: &str) -> Option<&Subtopic> {
        self.subtopics.iter().find(|sub| sub.id == id)
    }

    pub fn first_subtopic(&self) -> Option<&Subtopic> {
        self.subtopics.first()
    }
}

/// Leaf content unit. `content` is HTML and is rendered as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtopic {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("topic {title:?} has an empty id")]
    EmptyTopicId { title: String },
    #[error("topic id {0:?} is not URL-safe")]
    InvalidTopicId(String),
    #[error("duplicate topic id {0:?}")]
    DuplicateTopic(String),
    #[error("subtopic {title:?} in topic {topic:?} has an empty id")]
    EmptySubtopicId { topic: String, title: String },
    #[error("subtopic id {subtopic:?} in topic {topic:?} is not URL-safe")]
    InvalidSubtopicId { topic: String, subtopic: String },
    #[error("duplicate subtopic id {subtopic:?} in topic {topic:?}")]
    DuplicateSubtopic { topic: String, subtopic: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogStats {
    pub topics: usize,
    pub subtopics: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    topics: Vec<Topic>,
}

#[derive(Deserialize)]
struct RawCatalog {
    #[serde(default)]
    topics: Vec<RawTopic>,
}

#[derive(Deserialize)]
struct RawTopic {
    id: String,
    title: String,
    #[serde(default)]
    subtopics: Vec<RawSubtopic>,
}

#[derive(Deserialize)]
struct RawSubtopic {
    id: String,
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    category: Option<String>,
}

impl Catalog {
    /// Builds a catalog from an ordered list of topics.
    ///
    /// Topic ids must be unique. Subtopic ids must be unique within their
    /// topic; a subtopic id reused across topics is accepted and only
    /// logged, since scoped lookups never confuse the two.
    pub fn new(topics: Vec<Topic>) -> std::result::Result<Self, CatalogError> {
        let mut topic_ids = HashSet::new();
        let mut owners: HashMap<&str, &str> = HashMap::new();

        for topic in &topics {
            if topic.id.is_empty() {
                return Err(CatalogError::EmptyTopicId {
                    title: topic.title.clone(),
                });
            }
            if !is_url_safe(&topic.id) {
                return Err(CatalogError::InvalidTopicId(topic.id.clone()));
            }
            if !topic_ids.insert(topic.id.as_str()) {
                return Err(CatalogError::DuplicateTopic(topic.id.clone()));
            }

            let mut sub_ids = HashSet::new();
            for sub in &topic.subtopics {
                if sub.id.is_empty() {
                    return Err(CatalogError::EmptySubtopicId {
                        topic: topic.id.clone(),
                        title: sub.title.clone(),
                    });
                }
                if !is_url_safe(&sub.id) {
                    return Err(CatalogError::InvalidSubtopicId {
                        topic: topic.id.clone(),
                        subtopic: sub.id.clone(),
                    });
                }
                if !sub_ids.insert(sub.id.as_str()) {
                    return Err(CatalogError::DuplicateSubtopic {
                        topic: topic.id.clone(),
                        subtopic: sub.id.clone(),
                    });
                }
                if let Some(first_owner) = owners.get(sub.id.as_str()) {
                    tracing::warn!(
                        subtopic = %sub.id,
                        first = %first_owner,
                        also = %topic.id,
                        "subtopic id appears in more than one topic; global lookups return the first"
                    );
                } else {
                    owners.insert(sub.id.as_str(), topic.id.as_str());
                }
            }
        }

        Ok(Self { topics })
    }

    pub fn from_yaml(source: &str) -> Result<Self> {
        let raw: RawCatalog = serde_yaml::from_str(source).context("catalog: parse yaml")?;
        let topics = raw
            .topics
            .into_iter()
            .map(|topic| Topic {
                id: topic.id.trim().to_string(),
                title: topic.title,
                subtopics: topic
                    .subtopics
                    .into_iter()
                    .map(|sub| Subtopic {
                        id: sub.id.trim().to_string(),
                        title: sub.title,
                        content: sub.content,
                        category: sub
                            .category
                            .map(|c| c.trim().to_string())
                            .filter(|c| !c.is_empty()),
                    })
                    .collect(),
            })
            .collect();
        Ok(Self::new(topics)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("catalog: read {}", path.display()))?;
        Self::from_yaml(&data).with_context(|| format!("catalog: load {}", path.display()))
    }

    /// The catalog compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_yaml(EMBEDDED_CATALOG).context("catalog: load embedded catalog")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::embedded(),
        }
    }

    pub fn list_topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn find_topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.iter().find(|topic| topic.id == topic_id)
    }

    /// Searches every topic for the subtopic id and returns the first match
    /// in catalog order.
    pub fn find_subtopic(&self, subtopic_id: &str) -> Option<(&Topic, &Subtopic)> {
        self.topics.iter().find_map(|topic| {
            topic
                .subtopic(subtopic_id)
                .map(|subtopic| (topic, subtopic))
        })
    }

    /// Looks the subtopic up only inside `topic_id`.
    pub fn find_subtopic_in(&self, topic_id: &str, subtopic_id: &str) -> Option<&Subtopic> {
        self.find_topic(topic_id)
            .and_then(|topic| topic.subtopic(subtopic_id))
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            topics: self.topics.len(),
            subtopics: self.topics.iter().map(|t| t.subtopics.len()).sum(),
        }
    }
}

fn is_url_safe(id: &str) -> bool {
    id.chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

#[cfg(test)]
pub(crate) fn sample() -> Catalog {
    fn sub(id: &str, title: &str) -> Subtopic {
        Subtopic {
            id: id.to_string(),
            title: title.to_string(),
            content: format!("<p>{title} body</p>"),
            category: None,
        }
    }
    Catalog::new(vec![
        Topic {
            id: "db".into(),
            title: "Databases".into(),
            subtopics: vec![sub("acid", "ACID"), sub("base", "BASE")],
        },
        Topic {
            id: "net".into(),
            title: "Networking".into(),
            subtopics: vec![sub("tcp", "TCP")],
        },
        Topic {
            id: "empty".into(),
            title: "Coming soon".into(),
            subtopics: Vec::new(),
        },
    ])
    .unwrap()
}
