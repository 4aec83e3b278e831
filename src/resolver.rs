use crate::catalog::Catalog;
use crate::router::Route;

const HOME_TITLE: &str = "Welcome to InterviewOS";
const HOME_HTML: &str = r#"<h2>Welcome to InterviewOS</h2>
<p>A terminal handbook for technical interview preparation. Pick a topic in the
sidebar, or press <code>b</code> to browse and filter everything at once.</p>
<h3>Getting around</h3>
<ul>
<li><code>j</code>/<code>k</code> move in the sidebar, <code>Enter</code> opens, <code>Space</code> expands a topic</li>
<li><code>Tab</code> cycles focus between sidebar, divider and content</li>
<li><code>s</code> collapses the sidebar, <code>&lt;</code>/<code>&gt;</code> resize it, or drag the divider</li>
<li><code>t</code> switches between light and dark themes</li>
<li><code>Backspace</code>/<code>]</code> go back and forward</li>
<li>Digits copy the numbered code block in the content panel</li>
</ul>"#;

const ABOUT_TITLE: &str = "About";
const ABOUT_HTML: &str = r#"<h2>About InterviewOS</h2>
<p>InterviewOS collects study notes for data structures, algorithms, system design
and the rest of the interview loop in one navigable catalog.</p>
<p>Theme and sidebar preferences are stored locally and restored the next time you
start the app.</p>"#;

const BROWSE_TITLE: &str = "All topics";
const BROWSE_HTML: &str = r#"<p>Every subtopic in the catalog. Press <code>/</code> to filter by text and
<code>c</code> to cycle categories.</p>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    Topic { topic_id: String },
    Subtopic { topic_id: String, subtopic_id: String },
    Path(String),
}

/// What the content panel shows. Sentinel variants take the place of real
/// content so a bad route never leaves the panel blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPayload {
    Home,
    About,
    Browse,
    Found {
        subtopic_id: String,
        title: String,
        html: String,
    },
    NotFound(NotFoundReason),
    Placeholder {
        topic_title: String,
    },
}

impl ContentPayload {
    pub fn title(&self) -> String {
        match self {
            ContentPayload::Home => HOME_TITLE.to_string(),
            ContentPayload::About => ABOUT_TITLE.to_string(),
            ContentPayload::Browse => BROWSE_TITLE.to_string(),
            ContentPayload::Found { title, .. } => title.clone(),
            ContentPayload::NotFound(NotFoundReason::Topic { .. }) => "Topic not found".to_string(),
            ContentPayload::NotFound(NotFoundReason::Subtopic { .. }) => {
                "Subtopic not found".to_string()
            }
            ContentPayload::NotFound(NotFoundReason::Path(_)) => "Page not found".to_string(),
            ContentPayload::Placeholder { topic_title } => topic_title.clone(),
        }
    }

    pub fn html(&self) -> String {
        match self {
            ContentPayload::Home => HOME_HTML.to_string(),
            ContentPayload::About => ABOUT_HTML.to_string(),
            ContentPayload::Browse => BROWSE_HTML.to_string(),
            ContentPayload::Found { html, .. } => html.clone(),
            ContentPayload::NotFound(NotFoundReason::Topic { topic_id }) => format!(
                "<p>There is no topic called <code>{}</code>. Choose one from the sidebar.</p>",
                escape_html(topic_id)
            ),
            ContentPayload::NotFound(NotFoundReason::Subtopic {
                topic_id,
                subtopic_id,
            }) => format!(
                "<p>Topic <code>{}</code> has no subtopic <code>{}</code>.</p>",
                escape_html(topic_id),
                escape_html(subtopic_id)
            ),
            ContentPayload::NotFound(NotFoundReason::Path(path)) => format!(
                "<p>Nothing lives at <code>{}</code>. Press <code>g</code> to go home.</p>",
                escape_html(path)
            ),
            ContentPayload::Placeholder { topic_title } => format!(
                "<p>{} has no subtopics yet. Select a subtopic from another topic in the sidebar.</p>",
                escape_html(topic_title)
            ),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentPayload::NotFound(_))
    }

    /// Id of the subtopic being shown, if any.
    pub fn subtopic_id(&self) -> Option<&str> {
        match self {
            ContentPayload::Found { subtopic_id, .. } => Some(subtopic_id),
            _ => None,
        }
    }
}

/// Maps route identifiers to a payload. Total: every input has an answer.
///
/// Empty ids count as absent. A subtopic is only ever looked up inside the
/// requested topic.
pub fn resolve(
    catalog: &Catalog,
    topic_id: Option<&str>,
    subtopic_id: Option<&str>,
) -> ContentPayload {
    let topic_id = topic_id.filter(|id| !id.is_empty());
    let subtopic_id = subtopic_id.filter(|id| !id.is_empty());

    let Some(topic_id) = topic_id else {
        return ContentPayload::Home;
    };
    let Some(topic) = catalog.find_topic(topic_id) else {
        return ContentPayload::NotFound(NotFoundReason::Topic {
            topic_id: topic_id.to_string(),
        });
    };

    let subtopic = match subtopic_id {
        None => match topic.first_subtopic() {
            Some(first) => first,
            None => {
                return ContentPayload::Placeholder {
                    topic_title: topic.title.clone(),
                }
            }
        },
        Some(subtopic_id) => match topic.subtopic(subtopic_id) {
            Some(sub) => sub,
            None => {
                return ContentPayload::NotFound(NotFoundReason::Subtopic {
                    topic_id: topic.id.clone(),
                    subtopic_id: subtopic_id.to_string(),
                })
            }
        },
    };

    ContentPayload::Found {
        subtopic_id: subtopic.id.clone(),
        title: subtopic.title.clone(),
        html: subtopic.content.clone(),
    }
}

pub fn resolve_route(catalog: &Catalog, route: &Route) -> ContentPayload {
    match route {
        Route::Home => ContentPayload::Home,
        Route::About => ContentPayload::About,
        Route::Topics => ContentPayload::Browse,
        Route::Topic {
            topic_id,
            subtopic_id,
        } => resolve(catalog, Some(topic_id), subtopic_id.as_deref()),
        Route::NotFound(path) => ContentPayload::NotFound(NotFoundReason::Path(path.clone())),
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn resolves_the_database_scenario() {
        let catalog = catalog::sample();
        assert_eq!(resolve(&catalog, Some("db"), None).title(), "ACID");
        assert_eq!(resolve(&catalog, Some("db"), Some("base")).title(), "BASE");
        assert_eq!(
            resolve(&catalog, Some("db"), Some("nope")),
            ContentPayload::NotFound(NotFoundReason::Subtopic {
                topic_id: "db".into(),
                subtopic_id: "nope".into(),
            })
        );
        assert_eq!(
            resolve(&catalog, Some("nope"), None),
            ContentPayload::NotFound(NotFoundReason::Topic {
                topic_id: "nope".into()
            })
        );
        assert_eq!(resolve(&catalog, None, None), ContentPayload::Home);
    }

    #[test]
    fn subtopic_lookup_is_scoped_to_topic() {
        let catalog = catalog::sample();
        assert!(catalog.find_subtopic("tcp").is_some());
        let payload = resolve(&catalog, Some("db"), Some("tcp"));
        assert!(payload.is_not_found());
        assert_ne!(payload.title(), "TCP");
    }

    #[test]
    fn default_subtopic_is_the_first() {
        let catalog = catalog::sample();
        let payload = resolve(&catalog, Some("db"), None);
        assert_eq!(payload.subtopic_id(), Some("acid"));
        assert_eq!(payload.html(), "<p>ACID body</p>");
    }

    #[test]
    fn empty_topic_yields_placeholder() {
        let catalog = catalog::sample();
        let payload = resolve(&catalog, Some("empty"), None);
        assert_eq!(
            payload,
            ContentPayload::Placeholder {
                topic_title: "Coming soon".into()
            }
        );
        assert!(payload.html().contains("Coming soon"));
    }

    #[test]
    fn resolution_is_total() {
        let catalog = catalog::sample();
        let topics = [None, Some(""), Some("nonexistent-id"), Some("db"), Some("net"), Some("empty")];
        let subtopics = [None, Some(""), Some("nonexistent-id"), Some("acid"), Some("base"), Some("tcp")];
        for topic in topics {
            for sub in subtopics {
                let payload = resolve(&catalog, topic, sub);
                assert!(!payload.title().is_empty(), "{topic:?}/{sub:?}");
                assert!(!payload.html().is_empty(), "{topic:?}/{sub:?}");
            }
        }
    }

    #[test]
    fn empty_ids_count_as_absent() {
        let catalog = catalog::sample();
        assert_eq!(resolve(&catalog, Some(""), Some("acid")), ContentPayload::Home);
        assert_eq!(resolve(&catalog, Some("db"), Some("")).title(), "ACID");
    }

    #[test]
    fn routes_map_to_payloads() {
        let catalog = catalog::sample();
        assert_eq!(resolve_route(&catalog, &Route::About), ContentPayload::About);
        assert_eq!(resolve_route(&catalog, &Route::Topics), ContentPayload::Browse);
        assert_eq!(
            resolve_route(&catalog, &Route::subtopic("net", "tcp")).title(),
            "TCP"
        );
        assert!(resolve_route(&catalog, &Route::NotFound("/x".into())).is_not_found());
    }

    #[test]
    fn sentinel_bodies_escape_ids() {
        let payload = ContentPayload::NotFound(NotFoundReason::Topic {
            topic_id: "<script>".into(),
        });
        assert!(payload.html().contains("&lt;script&gt;"));
    }
}
