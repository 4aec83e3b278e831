use std::fmt;
use std::sync::Arc;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::catalog::Catalog;

const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const HISTORY_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Home,
    About,
    Topics,
    Topic {
        topic_id: String,
        subtopic_id: Option<String>,
    },
    NotFound(String),
}

impl Route {
    pub fn topic(topic_id: impl Into<String>) -> Self {
        Route::Topic {
            topic_id: topic_id.into(),
            subtopic_id: None,
        }
    }

    pub fn subtopic(topic_id: impl Into<String>, subtopic_id: impl Into<String>) -> Self {
        Route::Topic {
            topic_id: topic_id.into(),
            subtopic_id: Some(subtopic_id.into()),
        }
    }

    /// Parses a client path. Unknown shapes become [`Route::NotFound`];
    /// parsing never fails.
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim();
        let without_suffix = trimmed
            .split(|ch: char| ch == '?' || ch == '#')
            .next()
            .unwrap_or_default();
        // One leading and one trailing slash are optional; interior empty
        // segments stay so `/topic//acid` cannot shift ids between slots.
        let body = without_suffix.strip_prefix('/').unwrap_or(without_suffix);
        let body = body.strip_suffix('/').unwrap_or(body);
        if body.is_empty() {
            return Route::Home;
        }
        let segments: Vec<String> = body
            .split('/')
            .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
            .collect();

        match segments.as_slice() {
            [page] if page == "about" => Route::About,
            [page] if page == "topics" => Route::Topics,
            [prefix, topic] if prefix == "topic" && !topic.is_empty() => Route::topic(topic.clone()),
            [prefix, topic, sub] if prefix == "topic" && !topic.is_empty() && !sub.is_empty() => {
                Route::subtopic(topic.clone(), sub.clone())
            }
            _ => Route::NotFound(trimmed.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::About => "/about".to_string(),
            Route::Topics => "/topics".to_string(),
            Route::Topic {
                topic_id,
                subtopic_id: None,
            } => format!("/topic/{}", encode(topic_id)),
            Route::Topic {
                topic_id,
                subtopic_id: Some(sub),
            } => format!("/topic/{}/{}", encode(topic_id), encode(sub)),
            Route::NotFound(path) => path.clone(),
        }
    }

    pub fn topic_id(&self) -> Option<&str> {
        match self {
            Route::Topic { topic_id, .. } => Some(topic_id),
            _ => None,
        }
    }

    pub fn subtopic_id(&self) -> Option<&str> {
        match self {
            Route::Topic { subtopic_id, .. } => subtopic_id.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// In-process navigation history. The UI polls [`Router::take_changed`]
/// after handling input and re-resolves content when it reports a change.
pub struct Router {
    catalog: Arc<Catalog>,
    history: Vec<Route>,
    cursor: usize,
    changed: bool,
}

impl Router {
    pub fn new(catalog: Arc<Catalog>, initial: Route) -> Self {
        Self {
            catalog,
            history: vec![initial],
            cursor: 0,
            changed: true,
        }
    }

    pub fn current(&self) -> &Route {
        &self.history[self.cursor]
    }

    pub fn navigate(&mut self, route: Route) {
        if *self.current() == route {
            return;
        }
        tracing::debug!(from = %self.current(), to = %route, "navigate");
        self.history.truncate(self.cursor + 1);
        self.history.push(route);
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
        self.cursor = self.history.len() - 1;
        self.changed = true;
    }

    pub fn navigate_path(&mut self, path: &str) {
        self.navigate(Route::parse(path));
    }

    /// `None` returns home; otherwise opens the topic without a subtopic.
    pub fn navigate_to_topic(&mut self, topic_id: Option<&str>) {
        match topic_id {
            None => self.navigate(Route::Home),
            Some(topic_id) => self.navigate(Route::topic(topic_id)),
        }
    }

    /// Opens a subtopic. Without `topic_id` the owning topic is found by a
    /// catalog-wide search (first match in catalog order); an id no topic
    /// owns leaves the route unchanged.
    pub fn navigate_to_subtopic(&mut self, subtopic_id: &str, topic_id: Option<&str>) {
        let owner = match topic_id {
            Some(topic_id) => Some(topic_id.to_string()),
            None => self
                .catalog
                .find_subtopic(subtopic_id)
                .map(|(topic, _)| topic.id.clone()),
        };
        match owner {
            Some(topic_id) => self.navigate(Route::subtopic(topic_id, subtopic_id)),
            None => tracing::debug!(subtopic_id, "no topic owns subtopic; navigation skipped"),
        }
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.history.len()
    }

    pub fn back(&mut self) -> bool {
        if !self.can_go_back() {
            return false;
        }
        self.cursor -= 1;
        self.changed = true;
        true
    }

    pub fn forward(&mut self) -> bool {
        if !self.can_go_forward() {
            return false;
        }
        self.cursor += 1;
        self.changed = true;
        true
    }

    /// Reports whether the active route changed since the last call.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    fn router() -> Router {
        Router::new(Arc::new(catalog::sample()), Route::Home)
    }

    #[test]
    fn parses_known_routes() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/about"), Route::About);
        assert_eq!(Route::parse("/topics/"), Route::Topics);
        assert_eq!(Route::parse("/topic/db"), Route::topic("db"));
        assert_eq!(Route::parse("/topic/db/acid"), Route::subtopic("db", "acid"));
        assert_eq!(Route::parse("/topic/db/acid?x=1#top"), Route::subtopic("db", "acid"));
        assert_eq!(Route::parse("/topic//acid"), Route::NotFound("/topic//acid".into()));
    }

    #[test]
    fn unknown_paths_are_not_found() {
        assert_eq!(
            Route::parse("/topic/db/acid/extra"),
            Route::NotFound("/topic/db/acid/extra".into())
        );
        assert_eq!(Route::parse("/settings"), Route::NotFound("/settings".into()));
        assert_eq!(Route::parse("/topic"), Route::NotFound("/topic".into()));
    }

    #[test]
    fn empty_segments_do_not_shift_ids() {
        assert_eq!(Route::parse("/topic//acid"), Route::NotFound("/topic//acid".into()));
        assert_eq!(Route::parse("/topic//db"), Route::NotFound("/topic//db".into()));
        assert_eq!(Route::parse("/topic/db//"), Route::NotFound("/topic/db//".into()));
        assert_eq!(Route::parse("//about"), Route::NotFound("//about".into()));
        assert_eq!(Route::parse("/topic/db/"), Route::topic("db"));
    }

    #[test]
    fn paths_are_percent_encoded() {
        let route = Route::subtopic("c++", "move semantics");
        assert_eq!(route.path(), "/topic/c%2B%2B/move%20semantics");
        assert_eq!(Route::parse(&route.path()), route);
    }

    #[test]
    fn navigate_to_topic_handles_home() {
        let mut router = router();
        router.take_changed();
        router.navigate_to_topic(Some("db"));
        assert_eq!(router.current().path(), "/topic/db");
        assert!(router.take_changed());
        router.navigate_to_topic(None);
        assert_eq!(router.current(), &Route::Home);
    }

    #[test]
    fn navigate_to_subtopic_with_explicit_topic() {
        let mut router = router();
        router.navigate_to_subtopic("base", Some("db"));
        assert_eq!(router.current().path(), "/topic/db/base");
    }

    #[test]
    fn navigate_to_subtopic_resolves_owner() {
        let mut router = router();
        router.navigate_to_subtopic("tcp", None);
        assert_eq!(router.current().path(), "/topic/net/tcp");
        router.take_changed();
        router.navigate_to_subtopic("missing", None);
        assert_eq!(router.current().path(), "/topic/net/tcp");
        assert!(!router.take_changed());
    }

    #[test]
    fn history_back_and_forward() {
        let mut router = router();
        router.navigate(Route::Topics);
        router.navigate(Route::About);
        assert!(router.back());
        assert_eq!(router.current(), &Route::Topics);
        assert!(router.forward());
        assert_eq!(router.current(), &Route::About);
        assert!(!router.forward());

        router.back();
        router.navigate(Route::topic("db"));
        assert!(!router.can_go_forward());
        assert!(router.back());
        assert!(router.back());
        assert_eq!(router.current(), &Route::Home);
        assert!(!router.back());
    }

    #[test]
    fn repeated_navigation_does_not_grow_history() {
        let mut router = router();
        router.navigate(Route::About);
        router.take_changed();
        router.navigate(Route::About);
        assert!(!router.take_changed());
        assert!(router.back());
        assert!(!router.can_go_back());
    }
}
