use std::sync::Arc;

use anyhow::{Context, Result};

use crate::catalog::Catalog;
use crate::clipboard::Copier;
use crate::config;
use crate::layout::{self, LayoutState};
use crate::logging;
use crate::router::{Route, Router};
use crate::storage::{self, MemoryPreferences, PreferenceStore};
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Route to open first, e.g. `/topic/databases/acid`.
    pub initial_path: Option<String>,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    logging::init(&logging::LogConfig::from_config(&cfg.log)).context("init logging")?;
    tracing::info!(version = crate::VERSION, "starting");

    let catalog = Arc::new(Catalog::load(cfg.catalog.path.as_deref()).context("load catalog")?);
    let stats = catalog.stats();
    tracing::info!(topics = stats.topics, subtopics = stats.subtopics, "catalog loaded");

    let mut status = String::new();
    let prefs = open_preferences(&cfg, &mut status);

    let (width, _) = crossterm::terminal::size().context("query terminal size")?;
    let layout = LayoutState::new(
        prefs,
        cfg.sidebar_limits(),
        width,
        layout::system_prefers_dark(),
    );

    let initial = opts
        .initial_path
        .as_deref()
        .map(Route::parse)
        .unwrap_or_default();
    let router = Router::new(Arc::clone(&catalog), initial);

    let options = ui::Options {
        catalog,
        router,
        layout,
        copier: Copier::new(cfg.clipboard.osc52_fallback),
        feedback_timeout: cfg.clipboard.feedback,
        tick_rate: cfg.ui.tick_rate,
        status_message: status,
    };

    let mut model = ui::Model::new(options);
    let result = model.run();
    tracing::info!("exiting");
    result
}

/// Opens the preference database, or falls back to process-local storage
/// so the session still works without persistence.
fn open_preferences(cfg: &config::Config, status: &mut String) -> Arc<dyn PreferenceStore> {
    match storage::Store::open(storage::Options {
        path: cfg.storage.path.clone(),
    }) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            tracing::warn!(
                error = %format!("{err:#}"),
                "preference store unavailable; using memory"
            );
            *status = "Preferences will not be saved this session.".to_string();
            Arc::new(MemoryPreferences::new())
        }
    }
}
