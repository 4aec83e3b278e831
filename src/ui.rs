use std::collections::HashSet;
use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap,
};
use ratatui::{Frame, Terminal};
use textwrap::core::{break_words, Fragment, Word};
use textwrap::wrap_algorithms::wrap_first_fit;
use textwrap::WordSeparator;
use unicode_width::UnicodeWidthStr;

use crate::browse::{self, BrowseFilter};
use crate::catalog::Catalog;
use crate::clipboard::{CopyFeedback, CopyMethod, Copier};
use crate::html::{Rendered, Renderer};
use crate::layout::{LayoutState, Theme};
use crate::resolver::{resolve_route, ContentPayload};
use crate::router::{Route, Router};
use crate::theme::{self, Palette};

const BRAND: &str = "InterviewOS";
const MENU_BUTTON: &str = " ☰ ";
const NAV_LINKS: [(&str, NavLink); 3] = [
    ("Home", NavLink::Home),
    ("Topics", NavLink::Topics),
    ("About", NavLink::About),
];
const BROWSE_INTRO_HEIGHT: u16 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum NavLink {
    Home,
    Topics,
    About,
}

impl NavLink {
    fn route(self) -> Route {
        match self {
            NavLink::Home => Route::Home,
            NavLink::Topics => Route::Topics,
            NavLink::About => Route::About,
        }
    }

    fn is_active(self, route: &Route) -> bool {
        matches!(
            (self, route),
            (NavLink::Home, Route::Home)
                | (NavLink::Topics, Route::Topics | Route::Topic { .. })
                | (NavLink::About, Route::About)
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Pane {
    Sidebar,
    Divider,
    Content,
}

impl Pane {
    fn title(self) -> &'static str {
        match self {
            Pane::Sidebar => "Sidebar",
            Pane::Divider => "Divider",
            Pane::Content => "Content",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum TreeItem {
    Topic(usize),
    Subtopic(usize, usize),
}

#[derive(Default)]
struct BrowseState {
    filter: BrowseFilter,
    editing: bool,
    categories: Vec<String>,
    list_state: ListState,
}

/// Screen regions from the last draw, used to route mouse input.
#[derive(Default, Clone, Copy)]
struct HitAreas {
    body: Rect,
    sidebar: Rect,
    sidebar_list: Rect,
    divider: Rect,
    content: Rect,
    browse_list: Rect,
    menu_button: Rect,
    theme_toggle: Rect,
    nav_links: [Rect; 3],
}

fn hit(rect: Rect, column: u16, row: u16) -> bool {
    rect.width > 0
        && rect.height > 0
        && column >= rect.x
        && column < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

pub struct Options {
    pub catalog: Arc<Catalog>,
    pub router: Router,
    pub layout: LayoutState,
    pub copier: Copier,
    pub feedback_timeout: Duration,
    pub tick_rate: Duration,
    pub status_message: String,
}

pub struct Model {
    catalog: Arc<Catalog>,
    router: Router,
    layout: LayoutState,
    copier: Copier,
    feedback: CopyFeedback,
    payload: ContentPayload,
    rendered: Rendered,
    content_lines: Vec<Line<'static>>,
    content_rows: Vec<usize>,
    content_scroll: u16,
    focused_pane: Pane,
    expanded: HashSet<String>,
    sidebar_index: usize,
    sidebar_state: ListState,
    browse: BrowseState,
    areas: HitAreas,
    status_message: String,
    needs_redraw: bool,
    tick_rate: Duration,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let Options {
            catalog,
            router,
            layout,
            copier,
            feedback_timeout,
            tick_rate,
            status_message,
        } = opts;
        let browse = BrowseState {
            categories: browse::categories(&catalog),
            ..BrowseState::default()
        };
        let palette = theme::palette(layout.theme());
        let rendered = Renderer::new(palette).render("");

        let mut model = Self {
            catalog,
            router,
            layout,
            copier,
            feedback: CopyFeedback::new(feedback_timeout),
            payload: ContentPayload::Home,
            rendered,
            content_lines: Vec::new(),
            content_rows: Vec::new(),
            content_scroll: 0,
            focused_pane: Pane::Sidebar,
            expanded: HashSet::new(),
            sidebar_index: 0,
            sidebar_state: ListState::default(),
            browse,
            areas: HitAreas::default(),
            status_message,
            needs_redraw: true,
            tick_rate,
        };
        if model.layout.is_mobile() {
            model.focused_pane = Pane::Content;
        }
        model.process_background();
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            if self.process_background() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }
            self.write_terminal_requests(&mut io::stdout())?;

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Mouse(mouse) => {
                        if let Err(err) = self.handle_mouse(mouse) {
                            self.status_message = format!("Error: {}", err);
                            self.mark_dirty();
                        }
                    }
                    Event::Resize(width, _) => self.handle_resize(width),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                last_tick = Instant::now();
            }
        }

        Ok(())
    }

    /// Flushes queued OSC 52 sequences. Only called between frames.
    fn write_terminal_requests<W: Write>(&self, out: &mut W) -> Result<()> {
        let pending = self.copier.take_terminal_writes();
        if pending.is_empty() {
            return Ok(());
        }
        for sequence in &pending {
            out.write_all(sequence.as_bytes())?;
        }
        out.flush()?;
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn palette(&self) -> &'static Palette {
        theme::palette(self.layout.theme())
    }

    /// Drains copy results, expires the copied marker and re-resolves
    /// content after a route change. Returns true when anything changed.
    fn process_background(&mut self) -> bool {
        let mut changed = false;

        for outcome in self.copier.poll() {
            match outcome.result {
                Ok(method) => {
                    self.feedback.mark(outcome.number, Instant::now());
                    self.status_message = match method {
                        CopyMethod::Primary => format!("Copied code block {}.", outcome.number),
                        CopyMethod::Fallback => format!(
                            "Copied code block {} through the terminal.",
                            outcome.number
                        ),
                    };
                }
                Err(err) => {
                    tracing::debug!(number = outcome.number, error = %err, "copy dropped");
                    self.status_message.clear();
                }
            }
            changed = true;
        }

        if self.feedback.expire(Instant::now()) {
            changed = true;
        }

        if self.router.take_changed() {
            self.sync_route();
            changed = true;
        }

        changed
    }

    fn sync_route(&mut self) {
        let route = self.router.current().clone();
        self.payload = resolve_route(&self.catalog, &route);
        if self.payload.is_not_found() {
            tracing::info!(route = %route, "route did not resolve");
        } else {
            tracing::debug!(route = %route, title = %self.payload.title(), "content resolved");
        }
        self.render_payload();
        self.content_scroll = 0;
        self.feedback.clear();
        if let Some(topic_id) = route.topic_id() {
            self.expanded.insert(topic_id.to_string());
        }
        if matches!(self.payload, ContentPayload::Browse) {
            self.browse.list_state.select(Some(0));
        }
        self.select_active_tree_row();
        self.mark_dirty();
    }

    fn render_payload(&mut self) {
        self.rendered = Renderer::new(self.palette()).render(&self.payload.html());
        self.content_lines.clear();
        self.content_rows.clear();
    }

    fn sidebar_compact(&self) -> bool {
        self.layout.sidebar_collapsed() && !self.layout.is_mobile()
    }

    fn tree_items(&self) -> Vec<TreeItem> {
        let compact = self.sidebar_compact();
        let mut items = Vec::new();
        for (topic_idx, topic) in self.catalog.list_topics().iter().enumerate() {
            items.push(TreeItem::Topic(topic_idx));
            if compact || !self.expanded.contains(&topic.id) {
                continue;
            }
            for sub_idx in 0..topic.subtopics.len() {
                items.push(TreeItem::Subtopic(topic_idx, sub_idx));
            }
        }
        items
    }

    fn select_active_tree_row(&mut self) {
        let route = self.router.current();
        let Some(topic_id) = route.topic_id() else {
            return;
        };
        let topics = self.catalog.list_topics();
        let Some(topic_idx) = topics.iter().position(|t| t.id == topic_id) else {
            return;
        };
        let sub_idx = self.payload.subtopic_id().and_then(|sub_id| {
            topics[topic_idx]
                .subtopics
                .iter()
                .position(|s| s.id == sub_id)
        });
        let items = self.tree_items();
        let found = sub_idx
            .and_then(|sub_idx| {
                items
                    .iter()
                    .position(|item| *item == TreeItem::Subtopic(topic_idx, sub_idx))
            })
            .or_else(|| {
                items
                    .iter()
                    .position(|item| *item == TreeItem::Topic(topic_idx))
            });
        if let Some(index) = found {
            self.sidebar_index = index;
        }
    }

    fn handle_resize(&mut self, width: u16) {
        let before = self.layout.device_class();
        let after = self.layout.on_viewport_resize(width);
        if before != after {
            if self.layout.is_mobile() {
                self.focused_pane = Pane::Content;
            } else if !self.layout.mobile_menu_open() && self.focused_pane == Pane::Divider {
                self.focused_pane = Pane::Sidebar;
            }
        }
        self.mark_dirty();
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }

        if self.browse.editing {
            self.handle_filter_key(key.code);
            return Ok(false);
        }

        let browsing = matches!(self.payload, ContentPayload::Browse);
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Char('s') => self.toggle_sidebar(),
            KeyCode::Char('m') => self.toggle_menu(),
            KeyCode::Char('<') => self.nudge_sidebar(-1),
            KeyCode::Char('>') => self.nudge_sidebar(1),
            KeyCode::Left if self.focused_pane == Pane::Divider => self.nudge_sidebar(-1),
            KeyCode::Right if self.focused_pane == Pane::Divider => self.nudge_sidebar(1),
            KeyCode::Tab => self.cycle_focus(true),
            KeyCode::BackTab => self.cycle_focus(false),
            KeyCode::Char('j') | KeyCode::Down => self.move_in_focus(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_in_focus(-1),
            KeyCode::PageDown => self.move_in_focus(self.page_step()),
            KeyCode::PageUp => self.move_in_focus(-self.page_step()),
            KeyCode::Enter => self.activate(),
            KeyCode::Char(' ') => self.toggle_expand(),
            KeyCode::Char('g') => self.router.navigate(Route::Home),
            KeyCode::Char('b') => self.router.navigate(Route::Topics),
            KeyCode::Char('a') => self.router.navigate(Route::About),
            KeyCode::Backspace | KeyCode::Char('[') => {
                if !self.router.back() {
                    self.status_message = "Already at the oldest page.".to_string();
                }
            }
            KeyCode::Char(']') => {
                if !self.router.forward() {
                    self.status_message = "Already at the newest page.".to_string();
                }
            }
            KeyCode::Char('/') => {
                self.router.navigate(Route::Topics);
                self.browse.editing = true;
                self.focused_pane = Pane::Content;
                self.status_message = "Type to filter; Enter or Esc to finish.".to_string();
            }
            KeyCode::Char('c') if browsing => self.cycle_category(),
            KeyCode::Char(ch @ '1'..='9') if self.content_has_focus() => {
                let number = ch as usize - '0' as usize;
                self.copy_block(number);
            }
            KeyCode::Char('1'..='9') => {
                self.status_message = "Focus the content pane (Tab) to copy code.".to_string();
            }
            KeyCode::Esc => self.escape(),
            _ => return Ok(false),
        }

        self.mark_dirty();
        Ok(false)
    }

    fn handle_filter_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter | KeyCode::Esc => {
                self.browse.editing = false;
                self.status_message.clear();
            }
            KeyCode::Backspace => {
                self.browse.filter.query.pop();
            }
            KeyCode::Char(ch) => self.browse.filter.query.push(ch),
            _ => return,
        }
        self.browse.list_state.select(Some(0));
        self.mark_dirty();
    }

    fn toggle_theme(&mut self) {
        let theme = self.layout.toggle_theme();
        self.render_payload();
        self.status_message = format!("Theme: {theme}");
    }

    fn toggle_sidebar(&mut self) {
        let collapsed = self.layout.toggle_sidebar_collapse();
        if collapsed && self.focused_pane == Pane::Divider {
            self.focused_pane = Pane::Sidebar;
        }
        self.select_active_tree_row();
        self.status_message = if collapsed {
            "Sidebar collapsed.".to_string()
        } else {
            format!("Sidebar expanded to {} columns.", self.layout.sidebar_width())
        };
    }

    fn toggle_menu(&mut self) {
        if !self.layout.is_mobile() {
            self.status_message = "The menu overlay is only used on narrow terminals.".to_string();
            return;
        }
        if self.layout.toggle_mobile_menu() {
            self.focused_pane = Pane::Sidebar;
        } else {
            self.focused_pane = Pane::Content;
        }
    }

    fn close_menu(&mut self) {
        if self.layout.mobile_menu_open() {
            self.layout.close_mobile_menu();
            self.focused_pane = Pane::Content;
        }
    }

    fn nudge_sidebar(&mut self, steps: i32) {
        if self.layout.sidebar_collapsed() {
            self.status_message = "Expand the sidebar (s) before resizing it.".to_string();
            return;
        }
        let width = self.layout.nudge(steps);
        self.status_message = format!("Sidebar width {width}.");
    }

    fn focus_order(&self) -> Vec<Pane> {
        if self.layout.is_mobile() {
            if self.layout.mobile_menu_open() {
                vec![Pane::Sidebar]
            } else {
                vec![Pane::Content]
            }
        } else if self.layout.sidebar_collapsed() {
            vec![Pane::Sidebar, Pane::Content]
        } else {
            vec![Pane::Sidebar, Pane::Divider, Pane::Content]
        }
    }

    fn cycle_focus(&mut self, forward: bool) {
        let order = self.focus_order();
        let current = order
            .iter()
            .position(|pane| *pane == self.focused_pane)
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % order.len()
        } else {
            (current + order.len() - 1) % order.len()
        };
        self.focused_pane = order[next];
        self.status_message = format!("Focused {} pane", self.focused_pane.title());
    }

    fn page_step(&self) -> i32 {
        i32::from(self.areas.content.height.max(2) - 1)
    }

    fn move_in_focus(&mut self, delta: i32) {
        if self.layout.mobile_menu_open() {
            self.move_sidebar(delta);
            return;
        }
        match self.focused_pane {
            Pane::Sidebar => self.move_sidebar(delta),
            Pane::Divider => {}
            Pane::Content => {
                if matches!(self.payload, ContentPayload::Browse) {
                    self.move_browse(delta);
                } else {
                    self.scroll_content(delta);
                }
            }
        }
    }

    fn move_sidebar(&mut self, delta: i32) {
        let len = self.tree_items().len();
        if len == 0 {
            return;
        }
        let next = (self.sidebar_index as i64 + i64::from(delta)).clamp(0, len as i64 - 1);
        self.sidebar_index = next as usize;
    }

    fn move_browse(&mut self, delta: i32) {
        let len = browse::filter(&self.catalog, &self.browse.filter).len();
        if len == 0 {
            self.browse.list_state.select(None);
            return;
        }
        let current = self.browse.list_state.selected().unwrap_or(0);
        let next = (current as i64 + i64::from(delta)).clamp(0, len as i64 - 1);
        self.browse.list_state.select(Some(next as usize));
    }

    fn scroll_content(&mut self, delta: i32) {
        if self.layout.background_scroll_locked() {
            return;
        }
        let max = self
            .content_lines
            .len()
            .saturating_sub(usize::from(self.areas.content.height));
        let next = (i64::from(self.content_scroll) + i64::from(delta)).clamp(0, max as i64);
        self.content_scroll = next as u16;
    }

    fn activate(&mut self) {
        if self.focused_pane == Pane::Content && !self.layout.mobile_menu_open() {
            if matches!(self.payload, ContentPayload::Browse) {
                self.open_browse_selection();
            }
            return;
        }
        if self.focused_pane == Pane::Divider {
            return;
        }
        let items = self.tree_items();
        if let Some(item) = items.get(self.sidebar_index).copied() {
            self.open_tree_item(item);
        }
    }

    fn open_tree_item(&mut self, item: TreeItem) {
        let catalog = Arc::clone(&self.catalog);
        let topics = catalog.list_topics();
        match item {
            TreeItem::Topic(topic_idx) => {
                let topic = &topics[topic_idx];
                self.expanded.insert(topic.id.clone());
                self.router.navigate_to_topic(Some(topic.id.as_str()));
            }
            TreeItem::Subtopic(topic_idx, sub_idx) => {
                let topic = &topics[topic_idx];
                let sub = &topic.subtopics[sub_idx];
                self.router
                    .navigate_to_subtopic(&sub.id, Some(topic.id.as_str()));
                self.close_menu();
            }
        }
    }

    fn toggle_expand(&mut self) {
        if self.sidebar_compact() {
            return;
        }
        let items = self.tree_items();
        let Some(item) = items.get(self.sidebar_index).copied() else {
            return;
        };
        let topic_idx = match item {
            TreeItem::Topic(idx) | TreeItem::Subtopic(idx, _) => idx,
        };
        let topic_id = self.catalog.list_topics()[topic_idx].id.clone();
        if !self.expanded.remove(&topic_id) {
            self.expanded.insert(topic_id);
        } else if let TreeItem::Subtopic(..) = item {
            // Collapsing from a child moves the cursor to its topic.
            if let Some(index) = self
                .tree_items()
                .iter()
                .position(|i| *i == TreeItem::Topic(topic_idx))
            {
                self.sidebar_index = index;
            }
        }
    }

    fn open_browse_selection(&mut self) {
        let catalog = Arc::clone(&self.catalog);
        let entries = browse::filter(&catalog, &self.browse.filter);
        let Some(entry) = self
            .browse
            .list_state
            .selected()
            .and_then(|idx| entries.get(idx))
        else {
            return;
        };
        self.router
            .navigate_to_subtopic(&entry.subtopic.id, Some(entry.topic.id.as_str()));
    }

    fn cycle_category(&mut self) {
        let next = browse::next_category(
            &self.browse.categories,
            self.browse.filter.category.as_deref(),
        );
        self.status_message = match &next {
            Some(category) => format!("Category: {category}"),
            None => "Category: all".to_string(),
        };
        self.browse.filter.category = next;
        self.browse.list_state.select(Some(0));
    }

    fn content_has_focus(&self) -> bool {
        self.focused_pane == Pane::Content && !self.layout.mobile_menu_open()
    }

    fn copy_block(&mut self, number: usize) {
        let Some(block) = self
            .rendered
            .code_blocks
            .iter()
            .find(|block| block.number == number)
        else {
            self.status_message = format!("No code block {number} on this page.");
            return;
        };
        tracing::debug!(number, bytes = block.code.len(), "copy requested");
        self.copier.copy(number, block.code.clone());
    }

    fn escape(&mut self) {
        if self.layout.mobile_menu_open() {
            self.close_menu();
        } else if !self.browse.filter.is_empty() && matches!(self.payload, ContentPayload::Browse) {
            self.browse.filter = BrowseFilter::default();
            self.browse.list_state.select(Some(0));
        } else {
            self.focused_pane = Pane::Content;
        }
        self.status_message.clear();
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Result<()> {
        let (column, row) = (event.column, event.row);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => self.handle_click(column, row),
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(width) = self.layout.drag_to(column) {
                    self.status_message = format!("Sidebar width {width}.");
                    self.mark_dirty();
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.layout.drag().is_dragging() {
                    self.layout.end_drag();
                    self.mark_dirty();
                }
            }
            MouseEventKind::ScrollDown => self.scroll_at(column, row, 1),
            MouseEventKind::ScrollUp => self.scroll_at(column, row, -1),
            _ => {}
        }
        Ok(())
    }

    fn handle_click(&mut self, column: u16, row: u16) {
        self.mark_dirty();

        if self.layout.is_mobile() && hit(self.areas.menu_button, column, row) {
            self.toggle_menu();
            return;
        }
        if hit(self.areas.theme_toggle, column, row) {
            self.toggle_theme();
            return;
        }
        if let Some(idx) = self
            .areas
            .nav_links
            .iter()
            .position(|rect| hit(*rect, column, row))
        {
            self.close_menu();
            self.router.navigate(NAV_LINKS[idx].1.route());
            return;
        }

        if self.layout.mobile_menu_open() {
            if hit(self.areas.sidebar, column, row) {
                self.click_sidebar(column, row);
            } else if hit(self.areas.body, column, row) {
                self.close_menu();
            }
            return;
        }

        if !self.layout.is_mobile() && hit(self.areas.divider, column, row) {
            if self.layout.begin_drag(column) {
                self.focused_pane = Pane::Divider;
            }
            return;
        }
        if hit(self.areas.sidebar, column, row) {
            self.focused_pane = Pane::Sidebar;
            self.click_sidebar(column, row);
            return;
        }
        if hit(self.areas.browse_list, column, row) {
            self.focused_pane = Pane::Content;
            let offset = self.browse.list_state.offset();
            let index = offset + usize::from(row - self.areas.browse_list.y);
            self.browse.list_state.select(Some(index));
            self.open_browse_selection();
            return;
        }
        if hit(self.areas.content, column, row) {
            self.focused_pane = Pane::Content;
            let visual = usize::from(self.content_scroll) + usize::from(row - self.areas.content.y);
            let number = self
                .content_rows
                .get(visual)
                .and_then(|line| self.rendered.code_block_at_line(*line))
                .map(|block| block.number);
            if let Some(number) = number {
                self.copy_block(number);
            }
        }
    }

    fn click_sidebar(&mut self, column: u16, row: u16) {
        if !hit(self.areas.sidebar_list, column, row) {
            return;
        }
        let index = self.sidebar_state.offset() + usize::from(row - self.areas.sidebar_list.y);
        let items = self.tree_items();
        if let Some(item) = items.get(index).copied() {
            self.sidebar_index = index;
            self.open_tree_item(item);
        }
    }

    fn scroll_at(&mut self, column: u16, row: u16, delta: i32) {
        if hit(self.areas.sidebar, column, row) {
            self.move_sidebar(delta);
        } else if self.layout.mobile_menu_open() {
            return;
        } else if hit(self.areas.browse_list, column, row) {
            self.move_browse(delta);
        } else if hit(self.areas.content, column, row) {
            self.scroll_content(delta);
        } else {
            return;
        }
        self.mark_dirty();
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let palette = self.palette();
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(palette.bg)), full);
        self.areas = HitAreas::default();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        self.draw_header(frame, layout[0]);
        let body = layout[1];
        self.areas.body = body;

        if self.layout.is_mobile() {
            self.draw_content(frame, body);
            if self.layout.mobile_menu_open() {
                self.draw_overlay(frame, body);
            }
        } else {
            let sidebar_width = self.layout.sidebar_width().min(body.width.saturating_sub(2));
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Length(sidebar_width),
                    Constraint::Length(1),
                    Constraint::Min(0),
                ])
                .split(body);
            self.draw_sidebar(frame, chunks[0]);
            self.draw_divider(frame, chunks[1]);
            self.draw_content(frame, chunks[2]);
        }

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(palette.text_secondary)
                    .bg(palette.panel_bg)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[2]);
    }

    fn draw_header(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let palette = self.palette();
        let bar = Style::default().fg(palette.text_primary).bg(palette.panel_focused_bg);
        frame.render_widget(Block::default().style(bar), area);

        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut x = area.x;
        let mut push = |spans: &mut Vec<Span<'static>>, text: String, style: Style| -> Rect {
            let width = UnicodeWidthStr::width(text.as_str()) as u16;
            let width = width.min(area.right().saturating_sub(x));
            let rect = Rect::new(x, area.y, width, 1);
            x = x.saturating_add(width);
            spans.push(Span::styled(text, style));
            rect
        };

        if self.layout.is_mobile() {
            let style = if self.layout.mobile_menu_open() {
                bar.fg(palette.accent).add_modifier(Modifier::BOLD)
            } else {
                bar
            };
            self.areas.menu_button = push(&mut spans, MENU_BUTTON.to_string(), style);
        }
        push(
            &mut spans,
            format!(" {BRAND} "),
            bar.fg(palette.accent).add_modifier(Modifier::BOLD),
        );
        let route = self.router.current().clone();
        for (idx, (label, link)) in NAV_LINKS.iter().enumerate() {
            let style = if link.is_active(&route) {
                bar.fg(palette.heading).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                bar.fg(palette.text_secondary)
            };
            push(&mut spans, " ".to_string(), bar);
            self.areas.nav_links[idx] = push(&mut spans, (*label).to_string(), style);
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);

        let toggle = match self.layout.theme() {
            Theme::Dark => " ☾ dark ",
            Theme::Light => " ☀ light ",
        };
        let width = (UnicodeWidthStr::width(toggle) as u16).min(area.width);
        let rect = Rect::new(area.right().saturating_sub(width), area.y, width, 1);
        if rect.x >= x {
            frame.render_widget(
                Paragraph::new(Span::styled(toggle, bar.fg(palette.accent))),
                rect,
            );
            self.areas.theme_toggle = rect;
        }
    }

    fn pane_block(&self, pane: Pane, title: String) -> Block<'static> {
        let palette = self.palette();
        let focused = self.focused_pane == pane;
        let border_style = if focused {
            Style::default().fg(palette.border_focused)
        } else {
            Style::default().fg(palette.border_idle)
        };
        let title_style = if focused {
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.text_secondary)
        };
        Block::default()
            .title(Span::styled(title, title_style))
            .borders(Borders::ALL)
            .border_style(border_style)
            .style(Style::default().bg(palette.panel_bg))
    }

    fn draw_sidebar(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let palette = self.palette();
        let compact = self.sidebar_compact();
        let block = if compact {
            self.pane_block(Pane::Sidebar, String::new())
        } else {
            self.pane_block(Pane::Sidebar, "Topics".to_string())
                .padding(Padding::horizontal(1))
        };
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.areas.sidebar = area;
        self.areas.sidebar_list = inner;

        let items = self.tree_items();
        if items.is_empty() {
            return;
        }
        self.sidebar_index = self.sidebar_index.min(items.len() - 1);

        let route = self.router.current();
        let active_topic = route.topic_id();
        let active_sub = self.payload.subtopic_id();
        let topics = self.catalog.list_topics();
        let list_items: Vec<ListItem<'static>> = items
            .iter()
            .map(|item| {
                let line = match *item {
                    TreeItem::Topic(idx) => {
                        let topic = &topics[idx];
                        let active = active_topic == Some(topic.id.as_str());
                        let style = if active {
                            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(palette.text_primary)
                        };
                        if compact {
                            Line::from(Span::styled(abbreviate(&topic.title), style))
                        } else {
                            let marker = if topic.subtopics.is_empty() {
                                "·"
                            } else if self.expanded.contains(&topic.id) {
                                "▾"
                            } else {
                                "▸"
                            };
                            Line::from(vec![
                                Span::styled(
                                    format!("{marker} "),
                                    Style::default().fg(palette.text_secondary),
                                ),
                                Span::styled(topic.title.clone(), style),
                            ])
                        }
                    }
                    TreeItem::Subtopic(topic_idx, sub_idx) => {
                        let topic = &topics[topic_idx];
                        let sub = &topic.subtopics[sub_idx];
                        let active = active_topic == Some(topic.id.as_str())
                            && active_sub == Some(sub.id.as_str());
                        let style = if active {
                            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(palette.text_secondary)
                        };
                        Line::from(Span::styled(format!("   {}", sub.title), style))
                    }
                };
                ListItem::new(line)
            })
            .collect();

        let focused = self.focused_pane == Pane::Sidebar || self.layout.mobile_menu_open();
        let highlight = if focused {
            Style::default()
                .bg(palette.panel_selected_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(palette.panel_focused_bg)
        };
        let list = List::new(list_items).highlight_style(highlight);
        self.sidebar_state.select(Some(self.sidebar_index));
        frame.render_stateful_widget(list, inner, &mut self.sidebar_state);
    }

    fn draw_divider(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let palette = self.palette();
        let active = self.focused_pane == Pane::Divider || self.layout.drag().is_dragging();
        let (glyph, style) = if self.layout.sidebar_collapsed() {
            ("│", Style::default().fg(palette.border_idle))
        } else if active {
            ("┃", Style::default().fg(palette.border_focused))
        } else {
            ("┊", Style::default().fg(palette.text_secondary))
        };
        let lines: Vec<Line<'static>> = (0..area.height)
            .map(|_| Line::from(Span::styled(glyph, style)))
            .collect();
        frame.render_widget(
            Paragraph::new(lines).style(Style::default().bg(palette.bg)),
            area,
        );
        self.areas.divider = area;
    }

    fn draw_overlay(&mut self, frame: &mut Frame<'_>, body: Rect) {
        let palette = self.palette();
        frame.render_widget(
            Block::default().style(
                Style::default()
                    .bg(palette.bg)
                    .add_modifier(Modifier::DIM),
            ),
            body,
        );
        let width = self
            .layout
            .expanded_width()
            .max(self.layout.limits().min_width)
            .min(body.width);
        let panel = Rect::new(body.x, body.y, width, body.height);
        frame.render_widget(Clear, panel);
        self.draw_sidebar(frame, panel);
    }

    fn draw_content(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let block = self
            .pane_block(Pane::Content, self.payload.title())
            .padding(Padding::uniform(1));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if matches!(self.payload, ContentPayload::Browse) {
            self.draw_browse(frame, inner);
            return;
        }

        let copied = self.feedback.active(Instant::now());
        let text = self.rendered.decorated(copied, self.palette());
        let base_style = text.style;
        let (lines, rows) = wrap_text(&text, usize::from(inner.width));
        self.content_lines = lines;
        self.content_rows = rows;
        let max_scroll = self
            .content_lines
            .len()
            .saturating_sub(usize::from(inner.height));
        self.content_scroll = self.content_scroll.min(max_scroll as u16);
        self.areas.content = inner;

        let paragraph = Paragraph::new(Text::from(self.content_lines.clone()))
            .style(base_style)
            .scroll((self.content_scroll, 0));
        frame.render_widget(paragraph, inner);
    }

    fn draw_browse(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let palette = self.palette();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(BROWSE_INTRO_HEIGHT),
                Constraint::Length(2),
                Constraint::Min(0),
            ])
            .split(area);

        frame.render_widget(
            Paragraph::new(self.rendered.text.clone()).wrap(Wrap { trim: true }),
            chunks[0],
        );

        let catalog = Arc::clone(&self.catalog);
        let entries = browse::filter(&catalog, &self.browse.filter);

        let cursor = if self.browse.editing { "▏" } else { "" };
        let category = self.browse.filter.category.as_deref().unwrap_or("all");
        let filter_line = Line::from(vec![
            Span::styled("Filter: ", Style::default().fg(palette.text_secondary)),
            Span::styled(
                format!("{}{cursor}", self.browse.filter.query),
                Style::default().fg(palette.text_primary),
            ),
            Span::styled("   Category: ", Style::default().fg(palette.text_secondary)),
            Span::styled(category.to_string(), Style::default().fg(palette.accent)),
            Span::styled(
                format!("   {} of {}", entries.len(), catalog.stats().subtopics),
                Style::default().fg(palette.text_secondary),
            ),
        ]);
        frame.render_widget(Paragraph::new(filter_line), chunks[1]);

        let list_area = chunks[2];
        self.areas.browse_list = list_area;
        if entries.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "No subtopics match.",
                    Style::default()
                        .fg(palette.text_secondary)
                        .add_modifier(Modifier::ITALIC),
                )),
                list_area,
            );
            return;
        }

        let items: Vec<ListItem<'static>> = entries
            .iter()
            .map(|entry| {
                let mut spans = vec![
                    Span::styled(
                        entry.topic.title.clone(),
                        Style::default().fg(palette.text_secondary),
                    ),
                    Span::styled(" › ", Style::default().fg(palette.border_idle)),
                    Span::styled(
                        entry.subtopic.title.clone(),
                        Style::default().fg(palette.text_primary),
                    ),
                ];
                if let Some(category) = &entry.subtopic.category {
                    spans.push(Span::styled(
                        format!("  [{category}]"),
                        Style::default().fg(palette.subheading),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let selected = self
            .browse
            .list_state
            .selected()
            .unwrap_or(0)
            .min(entries.len() - 1);
        self.browse.list_state.select(Some(selected));
        let list = List::new(items).highlight_style(
            Style::default()
                .bg(palette.panel_selected_bg)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_stateful_widget(list, list_area, &mut self.browse.list_state);
    }

    fn footer_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if !self.status_message.is_empty() {
            parts.push(self.status_message.clone());
        }

        if self.browse.editing {
            parts.push("Typing filters topics · Enter/Esc done".to_string());
            return parts.join(" · ");
        }

        if self.layout.mobile_menu_open() {
            parts.push("Menu: j/k move, Enter open, Space expand · Esc/m close".to_string());
        } else {
            match self.focused_pane {
                Pane::Sidebar => {
                    parts.push("Sidebar: j/k move, Enter open, Space expand".to_string());
                    parts.push("s collapse · </> resize".to_string());
                }
                Pane::Divider => parts.push("Divider: ←/→ or drag to resize".to_string()),
                Pane::Content => {
                    if matches!(self.payload, ContentPayload::Browse) {
                        parts.push("Browse: / filter, c category, Enter open".to_string());
                    } else {
                        parts.push("Content: j/k scroll".to_string());
                        if !self.rendered.code_blocks.is_empty() {
                            parts.push(format!(
                                "1-{} copy code",
                                self.rendered.code_blocks.len().min(9)
                            ));
                        }
                    }
                }
            }
            if self.layout.is_mobile() {
                parts.push("m menu".to_string());
            }
        }

        parts.push("Backspace/] history".to_string());
        parts.push("t theme".to_string());
        parts.push("q quit".to_string());
        parts.join(" · ")
    }
}

/// Initials of the first words, for the collapsed sidebar.
fn abbreviate(title: &str) -> String {
    let initials: String = title
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(3)
        .collect();
    if initials.is_empty() {
        "?".to_string()
    } else {
        initials
    }
}

/// Word-wraps styled lines to `width` columns. The second vector maps each
/// output row back to the index of the line it came from.
fn wrap_text(text: &Text<'static>, width: usize) -> (Vec<Line<'static>>, Vec<usize>) {
    let mut lines = Vec::with_capacity(text.lines.len());
    let mut rows = Vec::with_capacity(text.lines.len());
    for (idx, line) in text.lines.iter().enumerate() {
        for wrapped in wrap_line(line, width) {
            lines.push(wrapped);
            rows.push(idx);
        }
    }
    (lines, rows)
}

fn wrap_line(line: &Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 || line.width() <= width {
        return vec![line.clone()];
    }

    let words: Vec<StyledWord<'_>> = line
        .spans
        .iter()
        .flat_map(|span| {
            let found = WordSeparator::AsciiSpace.find_words(span.content.as_ref());
            break_words(found, width)
                .into_iter()
                .map(move |word| StyledWord {
                    word,
                    style: span.style,
                })
        })
        .collect();

    wrap_first_fit(&words, &[width as f64])
        .into_iter()
        .map(|row| {
            let last = row.len().saturating_sub(1);
            let mut spans = Vec::with_capacity(row.len());
            for (idx, fragment) in row.iter().enumerate() {
                let mut content = fragment.word.word.to_string();
                if idx < last {
                    content.push_str(fragment.word.whitespace);
                }
                if !content.is_empty() {
                    spans.push(Span::styled(content, fragment.style));
                }
            }
            let mut wrapped = Line::from(spans);
            wrapped.style = line.style;
            wrapped.alignment = line.alignment;
            wrapped
        })
        .collect()
}

/// A textwrap word that remembers the style of the span it came from.
#[derive(Debug)]
struct StyledWord<'a> {
    word: Word<'a>,
    style: Style,
}

impl Fragment for StyledWord<'_> {
    fn width(&self) -> f64 {
        Fragment::width(&self.word)
    }

    fn whitespace_width(&self) -> f64 {
        Fragment::whitespace_width(&self.word)
    }

    fn penalty_width(&self) -> f64 {
        Fragment::penalty_width(&self.word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::clipboard::ClipboardBackend;
    use crate::layout::{SidebarLimits, KEY_SIDEBAR_WIDTH, KEY_THEME};
    use crate::storage::{MemoryPreferences, PreferenceStore};
    use parking_lot::Mutex;
    use ratatui::backend::TestBackend;

    #[derive(Default)]
    struct Recording {
        copied: Mutex<Vec<String>>,
    }

    impl ClipboardBackend for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn copy(&self, text: &str) -> anyhow::Result<()> {
            self.copied.lock().push(text.to_string());
            Ok(())
        }
    }

    struct Harness {
        model: Model,
        prefs: Arc<MemoryPreferences>,
        clipboard: Arc<Recording>,
    }

    fn code_catalog() -> Catalog {
        Catalog::from_yaml(
            r#"
topics:
  - id: algo
    title: Algorithms
    subtopics:
      - id: sorting
        title: Sorting
        category: Fundamentals
        content: |
          <p>Quick sort partitions around a pivot.</p>
          <pre><code class="language-python">def sort(xs):
              return sorted(xs)</code></pre>
  - id: db
    title: Databases
    subtopics:
      - id: acid
        title: ACID
        category: Storage
        content: "<p>Atomicity, consistency, isolation, durability.</p>"
"#,
        )
        .unwrap()
    }

    fn harness_with(catalog: Catalog, width: u16, initial: Route) -> Harness {
        let catalog = Arc::new(catalog);
        let prefs = Arc::new(MemoryPreferences::new());
        let clipboard = Arc::new(Recording::default());
        let layout = LayoutState::new(
            prefs.clone() as Arc<dyn PreferenceStore>,
            SidebarLimits::default(),
            width,
            Some(false),
        );
        let model = Model::new(Options {
            catalog: Arc::clone(&catalog),
            router: Router::new(catalog, initial),
            layout,
            copier: Copier::with_backends(clipboard.clone(), None),
            feedback_timeout: Duration::from_secs(2),
            tick_rate: Duration::from_millis(50),
            status_message: String::new(),
        });
        Harness {
            model,
            prefs,
            clipboard,
        }
    }

    fn harness(width: u16) -> Harness {
        harness_with(catalog::sample(), width, Route::Home)
    }

    fn press(model: &mut Model, code: KeyCode) {
        model
            .handle_key(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
        model.process_background();
    }

    fn click(model: &mut Model, column: u16, row: u16) {
        model
            .handle_mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column,
                row,
                modifiers: KeyModifiers::NONE,
            })
            .unwrap();
        model.process_background();
    }

    fn mouse(model: &mut Model, kind: MouseEventKind, column: u16) {
        model
            .handle_mouse(MouseEvent {
                kind,
                column,
                row: 5,
                modifiers: KeyModifiers::NONE,
            })
            .unwrap();
    }

    fn render(model: &mut Model, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| model.draw(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer.get(x, y).symbol().to_string())
                    .collect::<String>()
            })
            .collect()
    }

    fn screen(model: &mut Model, width: u16, height: u16) -> String {
        render(model, width, height).join("\n")
    }

    fn wait_for_copy(model: &mut Model) {
        for _ in 0..200 {
            model.process_background();
            if model.feedback.active(Instant::now()).is_some() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("copy outcome never arrived");
    }

    #[test]
    fn home_renders_header_sidebar_and_welcome() {
        let mut h = harness(120);
        let screen = screen(&mut h.model, 120, 30);
        assert!(screen.contains("InterviewOS"));
        assert!(screen.contains("Home"));
        assert!(screen.contains("Databases"));
        assert!(screen.contains("Welcome to InterviewOS"));
        assert!(screen.contains("light"));
        assert!(!screen.contains('☰'));
    }

    #[test]
    fn opening_a_topic_shows_its_first_subtopic() {
        let mut h = harness(120);
        press(&mut h.model, KeyCode::Enter);
        assert_eq!(h.model.router.current(), &Route::topic("db"));
        let screen = screen(&mut h.model, 120, 30);
        assert!(screen.contains("ACID body"));
        assert!(screen.contains("BASE"));
    }

    #[test]
    fn sidebar_navigation_opens_subtopic_within_topic() {
        let mut h = harness(120);
        press(&mut h.model, KeyCode::Char(' '));
        press(&mut h.model, KeyCode::Char('j'));
        press(&mut h.model, KeyCode::Char('j'));
        press(&mut h.model, KeyCode::Enter);
        assert_eq!(h.model.router.current(), &Route::subtopic("db", "base"));
        assert_eq!(h.model.payload.title(), "BASE");
    }

    #[test]
    fn bad_route_renders_not_found_in_place() {
        let mut h = harness_with(catalog::sample(), 120, Route::subtopic("db", "nope"));
        let screen = screen(&mut h.model, 120, 30);
        assert!(screen.contains("Subtopic not found"));
        assert!(screen.contains("Databases"));
    }

    #[test]
    fn history_keys_walk_back_and_forward() {
        let mut h = harness(120);
        press(&mut h.model, KeyCode::Char('a'));
        press(&mut h.model, KeyCode::Char('b'));
        press(&mut h.model, KeyCode::Backspace);
        assert_eq!(h.model.router.current(), &Route::About);
        press(&mut h.model, KeyCode::Char(']'));
        assert_eq!(h.model.router.current(), &Route::Topics);
    }

    #[test]
    fn theme_toggle_persists_and_updates_header() {
        let mut h = harness(120);
        press(&mut h.model, KeyCode::Char('t'));
        assert_eq!(h.model.layout.theme(), Theme::Dark);
        assert_eq!(h.prefs.get(KEY_THEME).as_deref(), Some("dark"));
        assert!(screen(&mut h.model, 120, 30).contains("dark"));
    }

    #[test]
    fn collapse_and_resize_keys_drive_layout() {
        let mut h = harness(120);
        press(&mut h.model, KeyCode::Char('>'));
        press(&mut h.model, KeyCode::Char('>'));
        assert_eq!(h.model.layout.sidebar_width(), 30);
        assert_eq!(h.prefs.get(KEY_SIDEBAR_WIDTH).as_deref(), Some("30"));

        press(&mut h.model, KeyCode::Char('s'));
        assert!(h.model.layout.sidebar_collapsed());
        press(&mut h.model, KeyCode::Char('>'));
        assert_eq!(h.model.layout.sidebar_width(), 6);

        press(&mut h.model, KeyCode::Char('s'));
        assert_eq!(h.model.layout.sidebar_width(), 30);
    }

    #[test]
    fn collapsed_sidebar_shows_initials() {
        let mut h = harness(120);
        press(&mut h.model, KeyCode::Char('s'));
        let rows = render(&mut h.model, 120, 30);
        assert!(rows.iter().any(|row| row.starts_with("│D")));
        assert!(!rows.join("\n").contains("Databases"));
    }

    #[test]
    fn dragging_the_divider_resizes_with_clamping() {
        let mut h = harness(120);
        render(&mut h.model, 120, 30);
        let divider = h.model.areas.divider.x;
        assert_eq!(divider, 28);

        click(&mut h.model, divider, 5);
        assert!(h.model.layout.drag().is_dragging());
        mouse(&mut h.model, MouseEventKind::Drag(MouseButton::Left), divider + 5);
        assert_eq!(h.model.layout.sidebar_width(), 33);
        mouse(&mut h.model, MouseEventKind::Drag(MouseButton::Left), divider + 50);
        assert_eq!(h.model.layout.sidebar_width(), 40);
        mouse(&mut h.model, MouseEventKind::Up(MouseButton::Left), divider + 50);
        assert!(!h.model.layout.drag().is_dragging());

        mouse(&mut h.model, MouseEventKind::Drag(MouseButton::Left), 0);
        assert_eq!(h.model.layout.sidebar_width(), 40);
    }

    #[test]
    fn narrow_terminal_uses_overlay_menu() {
        let mut h = harness(70);
        let rows = render(&mut h.model, 70, 24);
        assert!(rows[0].contains('☰'));
        assert!(!rows.join("\n").contains("Networking"));

        press(&mut h.model, KeyCode::Char('m'));
        assert!(h.model.layout.mobile_menu_open());
        assert!(h.model.layout.background_scroll_locked());
        assert!(screen(&mut h.model, 70, 24).contains("Networking"));

        // Clicking the backdrop right of the panel dismisses it.
        click(&mut h.model, 60, 10);
        assert!(!h.model.layout.mobile_menu_open());
    }

    #[test]
    fn choosing_a_subtopic_closes_the_overlay() {
        let mut h = harness(70);
        press(&mut h.model, KeyCode::Char('m'));
        press(&mut h.model, KeyCode::Char(' '));
        press(&mut h.model, KeyCode::Char('j'));
        press(&mut h.model, KeyCode::Enter);
        assert_eq!(h.model.router.current(), &Route::subtopic("db", "acid"));
        assert!(!h.model.layout.mobile_menu_open());
    }

    #[test]
    fn widening_the_terminal_closes_the_overlay() {
        let mut h = harness(70);
        press(&mut h.model, KeyCode::Char('m'));
        h.model.handle_resize(120);
        assert!(!h.model.layout.is_mobile());
        assert!(!h.model.layout.mobile_menu_open());
    }

    #[test]
    fn digit_copies_code_block_and_shows_feedback() {
        let mut h = harness_with(code_catalog(), 120, Route::subtopic("algo", "sorting"));
        assert!(screen(&mut h.model, 120, 30).contains("[copy 1]"));

        h.model.focused_pane = Pane::Content;
        press(&mut h.model, KeyCode::Char('1'));
        wait_for_copy(&mut h.model);
        let copied = h.clipboard.copied.lock().clone();
        assert_eq!(copied.len(), 1);
        assert!(copied[0].starts_with("def sort(xs):"));
        assert!(screen(&mut h.model, 120, 30).contains("copied ✓"));
    }

    #[test]
    fn clicking_the_copy_label_copies() {
        let mut h = harness_with(code_catalog(), 120, Route::subtopic("algo", "sorting"));
        let rows = render(&mut h.model, 120, 30);
        let row = rows
            .iter()
            .position(|row| row.contains("[copy 1]"))
            .expect("label row") as u16;
        let column = h.model.areas.content.x + 2;
        click(&mut h.model, column, row);
        wait_for_copy(&mut h.model);
        assert_eq!(h.clipboard.copied.lock().len(), 1);
    }

    #[test]
    fn missing_code_block_is_reported() {
        let mut h = harness(120);
        h.model.focused_pane = Pane::Content;
        press(&mut h.model, KeyCode::Char('4'));
        assert!(h.model.status_message.contains("No code block 4"));
        assert!(h.clipboard.copied.lock().is_empty());
    }

    struct Unavailable;

    impl ClipboardBackend for Unavailable {
        fn name(&self) -> &'static str {
            "unavailable"
        }

        fn copy(&self, _text: &str) -> anyhow::Result<()> {
            anyhow::bail!("no display")
        }
    }

    #[test]
    fn terminal_fallback_is_written_between_frames() {
        let mut h = harness_with(code_catalog(), 120, Route::subtopic("algo", "sorting"));
        h.model.copier = Copier::with_terminal_fallback(Arc::new(Unavailable));
        h.model.focused_pane = Pane::Content;
        press(&mut h.model, KeyCode::Char('1'));
        wait_for_copy(&mut h.model);
        assert!(h.model.status_message.contains("through the terminal"));

        let mut out = Vec::new();
        h.model.write_terminal_requests(&mut out).unwrap();
        let code = h.model.rendered.code_blocks[0].code.clone();
        assert_eq!(String::from_utf8(out).unwrap(), crate::clipboard::osc52_sequence(&code));

        let mut again = Vec::new();
        h.model.write_terminal_requests(&mut again).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn digits_only_copy_from_the_content_pane() {
        let mut h = harness_with(code_catalog(), 120, Route::subtopic("algo", "sorting"));
        h.model.focused_pane = Pane::Sidebar;
        press(&mut h.model, KeyCode::Char('1'));
        std::thread::sleep(Duration::from_millis(50));
        h.model.process_background();
        assert!(h.clipboard.copied.lock().is_empty());
        assert!(h.model.status_message.contains("Focus the content pane"));

        h.model.focused_pane = Pane::Content;
        press(&mut h.model, KeyCode::Char('1'));
        wait_for_copy(&mut h.model);
        assert_eq!(h.clipboard.copied.lock().len(), 1);
    }

    fn long_catalog() -> Catalog {
        let body: String = (1..=60).map(|n| format!("<p>Paragraph {n}.</p>")).collect();
        Catalog::from_yaml(&format!(
            "topics:\n  - id: long\n    title: Long Read\n    subtopics:\n      - id: notes\n        title: Notes\n        content: \"{body}\"\n"
        ))
        .unwrap()
    }

    #[test]
    fn open_overlay_locks_content_scrolling() {
        let mut h = harness_with(long_catalog(), 70, Route::subtopic("long", "notes"));
        render(&mut h.model, 70, 24);
        press(&mut h.model, KeyCode::Char('m'));
        assert!(h.model.layout.mobile_menu_open());
        render(&mut h.model, 70, 24);

        press(&mut h.model, KeyCode::Char('j'));
        press(&mut h.model, KeyCode::PageDown);
        mouse(&mut h.model, MouseEventKind::ScrollDown, 65);
        assert_eq!(h.model.content_scroll, 0);

        press(&mut h.model, KeyCode::Esc);
        assert!(!h.model.layout.mobile_menu_open());
        render(&mut h.model, 70, 24);
        press(&mut h.model, KeyCode::PageDown);
        assert!(h.model.content_scroll > 0);
    }

    #[test]
    fn focused_divider_resizes_with_arrow_keys() {
        let mut h = harness(120);
        render(&mut h.model, 120, 30);
        for _ in 0..3 {
            if h.model.focused_pane == Pane::Divider {
                break;
            }
            press(&mut h.model, KeyCode::Tab);
        }
        assert_eq!(h.model.focused_pane, Pane::Divider);
        let step = h.model.layout.limits().resize_step;
        let start = h.model.layout.sidebar_width();

        press(&mut h.model, KeyCode::Right);
        assert_eq!(h.model.layout.sidebar_width(), start + step);
        press(&mut h.model, KeyCode::Left);
        press(&mut h.model, KeyCode::Left);
        assert_eq!(h.model.layout.sidebar_width(), start - step);

        for _ in 0..50 {
            press(&mut h.model, KeyCode::Right);
        }
        assert_eq!(h.model.layout.sidebar_width(), h.model.layout.limits().max_width);
        for _ in 0..50 {
            press(&mut h.model, KeyCode::Left);
        }
        assert_eq!(h.model.layout.sidebar_width(), h.model.layout.limits().min_width);

        h.model.focused_pane = Pane::Content;
        press(&mut h.model, KeyCode::Right);
        assert_eq!(h.model.layout.sidebar_width(), h.model.layout.limits().min_width);
    }

    #[test]
    fn browse_filters_and_opens_entries() {
        let mut h = harness_with(code_catalog(), 120, Route::Home);
        press(&mut h.model, KeyCode::Char('/'));
        for ch in "acid".chars() {
            press(&mut h.model, KeyCode::Char(ch));
        }
        press(&mut h.model, KeyCode::Enter);
        assert!(!h.model.browse.editing);
        let screen = screen(&mut h.model, 120, 30);
        assert!(screen.contains("Databases › ACID"));
        assert!(!screen.contains("Algorithms › Sorting"));

        press(&mut h.model, KeyCode::Enter);
        assert_eq!(h.model.router.current(), &Route::subtopic("db", "acid"));
    }

    #[test]
    fn browse_category_cycle() {
        let mut h = harness_with(code_catalog(), 120, Route::Topics);
        h.model.focused_pane = Pane::Content;
        press(&mut h.model, KeyCode::Char('c'));
        assert_eq!(
            h.model.browse.filter.category.as_deref(),
            Some("Fundamentals")
        );
        press(&mut h.model, KeyCode::Char('c'));
        press(&mut h.model, KeyCode::Char('c'));
        assert_eq!(h.model.browse.filter.category, None);
    }

    #[test]
    fn header_links_navigate() {
        let mut h = harness(120);
        render(&mut h.model, 120, 30);
        let about = h.model.areas.nav_links[2];
        click(&mut h.model, about.x, about.y);
        assert_eq!(h.model.router.current(), &Route::About);
    }

    #[test]
    fn wrap_keeps_styles_and_maps_rows() {
        let style = Style::default().add_modifier(Modifier::BOLD);
        let text = Text::from(vec![
            Line::from(vec![Span::raw("alpha beta "), Span::styled("gamma", style)]),
            Line::from("short"),
        ]);
        let (lines, rows) = wrap_text(&text, 11);
        let plain: Vec<String> = lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(plain, ["alpha beta", "gamma", "short"]);
        assert_eq!(rows, [0, 0, 1]);
        assert_eq!(lines[1].spans[0].style, style);
    }

    #[test]
    fn wrap_hard_splits_long_words() {
        let (lines, _) = wrap_text(&Text::from("abcdefghij"), 4);
        let plain: Vec<String> = lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(plain, ["abcd", "efgh", "ij"]);
    }

    #[test]
    fn abbreviations_use_initials() {
        assert_eq!(abbreviate("Data Structures"), "DS");
        assert_eq!(abbreviate("system design interview prep"), "SDI");
        assert_eq!(abbreviate(""), "?");
    }
}
