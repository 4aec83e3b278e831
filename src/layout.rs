//! Layout state: theme, sidebar geometry, compact overlay and device class.
//!
//! Widths are terminal columns. Every change to a persisted field is written
//! through to the [`PreferenceStore`] immediately.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::storage::PreferenceStore;

pub const KEY_THEME: &str = "theme";
pub const KEY_SIDEBAR_COLLAPSED: &str = "sidebar-collapsed";
pub const KEY_SIDEBAR_WIDTH: &str = "sidebar-width";

pub const DEFAULT_COMPACT_BREAKPOINT: u16 = 80;
pub const DEFAULT_MIN_WIDTH: u16 = 20;
pub const DEFAULT_MAX_WIDTH: u16 = 40;
pub const DEFAULT_SIDEBAR_WIDTH: u16 = 28;
pub const DEFAULT_COLLAPSED_WIDTH: u16 = 6;
pub const DEFAULT_RESIZE_STEP: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Narrow terminal: the sidebar becomes an overlay.
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub fn from_width(width: u16, breakpoint: u16) -> Self {
        if width <= breakpoint {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebarLimits {
    pub min_width: u16,
    pub max_width: u16,
    pub default_width: u16,
    pub collapsed_width: u16,
    pub resize_step: u16,
    pub compact_breakpoint: u16,
}

impl Default for SidebarLimits {
    fn default() -> Self {
        Self {
            min_width: DEFAULT_MIN_WIDTH,
            max_width: DEFAULT_MAX_WIDTH,
            default_width: DEFAULT_SIDEBAR_WIDTH,
            collapsed_width: DEFAULT_COLLAPSED_WIDTH,
            resize_step: DEFAULT_RESIZE_STEP,
            compact_breakpoint: DEFAULT_COMPACT_BREAKPOINT,
        }
    }
}

impl SidebarLimits {
    /// Repairs inconsistent limits: swaps an inverted range, pulls the
    /// default into range and keeps the step at one column or more.
    pub fn normalized(mut self) -> Self {
        if self.min_width > self.max_width {
            std::mem::swap(&mut self.min_width, &mut self.max_width);
        }
        self.min_width = self.min_width.max(1);
        self.max_width = self.max_width.max(self.min_width);
        self.default_width = self.clamp(i32::from(self.default_width));
        self.resize_step = self.resize_step.max(1);
        self
    }

    pub fn clamp(&self, width: i32) -> u16 {
        width.clamp(i32::from(self.min_width), i32::from(self.max_width)) as u16
    }

    fn contains(&self, width: i64) -> bool {
        width >= i64::from(self.min_width) && width <= i64::from(self.max_width)
    }
}

/// Pointer capture for the sidebar divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragSession {
    #[default]
    Idle,
    Dragging { start_x: u16, start_width: u16 },
}

impl DragSession {
    pub fn is_dragging(&self) -> bool {
        matches!(self, DragSession::Dragging { .. })
    }

    /// Starts a capture at `x` with the sidebar currently `start_width` wide.
    pub fn pointer_down(&mut self, x: u16, start_width: u16) {
        *self = DragSession::Dragging {
            start_x: x,
            start_width,
        };
    }

    /// Requested (unclamped) width for a pointer now at `x`, or `None` when
    /// no capture is active.
    pub fn pointer_move(&self, x: u16) -> Option<i32> {
        match *self {
            DragSession::Idle => None,
            DragSession::Dragging {
                start_x,
                start_width,
            } => Some(i32::from(start_width) + (i32::from(x) - i32::from(start_x))),
        }
    }

    pub fn pointer_up(&mut self) {
        *self = DragSession::Idle;
    }
}

pub struct LayoutState {
    prefs: Arc<dyn PreferenceStore>,
    limits: SidebarLimits,
    theme: Theme,
    sidebar_collapsed: bool,
    sidebar_width: u16,
    expanded_width: u16,
    mobile_menu_open: bool,
    device_class: DeviceClass,
    drag: DragSession,
}

impl fmt::Debug for LayoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutState")
            .field("theme", &self.theme)
            .field("sidebar_collapsed", &self.sidebar_collapsed)
            .field("sidebar_width", &self.sidebar_width)
            .field("expanded_width", &self.expanded_width)
            .field("mobile_menu_open", &self.mobile_menu_open)
            .field("device_class", &self.device_class)
            .finish()
    }
}

impl LayoutState {
    /// Reads persisted preferences once and derives the initial state.
    ///
    /// `system_prefers_dark` is the platform dark-mode signal, consulted only
    /// when no theme is stored; `None` means the platform gave no answer.
    pub fn new(
        prefs: Arc<dyn PreferenceStore>,
        limits: SidebarLimits,
        viewport_width: u16,
        system_prefers_dark: Option<bool>,
    ) -> Self {
        let limits = limits.normalized();

        let theme = prefs
            .get(KEY_THEME)
            .and_then(|raw| raw.parse::<Theme>().ok())
            .unwrap_or(match system_prefers_dark {
                Some(true) => Theme::Dark,
                Some(false) | None => Theme::Light,
            });

        let sidebar_collapsed = prefs
            .get(KEY_SIDEBAR_COLLAPSED)
            .map(|raw| raw.trim() == "true")
            .unwrap_or(false);

        let expanded_width = prefs
            .get(KEY_SIDEBAR_WIDTH)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|width| limits.contains(*width))
            .map(|width| width as u16)
            .unwrap_or(limits.default_width);

        let sidebar_width = if sidebar_collapsed {
            limits.collapsed_width
        } else {
            expanded_width
        };

        let device_class = DeviceClass::from_width(viewport_width, limits.compact_breakpoint);
        tracing::debug!(
            %theme,
            sidebar_collapsed,
            sidebar_width,
            ?device_class,
            "layout initialised"
        );

        Self {
            prefs,
            limits,
            theme,
            sidebar_collapsed,
            sidebar_width,
            expanded_width,
            mobile_menu_open: false,
            device_class,
            drag: DragSession::Idle,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn limits(&self) -> &SidebarLimits {
        &self.limits
    }

    pub fn sidebar_collapsed(&self) -> bool {
        self.sidebar_collapsed
    }

    /// Width currently displayed, `collapsed_width` while collapsed.
    pub fn sidebar_width(&self) -> u16 {
        self.sidebar_width
    }

    /// Width restored on expand.
    pub fn expanded_width(&self) -> u16 {
        self.expanded_width
    }

    pub fn mobile_menu_open(&self) -> bool {
        self.mobile_menu_open
    }

    pub fn device_class(&self) -> DeviceClass {
        self.device_class
    }

    pub fn is_mobile(&self) -> bool {
        self.device_class == DeviceClass::Mobile
    }

    /// Content scrolling is suspended while the compact overlay is showing.
    pub fn background_scroll_locked(&self) -> bool {
        self.mobile_menu_open
    }

    pub fn drag(&self) -> DragSession {
        self.drag
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.prefs.set(KEY_THEME, self.theme.as_str());
        self.theme
    }

    pub fn toggle_sidebar_collapse(&mut self) -> bool {
        if self.sidebar_collapsed {
            self.sidebar_collapsed = false;
            self.sidebar_width = self.expanded_width;
            self.prefs
                .set(KEY_SIDEBAR_WIDTH, &self.expanded_width.to_string());
        } else {
            self.expanded_width = self.sidebar_width;
            self.sidebar_collapsed = true;
            self.sidebar_width = self.limits.collapsed_width;
            self.drag.pointer_up();
        }
        self.prefs.set(
            KEY_SIDEBAR_COLLAPSED,
            if self.sidebar_collapsed { "true" } else { "false" },
        );
        self.sidebar_collapsed
    }

    /// Clamps and applies a new sidebar width. Ignored while collapsed.
    /// Returns the width in effect afterwards.
    pub fn resize(&mut self, requested: i32) -> u16 {
        if self.sidebar_collapsed {
            return self.sidebar_width;
        }
        let width = self.limits.clamp(requested);
        self.sidebar_width = width;
        self.expanded_width = width;
        self.prefs.set(KEY_SIDEBAR_WIDTH, &width.to_string());
        width
    }

    /// Keyboard alternative to dragging: `steps` multiples of the resize step.
    pub fn nudge(&mut self, steps: i32) -> u16 {
        let delta = steps * i32::from(self.limits.resize_step);
        self.resize(i32::from(self.sidebar_width) + delta)
    }

    pub fn begin_drag(&mut self, x: u16) -> bool {
        if self.sidebar_collapsed || self.is_mobile() {
            return false;
        }
        self.drag.pointer_down(x, self.sidebar_width);
        true
    }

    pub fn drag_to(&mut self, x: u16) -> Option<u16> {
        let requested = self.drag.pointer_move(x)?;
        Some(self.resize(requested))
    }

    pub fn end_drag(&mut self) {
        self.drag.pointer_up();
    }

    pub fn toggle_mobile_menu(&mut self) -> bool {
        self.mobile_menu_open = !self.mobile_menu_open;
        self.mobile_menu_open
    }

    pub fn close_mobile_menu(&mut self) {
        self.mobile_menu_open = false;
    }

    /// Recomputes the device class for a new viewport width. Leaving the
    /// compact layout closes the overlay and any drag in progress ends.
    pub fn on_viewport_resize(&mut self, width: u16) -> DeviceClass {
        let next = DeviceClass::from_width(width, self.limits.compact_breakpoint);
        if next != self.device_class {
            tracing::debug!(?next, width, "device class changed");
            if next == DeviceClass::Desktop {
                self.mobile_menu_open = false;
            }
            self.drag.pointer_up();
        }
        self.device_class = next;
        next
    }
}

/// Reads the terminal's background hint from `COLORFGBG` ("fg;bg").
/// Background indices 0-6 and 8 are dark; 7 and 9-15 are light.
pub fn system_prefers_dark() -> Option<bool> {
    std::env::var("COLORFGBG")
        .ok()
        .and_then(|value| prefers_dark_from_colorfgbg(&value))
}

fn prefers_dark_from_colorfgbg(value: &str) -> Option<bool> {
    let bg = value.rsplit(';').next()?.trim().parse::<u8>().ok()?;
    match bg {
        0..=6 | 8 => Some(true),
        7 | 9..=15 => Some(false),
        _ => None,
    }
}
