//! Stylesheet applied to console output.

use owo_colors::Style;

/// Styles for the console vocabulary of a run. Starts unstyled; `colorize`
/// switches the palette on when the terminal supports it.
#[derive(Default, Clone)]
pub struct Styles {
    /// Step announcements (the `→` prefix).
    pub step: Style,
    /// Success lines (`✓`).
    pub success: Style,
    /// Warnings (`⚠`).
    pub warning: Style,
    /// Errors (`✗`).
    pub error: Style,
    /// Informational lines (`ℹ`).
    pub info: Style,
    /// Secondary text, e.g. key names in key-value listings.
    pub dim: Style,
    /// Section headers.
    pub header: Style,
}

impl Styles {
    /// Switch the palette on.
    pub fn colorize(&mut self) {
        self.step = Style::new().bold().cyan();
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.dim = Style::new().dimmed();
        self.header = Style::new().bold();
    }
}
