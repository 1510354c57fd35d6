//! Theme system for human-mode output.

use console::Style;

/// Visual theme for koboswitch human-mode output.
///
/// Centralizes styles for consistent rendering.
pub struct SwitchTheme {
    // Status colors
    pub accent: Style,
    pub success: Style,
    pub error: Style,
    pub warning: Style,
    pub muted: Style,

    // Component styles
    pub header: Style,
    pub label: Style,
    pub value: Style,
    pub path: Style,
    pub column: Style,
}

impl Default for SwitchTheme {
    fn default() -> Self {
        Self {
            accent: Style::new().blue(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warning: Style::new().yellow().bold(),
            muted: Style::new().dim(),
            header: Style::new().blue().bold(),
            label: Style::new().dim(),
            value: Style::new().bold(),
            path: Style::new().cyan(),
            column: Style::new().yellow(),
        }
    }
}
