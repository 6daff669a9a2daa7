//! Theme configuration and colors.
//!
//! Palettes come from the `ratatui-themes` crate; [`ThemeColors`] maps them
//! onto the few roles lurk needs to render posts and the watch-list.

use ratatui::style::{Color, Modifier, Style};
use ratatui_themes::{ThemeName, ThemePalette};
use serde::{Deserialize, Serialize};

use crate::content::ContentStyles;

/// Theme wrapper around `ThemeName` from ratatui-themes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Theme(pub ThemeName);

impl Theme {
    /// Get all available theme names.
    #[must_use]
    pub const fn all() -> &'static [ThemeName] {
        ThemeName::all()
    }

    /// Get the display name for the theme.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.0.display_name()
    }

    /// Get the color palette for this theme
    #[must_use]
    pub fn colors(&self) -> ThemeColors {
        ThemeColors::from_palette(self.0.palette())
    }

    /// Get the kebab-case slug for config files
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        self.0.slug()
    }
}

impl From<ThemeName> for Theme {
    fn from(name: ThemeName) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Colors by role
#[derive(Debug, Clone)]
pub struct ThemeColors {
    /// Primary foreground/text color
    pub fg: Color,
    /// Greentext quotes
    pub success: Color,
    /// Hyperlinks
    pub info: Color,
}

impl ThemeColors {
    /// Create `ThemeColors` from a `ThemePalette`
    #[must_use]
    pub fn from_palette(p: ThemePalette) -> Self {
        Self {
            fg: p.fg,
            success: p.success,
            info: p.info,
        }
    }

    /// Default text style
    #[must_use]
    pub fn text(&self) -> Style {
        Style::default().fg(self.fg)
    }

    /// Styles for flattened post bodies
    #[must_use]
    pub fn content_styles(&self) -> ContentStyles {
        ContentStyles {
            text: self.text(),
            quote: Style::default().fg(self.success),
            link: Style::default()
                .fg(self.info)
                .add_modifier(Modifier::UNDERLINED),
        }
    }
}
