use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Wraps `text` in a 24-bit foreground escape sequence.
    pub fn paint(self, text: &str) -> String {
        format!("\x1b[38;2;{};{};{}m{text}\x1b[0m", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColors {
    pub gradient_from: Rgb,
    pub gradient_to: Rgb,
    pub button: Rgb,
    pub button_hover: Rgb,
    pub image_border: Rgb,
    pub icon_hover: Rgb,
    pub border_hover: Rgb,
    pub spinner: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeChoice {
    Indigo,
    Crimson,
    Emerald,
}

impl ThemeChoice {
    pub fn name(self) -> &'static str {
        match self {
            Self::Indigo => "Indigo",
            Self::Crimson => "Crimson",
            Self::Emerald => "Emerald",
        }
    }

    /// Exact-name lookup, case-insensitive.
    pub fn from_name(raw: &str) -> Option<Self> {
        THEMES
            .iter()
            .map(|theme| theme.choice)
            .find(|choice| choice.name().eq_ignore_ascii_case(raw.trim()))
    }

    pub fn theme(self) -> &'static Theme {
        THEMES
            .iter()
            .find(|theme| theme.choice == self)
            .unwrap_or(&THEMES[0])
    }
}

impl Default for ThemeChoice {
    fn default() -> Self {
        THEMES[0].choice
    }
}

impl fmt::Display for ThemeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub choice: ThemeChoice,
    pub colors: ThemeColors,
}

impl Theme {
    pub fn name(&self) -> &'static str {
        self.choice.name()
    }
}

/// Every selectable palette; the first entry is the default.
pub static THEMES: [Theme; 3] = [
    Theme {
        choice: ThemeChoice::Indigo,
        colors: ThemeColors {
            gradient_from: Rgb(0xc0, 0x84, 0xfc),
            gradient_to: Rgb(0x4f, 0x46, 0xe5),
            button: Rgb(0x4f, 0x46, 0xe5),
            button_hover: Rgb(0x43, 0x38, 0xca),
            image_border: Rgb(0x63, 0x66, 0xf1),
            icon_hover: Rgb(0x81, 0x8c, 0xf8),
            border_hover: Rgb(0x63, 0x66, 0xf1),
            spinner: Rgb(0x81, 0x8c, 0xf8),
        },
    },
    Theme {
        choice: ThemeChoice::Crimson,
        colors: ThemeColors {
            gradient_from: Rgb(0xf8, 0x71, 0x71),
            gradient_to: Rgb(0xe1, 0x1d, 0x48),
            button: Rgb(0xe1, 0x1d, 0x48),
            button_hover: Rgb(0xbe, 0x12, 0x3c),
            image_border: Rgb(0xf4, 0x3f, 0x5e),
            icon_hover: Rgb(0xfb, 0x71, 0x85),
            border_hover: Rgb(0xf4, 0x3f, 0x5e),
            spinner: Rgb(0xfb, 0x71, 0x85),
        },
    },
    Theme {
        choice: ThemeChoice::Emerald,
        colors: ThemeColors {
            gradient_from: Rgb(0x34, 0xd3, 0x99),
            gradient_to: Rgb(0x0d, 0x94, 0x88),
            button: Rgb(0x0d, 0x94, 0x88),
            button_hover: Rgb(0x0f, 0x76, 0x6e),
            image_border: Rgb(0x14, 0xb8, 0xa6),
            icon_hover: Rgb(0x2d, 0xd4, 0xbf),
            border_hover: Rgb(0x14, 0xb8, 0xa6),
            spinner: Rgb(0x2d, 0xd4, 0xbf),
        },
    },
];
