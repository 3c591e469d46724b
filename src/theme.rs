//! Light and dark palettes.
//!
//! [`App`](crate::app::App) owns the current [`ThemeMode`] and hands the
//! resolved [`Theme`] to the drawing code, so nothing in `ui` reaches for
//! global state.

use std::fmt;

use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub fn palette(self) -> Theme {
        match self {
            ThemeMode::Light => Theme::LIGHT,
            ThemeMode::Dark => Theme::DARK,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeMode::Light => f.write_str("light"),
            ThemeMode::Dark => f.write_str("dark"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub primary: Color,
    pub card: Color,
    pub muted: Color,
    pub price: Color,
}

impl Theme {
    pub const LIGHT: Theme = Theme {
        background: Color::Rgb(0xf5, 0xf5, 0xf5),
        text: Color::Rgb(0x21, 0x21, 0x21),
        primary: Color::Rgb(0x19, 0x76, 0xd2),
        card: Color::Rgb(0xff, 0xff, 0xff),
        muted: Color::Rgb(0x75, 0x75, 0x75),
        price: Color::Rgb(0x2e, 0x7d, 0x32),
    };

    pub const DARK: Theme = Theme {
        background: Color::Rgb(0x12, 0x12, 0x12),
        text: Color::Rgb(0xe0, 0xe0, 0xe0),
        primary: Color::Rgb(0x90, 0xca, 0xf9),
        card: Color::Rgb(0x1e, 0x1e, 0x1e),
        muted: Color::Rgb(0x9e, 0x9e, 0x9e),
        price: Color::Rgb(0x81, 0xc7, 0x84),
    };

    pub fn base(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn price(&self) -> Style {
        Style::default().fg(self.price)
    }

    pub fn title(&self) -> Style {
        Style::default().fg(self.primary).add_modifier(Modifier::BOLD)
    }

    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.text)
            .bg(self.card)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    }
}
