//! The two colors of the command line theme.
//!
//! - ACCENT: Main Color
//! - MUTED: Secondary text like uids

use colored::Color;

pub(crate) const ACCENT: Color = Color::TrueColor {
    r: 87,
    g: 160,
    b: 255,
};

pub(crate) const MUTED: Color = Color::TrueColor {
    r: 140,
    g: 140,
    b: 140,
};
