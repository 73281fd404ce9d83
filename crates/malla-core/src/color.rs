//! Color handling and the curriculum area palette
//!
//! Nodes do not store colors directly; they store an index into a fixed
//! finite [`Palette`]. The default palette carries the five curriculum
//! areas, each with its legend name.

use std::str::FromStr;

use color::DynamicColor;

/// Wrapper around the `DynamicColor` type from the color crate
/// This provides convenience methods for working with colors in malla
#[derive(Clone, PartialEq, Debug)]
pub struct Color {
    color: DynamicColor,
}

impl Color {
    /// Create a new `Color` from a string
    /// This will parse CSS color strings such as "#ff0000", "rgb(255, 0, 0)", "red", etc.
    pub fn new(color_str: &str) -> Result<Self, String> {
        match DynamicColor::from_str(color_str) {
            Ok(color) => Ok(Color { color }),
            Err(err) => Err(format!("Invalid color '{color_str}': {err}")),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new("black").expect("builtin color is valid")
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.color)
    }
}

/// One palette slot: a color and, for the builtin palette, the name of the
/// curriculum area it stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    color: Color,
    area: Option<String>,
}

impl PaletteEntry {
    /// Creates a palette entry with an area legend name.
    pub fn named(color: Color, area: impl Into<String>) -> Self {
        Self {
            color,
            area: Some(area.into()),
        }
    }

    /// Creates a palette entry without a legend name.
    pub fn unnamed(color: Color) -> Self {
        Self { color, area: None }
    }

    /// Returns the entry's color.
    pub fn color(&self) -> &Color {
        &self.color
    }

    /// Returns the curriculum area name shown in the legend, if any.
    pub fn area(&self) -> Option<&str> {
        self.area.as_deref()
    }
}

/// The builtin palette: (css color, curriculum area) pairs.
const CURRICULUM_AREAS: [(&str, &str); 5] = [
    ("#ce6925", "Ciencias de la Computación"),
    ("#ffdf71", "Ciencias Matemáticas y Físicas"),
    ("#3aa6dd", "Tecnologías Aplicadas"),
    ("#7ab648", "Complementarias"),
    ("#b391b5", "Enfásis u orientación propio de la carrera"),
];

/// A fixed, finite, non-empty list of node colors.
///
/// Node records store an index into the palette. Stored indices may come
/// from hosts and can be out of range; [`Palette::entry`] clamps them to
/// the last slot instead of failing. The interactive color cycle wraps
/// past the last slot back to 0 ([`Palette::next_index`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Palette {
    /// Creates a palette from explicit entries.
    ///
    /// # Errors
    ///
    /// Returns an error when `entries` is empty; index clamping needs at
    /// least one slot.
    pub fn new(entries: Vec<PaletteEntry>) -> Result<Self, String> {
        if entries.is_empty() {
            return Err("Palette must have at least one entry".to_string());
        }
        Ok(Self { entries })
    }

    /// Creates the builtin five-area curriculum palette.
    pub fn curriculum_areas() -> Self {
        let entries = CURRICULUM_AREAS
            .iter()
            .map(|(css, area)| {
                PaletteEntry::named(Color::new(css).expect("builtin color is valid"), *area)
            })
            .collect();
        Self { entries }
    }

    /// Creates an unnamed palette from CSS color strings.
    ///
    /// # Errors
    ///
    /// Returns an error when the list is empty or any string fails to
    /// parse as a CSS color.
    pub fn from_css<S: AsRef<str>>(colors: &[S]) -> Result<Self, String> {
        let entries = colors
            .iter()
            .map(|css| Color::new(css.as_ref()).map(PaletteEntry::unnamed))
            .collect::<Result<Vec<_>, String>>()?;
        Self::new(entries)
    }

    /// Returns the number of palette slots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; palettes are non-empty by construction.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a stored color index to its palette entry.
    ///
    /// Out-of-range indices clamp to the last slot.
    pub fn entry(&self, index: usize) -> &PaletteEntry {
        let clamped = index.min(self.entries.len() - 1);
        &self.entries[clamped]
    }

    /// Resolves a stored color index to its color, clamping like
    /// [`Palette::entry`].
    pub fn color(&self, index: usize) -> &Color {
        self.entry(index).color()
    }

    /// Returns the index after `index` in the color cycle, wrapping past
    /// the last slot back to 0. Out-of-range starting points wrap too.
    pub fn next_index(&self, index: usize) -> usize {
        let next = index.saturating_add(1);
        if next > self.entries.len() - 1 { 0 } else { next }
    }

    /// Iterates over the palette slots in order.
    pub fn entries(&self) -> impl Iterator<Item = &PaletteEntry> {
        self.entries.iter()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::curriculum_areas()
    }
}
