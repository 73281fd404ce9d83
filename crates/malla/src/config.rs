//! Configuration types for the curriculum editor.
//!
//! This module provides configuration structures that control how lanes
//! are sized and how courses are styled. All types implement
//! [`serde::Deserialize`] for flexible loading from external sources.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining layout and style settings.
//! - [`LayoutConfig`] - Metrics the pool layout works with: minimum lane
//!   extents, course box size, spacing, and padding.
//! - [`StyleConfig`] - Visual options such as the course color palette.
//!
//! # Example
//!
//! ```
//! # use malla::config::AppConfig;
//! // Use default configuration
//! let config = AppConfig::default();
//! assert!(config.style().palette().is_ok());
//! ```

use serde::Deserialize;

use malla_core::color::Palette;

/// Top-level configuration combining layout and style settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Layout configuration section.
    #[serde(default)]
    layout: LayoutConfig,

    /// Style configuration section.
    #[serde(default)]
    style: StyleConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] with the specified layout and style configurations.
    ///
    /// # Arguments
    ///
    /// * `layout` - Lane and course sizing metrics.
    /// * `style` - Visual styling options.
    pub fn new(layout: LayoutConfig, style: StyleConfig) -> Self {
        Self { layout, style }
    }

    /// Returns the layout configuration.
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Returns the style configuration.
    pub fn style(&self) -> &StyleConfig {
        &self.style
    }
}

/// Metrics the pool layout works with.
///
/// Every field has a default tuned for curriculum maps; a configuration
/// source only needs to name the fields it wants to override.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Minimum length of the shared pool, in document units.
    min_length: f32,

    /// Minimum breadth of an expanded lane.
    min_breadth: f32,

    /// Vertical gap between stacked courses in a lane.
    member_spacing: f32,

    /// Padding between a lane's border and its member column.
    lane_padding: f32,

    /// Width of a course box.
    course_width: f32,

    /// Height of a course box.
    course_height: f32,

    /// Font size the lane header label is measured at.
    header_font_size: f32,

    /// Extent reserved for the lane's expander button, including margins.
    /// Also the breadth a collapsed lane shrinks to.
    header_expander_extent: f32,

    /// Lane sizes are rounded up to multiples of this grid cell width.
    resize_cell_width: f32,

    /// Lane sizes are rounded up to multiples of this grid cell height.
    resize_cell_height: f32,
}

impl LayoutConfig {
    /// Returns the minimum pool length.
    pub fn min_length(&self) -> f32 {
        self.min_length
    }

    /// Returns the minimum breadth of an expanded lane.
    pub fn min_breadth(&self) -> f32 {
        self.min_breadth
    }

    /// Returns the vertical gap between stacked courses.
    pub fn member_spacing(&self) -> f32 {
        self.member_spacing
    }

    /// Returns the padding between a lane's border and its members.
    pub fn lane_padding(&self) -> f32 {
        self.lane_padding
    }

    /// Returns the width of a course box.
    pub fn course_width(&self) -> f32 {
        self.course_width
    }

    /// Returns the height of a course box.
    pub fn course_height(&self) -> f32 {
        self.course_height
    }

    /// Returns the font size lane header labels are measured at.
    pub fn header_font_size(&self) -> f32 {
        self.header_font_size
    }

    /// Returns the extent reserved for the lane expander button.
    pub fn header_expander_extent(&self) -> f32 {
        self.header_expander_extent
    }

    /// Returns the resize grid cell width.
    pub fn resize_cell_width(&self) -> f32 {
        self.resize_cell_width
    }

    /// Returns the resize grid cell height.
    pub fn resize_cell_height(&self) -> f32 {
        self.resize_cell_height
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_length: 200.0,
            min_breadth: 180.0,
            member_spacing: 20.0,
            lane_padding: 12.0,
            course_width: 140.0,
            course_height: 70.0,
            header_font_size: 15.0,
            header_expander_extent: 25.0,
            resize_cell_width: 1.0,
            resize_cell_height: 1.0,
        }
    }
}

/// Visual styling configuration.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StyleConfig {
    /// Course palette as CSS color strings, cycled through in order.
    /// When absent, the built-in curriculum area palette is used.
    #[serde(default)]
    palette: Option<Vec<String>>,
}

impl StyleConfig {
    /// Returns the parsed course [`Palette`].
    ///
    /// # Errors
    ///
    /// Returns an error if a configured color string cannot be parsed, or
    /// if the configured palette is empty.
    pub fn palette(&self) -> Result<Palette, String> {
        match &self.palette {
            Some(colors) => Palette::from_css(colors)
                .map_err(|err| format!("Invalid palette in config: {err}")),
            None => Ok(Palette::default()),
        }
    }
}
