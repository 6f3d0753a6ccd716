//! # Window Metric Model
//!
//! The ten non-client metrics handled by sysmetrics, the set that carries
//! their resolved values, and the legacy snapshot structure they are read from
//! and written back into.
//!
//! Values in a [MetricSet] are stored in native units (see [crate::units]).
//! A value of `0` means the metric is unresolved; no metric is ever
//! legitimately zero.

use std::fmt;

use crate::units::{pixels_to_twips, twips_to_pixels};

/// Size identifiers understood by the theme engine's system-size query.
///
/// Discriminants are the `SM_*` indices used by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SystemMetric {
    /// Width of a vertical scroll bar (`SM_CXVSCROLL`).
    CxVScroll = 2,
    /// Width of a caption button (`SM_CXSIZE`).
    CxSize = 30,
    /// Height of a caption button (`SM_CYSIZE`).
    CySize = 31,
    /// Sizing frame thickness (`SM_CXFRAME`).
    CxFrame = 32,
    /// Width of a small caption button (`SM_CXSMSIZE`).
    CxSmSize = 52,
    /// Height of a small caption button (`SM_CYSMSIZE`).
    CySmSize = 53,
    /// Width of a menu bar button (`SM_CXMENUSIZE`).
    CxMenuSize = 54,
    /// Height of a menu bar button (`SM_CYMENUSIZE`).
    CyMenuSize = 55,
    /// Padded border thickness (`SM_CXPADDEDBORDER`).
    CxPaddedBorder = 92,
}

impl SystemMetric {
    /// The raw platform index.
    pub const fn index(self) -> i32 {
        self as i32
    }
}

/// One of the ten window metrics, in persisted-key order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    /// Caption button height.
    CaptionHeight,
    /// Caption button width.
    CaptionWidth,
    /// Sizing border width.
    BorderWidth,
    /// Padded border width.
    PaddedBorderWidth,
    /// Menu bar button height.
    MenuHeight,
    /// Menu bar button width.
    MenuWidth,
    /// Vertical scroll bar width.
    ScrollWidth,
    /// Horizontal scroll bar height.
    ScrollHeight,
    /// Small caption button height.
    SmCaptionHeight,
    /// Small caption button width.
    SmCaptionWidth,
}

impl MetricKind {
    /// Number of metrics.
    pub const COUNT: usize = 10;

    /// All metrics in persisted-key order.
    pub const ALL: [MetricKind; Self::COUNT] = [
        MetricKind::CaptionHeight,
        MetricKind::CaptionWidth,
        MetricKind::BorderWidth,
        MetricKind::PaddedBorderWidth,
        MetricKind::MenuHeight,
        MetricKind::MenuWidth,
        MetricKind::ScrollWidth,
        MetricKind::ScrollHeight,
        MetricKind::SmCaptionHeight,
        MetricKind::SmCaptionWidth,
    ];

    /// Position of this metric inside a [MetricSet].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The configuration key this metric is persisted under.
    pub const fn key(self) -> &'static str {
        match self {
            MetricKind::CaptionHeight => "CaptionHeight",
            MetricKind::CaptionWidth => "CaptionWidth",
            MetricKind::BorderWidth => "BorderWidth",
            MetricKind::PaddedBorderWidth => "PaddedBorderWidth",
            MetricKind::MenuHeight => "MenuHeight",
            MetricKind::MenuWidth => "MenuWidth",
            MetricKind::ScrollWidth => "ScrollWidth",
            MetricKind::ScrollHeight => "ScrollHeight",
            MetricKind::SmCaptionHeight => "SmCaptionHeight",
            MetricKind::SmCaptionWidth => "SmCaptionWidth",
        }
    }

    /// The theme size query used to resolve this metric.
    ///
    /// Both scroll bar metrics query the vertical scroll bar width.
    pub const fn system_metric(self) -> SystemMetric {
        match self {
            MetricKind::CaptionHeight => SystemMetric::CySize,
            MetricKind::CaptionWidth => SystemMetric::CxSize,
            MetricKind::BorderWidth => SystemMetric::CxFrame,
            MetricKind::PaddedBorderWidth => SystemMetric::CxPaddedBorder,
            MetricKind::MenuHeight => SystemMetric::CyMenuSize,
            MetricKind::MenuWidth => SystemMetric::CxMenuSize,
            MetricKind::ScrollWidth => SystemMetric::CxVScroll,
            MetricKind::ScrollHeight => SystemMetric::CxVScroll,
            MetricKind::SmCaptionHeight => SystemMetric::CySmSize,
            MetricKind::SmCaptionWidth => SystemMetric::CxSmSize,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A complete set of resolved metrics in native units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricSet {
    values: [i32; MetricKind::COUNT],
}

impl MetricSet {
    /// An all-unresolved set.
    pub const fn new() -> Self {
        Self {
            values: [0; MetricKind::COUNT],
        }
    }

    /// Native value of a metric, `0` when unresolved.
    pub const fn get(&self, kind: MetricKind) -> i32 {
        self.values[kind.index()]
    }

    /// Value of a metric converted to pixels, `None` when unresolved.
    pub fn pixels(&self, kind: MetricKind) -> Option<i32> {
        match self.get(kind) {
            0 => None,
            twips => Some(twips_to_pixels(twips)),
        }
    }

    /// Whether a metric carries a value.
    pub const fn is_resolved(&self, kind: MetricKind) -> bool {
        self.get(kind) != 0
    }

    /// Whether no metric is resolved.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|&v| v == 0)
    }

    /// Number of resolved metrics.
    pub fn resolved_count(&self) -> usize {
        self.values.iter().filter(|&&v| v != 0).count()
    }

    /// Iterate over `(metric, native value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, i32)> + '_ {
        MetricKind::ALL.iter().map(move |&kind| (kind, self.get(kind)))
    }

    pub(crate) fn set(&mut self, kind: MetricKind, twips: i32) {
        self.values[kind.index()] = twips;
    }

    pub(crate) fn set_pixels_if_unresolved(&mut self, kind: MetricKind, pixels: i32) {
        if !self.is_resolved(kind) {
            self.set(kind, pixels_to_twips(pixels));
        }
    }
}

impl FromIterator<(MetricKind, i32)> for MetricSet {
    /// Build a set from `(metric, native value)` pairs; later pairs win.
    fn from_iter<I: IntoIterator<Item = (MetricKind, i32)>>(iter: I) -> Self {
        let mut set = MetricSet::new();
        for (kind, twips) in iter {
            set.set(kind, twips);
        }
        set
    }
}

impl fmt::Display for MetricSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (kind, value) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}={}", kind, value)?;
        }
        Ok(())
    }
}

/// The legacy non-client metrics block, in pixels.
///
/// Used both as the read-only fallback snapshot and as the live structure
/// consumed by the windowing subsystem. Font fields are not modelled; the
/// platform backend keeps them intact on write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct NonClientMetrics {
    pub border_width: i32,
    pub scroll_width: i32,
    pub scroll_height: i32,
    pub caption_width: i32,
    pub caption_height: i32,
    pub sm_caption_width: i32,
    pub sm_caption_height: i32,
    pub menu_width: i32,
    pub menu_height: i32,
    pub padded_border_width: i32,
}

impl NonClientMetrics {
    /// Pixel value of the field backing `kind`.
    pub const fn field(&self, kind: MetricKind) -> i32 {
        match kind {
            MetricKind::CaptionHeight => self.caption_height,
            MetricKind::CaptionWidth => self.caption_width,
            MetricKind::BorderWidth => self.border_width,
            MetricKind::PaddedBorderWidth => self.padded_border_width,
            MetricKind::MenuHeight => self.menu_height,
            MetricKind::MenuWidth => self.menu_width,
            MetricKind::ScrollWidth => self.scroll_width,
            MetricKind::ScrollHeight => self.scroll_height,
            MetricKind::SmCaptionHeight => self.sm_caption_height,
            MetricKind::SmCaptionWidth => self.sm_caption_width,
        }
    }

    /// Mutable access to the field backing `kind`.
    pub fn field_mut(&mut self, kind: MetricKind) -> &mut i32 {
        match kind {
            MetricKind::CaptionHeight => &mut self.caption_height,
            MetricKind::CaptionWidth => &mut self.caption_width,
            MetricKind::BorderWidth => &mut self.border_width,
            MetricKind::PaddedBorderWidth => &mut self.padded_border_width,
            MetricKind::MenuHeight => &mut self.menu_height,
            MetricKind::MenuWidth => &mut self.menu_width,
            MetricKind::ScrollWidth => &mut self.scroll_width,
            MetricKind::ScrollHeight => &mut self.scroll_height,
            MetricKind::SmCaptionHeight => &mut self.sm_caption_height,
            MetricKind::SmCaptionWidth => &mut self.sm_caption_width,
        }
    }

    /// Overwrite every field whose metric is resolved in `set`.
    ///
    /// Returns the number of fields changed.
    pub fn overlay(&mut self, set: &MetricSet) -> usize {
        let mut changed = 0;
        for kind in MetricKind::ALL {
            if let Some(pixels) = set.pixels(kind) {
                *self.field_mut(kind) = pixels;
                changed += 1;
            }
        }
        changed
    }
}

impl fmt::Display for NonClientMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CaptionHeight={}, BorderWidth={}, PaddedBorder={}, MenuHeight={}, ScrollWidth={}, \
             ScrollHeight={}, SmCaptionHeight={}, CaptionWidth={}, SmCaptionWidth={}, MenuWidth={}",
            self.caption_height,
            self.border_width,
            self.padded_border_width,
            self.menu_height,
            self.scroll_width,
            self.scroll_height,
            self.sm_caption_height,
            self.caption_width,
            self.sm_caption_width,
            self.menu_width,
        )
    }
}
