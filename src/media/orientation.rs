//! Aspect-ratio classification used to partition storage paths

use std::fmt;

/// Coarse aspect-ratio class of a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Roughly 16:9
    Landscape,
    /// Roughly 9:16
    Portrait,
    Other,
}

impl Orientation {
    /// Classify `width / height` against tolerance bands around 16:9 and 9:16.
    ///
    /// A zero height has no ratio and is classified as [`Orientation::Other`].
    pub fn classify(width: u32, height: u32) -> Self {
        if height == 0 {
            tracing::warn!(width, height, "Zero height in stream geometry");
            return Orientation::Other;
        }

        let ratio = f64::from(width) / f64::from(height);
        if ratio > 1.7 && ratio < 1.85 {
            Orientation::Landscape
        } else if ratio > 0.5 && ratio < 0.6 {
            Orientation::Portrait
        } else {
            Orientation::Other
        }
    }

    /// Storage path prefix
    pub fn prefix(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
            Orientation::Other => "other",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}
