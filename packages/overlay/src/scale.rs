//! Threshold, palette, and label tables for one overlay mode.

use serde::Deserialize;

use crate::{OverlayConfigError, SeverityLevel};

/// Number of buckets every overlay table describes.
pub const BUCKETS: usize = 4;

#[derive(Debug, Deserialize)]
struct ScaleFile {
    title: String,
    #[serde(default)]
    thresholds: Option<Vec<u64>>,
    colors: Vec<String>,
    #[serde(default)]
    hover_colors: Option<Vec<String>>,
    labels: Vec<String>,
}

/// `{thresholds, colors, hover_colors, labels}` for one overlay mode.
///
/// All tables are indexed by bucket, lowest severity first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayScale {
    title: String,
    thresholds: Option<[u64; BUCKETS - 1]>,
    colors: [String; BUCKETS],
    hover_colors: Option<[String; BUCKETS]>,
    labels: [String; BUCKETS],
}

impl OverlayScale {
    /// Parses a scale from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayConfigError`] if the TOML is malformed, a table has
    /// the wrong length, or thresholds are not strictly ascending.
    pub fn from_toml(toml_str: &str) -> Result<Self, OverlayConfigError> {
        let file: ScaleFile = toml::from_str(toml_str)?;

        let thresholds = file
            .thresholds
            .map(|t| {
                if !t.windows(2).all(|w| w[0] < w[1]) {
                    return Err(OverlayConfigError::UnorderedThresholds { thresholds: t });
                }
                fixed::<u64, { BUCKETS - 1 }>("thresholds", t)
            })
            .transpose()?;

        Ok(Self {
            title: file.title,
            thresholds,
            colors: fixed("colors", file.colors)?,
            hover_colors: file
                .hover_colors
                .map(|c| fixed("hover_colors", c))
                .transpose()?,
            labels: fixed("labels", file.labels)?,
        })
    }

    /// Heading shown above the legend.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Ascending thresholds, if this scale classifies a numeric metric.
    #[must_use]
    pub const fn thresholds(&self) -> Option<[u64; BUCKETS - 1]> {
        self.thresholds
    }

    /// Palette, lowest severity first.
    #[must_use]
    pub const fn colors(&self) -> &[String; BUCKETS] {
        &self.colors
    }

    /// Labels, lowest severity first.
    #[must_use]
    pub const fn labels(&self) -> &[String; BUCKETS] {
        &self.labels
    }

    /// Buckets a value: below the first threshold is level 0, below the
    /// second is 1, below the third is 2, anything else is 3. A value equal
    /// to a threshold lands in the bucket above it.
    ///
    /// A scale without thresholds classifies everything as the lowest level.
    #[must_use]
    pub fn classify(&self, value: u64) -> SeverityLevel {
        let Some(thresholds) = self.thresholds else {
            return SeverityLevel::Low;
        };
        let bucket = thresholds.iter().take_while(|t| value >= **t).count();
        SeverityLevel::all()[bucket]
    }

    /// Fill color for a level.
    #[must_use]
    pub fn color(&self, level: SeverityLevel) -> &str {
        &self.colors[level.index()]
    }

    /// Hover color for a level, falling back to the regular fill.
    #[must_use]
    pub fn hover_color(&self, level: SeverityLevel) -> &str {
        self.hover_colors
            .as_ref()
            .map_or_else(|| self.color(level), |c| c[level.index()].as_str())
    }

    /// Label for a level.
    #[must_use]
    pub fn label(&self, level: SeverityLevel) -> &str {
        &self.labels[level.index()]
    }

    /// Iterates `(color, label)` legend entries, lowest first.
    pub fn legend(&self) -> impl Iterator<Item = (&str, &str)> {
        self.colors
            .iter()
            .zip(self.labels.iter())
            .map(|(c, l)| (c.as_str(), l.as_str()))
    }
}

fn fixed<T, const N: usize>(
    field: &'static str,
    values: Vec<T>,
) -> Result<[T; N], OverlayConfigError> {
    let found = values.len();
    values.try_into().map_err(|_| OverlayConfigError::WrongLength {
        field,
        expected: N,
        found,
    })
}
