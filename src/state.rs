use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RecipeError {
    #[error("unknown filter `{0}` (expected one of: blur, vignette, sepia, bloom, hue)")]
    UnknownFilter(String),
    #[error("invalid intensity `{value}` for filter `{name}`")]
    InvalidIntensity { name: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
/// Named image filter with a single scalar intensity.
pub enum FilterKind {
    Blur,
    Vignette,
    Sepia,
    Bloom,
    Hue,
}

impl FilterKind {
    pub const ALL: [FilterKind; 5] = [
        FilterKind::Blur,
        FilterKind::Vignette,
        FilterKind::Sepia,
        FilterKind::Bloom,
        FilterKind::Hue,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Blur => "blur",
            FilterKind::Vignette => "vignette",
            FilterKind::Sepia => "sepia",
            FilterKind::Bloom => "bloom",
            FilterKind::Hue => "hue",
        }
    }

    /// Core Image style alias accepted wherever a filter name is.
    pub fn alias(self) -> &'static str {
        match self {
            FilterKind::Blur => "CIGaussianBlur",
            FilterKind::Vignette => "CIVignette",
            FilterKind::Sepia => "CISepiaTone",
            FilterKind::Bloom => "CIBloom",
            FilterKind::Hue => "CIHueAdjust",
        }
    }

    /// Accepted intensity range (the editor's slider bounds).
    pub fn range(self) -> RangeInclusive<f32> {
        match self {
            FilterKind::Blur => 0.0..=10.0,
            FilterKind::Vignette | FilterKind::Sepia | FilterKind::Bloom => 0.0..=1.0,
            FilterKind::Hue => 0.0..=360.0,
        }
    }

    pub fn clamp(self, intensity: f32) -> f32 {
        let range = self.range();
        if intensity.is_nan() {
            return *range.start();
        }
        intensity.clamp(*range.start(), *range.end())
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = RecipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim();
        FilterKind::ALL
            .into_iter()
            .find(|k| norm.eq_ignore_ascii_case(k.name()) || norm.eq_ignore_ascii_case(k.alias()))
            .ok_or_else(|| RecipeError::UnknownFilter(norm.to_string()))
    }
}

// Recipes go through the same name and alias matching as CLI flags.
impl TryFrom<String> for FilterKind {
    type Error = RecipeError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSetting {
    pub kind: FilterKind,
    #[serde(default)]
    pub intensity: f32,
}

impl FilterSetting {
    pub fn new(kind: FilterKind, intensity: f32) -> Self {
        Self {
            kind,
            intensity: kind.clamp(intensity),
        }
    }
}

/// Parses `name` or `name=value`.
impl FromStr for FilterSetting {
    type Err = RecipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = match s.split_once('=') {
            Some((name, value)) => (name, Some(value.trim())),
            None => (s, None),
        };
        let kind: FilterKind = name.parse()?;
        let intensity = match value {
            Some(raw) => raw
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| RecipeError::InvalidIntensity {
                    name: kind.name().to_string(),
                    value: raw.to_string(),
                })?,
            None => *kind.range().start(),
        };
        Ok(FilterSetting::new(kind, intensity))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FilterSetting>", into = "Vec<FilterSetting>")]
/// Ordered filter list, at most one entry per kind.
pub struct FilterSet {
    settings: Vec<FilterSetting>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes `kind` if present, otherwise appends it. Returns whether it is now enabled.
    pub fn toggle(&mut self, kind: FilterKind, intensity: f32) -> bool {
        if self.remove(kind) {
            return false;
        }
        self.settings.push(FilterSetting::new(kind, intensity));
        true
    }

    /// Updates the intensity in place, appending the filter if it is not enabled yet.
    pub fn set_intensity(&mut self, kind: FilterKind, intensity: f32) {
        let clamped = kind.clamp(intensity);
        match self.settings.iter_mut().find(|s| s.kind == kind) {
            Some(existing) => existing.intensity = clamped,
            None => self.settings.push(FilterSetting {
                kind,
                intensity: clamped,
            }),
        }
    }

    pub fn remove(&mut self, kind: FilterKind) -> bool {
        let before = self.settings.len();
        self.settings.retain(|s| s.kind != kind);
        self.settings.len() != before
    }

    pub fn contains(&self, kind: FilterKind) -> bool {
        self.settings.iter().any(|s| s.kind == kind)
    }

    pub fn intensity(&self, kind: FilterKind) -> Option<f32> {
        self.settings
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.intensity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterSetting> {
        self.settings.iter()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

impl From<Vec<FilterSetting>> for FilterSet {
    fn from(settings: Vec<FilterSetting>) -> Self {
        settings.into_iter().collect()
    }
}

impl From<FilterSet> for Vec<FilterSetting> {
    fn from(set: FilterSet) -> Self {
        set.settings
    }
}

impl FromIterator<FilterSetting> for FilterSet {
    fn from_iter<I: IntoIterator<Item = FilterSetting>>(iter: I) -> Self {
        let mut set = FilterSet::new();
        for setting in iter {
            set.set_intensity(setting.kind, setting.intensity);
        }
        set
    }
}

pub const OBLIQUENESS_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const STROKE_RANGE: RangeInclusive<f32> = 3.0..=5.0;
pub const KERN_RANGE: RangeInclusive<f32> = 0.0..=5.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Styling applied to a text watermark.
pub struct TextStyle {
    /// Horizontal shear of the glyphs, 0 = upright.
    pub obliqueness: f32,
    /// Outline width in pixels; `None` draws filled glyphs.
    pub stroke: Option<f32>,
    /// Extra spacing added after every character, in pixels.
    pub kern: f32,
}

impl TextStyle {
    pub fn clamped(&self) -> Self {
        Self {
            obliqueness: clamp_range(self.obliqueness, &OBLIQUENESS_RANGE),
            stroke: self.stroke.map(|s| clamp_range(s, &STROKE_RANGE)),
            kern: clamp_range(self.kern, &KERN_RANGE),
        }
    }
}

fn clamp_range(v: f32, range: &RangeInclusive<f32>) -> f32 {
    if v.is_nan() {
        return *range.start();
    }
    v.clamp(*range.start(), *range.end())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Edit settings that can be loaded from a TOML or JSON file.
pub struct Recipe {
    pub image_filters: FilterSet,
    pub watermark_filters: FilterSet,
    pub text_style: TextStyle,
}

impl Recipe {
    /// Loads a recipe; `.json` files are parsed as JSON, everything else as TOML.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recipe {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let recipe = if is_json {
            serde_json::from_str(&contents)
                .with_context(|| format!("invalid JSON recipe {}", path.display()))?
        } else {
            toml::from_str(&contents)
                .with_context(|| format!("invalid TOML recipe {}", path.display()))?
        };
        Ok(recipe)
    }
}
