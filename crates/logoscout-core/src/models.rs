use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which selector in the chain produced a candidate.
///
/// The serialized forms are the exact tags emitted in the output's `source`
/// column, matching the markup value each selector targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogoSource {
    #[serde(rename = "og:logo")]
    OgLogo,
    #[serde(rename = "og:image")]
    OgImage,
    #[serde(rename = "apple-touch-startup-image")]
    AppleTouchStartupImage,
    #[serde(rename = "shortcut icon")]
    ShortcutIcon,
    #[serde(rename = "apple-touch-icon")]
    AppleTouchIcon,
    #[serde(rename = "mask-icon")]
    MaskIcon,
    #[serde(rename = "icon")]
    Favicon,
    #[serde(rename = "fluid-icon")]
    FluidIcon,
}

impl LogoSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogoSource::OgLogo => "og:logo",
            LogoSource::OgImage => "og:image",
            LogoSource::AppleTouchStartupImage => "apple-touch-startup-image",
            LogoSource::ShortcutIcon => "shortcut icon",
            LogoSource::AppleTouchIcon => "apple-touch-icon",
            LogoSource::MaskIcon => "mask-icon",
            LogoSource::Favicon => "icon",
            LogoSource::FluidIcon => "fluid-icon",
        }
    }
}

impl fmt::Display for LogoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogoSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "og:logo" => Ok(LogoSource::OgLogo),
            "og:image" => Ok(LogoSource::OgImage),
            "apple-touch-startup-image" => Ok(LogoSource::AppleTouchStartupImage),
            "shortcut icon" => Ok(LogoSource::ShortcutIcon),
            "apple-touch-icon" => Ok(LogoSource::AppleTouchIcon),
            "mask-icon" => Ok(LogoSource::MaskIcon),
            "icon" => Ok(LogoSource::Favicon),
            "fluid-icon" => Ok(LogoSource::FluidIcon),
            _ => Err(format!("Unknown logo source: {}", s)),
        }
    }
}

/// One proposed logo reference: the selector tag that found it and the
/// normalized absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub source: LogoSource,
    pub url: String,
}

impl Candidate {
    pub fn new(source: LogoSource, url: impl Into<String>) -> Self {
        Self {
            source,
            url: url.into(),
        }
    }
}

/// Raw result of a single network fetch: the response body and status code.
///
/// A non-2xx status is not a failure here — the body is still cached and
/// handed to the Transform stage.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub body: String,
    pub status: u16,
}

/// DTO for appending a fetched page to the cache.
#[derive(Debug, Clone)]
pub struct NewCacheEntry {
    pub domain: String,
    pub body: String,
    pub status: u16,
    pub retrieved_at: DateTime<Utc>,
}
