//! Compression parameter domains.
//!
//! Every parameter is a closed enum with a documented default. Values
//! outside a domain are rejected when a submission is parsed, never at
//! dequeue time, so the worker can treat every envelope it receives as
//! well formed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a submitted parameter value is outside its domain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid value {value:?} for parameter '{field}'")]
pub struct ParamError {
    pub field: &'static str,
    pub value: String,
}

impl ParamError {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Target container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Mov,
    Avi,
    Webm,
}

impl OutputFormat {
    pub const ALL: &'static [OutputFormat] = &[
        OutputFormat::Mp4,
        OutputFormat::Mov,
        OutputFormat::Avi,
        OutputFormat::Webm,
    ];

    /// File extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Mov => "mov",
            OutputFormat::Avi => "avi",
            OutputFormat::Webm => "webm",
        }
    }

    /// MIME type for uploads of this container.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "video/mp4",
            OutputFormat::Mov => "video/quicktime",
            OutputFormat::Avi => "video/x-msvideo",
            OutputFormat::Webm => "video/webm",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp4" => Ok(OutputFormat::Mp4),
            "mov" => Ok(OutputFormat::Mov),
            "avi" => Ok(OutputFormat::Avi),
            "webm" => Ok(OutputFormat::Webm),
            _ => Err(ParamError::new("format", s)),
        }
    }
}

/// Target resolution class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Resolution {
    #[serde(rename = "1080p")]
    P1080,
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "360p")]
    P360,
}

impl Resolution {
    pub const ALL: &'static [Resolution] = &[
        Resolution::P1080,
        Resolution::P720,
        Resolution::P480,
        Resolution::P360,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::P1080 => "1080p",
            Resolution::P720 => "720p",
            Resolution::P480 => "480p",
            Resolution::P360 => "360p",
        }
    }

    /// Frame dimensions as `WxH`, the shape FFmpeg's `-s` flag expects.
    pub fn dimensions(&self) -> &'static str {
        match self {
            Resolution::P1080 => "1920x1080",
            Resolution::P720 => "1280x720",
            Resolution::P480 => "640x480",
            Resolution::P360 => "480x360",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1080p" => Ok(Resolution::P1080),
            "720p" => Ok(Resolution::P720),
            "480p" => Ok(Resolution::P480),
            "360p" => Ok(Resolution::P360),
            _ => Err(ParamError::new("resolution", s)),
        }
    }
}

/// Target video bitrate class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Bitrate {
    Low,
    #[default]
    Medium,
    High,
}

impl Bitrate {
    pub const ALL: &'static [Bitrate] = &[Bitrate::Low, Bitrate::Medium, Bitrate::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bitrate::Low => "low",
            Bitrate::Medium => "medium",
            Bitrate::High => "high",
        }
    }

    /// Concrete bitrate for FFmpeg's `-b:v` flag.
    pub fn target(&self) -> &'static str {
        match self {
            Bitrate::Low => "500k",
            Bitrate::Medium => "1000k",
            Bitrate::High => "2000k",
        }
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Bitrate {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Bitrate::Low),
            "medium" => Ok(Bitrate::Medium),
            "high" => Ok(Bitrate::High),
            _ => Err(ParamError::new("bitrate", s)),
        }
    }
}

/// Target frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FrameRate {
    #[serde(rename = "24")]
    Fps24,
    #[default]
    #[serde(rename = "30")]
    Fps30,
    #[serde(rename = "60")]
    Fps60,
}

impl FrameRate {
    pub const ALL: &'static [FrameRate] = &[FrameRate::Fps24, FrameRate::Fps30, FrameRate::Fps60];

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameRate::Fps24 => "24",
            FrameRate::Fps30 => "30",
            FrameRate::Fps60 => "60",
        }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FrameRate {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24" => Ok(FrameRate::Fps24),
            "30" => Ok(FrameRate::Fps30),
            "60" => Ok(FrameRate::Fps60),
            _ => Err(ParamError::new("frameRate", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        assert_eq!(OutputFormat::default(), OutputFormat::Mp4);
        assert_eq!(Resolution::default(), Resolution::P720);
        assert_eq!(Bitrate::default(), Bitrate::Medium);
        assert_eq!(FrameRate::default(), FrameRate::Fps30);
    }

    #[test]
    fn test_every_value_round_trips_through_wire_string() {
        for f in OutputFormat::ALL {
            assert_eq!(f.extension().parse::<OutputFormat>().unwrap(), *f);
        }
        for r in Resolution::ALL {
            assert_eq!(r.as_str().parse::<Resolution>().unwrap(), *r);
        }
        for b in Bitrate::ALL {
            assert_eq!(b.as_str().parse::<Bitrate>().unwrap(), *b);
        }
        for fr in FrameRate::ALL {
            assert_eq!(fr.as_str().parse::<FrameRate>().unwrap(), *fr);
        }
    }

    #[test]
    fn test_serde_uses_wire_strings() {
        assert_eq!(
            serde_json::to_string(&Resolution::P720).unwrap(),
            "\"720p\""
        );
        assert_eq!(
            serde_json::to_string(&FrameRate::Fps30).unwrap(),
            "\"30\""
        );
        assert_eq!(serde_json::to_string(&Bitrate::High).unwrap(), "\"high\"");
        assert_eq!(
            serde_json::from_str::<OutputFormat>("\"webm\"").unwrap(),
            OutputFormat::Webm
        );
    }

    #[test]
    fn test_out_of_domain_values_are_rejected() {
        let err = "4k".parse::<Resolution>().unwrap_err();
        assert_eq!(err.field, "resolution");
        assert!("ultra".parse::<Bitrate>().is_err());
        assert!("25".parse::<FrameRate>().is_err());
        assert!("mkv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_parsing_is_case_insensitive_for_named_domains() {
        assert_eq!("MP4".parse::<OutputFormat>().unwrap(), OutputFormat::Mp4);
        assert_eq!("Medium".parse::<Bitrate>().unwrap(), Bitrate::Medium);
        assert_eq!("720P".parse::<Resolution>().unwrap(), Resolution::P720);
    }

    #[test]
    fn test_every_resolution_maps_to_dimensions() {
        for r in Resolution::ALL {
            let dims = r.dimensions();
            assert!(dims.contains('x'));
        }
    }

    #[test]
    fn test_every_bitrate_maps_to_target() {
        for b in Bitrate::ALL {
            assert!(b.target().ends_with('k'));
        }
    }
}
