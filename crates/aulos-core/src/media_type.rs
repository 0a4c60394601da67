#![forbid(unsafe_code)]

use std::{fmt, str::FromStr};

use crate::errors::CoreError;

/// Media type of a track group inside a presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MediaType {
    Audio,
    Video,
    Text,
    Image,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Audio => "audio",
            MediaType::Video => "video",
            MediaType::Text => "text",
            MediaType::Image => "image",
        }
    }

    /// Whether a presentation is unusable without at least one supported
    /// track of this type.
    pub fn is_required(&self) -> bool {
        matches!(self, MediaType::Audio | MediaType::Video)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(MediaType::Audio),
            "video" => Ok(MediaType::Video),
            "text" => Ok(MediaType::Text),
            "image" => Ok(MediaType::Image),
            other => Err(CoreError::UnknownMediaType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("audio", MediaType::Audio)]
    #[case("video", MediaType::Video)]
    #[case("text", MediaType::Text)]
    #[case("image", MediaType::Image)]
    fn parses_known_types(#[case] input: &str, #[case] expected: MediaType) {
        assert_eq!(input.parse::<MediaType>().unwrap(), expected);
        assert_eq!(expected.as_str(), input);
    }

    #[test]
    fn rejects_unknown_type() {
        assert!("subtitles".parse::<MediaType>().is_err());
    }

    #[test]
    fn only_audio_and_video_are_required() {
        assert!(MediaType::Audio.is_required());
        assert!(MediaType::Video.is_required());
        assert!(!MediaType::Text.is_required());
        assert!(!MediaType::Image.is_required());
    }
}
