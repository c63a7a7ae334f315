use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Kind of media carried by a stream.
///
/// `Unknown` is the zero value of the transport's raw media type field. It is
/// never a valid kind for building a source branch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Unknown,
    Audio,
    Video,
}

impl MediaType {
    pub fn from_raw(value: u32) -> Self {
        match value {
            1 => MediaType::Audio,
            2 => MediaType::Video,
            _ => MediaType::Unknown,
        }
    }

    pub fn as_raw(&self) -> u32 {
        match self {
            MediaType::Unknown => 0,
            MediaType::Audio => 1,
            MediaType::Video => 2,
        }
    }

    pub fn nick(&self) -> &'static str {
        match self {
            MediaType::Unknown => "unknown",
            MediaType::Audio => "audio",
            MediaType::Video => "video",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.nick())
    }
}

/// Negotiated codec of a remote stream. The numeric value appears in element
/// and pad names, so it must stay stable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecType {
    #[default]
    None,
    Pcmu,
    Pcma,
    Opus,
    H264,
    Vp8,
}

impl CodecType {
    pub fn as_u32(&self) -> u32 {
        match self {
            CodecType::None => 0,
            CodecType::Pcmu => 1,
            CodecType::Pcma => 2,
            CodecType::Opus => 3,
            CodecType::H264 => 4,
            CodecType::Vp8 => 5,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(CodecType::None),
            1 => Some(CodecType::Pcmu),
            2 => Some(CodecType::Pcma),
            3 => Some(CodecType::Opus),
            4 => Some(CodecType::H264),
            5 => Some(CodecType::Vp8),
            _ => None,
        }
    }

    /// The media type this codec belongs to.
    pub fn media_type(&self) -> MediaType {
        match self {
            CodecType::None => MediaType::Unknown,
            CodecType::Pcmu | CodecType::Pcma | CodecType::Opus => MediaType::Audio,
            CodecType::H264 | CodecType::Vp8 => MediaType::Video,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CodecType::None => "none",
            CodecType::Pcmu => "PCMU",
            CodecType::Pcma => "PCMA",
            CodecType::Opus => "OPUS",
            CodecType::H264 => "H264",
            CodecType::Vp8 => "VP8",
        }
    }
}

impl Display for CodecType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
