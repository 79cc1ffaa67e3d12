use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use super::{Origin, SegmentKind};

/// Subtype of a [`Media`] segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Audio,
    Voice,
    Video,
    File,
}

impl MediaType {
    /// The segment kind this subtype is queried as.
    pub fn kind(self) -> SegmentKind {
        match self {
            MediaType::Image => SegmentKind::Image,
            MediaType::Audio => SegmentKind::Audio,
            MediaType::Voice => SegmentKind::Voice,
            MediaType::Video => SegmentKind::Video,
            MediaType::File => SegmentKind::File,
        }
    }

    /// File name used when none is given.
    pub fn default_name(self) -> &'static str {
        match self {
            MediaType::Image => "image.png",
            MediaType::Audio => "audio.mp3",
            MediaType::Voice => "voice.wav",
            MediaType::Video => "video.mp4",
            MediaType::File => "file.bin",
        }
    }

    /// Maps a media segment kind back to its subtype.
    pub fn from_kind(kind: &SegmentKind) -> Option<Self> {
        match kind {
            SegmentKind::Image => Some(MediaType::Image),
            SegmentKind::Audio => Some(MediaType::Audio),
            SegmentKind::Voice => Some(MediaType::Voice),
            SegmentKind::Video => Some(MediaType::Video),
            SegmentKind::File => Some(MediaType::File),
            _ => None,
        }
    }
}

/// Where the content of a [`Media`] can be obtained from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSource<'a> {
    Raw(&'a [u8]),
    Path(&'a str),
    Url(&'a str),
    Id(&'a str),
}

/// Image, audio, voice, video or file content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    #[serde(rename = "subtype")]
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_raw"
    )]
    pub raw: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    pub name: String,
    #[serde(skip)]
    pub origin: Origin,
}

impl Media {
    fn empty(media_type: MediaType) -> Self {
        Self {
            media_type,
            id: None,
            url: None,
            path: None,
            raw: None,
            mimetype: None,
            name: media_type.default_name().to_string(),
            origin: Origin::none(),
        }
    }

    pub fn from_id(media_type: MediaType, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::empty(media_type)
        }
    }

    pub fn from_url(media_type: MediaType, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::empty(media_type)
        }
    }

    pub fn from_path(media_type: MediaType, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::empty(media_type)
        }
    }

    pub fn from_raw(media_type: MediaType, raw: impl Into<Vec<u8>>) -> Self {
        Self {
            raw: Some(raw.into()),
            ..Self::empty(media_type)
        }
    }

    /// Overrides the file name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    /// The source content should be read from: raw bytes, then path, then
    /// URL, then platform id.
    pub fn source(&self) -> Option<MediaSource<'_>> {
        if let Some(raw) = &self.raw {
            Some(MediaSource::Raw(raw))
        } else if let Some(path) = &self.path {
            Some(MediaSource::Path(path))
        } else if let Some(url) = &self.url {
            Some(MediaSource::Url(url))
        } else {
            self.id.as_deref().map(MediaSource::Id)
        }
    }
}

/// Accepts raw bytes either as a byte array or as a base64 string.
fn deserialize_raw<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<u8>>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRepr {
        Bytes(Vec<u8>),
        Base64(String),
    }

    match Option::<RawRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawRepr::Bytes(bytes)) => Ok(Some(bytes)),
        Some(RawRepr::Base64(encoded)) => STANDARD
            .decode(encoded.as_bytes())
            .map(Some)
            .map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name_per_subtype() {
        assert_eq!(Media::from_url(MediaType::Image, "u").name, "image.png");
        assert_eq!(Media::from_id(MediaType::Video, "v").name, "video.mp4");
    }

    #[test]
    fn test_source_priority() {
        let mut media = Media::from_url(MediaType::Image, "http://x");
        media.raw = Some(vec![1, 2]);
        assert_eq!(media.source(), Some(MediaSource::Raw(&[1, 2])));
        media.raw = None;
        assert_eq!(media.source(), Some(MediaSource::Url("http://x")));
    }

    #[test]
    fn test_raw_accepts_base64_and_bytes() {
        let from_b64: Media = serde_json::from_value(serde_json::json!({
            "subtype": "image", "raw": "AQID", "name": "a.png"
        }))
        .unwrap();
        let from_bytes: Media = serde_json::from_value(serde_json::json!({
            "subtype": "image", "raw": [1, 2, 3], "name": "a.png"
        }))
        .unwrap();
        assert_eq!(from_b64.raw, Some(vec![1, 2, 3]));
        assert_eq!(from_b64, from_bytes);
    }
}
