use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// MIME type of a media file as sent in the multipart `media` part.
///
/// Only images and videos are indexable; everything else is carried so the
/// caller can report why a file was skipped.
#[derive(Clone, Debug, PartialEq)]
pub enum ContentType {
    // Images
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
    Svg,
    // Video
    Mp4,
    Webm,
    QuickTime,
    Matroska,
    Avi,
    // Other
    OctetStream,
    Other(String),
}

impl ContentType {
    /// MIME type string (e.g., "image/jpeg", "video/mp4").
    pub fn as_str(&self) -> &str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Svg => "image/svg+xml",
            Self::Mp4 => "video/mp4",
            Self::Webm => "video/webm",
            Self::QuickTime => "video/quicktime",
            Self::Matroska => "video/x-matroska",
            Self::Avi => "video/x-msvideo",
            Self::OctetStream => "application/octet-stream",
            Self::Other(s) => s,
        }
    }

    pub fn from_mime(s: &str) -> Self {
        match s {
            "image/jpeg" => Self::Jpeg,
            "image/png" => Self::Png,
            "image/gif" => Self::Gif,
            "image/webp" => Self::Webp,
            "image/bmp" => Self::Bmp,
            "image/svg+xml" => Self::Svg,
            "video/mp4" => Self::Mp4,
            "video/webm" => Self::Webm,
            "video/quicktime" => Self::QuickTime,
            "video/x-matroska" => Self::Matroska,
            "video/x-msvideo" => Self::Avi,
            "application/octet-stream" => Self::OctetStream,
            other => Self::Other(other.to_string()),
        }
    }

    /// Map a file extension to its content type.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "webp" => Self::Webp,
            "bmp" => Self::Bmp,
            "svg" => Self::Svg,
            "mp4" | "m4v" => Self::Mp4,
            "webm" => Self::Webm,
            "mov" => Self::QuickTime,
            "mkv" => Self::Matroska,
            "avi" => Self::Avi,
            _ => Self::OctetStream,
        }
    }

    /// Content type for a file name, based on its extension.
    pub fn from_file_name(name: &str) -> Self {
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Self::from_extension(ext),
            _ => Self::OctetStream,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(
            self,
            Self::Jpeg | Self::Png | Self::Gif | Self::Webp | Self::Bmp | Self::Svg
        ) || matches!(self, Self::Other(s) if s.starts_with("image/"))
    }

    pub fn is_video(&self) -> bool {
        matches!(
            self,
            Self::Mp4 | Self::Webm | Self::QuickTime | Self::Matroska | Self::Avi
        ) || matches!(self, Self::Other(s) if s.starts_with("video/"))
    }

    /// Whether the ingestion side accepts this type at all.
    pub fn is_media(&self) -> bool {
        self.is_image() || self.is_video()
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ContentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ContentType::from_mime(&s))
    }
}
