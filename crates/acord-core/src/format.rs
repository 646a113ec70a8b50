//! # Wire Formats
//!
//! The two representations an ACORD payload travels in. Request bodies are
//! decoded according to their declared `Content-Type`; a missing header is
//! treated as JSON.

use std::fmt;
use std::str::FromStr;

use crate::error::FormatError;

/// JSON or XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WireFormat {
    /// `application/json`
    #[default]
    Json,
    /// `application/xml`
    Xml,
}

impl WireFormat {
    /// Canonical media type written to `Content-Type`.
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }

    /// Lowercase short name (`json` / `xml`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }

    /// Resolve a declared `Content-Type` header value.
    ///
    /// Parameters such as `charset` are ignored. Structured-syntax suffixes
    /// (`+json`, `+xml`) are honoured. An absent or empty header means JSON.
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self, FormatError> {
        let Some(raw) = content_type else {
            return Ok(Self::Json);
        };
        let essence = media_essence(raw);
        if essence.is_empty() {
            return Ok(Self::Json);
        }
        Self::from_media_type(&essence)
            .ok_or_else(|| FormatError::UnsupportedContentType(raw.to_string()))
    }

    /// Match a lowercase `type/subtype` pair, without parameters.
    pub fn from_media_type(essence: &str) -> Option<Self> {
        match essence {
            "application/json" | "text/json" => Some(Self::Json),
            "application/xml" | "text/xml" => Some(Self::Xml),
            other if other.ends_with("+json") => Some(Self::Json),
            other if other.ends_with("+xml") => Some(Self::Xml),
            _ => None,
        }
    }

    /// Guess the format of a file from its extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

/// Lowercased `type/subtype` portion of a media type, parameters stripped.
pub fn media_essence(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_resolution() {
        let cases = [
            (Some("application/json"), WireFormat::Json),
            (Some("application/json; charset=utf-8"), WireFormat::Json),
            (Some("Application/XML"), WireFormat::Xml),
            (Some("text/xml;charset=UTF-8"), WireFormat::Xml),
            (Some("application/vnd.acord+xml"), WireFormat::Xml),
            (Some("application/problem+json"), WireFormat::Json),
            (Some(""), WireFormat::Json),
            (None, WireFormat::Json),
        ];
        for (header, expected) in cases {
            assert_eq!(
                WireFormat::from_content_type(header).unwrap(),
                expected,
                "header {header:?}"
            );
        }
    }

    #[test]
    fn unsupported_content_type() {
        let err = WireFormat::from_content_type(Some("text/plain")).unwrap_err();
        assert_eq!(err, FormatError::UnsupportedContentType("text/plain".into()));
    }

    #[test]
    fn from_str_and_extension() {
        assert_eq!("XML".parse::<WireFormat>().unwrap(), WireFormat::Xml);
        assert!("yaml".parse::<WireFormat>().is_err());
        assert_eq!(WireFormat::from_extension("Json"), Some(WireFormat::Json));
        assert_eq!(WireFormat::from_extension("txt"), None);
    }

    #[test]
    fn media_types() {
        assert_eq!(WireFormat::Json.media_type(), "application/json");
        assert_eq!(WireFormat::Xml.media_type(), "application/xml");
        assert_eq!(WireFormat::default(), WireFormat::Json);
    }
}
