//! Protocol-facing records.
//!
//! Field names on the wire are fixed by the MetaWeblog protocol
//! (`permaLink`, `dateCreated`, `mt_text_more`, ...) and are kept
//! verbatim through serde renames.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// A post as exchanged with MetaWeblog clients.
///
/// Every field is optional on input. On output `categories` is omitted
/// when the page has no parent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Article {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    #[serde(rename = "permaLink", skip_serializing_if = "Option::is_none")]
    pub perma_link: Option<String>,

    /// Only the first element is used, as the archive title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    /// Continuation text appended to the description.
    #[serde(
        rename = "mt_text_more",
        alias = "textMore",
        skip_serializing_if = "Option::is_none"
    )]
    pub text_more: Option<String>,

    /// Anything other than a string reads as absent.
    #[serde(
        rename = "dateCreated",
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_created: Option<String>,
}

impl Article {
    /// Returns the first category, if any was supplied.
    pub fn first_category(&self) -> Option<&str> {
        self.categories
            .as_ref()
            .and_then(|c| c.first())
            .map(String::as_str)
    }
}

fn lenient_date<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DateField {
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match DateField::deserialize(deserializer)? {
        DateField::Text(text) => Some(text),
        DateField::Other(_) => None,
    })
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// An archive container as presented to MetaWeblog clients.
///
/// The protocol has no separate name/description fields for archives,
/// so `title`, `categoryName` and `description` carry the same value,
/// as do `htmlUrl` and `rssUrl`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub title: String,
    #[serde(rename = "categoryName")]
    pub category_name: String,
    pub description: String,
    #[serde(rename = "htmlUrl")]
    pub html_url: String,
    #[serde(rename = "rssUrl")]
    pub rss_url: String,
}

// ---------------------------------------------------------------------------
// MediaObject / MediaUrl
// ---------------------------------------------------------------------------

/// Uploaded file, as received by `newMediaObject`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaObject {
    /// Raw file content. Base64 in textual encodings.
    #[serde(with = "base64_bits")]
    pub bits: Vec<u8>,
    /// File name to store the upload under.
    pub name: String,
    /// MIME type reported by the client.
    #[serde(rename = "type", default)]
    pub mime_type: String,
}

/// Location of a stored upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUrl {
    pub url: String,
}

/// Serde adapter carrying byte payloads as standard base64 strings.
mod base64_bits {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        // Clients commonly wrap base64 at 76 columns.
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
