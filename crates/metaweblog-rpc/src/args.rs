//! Raw call arguments and their typed request records.
//!
//! The transport hands over arguments exactly as decoded from the wire:
//! either a positional list or a name → value map. [`RawArgs`] is only
//! inspected by the credential gate and by [`decode`]; every operation
//! receives a strongly-typed request instead.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use metaweblog_types::{Article, MediaObject, PageId, Result, WeblogError};

use crate::api::ApiMethod;

// ---------------------------------------------------------------------------
// RawArgs
// ---------------------------------------------------------------------------

/// Loosely-typed call arguments.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawArgs {
    /// Arguments in signature order.
    Positional(Vec<Value>),
    /// Arguments keyed by parameter name.
    Named(Map<String, Value>),
}

impl Default for RawArgs {
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

impl From<Vec<Value>> for RawArgs {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

impl RawArgs {
    /// Builds the name → value structure for `method`.
    ///
    /// Positional arguments can only be named when their count matches
    /// the declared arity; otherwise `None` is returned and callers fall
    /// back to reading declared positions.
    pub fn expects_to_map(&self, method: ApiMethod) -> Option<Map<String, Value>> {
        match self {
            Self::Named(map) => Some(map.clone()),
            Self::Positional(values) if values.len() == method.expects().len() => Some(
                method
                    .expects()
                    .iter()
                    .map(|name| name.to_string())
                    .zip(values.iter().cloned())
                    .collect(),
            ),
            Self::Positional(_) => None,
        }
    }

    /// Value at the declared position of `param`, for positional args.
    pub fn positional(&self, method: ApiMethod, param: &str) -> Option<&Value> {
        match self {
            Self::Positional(values) => method.position(param).and_then(|i| values.get(i)),
            Self::Named(_) => None,
        }
    }

    /// Names every argument, tolerating a short or long positional list.
    ///
    /// Missing trailing parameters are simply absent; surplus values
    /// are dropped.
    pub fn into_map(self, method: ApiMethod) -> Map<String, Value> {
        match self {
            Self::Named(map) => map,
            Self::Positional(values) => method
                .expects()
                .iter()
                .map(|name| name.to_string())
                .zip(values)
                .collect(),
        }
    }
}

/// Decodes the arguments of `method` into the request record `T`.
///
/// # Errors
///
/// [`WeblogError::ProtocolError`] if a required parameter is missing or
/// has the wrong shape.
pub fn decode<T: DeserializeOwned>(method: ApiMethod, args: RawArgs) -> Result<T> {
    let map = args.into_map(method);
    serde_json::from_value(Value::Object(map)).map_err(|e| WeblogError::ProtocolError {
        reason: format!("invalid arguments for {method}: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

/// A post id as sent by clients: a string, or occasionally a number.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WireId(pub String);

impl WireId {
    /// Resolves the id. An unparseable id is reported as not found.
    pub fn page_id(&self) -> Result<PageId> {
        self.0.parse()
    }
}

impl<'de> Deserialize<'de> for WireId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(de::Error::custom(format!(
                "expected a post id string, got {other}"
            ))),
        }
    }
}

/// Reads a publish flag: booleans as-is, numbers non-zero, `"1"`/`"true"`.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "TRUE" | "True"),
        _ => false,
    })
}

/// Reads a count given as a number or a numeric string.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| de::Error::custom("numberOfPosts out of range")),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("numberOfPosts '{s}' is not a number"))),
        other => Err(de::Error::custom(format!(
            "expected numberOfPosts as integer, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Request records
// ---------------------------------------------------------------------------

/// `metaWeblog.getCategories`. Only one blog exists, so `blogid` is ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GetCategoriesRequest {}

/// `metaWeblog.getPost`.
#[derive(Clone, Debug, Deserialize)]
pub struct GetPostRequest {
    pub postid: WireId,
}

/// `metaWeblog.getRecentPosts`.
#[derive(Clone, Debug, Deserialize)]
pub struct GetRecentPostsRequest {
    #[serde(rename = "numberOfPosts", deserialize_with = "lenient_count")]
    pub number_of_posts: i64,
}

/// `metaWeblog.newPost`.
#[derive(Clone, Debug, Deserialize)]
pub struct NewPostRequest {
    #[serde(rename = "struct", default)]
    pub article: Article,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub publish: bool,
}

/// `metaWeblog.editPost`.
#[derive(Clone, Debug, Deserialize)]
pub struct EditPostRequest {
    pub postid: WireId,
    #[serde(rename = "struct", default)]
    pub article: Article,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub publish: bool,
}

/// `blogger.deletePost`. `appkey` and `publish` are accepted and ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct DeletePostRequest {
    pub postid: WireId,
}

/// `metaWeblog.newMediaObject`.
#[derive(Clone, Debug, Deserialize)]
pub struct NewMediaObjectRequest {
    pub data: MediaObject,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
