//! Method table of the MetaWeblog API.
//!
//! Each method declares its parameters in protocol order. The order
//! matters twice: positional arguments are named by zipping them with
//! the signature, and the credential gate falls back to the declared
//! positions of `username`/`password` when that zip is impossible.

use std::fmt;

/// Parameter name carrying the login.
pub const PARAM_USERNAME: &str = "username";

/// Parameter name carrying the password.
pub const PARAM_PASSWORD: &str = "password";

/// The seven operations exposed to MetaWeblog clients.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ApiMethod {
    GetCategories,
    GetPost,
    GetRecentPosts,
    NewPost,
    EditPost,
    DeletePost,
    NewMediaObject,
}

impl ApiMethod {
    /// Every method, in table order.
    pub const ALL: [ApiMethod; 7] = [
        Self::GetCategories,
        Self::GetPost,
        Self::GetRecentPosts,
        Self::NewPost,
        Self::EditPost,
        Self::DeletePost,
        Self::NewMediaObject,
    ];

    /// Resolves a wire method name.
    ///
    /// Accepts the namespaced name (`metaWeblog.getPost`), the bare
    /// name (`getPost`), and `blogger.deletePost`, which is what most
    /// clients send for deletion.
    pub fn lookup(name: &str) -> Option<Self> {
        let bare = name
            .strip_prefix("metaWeblog.")
            .or_else(|| name.strip_prefix("blogger."))
            .unwrap_or(name);
        if name.starts_with("blogger.") && bare != "deletePost" {
            return None;
        }
        Self::ALL.into_iter().find(|m| m.name() == bare)
    }

    /// Bare protocol name of the method.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetCategories => "getCategories",
            Self::GetPost => "getPost",
            Self::GetRecentPosts => "getRecentPosts",
            Self::NewPost => "newPost",
            Self::EditPost => "editPost",
            Self::DeletePost => "deletePost",
            Self::NewMediaObject => "newMediaObject",
        }
    }

    /// Declared parameter names, in protocol order.
    pub fn expects(&self) -> &'static [&'static str] {
        match self {
            Self::GetCategories => &["blogid", "username", "password"],
            Self::GetPost => &["postid", "username", "password"],
            Self::GetRecentPosts => &["blogid", "username", "password", "numberOfPosts"],
            Self::NewPost => &["blogid", "username", "password", "struct", "publish"],
            Self::EditPost => &["postid", "username", "password", "struct", "publish"],
            Self::DeletePost => &["appkey", "postid", "username", "password", "publish"],
            Self::NewMediaObject => &["blogid", "username", "password", "data"],
        }
    }

    /// Position of `param` in the signature.
    pub fn position(&self, param: &str) -> Option<usize> {
        self.expects().iter().position(|p| *p == param)
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "metaWeblog.{}", self.name())
    }
}
