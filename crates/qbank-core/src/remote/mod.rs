//! Remote listing and content adapter
//!
//! The reconciliation engine talks to the server only through [`Remote`].
//! Every call returns a [`Response`]: either the decoded payload or a
//! [`RemoteError`] describing an exception or undecodable reply.

mod response;
mod rpc;

pub use response::{RemoteError, Response, decode_response};
pub use rpc::{RequestParams, RpcRemote, Transport};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::category::CategoryDecl;
use crate::manifest::{Scope, Version};

/// A question as reported by the remote listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntity {
    #[serde(rename = "questionbankentryid", deserialize_with = "crate::manifest::string_or_number")]
    pub entity_id: String,
    pub name: String,
    #[serde(rename = "categoryname")]
    pub category_path: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Scope>,
}

/// Full content of one question
///
/// The category chain lists the category declarations that accompany the
/// question, outermost first; the last one is the question's own category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedEntity {
    pub version: Version,
    #[serde(default, rename = "categories")]
    pub category_chain: Vec<CategoryDecl>,
    #[serde(rename = "question")]
    pub payload: String,
}

/// Which remote questions a listing covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeFilter {
    #[serde(flatten)]
    pub scope: Scope,
    /// Restrict to this category and its descendants
    #[serde(rename = "categoryname", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Look up these ids wherever they live instead of listing the scope
    #[serde(rename = "questionbankentryids", skip_serializing_if = "Vec::is_empty")]
    pub entity_ids: Vec<String>,
}

impl ScopeFilter {
    /// Every question in the scope
    pub fn whole(scope: &Scope) -> Self {
        Self {
            scope: scope.clone(),
            category: None,
            entity_ids: Vec::new(),
        }
    }

    /// Questions under a category of the scope
    pub fn category(scope: &Scope, category: Option<&str>) -> Self {
        Self {
            category: category.map(String::from),
            ..Self::whole(scope)
        }
    }

    /// Specific questions, even if they moved out of the scope
    pub fn entities(scope: &Scope, entity_ids: Vec<String>) -> Self {
        Self {
            entity_ids,
            ..Self::whole(scope)
        }
    }
}

/// Handle to uploaded file content, consumed by a push
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(pub String);

/// A request to create or update a question from uploaded content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushRequest {
    /// Existing question to update, or `None` to create one
    #[serde(rename = "questionbankentryid")]
    pub entity_id: Option<String>,
    #[serde(rename = "fileitemid")]
    pub content: ContentRef,
    #[serde(rename = "categoryname")]
    pub category_path: String,
    #[serde(flatten)]
    pub scope: Scope,
    #[serde(rename = "importedversion")]
    pub imported_version: Option<Version>,
    #[serde(rename = "exportedversion")]
    pub exported_version: Option<Version>,
}

/// Result of a successful push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushOutcome {
    #[serde(rename = "questionbankentryid", deserialize_with = "crate::manifest::string_or_number")]
    pub entity_id: String,
    pub version: Version,
}

/// Operations the engine needs from the remote server
///
/// Calls are blocking round trips issued one at a time.
pub trait Remote {
    /// List questions matching a filter
    fn list(&self, filter: &ScopeFilter) -> Response<Vec<RemoteEntity>>;

    /// Fetch one question's content, optionally with its category chain
    fn fetch(&self, entity_id: &str, include_category: bool) -> Response<FetchedEntity>;

    /// Create a category (and its parents) if it does not exist
    fn ensure_category(&self, scope: &Scope, category_path: &str) -> Response<()>;

    /// Upload a file so a later push can reference it
    fn upload(&self, file: &Path) -> Response<ContentRef>;

    /// Create or update a question
    fn push(&self, request: &PushRequest) -> Response<PushOutcome>;

    /// Delete a question; `Ok(false)` means the remote declined
    fn delete(&self, entity_id: &str) -> Response<bool>;
}

impl<R: Remote + ?Sized> Remote for &R {
    fn list(&self, filter: &ScopeFilter) -> Response<Vec<RemoteEntity>> {
        (**self).list(filter)
    }

    fn fetch(&self, entity_id: &str, include_category: bool) -> Response<FetchedEntity> {
        (**self).fetch(entity_id, include_category)
    }

    fn ensure_category(&self, scope: &Scope, category_path: &str) -> Response<()> {
        (**self).ensure_category(scope, category_path)
    }

    fn upload(&self, file: &Path) -> Response<ContentRef> {
        (**self).upload(file)
    }

    fn push(&self, request: &PushRequest) -> Response<PushOutcome> {
        (**self).push(request)
    }

    fn delete(&self, entity_id: &str) -> Response<bool> {
        (**self).delete(entity_id)
    }
}
