//! [`Remote`] over a request/response transport
//!
//! Each call builds its own [`RequestParams`] from the immutable base
//! parameters plus that call's arguments. Nothing is shared or mutated
//! between calls.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::response::{RemoteError, Response, decode_response};
use super::{ContentRef, FetchedEntity, PushOutcome, PushRequest, Remote, RemoteEntity, ScopeFilter};
use crate::manifest::Scope;

const LIST_FUNCTION: &str = "qbank_get_question_list";
const FETCH_FUNCTION: &str = "qbank_export_question";
const CATEGORY_FUNCTION: &str = "qbank_create_category";
const PUSH_FUNCTION: &str = "qbank_import_question";
const DELETE_FUNCTION: &str = "qbank_delete_question";

/// Black-box request/response channel to the server
pub trait Transport {
    /// Invoke a remote function and return the raw reply body
    fn call(&self, function: &str, params: &RequestParams) -> std::io::Result<String>;

    /// Upload a file and return the raw reply body
    fn upload(&self, file: &Path) -> std::io::Result<String>;
}

/// Parameters for one remote call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams(Map<String, Value>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of these parameters with one more field
    pub fn with(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut map = self.0.clone();
        map.insert(key.to_string(), value.into());
        Self(map)
    }

    /// A copy of these parameters overlaid with every field of `overrides`
    ///
    /// `overrides` must serialize to a JSON object.
    pub fn merged(&self, overrides: &impl Serialize) -> Response<Self> {
        let value = serde_json::to_value(overrides)
            .map_err(|e| RemoteError::malformed(format!("unencodable request: {e}")))?;
        let Value::Object(fields) = value else {
            return Err(RemoteError::malformed("request arguments must be an object"));
        };
        let mut map = self.0.clone();
        map.extend(fields);
        Ok(Self(map))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[derive(Deserialize)]
struct ListReply {
    questions: Vec<RemoteEntity>,
}

#[derive(Deserialize)]
struct UploadReply {
    #[serde(deserialize_with = "crate::manifest::string_or_number")]
    itemid: String,
}

#[derive(Deserialize)]
struct DeleteReply {
    success: bool,
}

#[derive(Serialize)]
struct CategoryArgs<'a> {
    #[serde(flatten)]
    scope: &'a Scope,
    #[serde(rename = "categoryname")]
    category_path: &'a str,
}

/// [`Remote`] implementation over a [`Transport`]
pub struct RpcRemote<T> {
    transport: T,
    base: RequestParams,
}

impl<T: Transport> RpcRemote<T> {
    /// Create an adapter sending `base` with every call
    pub fn new(transport: T, base: RequestParams) -> Self {
        Self { transport, base }
    }

    pub fn base(&self) -> &RequestParams {
        &self.base
    }

    fn invoke<R: DeserializeOwned>(&self, function: &str, params: RequestParams) -> Response<R> {
        tracing::trace!(function, "Calling remote");
        let raw = self.transport.call(function, &params)?;
        decode_response(&raw)
    }
}

impl<T: Transport> Remote for RpcRemote<T> {
    fn list(&self, filter: &ScopeFilter) -> Response<Vec<RemoteEntity>> {
        let params = self.base.merged(filter)?;
        let reply: ListReply = self.invoke(LIST_FUNCTION, params)?;
        Ok(reply.questions)
    }

    fn fetch(&self, entity_id: &str, include_category: bool) -> Response<FetchedEntity> {
        let params = self
            .base
            .with("questionbankentryid", entity_id)
            .with("includecategory", include_category);
        self.invoke(FETCH_FUNCTION, params)
    }

    fn ensure_category(&self, scope: &Scope, category_path: &str) -> Response<()> {
        let params = self.base.merged(&CategoryArgs {
            scope,
            category_path,
        })?;
        let _: serde::de::IgnoredAny = self.invoke(CATEGORY_FUNCTION, params)?;
        Ok(())
    }

    fn upload(&self, file: &Path) -> Response<ContentRef> {
        let raw = self.transport.upload(file)?;
        let reply: UploadReply = decode_response(&raw)?;
        Ok(ContentRef(reply.itemid))
    }

    fn push(&self, request: &PushRequest) -> Response<PushOutcome> {
        let params = self.base.merged(request)?;
        self.invoke(PUSH_FUNCTION, params)
    }

    fn delete(&self, entity_id: &str) -> Response<bool> {
        let params = self.base.with("questionbankentryid", entity_id);
        let reply: DeleteReply = self.invoke(DELETE_FUNCTION, params)?;
        Ok(reply.success)
    }
}
