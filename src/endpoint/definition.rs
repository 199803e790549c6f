//! Endpoint definitions.
//!
//! A definition is a pure descriptor: a request builder plus the tags the
//! result provides (queries) or invalidates (mutations). Declaring one has
//! no network or cache side effects; everything happens at subscription or
//! trigger time.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::executor::transport::Request;
use crate::tag::Tag;

type BuildFn = dyn Fn(&Value) -> Request + Send + Sync;
type TagsFn = dyn Fn(&Value) -> Vec<Tag> + Send + Sync;
type ParseFn = dyn Fn(Value) -> Result<Value, String> + Send + Sync;

/// Declarative descriptor for a cached read.
pub struct QueryDef {
    id: String,
    build: Box<BuildFn>,
    provides: Box<TagsFn>,
    parse: Option<Box<ParseFn>>,
}

impl QueryDef {
    pub fn new(
        id: impl Into<String>,
        build: impl Fn(&Value) -> Request + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            build: Box::new(build),
            provides: Box::new(|_| Vec::new()),
            parse: None,
        }
    }

    /// Tags this query's result depends on, as a function of the argument.
    pub fn provides(mut self, tags: impl Fn(&Value) -> Vec<Tag> + Send + Sync + 'static) -> Self {
        self.provides = Box::new(tags);
        self
    }

    /// Require the success payload to deserialize as `T`.
    ///
    /// A payload that does not match the shape is recorded as a parse
    /// failure at fetch time; the stored value is the canonical re-serialized
    /// form of `T`.
    pub fn returning<T: DeserializeOwned + Serialize>(mut self) -> Self {
        self.parse = Some(Box::new(|raw: Value| {
            let value: T = serde_json::from_value(raw).map_err(|e| e.to_string())?;
            serde_json::to_value(value).map_err(|e| e.to_string())
        }));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn build_request(&self, arg: &Value) -> Request {
        (self.build)(arg)
    }

    pub(crate) fn provided_tags(&self, arg: &Value) -> Vec<Tag> {
        (self.provides)(arg)
    }

    pub(crate) fn parse_payload(&self, raw: Value) -> Result<Value, String> {
        match &self.parse {
            Some(parse) => parse(raw),
            None => Ok(raw),
        }
    }
}

/// Declarative descriptor for a write that invalidates cached reads.
pub struct MutationDef {
    id: String,
    build: Box<BuildFn>,
    invalidates: Box<TagsFn>,
}

impl MutationDef {
    pub fn new(
        id: impl Into<String>,
        build: impl Fn(&Value) -> Request + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            build: Box::new(build),
            invalidates: Box::new(|_| Vec::new()),
        }
    }

    /// Tags stale after this mutation succeeds, as a function of the argument.
    pub fn invalidates(
        mut self,
        tags: impl Fn(&Value) -> Vec<Tag> + Send + Sync + 'static,
    ) -> Self {
        self.invalidates = Box::new(tags);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn build_request(&self, arg: &Value) -> Request {
        (self.build)(arg)
    }

    pub(crate) fn invalidated_tags(&self, arg: &Value) -> Vec<Tag> {
        (self.invalidates)(arg)
    }
}
