//! Request-scoped state shared between the pipeline and resolvers.

use std::collections::HashMap;

use bytes::Bytes;
use http::Extensions;

use crate::header::HeaderList;

/// What kind of exchange a transport handed us.
#[derive(Debug)]
pub enum Scope {
    Http(HttpScope),
    /// Host startup/shutdown protocol; no request or response.
    Lifespan,
}

/// The immutable facts of one HTTP request.
#[derive(Debug, Clone)]
pub struct HttpScope {
    pub method: String,
    pub path: String,
    pub headers: HeaderList,
}

impl HttpScope {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: HeaderList::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A decoded request body.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedBody {
    Json(serde_json::Value),
    Form(HashMap<String, FormValue>),
    Multipart(HashMap<String, PartValue>),
}

/// A urlencoded field: single, or repeatable when the field name uses the
/// `name[]` convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    One(String),
    Many(Vec<String>),
}

/// A multipart field: text when the part carried no content type, raw bytes
/// when it declared one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(String),
    Binary(Bytes),
}

/// Mutable per-request state, threaded through decoding, resolution, and
/// production.
///
/// The typed fields cover what the pipeline itself maintains; resolver
/// collaborators stash anything else in [`RequestState::extensions`],
/// keyed by type.
#[derive(Debug)]
pub struct RequestState {
    pub method: String,
    pub path: String,
    /// Response mimes the client will take, most preferred first. Dispatch
    /// walks this in order.
    pub accept: Vec<String>,
    /// Decoded request body, when one arrived and decoding succeeded.
    pub body: Option<DecodedBody>,
    pub extensions: Extensions,
}

impl RequestState {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            accept: vec!["*/*".to_string()],
            body: None,
            extensions: Extensions::new(),
        }
    }
}
