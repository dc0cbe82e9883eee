//! The value contract producers dispatch on.

use std::any::Any;
use std::fmt;

/// Anything a resolver can hand the content registry.
///
/// Dispatch keys on the value's exact runtime type via [`AppValue::as_any`];
/// [`AppValue::fallback_text`] supplies the single default chunk when no
/// producer matches. Blanket-implemented for every displayable, sendable
/// type, so resolvers return plain values like `serde_json::Value` or
/// `String` without ceremony.
pub trait AppValue: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn fallback_text(&self) -> String;
}

impl<T> AppValue for T
where
    T: Any + fmt::Display + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn fallback_text(&self) -> String {
        self.to_string()
    }
}
