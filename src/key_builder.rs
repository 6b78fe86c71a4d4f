//! Key Builders
//!
//! Derive cache keys from a call's identity, namespace and arguments.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::Result;

// == Key Context ==
/// Everything a key builder may look at for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyContext {
    /// Stable name of the wrapped callable, e.g. `users::get_user`
    pub identity: String,
    /// Combined namespace (`prefix` or `prefix:namespace`)
    pub namespace: String,
    /// Positional arguments
    pub args: Vec<Value>,
    /// Keyword arguments, sorted by name
    pub kwargs: BTreeMap<String, Value>,
    /// Opaque context from integrations (request method, headers, ...)
    pub extra: Map<String, Value>,
}

impl KeyContext {
    /// Creates a context with no arguments.
    pub fn new(identity: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Splits a serialized argument value into positional and keyword parts.
    ///
    /// Arrays (tuples) become positional arguments, objects (structs, maps)
    /// become keyword arguments, `null` (unit) means no arguments and any
    /// other scalar is a single positional argument.
    pub fn with_arguments(mut self, arguments: Value) -> Self {
        match arguments {
            Value::Null => {}
            Value::Array(items) => self.args = items,
            Value::Object(fields) => self.kwargs = fields.into_iter().collect(),
            scalar => self.args = vec![scalar],
        }
        self
    }

    /// Attaches opaque extra context.
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra;
        self
    }

    /// Short name of the callable (last path segment of the identity).
    pub fn name(&self) -> &str {
        self.identity
            .rsplit("::")
            .next()
            .unwrap_or(self.identity.as_str())
    }

    fn args_repr(&self) -> String {
        Value::Array(self.args.clone()).to_string()
    }

    fn kwargs_repr(&self) -> String {
        let fields: Map<String, Value> = self
            .kwargs
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Value::Object(fields).to_string()
    }
}

// == Key Builder Trait ==
/// Builds the cache key for a call. May suspend.
///
/// A builder must resolve to a non-empty key; anything else is reported by
/// the decorator as a key builder contract violation.
#[async_trait]
pub trait KeyBuilder: Send + Sync {
    async fn build(&self, ctx: &KeyContext) -> Result<String>;
}

// == Default Key Builder ==
/// `<namespace>:<sha256 of "identity:args:kwargs">`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKeyBuilder;

#[async_trait]
impl KeyBuilder for DefaultKeyBuilder {
    async fn build(&self, ctx: &KeyContext) -> Result<String> {
        let material = format!("{}:{}:{}", ctx.identity, ctx.args_repr(), ctx.kwargs_repr());
        let digest = hex::encode(Sha256::digest(material.as_bytes()));
        Ok(format!("{}:{}", ctx.namespace, digest))
    }
}

// == Simple Key Builder ==
/// Human-readable keys: `namespace:name:args:kwargs`, empty parts dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleKeyBuilder;

#[async_trait]
impl KeyBuilder for SimpleKeyBuilder {
    async fn build(&self, ctx: &KeyContext) -> Result<String> {
        let mut parts = vec![ctx.namespace.clone(), ctx.name().to_string()];
        if !ctx.args.is_empty() {
            parts.push(ctx.args_repr());
        }
        if !ctx.kwargs.is_empty() {
            parts.push(ctx.kwargs_repr());
        }
        parts.retain(|p| !p.is_empty());
        Ok(parts.join(":"))
    }
}

// == Closure Adapter ==
/// Key builder backed by an async closure.
pub struct FnKeyBuilder<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> KeyBuilder for FnKeyBuilder<F>
where
    F: Fn(KeyContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send,
{
    async fn build(&self, ctx: &KeyContext) -> Result<String> {
        (self.f)(ctx.clone()).await
    }
}

/// Wraps an async closure as a shareable key builder.
pub fn key_builder_fn<F, Fut>(f: F) -> Arc<dyn KeyBuilder>
where
    F: Fn(KeyContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    Arc::new(FnKeyBuilder { f })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(arguments: Value) -> KeyContext {
        KeyContext::new("app::math::double", "test:").with_arguments(arguments)
    }

    #[test]
    fn test_argument_splitting() {
        let positional = ctx(json!([1, "a"]));
        assert_eq!(positional.args, vec![json!(1), json!("a")]);
        assert!(positional.kwargs.is_empty());

        let keyword = ctx(json!({"y": 2, "x": 1}));
        assert!(keyword.args.is_empty());
        assert_eq!(keyword.kwargs.keys().collect::<Vec<_>>(), vec!["x", "y"]);

        let scalar = ctx(json!(5));
        assert_eq!(scalar.args, vec![json!(5)]);

        assert_eq!(ctx(Value::Null), KeyContext::new("app::math::double", "test:"));
    }

    #[test]
    fn test_name_is_last_segment() {
        assert_eq!(ctx(Value::Null).name(), "double");
        assert_eq!(KeyContext::new("plain", "").name(), "plain");
    }

    #[tokio::test]
    async fn test_default_builder_is_deterministic() {
        let a = DefaultKeyBuilder.build(&ctx(json!([5]))).await.unwrap();
        let b = DefaultKeyBuilder.build(&ctx(json!([5]))).await.unwrap();
        let c = DefaultKeyBuilder.build(&ctx(json!([10]))).await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("test::"));
        // namespace + ':' + 64 hex chars
        assert_eq!(a.len(), "test::".len() + 64);
    }

    #[tokio::test]
    async fn test_default_builder_distinguishes_identity() {
        let other = KeyContext::new("app::math::triple", "test:").with_arguments(json!([5]));
        let a = DefaultKeyBuilder.build(&ctx(json!([5]))).await.unwrap();
        let b = DefaultKeyBuilder.build(&other).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_default_builder_ignores_extra() {
        let mut extra = Map::new();
        extra.insert("method".into(), json!("GET"));
        let plain = DefaultKeyBuilder.build(&ctx(json!([1]))).await.unwrap();
        let with_extra = DefaultKeyBuilder
            .build(&ctx(json!([1])).with_extra(extra))
            .await
            .unwrap();
        assert_eq!(plain, with_extra);
    }

    #[tokio::test]
    async fn test_simple_builder() {
        let key = SimpleKeyBuilder.build(&ctx(json!([5]))).await.unwrap();
        assert_eq!(key, "test::double:[5]");

        let key = SimpleKeyBuilder
            .build(&KeyContext::new("f", "").with_arguments(json!({"b": 2, "a": 1})))
            .await
            .unwrap();
        assert_eq!(key, r#"f:{"a":1,"b":2}"#);
    }

    #[tokio::test]
    async fn test_fn_builder() {
        let builder = key_builder_fn(|ctx: KeyContext| async move {
            tokio::task::yield_now().await;
            Ok(format!("{}:{}", ctx.namespace, ctx.name()))
        });
        let key = builder.build(&ctx(Value::Null)).await.unwrap();
        assert_eq!(key, "test::double");
    }
}
