//! Parsing of serialized template fragments.
//!
//! Fragments are parsed on demand and may suspend (a parser is free to fetch
//! or decode asynchronously); failures surface as `Result` values.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::{Result, common::MemCache, model::GraphModel};

/// Turns a serialized fragment into a [`GraphModel`].
#[async_trait]
pub trait FragmentParser: Send + Sync {
    async fn parse(
        &self,
        fragment: &str,
    ) -> Result<GraphModel>;

    /// Forgets any state derived from previously parsed fragments.
    fn invalidate(&self) {}
}

/// Parses fragments written as JSON graph models.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFragmentParser;

#[async_trait]
impl FragmentParser for JsonFragmentParser {
    async fn parse(
        &self,
        fragment: &str,
    ) -> Result<GraphModel> {
        GraphModel::from_json(fragment)
    }
}

/// Caches successful parses of an inner parser, keyed by the fragment text.
pub struct CachingParser<P> {
    inner: P,
    cache: MemCache<String, Arc<GraphModel>>,
}

impl<P: FragmentParser> CachingParser<P> {
    pub fn new(
        inner: P,
        capacity: usize,
    ) -> Self {
        Self {
            inner,
            cache: MemCache::new(capacity),
        }
    }
}

#[async_trait]
impl<P: FragmentParser> FragmentParser for CachingParser<P> {
    async fn parse(
        &self,
        fragment: &str,
    ) -> Result<GraphModel> {
        let key = fragment.to_string();
        if let Some(graph) = self.cache.get(&key) {
            trace!("parser::cache_hit({} bytes)", key.len());
            return Ok(graph.as_ref().clone());
        }

        let graph = self.inner.parse(fragment).await?;
        self.cache.set(key, Arc::new(graph.clone()));
        Ok(graph)
    }

    fn invalidate(&self) {
        self.cache.clear();
        self.inner.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::model::NodeModel;

    struct CountingParser {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FragmentParser for CountingParser {
        async fn parse(
            &self,
            fragment: &str,
        ) -> Result<GraphModel> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            JsonFragmentParser.parse(fragment).await
        }
    }

    #[tokio::test]
    async fn test_json_parser() {
        let fragment = GraphModel::single(NodeModel::new("A", "bpmn:Task")).to_json().unwrap();
        let graph = JsonFragmentParser.parse(&fragment).await.unwrap();
        assert_eq!(graph.nodes[0].id, "A");

        assert!(JsonFragmentParser.parse("<bpmn/>").await.is_err());
    }

    #[tokio::test]
    async fn test_caching_parser_reuses_and_invalidates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let parser = CachingParser::new(
            CountingParser {
                calls: calls.clone(),
            },
            16,
        );
        let fragment = GraphModel::single(NodeModel::new("A", "bpmn:Task")).to_json().unwrap();

        parser.parse(&fragment).await.unwrap();
        parser.parse(&fragment).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        parser.invalidate();
        parser.parse(&fragment).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_caching_parser_keeps_fragments_apart() {
        let calls = Arc::new(AtomicUsize::new(0));
        let parser = CachingParser::new(
            CountingParser {
                calls: calls.clone(),
            },
            16,
        );
        let a = GraphModel::single(NodeModel::new("A", "bpmn:Task")).to_json().unwrap();
        let b = GraphModel::single(NodeModel::new("B", "bpmn:Task")).to_json().unwrap();

        assert_eq!(parser.parse(&a).await.unwrap().nodes[0].id, "A");
        assert_eq!(parser.parse(&b).await.unwrap().nodes[0].id, "B");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert_eq!(parser.parse(&a).await.unwrap().nodes[0].id, "A");
        assert_eq!(parser.parse(&b).await.unwrap().nodes[0].id, "B");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_caching_parser_does_not_cache_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let parser = CachingParser::new(
            CountingParser {
                calls: calls.clone(),
            },
            16,
        );

        assert!(parser.parse("not json").await.is_err());
        assert!(parser.parse("not json").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
