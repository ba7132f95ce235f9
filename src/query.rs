//! Query pipeline
//!
//! load → parse → compile → select → normalize, as one call.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::dom::XmlDocument;
use crate::error::{CompileError, QueryError};
use crate::loader::{DocumentSource, Loader};
use crate::normalize::{normalize, OutputRecord};
use crate::xpath::{self, CompiledExpression, ExpressionCache, NamespaceBindings};

/// One query: where the document is, what to select, and the prefixes used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub expression: String,
    pub source: DocumentSource,
    #[serde(default)]
    pub bindings: NamespaceBindings,
}

/// Runs query requests with a shared HTTP client and expression cache
#[derive(Debug)]
pub struct QueryEngine {
    loader: Loader,
    cache: Option<ExpressionCache>,
}

impl QueryEngine {
    pub fn new(config: EngineConfig) -> Result<Self, QueryError> {
        Ok(QueryEngine {
            loader: Loader::new(config.loader)?,
            cache: ExpressionCache::new(config.cache_capacity),
        })
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Compile through the cache when one is configured
    pub fn compile(
        &self,
        expression: &str,
        bindings: &NamespaceBindings,
    ) -> Result<Arc<CompiledExpression>, CompileError> {
        match &self.cache {
            Some(cache) => cache.get_or_compile(expression, bindings),
            None => CompiledExpression::compile(expression, bindings).map(Arc::new),
        }
    }

    /// Run a request to completion
    ///
    /// The expression is compiled before the document is fetched, so a bad
    /// expression fails without network I/O.
    pub async fn run(&self, request: &QueryRequest) -> Result<Vec<OutputRecord>, QueryError> {
        let compiled = self.compile(&request.expression, &request.bindings)?;
        let bytes = self.loader.load(&request.source).await?;
        select_records(&bytes, &compiled)
    }

    /// Like [`run`](Self::run), abandoning the document fetch with
    /// `LoadError::Cancelled` once `cancel` completes
    pub async fn run_until<C>(&self, request: &QueryRequest, cancel: C) -> Result<Vec<OutputRecord>, QueryError>
    where
        C: Future<Output = ()>,
    {
        let compiled = self.compile(&request.expression, &request.bindings)?;
        let bytes = self.loader.load_until(&request.source, cancel).await?;
        select_records(&bytes, &compiled)
    }
}

/// Query an in-memory document; no I/O, no cache
pub fn query_document(
    bytes: &[u8],
    expression: &str,
    bindings: &NamespaceBindings,
) -> Result<Vec<OutputRecord>, QueryError> {
    let compiled = CompiledExpression::compile(expression, bindings)?;
    select_records(bytes, &compiled)
}

fn select_records(bytes: &[u8], compiled: &CompiledExpression) -> Result<Vec<OutputRecord>, QueryError> {
    let doc = XmlDocument::parse(bytes)?;
    let nodes = xpath::select(doc.document(), compiled)?;
    Ok(nodes.into_iter().map(normalize).collect())
}
