//! nsxpath - Namespace-aware XPath queries over XML documents
//!
//! Pipeline:
//! 1. Load: inline text or one HTTP(S) GET ([`Loader`])
//! 2. Parse: strict XML 1.0 + namespaces into an arena DOM ([`XmlDocument`])
//! 3. Compile: XPath 1.0 text + prefix bindings ([`CompiledExpression`])
//! 4. Select: node-set in document order ([`select`])
//! 5. Normalize: owned, serializable records ([`OutputRecord`])
//!
//! ```
//! use nsxpath::{query_document, NamespaceBindings};
//!
//! let bindings = NamespaceBindings::new().with("p", "urn:p").unwrap();
//! let records = query_document(b"<r xmlns:x='urn:p'><x:a>hi</x:a></r>", "//p:a/text()", &bindings).unwrap();
//! assert_eq!(records[0].data, "hi");
//! ```

mod core;

pub mod cardinality;
pub mod config;
pub mod dom;
pub mod error;
pub mod loader;
pub mod normalize;
pub mod query;
pub mod reader;
pub mod strategy;
pub mod xpath;

pub use cardinality::{expect_one, CardinalityError};
pub use config::{EngineConfig, LoaderConfig};
pub use dom::{Node, NodeKind, XmlDocument};
pub use error::{
    BindingError, CompileError, EvalError, LoadError, ParseError, ParseErrorKind, Position, QueryError, SourceError,
};
pub use loader::{DocumentSource, Loader};
pub use normalize::{normalize, AttributeRecord, OutputRecord};
pub use query::{query_document, QueryEngine, QueryRequest};
pub use strategy::{evaluate_parallel, select_parallel};
pub use xpath::{compile, evaluate, select, CompiledExpression, ExpressionCache, NamespaceBindings, XPathValue};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
