//! Boolean filter language over annotated broadcast-video metadata.
//!
//! ```text
//! source text → lexer → parser → RawQuery → validator → optimizer → Query → requests
//! ```
//!
//! ```
//! use tvquery::{Query, Vocabulary, VocabularyConfig};
//!
//! let vocab = Vocabulary::from_config(&VocabularyConfig::default());
//! let query = Query::build(r#"channel=FOX AND text="climate change""#, &vocab, true).unwrap();
//! assert_eq!(
//!     query.main().unwrap().to_wire(),
//!     r#"["and",[["channel","FOXNEWS"],["text","climate change"]]]"#
//! );
//! ```

pub mod ast;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod query;
pub mod token;
pub mod tree;
pub mod validator;
pub mod vocabulary;

pub use config::VocabularyConfig;
pub use dispatch::{to_requests, Aggregation, DateRange, Dispatcher, Request, SearchBackend, SearchResult};
pub use error::{DispatchError, QueryError, QueryErrorKind, SyntaxError};
pub use query::{ParseMode, Query, QueryCompiler};
pub use token::Keywords;
pub use tree::{Key, Node, Value};
pub use vocabulary::{Vocabulary, VocabularyKind, VocabularyProvider};
