//! Order persistence layer
//!
//! - **key**: order id → storage key, plus the index set name
//! - **codec**: order ⇄ JSON payload, schema-checked on decode
//! - **repository**: [`OrderRepository`], the five operations and the
//!   record/index consistency discipline
//!
//! # Data Flow
//!
//! ```text
//! caller → OrderRepository → key::order_key → codec::encode/decode
//!                 ↓
//!          KvStore (single command, or Transaction for two-write units)
//!                 ↓
//!          Order / RepoError back to caller
//! ```

pub mod codec;
pub mod error;
pub mod key;
pub mod repository;

// Re-exports
pub use codec::CodecError;
pub use error::{RepoError, RepoResult};
pub use key::{ORDERS_INDEX, order_key, parse_order_key};
pub use repository::{DEFAULT_PAGE_SIZE, FindAllPage, FindResult, OrderRepository};
