//! paragon-store - signature-keyed local record store
//!
//! Persists the results of external lookups so that repeated runs over the
//! same researcher never re-spend API quota. Records are addressed by a
//! blake3 signature over the relation and the query parameters and are
//! committed atomically via tmp-file rename.

pub mod hash;
pub mod signature;
pub mod store;

pub use signature::{make_signature, QuerySignature, Relation};
pub use store::{FetchError, LocalStore, RelationStatus, StoreError};
