//! Canonical value types with stable serialisation.
//!
//! Every entity here round-trips through `serde_json` and hashes through
//! [`canon`], so `hash(x) == hash(deserialise(serialise(x)))` holds for
//! all of them by construction rather than by convention.

pub mod block;
pub mod canon;
pub mod model_ref;
pub mod proof;
pub mod signed_transaction;
pub mod transaction;

pub use block::Block;
pub use model_ref::ModelRef;
pub use proof::Proof;
pub use signed_transaction::SignedTransaction;
pub use transaction::Transaction;

/// Upper bound (exclusive) on the length of any free-form string field
/// (`Transaction::message`, `Proof::citation`/`license`/`message`).
pub const MAX_STRING_LENGTH: usize = 1024;
