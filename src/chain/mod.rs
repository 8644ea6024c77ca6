//! Backend-independent core: failure classification, normalization helpers
//! and the credential-indirection validity resolver.

pub mod classify;
pub mod normalize;
pub mod validity;

pub use classify::{BackendFailure, Classify, ClassifyExt};
pub use validity::{CredentialOutput, CredentialUtxoIndex, OutputRef, is_box_unspent};
