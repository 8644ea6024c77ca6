//! Output validity through payment-credential indirection.
//!
//! Some indexers cannot answer "is this exact output unspent". They can
//! return a transaction with its outputs, and the set of unspent outputs
//! currently owned by a payment credential. [`is_box_unspent`] combines the
//! two: locate the output, take its credential, and look the exact
//! `(tx_id, index)` pair up in that credential's unspent set.
//!
//! The credential set is taken as authoritative at query time. It may lag
//! the chain tip slightly and no attempt is made to reconcile that.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{BoxId, ChainError};

/// An output of a fetched transaction, reduced to what the resolver needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialOutput {
    pub index: u32,
    /// Payment credential of the output address, if the backend sent one.
    pub payment_credential: Option<String>,
}

/// Reference to an unspent output in a credential's UTXO set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRef {
    pub tx_id: String,
    pub index: u32,
}

/// Backend queries the resolver is built on.
///
/// Errors returned here are already classified.
#[async_trait]
pub trait CredentialUtxoIndex: Send + Sync {
    /// Outputs of `tx_id`, or `None` if the transaction is unknown.
    async fn transaction_outputs(
        &self,
        tx_id: &str,
    ) -> Result<Option<Vec<CredentialOutput>>, ChainError>;

    /// Outputs currently unspent for `credential`.
    ///
    /// The answer must contain `box_id` whenever it is unspent. Backends
    /// that cap their result size narrow the lookup to `box_id`; entries for
    /// other outputs are ignored by the resolver.
    async fn unspent_outputs_for_credential(
        &self,
        credential: &str,
        box_id: &BoxId,
    ) -> Result<Vec<OutputRef>, ChainError>;
}

/// Resolves whether `box_id` is still unspent.
///
/// The three backend steps run strictly in sequence, each one feeding the
/// next.
pub async fn is_box_unspent<I>(index: &I, box_id: &BoxId) -> Result<bool, ChainError>
where
    I: CredentialUtxoIndex + ?Sized,
{
    let Some(outputs) = index.transaction_outputs(&box_id.tx_id).await? else {
        debug!(box_id = %box_id, "Owning transaction not found, box is not valid");
        return Ok(false);
    };

    let output = outputs
        .iter()
        .find(|output| output.index == box_id.index)
        .ok_or_else(|| {
            ChainError::unexpected(format!(
                "transaction [{}] has no output at index {}",
                box_id.tx_id, box_id.index
            ))
        })?;

    let credential = output.payment_credential.as_deref().ok_or_else(|| {
        ChainError::unexpected(format!("output [{box_id}] has no payment credential"))
    })?;

    let unspent = index.unspent_outputs_for_credential(credential, box_id).await?;
    let found = unspent
        .iter()
        .any(|utxo| utxo.tx_id == box_id.tx_id && utxo.index == box_id.index);

    debug!(box_id = %box_id, credential = %credential, unspent = found, "Resolved box validity");
    Ok(found)
}
