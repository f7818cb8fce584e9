//! Operation identifier derivation.
//!
//! The canonical name of an operation is
//!
//! ```text
//! "<return type> <owner namespace>::<operation name>"
//! e.g. "void MyMod::CmdSendHello"
//! ```
//!
//! and its identifier is the low 16 bits of a 32-bit FNV-1a hash of that
//! string. Both ends of a connection derive the id independently, so the
//! hash must not depend on a per-process seed (as `std`'s `RandomState`
//! does).

use plumber_protocol::OperationId;

use crate::{NetworkBehaviour, RegistryError};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the characters of `text`.
///
/// Each character contributes only its low byte, so the result is stable
/// for any input but only collision-resistant for ASCII names.
pub fn stable_hash(text: &str) -> u32 {
    text.chars().fold(FNV_OFFSET_BASIS, |hash, c| {
        (hash ^ (c as u32 & 0xff)).wrapping_mul(FNV_PRIME)
    })
}

/// Builds the canonical name of a declared operation.
pub fn full_name(returns: &str, namespace: &str, name: &str) -> String {
    format!("{returns} {namespace}::{name}")
}

/// Truncates the canonical name's hash to an [`OperationId`].
pub fn operation_id(full_name: &str) -> OperationId {
    OperationId((stable_hash(full_name) & 0xffff) as u16)
}

/// The wire identity of one operation: its canonical name and derived id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationKey {
    id: OperationId,
    full_name: String,
}

impl OperationKey {
    /// Resolves a declared operation of `B`.
    ///
    /// # Errors
    /// [`RegistryError::InvalidOperation`] if `B` doesn't declare `name`.
    pub fn resolve<B: NetworkBehaviour>(name: &str) -> Result<Self, RegistryError> {
        let sig = B::operation(name).ok_or_else(|| {
            RegistryError::InvalidOperation {
                owner: B::TYPE_NAME,
                name: name.to_string(),
            }
        })?;
        Ok(Self::from_full_name(full_name(sig.returns, B::NAMESPACE, sig.name)))
    }

    /// Key for an operation that has no declared signature, such as the
    /// update operations of a synced value. The name is used as given and
    /// the return type segment is left empty.
    pub fn synthetic<B: NetworkBehaviour>(name: &str) -> Self {
        Self::from_full_name(full_name("", B::NAMESPACE, name))
    }

    fn from_full_name(full_name: String) -> Self {
        Self {
            id: operation_id(&full_name),
            full_name,
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }
}
