//! The protected resource behind a [`PaymentGate`](crate::PaymentGate).

use serde::Serialize;
use std::sync::Arc;

/// Produces the artifact a client has paid for.
///
/// Called only after settlement succeeded, and never sees payment internals.
pub trait ResourceHandler {
    /// The artifact. Serialized into the JSON body of the `200` response.
    type Artifact: Serialize;

    fn deliver(&self) -> Result<Self::Artifact, ResourceError>;
}

impl<T: ResourceHandler> ResourceHandler for Arc<T> {
    type Artifact = T::Artifact;

    fn deliver(&self) -> Result<Self::Artifact, ResourceError> {
        self.as_ref().deliver()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Resource unavailable: {0}")]
    Unavailable(String),
}
