//! Error types for transport credential construction

use thiserror::Error;

type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while building a transport credential.
///
/// Exactly two stages can fail, and both are fatal, non-retryable startup
/// errors: the caller must abort instead of degrading to plaintext.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The certificate/private-key pair could not be read or parsed.
    #[error("load tls key-pair error: {source}")]
    Keypair {
        #[source]
        source: BoxedCause,
    },

    /// The CA bundle could not be read, or mutual TLS was requested and the
    /// bundle yielded no usable trust anchors.
    #[error("load ca cert error: {source}")]
    CaBundle {
        #[source]
        source: BoxedCause,
    },
}

impl CredentialError {
    pub(crate) fn keypair(source: impl Into<BoxedCause>) -> Self {
        Self::Keypair {
            source: source.into(),
        }
    }

    pub(crate) fn ca_bundle(source: impl Into<BoxedCause>) -> Self {
        Self::CaBundle {
            source: source.into(),
        }
    }

    /// Stage identifier for log fields and startup diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Keypair { .. } => "keypair",
            Self::CaBundle { .. } => "ca-bundle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_stable() {
        let keypair = CredentialError::keypair("bad key");
        let ca = CredentialError::ca_bundle("missing file");

        assert_eq!(keypair.stage(), "keypair");
        assert_eq!(ca.stage(), "ca-bundle");
    }

    #[test]
    fn display_includes_cause() {
        let err = CredentialError::keypair("unsupported key format");
        assert!(err.to_string().contains("unsupported key format"));
    }
}
