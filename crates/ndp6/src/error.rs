//! Error types for the engine.

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors the engine can surface. Per the error-handling design, only
/// [`Error::ConstructionInvalid`] and [`Error::PreconditionViolated`] ever
/// cross a public call boundary; the rest are absorbed internally, logged,
/// and never returned to a caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Out-of-range or malformed configuration; the engine refuses to
    /// instantiate.
    #[error("invalid configuration: {0}")]
    ConstructionInvalid(String),

    /// A caller contract was breached (e.g. a route with `plen == 0`). This
    /// is a programming error, not a runtime condition.
    #[error("precondition violated: {0}")]
    PreconditionViolated(String),

    /// Stable-privacy derivation failed, or EUI-64 was asked to retry with
    /// no budget. Surfaced only internally: the address is dropped and the
    /// failure logged at warn-level.
    #[error("address synthesis failed: {0}")]
    AddressSynthesisFailed(String),

    /// `send_rs` returned an error. Deduplicated, non-fatal, does not
    /// cancel the retry schedule.
    #[error("transport send failed: {0}")]
    TransportSendFailed(String),

    /// A scoped namespace push failed; the current timer callback aborts
    /// early without mutating state.
    #[error("namespace entry failed: {0}")]
    NamespaceEntryFailed(String),

    /// Failed to parse an `EngineConfig` from TOML.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl Error {
    /// True for configuration or precondition failures a caller can act on
    /// by fixing its input, rather than conditions the engine absorbs.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::ConstructionInvalid(_) | Error::PreconditionViolated(_) | Error::ConfigParse(_)
        )
    }

    /// True for conditions the engine expects to self-heal (link down,
    /// a single bad DAD attempt) rather than something a caller must act on.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::AddressSynthesisFailed(_) | Error::TransportSendFailed(_)
        )
    }
}
