use thiserror::Error;

/// Misconfiguration detected before (or instead of) touching chain state.
///
/// Every variant is fatal for the invoking task; none of them is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unable to resolve network from: {0}")]
    UnknownNetwork(String),

    #[error("unknown forking network: {0}")]
    UnknownForkingNetwork(String),

    #[error("variable \"{0}\" is not defined")]
    MissingEnv(String),

    #[error("cannot resolve markets without a network (networkless execution context)")]
    Networkless,

    #[error("token symbols do not match: {actual} <> {expected}")]
    SymbolMismatch { expected: String, actual: String },

    #[error("cannot resolve unsupported oracle type: {0}")]
    UnsupportedOracle(String),

    #[error("no seconds-per-block configured for network {0}")]
    MissingSecondsPerBlock(String),

    #[error("invalid number for {field}: {reason}")]
    InvalidNumber { field: String, reason: String },

    #[error("invalid address {value:?}: {reason}")]
    InvalidAddress { value: String, reason: String },

    #[error("there is no configuration for market {0}")]
    UnknownMarket(String),

    #[error("invalid market catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}
