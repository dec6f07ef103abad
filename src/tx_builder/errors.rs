//! Error types for the trade composer
//!
//! One error enum covers every fault the composer can raise. Faults are
//! reserved for programmer errors (bad seeds, malformed lookup tables) and
//! transport failures (RPC lookups, blockhash fetch, pricing service).
//!
//! A missing wallet is *not* a fault: it is reported as a typed failure on
//! [`TransactionResult`](crate::tx_builder::TransactionResult). Appraisal
//! service failures are likewise recovered into
//! [`AppraisalOutcome::Failed`](crate::tx_builder::AppraisalOutcome).

use thiserror::Error;

/// Comprehensive error type for all composer operations
#[derive(Error, Debug)]
pub enum ComposeError {
    /// Seeds could not produce a program-derived address
    ///
    /// Raised when a seed component is longer than 32 bytes, more than 16
    /// components are supplied, or no bump yields an off-curve address.
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    /// Pool lookup table does not match the positional schema
    #[error("Lookup table error (table={table}): {reason}")]
    LookupTable {
        /// Address of the offending table
        table: String,
        /// What was wrong with its contents
        reason: String,
    },

    /// A buy was requested against a pool context that has no fraction mint
    #[error("Fraction mint required to buy from pool {0}")]
    MissingFractionMint(String),

    /// A programmable asset was supplied without its rule-set account
    #[error("Programmable asset {0} has no programmable config")]
    MissingProgrammableConfig(String),

    /// Amount arithmetic overflowed or produced an unusable value
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Failed to build an instruction for a specific program
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild {
        /// The program the instruction targets
        program: String,
        /// Detailed reason for the failure
        reason: String,
    },

    /// Instruction list does not follow compute-budget → prerequisites → trade
    #[error("Invalid instruction order: {0}")]
    InvalidInstructionOrder(String),

    /// v0 message compilation against the lookup tables failed
    #[error("Message compile error: {0}")]
    MessageCompile(String),

    /// RPC read or submit failure
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Failed to fetch a recent blockhash
    #[error("Blockhash error: {0}")]
    Blockhash(String),

    /// Appraisal service returned something unusable
    ///
    /// Only surfaced by the low-level service client; the gate folds it
    /// into an `AppraisalOutcome::Failed`.
    #[error("Appraisal service error: {0}")]
    AppraisalService(String),

    /// Pricing service could not be reached or answered with an error
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Wallet refused or failed to sign
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Configuration or validation error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Encoding of instruction arguments or transactions failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Wrapped error from external crates
    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl ComposeError {
    /// Check if this error is potentially retryable
    ///
    /// The composer never retries on its own; this is a hint for callers
    /// deciding whether recomposing the whole trade is worthwhile.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rpc(_) => true,
            Self::Blockhash(_) => true,
            Self::ServiceUnavailable(_) => true,
            Self::AppraisalService(_) => true,

            Self::InvalidSeed(_) => false,
            Self::LookupTable { .. } => false,
            Self::MissingFractionMint(_) => false,
            Self::MissingProgrammableConfig(_) => false,
            Self::InvalidAmount(_) => false,
            Self::InstructionBuild { .. } => false,
            Self::InvalidInstructionOrder(_) => false,
            Self::MessageCompile(_) => false,
            Self::Signing(_) => false,
            Self::Configuration(_) => false,
            Self::Serialization(_) => false,
            Self::External(_) => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidSeed(_) => "derivation",
            Self::LookupTable { .. } => "lookup_table",
            Self::MissingFractionMint(_) => "request",
            Self::MissingProgrammableConfig(_) => "metadata",
            Self::InvalidAmount(_) => "amount",
            Self::InstructionBuild { .. } => "instruction",
            Self::InvalidInstructionOrder(_) => "validation",
            Self::MessageCompile(_) => "message",
            Self::Rpc(_) => "rpc",
            Self::Blockhash(_) => "blockhash",
            Self::AppraisalService(_) => "appraisal",
            Self::ServiceUnavailable(_) => "pricing",
            Self::Signing(_) => "signing",
            Self::Configuration(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::External(_) => "external",
        }
    }
}

// Convenience constructors for common error scenarios
impl ComposeError {
    /// Create an invalid seed error
    pub fn invalid_seed(reason: impl Into<String>) -> Self {
        Self::InvalidSeed(reason.into())
    }

    /// Create a lookup table schema error
    pub fn lookup_table(table: impl ToString, reason: impl Into<String>) -> Self {
        Self::LookupTable {
            table: table.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an instruction build error for a specific program
    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid instruction order error
    pub fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidInstructionOrder(reason.into())
    }

    /// Create a blockhash error
    pub fn blockhash_unavailable(reason: impl Into<String>) -> Self {
        Self::Blockhash(reason.into())
    }
}

impl From<std::io::Error> for ComposeError {
    fn from(err: std::io::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for ComposeError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
