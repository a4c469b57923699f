//! Error types for instance loading, CLI validation and internal arithmetic.

use thiserror::Error;

/// Top-level error type returned by every fallible entry point of this crate.
///
/// Bad input (missing/malformed instance files, unknown CLI enum values,
/// score overflow) is reported through this type instead of panicking, so
/// the driver can log a diagnostic and exit with code 1.
#[derive(Debug, Error)]
pub enum WvcpError {
    /// Could not read an instance or weight file.
    #[error("failed to read {path}: {source}")]
    Io {
        /// path that failed to read
        path: String,
        /// underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The DIMACS edge-list grammar did not parse.
    #[error("malformed DIMACS file {path}: {reason}")]
    DimacsParse {
        /// path of the offending file
        path: String,
        /// human readable parse failure
        reason: String,
    },

    /// The `.col.w` weight file did not have exactly `n` positive integers.
    #[error("weight file {path} has {found} entries, expected {expected}")]
    WeightFileLength {
        /// path of the offending file
        path: String,
        /// number of weights actually read
        found: usize,
        /// number of vertices in the graph
        expected: usize,
    },

    /// A weight was zero or could not be parsed as a positive integer.
    #[error("invalid vertex weight in {path}: {reason}")]
    InvalidWeight {
        /// path of the offending file
        path: String,
        /// human readable description
        reason: String,
    },

    /// A CLI flag held a value outside its closed set of choices.
    #[error("unknown value {value:?} for --{flag}")]
    UnknownEnumValue {
        /// flag name, without the leading `--`
        flag: String,
        /// value supplied on the command line
        value: String,
    },

    /// A score computation would have overflowed `i32`.
    #[error("score overflow while computing {context}")]
    ScoreOverflow {
        /// which computation overflowed, for diagnostics
        context: String,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WvcpError>;
