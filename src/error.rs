use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers the decoding of the metadata image, configuration and patch loading, the
/// resolution pipeline and emission. Decoder failures carry the source location that detected
/// them, which makes reports about malformed input files actionable.
#[derive(Error, Debug)]
pub enum Error {
    /// The input data is damaged or does not follow ECMA-335.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// What was wrong with the data
        message: String,
        /// Source file that detected the problem
        file: &'static str,
        /// Source line that detected the problem
        line: u32,
    },

    /// A read would have crossed the end of the available data.
    #[error("Out of Bound read would have occurred! - {file}:{line}")]
    OutOfBounds {
        /// Source file that detected the problem
        file: &'static str,
        /// Source line that detected the problem
        line: u32,
    },

    /// A construct is valid metadata but cannot be expressed by the generator.
    #[error("Not supported - {0}")]
    NotSupported(String),

    /// Provided input was empty
    #[error("Provided input was empty")]
    Empty,

    /// Failure reported by the file system
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Failure reported by the PE parser
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// A nested signature exceeded the allowed depth
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// A referenced type is not present in the catalog or the type graph
    #[error("Failed to find type - {0}")]
    TypeNotFound(String),

    /// The selection configuration or the patch document is missing or malformed.
    #[error("Invalid configuration - {0}")]
    Configuration(String),

    /// A JSON document could not be deserialized
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// The requested architecture filter is not one of X86, X64 or Arm64.
    #[error("Unsupported architecture - {0}")]
    UnsupportedArchitecture(String),

    /// The resolution stack did not unwind in the order it was built.
    ///
    /// This is an internal consistency failure of the resolver, not a property of the input.
    #[error("Resolution stack mismatch - expected '{expected}', found '{found}'")]
    ResolutionStack {
        /// The node the caller expected at the top of the stack
        expected: String,
        /// The node that was actually there
        found: String,
    },

    /// An emitter could not render a unit
    #[error("Emit failure - {0}")]
    Emit(String),

    /// Formatting into the output buffer failed
    #[error("{0}")]
    Fmt(#[from] std::fmt::Error),
}
