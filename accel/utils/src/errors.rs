//! Errors generated while constructing and checking designs.
use crate::Id;
use thiserror::Error as ThisError;

/// Convinience wrapper to represent success or meaningul error.
pub type AccelResult<T> = Result<T, Error>;

/// Errors generated while building or checking a design. Every variant is a
/// construction-time rejection: a design that produces one is never
/// accepted, partially or otherwise.
#[derive(ThisError, Clone, PartialEq, Eq)]
pub enum Error {
    /// The structure of the design is illegal (bad port direction, holes
    /// used incorrectly, attributes in the wrong place, ...).
    #[error("Malformed Structure: {0}")]
    MalformedStructure(String),

    /// The control program is illegal.
    #[error("Malformed Control: {0}")]
    MalformedControl(String),

    /// A reference to something that was never declared.
    #[error("Undefined {kind}: {name}")]
    Undefined { name: Id, kind: String },

    /// A name was declared twice within the same scope.
    #[error("Name `{name}' is already bound by a {kind}")]
    AlreadyBound { name: Id, kind: String },

    /// Two connected ports disagree on their bit width.
    #[error("Width mismatch: {0}")]
    WidthMismatch(String),

    /// Two drivers of the same destination might be enabled in one cycle.
    #[error("Conflicting drivers for `{port}': {msg}")]
    ConflictingDrivers { port: String, msg: String },

    /// A combinational path leads from a port back to itself.
    #[error("Combinational cycle: {0}")]
    CombinationalCycle(String),

    /// Data or parameters exceed what the declared hardware can hold.
    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    /// A file could not be read or parsed.
    #[error("Invalid file: {0}")]
    InvalidFile(String),

    /// Writing output failed.
    #[error("Write error: {0}")]
    WriteError(String),

    #[error("{0}")]
    Misc(String),
}

impl Error {
    pub fn malformed_structure<S: ToString>(msg: S) -> Self {
        Self::MalformedStructure(msg.to_string())
    }

    pub fn malformed_control<S: ToString>(msg: S) -> Self {
        Self::MalformedControl(msg.to_string())
    }

    pub fn undefined<S: ToString>(name: Id, kind: S) -> Self {
        Self::Undefined {
            name,
            kind: kind.to_string(),
        }
    }

    pub fn already_bound<S: ToString>(name: Id, kind: S) -> Self {
        Self::AlreadyBound {
            name,
            kind: kind.to_string(),
        }
    }

    pub fn width_mismatch<S: ToString>(msg: S) -> Self {
        Self::WidthMismatch(msg.to_string())
    }

    pub fn conflicting_drivers<P: ToString, S: ToString>(
        port: P,
        msg: S,
    ) -> Self {
        Self::ConflictingDrivers {
            port: port.to_string(),
            msg: msg.to_string(),
        }
    }

    pub fn comb_cycle<S: ToString>(msg: S) -> Self {
        Self::CombinationalCycle(msg.to_string())
    }

    pub fn capacity<S: ToString>(msg: S) -> Self {
        Self::Capacity(msg.to_string())
    }

    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Self::InvalidFile(msg.to_string())
    }

    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self::WriteError(msg.to_string())
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Self::Misc(msg.to_string())
    }

    /// Return a short name for the kind of error, used by tests to match on
    /// a class of failure without depending on message text.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedStructure(_) => "malformed-structure",
            Error::MalformedControl(_) => "malformed-control",
            Error::Undefined { .. } => "undefined",
            Error::AlreadyBound { .. } => "already-bound",
            Error::WidthMismatch(_) => "width-mismatch",
            Error::ConflictingDrivers { .. } => "conflicting-drivers",
            Error::CombinationalCycle(_) => "combinational-cycle",
            Error::Capacity(_) => "capacity",
            Error::InvalidFile(_) => "invalid-file",
            Error::WriteError(_) => "write-error",
            Error::Misc(_) => "misc",
        }
    }
}

// Print the message on failure when returned from `main`.
impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::invalid_file(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::write_error(format!("IO Error: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::invalid_file(format!("JSON Error: {err}"))
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::write_error(err)
    }
}
