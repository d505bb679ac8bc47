use accel_utils::Error as AccelError;
use thiserror::Error;

/// A type alias for a result with an [BoxedSimError] as the error type
pub type SimResult<T> = Result<T, BoxedSimError>;

/// A wrapper type for [SimError]. This exists to allow a smaller return
/// size for results since the error type is large.
pub struct BoxedSimError(Box<SimError>);

impl BoxedSimError {
    /// Consume the wrapper and return the inner error
    pub fn into_inner(self) -> SimError {
        *self.0
    }
}

impl std::fmt::Display for BoxedSimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&*self.0, f)
    }
}

impl std::fmt::Debug for BoxedSimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self, f)
    }
}

impl std::error::Error for BoxedSimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl std::ops::Deref for BoxedSimError {
    type Target = SimError;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> From<T> for BoxedSimError
where
    T: Into<SimError>,
{
    fn from(e: T) -> Self {
        Self(Box::new(T::into(e)))
    }
}

/// Two drivers of one port were active in the same cycle.
#[derive(Debug)]
pub struct ConflictingAssignments {
    pub port: String,
    pub first: String,
    pub second: String,
}

/// An enum representing the different types of errors that can occur while
/// loading data into or simulating a design
#[derive(Error)]
pub enum SimError {
    /// The design itself was rejected
    #[error(transparent)]
    Design(#[from] AccelError),

    /// Multiple assignments drive the same port in one cycle
    #[error(
        "conflicting assignments to `{}' in one cycle\n  1. {}\n  2. {}",
        .0.port, .0.first, .0.second
    )]
    ConflictingAssignments(Box<ConflictingAssignments>),

    /// Combinational logic kept changing
    #[error("combinational logic did not settle after {passes} passes")]
    CombinationalLoop { passes: usize },

    /// The control program did not finish within the cycle budget
    #[error("design did not finish within {cycles} cycles")]
    Stalled { cycles: u64 },

    #[error(
        "invalid memory access to `{memory}'. Given address {addr} but memory has {size} entries"
    )]
    InvalidMemoryAccess {
        memory: String,
        addr: u64,
        size: usize,
    },

    #[error(
        "memory `{memory}' holds {size} entries but the data file provides {given}"
    )]
    IncorrectMemorySize {
        memory: String,
        size: usize,
        given: usize,
    },

    #[error("value {value} for memory `{memory}' does not fit in {width} bits")]
    ValueOutOfRange {
        memory: String,
        value: u64,
        width: u64,
    },

    #[error("no memory named `{0}'")]
    UnknownMemory(String),

    #[error("no register named `{0}'")]
    UnknownRegister(String),

    #[error("unsupported data format for `{memory}': {msg}")]
    UnsupportedFormat { memory: String, msg: String },

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// this is silly but needed to make the program print something sensible when
// returning a result from `main`
impl std::fmt::Debug for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl From<ConflictingAssignments> for SimError {
    fn from(value: ConflictingAssignments) -> Self {
        Self::ConflictingAssignments(Box::new(value))
    }
}
