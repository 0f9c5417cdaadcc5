use thiserror::Error;

/// Errors produced while decoding or validating a [`crate::codec::frame::DataFrame`].
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("corrupt frame in `{op}`: expected at least {expected} bytes, found {found} (type={type_tag:?})")]
    CorruptFrame {
        op: &'static str,
        type_tag: Option<u8>,
        expected: usize,
        found: usize,
    },
    #[error("unknown type tag {0} while decoding frame")]
    UnknownTypeTag(u8),
    #[error("type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch { expected: &'static str, found: &'static str },
}

/// Errors specific to the compound container operations (List/Set/Map/TimeSeries/Bloom).
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("key `{0}` already exists")]
    AlreadyExists(String),
    #[error("list `{0}` is empty")]
    Empty(String),
    #[error("index {index} out of range for list `{key}` (head={head}, tail={tail})")]
    IndexOutOfRange { key: String, index: i64, head: i64, tail: i64 },
    #[error("unsupported element type for container operation: {0}")]
    UnsupportedType(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors surfaced by the underlying ordered byte-store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The full error taxonomy exposed at the `Operator` API boundary (spec §6).
#[derive(Error, Debug)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatchErr),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error("division by zero in `{0}`")]
    DivByZero(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Thin wrapper so `FrameError::TypeMismatch` can also be raised directly from
/// operator code without round-tripping through a frame decode.
#[derive(Error, Debug)]
#[error("type mismatch: expected {expected}, found {found}")]
pub struct TypeMismatchErr {
    pub expected: &'static str,
    pub found: &'static str,
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Error::Store(StoreError::Sled(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Store(StoreError::Io(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
