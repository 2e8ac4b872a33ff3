use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::io;
use std::ops::Deref;
use std::panic::Location;

/// The kind of failure that occurred, independent of the message attached to it.
///
/// `OutOfMemory` exists for API completeness (it mirrors the C source this
/// crate was modeled on, which treats allocation failure as a recoverable
/// condition) but this crate's own code never constructs it: Rust's global
/// allocator aborts the process on allocation failure rather than returning
/// a `Result`, so there is nothing for this crate to catch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    OutOfMemory,
    Io,
    OutOfRangeSeek,
    InflateEof,
    InflateCorrupt,
    NotSeekable,
    NotDuplicable,
    /// Compression method other than 0 (stored) or 8 (deflated).
    Unsupported,
    /// Only constructed when built with the `crc32` feature.
    Crc32Mismatch,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::OutOfMemory => "out of memory",
            ErrorKind::Io => "io error",
            ErrorKind::OutOfRangeSeek => "out-of-range seek offset",
            ErrorKind::InflateEof => "unexpected EOF",
            ErrorKind::InflateCorrupt => "corrupted input data",
            ErrorKind::NotSeekable => "the stream is not seekable",
            ErrorKind::NotDuplicable => "the stream cannot be duplicated",
            ErrorKind::Unsupported => "unsupported compression method",
            ErrorKind::Crc32Mismatch => "CRC-32 mismatch",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct ZipError {
    pub kind: ErrorKind,
    pub message: Option<String>,
    pub context: Option<String>,
    pub source: Option<Box<dyn Error + Send + Sync>>,
    pub location: &'static Location<'static>,
}

pub type Res<T> = Result<T, ZipError>;

impl Error for ZipError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.source {
            Some(ref err) => Some(err.deref()),
            None => None,
        }
    }
}

impl Display for ZipError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: ", context)?;
        }
        match &self.message {
            Some(message) => write!(f, "{}", message)?,
            None => write!(f, "{}", self.kind)?,
        }
        if let Some(cause) = &self.source {
            write!(f, "\ncaused by {} (at {})", cause, self.location)?;
        }
        Ok(())
    }
}

impl From<ZipError> for io::Error {
    fn from(value: ZipError) -> Self {
        let kind = match value.kind {
            ErrorKind::OutOfRangeSeek => io::ErrorKind::InvalidInput,
            ErrorKind::NotSeekable | ErrorKind::NotDuplicable | ErrorKind::Unsupported => {
                io::ErrorKind::Unsupported
            }
            ErrorKind::Io => io::ErrorKind::Other,
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, value)
    }
}

impl From<ErrorBuilder> for ZipError {
    #[track_caller]
    fn from(
        ErrorBuilder {
            kind,
            message,
            context,
            source,
        }: ErrorBuilder,
    ) -> Self {
        Self {
            kind,
            message,
            context,
            source,
            location: Location::caller(),
        }
    }
}

pub(crate) struct ErrorBuilder {
    pub kind: ErrorKind,
    pub message: Option<String>,
    pub context: Option<String>,
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl ErrorBuilder {
    pub fn new(kind: ErrorKind) -> Self {
        ErrorBuilder {
            kind,
            message: None,
            context: None,
            source: None,
        }
    }

    pub fn msg(kind: ErrorKind, message: impl Into<String>) -> Self {
        ErrorBuilder {
            kind,
            message: Some(message.into()),
            context: None,
            source: None,
        }
    }
}

impl Debug for ErrorBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorBuilder")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

pub(crate) trait ResultBuilder<T> {
    fn context<F: FnOnce() -> String>(self, ctx: F) -> Result<T, ErrorBuilder>;
}

impl<T> ResultBuilder<T> for Result<T, ErrorBuilder> {
    fn context<F: FnOnce() -> String>(self, ctx: F) -> Self {
        self.map_err(|e| ErrorBuilder {
            context: Some(ctx()),
            ..e
        })
    }
}

/// Attach an io/parse error as the `source` of a new `ErrorBuilder` of the
/// given `kind`, preserving whatever `context` the call site already
/// described (see `ErrorContext::describe`).
pub(crate) trait WithContext<T, C: ErrorContext> {
    fn at(self, kind: ErrorKind, context: &C) -> Result<T, ErrorBuilder>;
}

impl<T, E: Error + 'static + Send + Sync, C: ErrorContext> WithContext<T, C> for Result<T, E> {
    fn at(self, kind: ErrorKind, context: &C) -> Result<T, ErrorBuilder> {
        self.map_err(|e| ErrorBuilder {
            kind,
            message: None,
            context: context.describe(),
            source: Some(Box::new(e)),
        })
    }
}

pub(crate) trait ErrorContext {
    fn describe(&self) -> Option<String> {
        None
    }

    fn raise<T>(&self, kind: ErrorKind, msg: impl Into<String>) -> Result<T, ErrorBuilder> {
        Err(ErrorBuilder {
            kind,
            message: Some(msg.into()),
            context: self.describe(),
            source: None,
        })
    }
}
