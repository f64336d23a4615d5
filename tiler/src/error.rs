use std::{borrow::Cow, fmt::Display};

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A [`LimiterChange`](crate::input::Input::LimiterChange) or an initial
    /// [`EngineConfig`](crate::engine::EngineConfig) limiter doesn't match the engine's
    /// configured output shape (list vs. map). Fatal.
    ShapeMismatch,

    /// The neighbored cursor fetcher was asked to fetch a query with no seeded token and
    /// no way to learn one. Fatal.
    InvalidCursorSeed,

    /// A user-supplied `CustomList`/`CustomMap` transform panicked or otherwise failed.
    /// Fatal; the engine does not attempt to mask transform bugs.
    CustomTransformFailed,

    /// An index passed to [`TiledList::query_at`](crate::tiled_list::TiledList::query_at) or
    /// a related accessor was out of bounds. Caller-facing; does not poison engine state.
    IndexOutOfBounds,

    /// The engine's input or output channel was dropped out from under it. Fatal.
    EngineStopped,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ErrorKind::ShapeMismatch => {
                write!(f, "limiter shape does not match the engine's output shape")
            }
            ErrorKind::InvalidCursorSeed => {
                write!(f, "no seeded continuation token for the requested query")
            }
            ErrorKind::CustomTransformFailed => write!(f, "custom order transform failed"),
            ErrorKind::IndexOutOfBounds => write!(f, "index out of bounds"),
            ErrorKind::EngineStopped => write!(f, "engine has stopped"),
        }
    }
}

impl ErrorKind {
    pub fn with_source(self, source: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::from(self).with_source(source)
    }

    pub fn with_message(self, message: impl Into<Cow<'static, str>>) -> Error {
        Error::from(self).with_message(message)
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    message: Option<Cow<'static, str>>,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            source: None,
            message: None,
        }
    }
}

impl Error {
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn into_source(self) -> Option<Box<dyn std::error::Error + Send + Sync>> {
        self.source
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{message}"),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let source = self.source.as_ref()?;
        Some(&**source)
    }
}
