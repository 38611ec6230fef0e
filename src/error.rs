//! Error types surfaced by every layer of the core.

use thiserror::Error;

/// Errors the core can return. One variant per error *kind*, not per call site.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("memory exhausted")]
    MemoryExhausted,

    #[error("bad path: {0}")]
    BadPath(String),

    #[error("path too long: {0}")]
    PathTooLong(String),

    #[error("failed to open {what}: {source}")]
    OpenFailed {
        what: String,
        #[source]
        source: std::io::Error,
    },

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("seek failed: {0}")]
    SeekFailed(String),

    #[error("unexpected format: {0}")]
    UnexpectedFormat(String),

    #[error("book is not bound")]
    NotBound,

    #[error("no such subbook: {0}")]
    NoSuchSubbook(usize),

    #[error("no such font: {0:?}")]
    NoSuchFont(u16),

    #[error("no such search method")]
    NoSuchSearchMethod,

    #[error("no current subbook")]
    NoCurrentSubbook,

    #[error("no current font")]
    NoCurrentFont,

    #[error("no current binary")]
    NoCurrentBinary,

    #[error("mixing text/heading/raw content modes in one seek")]
    WrongContentMode,

    #[error("end of content")]
    EndOfContent,

    #[error("stop code encountered")]
    StopCodeEncountered,

    #[error("no previous search")]
    NoPreviousSearch,

    #[error("no candidates")]
    NoCandidates,

    #[error("bad word: {0}")]
    BadWord(String),

    #[error("empty word")]
    EmptyWord,

    #[error("word too long ({0} bytes, max 255)")]
    TooLongWord(usize),

    #[error("too many words ({0}, max {1})")]
    TooManyWords(usize, usize),
}

/// Crate-local `Result` alias, matching the teacher's `error::Result` convention.
pub type Result<T> = std::result::Result<T, Error>;
