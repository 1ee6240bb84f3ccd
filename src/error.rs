use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("file {0} not found")]
    FileNotFoundError(String),

    #[error("i/o error")]
    IOError {
        #[from]
        source: std::io::Error,
    },

    #[error("could not parse configuration")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    #[error("(de)serialization failed")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid regular expression")]
    Regex {
        #[from]
        source: regex::Error,
    },

    #[error("invalid method descriptor \"{0}\"")]
    InvalidDescriptor(String),

    #[error("unknown mutation operator \"{0}\"")]
    UnknownOperator(String),

    #[error("could not create thread pool")]
    ThreadPool {
        #[from]
        source: rayon::ThreadPoolBuildError,
    },

    #[error("method {0} not found")]
    MethodNotFound(String),

    #[error("mutation {0} was not applied")]
    MutationNotFound(String),

    #[error("cannot synthesize a default value for void ({context})")]
    DefaultForVoid { context: String },

    #[error("mutation identifier {0} registered twice")]
    IdentifierCollision(String),

    #[error("{operator}: replacement changes stack effect (expected {expected}, found {found})")]
    StackWidthMismatch {
        operator: String,
        expected: String,
        found: String,
    },

    #[error("stack underflow while simulating {0}")]
    StackUnderflow(String),

    #[error("{0} would exceed 65535 slots")]
    FrameOverflow(&'static str),
}

impl Error {
    /// Errors raised while rewriting a method body.
    ///
    /// A traversal hitting one of these aborts the current method body.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::DefaultForVoid { .. }
                | Error::IdentifierCollision(_)
                | Error::StackWidthMismatch { .. }
                | Error::StackUnderflow(_)
                | Error::FrameOverflow(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
