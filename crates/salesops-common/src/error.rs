use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// No database connection could be acquired. Nothing was opened.
    #[error("connection error: {0}")]
    Connection(String),

    /// Reading or writing the version record failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A single statement inside a migration file failed. The file's
    /// transaction has already been rolled back when this is returned.
    #[error("statement failed in {file}: {message}")]
    Statement {
        file: String,
        statement: String,
        message: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> u8 {
        1
    }
}
