#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("FS: {0}")]
    Fs(#[from] FsError),
    #[error("Unknown or malformed command")]
    MalformedCommand,
}

#[derive(thiserror::Error, Debug)]
pub enum FsError {
    #[error("Block index {0} out of range")]
    InvalidBlockIndex(u32),
    #[error("Corrupt chain at block {0}")]
    CorruptChain(u32),
    #[error("Not enough free space")]
    OutOfSpace,
    #[error("No free file-list entries")]
    DirectoryFull,
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("A file named '{0}' already exists")]
    NameCollision(String),
    #[error("Refusing to store empty file: {0}")]
    EmptyFile(String),
}

pub type Result<T> = core::result::Result<T, Error>;
