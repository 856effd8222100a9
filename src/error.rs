use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Unsupported character: {0:?}")]
    UnsupportedCharacter(char),

    #[error("Unknown Morse symbol: {0:?}")]
    UnknownSymbol(String),

    #[error("Invalid speed: {0} (must be a positive, finite number)")]
    InvalidSpeed(f64),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Curriculum exhausted: every character is already active")]
    CurriculumExhausted,

    #[error("No drill item is waiting for a response")]
    NoPendingDrill,

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings Parsing Error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Settings Serialization Error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type TrainerResult<T> = Result<T, TrainerError>;
