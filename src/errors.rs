#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Got an invalid parameter value in a function
    InvalidParameter(String),
    /// The cutoff radius is not usable for a neighbor search
    InvalidCutoff(String),
    /// The simulation box volume is zero or below the numerical tolerance
    DegenerateBox(String),
    /// An atom position contains NaN or infinite components
    InvalidPosition(String),
    /// A neighbor list was requested for a system containing no atoms
    EmptyAtomSet,
    /// The requested ghost replication depth can not cover the cutoff
    InsufficientReplication(String),
    /// Error while serializing/deserializing data
    Json(serde_json::Error),
    /// Error used when a panic was caught
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidParameter(e) => write!(f, "invalid parameter: {}", e),
            Error::InvalidCutoff(e) => write!(f, "invalid cutoff: {}", e),
            Error::DegenerateBox(e) => write!(f, "degenerate simulation box: {}", e),
            Error::InvalidPosition(e) => write!(f, "invalid atom position: {}", e),
            Error::EmptyAtomSet => write!(f, "the system does not contain any atom"),
            Error::InsufficientReplication(e) => write!(f, "insufficient ghost replication: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidParameter(_) |
            Error::InvalidCutoff(_) |
            Error::DegenerateBox(_) |
            Error::InvalidPosition(_) |
            Error::EmptyAtomSet |
            Error::InsufficientReplication(_) |
            Error::Internal(_) => None,
            Error::Json(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}
