#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// The requested cutoff is larger than half of the smallest spacing
    /// between lattice planes, and the minimum image convention would miss
    /// some interactions
    InvalidCutoff(String),
    /// An internal coordinate is not defined for the current geometry (e.g. a
    /// dihedral angle over three collinear atoms)
    DegenerateGeometry(String),
    /// The bonded topology contains duplicated or self-referencing entries,
    /// or atomic indexes out of bounds
    InconsistentTopology(String),
    /// The operation requires a different number of periodic dimensions
    UnsupportedCellDimension(String),
    /// Got an invalid parameter value in a function
    InvalidParameter(String),
    /// Error while serializing/deserializing data
    Json(serde_json::Error),
    /// Some internal invariant was broken
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidCutoff(e) => write!(f, "invalid cutoff: {}", e),
            Error::DegenerateGeometry(e) => write!(f, "degenerate geometry: {}", e),
            Error::InconsistentTopology(e) => write!(f, "inconsistent topology: {}", e),
            Error::UnsupportedCellDimension(e) => write!(f, "unsupported cell dimension: {}", e),
            Error::InvalidParameter(e) => write!(f, "invalid parameter: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidCutoff(_) |
            Error::DegenerateGeometry(_) |
            Error::InconsistentTopology(_) |
            Error::UnsupportedCellDimension(_) |
            Error::InvalidParameter(_) |
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let error = Error::InvalidCutoff("cutoff is too large".into());
        assert_eq!(error.to_string(), "invalid cutoff: cutoff is too large");

        let error = Error::DegenerateGeometry("collinear atoms".into());
        assert_eq!(error.to_string(), "degenerate geometry: collinear atoms");
    }

    #[test]
    fn json_source() {
        let json_error = serde_json::from_str::<f64>("not a number").unwrap_err();
        let error = Error::from(json_error);
        assert!(std::error::Error::source(&error).is_some());
        assert!(error.to_string().starts_with("json error: "));
    }
}
