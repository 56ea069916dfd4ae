use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum BakeError {
    /// No object matched the working-set predicate.
    SelectionEmpty,
    ModifierApply {
        object: String,
        modifier: String,
        reason: String,
    },
    Bake {
        object: String,
        reason: String,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    UnknownHandle(String),
    InvalidState(String),
    Serialization(String),
    /// A stage collected per-object failures that the next stage cannot tolerate.
    StageAborted {
        stage: &'static str,
        failures: Vec<String>,
    },
}

impl BakeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BakeError::Io { path: path.into(), source }
    }

    pub fn bake(object: impl Into<String>, reason: impl Into<String>) -> Self {
        BakeError::Bake { object: object.into(), reason: reason.into() }
    }
}

impl fmt::Display for BakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BakeError::SelectionEmpty => write!(f, "Selection Empty: no objects matched"),
            BakeError::ModifierApply { object, modifier, reason } => {
                write!(f, "Modifier Apply Failed: {}/{}: {}", object, modifier, reason)
            }
            BakeError::Bake { object, reason } => write!(f, "Bake Failed: {}: {}", object, reason),
            BakeError::Io { path, source } => write!(f, "IO Error: {}: {}", path.display(), source),
            BakeError::UnknownHandle(msg) => write!(f, "Unknown Handle: {}", msg),
            BakeError::InvalidState(msg) => write!(f, "Invalid State: {}", msg),
            BakeError::Serialization(msg) => write!(f, "Serialization Failed: {}", msg),
            BakeError::StageAborted { stage, failures } => {
                write!(f, "Stage Aborted: {} ({} failures: {})", stage, failures.len(), failures.join("; "))
            }
        }
    }
}

impl std::error::Error for BakeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BakeError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type BakeResult<T> = Result<T, BakeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_names_object_and_modifier() {
        let err = BakeError::ModifierApply {
            object: "ground.001".into(),
            modifier: "Boolean".into(),
            reason: "operand missing".into(),
        };
        assert_eq!(err.to_string(), "Modifier Apply Failed: ground.001/Boolean: operand missing");
    }

    #[test]
    fn io_error_exposes_source() {
        let err = BakeError::io("out/models.glb", std::io::Error::other("disk full"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("out/models.glb"));
    }
}
