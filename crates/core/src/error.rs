use thiserror::Error;

/// Errors surfaced by the disruption engine.
///
/// Data-insufficiency is never an error: short or degenerate series are
/// scored `0`. Only configuration mistakes, lookup failures and loader
/// failures reach the caller.
#[derive(Error, Debug)]
pub enum DisruptorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Container '{container}' not found on machine '{machine_id}'")]
    ContainerNotFound {
        container: String,
        machine_id: String,
    },

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Scoring task failed: {0}")]
    Scoring(String),
}

impl From<serde_json::Error> for DisruptorError {
    fn from(e: serde_json::Error) -> Self {
        DisruptorError::Serialize(e.to_string())
    }
}

/// Failures reported by a metric loader. Passed through untouched.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid loader config: {0}")]
    InvalidConfig(String),

    #[error("Metric query failed: {0}")]
    Query(String),
}

/// Soft lookup outcome: "nothing there" is a result, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Discovery<T> {
    Found(T),
    Empty,
}

impl<T> Discovery<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Discovery::Empty)
    }

    /// Collapse into the found value, or `T::default()` when empty.
    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        match self {
            Discovery::Found(v) => v,
            Discovery::Empty => T::default(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DisruptorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_not_found_names_container() {
        let err = DisruptorError::ContainerNotFound {
            container: "redis-0".to_string(),
            machine_id: "node-a".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("redis-0"));
        assert!(msg.contains("node-a"));
    }

    #[test]
    fn loader_error_is_transparent() {
        let err: DisruptorError = LoaderError::Query("timeout".to_string()).into();
        assert_eq!(err.to_string(), "Metric query failed: timeout");
    }

    #[test]
    fn discovery_default() {
        let empty: Discovery<Vec<String>> = Discovery::Empty;
        assert!(empty.is_empty());
        assert!(empty.unwrap_or_default().is_empty());
        let found = Discovery::Found(vec!["a".to_string()]);
        assert_eq!(found.unwrap_or_default(), vec!["a".to_string()]);
    }
}
