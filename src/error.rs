use std::path::PathBuf;

/// Errors that end a run. Everything else (a single kata failing to clone) is reported per item.
#[derive(Debug, thiserror::Error)]
pub enum KataError {
    #[error("fetching katas from {url}: {reason}")]
    Catalog { url: String, reason: String },

    #[error("parsing {path:?}: {source}")]
    LedgerParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serializing ledger for {path:?}: {source}")]
    LedgerSerialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("accessing {path:?}: {source}")]
    LedgerIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no such kata: {0}")]
    UnknownKata(String),

    #[error("we don't sort by {0} here")]
    UnknownSortKey(String),

    #[error("can't look {0} days back")]
    ReportWindow(u32),
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::KataError;

    #[test]
    fn test_serialize_error_is_not_reported_as_parse() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let error = KataError::LedgerSerialize {
            path: PathBuf::from("done.json"),
            source,
        };
        let message = error.to_string();
        assert!(message.starts_with("serializing ledger for \"done.json\""));
        assert!(!message.contains("parsing"));
    }
}
