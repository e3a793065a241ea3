use thiserror::Error;

/// Failures talking to the analytics backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("could not decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid client configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let err = ApiError::Status {
            endpoint: "getOccOnMap".to_string(),
            status: 502,
            body: "bad gateway".to_string(),
        };

        assert_eq!(err.to_string(), "getOccOnMap returned 502: bad gateway");
    }

    #[test]
    fn test_decode_error_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{").err();
        let Some(source) = source else {
            panic!("expected a parse error");
        };
        let err = ApiError::Decode {
            endpoint: "getEpsScrRelation".to_string(),
            source,
        };

        assert!(err.to_string().starts_with("could not decode getEpsScrRelation"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
