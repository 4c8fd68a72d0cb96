// ============================================================
// Layer 3 — Domain Errors
// ============================================================
// Most failures travel as anyhow::Error with context attached.
// The variants below are the ones some caller needs to match on:
// the chat loop recovers from UnknownWord, everything else is a
// configuration or data error that aborts the run.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatbotError {
    #[error("'{0}' is not an appropriate attention method (expected dot, general or concat)")]
    UnknownAttentionMethod(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("word '{0}' is not in the vocabulary")]
    UnknownWord(String),

    #[error("cannot build a batch from zero sentence pairs")]
    EmptyBatch,

    #[error("mask for this timestep has no real target tokens")]
    EmptyMask,

    #[error("batch lives on device {found} but the model lives on {expected}")]
    DeviceMismatch { expected: String, found: String },

    #[error("checkpoint was trained with {found}, current configuration is {expected}")]
    CheckpointMismatch { expected: String, found: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChatbotError::UnknownAttentionMethod("cosine".to_string());
        assert!(err.to_string().contains("cosine"));

        let err = ChatbotError::UnknownWord("zyzzyva".to_string());
        assert!(err.to_string().contains("not in the vocabulary"));

        let err = ChatbotError::EmptyMask;
        assert!(err.to_string().contains("no real target tokens"));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = ChatbotError::UnknownWord("x".to_string()).into();
        assert!(matches!(
            err.downcast_ref::<ChatbotError>(),
            Some(ChatbotError::UnknownWord(_))
        ));
    }
}
