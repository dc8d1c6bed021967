// Public error taxonomy. Every failure a launch can hit is translated into
// exactly one kind at the boundary where it happens; transport errors only
// survive as text inside the message.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Result signature does not belong to the assigned validator.
    IllegalNode,
    /// Config fetch rejected.
    IllegalAppId,
    /// Schema not in the app config, or its document could not be fetched.
    IllegalSchemaId,
    /// The channel reported the schema as invalid mid-flow.
    IllegalSchema,
    /// Task allocation request rejected.
    TaskRpcError,
    /// Allocator signature over the task is invalid.
    IllegalTaskInfo,
    NotMatchRequirements,
    VerificationCanceled,
    UnexpectedVerifyError,
    RequestTimeout,
    UnexpectedError,
}

impl ErrorKind {
    pub fn code(&self) -> u32 {
        match self {
            ErrorKind::IllegalNode => 100000,
            ErrorKind::IllegalAppId => 100002,
            ErrorKind::IllegalSchemaId => 100003,
            ErrorKind::IllegalSchema => 100004,
            ErrorKind::TaskRpcError => 100006,
            ErrorKind::IllegalTaskInfo => 100007,
            ErrorKind::NotMatchRequirements => 100011,
            ErrorKind::VerificationCanceled => 100012,
            ErrorKind::UnexpectedVerifyError => 100013,
            ErrorKind::RequestTimeout => 100014,
            ErrorKind::UnexpectedError => 100015,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::IllegalNode => "result was not signed by the assigned validator node",
            ErrorKind::IllegalAppId => "please check your app id",
            ErrorKind::IllegalSchemaId => "illegal schema id, please check your schema info",
            ErrorKind::IllegalSchema => "illegal schema, please contact the developer",
            ErrorKind::TaskRpcError => "task allocation request failed",
            ErrorKind::IllegalTaskInfo => "task allocation signature is invalid",
            ErrorKind::NotMatchRequirements => "the user does not meet the schema requirements",
            ErrorKind::VerificationCanceled => "verification canceled",
            ErrorKind::UnexpectedVerifyError => "unexpected error during verification",
            ErrorKind::RequestTimeout => "request timeout",
            ErrorKind::UnexpectedError => "unexpected error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransgateError {
    pub kind: ErrorKind,
    pub code: u32,
    pub message: String,
}

impl TransgateError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code(),
            message: message.into(),
        }
    }

    /// Default message followed by the underlying cause.
    pub fn caused_by(kind: ErrorKind, cause: impl std::fmt::Display) -> Self {
        Self::new(kind, format!("{}: {}", kind.default_message(), cause))
    }
}

impl From<ErrorKind> for TransgateError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind, kind.default_message())
    }
}

impl std::fmt::Display for TransgateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for TransgateError {}
