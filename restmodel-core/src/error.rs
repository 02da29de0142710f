//! Error types for model operations with actionable messages.
//!
//! Every failure surfaced by a model call is a [`RestError`] carrying:
//! - An [`ErrorCode`] for programmatic handling
//! - Suggestions for fixing the issue
//! - Context about the model, relation, or request involved
//!
//! # Error Codes
//!
//! Error codes follow a pattern: R{category}{number}
//! - 1xxx: Declaration errors (undefined relation, model, action)
//! - 2xxx: Middleware pipeline errors
//! - 3xxx: Transport errors
//! - 4xxx: Data errors (response decoding, serialization)
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use restmodel_core::{ErrorCode, RestError};
//!
//! let err = RestError::undefined_model("Tag");
//! assert_eq!(err.code, ErrorCode::UndefinedModel);
//! assert_eq!(err.code.code(), "R1002");
//! assert!(err.to_string().contains("Tag"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for model operations.
pub type RestResult<T> = Result<T, RestError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Declaration errors (1xxx)
    /// Include list references an alias with no relation (R1001).
    UndefinedRelation = 1001,
    /// Model is not present in the registry (R1002).
    UndefinedModel = 1002,
    /// Custom action is not declared on the model (R1003).
    UndefinedAction = 1003,
    /// Relation declaration is inconsistent (R1004).
    InvalidRelation = 1004,

    // Pipeline errors (2xxx)
    /// A middleware failed (R2001).
    Middleware = 2001,
    /// The pipeline finished without producing a response body (R2002).
    IncompletePipeline = 2002,

    // Transport errors (3xxx)
    /// The network call failed (R3001).
    Transport = 3001,
    /// The request URL could not be built (R3002).
    InvalidUrl = 3002,

    // Data errors (4xxx)
    /// The response body has an unexpected shape or could not be decoded (R4001).
    InvalidResponse = 4001,
    /// A payload could not be serialized (R4002).
    Serialization = 4002,

    // Configuration errors (7xxx)
    /// Invalid configuration (R7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (R9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "R1001").
    pub fn code(&self) -> String {
        format!("R{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::UndefinedRelation => "Undefined relation",
            Self::UndefinedModel => "Undefined model",
            Self::UndefinedAction => "Undefined custom action",
            Self::InvalidRelation => "Invalid relation declaration",
            Self::Middleware => "Middleware failed",
            Self::IncompletePipeline => "Pipeline produced no response",
            Self::Transport => "Transport failure",
            Self::InvalidUrl => "Invalid request URL",
            Self::InvalidResponse => "Invalid response body",
            Self::Serialization => "Serialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The relation alias involved.
    pub relation: Option<String>,
    /// The request URL (if available).
    pub url: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur during model operations.
#[derive(Error, Debug)]
pub struct RestError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl RestError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the relation alias.
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.context.relation = Some(relation.into());
        self
    }

    /// Set the request URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.context.url = Some(url.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create an undefined relation error.
    pub fn undefined_relation(model: impl Into<String>, alias: impl Into<String>) -> Self {
        let model = model.into();
        let alias = alias.into();
        Self::new(
            ErrorCode::UndefinedRelation,
            format!(
                "Trying to use relation with field \"{}\" in query results of \"{}\", but relation is not defined in modelConfig. Define using modelConfig.hasOne() or modelConfig.hasMany().",
                alias, model
            ),
        )
        .with_model(&model)
        .with_relation(&alias)
        .with_code_suggestion(
            "Declare the relation before including it",
            format!("ModelConfig::new().has_one(\"Target\", \"{}\", \"id\")", alias),
        )
    }

    /// Create an undefined model error.
    pub fn undefined_model(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::UndefinedModel,
            format!("Undefined model \"{}\". Please define model before using.", model),
        )
        .with_model(&model)
        .with_suggestion(format!("Register \"{}\" with RestService::register_model()", model))
    }

    /// Create an undefined custom action error.
    pub fn undefined_action(model: impl Into<String>, action: impl Into<String>) -> Self {
        let model = model.into();
        let action = action.into();
        Self::new(
            ErrorCode::UndefinedAction,
            format!("No custom action \"{}\" declared on model \"{}\"", action, model),
        )
        .with_model(&model)
        .with_suggestion("Declare it with ModelConfig::custom_action()")
    }

    /// Create an invalid relation declaration error.
    pub fn invalid_relation(
        model: impl Into<String>,
        alias: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let model = model.into();
        let alias = alias.into();
        Self::new(
            ErrorCode::InvalidRelation,
            format!("Invalid relation \"{}\" on \"{}\": {}", alias, model, message.into()),
        )
        .with_model(&model)
        .with_relation(&alias)
    }

    /// Create a middleware error.
    ///
    /// Middlewares return this to abort the chain; the caller of the model
    /// operation receives it unchanged.
    pub fn middleware(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Middleware, message)
    }

    /// Create an error for a pipeline that ended without a response body.
    pub fn incomplete_pipeline(url: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::IncompletePipeline,
            "Middleware chain finished without producing a response body",
        )
        .with_url(url)
        .with_suggestion("Add a transport middleware, e.g. the default fetch pair from restmodel-http")
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Transport, message)
    }

    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        let url = url.into();
        Self::new(
            ErrorCode::InvalidUrl,
            format!("Cannot build request URL \"{}\": {}", url, message.into()),
        )
        .with_url(url)
        .with_suggestion("Check the service base URL and the model resource path")
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResponse, message)
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Serialization, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
            .with_help("This is likely a bug in restmodel - please report it")
    }

    // ============== Error Checks ==============

    /// Check if this is an undefined relation error.
    pub fn is_undefined_relation(&self) -> bool {
        self.code == ErrorCode::UndefinedRelation
    }

    /// Check if this is an undefined model error.
    pub fn is_undefined_model(&self) -> bool {
        self.code == ErrorCode::UndefinedModel
    }

    /// Check if this error was raised by a middleware.
    pub fn is_middleware(&self) -> bool {
        self.code == ErrorCode::Middleware
    }

    /// Check if this is a transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self.code, ErrorCode::Transport | ErrorCode::InvalidUrl)
    }

    /// Check if this error was raised before any request was issued.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::UndefinedRelation
                | ErrorCode::UndefinedModel
                | ErrorCode::UndefinedAction
                | ErrorCode::InvalidRelation
        )
    }

    // ============== Display Functions ==============

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref relation) = self.context.relation {
            output.push_str(&format!("  → Relation: {}\n", relation));
        }
        if let Some(ref url) = self.context.url {
            let url_display = match url.char_indices().nth(200) {
                Some((cut, _)) => format!("{}...", &url[..cut]),
                None => url.clone(),
            };
            output.push_str(&format!("  → URL: {}\n", url_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!("     ```\n     {}\n     ```\n", code.replace('\n', "\n     ")));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        RestError::serialization(err.to_string()).with_source(err)
    }
}

/// Extension trait for converting foreign errors raised inside a middleware.
pub trait IntoMiddlewareError {
    /// Wrap as a middleware error, keeping the original as the source.
    fn into_middleware_error(self) -> RestError;
}

impl<E: std::error::Error + Send + Sync + 'static> IntoMiddlewareError for E {
    fn into_middleware_error(self) -> RestError {
        RestError::middleware(self.to_string()).with_source(self)
    }
}
