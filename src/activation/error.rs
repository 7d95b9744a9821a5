// Nyseal — Activation error types

use thiserror::Error;

/// Failure while executing a module script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Syntax error on line {line} near '{near}'")]
    Syntax { line: usize, near: String },

    #[error("Unresolved symbol '{0}'")]
    Unresolved(String),

    #[error("'{0}' is not a type")]
    NotAType(String),

    #[error("Type '{type_name}' has no field '{field}'")]
    UnknownField { type_name: String, field: String },
}

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("Module '{module}' produced none of the requested exports {requested:?}")]
    NoExports {
        module: String,
        requested: Vec<String>,
    },

    #[error("Module '{module}' imports symbol '{symbol}' from '{dependency}', which is not active")]
    UnresolvedImport {
        module: String,
        dependency: String,
        symbol: String,
    },

    #[error("Module '{module}' failed to execute: {source}")]
    Execution {
        module: String,
        #[source]
        source: ScriptError,
    },
}
