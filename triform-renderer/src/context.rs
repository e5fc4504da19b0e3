//! Template contexts built from project data.

use serde::Serialize;
use tera::Context;

use triform_core::{EnvVar, Environment};

use crate::error::RenderError;

/// Placeholder written for secrets that have no value yet.
pub const SECRET_PLACEHOLDER: &str = "# Add your secret here";

/// One `KEY=value` line of the environment file, value already quoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvLine {
    pub key: String,
    pub value: String,
}

/// Environment variables partitioned into regular and secret groups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EnvFileContext {
    pub regular: Vec<EnvLine>,
    pub secrets: Vec<EnvLine>,
}

impl EnvFileContext {
    /// Variables with an empty key are dropped; declared order is kept.
    pub fn from_environment(environment: &Environment) -> Self {
        let mut ctx = EnvFileContext::default();
        for var in environment.variables.iter().filter(|v| !v.key.is_empty()) {
            if var.secret {
                ctx.secrets.push(secret_line(var));
            } else {
                ctx.regular.push(EnvLine {
                    key: var.key.clone(),
                    value: quote_env_value(&var.value),
                });
            }
        }
        ctx
    }

    pub fn to_tera_context(&self) -> Result<Context, RenderError> {
        Ok(Context::from_serialize(self)?)
    }
}

fn secret_line(var: &EnvVar) -> EnvLine {
    let value = if var.value.is_empty() {
        SECRET_PLACEHOLDER.to_string()
    } else {
        var.value.clone()
    };
    EnvLine {
        key: var.key.clone(),
        value,
    }
}

/// Wrap a value in double quotes when it contains whitespace or a quote.
pub fn quote_env_value(value: &str) -> String {
    if value.chars().any(|c| c.is_whitespace() || c == '"') {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadmeContext {
    pub name: String,
}

impl ReadmeContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn to_tera_context(&self) -> Result<Context, RenderError> {
        Ok(Context::from_serialize(self)?)
    }
}
