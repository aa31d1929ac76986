//! Built-in processors
//!
//! Small, ordinary validators and transformers exercising the handler
//! contract. Value handlers transform or validate a single parameter's
//! value; tag handlers enforce group invariants.

use crate::child::{TagHandler, TagValues, ValueHandler};
use crate::context::Context;
use crate::error::ProcessError;
use crate::value::Value;

/// Uppercases string values; other categories pass through.
pub struct ToUppercase;

impl ValueHandler for ToUppercase {
    fn name(&self) -> &str {
        "to_uppercase"
    }

    fn handle_str(&self, value: String, _ctx: &Context<'_>) -> Result<Value, ProcessError> {
        Ok(Value::Str(value.to_uppercase()))
    }
}

/// Lowercases string values; other categories pass through.
pub struct ToLowercase;

impl ValueHandler for ToLowercase {
    fn name(&self) -> &str {
        "to_lowercase"
    }

    fn handle_str(&self, value: String, _ctx: &Context<'_>) -> Result<Value, ProcessError> {
        Ok(Value::Str(value.to_lowercase()))
    }
}

/// Prepends fixed text to string values.
pub struct Prefix(pub String);

impl Prefix {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl ValueHandler for Prefix {
    fn name(&self) -> &str {
        "prefix"
    }

    fn handle_str(&self, value: String, _ctx: &Context<'_>) -> Result<Value, ProcessError> {
        Ok(Value::Str(format!("{}{}", self.0, value)))
    }
}

/// Appends fixed text to string values.
pub struct Suffix(pub String);

impl Suffix {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl ValueHandler for Suffix {
    fn name(&self) -> &str {
        "suffix"
    }

    fn handle_str(&self, value: String, _ctx: &Context<'_>) -> Result<Value, ProcessError> {
        Ok(Value::Str(format!("{}{}", value, self.0)))
    }
}

/// Validates a minimum length for strings and lists.
pub struct MinLength(pub usize);

impl ValueHandler for MinLength {
    fn name(&self) -> &str {
        "min_length"
    }

    fn handle_str(&self, value: String, _ctx: &Context<'_>) -> Result<Value, ProcessError> {
        if value.chars().count() < self.0 {
            return Err(ProcessError::failed(format!(
                "'{}' is shorter than {} characters",
                value, self.0
            )));
        }
        Ok(Value::Str(value))
    }

    fn handle_list(&self, value: Vec<Value>, _ctx: &Context<'_>) -> Result<Value, ProcessError> {
        if value.len() < self.0 {
            return Err(ProcessError::failed(format!(
                "expected at least {} values, got {}",
                self.0,
                value.len()
            )));
        }
        Ok(Value::List(value))
    }
}

/// Validates a maximum length for strings and lists.
pub struct MaxLength(pub usize);

impl ValueHandler for MaxLength {
    fn name(&self) -> &str {
        "max_length"
    }

    fn handle_str(&self, value: String, _ctx: &Context<'_>) -> Result<Value, ProcessError> {
        if value.chars().count() > self.0 {
            return Err(ProcessError::failed(format!(
                "'{}' is longer than {} characters",
                value, self.0
            )));
        }
        Ok(Value::Str(value))
    }

    fn handle_list(&self, value: Vec<Value>, _ctx: &Context<'_>) -> Result<Value, ProcessError> {
        if value.len() > self.0 {
            return Err(ProcessError::failed(format!(
                "expected at most {} values, got {}",
                self.0,
                value.len()
            )));
        }
        Ok(Value::List(value))
    }
}

/// Rejects non-positive numbers.
pub struct IsPositive;

impl ValueHandler for IsPositive {
    fn name(&self) -> &str {
        "is_positive"
    }

    fn handle_int(&self, value: i64, _ctx: &Context<'_>) -> Result<Value, ProcessError> {
        if value <= 0 {
            return Err(ProcessError::failed(format!(
                "{} is not a positive number",
                value
            )));
        }
        Ok(Value::Int(value))
    }

    fn handle_float(&self, value: f64, _ctx: &Context<'_>) -> Result<Value, ProcessError> {
        if value <= 0.0 {
            return Err(ProcessError::failed(format!(
                "{} is not a positive number",
                value
            )));
        }
        Ok(Value::Float(value))
    }
}

/// Requires that at least `n` members of the tag were provided.
pub struct RequireAtLeast(pub usize);

impl TagHandler for RequireAtLeast {
    fn name(&self) -> &str {
        "require_at_least"
    }

    fn handle_tag(&self, _values: &TagValues, ctx: &Context<'_>) -> Result<(), ProcessError> {
        let tag = ctx.current_parent_as_tag()?;
        let provided = tag.get_provided_values(ctx);
        if provided.len() < self.0 {
            return Err(ProcessError::failed(format!(
                "at least {} of {} must be provided",
                self.0,
                tag.members().join(", ")
            )));
        }
        Ok(())
    }
}

/// Rejects invocations where more than one member of the tag was provided.
pub struct MutuallyExclusive;

impl TagHandler for MutuallyExclusive {
    fn name(&self) -> &str {
        "mutually_exclusive"
    }

    fn handle_tag(&self, _values: &TagValues, ctx: &Context<'_>) -> Result<(), ProcessError> {
        let tag = ctx.current_parent_as_tag()?;
        let provided = tag.get_provided_values(ctx);
        if provided.len() > 1 {
            return Err(ProcessError::failed(format!(
                "{} cannot be used together",
                provided.join(" and ")
            )));
        }
        Ok(())
    }
}
