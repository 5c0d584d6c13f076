//! Declarative query descriptions.
//!
//! A description is an ordered list of records, each a one- or two-element
//! array:
//!
//! | Record | Result |
//! |---|---|
//! | `["name"]` | leaf field |
//! | `["name", {"arg": value, ...}]` | field with arguments |
//! | `["name", ["item", ...]]` | connection whose items select the listed fields |
//!
//! Connection items are field names or nested records. Argument values must
//! be strings, booleans or numbers.
//!
//! ```
//! use horizon_lattice_query::{QueryNode, loader};
//! use serde_json::json;
//!
//! let mut user = QueryNode::new("user");
//! loader::load_description(&mut user, &json!([
//!     ["name"],
//!     ["avatarUrl", {"size": 64}],
//!     ["repositories", ["name", "stargazerCount"]]
//! ])).unwrap();
//!
//! assert_eq!(user.children().len(), 3);
//! ```
//!
//! Files can be JSON (the array itself, or an object with a `query` member)
//! or TOML with a top-level `query` array.

use std::path::Path;

use serde_json::Value;

use crate::error::{QueryError, Result};
use crate::logging::targets;
use crate::node::{Argument, QueryNode};

/// Key holding the record list in description files.
const QUERY_KEY: &str = "query";

/// Append the fields described by `description` to `parent`.
pub fn load_description(parent: &mut QueryNode, description: &Value) -> Result<()> {
    let records = description
        .as_array()
        .ok_or_else(|| QueryError::invalid_description("description must be an array of records"))?;
    for (index, record) in records.iter().enumerate() {
        load_record(parent, record, index)?;
    }
    tracing::debug!(
        target: targets::LOADER,
        parent = parent.name(),
        records = records.len(),
        "description loaded"
    );
    Ok(())
}

/// Parse JSON text and load it into `parent`.
pub fn load_description_str(parent: &mut QueryNode, text: &str) -> Result<()> {
    let description: Value = serde_json::from_str(text)
        .map_err(|e| QueryError::invalid_description(format!("malformed JSON: {e}")))?;
    load_description(parent, unwrap_query_key(&description))
}

/// Read a `.json` or `.toml` description file and load it into `parent`.
pub fn load_description_file(parent: &mut QueryNode, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| QueryError::io(path, e))?;

    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if !is_toml {
        return load_description_str(parent, &text);
    }

    let table: toml::Table = toml::from_str(&text)?;
    let query = table
        .get(QUERY_KEY)
        .ok_or_else(|| {
            QueryError::invalid_description(format!("{} has no `query` array", path.display()))
        })?;
    load_description(parent, &serde_json::to_value(query)?)
}

fn unwrap_query_key(description: &Value) -> &Value {
    description.get(QUERY_KEY).unwrap_or(description)
}

fn load_record(parent: &mut QueryNode, record: &Value, index: usize) -> Result<()> {
    let fields = record.as_array().ok_or_else(|| {
        QueryError::invalid_description(format!("record {index} is not an array: {record}"))
    })?;

    match fields.as_slice() {
        [name] => {
            parent.add_child(field_name(name, index)?)?;
        }
        [name, Value::Object(arguments)] => {
            let child = parent.add_child(field_name(name, index)?)?;
            for (arg, value) in arguments {
                child.add_argument(arg.as_str(), scalar_argument(arg, value, index)?);
            }
        }
        [name, Value::Array(items)] => {
            let connection = parent.add_child(QueryNode::connection(field_name(name, index)?))?;
            for item in items {
                match item {
                    Value::String(item) => {
                        connection.add_child(item.as_str())?;
                    }
                    Value::Array(_) => load_record(connection, item, index)?,
                    other => {
                        return Err(QueryError::invalid_description(format!(
                            "record {index}: list item must be a name or a record, found {}",
                            kind(other)
                        )));
                    }
                }
            }
        }
        [_, other] => {
            return Err(QueryError::invalid_description(format!(
                "record {index}: unsupported value type {}",
                kind(other)
            )));
        }
        _ => {
            return Err(QueryError::invalid_description(format!(
                "record {index}: expected 1 or 2 elements, found {}",
                fields.len()
            )));
        }
    }
    Ok(())
}

fn field_name(name: &Value, index: usize) -> Result<String> {
    match name {
        Value::String(name) if !name.is_empty() => Ok(name.clone()),
        other => Err(QueryError::invalid_description(format!(
            "record {index}: field name must be a non-empty string, found {other}"
        ))),
    }
}

fn scalar_argument(name: &str, value: &Value, index: usize) -> Result<Argument> {
    match value {
        Value::String(_) | Value::Bool(_) | Value::Number(_) => Ok(Argument::from(value)),
        other => Err(QueryError::invalid_description(format!(
            "record {index}: argument '{name}' has unsupported type {}",
            kind(other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
