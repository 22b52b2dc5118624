//! Contract ABI handling.
//!
//! Structural checks run on the raw JSON first so callers get a message
//! pointing at the offending item. The normalized JSON is then parsed into
//! [`JsonAbi`], and arguments, filters and return data are converted with
//! `alloy::dyn_abi`.

use alloy::dyn_abi::{DynSolType, DynSolValue, EventExt, FunctionExt, Specifier};
use alloy::json_abi::{Event, Function, JsonAbi, Param};
use alloy::primitives::{keccak256, Bytes, LogData, B256};
use serde_json::{Map, Value};

use crate::blockchain::format::checksum;
use crate::validation::address::parse_address;
use crate::validation::{json_type_name, Validated, ValidationError};

const ITEM_TYPES: [&str; 6] = [
    "function",
    "constructor",
    "fallback",
    "receive",
    "event",
    "error",
];

/// Filter keys that are not event parameters.
const FILTER_PASSTHROUGH: [&str; 4] = ["fromBlock", "toBlock", "address", "topics"];

/// A structurally valid ABI, parsed and in its normalized JSON form.
#[derive(Debug, Clone)]
pub struct ParsedAbi {
    pub abi: JsonAbi,
    pub raw: Value,
}

impl ParsedAbi {
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.abi.functions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.abi.events.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Validate an ABI given as a JSON array or as a string holding one.
pub fn validate_abi(value: &Value) -> Validated<ParsedAbi> {
    let decoded;
    let value = match value {
        Value::String(s) => {
            decoded = serde_json::from_str::<Value>(s)
                .map_err(|e| ValidationError::new(format!("Invalid ABI JSON: {}", e)))?;
            &decoded
        }
        other => other,
    };

    let Value::Array(items) = value else {
        return Err(ValidationError::new(
            "ABI must be a list of method/event objects",
        ));
    };
    if items.is_empty() {
        return Err(ValidationError::new("ABI cannot be empty"));
    }

    let normalized = items
        .iter()
        .enumerate()
        .map(|(i, item)| normalize_item(i, item))
        .collect::<Validated<Vec<Value>>>()?;

    let raw = Value::Array(normalized);
    let abi = serde_json::from_value::<JsonAbi>(raw.clone())
        .map_err(|e| ValidationError::new(format!("ABI could not be parsed: {}", e)))?;

    Ok(ParsedAbi { abi, raw })
}

fn normalize_item(i: usize, item: &Value) -> Validated<Value> {
    let Value::Object(obj) = item else {
        return Err(ValidationError::new(format!(
            "ABI item at index {} must be a dictionary",
            i
        )));
    };
    let mut obj = obj.clone();

    let kind = match obj.get("type") {
        None => "function".to_string(),
        Some(Value::String(t)) if ITEM_TYPES.contains(&t.as_str()) => t.clone(),
        Some(Value::String(t)) => {
            return Err(ValidationError::new(format!(
                "ABI item at index {} has unsupported type '{}'",
                i, t
            )))
        }
        Some(other) => {
            return Err(ValidationError::new(format!(
                "ABI item at index {} has unsupported type '{}'",
                i, other
            )))
        }
    };
    obj.insert("type".into(), Value::from(kind.as_str()));

    let named = match kind.as_str() {
        "function" => Some("Function"),
        "event" => Some("Event"),
        "error" => Some("Error"),
        _ => None,
    };
    if let Some(label) = named {
        let has_name = matches!(obj.get("name"), Some(Value::String(n)) if !n.is_empty());
        if !has_name {
            return Err(ValidationError::new(format!(
                "{} at index {} must have a name",
                label, i
            )));
        }
    }

    let takes_inputs = matches!(kind.as_str(), "function" | "constructor" | "event" | "error");
    let takes_outputs = kind == "function";
    normalize_section(&mut obj, i, "inputs", "Input", takes_inputs, kind == "event")?;
    normalize_section(&mut obj, i, "outputs", "Output", takes_outputs, false)?;

    match kind.as_str() {
        "function" | "constructor" | "fallback" | "receive" => {
            let legacy_constant = obj.remove("constant").and_then(|v| v.as_bool());
            let legacy_payable = obj.remove("payable").and_then(|v| v.as_bool());
            if !obj.contains_key("stateMutability") {
                let mutability = if kind == "receive" || legacy_payable == Some(true) {
                    "payable"
                } else if legacy_constant == Some(true) {
                    "view"
                } else {
                    "nonpayable"
                };
                obj.insert("stateMutability".into(), Value::from(mutability));
            }
        }
        "event" => {
            obj.entry("anonymous").or_insert(Value::Bool(false));
        }
        _ => {}
    }

    Ok(Value::Object(obj))
}

fn normalize_section(
    obj: &mut Map<String, Value>,
    i: usize,
    key: &str,
    label: &str,
    default_empty: bool,
    indexed: bool,
) -> Validated<()> {
    if !obj.contains_key(key) {
        if default_empty {
            obj.insert(key.to_string(), Value::Array(Vec::new()));
        }
        return Ok(());
    }
    match obj.get_mut(key) {
        None => Ok(()),
        Some(Value::Array(params)) => normalize_params(params, i, label, indexed),
        Some(_) => Err(ValidationError::new(format!(
            "{}s for item at index {} must be a list",
            label, i
        ))),
    }
}

fn normalize_params(params: &mut [Value], i: usize, label: &str, indexed: bool) -> Validated<()> {
    for (j, param) in params.iter_mut().enumerate() {
        let Value::Object(p) = param else {
            return Err(ValidationError::new(format!(
                "{} parameter {} in item {} must be a dictionary",
                label, j, i
            )));
        };
        if !matches!(p.get("type"), Some(Value::String(_))) {
            return Err(ValidationError::new(format!(
                "{} parameter {} in item {} must have a type",
                label, j, i
            )));
        }
        p.entry("name").or_insert(Value::from(""));
        if indexed {
            p.entry("indexed").or_insert(Value::Bool(false));
        }
        if let Some(Value::Array(components)) = p.get_mut("components") {
            normalize_params(components, i, label, false)?;
        }
    }
    Ok(())
}

/// Check and convert constructor arguments. An ABI without a constructor
/// accepts no arguments.
pub fn bind_constructor_args(abi: &JsonAbi, args: &[Value]) -> Validated<Vec<DynSolValue>> {
    let Some(constructor) = &abi.constructor else {
        if !args.is_empty() {
            return Err(ValidationError::new(
                "No constructor found in ABI, but arguments were provided",
            ));
        }
        return Ok(Vec::new());
    };

    if args.len() != constructor.inputs.len() {
        return Err(ValidationError::new(format!(
            "Constructor expects {} arguments, but {} were provided",
            constructor.inputs.len(),
            args.len()
        )));
    }

    bind_params(&constructor.inputs, args, |name, idx| {
        format!("Constructor argument '{}' (index {})", name, idx)
    })
}

/// Pick the overload of `method` matching the argument count and convert the
/// arguments. `overloads` must be non-empty.
pub fn bind_function_args<'a>(
    overloads: &'a [Function],
    args: &[Value],
) -> Validated<(&'a Function, Vec<DynSolValue>)> {
    let Some(first) = overloads.first() else {
        return Err(ValidationError::new("Method has no ABI definition"));
    };
    let function = overloads
        .iter()
        .find(|f| f.inputs.len() == args.len())
        .ok_or_else(|| {
            ValidationError::new(format!(
                "Method '{}' expects {} arguments, but {} were provided",
                first.name,
                first.inputs.len(),
                args.len()
            ))
        })?;

    let values = bind_params(&function.inputs, args, |name, idx| {
        format!("Method '{}' argument '{}' (index {})", function.name, name, idx)
    })?;
    Ok((function, values))
}

fn bind_params(
    params: &[Param],
    args: &[Value],
    label: impl Fn(&str, usize) -> String,
) -> Validated<Vec<DynSolValue>> {
    params
        .iter()
        .zip(args)
        .enumerate()
        .map(|(idx, (param, arg))| {
            let name = if param.name.is_empty() {
                format!("arg{}", idx)
            } else {
                param.name.clone()
            };
            let ty = resolve_param(param)?;
            json_to_sol(&ty, arg)
                .map_err(|reason| ValidationError::new(format!("{} {}", label(&name, idx), reason)))
        })
        .collect()
}

fn resolve_param(param: &Param) -> Validated<DynSolType> {
    param.resolve().map_err(|e| {
        ValidationError::new(format!("Unsupported parameter type '{}': {}", param.ty, e))
    })
}

/// Convert a JSON argument into an ABI value of type `ty`. The error is the
/// tail of a sentence ("must be a boolean, got string").
pub fn json_to_sol(ty: &DynSolType, value: &Value) -> Result<DynSolValue, String> {
    match ty {
        DynSolType::Array(inner) => {
            let Value::Array(items) = value else {
                return Err(format!("must be a list, got {}", json_type_name(value)));
            };
            let values = items
                .iter()
                .map(|item| json_to_sol(inner, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Array(values))
        }
        DynSolType::FixedArray(inner, len) => {
            let Value::Array(items) = value else {
                return Err(format!("must be a list, got {}", json_type_name(value)));
            };
            if items.len() != *len {
                return Err(format!("must have {} elements, got {}", len, items.len()));
            }
            let values = items
                .iter()
                .map(|item| json_to_sol(inner, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::FixedArray(values))
        }
        DynSolType::Tuple(types) => {
            let Value::Array(items) = value else {
                return Err(format!("must be a list, got {}", json_type_name(value)));
            };
            if items.len() != types.len() {
                return Err(format!("must have {} elements, got {}", types.len(), items.len()));
            }
            let values = types
                .iter()
                .zip(items)
                .map(|(t, item)| json_to_sol(t, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Tuple(values))
        }
        DynSolType::Bool => match value {
            Value::Bool(b) => Ok(DynSolValue::Bool(*b)),
            other => Err(format!("must be a boolean, got {}", json_type_name(other))),
        },
        DynSolType::String => match value {
            Value::String(s) => Ok(DynSolValue::String(s.clone())),
            other => Err(format!("must be a string, got {}", json_type_name(other))),
        },
        DynSolType::Address => {
            let Value::String(s) = value else {
                return Err(format!(
                    "must be a string address, got {}",
                    json_type_name(value)
                ));
            };
            if !s.starts_with("0x") || s.len() != 42 {
                return Err("must be a valid address (0x followed by 40 hex characters)".into());
            }
            parse_address(s)
                .map(DynSolValue::Address)
                .map_err(|e| format!("is not a valid address: {}", e))
        }
        DynSolType::Bytes => json_bytes(value).map(|b| DynSolValue::Bytes(b.to_vec())),
        DynSolType::FixedBytes(size) => {
            let bytes = json_bytes(value)?;
            if bytes.len() != *size {
                return Err(format!("must be {} bytes, got {}", size, bytes.len()));
            }
            let mut word = B256::ZERO;
            word[..*size].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(word, *size))
        }
        DynSolType::Int(_) | DynSolType::Uint(_) => {
            let text = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
                other => {
                    return Err(format!(
                        "must be an integer or string, got {}",
                        json_type_name(other)
                    ))
                }
            };
            ty.coerce_str(&text)
                .map_err(|e| format!("is not a valid {}: {}", ty.sol_type_name(), e))
        }
        other => match value {
            Value::String(s) => other
                .coerce_str(s)
                .map_err(|e| format!("is not a valid {}: {}", other.sol_type_name(), e)),
            v => Err(format!("must be a string, got {}", json_type_name(v))),
        },
    }
}

/// `0x` hex string or an array of byte values.
fn json_bytes(value: &Value) -> Result<Bytes, String> {
    match value {
        Value::String(s) => {
            let Some(payload) = s.strip_prefix("0x") else {
                return Err("must start with 0x".into());
            };
            alloy::hex::decode(payload)
                .map(Bytes::from)
                .map_err(|_| "contains invalid hexadecimal characters".into())
        }
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| "byte list values must be integers 0-255".to_string())
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(Bytes::from),
        other => Err(format!(
            "must be a string or bytes, got {}",
            json_type_name(other)
        )),
    }
}

/// Render an ABI value as JSON: integers as decimal strings, addresses
/// checksummed, byte strings as 0x hex.
#[allow(unreachable_patterns)]
pub fn sol_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(format!("0x{}", alloy::hex::encode(&word[..*size])))
        }
        DynSolValue::Address(a) => Value::String(checksum(*a)),
        DynSolValue::Function(f) => Value::String(f.to_string()),
        DynSolValue::Bytes(b) => Value::String(format!("0x{}", alloy::hex::encode(b))),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(items)
        | DynSolValue::FixedArray(items)
        | DynSolValue::Tuple(items) => Value::Array(items.iter().map(sol_to_json).collect()),
        _ => Value::Null,
    }
}

/// Build the topic filter for `event` from a name → value map.
///
/// Keys must name indexed parameters or be one of the block/address
/// passthrough keys. A list value matches any of its entries; null matches
/// anything.
pub fn build_event_topics(
    event: &Event,
    filters: &Map<String, Value>,
) -> Validated<Vec<Option<Vec<B256>>>> {
    for key in filters.keys() {
        let indexed = event.inputs.iter().any(|p| p.indexed && p.name == *key);
        if !indexed && !FILTER_PASSTHROUGH.contains(&key.as_str()) {
            return Err(ValidationError::new(format!(
                "Filter parameter '{}' is not an indexed parameter in event '{}'",
                key, event.name
            )));
        }
    }

    let mut topics: Vec<Option<Vec<B256>>> = Vec::new();
    if !event.anonymous {
        topics.push(Some(vec![event.selector()]));
    }

    for param in event.inputs.iter().filter(|p| p.indexed) {
        let wanted = match filters.get(&param.name) {
            None | Some(Value::Null) => None,
            Some(value) => {
                let ty = param.resolve().map_err(|e| {
                    ValidationError::new(format!(
                        "Unsupported parameter type '{}': {}",
                        param.ty, e
                    ))
                })?;
                Some(filter_topics(&event.name, &param.name, &ty, value)?)
            }
        };
        topics.push(wanted);
    }

    while matches!(topics.last(), Some(None)) {
        topics.pop();
    }
    Ok(topics)
}

fn filter_topics(event: &str, name: &str, ty: &DynSolType, value: &Value) -> Validated<Vec<B256>> {
    let fail = |reason: String| {
        ValidationError::new(format!("Event '{}' filter '{}' {}", event, name, reason))
    };

    let candidates: Vec<&Value> = match (ty, value) {
        (DynSolType::Array(_) | DynSolType::FixedArray(..) | DynSolType::Tuple(_), _) => {
            return Err(fail(format!("cannot filter on {} values", ty.sol_type_name())));
        }
        (_, Value::Array(items)) => items.iter().filter(|v| !v.is_null()).collect(),
        (_, v) => vec![v],
    };

    candidates
        .into_iter()
        .map(|v| {
            let sol = json_to_sol(ty, v).map_err(fail)?;
            topic_word(&sol).ok_or_else(|| fail("cannot be encoded as a topic".to_string()))
        })
        .collect()
}

/// Indexed values: dynamic types are stored as their keccak hash.
fn topic_word(value: &DynSolValue) -> Option<B256> {
    match value {
        DynSolValue::String(s) => Some(keccak256(s.as_bytes())),
        DynSolValue::Bytes(b) => Some(keccak256(b)),
        other => other.as_word(),
    }
}

/// Decode a log into `{name: value}` following the event's parameter order.
pub fn decode_event_log(event: &Event, topics: Vec<B256>, data: Bytes) -> Validated<Map<String, Value>> {
    let log = LogData::new(topics, data)
        .ok_or_else(|| ValidationError::new("Log has more than four topics"))?;
    let decoded = event
        .decode_log(&log)
        .map_err(|e| ValidationError::new(format!("Failed to decode event '{}': {}", event.name, e)))?;

    let mut indexed = decoded.indexed.iter();
    let mut body = decoded.body.iter();
    let mut args = Map::new();
    for (idx, param) in event.inputs.iter().enumerate() {
        let value = if param.indexed {
            indexed.next()
        } else {
            body.next()
        };
        let key = if param.name.is_empty() {
            format!("arg{}", idx)
        } else {
            param.name.clone()
        };
        args.insert(key, value.map(sol_to_json).unwrap_or(Value::Null));
    }
    Ok(args)
}

/// Decode `eth_call` return data into a JSON list of outputs.
pub fn decode_function_output(function: &Function, data: &[u8]) -> Validated<Vec<Value>> {
    let values = function.abi_decode_output(data).map_err(|e| {
        ValidationError::new(format!(
            "Failed to decode result of '{}': {}",
            function.name, e
        ))
    })?;
    Ok(values.iter().map(sol_to_json).collect())
}
