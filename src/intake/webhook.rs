//! Warranty form webhook parsing
//!
//! The form provider delivered three payload shapes over the system's
//! lifetime, and all of them still arrive:
//! 1. Flat map: `{"fields": {"Empresa": "...", ...}, "fieldsById": {...}}`
//! 2. Wrapper: `{"client_payload": <one of the other shapes>}`
//! 3. Legacy array: `{"data": {"fields": [{"label", "value", "options"}]}}`
//!    where dropdown values are option ids that must be resolved to their
//!    display text.
//!
//! Individual fields degrade to the empty string on any malformed value; a
//! single bad field never fails the parse. Only a payload with no
//! recognizable field container at all is an error.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::types::{Brand, WarrantySubmission};

/// Webhook payload errors
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload carries no recognizable form fields")]
    NoFields,
}

/// Field labels used by the warranty form (Spanish, as configured in the
/// form builder). Brand-prefixed variants exist for historical form
/// revisions and are tried as fallbacks.
mod labels {
    pub const EMPRESA: &str = "Empresa";
    pub const NIF: &str = "NIF/CIF/VAT";
    pub const EMAIL: &str = "Email";
    pub const BRAND: &str = "Marca del Producto";
    pub const MODELO: &str = "Modelo";
    pub const TALLA: &str = "Talla";
    pub const ANO: &str = "Año de fabricación";
    pub const ESTADO: &str = "Estado del producto";
    pub const PROBLEMA: &str = "Descripción del problema";
    pub const SOLUCION: &str = "Solución o reparación propuesta y presupuesto";
}

/// Parse a webhook payload into a `WarrantySubmission`.
pub fn parse_submission(payload: &Value) -> Result<WarrantySubmission, WebhookError> {
    let obj = payload.as_object().ok_or(WebhookError::NotAnObject)?;

    // Unwrap the GitHub dispatch envelope first, then try each known shape.
    if let Some(inner) = obj.get("client_payload") {
        return parse_submission(inner);
    }

    let fields = if let Some(map) = obj.get("fields").and_then(Value::as_object) {
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    } else if let Some(array) = obj.get("fields").and_then(Value::as_array) {
        fields_from_array(array)
    } else if let Some(array) = obj
        .get("data")
        .and_then(|d| d.get("fields"))
        .and_then(Value::as_array)
    {
        fields_from_array(array)
    } else {
        return Err(WebhookError::NoFields);
    };

    Ok(submission_from_fields(&fields))
}

/// Flatten the legacy `[{label, value, options}]` form into a label→value
/// map, resolving dropdown option ids to their display text.
fn fields_from_array(fields: &[Value]) -> HashMap<String, Value> {
    let mut map = HashMap::new();
    for field in fields {
        let Some(label) = field.get("label").and_then(Value::as_str) else {
            continue;
        };
        let value = field.get("value").cloned().unwrap_or(Value::Null);
        let options = field.get("options").and_then(Value::as_array);
        map.insert(label.to_string(), resolve_options(value, options));
    }
    map
}

/// Replace dropdown option ids with their display text where possible.
fn resolve_options(value: Value, options: Option<&Vec<Value>>) -> Value {
    let (Value::Array(items), Some(options)) = (&value, options) else {
        return value;
    };

    let resolved: Vec<Value> = items
        .iter()
        .map(|item| {
            let Some(id) = item.as_str() else {
                return item.clone();
            };
            options
                .iter()
                .find(|opt| {
                    opt.get("id").and_then(Value::as_str) == Some(id)
                        || opt.get("text").and_then(Value::as_str) == Some(id)
                })
                .and_then(|opt| opt.get("text").cloned())
                .unwrap_or_else(|| item.clone())
        })
        .collect();
    Value::Array(resolved)
}

fn submission_from_fields(fields: &HashMap<String, Value>) -> WarrantySubmission {
    let brand_text = lookup(fields, labels::BRAND, &[]);
    let brand = Brand::parse(&brand_text);

    // Historical form revisions prefixed per-brand questions with the brand
    // name ("Conway - Modelo"); try those after the unified label.
    let prefixed = |base: &str| -> Vec<String> {
        Brand::ALL
            .iter()
            .map(|b| format!("{} - {}", b.partition_name(), base))
            .collect()
    };

    WarrantySubmission {
        brand,
        client_email: lookup(fields, labels::EMAIL, &[]),
        client_name: lookup(fields, labels::EMPRESA, &[]),
        tax_id: lookup(fields, labels::NIF, &[]),
        product_model: lookup_owned(fields, labels::MODELO, &prefixed(labels::MODELO)),
        product_size: lookup_owned(fields, labels::TALLA, &prefixed(labels::TALLA)),
        manufacture_year: lookup_owned(fields, labels::ANO, &prefixed(labels::ANO)),
        product_condition: lookup_owned(fields, labels::ESTADO, &prefixed(labels::ESTADO)),
        issue_description: lookup_owned(fields, labels::PROBLEMA, &prefixed(labels::PROBLEMA)),
        proposed_solution: lookup_owned(fields, labels::SOLUCION, &prefixed(labels::SOLUCION)),
    }
}

fn lookup(fields: &HashMap<String, Value>, label: &str, fallbacks: &[&str]) -> String {
    if let Some(value) = fields.get(label) {
        let text = field_text(value);
        if !text.is_empty() {
            return text;
        }
    }
    for fallback in fallbacks {
        if let Some(value) = fields.get(*fallback) {
            let text = field_text(value);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

fn lookup_owned(fields: &HashMap<String, Value>, label: &str, fallbacks: &[String]) -> String {
    let refs: Vec<&str> = fallbacks.iter().map(String::as_str).collect();
    lookup(fields, label, &refs)
}

/// Coerce a form value to display text. Malformed shapes become "".
fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Dropdowns and uploads arrive as arrays; take the first entry.
        Value::Array(items) => items.first().map(field_text).unwrap_or_default(),
        // File-upload objects: the attachment name stands in for the value.
        Value::Object(obj) => obj
            .get("name")
            .or_else(|| obj.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
        Value::Null => String::new(),
    }
}

/// Cheap plausibility check for a client email address.
///
/// Used only to warn early that a confirmation will likely bounce; an
/// implausible address never blocks intake.
pub fn looks_like_email(s: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap()
    });
    re.is_match(s.trim())
}
