//! Plain scalar resolution (YAML 1.2 core schema).

use crate::Scalar;
use once_cell::sync::Lazy;
use regex::Regex;

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?[0-9]+$").unwrap());
static HEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]+$").unwrap());
static OCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0o[0-7]+$").unwrap());
static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$").unwrap()
});

/// Resolve the text of a plain scalar to its value.
///
/// Quoted and block scalars are always strings and never go through here.
pub fn resolve_plain(value: &str) -> Scalar {
    match value {
        "" | "~" | "null" | "Null" | "NULL" => return Scalar::Null,
        "true" | "True" | "TRUE" => return Scalar::Bool(true),
        "false" | "False" | "FALSE" => return Scalar::Bool(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
            return Scalar::Float(f64::INFINITY);
        }
        "-.inf" | "-.Inf" | "-.INF" => return Scalar::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return Scalar::Float(f64::NAN),
        _ => {}
    }

    if INT_RE.is_match(value) {
        if let Ok(i) = value.parse::<i64>() {
            return Scalar::Int(i);
        }
        if let Ok(f) = value.parse::<f64>() {
            return Scalar::Float(f);
        }
    }
    if HEX_RE.is_match(value)
        && let Ok(i) = i64::from_str_radix(&value[2..], 16)
    {
        return Scalar::Int(i);
    }
    if OCT_RE.is_match(value)
        && let Ok(i) = i64::from_str_radix(&value[2..], 8)
    {
        return Scalar::Int(i);
    }
    if FLOAT_RE.is_match(value)
        && let Ok(f) = value.parse::<f64>()
    {
        return Scalar::Float(f);
    }

    Scalar::String(value.to_string())
}

/// Whether a string would read back as something other than itself when
/// written as a plain scalar. Also covers the YAML 1.1 booleans, which many
/// Kubernetes tools still interpret.
pub(crate) fn is_ambiguous(value: &str) -> bool {
    if !matches!(resolve_plain(value), Scalar::String(_)) {
        return true;
    }
    matches!(
        value,
        "y" | "Y"
            | "yes"
            | "Yes"
            | "YES"
            | "n"
            | "N"
            | "no"
            | "No"
            | "NO"
            | "on"
            | "On"
            | "ON"
            | "off"
            | "Off"
            | "OFF"
    )
}
