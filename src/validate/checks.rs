//! Built-in field checks.
//!
//! Checks are pure functions of the field value and the constraint
//! parameter. A malformed parameter makes the check fail; it is never
//! reported as anything other than a violation.

use std::net::Ipv6Addr;

use toml::Value;

/// The value under test together with the constraint parameter.
#[derive(Debug, Clone, Copy)]
pub struct FieldRef<'a> {
    key: &'a str,
    value: Option<&'a Value>,
    param: &'a str,
}

impl<'a> FieldRef<'a> {
    pub fn new(key: &'a str, value: Option<&'a Value>, param: &'a str) -> Self {
        Self { key, value, param }
    }

    /// Dotted key of the field.
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// Decoded value, or `None` when the key is absent.
    pub fn value(&self) -> Option<&'a Value> {
        self.value
    }

    /// Constraint parameter with surrounding whitespace removed.
    pub fn param(&self) -> &'a str {
        self.param.trim()
    }
}

/// Signature shared by built-in and registered checks.
pub type CheckFn = dyn Fn(&FieldRef<'_>) -> bool + Send + Sync;

pub const MULTIPLE_OF: &str = "multipleof";
pub const HOST_PORT: &str = "host_port";
pub const REQUIRED: &str = "required";
pub const MIN: &str = "min";
pub const MAX: &str = "max";
pub const ONE_OF: &str = "oneof";

pub(crate) const BUILTINS: &[(&str, fn(&FieldRef<'_>) -> bool)] = &[
    (MULTIPLE_OF, multiple_of),
    (HOST_PORT, host_port),
    (REQUIRED, required),
    (MIN, min),
    (MAX, max),
    (ONE_OF, one_of),
];

/// Passes when the value divides evenly by the parameter.
///
/// Floats pass when `value / denom` lies within `0.01` of an integer.
pub fn multiple_of(field: &FieldRef<'_>) -> bool {
    let denom = match field.param().parse::<u64>() {
        Ok(denom) if denom > 0 => denom,
        _ => return false,
    };

    match field.value() {
        Some(Value::Integer(v)) => i128::from(*v) % i128::from(denom) == 0,
        Some(Value::Float(v)) => {
            let ratio = v / denom as f64;
            (ratio - ratio.round()).abs() < 0.01
        }
        _ => false,
    }
}

/// Passes when the string value is a `host:port` pair.
pub fn host_port(field: &FieldRef<'_>) -> bool {
    match field.value() {
        Some(Value::String(s)) => split_host_port(s).is_some(),
        _ => false,
    }
}

/// Passes when the key is present and not an empty string, array or table.
pub fn required(field: &FieldRef<'_>) -> bool {
    match field.value() {
        None => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Table(t)) => !t.is_empty(),
        Some(_) => true,
    }
}

/// Numbers compare by value; strings, arrays and tables by length.
pub fn min(field: &FieldRef<'_>) -> bool {
    compare(field, |measured, bound| measured >= bound)
}

pub fn max(field: &FieldRef<'_>) -> bool {
    compare(field, |measured, bound| measured <= bound)
}

/// Passes when the value's string form is one of the space-separated options.
pub fn one_of(field: &FieldRef<'_>) -> bool {
    let Some(actual) = field.value().and_then(scalar_string) else {
        return false;
    };
    field.param().split_whitespace().any(|option| option == actual)
}

fn compare(field: &FieldRef<'_>, ok: impl Fn(f64, f64) -> bool) -> bool {
    let Ok(bound) = field.param().parse::<f64>() else {
        return false;
    };

    let measured = match field.value() {
        Some(Value::Integer(v)) => *v as f64,
        Some(Value::Float(v)) => *v,
        Some(Value::String(s)) => s.chars().count() as f64,
        Some(Value::Array(a)) => a.len() as f64,
        Some(Value::Table(t)) => t.len() as f64,
        _ => return false,
    };

    ok(measured, bound)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Splits `host:port`, `[v6]:port` or `:port` into host and port.
///
/// The host may be empty. The port must be non-empty: a decimal number
/// that fits in 16 bits or a service name.
pub(crate) fn split_host_port(s: &str) -> Option<(&str, &str)> {
    let (host, port) = if let Some(rest) = s.strip_prefix('[') {
        let end = rest.find(']')?;
        let host = &rest[..end];
        let port = rest[end + 1..].strip_prefix(':')?;

        let literal = host.split_once('%').map_or(host, |(addr, _zone)| addr);
        literal.parse::<Ipv6Addr>().ok()?;
        (host, port)
    } else {
        let (host, port) = s.rsplit_once(':')?;
        if host.contains(':') {
            return None;
        }
        (host, port)
    };

    if host.contains(['[', ']']) || port.contains(['[', ']']) {
        return None;
    }
    if !valid_port(port) {
        return None;
    }

    Some((host, port))
}

fn valid_port(port: &str) -> bool {
    if port.is_empty() {
        return false;
    }
    if port.bytes().all(|b| b.is_ascii_digit()) {
        return port.parse::<u16>().is_ok();
    }
    port.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(f: fn(&FieldRef<'_>) -> bool, value: Value, param: &str) -> bool {
        f(&FieldRef::new("field", Some(&value), param))
    }

    #[test]
    fn test_multiple_of_integers() {
        for v in [0, 10, 100, -20] {
            assert!(check(multiple_of, Value::Integer(v), "10"), "{v} should pass");
        }
        for v in [1, 7, 15] {
            assert!(!check(multiple_of, Value::Integer(v), "10"), "{v} should fail");
        }
    }

    #[test]
    fn test_multiple_of_floats_use_tolerance() {
        assert!(check(multiple_of, Value::Float(5.0001), "5"));
        assert!(check(multiple_of, Value::Float(10.0), "5"));
        assert!(!check(multiple_of, Value::Float(5.2), "5"));
    }

    #[test]
    fn test_multiple_of_rejects_bad_params_and_kinds() {
        assert!(!check(multiple_of, Value::Integer(10), "0"));
        assert!(!check(multiple_of, Value::Integer(10), "-5"));
        assert!(!check(multiple_of, Value::Integer(10), "ten"));
        assert!(!check(multiple_of, Value::Integer(10), ""));
        assert!(!check(multiple_of, Value::String("10".into()), "10"));
        assert!(check(multiple_of, Value::Integer(10), " 10 "));
    }

    #[test]
    fn test_host_port_accepts_valid_pairs() {
        for s in ["localhost:8080", "127.0.0.1:80", "[::1]:443", ":9000", "db:postgres"] {
            assert!(
                check(host_port, Value::String(s.into()), ""),
                "{s} should pass"
            );
        }
    }

    #[test]
    fn test_host_port_rejects_invalid_pairs() {
        for s in [
            "localhost",
            ":",
            "host:",
            "::1:443",
            "[::1]",
            "[::1]443",
            "[not-v6]:443",
            "[::1:443",
            "host:99999",
            "a]b:80",
        ] {
            assert!(
                !check(host_port, Value::String(s.into()), ""),
                "{s} should fail"
            );
        }
        assert!(!check(host_port, Value::Integer(80), ""));
    }

    #[test]
    fn test_required() {
        assert!(!required(&FieldRef::new("k", None, "")));
        assert!(!check(required, Value::String(String::new()), ""));
        assert!(check(required, Value::Integer(0), ""));
        assert!(check(required, Value::String("x".into()), ""));
    }

    #[test]
    fn test_min_max() {
        assert!(check(min, Value::Integer(3), "3"));
        assert!(!check(min, Value::Float(2.5), "3"));
        assert!(check(max, Value::String("abc".into()), "3"));
        assert!(!check(max, Value::String("abcd".into()), "3"));
        assert!(!check(max, Value::Integer(1), "x"));
    }

    #[test]
    fn test_one_of() {
        assert!(check(one_of, Value::String("info".into()), "debug info warn"));
        assert!(check(one_of, Value::Integer(2), "1 2 3"));
        assert!(!check(one_of, Value::String("trace".into()), "debug info"));
    }
}
