// SPDX-License-Identifier: Apache-2.0
//! Conversions between Rust scalar types and the codec's runtime [`Value`].

use factdb_codec::Value;

use crate::MappingError;

/// A Rust type that can round-trip through a [`Value`] and has a
/// well-defined zero value — the default an absent non-optional scalar
/// attribute reconstructs as.
pub trait ScalarValue: Sized {
    /// The `Value` variant name this type expects, used in error messages.
    const EXPECTED: &'static str;

    /// Wrap `self` as a `Value` for destructuring.
    fn to_value(&self) -> Value;

    /// Unwrap `value`, failing if it is not the expected variant.
    fn from_value(value: &Value) -> Result<Self, MappingError>;

    /// The zero value for this type (`false`, `0`, `""`, empty bytes).
    fn zero() -> Self;
}

impl ScalarValue for bool {
    const EXPECTED: &'static str = "Bool";

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Result<Self, MappingError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(MappingError::type_mismatch(Self::EXPECTED, other)),
        }
    }

    fn zero() -> Self {
        false
    }
}

impl ScalarValue for u8 {
    const EXPECTED: &'static str = "Byte";

    fn to_value(&self) -> Value {
        Value::Byte(*self)
    }

    fn from_value(value: &Value) -> Result<Self, MappingError> {
        match value {
            Value::Byte(b) => Ok(*b),
            other => Err(MappingError::type_mismatch(Self::EXPECTED, other)),
        }
    }

    fn zero() -> Self {
        0
    }
}

impl ScalarValue for i32 {
    const EXPECTED: &'static str = "I32";

    fn to_value(&self) -> Value {
        Value::I32(*self)
    }

    fn from_value(value: &Value) -> Result<Self, MappingError> {
        match value {
            Value::I32(v) => Ok(*v),
            other => Err(MappingError::type_mismatch(Self::EXPECTED, other)),
        }
    }

    fn zero() -> Self {
        0
    }
}

impl ScalarValue for i64 {
    const EXPECTED: &'static str = "I64";

    fn to_value(&self) -> Value {
        Value::I64(*self)
    }

    fn from_value(value: &Value) -> Result<Self, MappingError> {
        match value {
            Value::I64(v) => Ok(*v),
            other => Err(MappingError::type_mismatch(Self::EXPECTED, other)),
        }
    }

    fn zero() -> Self {
        0
    }
}

impl ScalarValue for String {
    const EXPECTED: &'static str = "Str";

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self, MappingError> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            other => Err(MappingError::type_mismatch(Self::EXPECTED, other)),
        }
    }

    fn zero() -> Self {
        String::new()
    }
}

impl ScalarValue for Vec<u8> {
    const EXPECTED: &'static str = "Bytes";

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self, MappingError> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            other => Err(MappingError::type_mismatch(Self::EXPECTED, other)),
        }
    }

    fn zero() -> Self {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_match_spec_defaults() {
        assert!(!bool::zero());
        assert_eq!(i32::zero(), 0);
        assert_eq!(i64::zero(), 0);
        assert_eq!(String::zero(), String::new());
        assert_eq!(Vec::<u8>::zero(), Vec::<u8>::new());
    }

    #[test]
    fn round_trips_through_value() {
        assert_eq!(String::from_value(&"hi".to_string().to_value()).unwrap(), "hi");
        assert_eq!(i32::from_value(&42i32.to_value()).unwrap(), 42);
    }

    #[test]
    fn mismatched_variant_is_a_mapping_error() {
        let err = i32::from_value(&Value::Str("nope".into())).unwrap_err();
        assert!(matches!(err, MappingError::TypeMismatch { .. }));
    }
}
