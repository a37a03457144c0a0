// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Closed sum type over the scalar set moved between fields.

use serde::{Deserialize, Serialize};

use super::convert::ConvertFrom;
use super::ScalarType;
use crate::core::error::{FieldLinkError, Result};

/// Index into an enumerated field's choice list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnumIndex(pub i32);

/// Holds exactly one scalar, or nothing.
///
/// The tag always matches the type last stored. Cloning a string-tagged value
/// copies the string. `Nil` is distinct from every zero value and is the only
/// state for which [`is_nil`](Self::is_nil) is true.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypedValue {
    #[default]
    Nil,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Enum(EnumIndex),
}

mod sealed {
    pub trait Sealed {}
}

/// Storage types a [`TypedValue`] can hold.
///
/// Sealed: the set of tags is closed.
pub trait Scalar: sealed::Sealed + Sized {
    const SCALAR_TYPE: ScalarType;

    fn into_value(self) -> TypedValue;

    fn from_ref(value: &TypedValue) -> Option<&Self>;

    fn from_mut(value: &mut TypedValue) -> Option<&mut Self>;

    /// Converted copy of `value`; `None` only for nil.
    fn convert(value: &TypedValue) -> Option<Self>;
}

fn convert_with<T: ConvertFrom>(value: &TypedValue) -> Option<T> {
    Some(match value {
        TypedValue::Nil => return None,
        TypedValue::Bool(v) => T::from_bool(*v),
        TypedValue::I8(v) => T::from_i64(i64::from(*v)),
        TypedValue::I16(v) => T::from_i64(i64::from(*v)),
        TypedValue::I32(v) => T::from_i64(i64::from(*v)),
        TypedValue::I64(v) => T::from_i64(*v),
        TypedValue::U8(v) => T::from_u64(u64::from(*v)),
        TypedValue::U16(v) => T::from_u64(u64::from(*v)),
        TypedValue::U32(v) => T::from_u64(u64::from(*v)),
        TypedValue::U64(v) => T::from_u64(*v),
        TypedValue::F32(v) => T::from_f64(f64::from(*v)),
        TypedValue::F64(v) => T::from_f64(*v),
        TypedValue::String(s) => T::from_text(s),
        TypedValue::Enum(e) => T::from_i64(i64::from(e.0)),
    })
}

macro_rules! scalar_impl {
    ($($t:ty => $variant:ident, $tag:ident;)*) => {
        $(
            impl sealed::Sealed for $t {}

            impl Scalar for $t {
                const SCALAR_TYPE: ScalarType = ScalarType::$tag;

                #[inline]
                fn into_value(self) -> TypedValue {
                    TypedValue::$variant(self)
                }

                #[inline]
                fn from_ref(value: &TypedValue) -> Option<&Self> {
                    match value {
                        TypedValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                #[inline]
                fn from_mut(value: &mut TypedValue) -> Option<&mut Self> {
                    match value {
                        TypedValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                #[inline]
                fn convert(value: &TypedValue) -> Option<Self> {
                    convert_with::<$t>(value)
                }
            }

            impl From<$t> for TypedValue {
                #[inline]
                fn from(v: $t) -> Self {
                    TypedValue::$variant(v)
                }
            }
        )*
    };
}

scalar_impl! {
    bool => Bool, Boolean;
    i8 => I8, Int8;
    i16 => I16, Int16;
    i32 => I32, Int32;
    i64 => I64, Int64;
    u8 => U8, UInt8;
    u16 => U16, UInt16;
    u32 => U32, UInt32;
    u64 => U64, UInt64;
    f32 => F32, Float32;
    f64 => F64, Float64;
}

impl sealed::Sealed for String {}

impl Scalar for String {
    const SCALAR_TYPE: ScalarType = ScalarType::String;

    fn into_value(self) -> TypedValue {
        TypedValue::String(self)
    }

    fn from_ref(value: &TypedValue) -> Option<&Self> {
        match value {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn from_mut(value: &mut TypedValue) -> Option<&mut Self> {
        match value {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn convert(value: &TypedValue) -> Option<Self> {
        match value {
            TypedValue::Nil => None,
            TypedValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl sealed::Sealed for EnumIndex {}

impl Scalar for EnumIndex {
    const SCALAR_TYPE: ScalarType = ScalarType::Enum;

    fn into_value(self) -> TypedValue {
        TypedValue::Enum(self)
    }

    fn from_ref(value: &TypedValue) -> Option<&Self> {
        match value {
            TypedValue::Enum(e) => Some(e),
            _ => None,
        }
    }

    fn from_mut(value: &mut TypedValue) -> Option<&mut Self> {
        match value {
            TypedValue::Enum(e) => Some(e),
            _ => None,
        }
    }

    fn convert(value: &TypedValue) -> Option<Self> {
        convert_with::<i32>(value).map(EnumIndex)
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        TypedValue::String(v)
    }
}

// Borrowed text is stored as an owned String.
impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::String(v.to_owned())
    }
}

impl From<EnumIndex> for TypedValue {
    fn from(v: EnumIndex) -> Self {
        TypedValue::Enum(v)
    }
}

impl TypedValue {
    pub fn new(value: impl Into<TypedValue>) -> Self {
        value.into()
    }

    /// Live tag, `None` when nil.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        Some(match self {
            Self::Nil => return None,
            Self::Bool(_) => ScalarType::Boolean,
            Self::I8(_) => ScalarType::Int8,
            Self::I16(_) => ScalarType::Int16,
            Self::I32(_) => ScalarType::Int32,
            Self::I64(_) => ScalarType::Int64,
            Self::U8(_) => ScalarType::UInt8,
            Self::U16(_) => ScalarType::UInt16,
            Self::U32(_) => ScalarType::UInt32,
            Self::U64(_) => ScalarType::UInt64,
            Self::F32(_) => ScalarType::Float32,
            Self::F64(_) => ScalarType::Float64,
            Self::String(_) => ScalarType::String,
            Self::Enum(_) => ScalarType::Enum,
        })
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Copy out the value converted to `T`.
    ///
    /// Fails with `BadCast` only when nil; every other source converts.
    pub fn cast<T: Scalar>(&self) -> Result<T> {
        T::convert(self).ok_or(FieldLinkError::BadCast {
            expected: T::SCALAR_TYPE,
            found: None,
        })
    }

    /// Direct reference to the stored value. The tag must match `T` exactly.
    pub fn downcast_ref<T: Scalar>(&self) -> Result<&T> {
        let found = self.scalar_type();
        T::from_ref(self).ok_or(FieldLinkError::BadCast {
            expected: T::SCALAR_TYPE,
            found,
        })
    }

    pub fn downcast_mut<T: Scalar>(&mut self) -> Result<&mut T> {
        let found = self.scalar_type();
        T::from_mut(self).ok_or(FieldLinkError::BadCast {
            expected: T::SCALAR_TYPE,
            found,
        })
    }

    /// Replace the held value; any previous string storage is released.
    pub fn set(&mut self, value: impl Into<TypedValue>) {
        *self = value.into();
    }

    pub fn swap(&mut self, other: &mut TypedValue) {
        std::mem::swap(self, other);
    }

    /// Move the value out, leaving nil behind.
    pub fn take(&mut self) -> TypedValue {
        std::mem::take(self)
    }
}

impl std::fmt::Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nil => f.write_str("(nil)"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::I8(v) => write!(f, "{}", v),
            Self::I16(v) => write!(f, "{}", v),
            Self::I32(v) => write!(f, "{}", v),
            Self::I64(v) => write!(f, "{}", v),
            Self::U8(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::F32(v) => write!(f, "{}", v),
            Self::F64(v) => write!(f, "{}", v),
            Self::String(s) => f.write_str(s),
            Self::Enum(e) => write!(f, "{}", e.0),
        }
    }
}
