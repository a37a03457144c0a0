// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Type-safe scalar variant and its conversion rules.

mod convert;
mod scalar_type;
mod typed_value;

pub use scalar_type::ScalarType;
pub use typed_value::{EnumIndex, Scalar, TypedValue};
