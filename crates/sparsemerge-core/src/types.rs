//! Type catalog for sparse matrix values
//!
//! Built-in element types are identified by a [`TypeCode`] and map onto Rust
//! primitives through the [`Element`] trait. User-defined types are opaque
//! byte blobs of a declared size; they can only be copied, never converted.

use bytemuck::{Pod, Zeroable};
use std::fmt;
use std::sync::Arc;

/// Codes of the built-in element types
///
/// Discriminants are stable and index the cast table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeCode {
    /// Boolean, stored as one byte holding 0 or 1
    Bool = 0,
    /// 8-bit signed integer
    Int8 = 1,
    /// 8-bit unsigned integer
    UInt8 = 2,
    /// 16-bit signed integer
    Int16 = 3,
    /// 16-bit unsigned integer
    UInt16 = 4,
    /// 32-bit signed integer
    Int32 = 5,
    /// 32-bit unsigned integer
    UInt32 = 6,
    /// 64-bit signed integer
    Int64 = 7,
    /// 64-bit unsigned integer
    UInt64 = 8,
    /// 32-bit floating point
    Fp32 = 9,
    /// 64-bit floating point
    Fp64 = 10,
}

impl TypeCode {
    /// Every built-in code, in discriminant order
    pub const ALL: [Self; 11] = [
        Self::Bool,
        Self::Int8,
        Self::UInt8,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Fp32,
        Self::Fp64,
    ];

    /// Size of one element in bytes
    #[inline]
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Fp32 => 4,
            Self::Int64 | Self::UInt64 | Self::Fp64 => 8,
        }
    }

    /// Short name for display (e.g. "fp64", "int32")
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Fp32 => "fp32",
            Self::Fp64 => "fp64",
        }
    }

    /// Returns true for Fp32 and Fp64
    #[inline]
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Fp32 | Self::Fp64)
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An opaque user-defined element type
#[derive(Debug)]
pub struct UserType {
    name: String,
    size: usize,
}

/// Element type of a matrix or of an operator argument
///
/// Two user types are equal only if they are the same registered type;
/// a second registration with the same name and size is a different type.
#[derive(Clone)]
pub enum Type {
    /// One of the built-in codes
    Builtin(TypeCode),
    /// A user-defined type
    User(Arc<UserType>),
}

impl Type {
    pub const BOOL: Self = Self::Builtin(TypeCode::Bool);
    pub const INT8: Self = Self::Builtin(TypeCode::Int8);
    pub const UINT8: Self = Self::Builtin(TypeCode::UInt8);
    pub const INT16: Self = Self::Builtin(TypeCode::Int16);
    pub const UINT16: Self = Self::Builtin(TypeCode::UInt16);
    pub const INT32: Self = Self::Builtin(TypeCode::Int32);
    pub const UINT32: Self = Self::Builtin(TypeCode::UInt32);
    pub const INT64: Self = Self::Builtin(TypeCode::Int64);
    pub const UINT64: Self = Self::Builtin(TypeCode::UInt64);
    pub const FP32: Self = Self::Builtin(TypeCode::Fp32);
    pub const FP64: Self = Self::Builtin(TypeCode::Fp64);

    /// Register a new user-defined type of `size` bytes
    #[must_use]
    pub fn user(name: impl Into<String>, size: usize) -> Self {
        Self::User(Arc::new(UserType {
            name: name.into(),
            size,
        }))
    }

    /// Built-in code, or `None` for a user-defined type
    #[inline]
    #[must_use]
    pub fn code(&self) -> Option<TypeCode> {
        match self {
            Self::Builtin(code) => Some(*code),
            Self::User(_) => None,
        }
    }

    /// Size of one element in bytes
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Builtin(code) => code.size(),
            Self::User(u) => u.size,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(code) => code.name(),
            Self::User(u) => &u.name,
        }
    }

    /// Whether values of `other` can be cast into this type
    ///
    /// All built-in types are mutually compatible; a user type is only
    /// compatible with itself.
    #[must_use]
    pub fn is_compatible(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Builtin(_), Self::Builtin(_)) => true,
            (Self::User(a), Self::User(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::User(a), Self::User(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Type {}

impl From<TypeCode> for Type {
    fn from(code: TypeCode) -> Self {
        Self::Builtin(code)
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(code) => write!(f, "{code}"),
            Self::User(u) => write!(f, "user:{}[{}]", u.name, u.size),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One-byte boolean element
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Bool(pub u8);

// Safety: Bool is a transparent wrapper around u8, which is Pod
unsafe impl Pod for Bool {}
unsafe impl Zeroable for Bool {}

impl From<bool> for Bool {
    #[inline]
    fn from(b: bool) -> Self {
        Self(u8::from(b))
    }
}

impl From<Bool> for bool {
    #[inline]
    fn from(b: Bool) -> Self {
        b.0 != 0
    }
}

/// Widest lossless carrier for a built-in value, used by casts
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Scalar {
    #[inline]
    #[must_use]
    pub fn is_nonzero(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Int(v) => v != 0,
            Self::UInt(v) => v != 0,
            Self::Float(v) => v != 0.0,
        }
    }
}

/// Trait linking Rust element types to built-in type codes
///
/// The arithmetic methods carry the operator semantics of the catalog:
/// integers wrap, integer division by zero saturates, and `Bool` maps
/// arithmetic onto logic.
pub trait Element: Pod + PartialOrd + fmt::Debug + Send + Sync + 'static {
    /// The code of this element type
    const CODE: TypeCode;

    fn to_scalar(self) -> Scalar;

    /// Convert with C semantics: to-bool is `!= 0`, float to integer
    /// saturates (NaN becomes 0), integer to integer wraps.
    fn from_scalar(s: Scalar) -> Self;

    fn zero() -> Self;
    fn one() -> Self;
    fn is_nonzero(self) -> bool;

    fn plus(self, y: Self) -> Self;
    fn minus(self, y: Self) -> Self;
    fn times(self, y: Self) -> Self;
    fn div(self, y: Self) -> Self;
    fn min_op(self, y: Self) -> Self;
    fn max_op(self, y: Self) -> Self;

    #[inline]
    fn from_bool(b: bool) -> Self {
        if b {
            Self::one()
        } else {
            Self::zero()
        }
    }
}

macro_rules! int_div {
    (signed, $x:expr, $y:expr, $t:ty) => {
        if $y == 0 {
            if $x == 0 {
                0
            } else if $x < 0 {
                <$t>::MIN
            } else {
                <$t>::MAX
            }
        } else {
            $x.wrapping_div($y)
        }
    };
    (unsigned, $x:expr, $y:expr, $t:ty) => {
        if $y == 0 {
            if $x == 0 {
                0
            } else {
                <$t>::MAX
            }
        } else {
            $x / $y
        }
    };
}

macro_rules! impl_int_element {
    ($t:ty, $code:ident, $sign:ident, $variant:ident, $wide:ty) => {
        impl Element for $t {
            const CODE: TypeCode = TypeCode::$code;

            #[inline]
            #[allow(clippy::cast_lossless, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
            fn to_scalar(self) -> Scalar {
                Scalar::$variant(self as $wide)
            }

            #[inline]
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_possible_wrap
            )]
            fn from_scalar(s: Scalar) -> Self {
                match s {
                    Scalar::Bool(b) => Self::from(b),
                    Scalar::Int(v) => v as Self,
                    Scalar::UInt(v) => v as Self,
                    Scalar::Float(v) => v as Self,
                }
            }

            #[inline]
            fn zero() -> Self {
                0
            }

            #[inline]
            fn one() -> Self {
                1
            }

            #[inline]
            fn is_nonzero(self) -> bool {
                self != 0
            }

            #[inline]
            fn plus(self, y: Self) -> Self {
                self.wrapping_add(y)
            }

            #[inline]
            fn minus(self, y: Self) -> Self {
                self.wrapping_sub(y)
            }

            #[inline]
            fn times(self, y: Self) -> Self {
                self.wrapping_mul(y)
            }

            #[inline]
            fn div(self, y: Self) -> Self {
                int_div!($sign, self, y, $t)
            }

            #[inline]
            fn min_op(self, y: Self) -> Self {
                self.min(y)
            }

            #[inline]
            fn max_op(self, y: Self) -> Self {
                self.max(y)
            }
        }
    };
}

impl_int_element!(i8, Int8, signed, Int, i64);
impl_int_element!(u8, UInt8, unsigned, UInt, u64);
impl_int_element!(i16, Int16, signed, Int, i64);
impl_int_element!(u16, UInt16, unsigned, UInt, u64);
impl_int_element!(i32, Int32, signed, Int, i64);
impl_int_element!(u32, UInt32, unsigned, UInt, u64);
impl_int_element!(i64, Int64, signed, Int, i64);
impl_int_element!(u64, UInt64, unsigned, UInt, u64);

macro_rules! impl_float_element {
    ($t:ty, $code:ident) => {
        impl Element for $t {
            const CODE: TypeCode = TypeCode::$code;

            #[inline]
            #[allow(clippy::cast_lossless)]
            fn to_scalar(self) -> Scalar {
                Scalar::Float(self as f64)
            }

            #[inline]
            #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
            fn from_scalar(s: Scalar) -> Self {
                match s {
                    Scalar::Bool(b) => Self::from(b),
                    Scalar::Int(v) => v as Self,
                    Scalar::UInt(v) => v as Self,
                    Scalar::Float(v) => v as Self,
                }
            }

            #[inline]
            fn zero() -> Self {
                0.0
            }

            #[inline]
            fn one() -> Self {
                1.0
            }

            #[inline]
            fn is_nonzero(self) -> bool {
                self != 0.0
            }

            #[inline]
            fn plus(self, y: Self) -> Self {
                self + y
            }

            #[inline]
            fn minus(self, y: Self) -> Self {
                self - y
            }

            #[inline]
            fn times(self, y: Self) -> Self {
                self * y
            }

            #[inline]
            fn div(self, y: Self) -> Self {
                self / y
            }

            // fmin/fmax: a NaN operand is ignored
            #[inline]
            fn min_op(self, y: Self) -> Self {
                self.min(y)
            }

            #[inline]
            fn max_op(self, y: Self) -> Self {
                self.max(y)
            }
        }
    };
}

impl_float_element!(f32, Fp32);
impl_float_element!(f64, Fp64);

impl Element for Bool {
    const CODE: TypeCode = TypeCode::Bool;

    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::Bool(self.0 != 0)
    }

    #[inline]
    fn from_scalar(s: Scalar) -> Self {
        Self::from(s.is_nonzero())
    }

    #[inline]
    fn zero() -> Self {
        Self(0)
    }

    #[inline]
    fn one() -> Self {
        Self(1)
    }

    #[inline]
    fn is_nonzero(self) -> bool {
        self.0 != 0
    }

    // On booleans: PLUS is LOR, MINUS is LXOR, TIMES is LAND, DIV is FIRST.
    #[inline]
    fn plus(self, y: Self) -> Self {
        Self::from(self.is_nonzero() || y.is_nonzero())
    }

    #[inline]
    fn minus(self, y: Self) -> Self {
        Self::from(self.is_nonzero() != y.is_nonzero())
    }

    #[inline]
    fn times(self, y: Self) -> Self {
        Self::from(self.is_nonzero() && y.is_nonzero())
    }

    #[inline]
    fn div(self, _y: Self) -> Self {
        self
    }

    #[inline]
    fn min_op(self, y: Self) -> Self {
        self.times(y)
    }

    #[inline]
    fn max_op(self, y: Self) -> Self {
        self.plus(y)
    }
}

/// Run `$body` with `$T` bound to the Rust type of a built-in code
#[macro_export]
macro_rules! dispatch_type {
    ($code:expr, $T:ident => $body:block) => {
        match $code {
            $crate::types::TypeCode::Bool => {
                type $T = $crate::types::Bool;
                $body
            }
            $crate::types::TypeCode::Int8 => {
                type $T = i8;
                $body
            }
            $crate::types::TypeCode::UInt8 => {
                type $T = u8;
                $body
            }
            $crate::types::TypeCode::Int16 => {
                type $T = i16;
                $body
            }
            $crate::types::TypeCode::UInt16 => {
                type $T = u16;
                $body
            }
            $crate::types::TypeCode::Int32 => {
                type $T = i32;
                $body
            }
            $crate::types::TypeCode::UInt32 => {
                type $T = u32;
                $body
            }
            $crate::types::TypeCode::Int64 => {
                type $T = i64;
                $body
            }
            $crate::types::TypeCode::UInt64 => {
                type $T = u64;
                $body
            }
            $crate::types::TypeCode::Fp32 => {
                type $T = f32;
                $body
            }
            $crate::types::TypeCode::Fp64 => {
                type $T = f64;
                $body
            }
        }
    };
}
