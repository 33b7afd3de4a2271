//! Binary operators combining A(i,j) and B(i,j)
//!
//! Built-in operators carry an [`Opcode`] so kernels can pick a typed
//! implementation; every operator, built-in or not, also carries a
//! byte-level function for the generic path.

use std::fmt;
use std::sync::Arc;

use crate::cast::{read_element, write_element};
use crate::dispatch_type;
use crate::error::{Error, Result};
use crate::types::{Bool, Element, Type, TypeCode};

/// Byte-level operator body: `z = f(x, y)`
pub type BinaryFn = Arc<dyn Fn(&mut [u8], &[u8], &[u8]) + Send + Sync>;

/// Built-in combinators
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    First,
    Second,
    /// Either operand; this implementation returns the second
    Any,
    /// Always one
    Pair,
    Min,
    Max,
    Plus,
    Minus,
    Rminus,
    Times,
    Div,
    Rdiv,
    Iseq,
    Isne,
    Isgt,
    Islt,
    Isge,
    Isle,
    Lor,
    Land,
    Lxor,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Opcode {
    /// Every built-in opcode
    pub const ALL: [Self; 27] = [
        Self::First,
        Self::Second,
        Self::Any,
        Self::Pair,
        Self::Min,
        Self::Max,
        Self::Plus,
        Self::Minus,
        Self::Rminus,
        Self::Times,
        Self::Div,
        Self::Rdiv,
        Self::Iseq,
        Self::Isne,
        Self::Isgt,
        Self::Islt,
        Self::Isge,
        Self::Isle,
        Self::Lor,
        Self::Land,
        Self::Lxor,
        Self::Eq,
        Self::Ne,
        Self::Gt,
        Self::Lt,
        Self::Ge,
        Self::Le,
    ];

    /// True for the operators whose result is always `Bool`
    #[inline]
    #[must_use]
    pub const fn is_comparator(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Gt | Self::Lt | Self::Ge | Self::Le
        )
    }

    /// Apply an operator whose result type is its operand type.
    ///
    /// Comparators return 0 or 1 in the operand type here; use
    /// [`Opcode::compare`] for their `Bool` form.
    #[inline]
    #[must_use]
    pub fn apply<T: Element>(self, x: T, y: T) -> T {
        match self {
            Self::First => x,
            Self::Second | Self::Any => y,
            Self::Pair => T::one(),
            Self::Min => x.min_op(y),
            Self::Max => x.max_op(y),
            Self::Plus => x.plus(y),
            Self::Minus => x.minus(y),
            Self::Rminus => y.minus(x),
            Self::Times => x.times(y),
            Self::Div => x.div(y),
            Self::Rdiv => y.div(x),
            Self::Iseq | Self::Eq => T::from_bool(x == y),
            Self::Isne | Self::Ne => T::from_bool(x != y),
            Self::Isgt | Self::Gt => T::from_bool(x > y),
            Self::Islt | Self::Lt => T::from_bool(x < y),
            Self::Isge | Self::Ge => T::from_bool(x >= y),
            Self::Isle | Self::Le => T::from_bool(x <= y),
            Self::Lor => T::from_bool(x.is_nonzero() || y.is_nonzero()),
            Self::Land => T::from_bool(x.is_nonzero() && y.is_nonzero()),
            Self::Lxor => T::from_bool(x.is_nonzero() != y.is_nonzero()),
        }
    }

    /// Apply a comparator, producing `Bool`
    #[inline]
    #[must_use]
    pub fn compare<T: Element>(self, x: T, y: T) -> Bool {
        Bool::from(self.apply(x, y).is_nonzero())
    }

    /// Result type of this opcode on operands of type `code`
    #[inline]
    #[must_use]
    pub const fn ztype(self, code: TypeCode) -> TypeCode {
        if self.is_comparator() {
            TypeCode::Bool
        } else {
            code
        }
    }
}

/// A binary operator with declared operand and result types
#[derive(Clone)]
pub struct BinaryOp {
    name: String,
    opcode: Option<Opcode>,
    xtype: Type,
    ytype: Type,
    ztype: Type,
    function: BinaryFn,
}

impl BinaryOp {
    /// Built-in operator `opcode` on operands of type `code`
    #[must_use]
    pub fn builtin(opcode: Opcode, code: TypeCode) -> Self {
        let function: BinaryFn = dispatch_type!(code, T => {
            let f: BinaryFn = if opcode.is_comparator() {
                Arc::new(move |z: &mut [u8], x: &[u8], y: &[u8]| {
                    let r = opcode.compare(read_element::<T>(x), read_element::<T>(y));
                    write_element(z, r);
                })
            } else {
                Arc::new(move |z: &mut [u8], x: &[u8], y: &[u8]| {
                    let r = opcode.apply(read_element::<T>(x), read_element::<T>(y));
                    write_element(z, r);
                })
            };
            f
        });
        Self {
            name: format!("{opcode:?}_{code}").to_lowercase(),
            opcode: Some(opcode),
            xtype: Type::Builtin(code),
            ytype: Type::Builtin(code),
            ztype: Type::Builtin(opcode.ztype(code)),
            function,
        }
    }

    /// User-defined operator; never selected for a typed kernel
    pub fn user<F>(
        name: impl Into<String>,
        xtype: Type,
        ytype: Type,
        ztype: Type,
        function: F,
    ) -> Result<Self>
    where
        F: Fn(&mut [u8], &[u8], &[u8]) + Send + Sync + 'static,
    {
        let name = name.into();
        if xtype.size() == 0 || ytype.size() == 0 || ztype.size() == 0 {
            return Err(Error::type_mismatch(
                "user operator",
                "non-empty types",
                name,
            ));
        }
        Ok(Self {
            name,
            opcode: None,
            xtype,
            ytype,
            ztype,
            function: Arc::new(function),
        })
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Built-in opcode, `None` for user operators
    #[inline]
    #[must_use]
    pub const fn opcode(&self) -> Option<Opcode> {
        self.opcode
    }

    #[inline]
    #[must_use]
    pub const fn xtype(&self) -> &Type {
        &self.xtype
    }

    #[inline]
    #[must_use]
    pub const fn ytype(&self) -> &Type {
        &self.ytype
    }

    #[inline]
    #[must_use]
    pub const fn ztype(&self) -> &Type {
        &self.ztype
    }

    #[inline]
    #[must_use]
    pub fn function(&self) -> &BinaryFn {
        &self.function
    }
}

impl fmt::Debug for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryOp")
            .field("name", &self.name)
            .field("opcode", &self.opcode)
            .field("xtype", &self.xtype)
            .field("ytype", &self.ytype)
            .field("ztype", &self.ztype)
            .finish_non_exhaustive()
    }
}
