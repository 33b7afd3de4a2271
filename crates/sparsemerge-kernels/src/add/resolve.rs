//! Choose between a typed kernel and the generic cast-based plan
//!
//! A typed kernel exists for every built-in opcode on every built-in type,
//! but it does no typecasting: A and B must already have the operator's
//! operand type and C its result type. Anything else, user operators and
//! the no-operator merge included, runs the generic plan.

use sparsemerge_core::{cast_fn, copy_user_user, BinaryFn, BinaryOp, CastFn, Error, Opcode, Result, Type, TypeCode};

/// Byte sizes and cast functions for the generic workers
#[derive(Clone)]
pub struct GenericPlan {
    /// `None` in no-operator mode; an intersection is then a contract breach
    pub fadd: Option<BinaryFn>,
    pub csize: usize,
    pub asize: usize,
    pub bsize: usize,
    pub xsize: usize,
    pub ysize: usize,
    pub zsize: usize,
    pub cast_a_to_x: CastFn,
    pub cast_b_to_y: CastFn,
    pub cast_a_to_c: CastFn,
    pub cast_b_to_c: CastFn,
    pub cast_z_to_c: CastFn,
}

impl std::fmt::Debug for GenericPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericPlan")
            .field("has_op", &self.fadd.is_some())
            .field("csize", &self.csize)
            .field("asize", &self.asize)
            .field("bsize", &self.bsize)
            .field("xsize", &self.xsize)
            .field("ysize", &self.ysize)
            .field("zsize", &self.zsize)
            .finish_non_exhaustive()
    }
}

/// How the merge computes values
#[derive(Debug, Clone)]
pub enum AddStrategy {
    /// Typed kernel for `opcode` on operands of type `code`
    Builtin { opcode: Opcode, code: TypeCode },
    Generic(GenericPlan),
}

impl AddStrategy {
    #[inline]
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin { .. })
    }
}

/// Pick the strategy for `C = A op B`, checking every type pairing first.
///
/// # Errors
/// `TypeMismatch` when, without an operator, A or B differs from C, or
/// when with an operator any of the five pairings is incompatible.
pub fn resolve(ctype: &Type, op: Option<&BinaryOp>, atype: &Type, btype: &Type) -> Result<AddStrategy> {
    let Some(op) = op else {
        if atype != ctype {
            return Err(Error::type_mismatch("add without operator (A)", ctype.name(), atype.name()));
        }
        if btype != ctype {
            return Err(Error::type_mismatch("add without operator (B)", ctype.name(), btype.name()));
        }
        let size = ctype.size();
        tracing::debug!(ctype = %ctype, "generic add, no operator");
        return Ok(AddStrategy::Generic(GenericPlan {
            fadd: None,
            csize: size,
            asize: size,
            bsize: size,
            xsize: size,
            ysize: size,
            zsize: size,
            cast_a_to_x: copy_user_user,
            cast_b_to_y: copy_user_user,
            cast_a_to_c: copy_user_user,
            cast_b_to_c: copy_user_user,
            cast_z_to_c: copy_user_user,
        }));
    };

    let cast_a_to_x = cast_fn(op.xtype(), atype, "operator x-type vs A")?;
    let cast_b_to_y = cast_fn(op.ytype(), btype, "operator y-type vs B")?;
    let cast_a_to_c = cast_fn(ctype, atype, "C vs A")?;
    let cast_b_to_c = cast_fn(ctype, btype, "C vs B")?;
    let cast_z_to_c = cast_fn(ctype, op.ztype(), "C vs operator z-type")?;

    if !cfg!(feature = "compact") {
        if let Some(opcode) = op.opcode() {
            if let Some(code) = op.xtype().code() {
                if atype == op.xtype() && btype == op.ytype() && ctype == op.ztype() {
                    return Ok(AddStrategy::Builtin { opcode, code });
                }
            }
        }
    }

    tracing::debug!(op = op.name(), ctype = %ctype, atype = %atype, btype = %btype, "generic add");
    Ok(AddStrategy::Generic(GenericPlan {
        fadd: Some(op.function().clone()),
        csize: ctype.size(),
        asize: atype.size(),
        bsize: btype.size(),
        xsize: op.xtype().size(),
        ysize: op.ytype().size(),
        zsize: op.ztype().size(),
        cast_a_to_x,
        cast_b_to_y,
        cast_a_to_c,
        cast_b_to_c,
        cast_z_to_c,
    }))
}
