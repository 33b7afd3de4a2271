//! Value writers: how one output entry is produced
//!
//! The merge engine decides *which* source entries land at an output
//! position; a writer decides *what* value goes there. Positions `pa` and
//! `pb` index A's and B's values, `pc` is local to the task's output slice.

use std::cell::RefCell;

use sparsemerge_core::{Bool, Element, Error, Opcode, Result};
use thread_local::ThreadLocal;

use super::resolve::GenericPlan;

/// Fills output values for one task
pub trait ValueWriter {
    /// `C(pc) = (ctype) A(pa)`
    fn copy_a(&mut self, pc: usize, pa: usize);
    /// `C(pc) = (ctype) B(pb)`
    fn copy_b(&mut self, pc: usize, pb: usize);
    /// `C(pc) = A(pa) op B(pb)`
    fn combine(&mut self, pc: usize, pa: usize, pb: usize) -> Result<()>;
}

/// Shared, read-only state from which each task borrows a writer
pub trait AddKernel: Sync {
    type Writer<'c>: ValueWriter
    where
        Self: 'c;

    /// Writer over `cx`, the value bytes of one task's output slice
    fn writer<'c>(&'c self, cx: &'c mut [u8]) -> Result<Self::Writer<'c>>;
}

/// Kernel for a built-in opcode whose operand types already match.
///
/// `cast` converts a lone operand to the result type; it is the identity
/// except for comparators, whose result is `Bool`.
pub struct TypedKernel<'a, T, Z> {
    ax: &'a [T],
    bx: &'a [T],
    cast: fn(T) -> Z,
    op: fn(T, T) -> Z,
}

impl<'a, T: Element, Z: Element> TypedKernel<'a, T, Z> {
    #[must_use]
    pub const fn new(ax: &'a [T], bx: &'a [T], cast: fn(T) -> Z, op: fn(T, T) -> Z) -> Self {
        Self { ax, bx, cast, op }
    }
}

pub struct TypedWriter<'a, 'c, T, Z> {
    ax: &'a [T],
    bx: &'a [T],
    cast: fn(T) -> Z,
    op: fn(T, T) -> Z,
    cx: &'c mut [Z],
}

impl<T: Element, Z: Element> ValueWriter for TypedWriter<'_, '_, T, Z> {
    #[inline]
    fn copy_a(&mut self, pc: usize, pa: usize) {
        self.cx[pc] = (self.cast)(self.ax[pa]);
    }

    #[inline]
    fn copy_b(&mut self, pc: usize, pb: usize) {
        self.cx[pc] = (self.cast)(self.bx[pb]);
    }

    #[inline]
    fn combine(&mut self, pc: usize, pa: usize, pb: usize) -> Result<()> {
        self.cx[pc] = (self.op)(self.ax[pa], self.bx[pb]);
        Ok(())
    }
}

impl<'a, T: Element, Z: Element> AddKernel for TypedKernel<'a, T, Z> {
    type Writer<'c> = TypedWriter<'a, 'c, T, Z> where Self: 'c;

    fn writer<'c>(&'c self, cx: &'c mut [u8]) -> Result<Self::Writer<'c>> {
        Ok(TypedWriter {
            ax: self.ax,
            bx: self.bx,
            cast: self.cast,
            op: self.op,
            cx: bytemuck::try_cast_slice_mut(cx)?,
        })
    }
}

/// Typed body of a built-in opcode whose result is its operand type
#[must_use]
pub fn operator_fn<T: Element>(opcode: Opcode) -> fn(T, T) -> T {
    match opcode {
        Opcode::First => |x, _| x,
        Opcode::Second | Opcode::Any => |_, y| y,
        Opcode::Pair => |_, _| T::one(),
        Opcode::Min => |x: T, y| x.min_op(y),
        Opcode::Max => |x: T, y| x.max_op(y),
        Opcode::Plus => |x: T, y| x.plus(y),
        Opcode::Minus => |x: T, y| x.minus(y),
        Opcode::Rminus => |x, y: T| y.minus(x),
        Opcode::Times => |x: T, y| x.times(y),
        Opcode::Div => |x: T, y| x.div(y),
        Opcode::Rdiv => |x, y: T| y.div(x),
        Opcode::Lor => |x: T, y: T| T::from_bool(x.is_nonzero() || y.is_nonzero()),
        Opcode::Land => |x: T, y: T| T::from_bool(x.is_nonzero() && y.is_nonzero()),
        Opcode::Lxor => |x: T, y: T| T::from_bool(x.is_nonzero() != y.is_nonzero()),
        Opcode::Iseq | Opcode::Eq => |x, y| T::from_bool(x == y),
        Opcode::Isne | Opcode::Ne => |x, y| T::from_bool(x != y),
        Opcode::Isgt | Opcode::Gt => |x, y| T::from_bool(x > y),
        Opcode::Islt | Opcode::Lt => |x, y| T::from_bool(x < y),
        Opcode::Isge | Opcode::Ge => |x, y| T::from_bool(x >= y),
        Opcode::Isle | Opcode::Le => |x, y| T::from_bool(x <= y),
    }
}

/// Typed body of a comparator, producing `Bool`; `None` for other opcodes
#[must_use]
pub fn comparator_fn<T: Element>(opcode: Opcode) -> Option<fn(T, T) -> Bool> {
    let f: fn(T, T) -> Bool = match opcode {
        Opcode::Eq => |x, y| Bool::from(x == y),
        Opcode::Ne => |x, y| Bool::from(x != y),
        Opcode::Gt => |x, y| Bool::from(x > y),
        Opcode::Lt => |x, y| Bool::from(x < y),
        Opcode::Ge => |x, y| Bool::from(x >= y),
        Opcode::Le => |x, y| Bool::from(x <= y),
        _ => return None,
    };
    Some(f)
}

/// Per-thread buffers for the casted operands and the raw result
#[derive(Default)]
struct Scratch {
    x: Vec<u8>,
    y: Vec<u8>,
    z: Vec<u8>,
}

/// Kernel that casts through byte buffers and calls the operator's byte
/// function; handles user types and every mixed-type combination.
pub struct GenericKernel<'a> {
    plan: &'a GenericPlan,
    ax: &'a [u8],
    bx: &'a [u8],
    scratch: ThreadLocal<RefCell<Scratch>>,
}

impl<'a> GenericKernel<'a> {
    #[must_use]
    pub fn new(plan: &'a GenericPlan, ax: &'a [u8], bx: &'a [u8]) -> Self {
        Self {
            plan,
            ax,
            bx,
            scratch: ThreadLocal::new(),
        }
    }
}

pub struct GenericWriter<'c> {
    plan: &'c GenericPlan,
    ax: &'c [u8],
    bx: &'c [u8],
    scratch: std::cell::RefMut<'c, Scratch>,
    cx: &'c mut [u8],
}

impl ValueWriter for GenericWriter<'_> {
    #[inline]
    fn copy_a(&mut self, pc: usize, pa: usize) {
        let asize = self.plan.asize;
        let cast = self.plan.cast_a_to_c;
        let aij = &self.ax[pa * asize..(pa + 1) * asize];
        let csize = self.plan.csize;
        cast(&mut self.cx[pc * csize..(pc + 1) * csize], aij);
    }

    #[inline]
    fn copy_b(&mut self, pc: usize, pb: usize) {
        let bsize = self.plan.bsize;
        let cast = self.plan.cast_b_to_c;
        let bij = &self.bx[pb * bsize..(pb + 1) * bsize];
        let csize = self.plan.csize;
        cast(&mut self.cx[pc * csize..(pc + 1) * csize], bij);
    }

    fn combine(&mut self, pc: usize, pa: usize, pb: usize) -> Result<()> {
        let plan = self.plan;
        let Some(fadd) = plan.fadd.as_ref() else {
            return Err(Error::contract(
                "entry present in both A and B but no operator was given",
            ));
        };
        let (ax, bx) = (self.ax, self.bx);
        let aij = &ax[pa * plan.asize..(pa + 1) * plan.asize];
        let bij = &bx[pb * plan.bsize..(pb + 1) * plan.bsize];
        let Scratch { x, y, z } = &mut *self.scratch;
        (plan.cast_a_to_x)(x.as_mut_slice(), aij);
        (plan.cast_b_to_y)(y.as_mut_slice(), bij);
        fadd(z.as_mut_slice(), x.as_slice(), y.as_slice());
        let csize = plan.csize;
        (plan.cast_z_to_c)(&mut self.cx[pc * csize..(pc + 1) * csize], z.as_slice());
        Ok(())
    }
}

impl<'a> AddKernel for GenericKernel<'a> {
    type Writer<'c> = GenericWriter<'c> where Self: 'c;

    fn writer<'c>(&'c self, cx: &'c mut [u8]) -> Result<Self::Writer<'c>> {
        let plan = self.plan;
        let cell = self.scratch.get_or(|| {
            RefCell::new(Scratch {
                x: vec![0; plan.xsize],
                y: vec![0; plan.ysize],
                z: vec![0; plan.zsize],
            })
        });
        let scratch = cell
            .try_borrow_mut()
            .map_err(|_| Error::contract("per-thread scratch already in use"))?;
        Ok(GenericWriter {
            plan,
            ax: self.ax,
            bx: self.bx,
            scratch,
            cx,
        })
    }
}
