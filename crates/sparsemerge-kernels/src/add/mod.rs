//! Value phase of C = A + B and C<M> = A + B
//!
//! The output structure is decided upstream: which vectors C has, where each
//! one lives in A, B and M, how many entries each holds, and how the work is
//! cut into tasks. This module fills in the row indices and values.
//!
//! # Algorithm
//! 1. Resolve the operator and types to a typed kernel or a generic plan
//! 2. Move the vector pointers into an output shell and allocate storage
//! 3. Run all tasks, each writing its own disjoint output slice
//! 4. Prune empty vectors of a hypersparse result

pub mod merge;
pub mod resolve;
pub mod shell;
pub mod task;
pub mod workers;

use sparsemerge_core::{
    dispatch_type, BinaryOp, Bool, Element, Error, Opcode, Orientation, Result, SparseMatrix,
    Type, TypeCode,
};

use self::merge::{run_tasks, MergeInputs};
use self::resolve::{resolve, AddStrategy};
use self::shell::OutputShell;
use self::task::{partition_output, AddTask};
use self::workers::{comparator_fn, operator_fn, GenericKernel, TypedKernel};

/// A non-complemented mask
#[derive(Debug, Clone, Copy)]
pub struct Mask<'a> {
    pub matrix: &'a SparseMatrix,
    /// Only the presence of a mask entry matters, not its value
    pub structural: bool,
}

impl<'a> Mask<'a> {
    #[must_use]
    pub const fn structural(matrix: &'a SparseMatrix) -> Self {
        Self {
            matrix,
            structural: true,
        }
    }

    /// An entry admits its row only if some byte of its value is nonzero
    #[must_use]
    pub const fn valued(matrix: &'a SparseMatrix) -> Self {
        Self {
            matrix,
            structural: false,
        }
    }
}

/// Result of the structural analysis and counting stages.
///
/// `cp` and `ch` are consumed by [`add_phase2`]; the mappings are only
/// borrowed and stay with the caller.
#[derive(Debug, Clone, Default)]
pub struct AddAnalysis<'a> {
    /// Vector pointers of C, `nvec + 1` entries
    pub cp: Vec<i64>,
    /// Vector ids of C; present iff C is hypersparse
    pub ch: Option<Vec<i64>>,
    /// `None` if not known; it is then counted
    pub nvec_nonempty: Option<usize>,
    /// Per output vector: position of the matching vector in M, A, B; -1 if absent
    pub c_to_m: Option<&'a [i64]>,
    pub c_to_a: Option<&'a [i64]>,
    pub c_to_b: Option<&'a [i64]>,
    pub ch_is_mh: bool,
}

impl<'a> AddAnalysis<'a> {
    #[must_use]
    pub fn new(cp: Vec<i64>, ch: Option<Vec<i64>>) -> Self {
        Self {
            cp,
            ch,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_nvec_nonempty(mut self, n: usize) -> Self {
        self.nvec_nonempty = Some(n);
        self
    }

    #[must_use]
    pub fn with_mappings(
        mut self,
        c_to_m: Option<&'a [i64]>,
        c_to_a: Option<&'a [i64]>,
        c_to_b: Option<&'a [i64]>,
    ) -> Self {
        self.c_to_m = c_to_m;
        self.c_to_a = c_to_a;
        self.c_to_b = c_to_b;
        self
    }

    #[must_use]
    pub fn with_ch_is_mh(mut self, ch_is_mh: bool) -> Self {
        self.ch_is_mh = ch_is_mh;
        self
    }
}

/// Execution settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// `None` or `Some(0)`: rayon's global pool. `Some(1)`: the calling
    /// thread. `Some(n)`: a dedicated pool of `n` threads.
    pub nthreads: Option<usize>,
}

impl AddOptions {
    #[must_use]
    pub const fn with_threads(nthreads: usize) -> Self {
        Self {
            nthreads: Some(nthreads),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_builtin(
    opcode: Opcode,
    code: TypeCode,
    inputs: &MergeInputs<'_>,
    tasks: &[AddTask],
    ranges: &[std::ops::Range<usize>],
    ci: &mut [i64],
    cx: &mut [u8],
    nthreads: Option<usize>,
) -> Result<()> {
    dispatch_type!(code, T => {
        let ax = inputs.a.data.typed::<T>()?;
        let bx = inputs.b.data.typed::<T>()?;
        if let Some(cmp) = comparator_fn::<T>(opcode) {
            let cast: fn(T) -> Bool = |x: T| Bool::from(x.is_nonzero());
            let kernel = TypedKernel::new(ax, bx, cast, cmp);
            run_tasks(&kernel, inputs, tasks, ranges, ci, cx, std::mem::size_of::<Bool>(), nthreads)
        } else {
            let cast: fn(T) -> T = |x: T| x;
            let kernel = TypedKernel::new(ax, bx, cast, operator_fn::<T>(opcode));
            run_tasks(&kernel, inputs, tasks, ranges, ci, cx, std::mem::size_of::<T>(), nthreads)
        }
    })
}

/// Compute the values of `C = A op B`, or `C<M> = A op B` with a mask.
///
/// Without an operator A and B must have C's type and no row may appear in
/// both; an intersection aborts with `ContractViolation`. A mask requires
/// an operator. C takes its dimensions from A.
///
/// The vector pointers and id list in `analysis` belong to the result from
/// here on, whether the call succeeds or fails.
///
/// # Errors
/// - `DimensionMismatch` if A, B or M differ in shape
/// - `TypeMismatch` for incompatible types, before anything is allocated
/// - `ContractViolation` for malformed analysis or tasks, a mask without an
///   operator, or an intersection without an operator
/// - `OutOfMemory` if output storage or pruning cannot allocate
#[allow(clippy::too_many_arguments)]
pub fn add_phase2(
    ctype: &Type,
    orientation: Orientation,
    op: Option<&BinaryOp>,
    analysis: AddAnalysis<'_>,
    tasks: &[AddTask],
    mask: Option<Mask<'_>>,
    a: &SparseMatrix,
    b: &SparseMatrix,
    options: &AddOptions,
) -> Result<SparseMatrix> {
    if a.shape() != b.shape() {
        return Err(Error::DimensionMismatch {
            context: "add B",
            expected: a.shape(),
            got: b.shape(),
        });
    }
    if let Some(m) = &mask {
        if m.matrix.shape() != a.shape() {
            return Err(Error::DimensionMismatch {
                context: "add mask",
                expected: a.shape(),
                got: m.matrix.shape(),
            });
        }
    }
    if mask.is_some() && op.is_none() {
        return Err(Error::contract("a masked add requires an operator"));
    }
    let strategy = resolve(ctype, op, &a.ty, &b.ty)?;

    let AddAnalysis {
        cp,
        ch,
        nvec_nonempty,
        c_to_m,
        c_to_a,
        c_to_b,
        ch_is_mh,
    } = analysis;
    let mut shell = OutputShell::create(ctype, a.vlen, a.vdim, orientation, cp, ch, nvec_nonempty)?;
    let cnz = shell.nnz();
    let cnvec = shell.nvec();

    {
        let (cp, ch, ci, cx) = shell.parts_mut();
        let inputs = MergeInputs {
            a,
            b,
            mask,
            cp,
            ch,
            c_to_a,
            c_to_b,
            c_to_m,
            ch_is_mh,
        };
        inputs.validate()?;
        let ranges = partition_output(tasks, cp, cnz)?;

        tracing::debug!(
            cnz,
            cnvec,
            ntasks = tasks.len(),
            nthreads = ?options.nthreads,
            builtin = strategy.is_builtin(),
            masked = inputs.mask.is_some(),
            "add phase2"
        );

        match &strategy {
            AddStrategy::Builtin { opcode, code } => {
                run_builtin(*opcode, *code, &inputs, tasks, &ranges, ci, cx, options.nthreads)?;
            }
            AddStrategy::Generic(plan) => {
                let kernel = GenericKernel::new(plan, a.data.as_bytes(), b.data.as_bytes());
                run_tasks(&kernel, &inputs, tasks, &ranges, ci, cx, plan.csize, options.nthreads)?;
            }
        }
    }

    shell.finish()
}
