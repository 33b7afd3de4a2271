//! Parallel merge engine for C = A + B and C<M> = A + B
//!
//! Every task owns a disjoint slice of the output row indices and values,
//! carved out with `split_at_mut` before any task runs, so tasks share
//! nothing mutable and need no locking. Rows inside each vector come out
//! ascending because both inputs are walked in ascending order.

#![allow(
    clippy::similar_names,
    reason = "Paired cursors (ai/bi, pa/pb) walk A and B in lockstep"
)]
#![allow(
    clippy::many_single_char_names,
    reason = "Merge loops use the usual i/k/p index names"
)]

use std::ops::Range;

use rayon::prelude::*;
use sparsemerge_core::{Error, Result, SparseMatrix};

use super::task::AddTask;
use super::workers::{AddKernel, ValueWriter};
use super::Mask;
use crate::utility::util::{i64_to_usize, mapped};

/// Read-only view of everything a task consults
pub struct MergeInputs<'a> {
    pub a: &'a SparseMatrix,
    pub b: &'a SparseMatrix,
    pub mask: Option<Mask<'a>>,
    pub cp: &'a [i64],
    pub ch: Option<&'a [i64]>,
    pub c_to_a: Option<&'a [i64]>,
    pub c_to_b: Option<&'a [i64]>,
    pub c_to_m: Option<&'a [i64]>,
    /// The output's id list is the mask's, so output vector k is mask vector k
    pub ch_is_mh: bool,
}

fn check_mapping(
    name: &str,
    mapping: Option<&[i64]>,
    operand: &SparseMatrix,
    cnvec: usize,
) -> Result<()> {
    match mapping {
        Some(map) => {
            if map.len() != cnvec {
                return Err(Error::contract(format!(
                    "{name} has {} entries for {cnvec} output vectors",
                    map.len()
                )));
            }
            let nvec = operand.nvec();
            if let Some(&bad) = map.iter().find(|&&x| mapped(x).is_some_and(|k| k >= nvec)) {
                return Err(Error::contract(format!(
                    "{name} refers to vector {bad} of an operand with {nvec} vectors"
                )));
            }
            Ok(())
        }
        None if operand.is_hyper() => Err(Error::contract(format!(
            "{name} is required for a hypersparse operand"
        ))),
        None => Ok(()),
    }
}

impl MergeInputs<'_> {
    #[inline]
    fn cnvec(&self) -> usize {
        self.cp.len().saturating_sub(1)
    }

    /// Check the source mappings against the operands before any task runs.
    pub fn validate(&self) -> Result<()> {
        let cnvec = self.cnvec();
        if let Some(ch) = self.ch {
            if ch.len() != cnvec {
                return Err(Error::contract("output id list length must equal nvec"));
            }
        }
        check_mapping("C_to_A", self.c_to_a, self.a, cnvec)?;
        check_mapping("C_to_B", self.c_to_b, self.b, cnvec)?;
        if let Some(mask) = &self.mask {
            if self.ch_is_mh {
                let same = match (self.ch, mask.matrix.hyperlist.as_deref()) {
                    (Some(ch), Some(mh)) => ch == mh,
                    _ => false,
                };
                if !same {
                    return Err(Error::contract(
                        "output id list was reported equal to the mask's but is not",
                    ));
                }
            } else {
                check_mapping("C_to_M", self.c_to_m, mask.matrix, cnvec)?;
            }
        }
        Ok(())
    }

    /// True id of output vector `k`
    #[inline]
    fn vector_id(&self, k: usize) -> usize {
        self.ch.map_or(k, |h| i64_to_usize(h[k]))
    }

    fn locate(&self, mapping: Option<&[i64]>, operand: &SparseMatrix, k: usize) -> Range<usize> {
        let kk = match mapping {
            Some(map) => mapped(map[k]),
            None => operand.find_vector(self.vector_id(k)),
        };
        kk.map_or(0..0, |kk| operand.vector_range(kk))
    }

    /// Entries of A in output vector `k`; empty if A lacks that vector
    #[inline]
    pub fn a_range(&self, k: usize) -> Range<usize> {
        self.locate(self.c_to_a, self.a, k)
    }

    #[inline]
    pub fn b_range(&self, k: usize) -> Range<usize> {
        self.locate(self.c_to_b, self.b, k)
    }

    /// Entries of the mask vector matching output vector `k`
    pub fn mask_range(&self, k: usize) -> Option<Range<usize>> {
        let mask = self.mask.as_ref()?;
        if self.ch_is_mh {
            return Some(mask.matrix.vector_range(k));
        }
        Some(self.locate(self.c_to_m, mask.matrix, k))
    }

    #[inline]
    fn c_range(&self, k: usize) -> Range<usize> {
        i64_to_usize(self.cp[k])..i64_to_usize(self.cp[k + 1])
    }

    fn mask_slice(&self, range: Range<usize>) -> Option<MaskSlice<'_>> {
        self.mask.as_ref().map(|mask| {
            let m = mask.matrix;
            let size = m.ty.size();
            MaskSlice {
                rows: &m.indices[range.clone()],
                values: &m.data.as_bytes()[range.start * size..range.end * size],
                size,
                structural: mask.structural,
            }
        })
    }
}

/// Mask entries of one vector slice
struct MaskSlice<'m> {
    rows: &'m [i64],
    values: &'m [u8],
    size: usize,
    structural: bool,
}

impl MaskSlice<'_> {
    /// Whether mask entry `p` lets its row through
    #[inline]
    fn admits(&self, p: usize) -> bool {
        self.structural
            || self.values[p * self.size..(p + 1) * self.size]
                .iter()
                .any(|&byte| byte != 0)
    }
}

/// Writes rows into a task's output slice, never past its end
struct Emitter<'t, 'w, W> {
    writer: &'w mut W,
    ci: &'t mut [i64],
    pc: usize,
    end: usize,
}

impl<W: ValueWriter> Emitter<'_, '_, W> {
    #[inline]
    fn slot(&mut self, i: i64) -> Result<usize> {
        if self.pc >= self.end {
            return Err(Error::contract("task produced more entries than counted"));
        }
        let pc = self.pc;
        self.ci[pc] = i;
        self.pc += 1;
        Ok(pc)
    }

    #[inline]
    fn from_a(&mut self, i: i64, pa: usize) -> Result<()> {
        let pc = self.slot(i)?;
        self.writer.copy_a(pc, pa);
        Ok(())
    }

    #[inline]
    fn from_b(&mut self, i: i64, pb: usize) -> Result<()> {
        let pc = self.slot(i)?;
        self.writer.copy_b(pc, pb);
        Ok(())
    }

    #[inline]
    fn from_both(&mut self, i: i64, pa: usize, pb: usize) -> Result<()> {
        let pc = self.slot(i)?;
        self.writer.combine(pc, pa, pb)
    }

    fn finish(&self) -> Result<()> {
        if self.pc != self.end {
            return Err(Error::contract(format!(
                "task produced {} fewer entries than counted",
                self.end - self.pc
            )));
        }
        Ok(())
    }
}

/// Merge one vector slice without a mask.
fn merge_unmasked<W: ValueWriter>(
    e: &mut Emitter<'_, '_, W>,
    ai: &[i64],
    a: Range<usize>,
    bi: &[i64],
    b: Range<usize>,
) -> Result<()> {
    if a.is_empty() {
        for pb in b {
            e.from_b(bi[pb], pb)?;
        }
    } else if b.is_empty() {
        for pa in a {
            e.from_a(ai[pa], pa)?;
        }
    } else if ai[a.end - 1] < bi[b.start] {
        for pa in a {
            e.from_a(ai[pa], pa)?;
        }
        for pb in b {
            e.from_b(bi[pb], pb)?;
        }
    } else if bi[b.end - 1] < ai[a.start] {
        for pb in b {
            e.from_b(bi[pb], pb)?;
        }
        for pa in a {
            e.from_a(ai[pa], pa)?;
        }
    } else {
        let (mut pa, mut pb) = (a.start, b.start);
        while pa < a.end && pb < b.end {
            let (ia, ib) = (ai[pa], bi[pb]);
            if ia < ib {
                e.from_a(ia, pa)?;
                pa += 1;
            } else if ib < ia {
                e.from_b(ib, pb)?;
                pb += 1;
            } else {
                e.from_both(ia, pa, pb)?;
                pa += 1;
                pb += 1;
            }
        }
        for pa in pa..a.end {
            e.from_a(ai[pa], pa)?;
        }
        for pb in pb..b.end {
            e.from_b(bi[pb], pb)?;
        }
    }
    Ok(())
}

/// Merge one vector slice, emitting only rows the mask admits.
///
/// Walks the mask entries in order and advances the A and B cursors to
/// each mask row, so every list is scanned once.
fn merge_masked<W: ValueWriter>(
    e: &mut Emitter<'_, '_, W>,
    ai: &[i64],
    a: Range<usize>,
    bi: &[i64],
    b: Range<usize>,
    mask: &MaskSlice<'_>,
) -> Result<()> {
    let (mut pa, mut pb) = (a.start, b.start);
    for (p, &i) in mask.rows.iter().enumerate() {
        if pa >= a.end && pb >= b.end {
            break;
        }
        while pa < a.end && ai[pa] < i {
            pa += 1;
        }
        while pb < b.end && bi[pb] < i {
            pb += 1;
        }
        if !mask.admits(p) {
            continue;
        }
        let in_a = pa < a.end && ai[pa] == i;
        let in_b = pb < b.end && bi[pb] == i;
        match (in_a, in_b) {
            (true, true) => e.from_both(i, pa, pb)?,
            (true, false) => e.from_a(i, pa)?,
            (false, true) => e.from_b(i, pb)?,
            (false, false) => {}
        }
    }
    Ok(())
}

fn within(inner: &Range<usize>, outer: &Range<usize>) -> bool {
    inner.is_empty() || (inner.start >= outer.start && inner.end <= outer.end)
}

/// Run one task; `start` is the output position of `ci[0]`.
fn run_task<K: AddKernel>(
    kernel: &K,
    inputs: &MergeInputs<'_>,
    task: &AddTask,
    start: usize,
    ci: &mut [i64],
    cx: &mut [u8],
) -> Result<()> {
    let mut writer = kernel.writer(cx)?;
    let ai = inputs.a.indices.as_slice();
    let bi = inputs.b.indices.as_slice();

    let mut merge = |k: usize,
                     a: Range<usize>,
                     b: Range<usize>,
                     m: Option<Range<usize>>,
                     c: Range<usize>|
     -> Result<()> {
        let mut e = Emitter {
            writer: &mut writer,
            ci: &mut *ci,
            pc: c.start - start,
            end: c.end - start,
        };
        match m {
            None => merge_unmasked(&mut e, ai, a, bi, b)?,
            Some(m) if m.is_empty() => {}
            Some(m) => {
                let mask = inputs
                    .mask_slice(m)
                    .ok_or_else(|| Error::contract(format!("mask missing for vector {k}")))?;
                merge_masked(&mut e, ai, a, bi, b, &mask)?;
            }
        }
        e.finish()
    };

    match task {
        AddTask::Coarse { kfirst, klast } => {
            for k in *kfirst..=*klast {
                merge(
                    k,
                    inputs.a_range(k),
                    inputs.b_range(k),
                    inputs.mask_range(k),
                    inputs.c_range(k),
                )?;
            }
            Ok(())
        }
        AddTask::Fine { k, a, b, m, c } => {
            let k = *k;
            if !within(a, &inputs.a_range(k)) || !within(b, &inputs.b_range(k)) {
                return Err(Error::contract(format!(
                    "fine task reads outside vector {k} of A or B"
                )));
            }
            let mask = match (inputs.mask_range(k), m) {
                (Some(whole), Some(sub)) => {
                    if !within(sub, &whole) {
                        return Err(Error::contract(format!(
                            "fine task reads outside mask vector {k}"
                        )));
                    }
                    Some(sub.clone())
                }
                (whole, _) => whole,
            };
            merge(k, a.clone(), b.clone(), mask, c.clone())
        }
    }
}

/// Execute every task, each on its own slice of `ci` and `cx`.
///
/// `ranges[t]` is the output range of `tasks[t]`; together they must tile
/// the output (see [`super::task::partition_output`]).
#[allow(clippy::too_many_arguments)]
pub fn run_tasks<K: AddKernel>(
    kernel: &K,
    inputs: &MergeInputs<'_>,
    tasks: &[AddTask],
    ranges: &[Range<usize>],
    ci: &mut [i64],
    cx: &mut [u8],
    csize: usize,
    nthreads: Option<usize>,
) -> Result<()> {
    let mut work = Vec::with_capacity(tasks.len());
    let mut ci_rest = ci;
    let mut cx_rest = cx;
    for (task, range) in tasks.iter().zip(ranges) {
        let n = range.len();
        let (ci_head, ci_tail) = std::mem::take(&mut ci_rest).split_at_mut(n);
        let (cx_head, cx_tail) = std::mem::take(&mut cx_rest).split_at_mut(n * csize);
        ci_rest = ci_tail;
        cx_rest = cx_tail;
        work.push((task, range.start, ci_head, cx_head));
    }

    let run = |(task, start, ci, cx): (&AddTask, usize, &mut [i64], &mut [u8])| {
        run_task(kernel, inputs, task, start, ci, cx)
    };
    match nthreads {
        Some(1) => work.into_iter().try_for_each(run),
        Some(n) if n > 1 => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| Error::ThreadPool(e.to_string()))?;
            pool.install(|| work.into_par_iter().try_for_each(run))
        }
        _ => work.into_par_iter().try_for_each(run),
    }
}
