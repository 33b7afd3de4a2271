//! Output matrix under construction
//!
//! The vector pointers and the optional id list are moved in from the
//! analysis stage. From then on the shell owns them: if any later step
//! fails, dropping the shell releases them together with the partially
//! filled storage.

use sparsemerge_core::{Error, Orientation, Result, SparseMatrix, Type, ValueArena};

use crate::utility::prune::prune_empty_vectors;
use crate::utility::util::i64_to_usize;

/// A matrix whose structure is fixed but whose entries are not yet written
#[derive(Debug)]
pub struct OutputShell {
    matrix: SparseMatrix,
}

fn check_pointers(cp: &[i64], ch: Option<&[i64]>, vdim: usize) -> Result<()> {
    let nvec = ch.map_or(vdim, <[i64]>::len);
    if cp.len() != nvec + 1 {
        return Err(Error::contract(format!(
            "vector pointers have {} entries for {nvec} vectors",
            cp.len()
        )));
    }
    if cp[0] != 0 {
        return Err(Error::contract("vector pointers must start at 0"));
    }
    if cp.windows(2).any(|w| w[1] < w[0]) {
        return Err(Error::contract("vector pointers must be non-decreasing"));
    }
    if let Some(ch) = ch {
        let in_range = ch.iter().all(|&j| usize::try_from(j).is_ok_and(|j| j < vdim));
        if !in_range || ch.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::contract(
                "vector id list must be strictly increasing and within vdim",
            ));
        }
    }
    Ok(())
}

impl OutputShell {
    /// Take ownership of `cp` and `ch` and allocate row and value storage
    /// for exactly `cp[nvec]` entries.
    ///
    /// The output is hypersparse if and only if `ch` is given. An unknown
    /// `nvec_nonempty` is counted from `cp`.
    ///
    /// # Errors
    /// `ContractViolation` for malformed pointers, `OutOfMemory` if storage
    /// cannot be allocated. `cp` and `ch` are released in both cases.
    pub fn create(
        ctype: &Type,
        vlen: usize,
        vdim: usize,
        orientation: Orientation,
        cp: Vec<i64>,
        ch: Option<Vec<i64>>,
        nvec_nonempty: Option<usize>,
    ) -> Result<Self> {
        check_pointers(&cp, ch.as_deref(), vdim)?;
        let cnz = cp.last().copied().map_or(0, i64_to_usize);

        let mut indices: Vec<i64> = Vec::new();
        indices.try_reserve_exact(cnz).map_err(|_| Error::OutOfMemory {
            bytes: cnz.saturating_mul(std::mem::size_of::<i64>()),
        })?;
        indices.resize(cnz, 0);
        let data = ValueArena::try_for_elements(cnz, ctype.size())?;

        let mut matrix =
            SparseMatrix::from_parts_unchecked(ctype.clone(), vlen, vdim, cp, ch, indices, data);
        matrix.orientation = orientation;
        matrix.nvec_nonempty = match nvec_nonempty {
            Some(n) => n,
            None => matrix.count_nonempty(),
        };
        Ok(Self { matrix })
    }

    /// Number of entries the merge must write
    #[inline]
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    #[inline]
    #[must_use]
    pub fn nvec(&self) -> usize {
        self.matrix.nvec()
    }

    /// Read-only structure plus the writable row and value storage
    pub fn parts_mut(&mut self) -> (&[i64], Option<&[i64]>, &mut [i64], &mut [u8]) {
        let m = &mut self.matrix;
        (
            &m.indptr,
            m.hyperlist.as_deref(),
            &mut m.indices,
            m.data.as_bytes_mut(),
        )
    }

    /// Prune empty vectors and hand out the finished matrix.
    ///
    /// The full structure check of the result runs in debug builds only;
    /// release builds rely on the per-task count checks made while filling.
    ///
    /// # Errors
    /// `OutOfMemory` from pruning; the shell and all it owns are dropped.
    pub fn finish(mut self) -> Result<SparseMatrix> {
        prune_empty_vectors(&mut self.matrix)?;
        debug_assert!(
            self.matrix.validate().is_ok(),
            "finished add result is not a well-formed matrix"
        );
        Ok(self.matrix)
    }
}
