//! Sparse matrix definition and constructors
//!
//! A matrix is a sequence of `vdim` vectors of length `vlen`. Vector `k` owns
//! the entries `indptr[k]..indptr[k + 1]` of `indices` (row indices, strictly
//! increasing) and of `data` (values, `ty.size()` bytes each). A hypersparse
//! matrix stores only some vectors and lists their ids in `hyperlist`.

use std::ops::Range;

use crate::arena::ValueArena;
use crate::error::{Error, Result};
use crate::types::{Element, Type};

/// Whether vectors are columns or rows
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    ByCol,
    ByRow,
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct SparseMatrix {
    pub ty: Type,
    pub data: ValueArena,
    pub indices: Vec<i64>, // row indices per vector
    pub indptr: Vec<i64>,  // vector pointer, length nvec + 1
    pub hyperlist: Option<Vec<i64>>, // vector ids, length nvec, hypersparse only
    pub nvec_nonempty: usize,
    pub vlen: usize,
    pub vdim: usize,
    pub orientation: Orientation,
}

/// Borrowed view of one stored vector
#[derive(Debug, Clone, Copy)]
pub struct VectorView<'a> {
    /// True vector id
    pub id: usize,
    /// Position of the first entry in the matrix storage
    pub start: usize,
    pub rows: &'a [i64],
    /// Values, `rows.len() * size` bytes
    pub values: &'a [u8],
}

#[inline]
pub(crate) fn i64_to_usize(x: i64) -> usize {
    debug_assert!(x >= 0);
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    {
        x as usize
    }
}

impl SparseMatrix {
    #[inline]
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Number of stored vectors
    #[inline]
    #[must_use]
    pub fn nvec(&self) -> usize {
        self.indptr.len().saturating_sub(1)
    }

    #[inline]
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.vlen, self.vdim)
    }

    #[inline]
    #[must_use]
    pub const fn is_hyper(&self) -> bool {
        self.hyperlist.is_some()
    }

    /// True id of stored vector `k`
    #[inline]
    #[must_use]
    pub fn vector_id(&self, k: usize) -> usize {
        self.hyperlist
            .as_ref()
            .map_or(k, |h| i64_to_usize(h[k]))
    }

    /// Storage range of stored vector `k`
    #[inline]
    #[must_use]
    pub fn vector_range(&self, k: usize) -> Range<usize> {
        i64_to_usize(self.indptr[k])..i64_to_usize(self.indptr[k + 1])
    }

    #[must_use]
    pub fn vector(&self, k: usize) -> VectorView<'_> {
        let range = self.vector_range(k);
        let size = self.ty.size();
        VectorView {
            id: self.vector_id(k),
            start: range.start,
            rows: &self.indices[range.clone()],
            values: &self.data.as_bytes()[range.start * size..range.end * size],
        }
    }

    /// Value bytes of entry `p`
    #[inline]
    #[must_use]
    pub fn value_bytes(&self, p: usize) -> &[u8] {
        let size = self.ty.size();
        &self.data.as_bytes()[p * size..(p + 1) * size]
    }

    /// Typed view of all values; fails if `T` does not match the storage
    pub fn typed<T: Element>(&self) -> Result<&[T]> {
        if self.ty.code() != Some(T::CODE) {
            return Err(Error::type_mismatch(
                "typed view",
                T::CODE.name(),
                self.ty.name(),
            ));
        }
        self.data.typed()
    }

    /// Stored position of vector id `j`, if present
    #[must_use]
    pub fn find_vector(&self, j: usize) -> Option<usize> {
        match &self.hyperlist {
            Some(h) => i64::try_from(j).ok().and_then(|j| h.binary_search(&j).ok()),
            None => (j < self.nvec()).then_some(j),
        }
    }

    /// Count the stored vectors holding at least one entry
    #[must_use]
    pub fn count_nonempty(&self) -> usize {
        self.indptr.windows(2).filter(|w| w[1] > w[0]).count()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        ty: Type,
        vlen: usize,
        vdim: usize,
        indptr: Vec<i64>,
        hyperlist: Option<Vec<i64>>,
        indices: Vec<i64>,
        data: ValueArena,
        check: bool,
    ) -> Result<Self> {
        let nvec = hyperlist.as_ref().map_or(vdim, Vec::len);
        let Some(expected_len) = nvec.checked_add(1) else {
            return Err(Error::InvalidStructure("nvec overflow when adding 1".into()));
        };
        if indptr.len() != expected_len {
            return Err(Error::InvalidStructure("indptr length must be nvec + 1".into()));
        }
        let nnz = indices.len();
        if usize::try_from(indptr.last().copied().unwrap_or(0)).ok() != Some(nnz) {
            return Err(Error::InvalidStructure(
                "indptr last element must equal nnz".into(),
            ));
        }
        if indptr.first().copied().unwrap_or(0) != 0 {
            return Err(Error::InvalidStructure("indptr first element must be 0".into()));
        }
        if nnz.checked_mul(ty.size()) != Some(data.len()) {
            return Err(Error::InvalidStructure(
                "data length must be nnz * type size".into(),
            ));
        }
        if check {
            for (prev_ptr, next_ptr) in indptr.iter().zip(indptr.iter().skip(1)) {
                if prev_ptr > next_ptr {
                    return Err(Error::InvalidStructure("indptr must be non-decreasing".into()));
                }
                if *prev_ptr < 0 {
                    return Err(Error::InvalidStructure("indptr must be non-negative".into()));
                }
            }
            for (start_i, end_i) in indptr.iter().zip(indptr.iter().skip(1)) {
                let start = i64_to_usize(*start_i);
                let end = i64_to_usize(*end_i);
                let mut prev_row = -1_i64;
                for &i in &indices[start..end] {
                    let out_of_bounds = usize::try_from(i).map_or(true, |row| row >= vlen);
                    if out_of_bounds {
                        return Err(Error::InvalidStructure("row index out of bounds".into()));
                    }
                    if i <= prev_row {
                        return Err(Error::InvalidStructure(
                            "row indices must be strictly increasing within each vector".into(),
                        ));
                    }
                    prev_row = i;
                }
            }
            if let Some(h) = &hyperlist {
                let mut prev = -1_i64;
                for &j in h {
                    if usize::try_from(j).map_or(true, |j| j >= vdim) {
                        return Err(Error::InvalidStructure("vector id out of bounds".into()));
                    }
                    if j <= prev {
                        return Err(Error::InvalidStructure(
                            "hyperlist must be strictly increasing".into(),
                        ));
                    }
                    prev = j;
                }
            }
        }
        let mut matrix = Self::from_parts_unchecked(ty, vlen, vdim, indptr, hyperlist, indices, data);
        matrix.nvec_nonempty = matrix.count_nonempty();
        Ok(matrix)
    }

    /// Assemble a matrix from parts already known to be consistent.
    ///
    /// `nvec_nonempty` is left at zero; the caller sets it.
    #[inline]
    #[must_use]
    pub const fn from_parts_unchecked(
        ty: Type,
        vlen: usize,
        vdim: usize,
        indptr: Vec<i64>,
        hyperlist: Option<Vec<i64>>,
        indices: Vec<i64>,
        data: ValueArena,
    ) -> Self {
        Self {
            ty,
            data,
            indices,
            indptr,
            hyperlist,
            nvec_nonempty: 0,
            vlen,
            vdim,
            orientation: Orientation::ByCol,
        }
    }

    /// Build a matrix of a built-in type from typed values
    pub fn from_typed<T: Element>(
        vlen: usize,
        vdim: usize,
        indptr: Vec<i64>,
        hyperlist: Option<Vec<i64>>,
        indices: Vec<i64>,
        values: &[T],
    ) -> Result<Self> {
        let data = ValueArena::from_slice(values)?;
        Self::from_parts(
            Type::Builtin(T::CODE),
            vlen,
            vdim,
            indptr,
            hyperlist,
            indices,
            data,
            true,
        )
    }

    /// Check every structural invariant of a finished matrix
    pub fn validate(&self) -> Result<()> {
        Self::from_parts(
            self.ty.clone(),
            self.vlen,
            self.vdim,
            self.indptr.clone(),
            self.hyperlist.clone(),
            self.indices.clone(),
            self.data.clone(),
            true,
        )
        .map(|_| ())
    }
}
