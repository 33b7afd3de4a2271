//! Remove empty vectors from a hypersparse matrix
//!
//! Only the vector pointers and the id list are rebuilt; row indices and
//! values stay where they are, since an empty vector owns no entries.

use sparsemerge_core::{Error, Result, SparseMatrix};

/// Drop every empty vector of a hypersparse matrix.
///
/// Nothing happens for a standard matrix, or when `nvec_nonempty` already
/// equals the number of stored vectors. Afterwards the id list and the
/// pointer array describe only the non-empty vectors, in their original
/// order, and `nvec_nonempty == nvec`.
///
/// # Errors
/// `OutOfMemory` if the compacted arrays cannot be allocated; the matrix is
/// left unchanged in that case.
pub fn prune_empty_vectors(a: &mut SparseMatrix) -> Result<()> {
    let Some(hyperlist) = a.hyperlist.as_ref() else {
        return Ok(());
    };
    let nvec = a.nvec();
    if a.nvec_nonempty >= nvec {
        return Ok(());
    }
    let keep = a.count_nonempty();

    let mut indptr: Vec<i64> = Vec::new();
    indptr
        .try_reserve_exact(keep + 1)
        .map_err(|_| Error::OutOfMemory {
            bytes: (keep + 1) * std::mem::size_of::<i64>(),
        })?;
    let mut ids: Vec<i64> = Vec::new();
    ids.try_reserve_exact(keep).map_err(|_| Error::OutOfMemory {
        bytes: keep * std::mem::size_of::<i64>(),
    })?;

    indptr.push(0);
    for (window, &j) in a.indptr.windows(2).zip(hyperlist.iter()) {
        if window[1] > window[0] {
            ids.push(j);
            indptr.push(window[1]);
        }
    }
    tracing::debug!(before = nvec, after = ids.len(), "pruned empty vectors");

    a.indptr = indptr;
    a.hyperlist = Some(ids);
    a.nvec_nonempty = keep;
    Ok(())
}
