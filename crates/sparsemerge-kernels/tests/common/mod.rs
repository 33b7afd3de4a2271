//! Test-only planner standing in for the structural analysis and counting
//! stages, plus helpers to build and expand matrices.
#![allow(dead_code)]

use sparsemerge_core::{Element, SparseMatrix};
use sparsemerge_kernels::{AddAnalysis, AddTask};

/// Build a matrix from `(vector id, [(row, value)])` lists.
///
/// A hypersparse matrix stores exactly the listed vectors, empty ones
/// included; a standard one stores all `vdim`.
pub fn build<T: Element>(
    vlen: usize,
    vdim: usize,
    vectors: &[(usize, Vec<(i64, T)>)],
    hyper: bool,
) -> SparseMatrix {
    let mut sorted: Vec<&(usize, Vec<(i64, T)>)> = vectors.iter().collect();
    sorted.sort_by_key(|(j, _)| *j);
    let mut indptr = vec![0i64];
    let mut indices = Vec::new();
    let mut values = Vec::new();
    let mut hyperlist = Vec::new();
    let mut push = |entries: &[(i64, T)]| {
        for &(i, v) in entries {
            indices.push(i);
            values.push(v);
        }
        indptr.push(indices.len() as i64);
    };
    if hyper {
        for (j, entries) in &sorted {
            hyperlist.push(*j as i64);
            push(entries);
        }
    } else {
        for j in 0..vdim {
            match sorted.iter().find(|(jj, _)| *jj == j) {
                Some((_, entries)) => push(entries),
                None => push(&[]),
            }
        }
    }
    SparseMatrix::from_typed(
        vlen,
        vdim,
        indptr,
        hyper.then_some(hyperlist),
        indices,
        &values,
    )
    .unwrap()
}

/// Dense expansion `[vector][row]` of a built-in typed matrix
pub fn dense<T: Element>(m: &SparseMatrix) -> Vec<Vec<Option<T>>> {
    let values = m.typed::<T>().unwrap();
    let mut out = vec![vec![None; m.vlen]; m.vdim];
    for k in 0..m.nvec() {
        let v = m.vector(k);
        for (off, &i) in v.rows.iter().enumerate() {
            out[v.id][i as usize] = Some(values[v.start + off]);
        }
    }
    out
}

/// Rows of every stored vector, to check ordering
pub fn rows_by_vector(m: &SparseMatrix) -> Vec<Vec<i64>> {
    (0..m.nvec()).map(|k| m.vector(k).rows.to_vec()).collect()
}

/// How the planner cuts the work
#[derive(Debug, Clone, Copy)]
pub enum Split {
    /// Coarse tasks of `n` whole vectors each
    Coarse(usize),
    /// Fine tasks over row windows of `n` rows in every vector
    Fine(usize),
}

/// Mask as the planner sees it
#[derive(Clone, Copy)]
pub struct PlanMask<'a> {
    pub matrix: &'a SparseMatrix,
    pub structural: bool,
}

/// Output of the stand-in upstream stages
#[derive(Debug, Clone)]
pub struct Plan {
    pub cp: Vec<i64>,
    pub ch: Option<Vec<i64>>,
    pub nvec_nonempty: usize,
    pub c_to_a: Option<Vec<i64>>,
    pub c_to_b: Option<Vec<i64>>,
    pub c_to_m: Option<Vec<i64>>,
    pub ch_is_mh: bool,
    pub tasks: Vec<AddTask>,
}

impl Plan {
    pub fn analysis(&self) -> AddAnalysis<'_> {
        AddAnalysis::new(self.cp.clone(), self.ch.clone())
            .with_nvec_nonempty(self.nvec_nonempty)
            .with_mappings(
                self.c_to_m.as_deref(),
                self.c_to_a.as_deref(),
                self.c_to_b.as_deref(),
            )
            .with_ch_is_mh(self.ch_is_mh)
    }

    pub fn cnz(&self) -> usize {
        *self.cp.last().unwrap() as usize
    }
}

fn mask_admits(m: &SparseMatrix, p: usize, structural: bool) -> bool {
    structural || m.value_bytes(p).iter().any(|&b| b != 0)
}

fn position(m: &SparseMatrix, j: usize) -> i64 {
    m.find_vector(j).map_or(-1, |k| k as i64)
}

fn vector_range(m: &SparseMatrix, k: i64) -> std::ops::Range<usize> {
    if k < 0 {
        0..0
    } else {
        m.vector_range(k as usize)
    }
}

/// Plan `C<M> = A + B`.
///
/// `hyper` makes C hypersparse: it takes the mask's id list when the mask
/// is hypersparse, otherwise the union of the vectors A and B store.
/// `mappings` supplies C_to_A/B/M even where the identity would do.
pub fn plan(
    a: &SparseMatrix,
    b: &SparseMatrix,
    mask: Option<PlanMask<'_>>,
    hyper: bool,
    mappings: bool,
    split: Split,
) -> Plan {
    let vdim = a.vdim;
    let mut ch_is_mh = false;
    let ids: Vec<usize> = if hyper {
        match mask {
            Some(pm) if pm.matrix.is_hyper() => {
                ch_is_mh = true;
                (0..pm.matrix.nvec()).map(|k| pm.matrix.vector_id(k)).collect()
            }
            _ => {
                let mut ids: Vec<usize> = (0..a.nvec())
                    .map(|k| a.vector_id(k))
                    .chain((0..b.nvec()).map(|k| b.vector_id(k)))
                    .collect();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
        }
    } else {
        (0..vdim).collect()
    };

    let need = |m: &SparseMatrix| mappings || m.is_hyper();
    let c_to_a: Vec<i64> = ids.iter().map(|&j| position(a, j)).collect();
    let c_to_b: Vec<i64> = ids.iter().map(|&j| position(b, j)).collect();
    let c_to_m: Vec<i64> = match mask {
        Some(pm) => ids.iter().map(|&j| position(pm.matrix, j)).collect(),
        None => Vec::new(),
    };

    // output rows of every vector
    let out_rows: Vec<Vec<i64>> = ids
        .iter()
        .enumerate()
        .map(|(k, _)| {
            let mut rows: Vec<i64> = a.indices[vector_range(a, c_to_a[k])]
                .iter()
                .chain(b.indices[vector_range(b, c_to_b[k])].iter())
                .copied()
                .collect();
            rows.sort_unstable();
            rows.dedup();
            if let Some(pm) = mask {
                let mr = vector_range(pm.matrix, c_to_m[k]);
                rows.retain(|&i| {
                    mr.clone().any(|p| {
                        pm.matrix.indices[p] == i && mask_admits(pm.matrix, p, pm.structural)
                    })
                });
            }
            rows
        })
        .collect();

    let mut cp = vec![0i64];
    for rows in &out_rows {
        cp.push(cp.last().unwrap() + rows.len() as i64);
    }
    let nvec_nonempty = out_rows.iter().filter(|r| !r.is_empty()).count();

    let nvec = ids.len();
    let mut tasks = Vec::new();
    match split {
        Split::Coarse(n) => {
            let n = n.max(1);
            let mut k = 0;
            while k < nvec {
                let klast = (k + n).min(nvec) - 1;
                tasks.push(AddTask::Coarse { kfirst: k, klast });
                k = klast + 1;
            }
        }
        Split::Fine(n) => {
            let n = n.max(1) as i64;
            let vlen = a.vlen as i64;
            for k in 0..nvec {
                let ar = vector_range(a, c_to_a[k]);
                let br = vector_range(b, c_to_b[k]);
                let mr = mask.map(|pm| vector_range(pm.matrix, c_to_m[k]));
                let cstart = cp[k] as usize;
                let mut lo = 0i64;
                loop {
                    let hi = (lo + n).min(vlen.max(1));
                    let window = |rows: &[i64], r: &std::ops::Range<usize>| {
                        let s = r.start + rows[r.clone()].partition_point(|&i| i < lo);
                        let e = r.start + rows[r.clone()].partition_point(|&i| i < hi);
                        s..e
                    };
                    let c0 = out_rows[k].partition_point(|&i| i < lo);
                    let c1 = out_rows[k].partition_point(|&i| i < hi);
                    tasks.push(AddTask::Fine {
                        k,
                        a: window(&a.indices, &ar),
                        b: window(&b.indices, &br),
                        m: mask.zip(mr.as_ref()).map(|(pm, r)| window(&pm.matrix.indices, r)),
                        c: cstart + c0..cstart + c1,
                    });
                    lo = hi;
                    if lo >= vlen {
                        break;
                    }
                }
            }
        }
    }

    Plan {
        cp,
        ch: hyper.then(|| ids.iter().map(|&j| j as i64).collect()),
        nvec_nonempty,
        c_to_a: need(a).then_some(c_to_a),
        c_to_b: need(b).then_some(c_to_b),
        c_to_m: mask
            .filter(|pm| !ch_is_mh && need(pm.matrix))
            .map(|_| c_to_m),
        ch_is_mh,
        tasks,
    }
}
