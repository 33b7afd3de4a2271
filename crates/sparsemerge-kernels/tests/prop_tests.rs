mod common;

use common::{build, dense, plan, rows_by_vector, PlanMask, Split};
use proptest::prelude::*;
use sparsemerge_core::{BinaryOp, Bool, Opcode, Orientation, SparseMatrix, Type, TypeCode};
use sparsemerge_kernels::{add_phase2, AddOptions, Mask};

const OPS: [Opcode; 10] = [
    Opcode::Plus,
    Opcode::Minus,
    Opcode::Rminus,
    Opcode::Times,
    Opcode::Div,
    Opcode::Min,
    Opcode::Max,
    Opcode::First,
    Opcode::Second,
    Opcode::Isgt,
];

/// Dense grid `[vector][row]` to a matrix; hypersparse keeps non-empty vectors
fn from_grid<T: sparsemerge_core::Element>(grid: &[Vec<Option<T>>], vlen: usize, hyper: bool) -> SparseMatrix {
    let vectors: Vec<(usize, Vec<(i64, T)>)> = grid
        .iter()
        .enumerate()
        .filter(|(_, col)| !hyper || col.iter().any(Option::is_some))
        .map(|(j, col)| {
            let entries = col
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.map(|v| (i as i64, v)))
                .collect();
            (j, entries)
        })
        .collect();
    build(vlen, grid.len(), &vectors, hyper)
}

fn grid<T: std::fmt::Debug + Clone>(
    vlen: usize,
    vdim: usize,
    value: impl Strategy<Value = T> + Clone,
) -> impl Strategy<Value = Vec<Vec<Option<T>>>> {
    prop::collection::vec(
        prop::collection::vec(prop::option::weighted(0.4, value), vlen),
        vdim,
    )
}

fn operands() -> impl Strategy<Value = (usize, Vec<Vec<Option<i64>>>, Vec<Vec<Option<i64>>>, Vec<Vec<Option<u8>>>)> {
    (1usize..=6, 1usize..=6).prop_flat_map(|(vlen, vdim)| {
        (
            Just(vlen),
            grid(vlen, vdim, -20i64..20),
            grid(vlen, vdim, -20i64..20),
            grid(vlen, vdim, 0u8..3),
        )
    })
}

/// i32 A and f64 B, so no typed kernel applies
fn mixed_operands() -> impl Strategy<Value = (usize, Vec<Vec<Option<i32>>>, Vec<Vec<Option<f64>>>)> {
    (1usize..=6, 1usize..=6).prop_flat_map(|(vlen, vdim)| {
        (
            Just(vlen),
            grid(vlen, vdim, -20i32..20),
            grid(vlen, vdim, (-80i32..80).prop_map(|v| f64::from(v) / 4.0)),
        )
    })
}

fn split_of(fine: bool, n: usize) -> Split {
    if fine {
        Split::Fine(n)
    } else {
        Split::Coarse(n)
    }
}

proptest! {
    #[test]
    fn prop_add_matches_dense_combination(
        (vlen, ga, gb, _) in operands(),
        op_index in 0usize..OPS.len(),
        hyper in any::<bool>(),
        fine in any::<bool>(),
        chunk in 1usize..4,
    ) {
        let opcode = OPS[op_index];
        let a = from_grid(&ga, vlen, hyper);
        let b = from_grid(&gb, vlen, hyper);
        let op = BinaryOp::builtin(opcode, TypeCode::Int64);
        let p = plan(&a, &b, None, hyper, !hyper, split_of(fine, chunk));
        let c = add_phase2(
            &Type::INT64,
            Orientation::ByCol,
            Some(&op),
            p.analysis(),
            &p.tasks,
            None,
            &a,
            &b,
            &AddOptions::default(),
        )
        .unwrap();

        let d = dense::<i64>(&c);
        for (j, (col_a, col_b)) in ga.iter().zip(&gb).enumerate() {
            for i in 0..vlen {
                let expected = match (col_a[i], col_b[i]) {
                    (Some(x), Some(y)) => Some(opcode.apply(x, y)),
                    (x, None) => x,
                    (None, y) => y,
                };
                prop_assert_eq!(d[j][i], expected, "vector {} row {}", j, i);
            }
        }
        for rows in rows_by_vector(&c) {
            prop_assert!(rows.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn prop_mask_restricts_output(
        (vlen, ga, gb, gm) in operands(),
        structural in any::<bool>(),
        hyper in any::<bool>(),
        fine in any::<bool>(),
    ) {
        let a = from_grid(&ga, vlen, false);
        let b = from_grid(&gb, vlen, false);
        let m = from_grid(&gm, vlen, hyper);
        let pm = PlanMask { matrix: &m, structural };
        let p = plan(&a, &b, Some(pm), hyper, false, split_of(fine, 2));
        let mask = if structural { Mask::structural(&m) } else { Mask::valued(&m) };
        let plus = BinaryOp::builtin(Opcode::Plus, TypeCode::Int64);
        let c = add_phase2(
            &Type::INT64,
            Orientation::ByCol,
            Some(&plus),
            p.analysis(),
            &p.tasks,
            Some(mask),
            &a,
            &b,
            &AddOptions::default(),
        )
        .unwrap();

        let d = dense::<i64>(&c);
        for j in 0..ga.len() {
            for i in 0..vlen {
                let unmasked = match (ga[j][i], gb[j][i]) {
                    (Some(x), Some(y)) => Some(x.wrapping_add(y)),
                    (x, None) => x,
                    (None, y) => y,
                };
                let admitted = match gm[j][i] {
                    Some(v) => structural || v != 0,
                    None => false,
                };
                let expected = if admitted { unmasked } else { None };
                prop_assert_eq!(d[j][i], expected, "vector {} row {}", j, i);
            }
        }
    }

    #[test]
    fn prop_disjoint_union_without_operator(
        (vlen, ga, gb, _) in operands(),
        fine in any::<bool>(),
    ) {
        // drop from B every entry A already has
        let gb: Vec<Vec<Option<i64>>> = ga
            .iter()
            .zip(&gb)
            .map(|(ca, cb)| ca.iter().zip(cb).map(|(x, y)| if x.is_some() { None } else { *y }).collect())
            .collect();
        let a = from_grid(&ga, vlen, false);
        let b = from_grid(&gb, vlen, false);
        let p = plan(&a, &b, None, false, false, split_of(fine, 3));
        let c = add_phase2(
            &Type::INT64,
            Orientation::ByCol,
            None,
            p.analysis(),
            &p.tasks,
            None,
            &a,
            &b,
            &AddOptions::default(),
        )
        .unwrap();
        let d = dense::<i64>(&c);
        for j in 0..ga.len() {
            for i in 0..vlen {
                prop_assert_eq!(d[j][i], ga[j][i].or(gb[j][i]));
            }
        }
    }

    #[test]
    fn prop_output_independent_of_thread_count(
        (vlen, ga, gb, _) in operands(),
        nthreads in 2usize..5,
    ) {
        let a = from_grid(&ga, vlen, false);
        let b = from_grid(&gb, vlen, false);
        let times = BinaryOp::builtin(Opcode::Times, TypeCode::Int64);
        let p = plan(&a, &b, None, false, false, Split::Fine(1));
        let run = |options: AddOptions| {
            add_phase2(
                &Type::INT64,
                Orientation::ByCol,
                Some(&times),
                p.analysis(),
                &p.tasks,
                None,
                &a,
                &b,
                &options,
            )
            .unwrap()
        };
        let seq = run(AddOptions::with_threads(1));
        let par = run(AddOptions::with_threads(nthreads));
        prop_assert_eq!(seq.indptr, par.indptr);
        prop_assert_eq!(seq.indices, par.indices);
        prop_assert_eq!(seq.data.as_bytes(), par.data.as_bytes());
    }

    #[test]
    fn prop_generic_path_casts_and_combines(
        (vlen, ga, gb) in mixed_operands(),
        hyper in any::<bool>(),
        fine in any::<bool>(),
    ) {
        let a = from_grid(&ga, vlen, hyper);
        let b = from_grid(&gb, vlen, hyper);
        let plus = BinaryOp::builtin(Opcode::Plus, TypeCode::Fp64);
        let p = plan(&a, &b, None, hyper, false, split_of(fine, 2));
        let c = add_phase2(
            &Type::INT64,
            Orientation::ByCol,
            Some(&plus),
            p.analysis(),
            &p.tasks,
            None,
            &a,
            &b,
            &AddOptions::default(),
        )
        .unwrap();

        let d = dense::<i64>(&c);
        for (j, (col_a, col_b)) in ga.iter().zip(&gb).enumerate() {
            for i in 0..vlen {
                let expected = match (col_a[i], col_b[i]) {
                    (Some(x), Some(y)) => Some((f64::from(x) + y) as i64),
                    (Some(x), None) => Some(i64::from(x)),
                    (None, Some(y)) => Some(y as i64),
                    (None, None) => None,
                };
                prop_assert_eq!(d[j][i], expected, "vector {} row {}", j, i);
            }
        }
    }

    #[test]
    fn prop_comparator_writes_bool(
        (vlen, ga, gb, _) in operands(),
        narrow_b in any::<bool>(),
        fine in any::<bool>(),
    ) {
        let a = from_grid(&ga, vlen, false);
        // an i32 B takes the generic path, an i64 B the typed kernel
        let b = if narrow_b {
            let gb32: Vec<Vec<Option<i32>>> = gb
                .iter()
                .map(|col| col.iter().map(|v| v.map(|v| v as i32)).collect())
                .collect();
            from_grid(&gb32, vlen, false)
        } else {
            from_grid(&gb, vlen, false)
        };
        let gt = BinaryOp::builtin(Opcode::Gt, TypeCode::Int64);
        let p = plan(&a, &b, None, false, false, split_of(fine, 2));
        let c = add_phase2(
            &Type::BOOL,
            Orientation::ByCol,
            Some(&gt),
            p.analysis(),
            &p.tasks,
            None,
            &a,
            &b,
            &AddOptions::default(),
        )
        .unwrap();

        let d = dense::<Bool>(&c);
        for (j, (col_a, col_b)) in ga.iter().zip(&gb).enumerate() {
            for i in 0..vlen {
                let expected = match (col_a[i], col_b[i]) {
                    (Some(x), Some(y)) => Some(Bool::from(x > y)),
                    (Some(v), None) | (None, Some(v)) => Some(Bool::from(v != 0)),
                    (None, None) => None,
                };
                prop_assert_eq!(d[j][i], expected, "vector {} row {}", j, i);
            }
        }
    }
}
