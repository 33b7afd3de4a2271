mod common;

use common::{build, plan, Split};
use sparsemerge_core::{BinaryOp, Opcode, Orientation, Type, TypeCode};
use sparsemerge_kernels::{add_phase2, prune_empty_vectors, AddOptions};

#[test]
fn test_prune_removes_empty_vectors_in_order() {
    let mut m = build::<f64>(
        4,
        10,
        &[
            (1, vec![(0, 1.0)]),
            (3, vec![]),
            (4, vec![(1, 2.0), (2, 3.0)]),
            (6, vec![]),
            (9, vec![(3, 4.0)]),
        ],
        true,
    );
    m.nvec_nonempty = 3;
    let indices = m.indices.clone();
    let data = m.data.clone();
    prune_empty_vectors(&mut m).unwrap();
    assert_eq!(m.hyperlist, Some(vec![1i64, 4, 9]));
    assert_eq!(m.indptr, vec![0i64, 1, 3, 4]);
    assert_eq!(m.indices, indices);
    assert_eq!(m.data, data);
    assert_eq!(m.nvec_nonempty, 3);
    m.validate().unwrap();
}

#[test]
fn test_prune_without_empty_vectors_is_noop() {
    let mut m = build::<i16>(3, 5, &[(0, vec![(0, 1)]), (4, vec![(2, 2)])], true);
    let before = m.clone();
    prune_empty_vectors(&mut m).unwrap();
    assert_eq!(m.hyperlist, before.hyperlist);
    assert_eq!(m.indptr, before.indptr);
    assert_eq!(m.indices, before.indices);
}

#[test]
fn test_prune_ignores_standard_matrices() {
    let mut m = build::<i16>(3, 4, &[(1, vec![(0, 1)])], false);
    m.nvec_nonempty = 1;
    prune_empty_vectors(&mut m).unwrap();
    assert_eq!(m.indptr, vec![0i64, 0, 1, 1, 1]);
    assert!(m.hyperlist.is_none());
}

#[test]
fn test_add_prunes_hypersparse_result() {
    // the union of A's and B's vectors includes vector 5, which stays empty
    let a = build::<u64>(4, 8, &[(1, vec![(0, 1)]), (5, vec![])], true);
    let b = build::<u64>(4, 8, &[(3, vec![(2, 2)])], true);
    let plus = BinaryOp::builtin(Opcode::Plus, TypeCode::UInt64);
    let p = plan(&a, &b, None, true, false, Split::Coarse(1));
    assert_eq!(p.ch, Some(vec![1i64, 3, 5]));
    let c = add_phase2(
        &Type::UINT64,
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
    assert_eq!(c.hyperlist, Some(vec![1i64, 3]));
    assert_eq!(c.indptr, vec![0i64, 1, 2]);
    assert_eq!(c.nvec_nonempty, c.nvec());
}

#[test]
fn test_unknown_nonempty_count_is_computed() {
    let a = build::<u64>(4, 8, &[(1, vec![(0, 1)]), (5, vec![])], true);
    let b = build::<u64>(4, 8, &[(3, vec![(2, 2)])], true);
    let plus = BinaryOp::builtin(Opcode::Plus, TypeCode::UInt64);
    let p = plan(&a, &b, None, true, false, Split::Coarse(3));
    let mut analysis = p.analysis();
    analysis.nvec_nonempty = None;
    let c = add_phase2(
        &Type::UINT64,
        Orientation::ByCol,
        Some(&plus),
        analysis,
        &p.tasks,
        None,
        &a,
        &b,
        &AddOptions::default(),
    )
    .unwrap();
    assert_eq!(c.hyperlist, Some(vec![1i64, 3]));
}
