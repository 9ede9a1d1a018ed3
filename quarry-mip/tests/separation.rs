//! End-to-end separation tests for the cut pool.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use quarry_mip::{CutPool, CutPoolSettings, CutSet, Domain};

const FEASTOL: f64 = 1e-6;

fn unit_box(num_cols: usize) -> Domain {
    Domain::new(vec![0.0; num_cols], vec![1.0; num_cols])
}

#[test]
fn test_duplicate_cut_returns_none() {
    let mut pool = CutPool::new(CutPoolSettings::default());
    assert_eq!(pool.add_cut(&[0, 1], &[2.0, 3.0], 5.0, true), Some(0));
    assert_eq!(pool.add_cut(&[0, 1], &[2.0, 3.0], 5.0, true), None);
}

#[test]
fn test_violated_cut_is_separated() {
    let mut pool = CutPool::new(CutPoolSettings::default());
    let id = pool.add_cut(&[0, 1], &[1.0, 1.0], 1.0, false).unwrap();

    let sol = vec![0.8, 0.8];
    let mut cutset = CutSet::new();
    pool.separate(&sol, &unit_box(2), &mut cutset, FEASTOL);

    assert_eq!(cutset.cut_indices, vec![id]);
    assert_eq!(cutset.upper, vec![1.0]);
    assert_eq!(cutset.ar_start, vec![0, 2]);
    assert_eq!(cutset.ar_index, vec![0, 1]);
    assert_eq!(cutset.ar_value, vec![1.0, 1.0]);
    // the selected cut now belongs to the LP
    assert_eq!(pool.age(id), -1);
}

#[test]
fn test_near_parallel_cuts_select_only_one() {
    // both cuts are violated by about 0.2, but they are near-parallel, so
    // the selection filter keeps only the better-scoring one
    let mut pool = CutPool::new(CutPoolSettings::default());
    let plain = pool.add_cut(&[0, 1], &[1.0, 1.0], 1.0, false).unwrap();
    let padded = pool
        .add_cut(&[0, 1, 2], &[1.0, 1.0, 0.0001], 1.0, false)
        .unwrap();

    let sol = vec![0.6, 0.6, 0.0];
    let mut cutset = CutSet::new();
    pool.separate(&sol, &unit_box(3), &mut cutset, FEASTOL);

    // the padded cut's extra term sits at zero activity, so its effective
    // norm matches the plain cut while its sparsity bonus is smaller
    assert_eq!(cutset.cut_indices, vec![plain]);
    assert!(pool.get_parallelism(plain, padded) > 0.1);
    // the loser was scored, not aged
    assert_eq!(pool.age(padded), 0);
}

#[test]
fn test_effective_norm_ignores_minimal_activity_entries() {
    // a cut padded with entries at zero activity must not score below the
    // plain cut it dominates; with orthogonal supports both get selected
    let mut pool = CutPool::new(CutPoolSettings::default());
    let padded = pool
        .add_cut(&[0, 1, 2, 3], &[1.0, 1.0, 0.5, 0.5], 1.0, false)
        .unwrap();
    let other = pool.add_cut(&[4, 5], &[1.0, 1.0], 1.0, false).unwrap();

    // columns 2 and 3 sit at their lower bound in the solution
    let sol = vec![0.7, 0.7, 0.0, 0.0, 0.7, 0.7];
    let mut cutset = CutSet::new();
    pool.separate(&sol, &unit_box(6), &mut cutset, FEASTOL);

    assert_eq!(cutset.num_cuts(), 2);
    assert!(cutset.cut_indices.contains(&padded));
    assert!(cutset.cut_indices.contains(&other));
    // CSR layout invariant
    assert_eq!(cutset.ar_start[cutset.num_cuts()], cutset.nnz());
    assert_eq!(cutset.nnz(), 6);
}

#[test]
fn test_selection_order_is_deterministic_on_ties() {
    // two orthogonal cuts with identical efficacy: the tie breaks by
    // ascending id
    let mut pool = CutPool::new(CutPoolSettings::default());
    let first = pool.add_cut(&[0, 1], &[1.0, 1.0], 1.0, false).unwrap();
    let second = pool.add_cut(&[2, 3], &[1.0, 1.0], 1.0, false).unwrap();

    let sol = vec![0.7, 0.7, 0.7, 0.7];
    let mut cutset = CutSet::new();
    pool.separate(&sol, &unit_box(4), &mut cutset, FEASTOL);

    assert_eq!(cutset.cut_indices, vec![first, second]);
}

#[test]
fn test_unviolated_cut_ages_and_evicts_with_round_leniency() {
    let mut pool = CutPool::new(CutPoolSettings {
        age_limit: 2,
        ..Default::default()
    });

    // keep one violated cut around so rounds accumulate
    let violated = pool.add_cut(&[0], &[1.0], 0.5, false).unwrap();
    let sol = vec![1.0, 0.0];
    let domain = unit_box(2);

    // rounds 1 and 2: build up the round counter
    for _ in 0..2 {
        let mut cutset = CutSet::new();
        pool.separate(&sol, &domain, &mut cutset, FEASTOL);
        assert_eq!(cutset.cut_indices, vec![violated]);
        pool.lp_cut_removed(violated);
    }

    // a never-violated cut added now survives while its age stays below
    // min(rounds, age_limit)
    let dormant = pool.add_cut(&[1], &[1.0], 2.0, false).unwrap();
    let mut cutset = CutSet::new();
    pool.separate(&sol, &domain, &mut cutset, FEASTOL);
    assert_eq!(pool.age(dormant), 1);

    let mut cutset2 = CutSet::new();
    pool.separate(&sol, &domain, &mut cutset2, FEASTOL);
    // age 2 reached the limit min(3, 2) = 2: evicted
    assert_eq!(pool.age(dormant), -1);
    assert_eq!(pool.matrix().row_len(dormant), 0);
}

#[test]
fn test_first_round_evicts_unviolated_cuts_immediately() {
    // before any round has completed the effective age limit is zero
    let mut pool = CutPool::new(CutPoolSettings::default());
    let id = pool.add_cut(&[0], &[1.0], 2.0, false).unwrap();

    let mut cutset = CutSet::new();
    pool.separate(&[0.0], &unit_box(1), &mut cutset, FEASTOL);

    assert!(cutset.is_empty());
    assert_eq!(pool.age(id), -1);
}

#[test]
fn test_readd_after_eviction_with_stale_support_entry() {
    // aging eviction leaves the support-map entry stale; re-adding the same
    // cut must succeed because the tombstoned row fails the length test
    let mut pool = CutPool::new(CutPoolSettings {
        age_limit: 0,
        ..Default::default()
    });
    let first = pool.add_cut(&[0, 1], &[1.0, 1.0], 1.0, false).unwrap();
    pool.perform_aging();
    assert_eq!(pool.age(first), -1);

    let second = pool.add_cut(&[0, 1], &[1.0, 1.0], 1.0, false);
    assert_eq!(second, Some(1), "evicted cut must not block re-adding");
}

#[test]
fn test_lp_cut_removed_makes_cut_separable_again() {
    let mut pool = CutPool::new(CutPoolSettings::default());
    let id = pool.add_cut(&[0, 1], &[1.0, 1.0], 1.0, false).unwrap();

    let sol = vec![0.8, 0.8];
    let domain = unit_box(2);
    let mut cutset = CutSet::new();
    pool.separate(&sol, &domain, &mut cutset, FEASTOL);
    assert_eq!(cutset.cut_indices, vec![id]);

    // while installed in the LP the cut is skipped
    let mut cutset2 = CutSet::new();
    pool.separate(&sol, &domain, &mut cutset2, FEASTOL);
    assert!(cutset2.is_empty());

    pool.lp_cut_removed(id);
    let mut cutset3 = CutSet::new();
    pool.separate(&sol, &domain, &mut cutset3, FEASTOL);
    assert_eq!(cutset3.cut_indices, vec![id]);
}

#[test]
fn test_randomized_churn_preserves_invariants() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let num_cols = 20;
    let mut pool = CutPool::new(CutPoolSettings {
        age_limit: 4,
        ..Default::default()
    });
    let domain = unit_box(num_cols);
    let mut live: Vec<usize> = Vec::new();

    for round in 0..50 {
        // add a few random cuts with sorted supports
        for _ in 0..3 {
            let len = rng.gen_range(1..=5);
            let mut support: Vec<usize> = (0..num_cols).collect();
            for i in 0..len {
                let j = rng.gen_range(i..num_cols);
                support.swap(i, j);
            }
            let mut indices: Vec<usize> = support[..len].to_vec();
            indices.sort_unstable();
            let values: Vec<f64> =
                (0..len).map(|_| rng.gen_range(-2.0..2.0)).collect();
            if values.iter().all(|&v| v == 0.0) {
                continue;
            }
            if let Some(id) = pool.add_cut(&indices, &values, rng.gen_range(-1.0..1.0), false)
            {
                live.push(id);
            }
        }

        let sol: Vec<f64> = (0..num_cols).map(|_| rng.gen_range(0.0..1.0)).collect();
        let mut cutset = CutSet::new();
        pool.separate(&sol, &domain, &mut cutset, FEASTOL);

        // CSR invariant: offsets close over the written non-zeros
        assert_eq!(cutset.ar_start.last().copied(), Some(cutset.nnz()));
        let total: usize = cutset
            .cut_indices
            .iter()
            .map(|&c| pool.matrix().row_len(c))
            .sum();
        assert_eq!(total, cutset.nnz());

        // no two selected cuts are near-parallel
        for i in 0..cutset.num_cuts() {
            for j in 0..i {
                let parallelism =
                    pool.get_parallelism(cutset.cut_indices[i], cutset.cut_indices[j]);
                assert!(
                    parallelism <= 0.1 + 1e-9,
                    "round {round}: selected cuts {i} and {j} too parallel"
                );
            }
        }

        // hand selected cuts back now and then so they age instead
        for &cut in &cutset.cut_indices {
            if rng.gen_bool(0.5) {
                pool.lp_cut_removed(cut);
            }
        }
        if round % 7 == 0 {
            pool.perform_aging();
        }

        // norm bookkeeping: self-parallelism of a live row is
        // ||a||^2 * norm_inv^2 and must stay at one
        live.retain(|&cut| pool.matrix().row_len(cut) > 0);
        for &cut in &live {
            assert!((pool.get_parallelism(cut, cut) - 1.0).abs() < 1e-10);
        }
    }
}
