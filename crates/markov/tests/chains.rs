use approx::assert_abs_diff_eq;
use geodyn_markov::{
    Markov, MarkovConfig, MarkovError, SteadyState, TransitionMatrix, classify_chain, mfpt,
    sojourn_time, steady_state,
};
use ndarray::{Array2, array};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random `n x t` panel of states in `0..k` with sticky dynamics.
fn random_panel(n: usize, t: usize, k: usize, seed: u64) -> Array2<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut panel = Array2::zeros((n, t));
    for i in 0..n {
        let mut state = rng.random_range(0..k);
        for j in 0..t {
            if rng.random_bool(0.4) {
                state = rng.random_range(0..k);
            }
            panel[[i, j]] = state;
        }
    }
    panel
}

fn quiet() -> MarkovConfig {
    MarkovConfig::new().with_summary(false)
}

fn assert_stationary(p: &Array2<f64>, pi: ndarray::ArrayView1<'_, f64>) {
    assert!(pi.iter().all(|&x| x >= 0.0));
    assert_abs_diff_eq!(pi.sum(), 1.0, epsilon = 1e-9);
    let next = pi.dot(p);
    for (a, b) in next.iter().zip(pi.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-8);
    }
}

// ---------------------------------------------------------------------------
// 1. weather chain (irreducible)
// ---------------------------------------------------------------------------
#[test]
fn weather_chain_steady_state_and_passage_times() {
    let p = TransitionMatrix::new(array![
        [0.5, 0.25, 0.25],
        [0.5, 0.0, 0.5],
        [0.25, 0.25, 0.5]
    ])
    .unwrap();
    let ss = steady_state(&p, false).unwrap();
    let pi = ss.as_ergodic().unwrap();
    assert_abs_diff_eq!(pi[0], 0.4, epsilon = 1e-9);
    assert_abs_diff_eq!(pi[1], 0.2, epsilon = 1e-9);
    assert_abs_diff_eq!(pi[2], 0.4, epsilon = 1e-9);

    let m = mfpt(&p, false).unwrap();
    assert_abs_diff_eq!(m[[0, 0]], 2.5, epsilon = 1e-9);
    assert_abs_diff_eq!(m[[0, 1]], 4.0, epsilon = 1e-9);
    assert_abs_diff_eq!(m[[0, 2]], 10.0 / 3.0, epsilon = 1e-9);
}

// ---------------------------------------------------------------------------
// 2. reducible chain with an absorbing state
// ---------------------------------------------------------------------------
#[test]
fn reducible_chain_has_two_recurrent_classes() {
    let p = TransitionMatrix::new(array![[0.5, 0.5, 0.0], [0.2, 0.8, 0.0], [0.0, 0.0, 1.0]])
        .unwrap();
    let classification = classify_chain(&p).unwrap();
    assert_eq!(classification.recurrent().count(), 2);
    assert_eq!(classification.absorbing(), &[2]);

    let ss = steady_state(&p, false).unwrap();
    let SteadyState::Decomposed(rows) = &ss else {
        panic!("expected one distribution per recurrent class");
    };
    assert_abs_diff_eq!(rows[[0, 0]], 0.2857, epsilon = 1e-4);
    assert_abs_diff_eq!(rows[[0, 1]], 0.7143, epsilon = 1e-4);
    assert_eq!(rows.row(1).to_vec(), vec![0.0, 0.0, 1.0]);
    for i in 0..ss.len() {
        assert_stationary(p.probs(), ss.distribution(i).unwrap());
    }
}

// ---------------------------------------------------------------------------
// 3. zero-row repair
// ---------------------------------------------------------------------------
#[test]
fn zero_row_repair_sets_only_the_diagonal() {
    let counts = array![[3.0, 1.0, 0.0], [2.0, 2.0, 0.0], [0.0, 0.0, 0.0]];
    let p = TransitionMatrix::from_counts(&counts).unwrap();
    let repaired = p.require_stochastic(true).unwrap();
    assert_eq!(repaired.probs()[[2, 2]], 1.0);
    assert_eq!(repaired.probs().row(2).sum(), 1.0);
    for i in 0..2 {
        assert_eq!(repaired.probs().row(i), p.probs().row(i));
    }
    assert_eq!(repaired.fill_empty_rows(), repaired);
    assert!(matches!(
        mfpt(&p, false),
        Err(MarkovError::UnnormalizableMatrix { rows: 1 })
    ));
}

// ---------------------------------------------------------------------------
// 4. random panels: fixed point, recurrence times, sojourn times
// ---------------------------------------------------------------------------
#[test]
fn random_panels_satisfy_chain_identities() {
    for seed in 0..5 {
        let panel = random_panel(40, 12, 4, seed);
        let chain = Markov::new(panel.view(), quiet()).unwrap();
        let p = chain.p().fill_empty_rows().into_inner();
        let ss = chain.steady_state().unwrap();

        for i in 0..ss.len() {
            assert_stationary(&p, ss.distribution(i).unwrap());
        }

        if let Some(pi) = ss.as_ergodic() {
            let m = chain.mfpt().unwrap();
            for i in 0..chain.k() {
                assert_abs_diff_eq!(m[[i, i]], 1.0 / pi[i], epsilon = 1e-6);
            }
        }

        let st = sojourn_time(chain.p());
        for i in 0..chain.k() {
            let pii = p[[i, i]];
            if pii < 1.0 {
                assert_abs_diff_eq!(st.times[i], 1.0 / (1.0 - pii), epsilon = 1e-12);
            } else {
                assert!(st.times[i].is_infinite());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 5. transient states in an estimated chain
// ---------------------------------------------------------------------------
#[test]
fn estimated_chain_with_transient_state() {
    // Label 0 is left and never re-entered.
    let ids = array![[0, 1, 2, 1], [0, 2, 1, 2], [1, 2, 2, 1]];
    let chain = Markov::new(ids.view(), quiet()).unwrap();
    let classification = chain.classification();
    assert_eq!(classification.transient().count(), 1);
    assert_eq!(classification.transient().next().unwrap().states(), &[0]);

    let m = chain.mfpt().unwrap();
    assert!(m[[0, 0]].is_infinite());
    assert!(m[[1, 0]].is_infinite());
    assert!(m[[0, 1]].is_finite());
    assert!(m[[0, 2]].is_finite());
}

// ---------------------------------------------------------------------------
// 6. transient state draining into several absorbing states
// ---------------------------------------------------------------------------
#[test]
fn transient_state_split_between_absorbing_states() {
    let p = TransitionMatrix::new(array![[0.5, 0.25, 0.25], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
        .unwrap();
    let classification = classify_chain(&p).unwrap();
    assert_eq!(classification.absorbing(), &[1, 2]);
    assert_eq!(classification.transient().count(), 1);

    // From 0 the chain may be absorbed by the other target first.
    let m = mfpt(&p, false).unwrap();
    assert!(m[[0, 1]].is_infinite());
    assert!(m[[0, 2]].is_infinite());
    assert!(m[[1, 2]].is_infinite());
    assert!(m[[2, 1]].is_infinite());
    assert!(m[[1, 0]].is_infinite());
    assert_abs_diff_eq!(m[[1, 1]], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(m[[2, 2]], 1.0, epsilon = 1e-12);

    let sojourn = sojourn_time(&p);
    assert_abs_diff_eq!(sojourn.times[0], 2.0, epsilon = 1e-12);
}
