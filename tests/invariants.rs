use netprop::{
    build_start, propagate_all, rank, ConvergenceConfig, DiffusionKernel, Graph, Method,
    PersonalizedPageRank, Propagate, RandomWalkWithRestart,
};
use proptest::prelude::*;

fn assert_prob_like(xs: &[f64]) {
    assert!(!xs.is_empty());
    for &x in xs {
        assert!(x.is_finite(), "non-finite score: {x}");
        assert!(x >= 0.0, "negative score: {x}");
    }
    let s: f64 = xs.iter().copied().sum();
    assert!((s - 1.0).abs() <= 1e-6, "sum={s} not ~1");
}

fn random_graph(n: usize, edges: &[(usize, usize, u8)]) -> Option<Graph> {
    let triples: Vec<(String, String, f64)> = edges
        .iter()
        .filter(|(u, v, _)| *u < n && *v < n)
        .map(|&(u, v, w)| (format!("n{u}"), format!("n{v}"), f64::from(w) / 10.0))
        .collect();
    Graph::from_edges(triples).ok()
}

#[test]
fn all_methods_are_finite_nonnegative_on_a_chain() {
    let g = Graph::from_edges([("a", "b", 1.0), ("b", "c", 2.0), ("c", "d", 0.5)]).unwrap();
    let s = build_start(&g, &["a"]).unwrap();
    let methods = [
        Method::from(RandomWalkWithRestart::new(0.3)),
        Method::from(PersonalizedPageRank::new(0.3)),
        Method::from(DiffusionKernel::new(1.0)),
    ];
    for (m, run) in methods.iter().zip(propagate_all(&g, &methods, &s, None)) {
        let run = run.unwrap();
        assert_eq!(run.scores.len(), g.node_count(), "{}", m.name());
        assert_prob_like(&run.scores);
    }
}

#[test]
fn repeated_runs_are_bit_identical() {
    let g = Graph::from_edges([
        ("a", "b", 0.9),
        ("b", "c", 0.4),
        ("c", "a", 0.7),
        ("c", "d", 0.2),
    ])
    .unwrap();
    let s = build_start(&g, &["a", "d"]).unwrap();
    for m in [
        Method::from(RandomWalkWithRestart::new(0.25)),
        Method::from(DiffusionKernel::new(0.8)),
    ] {
        let first = m.propagate(&g, &s, None).unwrap();
        let second = m.propagate(&g, &s, None).unwrap();
        assert_eq!(first.scores, second.scores);
        assert_eq!(
            rank(&first.scores, &g).unwrap(),
            rank(&second.scores, &g).unwrap()
        );
    }
}

#[test]
fn residuals_shrink_after_warm_up() {
    let g = Graph::from_edges([("0", "1", 1.0), ("1", "2", 1.0), ("2", "3", 1.0), ("3", "0", 1.0)])
        .unwrap();
    let s = build_start(&g, &["0"]).unwrap();
    let mut last = f64::INFINITY;
    for cap in 2..30 {
        let cfg = ConvergenceConfig {
            max_iterations: cap,
            tolerance: 1e-15,
            ..ConvergenceConfig::default()
        };
        let run = RandomWalkWithRestart::new(0.2)
            .with_convergence(cfg)
            .run(&g, &s)
            .unwrap();
        assert!(run.diff_l1 <= last, "cap={cap}: {} > {last}", run.diff_l1);
        last = run.diff_l1;
    }
}

proptest! {
    #[test]
    fn prop_restart_methods_stay_distributions(
        n in 2usize..10,
        edges in proptest::collection::vec((0usize..10, 0usize..10, 0u8..20), 1..40),
        seed in 0usize..10,
        r in 0.05f64..=1.0,
    ) {
        let Some(g) = random_graph(n, &edges) else { return Ok(()); };
        let seed = g.id(seed % g.node_count()).to_string();
        let s = build_start(&g, &[seed]).unwrap();

        let rwr = RandomWalkWithRestart::new(r).run(&g, &s).unwrap();
        prop_assert_eq!(rwr.scores.len(), g.node_count());
        prop_assert!(rwr.scores.iter().all(|x| x.is_finite() && *x >= 0.0));
        let sum: f64 = rwr.scores.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-6, "sum={}", sum);

        let ppr = PersonalizedPageRank::new(r).propagate(&g, &s, None).unwrap();
        for (a, b) in rwr.scores.iter().zip(&ppr.scores) {
            prop_assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn prop_diffusion_is_nonnegative_and_mass_preserving(
        n in 2usize..10,
        edges in proptest::collection::vec((0usize..10, 0usize..10, 0u8..20), 1..40),
        beta in 0.0f64..=2.0,
    ) {
        let Some(g) = random_graph(n, &edges) else { return Ok(()); };
        let s = build_start(&g, &[g.id(0).to_string()]).unwrap();
        let run = DiffusionKernel::new(beta).run(&g, &s).unwrap();
        prop_assert!(run.scores.iter().all(|x| x.is_finite() && *x >= 0.0));
        let sum: f64 = run.scores.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-6, "sum={}", sum);
    }

    #[test]
    fn prop_rank_is_sorted_permutation(
        scores in proptest::collection::vec(prop_oneof![Just(0.0f64), 0.0f64..1.0], 1..20),
    ) {
        let n = scores.len();
        let edges: Vec<(String, String, f64)> =
            (0..n).map(|i| (format!("n{i}"), format!("n{}", (i + 1) % n), 1.0)).collect();
        let g = Graph::from_edges(edges).unwrap();
        let list = rank(&scores, &g).unwrap();
        prop_assert_eq!(list.len(), n);
        let idx: Vec<usize> = list.iter().map(|e| g.index_of(&e.id).unwrap()).collect();
        for w in idx.windows(2) {
            let (a, b) = (w[0], w[1]);
            prop_assert!(scores[a] > scores[b] || (scores[a] == scores[b] && a < b));
        }
    }
}
