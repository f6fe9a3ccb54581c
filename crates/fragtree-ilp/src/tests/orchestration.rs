use super::support::{
    Script, ScriptedFactory, pooled_graph, scenario_graph, synthetic_graph, trivial_graph,
};
use crate::{EdgeIndex, TreeError, TreeSolver, VerificationError, build_rows};
use fragtree_graph::{FragmentGraph, GraphError, VertexId};
use fragtree_solver::{Bounds, ConstraintFamily, ObjectiveSense, SolveStatus, TreeOptions};
use std::sync::Arc;
use std::time::Duration;

fn solver_for(factory: &Arc<ScriptedFactory>) -> TreeSolver {
    TreeSolver::new(Arc::clone(factory) as Arc<dyn fragtree_solver::BackendFactory>)
}

#[test]
#[allow(clippy::float_cmp)]
fn test_scenario_selects_heavier_chain() {
    let factory = Arc::new(ScriptedFactory::new(Script::Exhaustive));
    let solver = solver_for(&factory);
    let graph = scenario_graph();

    let computed = solver.compute(&graph, &TreeOptions::new()).unwrap();

    assert_eq!(computed.score, 8.0);
    assert_eq!(computed.status, SolveStatus::ComputationCorrect);
    assert_eq!(computed.tree.tree_weight(), 8.0);
    assert_eq!(computed.tree.root_score(), 5.0);
    let a = computed.tree.find("C8H8O3").unwrap();
    let b = computed.tree.find("C7H8O2").unwrap();
    assert_eq!(computed.tree.children(0), &[a]);
    assert_eq!(computed.tree.children(a), &[b]);
    assert!(computed.tree.find("C8H7O3").is_none());

    assert_eq!(computed.statistics.backend, "scripted");
    assert_eq!(computed.statistics.num_columns, 3);
    assert!(!computed.statistics.trivial);
    for stage in ["prepare", "solve", "reconstruct", "verify"] {
        assert!(computed.statistics.stage(stage).is_some(), "missing {stage}");
    }
    assert_eq!(factory.created(), 1);
    assert_eq!(factory.disposed(), 1);
}

#[test]
fn test_model_is_handed_to_backend() {
    let factory = Arc::new(ScriptedFactory::new(Script::Exhaustive));
    let solver = solver_for(&factory);
    let graph = scenario_graph();
    let options = TreeOptions::new()
        .with_time_limit(30.0)
        .with_threads(2)
        .with_log_to_console(false);

    let computed = solver.compute(&graph, &options).unwrap();

    let log = factory.log.lock().unwrap();
    let weights: Vec<f64> = graph.losses().iter().map(|loss| loss.weight).collect();
    assert_eq!(
        log.columns,
        weights
            .iter()
            .map(|&weight| (Bounds::binary(), weight))
            .collect::<Vec<_>>()
    );
    let index = EdgeIndex::compute(&graph);
    assert_eq!(log.rows, build_rows(&graph, &index, None).into_rows());
    assert_eq!(log.sense, Some(ObjectiveSense::Maximize));
    assert_eq!(log.time_limit, Some(30.0));
    assert_eq!(log.threads, Some(2));
    assert_eq!(log.log_to_console, Some(false));
    assert!(log.start_values.is_empty());
    assert_eq!(computed.statistics.num_rows(), log.rows.len());
}

#[test]
fn test_unbounded_options_are_not_forwarded() {
    let factory = Arc::new(ScriptedFactory::new(Script::Exhaustive));
    let solver = solver_for(&factory);
    let options = TreeOptions::new().with_time_limit(0.0).with_threads(0);

    solver.compute(&scenario_graph(), &options).unwrap();

    let log = factory.log.lock().unwrap();
    assert_eq!(log.time_limit, None);
    assert_eq!(log.threads, None);
    assert_eq!(log.log_to_console, None);
}

#[test]
#[allow(clippy::float_cmp)]
fn test_trivial_graph_bypasses_backend() {
    let factory = Arc::new(ScriptedFactory::new(Script::Fail));
    let solver = solver_for(&factory);

    let computed = solver
        .compute(&trivial_graph(2.5), &TreeOptions::new())
        .unwrap();

    assert_eq!(computed.score, 2.5);
    assert_eq!(computed.tree.num_edges(), 1);
    assert_eq!(computed.tree.tree_weight(), 2.5);
    assert!(computed.statistics.trivial);
    assert_eq!(factory.created(), 0);
}

#[test]
fn test_trivial_graph_below_minimal_score_is_infeasible() {
    let factory = Arc::new(ScriptedFactory::new(Script::Exhaustive));
    let solver = solver_for(&factory);
    let options = TreeOptions::new().with_minimal_score(3.0);

    let err = solver.compute(&trivial_graph(2.5), &options).unwrap_err();
    assert_eq!(err.status(), Some(SolveStatus::Infeasible));
    assert_eq!(factory.created(), 0);
}

#[test]
fn test_single_loss_away_from_root_is_infeasible() {
    let mut graph = FragmentGraph::new();
    let a = graph.add_fragment("C6H6", 1);
    let b = graph.add_fragment("C5H6", 2);
    graph.add_loss(a, b, 1.0, "C").unwrap();
    let factory = Arc::new(ScriptedFactory::new(Script::Exhaustive));

    let err = solver_for(&factory)
        .compute(&graph, &TreeOptions::new())
        .unwrap_err();
    assert_eq!(err.status(), Some(SolveStatus::Infeasible));
}

#[test]
fn test_invalid_graph_never_reaches_backend() {
    let factory = Arc::new(ScriptedFactory::new(Script::Exhaustive));
    let solver = solver_for(&factory);

    let err = solver
        .compute(&FragmentGraph::new(), &TreeOptions::new())
        .unwrap_err();
    assert_eq!(err, TreeError::InvalidGraph(GraphError::NoLosses));

    let mut cyclic = FragmentGraph::new();
    let a = cyclic.add_fragment("C6H6", 1);
    let b = cyclic.add_fragment("C5H6", 2);
    cyclic.add_loss(cyclic.root(), a, 1.0, "").unwrap();
    cyclic.add_loss(a, b, 1.0, "C").unwrap();
    cyclic.add_loss(b, a, 1.0, "C").unwrap();
    let err = solver.compute(&cyclic, &TreeOptions::new()).unwrap_err();
    assert_eq!(err.code(), "GRAPH_CYCLE");

    assert_eq!(factory.created(), 0);
}

#[test]
fn test_abort_statuses_are_translated() {
    for status in [
        SolveStatus::Infeasible,
        SolveStatus::Timeout,
        SolveStatus::Abandoned,
        SolveStatus::NoSolution,
    ] {
        let factory = Arc::new(ScriptedFactory::new(Script::Status(status)));
        let err = solver_for(&factory)
            .compute(&scenario_graph(), &TreeOptions::new())
            .unwrap_err();

        assert_eq!(err, TreeError::Aborted { status });
        assert_eq!(err.is_retriable(), status.is_retriable());
        assert!(!err.is_defect());
        assert_eq!(factory.disposed(), 1, "backend leaked on {status}");
    }
}

#[test]
fn test_timeout_is_distinguishable() {
    let factory = Arc::new(ScriptedFactory::new(Script::Status(SolveStatus::Timeout)));
    let options = TreeOptions::new().with_time_limit(1e-3);

    let err = solver_for(&factory)
        .compute(&synthetic_graph(5, 8, 4), &options)
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.is_retriable());
    assert_eq!(factory.log.lock().unwrap().time_limit, Some(1e-3));
}

#[test]
fn test_minimal_score_above_optimum_is_infeasible() {
    let factory = Arc::new(ScriptedFactory::new(Script::Exhaustive));
    let options = TreeOptions::new().with_minimal_score(8.5);

    let err = solver_for(&factory)
        .compute(&scenario_graph(), &options)
        .unwrap_err();

    assert_eq!(err.status(), Some(SolveStatus::Infeasible));
    let log = factory.log.lock().unwrap();
    assert!(
        log.rows
            .iter()
            .any(|row| row.family == ConstraintFamily::MinimalScore)
    );
}

#[test]
fn test_backend_failure_disposes_backend() {
    let factory = Arc::new(ScriptedFactory::new(Script::Fail));
    let err = solver_for(&factory)
        .compute(&scenario_graph(), &TreeOptions::new())
        .unwrap_err();

    assert_eq!(err.code(), "BACKEND_NATIVE");
    assert_eq!(factory.disposed(), 1);
}

#[test]
fn test_score_mismatch_is_a_defect() {
    let factory = Arc::new(ScriptedFactory::new(Script::Fixed {
        score: 9.0,
        assignment: vec![true, true, false],
    }));
    let err = solver_for(&factory)
        .compute(&scenario_graph(), &TreeOptions::new())
        .unwrap_err();

    assert!(err.is_defect());
    assert!(matches!(
        err,
        TreeError::Verification(VerificationError::ScoreMismatch { .. })
    ));
    assert_eq!(factory.disposed(), 1);
}

#[test]
fn test_colorless_assignment_is_a_defect() {
    let factory = Arc::new(ScriptedFactory::new(Script::Fixed {
        score: 9.0,
        assignment: vec![true, false, true],
    }));
    let err = solver_for(&factory)
        .compute(&scenario_graph(), &TreeOptions::new())
        .unwrap_err();

    assert_eq!(
        err,
        TreeError::Verification(VerificationError::ColorConflict { color: 1 })
    );
    assert_eq!(factory.disposed(), 1);
}

#[test]
fn test_short_assignment_is_a_defect() {
    let factory = Arc::new(ScriptedFactory::new(Script::Fixed {
        score: 5.0,
        assignment: vec![true],
    }));
    let err = solver_for(&factory)
        .compute(&scenario_graph(), &TreeOptions::new())
        .unwrap_err();
    assert_eq!(err.code(), "VERIFY_ASSIGNMENT_LENGTH");
}

#[test]
fn test_dispose_failure_does_not_mask_result() {
    let factory = Arc::new(ScriptedFactory::new(Script::Exhaustive).failing_dispose());
    let computed = solver_for(&factory)
        .compute(&scenario_graph(), &TreeOptions::new())
        .unwrap();
    assert_eq!(computed.tree.num_edges(), 2);
    assert_eq!(factory.disposed(), 1);

    let factory = Arc::new(
        ScriptedFactory::new(Script::Status(SolveStatus::Timeout)).failing_dispose(),
    );
    let err = solver_for(&factory)
        .compute(&scenario_graph(), &TreeOptions::new())
        .unwrap_err();
    assert!(err.is_timeout());
}

#[test]
#[allow(clippy::float_cmp)]
fn test_warm_start_seeds_backend_without_changing_score() {
    let factory = Arc::new(ScriptedFactory::new(Script::Exhaustive));
    let solver = solver_for(&factory);
    let graph = synthetic_graph(11, 7, 5);

    let cold = solver.compute(&graph, &TreeOptions::new()).unwrap();
    let options = TreeOptions::new().with_template(cold.tree.clone());
    let warm = solver.compute(&graph, &options).unwrap();

    assert_eq!(warm.score, cold.score);
    let start = warm.statistics.warm_start.as_ref().unwrap();
    assert_eq!(start.unmatched, 0);
    assert_eq!(start.columns.len(), cold.tree.num_edges());

    let log = factory.log.lock().unwrap();
    assert_eq!(log.start_values, vec![start.columns.clone()]);
}

#[test]
fn test_returned_trees_are_colorful_single_parent_and_consistent() {
    let factory = Arc::new(ScriptedFactory::new(Script::Exhaustive));
    let solver = solver_for(&factory);

    let graphs = (1..=6).flat_map(|seed| {
        [
            (seed, synthetic_graph(seed, 7, 4)),
            (seed, pooled_graph(seed, 7, 4, 2)),
        ]
    });
    for (seed, graph) in graphs {
        let computed = match solver.compute(&graph, &TreeOptions::new()) {
            Ok(computed) => computed,
            Err(err) => panic!("seed {seed}: {err}"),
        };
        let tree = &computed.tree;

        let mut colors: Vec<u32> = tree.nodes()[1..].iter().map(|node| node.color).collect();
        colors.sort_unstable();
        colors.dedup();
        assert_eq!(colors.len(), tree.num_edges());

        let mut vertices: Vec<VertexId> = tree.nodes().iter().map(|node| node.vertex).collect();
        vertices.sort_unstable();
        vertices.dedup();
        assert_eq!(vertices.len(), tree.num_nodes());
        assert_eq!(tree.edges().count(), tree.num_nodes() - 1);

        assert!((tree.tree_weight() - computed.score).abs() < 1e-4);
        assert!(!tree.children(0).is_empty());
    }
}

#[test]
fn test_non_thread_safe_backends_are_serialized() {
    let factory = Arc::new(
        ScriptedFactory::new(Script::Exhaustive).not_thread_safe(Duration::from_millis(20)),
    );
    let solver = solver_for(&factory);
    let graphs: Vec<FragmentGraph> = (1..=4).map(|seed| synthetic_graph(seed, 6, 3)).collect();
    let jobs: Vec<(&FragmentGraph, TreeOptions)> = graphs
        .iter()
        .map(|graph| (graph, TreeOptions::new()))
        .collect();

    let results = solver.compute_all(&jobs);

    assert_eq!(results.len(), 4);
    assert_eq!(
        factory
            .max_in_flight
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(factory.disposed(), 4);
}

#[test]
fn test_solvers_sharing_a_factory_are_serialized_together() {
    let factory = Arc::new(
        ScriptedFactory::new(Script::Exhaustive).not_thread_safe(Duration::from_millis(20)),
    );
    let solvers = [solver_for(&factory), solver_for(&factory)];
    let graphs: Vec<FragmentGraph> = (1..=4).map(|seed| synthetic_graph(seed, 6, 3)).collect();

    std::thread::scope(|scope| {
        for (solver, graphs) in solvers.iter().zip(graphs.chunks(2)) {
            scope.spawn(move || {
                for graph in graphs {
                    solver.compute(graph, &TreeOptions::new()).unwrap();
                }
            });
        }
    });

    assert_eq!(
        factory
            .max_in_flight
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(factory.disposed(), 4);
}

#[test]
#[allow(clippy::float_cmp)]
fn test_compute_all_keeps_input_order() {
    let factory = Arc::new(ScriptedFactory::new(Script::Exhaustive));
    let solver = solver_for(&factory);
    let scenario = scenario_graph();
    let trivial = trivial_graph(1.5);
    let empty = FragmentGraph::new();
    let jobs = vec![
        (&scenario, TreeOptions::new()),
        (&empty, TreeOptions::new()),
        (&trivial, TreeOptions::new()),
    ];

    let results = solver.compute_all(&jobs);

    assert_eq!(results[0].as_ref().unwrap().score, 8.0);
    assert!(matches!(results[1], Err(TreeError::InvalidGraph(_))));
    assert_eq!(results[2].as_ref().unwrap().score, 1.5);
}
