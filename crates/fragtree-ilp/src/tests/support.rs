use fragtree_graph::{FragmentGraph, FragmentationTree};
use fragtree_solver::{
    BackendError, BackendFactory, Bounds, LinearRow, MipBackend, ObjectiveSense, SolveStatus,
    TreeOptions,
};
use fragtree_tools::{SyntheticGraphConfig, synthetic_graph as generate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// root -> A (5), A -> B (3), root -> C (4); A and C share color 1.
pub(crate) fn scenario_graph() -> FragmentGraph {
    let mut graph = FragmentGraph::new();
    let a = graph.add_fragment_with_peak("C8H8O3", 1, 1);
    let b = graph.add_fragment_with_peak("C7H8O2", 2, 2);
    let c = graph.add_fragment_with_peak("C8H7O3", 1, 1);
    graph.add_loss(graph.root(), a, 5.0, "").unwrap();
    graph.add_loss(a, b, 3.0, "CO").unwrap();
    graph.add_loss(graph.root(), c, 4.0, "").unwrap();
    graph
}

/// Single root loss of weight `weight`.
pub(crate) fn trivial_graph(weight: f64) -> FragmentGraph {
    let mut graph = FragmentGraph::new();
    let a = graph.add_fragment("C6H6", 1);
    graph.add_loss(graph.root(), a, weight, "").unwrap();
    graph
}

pub(crate) fn synthetic_graph(seed: u64, vertices: usize, colors: u32) -> FragmentGraph {
    generate(&SyntheticGraphConfig {
        vertices,
        colors,
        density: 0.3,
        seed,
        formula_pool: None,
    })
    .unwrap()
}

/// Like [`synthetic_graph`], with formulas drawn from a pool of `pool`.
pub(crate) fn pooled_graph(seed: u64, vertices: usize, colors: u32, pool: usize) -> FragmentGraph {
    generate(&SyntheticGraphConfig {
        vertices,
        colors,
        density: 0.3,
        seed,
        formula_pool: Some(pool),
    })
    .unwrap()
}

/// Tree over the selected columns, built breadth-first from the root.
pub(crate) fn tree_from_columns(graph: &FragmentGraph, columns: &[usize]) -> FragmentationTree {
    let root = graph.root();
    let mut tree = FragmentationTree::new(root, graph.fragment(root).unwrap());
    let mut queue = std::collections::VecDeque::from([(0usize, root)]);
    while let Some((node, vertex)) = queue.pop_front() {
        for id in graph.outgoing(vertex) {
            if !columns.contains(&id.index()) {
                continue;
            }
            let loss = graph.loss(*id).unwrap();
            let fragment = graph.fragment(loss.target).unwrap();
            let child = tree.add_child(node, loss.target, fragment, loss).unwrap();
            queue.push_back((child, loss.target));
        }
    }
    tree
}

/// What a scripted backend answers on `solve`.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    /// Enumerate all assignments and return the best feasible one.
    Exhaustive,
    /// Report a fixed status without a solution.
    Status(SolveStatus),
    /// Report optimality with a fixed score and assignment.
    Fixed { score: f64, assignment: Vec<bool> },
    /// Fail inside `solve`.
    Fail,
}

#[derive(Debug, Default)]
pub(crate) struct CallLog {
    pub created: usize,
    pub disposed: usize,
    pub solves: usize,
    pub columns: Vec<(Bounds, f64)>,
    pub rows: Vec<LinearRow>,
    pub start_values: Vec<Vec<usize>>,
    pub time_limit: Option<f64>,
    pub threads: Option<u32>,
    pub log_to_console: Option<bool>,
    pub sense: Option<ObjectiveSense>,
}

pub(crate) struct ScriptedFactory {
    script: Script,
    thread_safe: bool,
    fail_dispose: bool,
    solve_delay: Duration,
    solve_lock: Mutex<()>,
    pub log: Arc<Mutex<CallLog>>,
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedFactory {
    pub(crate) fn new(script: Script) -> Self {
        Self {
            script,
            thread_safe: true,
            fail_dispose: false,
            solve_delay: Duration::ZERO,
            solve_lock: Mutex::new(()),
            log: Arc::default(),
            in_flight: Arc::default(),
            max_in_flight: Arc::default(),
        }
    }

    pub(crate) fn not_thread_safe(mut self, delay: Duration) -> Self {
        self.thread_safe = false;
        self.solve_delay = delay;
        self
    }

    pub(crate) fn failing_dispose(mut self) -> Self {
        self.fail_dispose = true;
        self
    }

    pub(crate) fn created(&self) -> usize {
        self.log.lock().unwrap().created
    }

    pub(crate) fn disposed(&self) -> usize {
        self.log.lock().unwrap().disposed
    }
}

impl BackendFactory for ScriptedFactory {
    fn create(
        &self,
        _graph: &FragmentGraph,
        _options: &TreeOptions,
    ) -> Result<Box<dyn MipBackend>, BackendError> {
        self.log.lock().unwrap().created += 1;
        Ok(Box::new(ScriptedBackend {
            script: self.script.clone(),
            fail_dispose: self.fail_dispose,
            solve_delay: self.solve_delay,
            log: Arc::clone(&self.log),
            in_flight: Arc::clone(&self.in_flight),
            max_in_flight: Arc::clone(&self.max_in_flight),
            objectives: Vec::new(),
            rows: Vec::new(),
            result: None,
            disposed: false,
        }))
    }

    fn is_thread_safe(&self) -> bool {
        self.thread_safe
    }

    fn solve_lock(&self) -> Option<&Mutex<()>> {
        Some(&self.solve_lock)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub(crate) struct ScriptedBackend {
    script: Script,
    fail_dispose: bool,
    solve_delay: Duration,
    log: Arc<Mutex<CallLog>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    objectives: Vec<f64>,
    rows: Vec<LinearRow>,
    result: Option<(f64, Vec<bool>)>,
    disposed: bool,
}

impl ScriptedBackend {
    fn ensure_live(&self) -> Result<(), BackendError> {
        if self.disposed {
            Err(BackendError::AlreadyDisposed)
        } else {
            Ok(())
        }
    }

    fn exhaustive(&self) -> Option<(f64, Vec<bool>)> {
        let num_columns = self.objectives.len();
        assert!(num_columns <= 20, "exhaustive search on {num_columns} columns");
        let mut best: Option<(f64, Vec<bool>)> = None;
        for mask in 0u32..(1 << num_columns) {
            let assignment: Vec<bool> = (0..num_columns).map(|c| mask & (1 << c) != 0).collect();
            if !self.rows.iter().all(|row| row.is_satisfied(&assignment, 1e-9)) {
                continue;
            }
            let score: f64 = self
                .objectives
                .iter()
                .zip(&assignment)
                .filter(|(_, selected)| **selected)
                .map(|(weight, _)| weight)
                .sum();
            if best.as_ref().is_none_or(|(best_score, _)| score > *best_score) {
                best = Some((score, assignment));
            }
        }
        best
    }
}

impl MipBackend for ScriptedBackend {
    fn set_time_limit(&mut self, seconds: f64) -> Result<(), BackendError> {
        self.log.lock().unwrap().time_limit = Some(seconds);
        Ok(())
    }

    fn set_threads(&mut self, threads: u32) -> Result<(), BackendError> {
        self.log.lock().unwrap().threads = Some(threads);
        Ok(())
    }

    fn set_log_to_console(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.log.lock().unwrap().log_to_console = Some(enabled);
        Ok(())
    }

    fn add_column(&mut self, bounds: Bounds, objective: f64) -> Result<usize, BackendError> {
        self.ensure_live()?;
        self.log.lock().unwrap().columns.push((bounds, objective));
        self.objectives.push(objective);
        Ok(self.objectives.len() - 1)
    }

    fn add_row(&mut self, row: &LinearRow) -> Result<usize, BackendError> {
        self.ensure_live()?;
        if let Some(&column) = row.columns.iter().find(|&&c| c >= self.objectives.len()) {
            return Err(BackendError::ColumnIndexOutOfBounds {
                column,
                num_columns: self.objectives.len(),
            });
        }
        self.log.lock().unwrap().rows.push(row.clone());
        self.rows.push(row.clone());
        Ok(self.rows.len() - 1)
    }

    fn set_objective_sense(&mut self, sense: ObjectiveSense) -> Result<(), BackendError> {
        self.log.lock().unwrap().sense = Some(sense);
        Ok(())
    }

    fn set_start_values(&mut self, selected: &[usize]) -> Result<(), BackendError> {
        self.log.lock().unwrap().start_values.push(selected.to_vec());
        Ok(())
    }

    fn solve(&mut self) -> Result<SolveStatus, BackendError> {
        self.ensure_live()?;
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        thread::sleep(self.solve_delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.log.lock().unwrap().solves += 1;

        match &self.script {
            Script::Exhaustive => match self.exhaustive() {
                Some(result) => {
                    self.result = Some(result);
                    Ok(SolveStatus::ComputationCorrect)
                }
                None => Ok(SolveStatus::Infeasible),
            },
            Script::Status(status) => Ok(*status),
            Script::Fixed { score, assignment } => {
                self.result = Some((*score, assignment.clone()));
                Ok(SolveStatus::ComputationCorrect)
            }
            Script::Fail => Err(BackendError::Native("scripted failure".to_string())),
        }
    }

    fn objective_value(&self) -> Result<f64, BackendError> {
        self.result
            .as_ref()
            .map(|(score, _)| *score)
            .ok_or(BackendError::SolveRequired {
                operation: "objective_value",
            })
    }

    fn variable_assignment(&self) -> Result<Vec<bool>, BackendError> {
        self.result
            .as_ref()
            .map(|(_, assignment)| assignment.clone())
            .ok_or(BackendError::SolveRequired {
                operation: "variable_assignment",
            })
    }

    fn dispose(&mut self) -> Result<(), BackendError> {
        self.ensure_live()?;
        self.disposed = true;
        self.log.lock().unwrap().disposed += 1;
        if self.fail_dispose {
            return Err(BackendError::Native("scripted dispose failure".to_string()));
        }
        Ok(())
    }
}
