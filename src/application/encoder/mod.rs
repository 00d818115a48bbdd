//! Allocation encoders.
//!
//! Every encoder follows the same two-phase contract:
//!
//! 1. [`AllocationEncoder::encode`] builds the policy's feasible region
//!    (flow conservation, demand and capacity limits, path decomposition)
//!    into a solver and, unless told to skip it, pins optimality through
//!    an [`InnerProblem`].
//! 2. [`AllocationEncoder::solution`] reads concrete numbers back after the
//!    solver has maximized.
//!
//! Encoding twice into the same solver generation is a protocol error:
//! reset the solver first.

mod demand_pinning;
mod max_flow;
mod pop;

pub use demand_pinning::DemandPinningEncoder;
pub use max_flow::MaxFlowEncoder;
pub use pop::PopEncoder;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::application::rewrite::{InnerProblem, RewriteStrategy, DEFAULT_DUAL_BIG_M};
use crate::domain::demand::{DemandExpr, DemandMatrix};
use crate::domain::polynomial::{Polynomial, Term};
use crate::domain::topology::{Pair, Path, Topology};
use crate::domain::variable::{Var, VarKind};
use crate::error::{ConfigError, ProtocolError, Result, SolverError};
use crate::port::solver::{Solution, Solver};

/// An allocation policy that can be encoded into a solver.
pub trait AllocationEncoder: Send {
    /// Return the encoder name for logging and configuration.
    fn name(&self) -> &'static str;

    /// Candidate paths per pair.
    fn paths(&self) -> &BTreeMap<Pair, Vec<Path>>;

    /// Build the policy's region into `solver`.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::AlreadyEncoded`] when called twice on one solver generation.
    /// - Configuration errors for missing demands or quantization levels.
    /// - Solver errors from constraint registration.
    fn encode(&mut self, solver: &mut dyn Solver, request: &EncodeRequest) -> Result<Encoding>;

    /// Read the allocation out of a solution of the encoded model.
    ///
    /// # Errors
    ///
    /// Fails if nothing was encoded into the solver's current generation or
    /// the solution is stale.
    fn solution(&self, solver: &dyn Solver, solution: &Solution) -> Result<FlowSolution>;

    /// Pairs that have at least one candidate path.
    fn routable_pairs(&self) -> Vec<Pair> {
        self.paths()
            .iter()
            .filter(|(_, paths)| !paths.is_empty())
            .map(|(pair, _)| pair.clone())
            .collect()
    }
}

/// Inputs of one [`AllocationEncoder::encode`] call.
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    /// Demand expressions shared with another encoder. When set, every
    /// routable pair must have an entry.
    pub demands: Option<BTreeMap<Pair, DemandExpr>>,
    /// Concrete demands. Asserted as equalities on shared demands, or used
    /// directly as constants otherwise.
    pub fixed_demands: Option<DemandMatrix>,
    pub rewrite: RewriteStrategy,
    /// Leave the region feasibility-only.
    pub skip_optimality: bool,
    /// Upper bound on demands the encoder creates itself.
    pub demand_upper_bound: Option<f64>,
    /// Demand levels used when the encoder creates quantized demands.
    pub quantization: Vec<f64>,
    /// Bound on dual multipliers of the rewrite.
    pub dual_big_m: f64,
    pub verbose: bool,
}

impl Default for EncodeRequest {
    fn default() -> Self {
        Self {
            demands: None,
            fixed_demands: None,
            rewrite: RewriteStrategy::default(),
            skip_optimality: false,
            demand_upper_bound: None,
            quantization: Vec::new(),
            dual_big_m: DEFAULT_DUAL_BIG_M,
            verbose: false,
        }
    }
}

impl EncodeRequest {
    /// Feasibility-only region with every demand fixed.
    #[must_use]
    pub fn fixed(demands: DemandMatrix) -> Self {
        Self {
            fixed_demands: Some(demands),
            skip_optimality: true,
            ..Self::default()
        }
    }

    /// Optimality-pinned region over shared demand expressions.
    #[must_use]
    pub fn shared(demands: BTreeMap<Pair, DemandExpr>, rewrite: RewriteStrategy) -> Self {
        Self {
            demands: Some(demands),
            rewrite,
            ..Self::default()
        }
    }
}

/// Result of [`AllocationEncoder::encode`].
///
/// Not `Clone`: it is handed to exactly one maximization.
#[derive(Debug)]
pub struct Encoding {
    /// Global scalar holding the policy's objective value.
    pub objective_var: Var,
    /// Objective to maximize for this policy alone.
    pub objective: Polynomial,
    /// Demand representation per pair.
    pub demands: BTreeMap<Pair, DemandExpr>,
}

/// Flow carried on one path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathFlow {
    pub path: Path,
    pub flow: f64,
}

/// Concrete allocation read from a solution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSolution {
    pub demands: DemandMatrix,
    pub flows: BTreeMap<Pair, f64>,
    pub path_flows: BTreeMap<Pair, Vec<PathFlow>>,
    pub objective: f64,
}

impl FlowSolution {
    /// Sum of path flows crossing `from -> to`.
    #[must_use]
    pub fn edge_load(&self, from: &str, to: &str) -> f64 {
        self.path_flows
            .values()
            .flatten()
            .filter(|pf| pf.path.edges().any(|(f, t)| f == from && t == to))
            .map(|pf| pf.flow)
            .sum()
    }

    #[must_use]
    pub fn flow(&self, pair: &Pair) -> f64 {
        self.flows.get(pair).copied().unwrap_or(0.0)
    }
}

/// Create the demand representation for every pair of `paths`.
///
/// Pairs without a path get a fixed zero demand.
pub(crate) fn resolve_demands(
    solver: &mut dyn Solver,
    paths: &BTreeMap<Pair, Vec<Path>>,
    request: &EncodeRequest,
) -> Result<BTreeMap<Pair, DemandExpr>> {
    let mut demands = BTreeMap::new();
    for (pair, candidates) in paths {
        if candidates.is_empty() {
            demands.insert(pair.clone(), DemandExpr::Fixed(0.0));
            continue;
        }
        let expr = match (&request.demands, &request.fixed_demands) {
            (Some(shared), fixed) => {
                let expr = shared.get(pair).cloned().ok_or_else(|| {
                    ConfigError::invalid("demands", format!("no shared demand for {pair}"))
                })?;
                if let Some(value) = fixed.as_ref().and_then(|f| f.get(pair)) {
                    let mut pin = expr.polynomial();
                    pin.add_term(Term::constant(-value));
                    solver.add_eq_zero(pin)?;
                }
                expr
            }
            (None, Some(fixed)) => {
                let value = fixed.get(pair).ok_or_else(|| {
                    ConfigError::invalid("demands", format!("no fixed demand for {pair}"))
                })?;
                DemandExpr::Fixed(value)
            }
            (None, None) => create_demand(solver, request)?,
        };
        demands.insert(pair.clone(), expr);
    }
    Ok(demands)
}

/// Fresh demand for one pair: quantized when the primal-dual rewrite will
/// see it, continuous otherwise.
pub(crate) fn create_demand(
    solver: &mut dyn Solver,
    request: &EncodeRequest,
) -> Result<DemandExpr> {
    if request.rewrite == RewriteStrategy::PrimalDual && !request.skip_optimality {
        return quantized_demand(solver, &request.quantization);
    }
    let upper = request.demand_upper_bound;
    if let Some(ub) = upper {
        if !ub.is_finite() || ub < 0.0 {
            return Err(ConfigError::invalid("demand_upper_bound", format!("{ub}")).into());
        }
    }
    Ok(DemandExpr::Variable(solver.create_variable(
        VarKind::Continuous,
        Some(0.0),
        upper,
    )))
}

/// `Σ level_l * z_l` with `Σ z_l <= 1`.
pub(crate) fn quantized_demand(solver: &mut dyn Solver, levels: &[f64]) -> Result<DemandExpr> {
    if levels.is_empty() {
        return Err(ConfigError::MissingField {
            field: "quantization_levels",
        }
        .into());
    }
    if let Some(bad) = levels.iter().find(|l| !l.is_finite() || **l <= 0.0) {
        return Err(ConfigError::invalid(
            "quantization_levels",
            format!("level {bad} must be positive"),
        )
        .into());
    }
    let levels: Vec<(f64, Var)> = levels
        .iter()
        .map(|&l| (l, solver.create_variable(VarKind::Binary, Some(0.0), Some(1.0))))
        .collect();
    let choose_one = Polynomial::sum_of(levels.iter().map(|(_, z)| *z)).with(Term::constant(-1.0));
    solver.add_leq_zero(choose_one)?;
    Ok(DemandExpr::Quantized { levels })
}

/// Variables of a path-based flow model.
#[derive(Debug)]
pub(crate) struct FlowVariables {
    pub demands: BTreeMap<Pair, DemandExpr>,
    pub flows: BTreeMap<Pair, Var>,
    pub paths: BTreeMap<Pair, Vec<(Path, Var)>>,
    pub total: Var,
}

impl FlowVariables {
    /// Create flow and path variables and their inner constraints:
    ///
    /// ```text
    /// f_k = Σ_p x_kp,   f_k <= d_k,   f_k >= 0,   x_kp >= 0
    /// total = Σ_k f_k
    /// ```
    ///
    /// Pairs whose demand is a constant `<= 0` get no variables.
    pub fn build(
        solver: &mut dyn Solver,
        inner: &mut InnerProblem,
        candidates: &BTreeMap<Pair, Vec<Path>>,
        demands: BTreeMap<Pair, DemandExpr>,
    ) -> Result<Self> {
        let mut flows = BTreeMap::new();
        let mut paths = BTreeMap::new();

        for (pair, expr) in &demands {
            let Some(pair_paths) = candidates.get(pair).filter(|p| !p.is_empty()) else {
                continue;
            };
            if expr.fixed().is_some_and(|d| d <= 0.0) {
                continue;
            }

            let flow = solver.create_variable(VarKind::Continuous, None, None);
            inner.declare_inner(flow);
            let mut path_vars = Vec::with_capacity(pair_paths.len());
            let mut conservation = Polynomial::from(flow);
            for path in pair_paths {
                let x = solver.create_variable(VarKind::Continuous, None, None);
                inner.declare_inner(x);
                inner.add_leq_zero(solver, Polynomial::from(Term::linear(-1.0, x)))?;
                conservation.add_term(Term::linear(-1.0, x));
                path_vars.push((path.clone(), x));
            }
            inner.add_eq_zero(solver, conservation)?;
            inner.add_leq_zero(solver, Polynomial::from(Term::linear(-1.0, flow)))?;
            let mut within_demand = Polynomial::from(flow);
            within_demand.add(&expr.polynomial().negate());
            inner.add_leq_zero(solver, within_demand)?;

            flows.insert(pair.clone(), flow);
            paths.insert(pair.clone(), path_vars);
        }

        let total = solver.create_variable(VarKind::Continuous, None, None);
        inner.declare_inner(total);
        let mut definition = Polynomial::from(total);
        definition.add(&Polynomial::sum_of(flows.values().copied()).negate());
        inner.add_eq_zero(solver, definition)?;

        Ok(Self {
            demands,
            flows,
            paths,
            total,
        })
    }

    /// Per edge and group: `Σ x_kp over paths of pairs in the group crossing
    /// the edge <= capacity`.
    pub fn add_capacity(
        &self,
        solver: &mut dyn Solver,
        inner: &mut InnerProblem,
        topology: &Topology,
        group_of: impl Fn(&Pair) -> usize,
    ) -> Result<()> {
        let mut loads: BTreeMap<(usize, &str, &str), Polynomial> = BTreeMap::new();
        for (pair, path_vars) in &self.paths {
            let group = group_of(pair);
            for (path, x) in path_vars {
                for (from, to) in path.edges() {
                    loads
                        .entry((group, from, to))
                        .or_default()
                        .add_term(Term::linear(1.0, *x));
                }
            }
        }
        for ((_, from, to), mut load) in loads {
            let capacity = topology.capacity(from, to).ok_or_else(|| {
                ConfigError::invalid("paths", format!("edge {from}->{to} is not in the topology"))
            })?;
            load.add_term(Term::constant(-capacity));
            inner.add_leq_zero(solver, load)?;
        }
        Ok(())
    }

    /// Read the allocation out of `solution`.
    pub fn read(&self, solver: &dyn Solver, solution: &Solution) -> Result<FlowSolution> {
        if solution.generation() != solver.generation() {
            return Err(SolverError::StaleSolution {
                solution: solution.generation(),
                current: solver.generation(),
            }
            .into());
        }
        let demands = self
            .demands
            .iter()
            .map(|(pair, expr)| Ok((pair.clone(), solution.evaluate(&expr.polynomial())?)))
            .collect::<Result<DemandMatrix>>()?;
        let flows = self
            .flows
            .iter()
            .map(|(pair, v)| Ok((pair.clone(), solver.value(solution, *v)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        let path_flows = self
            .paths
            .iter()
            .map(|(pair, vars)| {
                let flows = vars
                    .iter()
                    .map(|(path, v)| {
                        Ok(PathFlow {
                            path: path.clone(),
                            flow: solver.value(solution, *v)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok((pair.clone(), flows))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(FlowSolution {
            demands,
            flows,
            path_flows,
            objective: solver.value(solution, self.total)?,
        })
    }
}

/// Flow variables tagged with the solver generation they were built in.
#[derive(Debug)]
pub(crate) struct EncodedState {
    pub generation: u64,
    pub vars: FlowVariables,
}

/// Refuse a second encoding into the same solver generation.
pub(crate) fn ensure_fresh(
    state: Option<&EncodedState>,
    solver: &dyn Solver,
    encoder: &'static str,
) -> Result<()> {
    match state {
        Some(s) if s.generation == solver.generation() => Err(ProtocolError::AlreadyEncoded {
            encoder,
            generation: s.generation,
        }
        .into()),
        _ => Ok(()),
    }
}

/// The encoding of the solver's current generation.
pub(crate) fn current<'a>(
    state: Option<&'a EncodedState>,
    solver: &dyn Solver,
    encoder: &'static str,
) -> Result<&'a FlowVariables> {
    match state {
        Some(s) if s.generation == solver.generation() => Ok(&s.vars),
        _ => Err(ProtocolError::NotEncoded { encoder }.into()),
    }
}
