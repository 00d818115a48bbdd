//! Optimal multi-commodity max-flow over candidate paths.

use std::collections::BTreeMap;

use tracing::debug;

use super::{
    current, ensure_fresh, resolve_demands, AllocationEncoder, EncodeRequest, EncodedState,
    Encoding, FlowSolution, FlowVariables,
};
use crate::application::rewrite::InnerProblem;
use crate::domain::polynomial::Polynomial;
use crate::domain::topology::{Pair, Path, Topology};
use crate::error::Result;
use crate::port::solver::{Solution, Solver};

/// Maximizes total carried flow subject to demand and edge capacity limits.
#[derive(Debug)]
pub struct MaxFlowEncoder {
    topology: Topology,
    paths: BTreeMap<Pair, Vec<Path>>,
    state: Option<EncodedState>,
}

impl MaxFlowEncoder {
    pub const NAME: &'static str = "max_flow";

    #[must_use]
    pub fn new(topology: Topology, paths: BTreeMap<Pair, Vec<Path>>) -> Self {
        Self {
            topology,
            paths,
            state: None,
        }
    }

    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }
}

impl AllocationEncoder for MaxFlowEncoder {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn paths(&self) -> &BTreeMap<Pair, Vec<Path>> {
        &self.paths
    }

    fn encode(&mut self, solver: &mut dyn Solver, request: &EncodeRequest) -> Result<Encoding> {
        ensure_fresh(self.state.as_ref(), solver, Self::NAME)?;

        let mut inner = InnerProblem::new(request.rewrite, request.dual_big_m)?;
        let demands = resolve_demands(solver, &self.paths, request)?;
        let vars = FlowVariables::build(solver, &mut inner, &self.paths, demands)?;
        vars.add_capacity(solver, &mut inner, &self.topology, |_| 0)?;

        let objective = Polynomial::from(vars.total);
        inner.add_maximization_constraints(
            solver,
            &objective,
            request.skip_optimality,
            request.verbose,
        )?;

        debug!(
            encoder = Self::NAME,
            pairs = vars.flows.len(),
            inner_constraints = inner.constraint_count(),
            "Encoded allocation"
        );

        let encoding = Encoding {
            objective_var: vars.total,
            objective,
            demands: vars.demands.clone(),
        };
        self.state = Some(EncodedState {
            generation: solver.generation(),
            vars,
        });
        Ok(encoding)
    }

    fn solution(&self, solver: &dyn Solver, solution: &Solution) -> Result<FlowSolution> {
        current(self.state.as_ref(), solver, Self::NAME)?.read(solver, solution)
    }
}
