//! Partitioned optimization (POP) heuristic.
//!
//! Pairs are split into `k` groups; each group solves max-flow on a copy
//! of the network with every capacity divided by `k`. The heuristic's
//! objective is the sum over groups. With `k = 1` it equals max-flow.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::debug;

use super::{
    current, ensure_fresh, resolve_demands, AllocationEncoder, EncodeRequest, EncodedState,
    Encoding, FlowSolution, FlowVariables,
};
use crate::application::rewrite::InnerProblem;
use crate::domain::polynomial::Polynomial;
use crate::domain::topology::{Pair, Path, Topology};
use crate::error::{ConfigError, Result};
use crate::port::solver::{Solution, Solver};

#[derive(Debug)]
pub struct PopEncoder {
    /// Network with every capacity already divided by `partitions`.
    share: Topology,
    paths: BTreeMap<Pair, Vec<Path>>,
    partitions: usize,
    assignment: BTreeMap<Pair, usize>,
    state: Option<EncodedState>,
}

impl PopEncoder {
    pub const NAME: &'static str = "pop";

    /// Encoder with an explicit pair-to-partition assignment.
    ///
    /// # Errors
    ///
    /// Fails when `partitions` is zero, a pair is assigned outside
    /// `0..partitions`, or a routable pair has no assignment.
    pub fn new(
        topology: Topology,
        paths: BTreeMap<Pair, Vec<Path>>,
        partitions: usize,
        assignment: BTreeMap<Pair, usize>,
    ) -> Result<Self> {
        if partitions == 0 {
            return Err(ConfigError::invalid("partitions", "must be at least 1").into());
        }
        if let Some((pair, group)) = assignment.iter().find(|(_, g)| **g >= partitions) {
            return Err(ConfigError::invalid(
                "partitions",
                format!("{pair} assigned to group {group}, only {partitions} exist"),
            )
            .into());
        }
        if let Some((pair, _)) = paths
            .iter()
            .find(|(pair, p)| !p.is_empty() && !assignment.contains_key(*pair))
        {
            return Err(ConfigError::invalid("partitions", format!("{pair} has no group")).into());
        }
        Ok(Self {
            share: topology.split_capacity(partitions)?,
            paths,
            partitions,
            assignment,
            state: None,
        })
    }

    /// Encoder with a uniformly random assignment.
    ///
    /// # Errors
    ///
    /// Fails when `partitions` is zero or exceeds the number of pairs.
    pub fn random<R: Rng + ?Sized>(
        topology: Topology,
        paths: BTreeMap<Pair, Vec<Path>>,
        partitions: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let assignment = topology.random_partition(partitions, rng)?;
        Self::new(topology, paths, partitions, assignment)
    }

    #[must_use]
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    #[must_use]
    pub fn assignment(&self) -> &BTreeMap<Pair, usize> {
        &self.assignment
    }
}

impl AllocationEncoder for PopEncoder {
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
        let assignment = &self.assignment;
        vars.add_capacity(
            solver,
            &mut inner,
            &self.share,
            |pair| assignment.get(pair).copied().unwrap_or(0),
        )?;

        let objective = Polynomial::from(vars.total);
        inner.add_maximization_constraints(
            solver,
            &objective,
            request.skip_optimality,
            request.verbose,
        )?;

        debug!(
            encoder = Self::NAME,
            partitions = self.partitions,
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
