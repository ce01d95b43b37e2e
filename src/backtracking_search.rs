use instant::{Duration, Instant};
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, error, info, trace};

use crate::arc_consistency::{ac3, enforce_node_consistency, Arc};
use crate::assignment::Assignment;
use crate::domains::Domains;
use crate::grid_config::{GridConfig, Variable, VariableId, WordId};
use crate::MAX_SLOT_LENGTH;

/// Knobs for a fill attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillOptions {
    /// Maintain arc consistency after every tentative assignment.
    pub inference: bool,
}

impl Default for FillOptions {
    fn default() -> FillOptions {
        FillOptions { inference: true }
    }
}

/// A struct tracking statistics about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Tentative assignments tried.
    pub states: u64,
    pub backtracks: u64,
    /// Variables assigned by inference rather than by choice, including ones later undone.
    pub inferred: u64,
    /// Words removed by node consistency and the initial AC-3 pass.
    pub pruned: usize,
    pub duration: Duration,
}

/// A struct representing the results of a fill operation.
#[derive(Debug)]
pub struct FillSuccess {
    pub assignment: Assignment,
    pub statistics: Statistics,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FillFailure {
    /// Propagation emptied a domain before search started.
    #[error("no solution: no candidate words left for {variable:?}")]
    Unsatisfiable { variable: Variable },

    /// Every branch of the search failed.
    #[error("no solution: search exhausted")]
    Exhausted,
}

/// Does the assignment respect word lengths, word uniqueness, and every crossing between two
/// assigned variables?
pub fn consistent(config: &GridConfig, assignment: &Assignment) -> bool {
    let mut used: HashSet<WordId> = HashSet::with_capacity(assignment.len());

    for (variable_id, word_id) in assignment.iter() {
        let word = config.word(word_id);

        if word.len() != config.variable(variable_id).length {
            return false;
        }
        if !used.insert(word_id) {
            return false;
        }

        for crossing in config.crossings(variable_id) {
            if let Some(other_word_id) = assignment.get(crossing.other_variable_id) {
                let glyph = word.glyphs.get(crossing.cell);
                let other_glyph = config.word(other_word_id).glyphs.get(crossing.other_cell);
                if glyph.is_none() || glyph != other_glyph {
                    return false;
                }
            }
        }
    }

    true
}

/// Pick the unassigned variable with the fewest remaining words, preferring the one with the most
/// neighbors and then the lowest id. Returns `None` once every variable is assigned.
pub fn select_unassigned_variable(
    config: &GridConfig,
    domains: &Domains,
    assignment: &Assignment,
) -> Option<VariableId> {
    (0..config.variable_count())
        .filter(|&variable_id| !assignment.contains(variable_id))
        .min_by_key(|&variable_id| {
            (domains.len(variable_id), Reverse(config.degree(variable_id)), variable_id)
        })
}

/// Letter counts at the shared cell of one unassigned neighbor.
struct NeighborGlyphCounts {
    cell: usize,
    counts: HashMap<char, usize>,
    total: usize,
}

/// Every word in the variable's domain, ordered so the ones ruling out the fewest words for
/// unassigned neighbors come first. Ties keep WordId order.
pub fn order_domain_values(
    config: &GridConfig,
    domains: &Domains,
    variable_id: VariableId,
    assignment: &Assignment,
) -> Vec<WordId> {
    let neighbor_glyph_counts: SmallVec<[NeighborGlyphCounts; MAX_SLOT_LENGTH]> = config
        .crossings(variable_id)
        .iter()
        .filter(|crossing| !assignment.contains(crossing.other_variable_id))
        .map(|crossing| {
            let mut counts: HashMap<char, usize> = HashMap::new();
            let mut total = 0;
            for word_id in domains.iter(crossing.other_variable_id) {
                total += 1;
                if let Some(&glyph) = config.word(word_id).glyphs.get(crossing.other_cell) {
                    *counts.entry(glyph).or_insert(0) += 1;
                }
            }
            NeighborGlyphCounts { cell: crossing.cell, counts, total }
        })
        .collect();

    let mut values: Vec<WordId> = domains.iter(variable_id).collect();

    values.sort_by_cached_key(|&word_id| {
        let word = config.word(word_id);
        let ruled_out: usize = neighbor_glyph_counts
            .iter()
            .map(|neighbor| {
                let compatible = word
                    .glyphs
                    .get(neighbor.cell)
                    .and_then(|glyph| neighbor.counts.get(glyph))
                    .copied()
                    .unwrap_or(0);
                neighbor.total - compatible
            })
            .sum();
        (ruled_out, word_id)
    });

    values
}

/// Propagate the consequences of the word just assigned to `variable_id`. The variable's domain is
/// narrowed to that word, the word is removed from every other unassigned domain, and AC-3 runs
/// from the arcs pointing at assigned variables and at variables touched by the removal.
///
/// Returns each unassigned variable left with a single word, paired with that word, or `None` if
/// some domain was wiped out. Domain changes are left in place either way; the caller owns the
/// checkpoint.
pub fn infer(
    config: &GridConfig,
    domains: &mut Domains,
    assignment: &Assignment,
    variable_id: VariableId,
) -> Option<Vec<(VariableId, WordId)>> {
    let word_id = assignment.get(variable_id)?;

    domains.restrict(variable_id, word_id);
    if domains.is_empty(variable_id) {
        return None;
    }

    let mut touched: SmallVec<[VariableId; MAX_SLOT_LENGTH]> = SmallVec::new();
    for other_id in 0..config.variable_count() {
        if other_id == variable_id || assignment.contains(other_id) {
            continue;
        }
        if domains.remove(other_id, word_id) {
            if domains.is_empty(other_id) {
                return None;
            }
            touched.push(other_id);
        }
    }

    let mut arcs: Vec<Arc> = vec![];
    for (assigned_id, _) in assignment.iter() {
        for neighbor_id in config.neighbors(assigned_id) {
            if !assignment.contains(neighbor_id) {
                arcs.push((neighbor_id, assigned_id));
            }
        }
    }
    for &touched_id in &touched {
        for neighbor_id in config.neighbors(touched_id) {
            if !assignment.contains(neighbor_id) {
                arcs.push((neighbor_id, touched_id));
            }
        }
    }

    ac3(config, domains, Some(arcs)).ok()?;

    Some(
        (0..config.variable_count())
            .filter(|&other_id| !assignment.contains(other_id))
            .filter_map(|other_id| domains.single(other_id).map(|single| (other_id, single)))
            .collect(),
    )
}

/// Recursive backtracking search. On success `assignment` is complete and `true` is returned; on
/// failure `assignment` and `domains` are back in the state they were passed in.
pub fn backtrack(
    config: &GridConfig,
    domains: &mut Domains,
    options: &FillOptions,
    statistics: &mut Statistics,
    assignment: &mut Assignment,
) -> bool {
    // Nothing left to select means every variable has a word.
    let Some(variable_id) = select_unassigned_variable(config, domains, assignment) else {
        return true;
    };

    for word_id in order_domain_values(config, domains, variable_id, assignment) {
        statistics.states += 1;
        trace!(variable_id, word = %config.word(word_id).string, depth = assignment.len(), "try");

        assignment.assign(variable_id, word_id);
        if !consistent(config, assignment) {
            assignment.unassign(variable_id);
            continue;
        }

        let checkpoint = domains.checkpoint();

        let inferred = if options.inference {
            match infer(config, domains, assignment, variable_id) {
                Some(inferred) => inferred,
                None => {
                    trace!(variable_id, "inference failed");
                    domains.rollback(checkpoint);
                    assignment.unassign(variable_id);
                    continue;
                }
            }
        } else {
            vec![]
        };

        for &(inferred_id, inferred_word_id) in &inferred {
            assignment.assign(inferred_id, inferred_word_id);
        }
        statistics.inferred += inferred.len() as u64;

        if (inferred.is_empty() || consistent(config, assignment))
            && backtrack(config, domains, options, statistics, assignment)
        {
            return true;
        }

        for &(inferred_id, _) in &inferred {
            assignment.unassign(inferred_id);
        }
        assignment.unassign(variable_id);
        domains.rollback(checkpoint);

        statistics.backtracks += 1;
        trace!(variable_id, "backtrack");
    }

    false
}

/// Search for a complete, consistent assignment for the given puzzle. Node consistency and a full
/// AC-3 pass run first; if either wipes out a domain the search is never started.
pub fn find_fill(config: &GridConfig, options: &FillOptions) -> Result<FillSuccess, FillFailure> {
    let start = Instant::now();
    let mut statistics = Statistics::default();
    let mut domains = Domains::new(config);

    let unsatisfiable = |variable_id: VariableId| {
        let variable = *config.variable(variable_id);
        info!(?variable, "puzzle is unsatisfiable");
        FillFailure::Unsatisfiable { variable }
    };

    enforce_node_consistency(config, &mut domains).map_err(|failure| unsatisfiable(failure.variable_id))?;
    ac3(config, &mut domains, None).map_err(|failure| unsatisfiable(failure.variable_id))?;
    statistics.pruned = domains.removal_count();

    debug!(pruned = statistics.pruned, "initial propagation done");

    let mut assignment = Assignment::new(config.variable_count());
    let found = backtrack(config, &mut domains, options, &mut statistics, &mut assignment);
    statistics.duration = start.elapsed();

    if !found {
        info!(?statistics, "search exhausted");
        return Err(FillFailure::Exhausted);
    }

    if !assignment.is_complete() || !consistent(config, &assignment) {
        error!(?assignment, "search returned an invalid assignment");
        return Err(FillFailure::Exhausted);
    }

    info!(?statistics, "found fill");

    Ok(FillSuccess { assignment, statistics })
}

/// Solve with default options, discarding statistics and failure details.
pub fn solve(config: &GridConfig) -> Option<Assignment> {
    find_fill(config, &FillOptions::default()).ok().map(|success| success.assignment)
}
