//! Node consistency and AC-3 arc consistency over a `Domains` store.
//!
//! A variable is node-consistent when every word left in its domain has the variable's length. An
//! arc `(x, y)` is consistent when every word left for `x` agrees with at least one word left for
//! `y` at their shared cell. Both passes only ever remove words.

use bit_set::BitSet;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

use crate::domains::Domains;
use crate::grid_config::{GridConfig, VariableId};

/// An ordered pair of crossing variables `(x, y)`: revising it prunes `x` against `y`.
pub type Arc = (VariableId, VariableId);

/// Counters from a successful propagation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArcConsistencySuccess {
    pub revisions: usize,
    pub eliminations: usize,
}

/// Propagation emptied the domain of the given variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcConsistencyFailure {
    pub variable_id: VariableId,
}

pub type ArcConsistencyResult = Result<ArcConsistencySuccess, ArcConsistencyFailure>;

/// Remove every word whose length differs from its variable's length. All variables are filtered
/// even if an earlier one ends up empty; the first emptied variable is reported.
pub fn enforce_node_consistency(config: &GridConfig, domains: &mut Domains) -> ArcConsistencyResult {
    let mut eliminations = 0;
    let mut wiped_out: Option<VariableId> = None;

    for (variable_id, variable) in config.variables().iter().enumerate() {
        eliminations += domains.retain(variable_id, |word_id| {
            config.word(word_id).len() == variable.length
        });

        if wiped_out.is_none() && domains.is_empty(variable_id) {
            wiped_out = Some(variable_id);
        }
    }

    debug!(eliminations, "node consistency");

    match wiped_out {
        Some(variable_id) => Err(ArcConsistencyFailure { variable_id }),
        None => Ok(ArcConsistencySuccess { revisions: config.variable_count(), eliminations }),
    }
}

/// Make `x` arc-consistent with `y`, removing every word for `x` with no supporting word for `y`
/// at their shared cell. Returns whether anything was removed. Variables that don't cross are
/// left alone.
pub fn revise(config: &GridConfig, domains: &mut Domains, x: VariableId, y: VariableId) -> bool {
    let Some((x_cell, y_cell)) = config.overlap(x, y) else {
        return false;
    };

    // Which letters does `y` still allow in the shared cell?
    let supported: HashSet<char> = domains
        .iter(y)
        .filter_map(|word_id| config.word(word_id).glyphs.get(y_cell).copied())
        .collect();

    let removed = domains.retain(x, |word_id| {
        config.word(word_id).glyphs.get(x_cell).map_or(false, |glyph| supported.contains(glyph))
    });

    removed > 0
}

/// Work queue of arcs, ignoring arcs that are already waiting.
struct ArcQueue {
    queue: VecDeque<Arc>,
    queued: BitSet,
    variable_count: usize,
}

impl ArcQueue {
    fn new(variable_count: usize) -> ArcQueue {
        ArcQueue {
            queue: VecDeque::new(),
            queued: BitSet::with_capacity(variable_count * variable_count),
            variable_count,
        }
    }

    fn enqueue(&mut self, (x, y): Arc) {
        if self.queued.insert(x * self.variable_count + y) {
            self.queue.push_back((x, y));
        }
    }

    fn pop_front(&mut self) -> Option<Arc> {
        let arc = self.queue.pop_front()?;
        self.queued.remove(arc.0 * self.variable_count + arc.1);
        Some(arc)
    }
}

/// Run AC-3. If `arcs` is `None`, start from every arc in the puzzle; otherwise start from exactly
/// the given arcs. Fails as soon as any domain becomes empty.
pub fn ac3(config: &GridConfig, domains: &mut Domains, arcs: Option<Vec<Arc>>) -> ArcConsistencyResult {
    let mut queue = ArcQueue::new(config.variable_count());

    match arcs {
        Some(arcs) => {
            for arc in arcs {
                queue.enqueue(arc);
            }
        }
        None => {
            for variable_id in 0..config.variable_count() {
                for neighbor_id in config.neighbors(variable_id) {
                    queue.enqueue((variable_id, neighbor_id));
                }
            }
        }
    }

    let mut success = ArcConsistencySuccess::default();

    while let Some((x, y)) = queue.pop_front() {
        success.revisions += 1;
        let before = domains.len(x);

        if revise(config, domains, x, y) {
            success.eliminations += before - domains.len(x);

            if domains.is_empty(x) {
                debug!(variable_id = x, revisions = success.revisions, "arc consistency wiped out a domain");
                return Err(ArcConsistencyFailure { variable_id: x });
            }

            // Shrinking `x` may have removed the only support for words in its other neighbors.
            for z in config.neighbors(x) {
                if z != y {
                    queue.enqueue((z, x));
                }
            }
        }
    }

    debug!(revisions = success.revisions, eliminations = success.eliminations, "arc consistency");

    Ok(success)
}

#[cfg(test)]
mod tests {
    use crate::arc_consistency::{ac3, enforce_node_consistency, revise, ArcConsistencyFailure};
    use crate::domains::Domains;
    use crate::grid_config::{GridConfig, Variable};
    use crate::Direction::{Across, Down};

    const STRUCTURE: &str = include_str!("../data/structure0.txt");
    const WORDS: &str = include_str!("../data/words0.txt");

    fn words_for(config: &GridConfig, domains: &Domains, variable_id: usize) -> Vec<String> {
        domains.iter(variable_id).map(|word_id| config.word(word_id).string.clone()).collect()
    }

    fn assert_arc_consistent(config: &GridConfig, domains: &Domains) {
        for x in 0..config.variable_count() {
            for y in config.neighbors(x) {
                let (x_cell, y_cell) = config.overlap(x, y).unwrap();
                for word_id in domains.iter(x) {
                    let glyph = config.word(word_id).glyphs[x_cell];
                    assert!(
                        domains.iter(y).any(|other| config.word(other).glyphs[y_cell] == glyph),
                        "{} has no support in variable {}",
                        config.word(word_id).string,
                        y
                    );
                }
            }
        }
    }

    #[test]
    fn test_node_consistency_filters_by_length() {
        let config = GridConfig::from_template_string(STRUCTURE, WORDS.lines()).unwrap();
        let mut domains = Domains::new(&config);

        let result = enforce_node_consistency(&config, &mut domains).unwrap();

        for (variable_id, variable) in config.variables().iter().enumerate() {
            assert!(domains.iter(variable_id).all(|word_id| config.word(word_id).len() == variable.length));
        }
        assert_eq!(words_for(&config, &domains, 0), vec!["ONE", "SIX", "TEN", "TWO"]);
        assert_eq!(words_for(&config, &domains, 1), vec!["EIGHT", "SEVEN", "THREE"]);
        assert_eq!(result.eliminations, 6 + 7 + 7 + 7);
    }

    #[test]
    fn test_node_consistency_reports_wiped_out_variable() {
        let config = GridConfig::from_variables(
            vec![Variable::new(0, 0, 3, Across), Variable::new(2, 0, 4, Across)],
            ["CAT", "DOG"],
        )
        .unwrap();
        let mut domains = Domains::new(&config);

        assert_eq!(
            enforce_node_consistency(&config, &mut domains),
            Err(ArcConsistencyFailure { variable_id: 1 })
        );
        assert_eq!(domains.len(0), 2, "other variables are still filtered");
    }

    #[test]
    fn test_revise_without_overlap_is_a_no_op() {
        let config = GridConfig::from_variables(
            vec![Variable::new(0, 0, 3, Across), Variable::new(2, 0, 3, Across)],
            ["CAT", "DOG"],
        )
        .unwrap();
        let mut domains = Domains::new(&config);
        domains.remove(1, 0);

        assert!(!revise(&config, &mut domains, 0, 1));
        assert_eq!(domains.len(0), 2);
    }

    #[test]
    fn test_revise_removes_unsupported_words() {
        // x[1] must equal y[0].
        let config = GridConfig::from_variables(
            vec![Variable::new(0, 0, 3, Across), Variable::new(0, 1, 3, Down)],
            ["ACE", "CAT", "DOG"],
        )
        .unwrap();
        let mut domains = Domains::new(&config);

        assert!(revise(&config, &mut domains, 0, 1));
        assert_eq!(words_for(&config, &domains, 0), vec!["ACE", "CAT"]);
        assert!(!revise(&config, &mut domains, 0, 1));

        assert!(revise(&config, &mut domains, 1, 0));
        assert_eq!(words_for(&config, &domains, 1), vec!["ACE", "CAT"]);
    }

    #[test]
    fn test_ac3_reaches_fixed_point() {
        let config = GridConfig::from_template_string(STRUCTURE, WORDS.lines()).unwrap();
        let mut domains = Domains::new(&config);
        enforce_node_consistency(&config, &mut domains).unwrap();

        let before = domains.clone();
        ac3(&config, &mut domains, None).unwrap();

        assert_arc_consistent(&config, &domains);
        for variable_id in 0..config.variable_count() {
            assert!(domains.iter(variable_id).all(|word_id| before.contains(variable_id, word_id)));
        }

        assert_eq!(words_for(&config, &domains, 0), vec!["SIX"]);
        assert_eq!(words_for(&config, &domains, 1), vec!["SEVEN"]);
        assert_eq!(words_for(&config, &domains, 2), vec!["FIVE", "NINE"]);
        assert_eq!(words_for(&config, &domains, 3), vec!["NINE"]);

        let rerun = ac3(&config, &mut domains, None).unwrap();
        assert_eq!(rerun.eliminations, 0);
    }

    #[test]
    fn test_ac3_with_explicit_arcs_only_starts_from_those_arcs() {
        let config = GridConfig::from_template_string(STRUCTURE, WORDS.lines()).unwrap();
        let mut domains = Domains::new(&config);
        enforce_node_consistency(&config, &mut domains).unwrap();

        let result = ac3(&config, &mut domains, Some(vec![])).unwrap();
        assert_eq!(result.revisions, 0);
        assert_eq!(domains.len(1), 3);

        // Pruning 0 against 1 drops ONE, which then requeues nothing since 1 is 0's only neighbor.
        let result = ac3(&config, &mut domains, Some(vec![(0, 1)])).unwrap();
        assert_eq!(result.revisions, 1);
        assert_eq!(words_for(&config, &domains, 0), vec!["SIX", "TEN", "TWO"]);
        assert_eq!(domains.len(1), 3);
    }

    #[test]
    fn test_ac3_detects_wipeout() {
        let config = GridConfig::from_variables(
            vec![Variable::new(0, 0, 3, Across), Variable::new(0, 1, 3, Down)],
            ["CAT", "DOG"],
        )
        .unwrap();
        let mut domains = Domains::new(&config);

        assert!(ac3(&config, &mut domains, None).is_err());
    }
}
