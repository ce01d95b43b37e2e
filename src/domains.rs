use bit_set::BitSet;
use std::fmt::{Debug, Formatter};

use crate::grid_config::{GridConfig, VariableId, WordId};

/// The live candidate set for every variable. Propagation can only remove words; every removal is
/// recorded on a trail so that a search branch can undo the pruning it caused.
#[derive(Clone)]
pub struct Domains {
    /// Indexed by VariableId; each set holds WordIds.
    sets: Vec<BitSet>,

    /// Cached `sets[v].len()`, since `BitSet::len` walks every block.
    sizes: Vec<usize>,

    /// Every (variable, word) removal since construction, in order.
    trail: Vec<(VariableId, WordId)>,
}

impl Debug for Domains {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domains")
            .field("sizes", &self.sizes)
            .field("trail_len", &self.trail.len())
            .finish()
    }
}

impl Domains {
    /// Start every variable with the full corpus.
    pub fn new(config: &GridConfig) -> Domains {
        let word_count = config.words().len();
        let full: BitSet = (0..word_count).collect();

        Domains {
            sets: config.variables().iter().map(|_| full.clone()).collect(),
            sizes: config.variables().iter().map(|_| word_count).collect(),
            trail: vec![],
        }
    }

    pub fn len(&self, variable_id: VariableId) -> usize {
        self.sizes[variable_id]
    }

    pub fn is_empty(&self, variable_id: VariableId) -> bool {
        self.sizes[variable_id] == 0
    }

    pub fn contains(&self, variable_id: VariableId, word_id: WordId) -> bool {
        self.sets[variable_id].contains(word_id)
    }

    /// The words still available for a variable, in ascending WordId order.
    pub fn iter(&self, variable_id: VariableId) -> impl Iterator<Item = WordId> + '_ {
        self.sets[variable_id].iter()
    }

    /// The remaining word if exactly one is left.
    pub fn single(&self, variable_id: VariableId) -> Option<WordId> {
        if self.sizes[variable_id] == 1 {
            self.sets[variable_id].iter().next()
        } else {
            None
        }
    }

    /// Remove a word from a variable's domain. Returns whether it was present.
    pub fn remove(&mut self, variable_id: VariableId, word_id: WordId) -> bool {
        if self.sets[variable_id].remove(word_id) {
            self.sizes[variable_id] -= 1;
            self.trail.push((variable_id, word_id));
            true
        } else {
            false
        }
    }

    /// Remove every word for which `keep` returns false. Returns the number removed.
    pub fn retain<F>(&mut self, variable_id: VariableId, mut keep: F) -> usize
    where
        F: FnMut(WordId) -> bool,
    {
        let doomed: Vec<WordId> = self.sets[variable_id].iter().filter(|&word_id| !keep(word_id)).collect();
        for &word_id in &doomed {
            self.remove(variable_id, word_id);
        }
        doomed.len()
    }

    /// Narrow a variable's domain down to the single given word.
    pub fn restrict(&mut self, variable_id: VariableId, word_id: WordId) -> usize {
        self.retain(variable_id, |other| other == word_id)
    }

    /// A marker for the current state, to be passed to `rollback`.
    pub fn checkpoint(&self) -> usize {
        self.trail.len()
    }

    /// Restore every word removed since the given checkpoint.
    pub fn rollback(&mut self, checkpoint: usize) {
        while self.trail.len() > checkpoint {
            if let Some((variable_id, word_id)) = self.trail.pop() {
                self.sets[variable_id].insert(word_id);
                self.sizes[variable_id] += 1;
            }
        }
    }

    /// Total number of removals recorded so far.
    pub fn removal_count(&self) -> usize {
        self.trail.len()
    }
}
