use crate::grid_config::{GridConfig, Variable, VariableId, WordId};

/// A partial mapping from variables to chosen words, indexed by VariableId.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    words: Vec<Option<WordId>>,
    count: usize,
}

impl Assignment {
    /// An empty assignment over `variable_count` variables.
    pub fn new(variable_count: usize) -> Assignment {
        Assignment { words: vec![None; variable_count], count: 0 }
    }

    pub fn get(&self, variable_id: VariableId) -> Option<WordId> {
        self.words[variable_id]
    }

    pub fn contains(&self, variable_id: VariableId) -> bool {
        self.words[variable_id].is_some()
    }

    pub fn assign(&mut self, variable_id: VariableId, word_id: WordId) {
        if self.words[variable_id].replace(word_id).is_none() {
            self.count += 1;
        }
    }

    pub fn unassign(&mut self, variable_id: VariableId) -> Option<WordId> {
        let previous = self.words[variable_id].take();
        if previous.is_some() {
            self.count -= 1;
        }
        previous
    }

    /// Number of assigned variables.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Does every variable have a word?
    pub fn is_complete(&self) -> bool {
        self.count == self.words.len()
    }

    /// Assigned `(variable, word)` pairs in VariableId order.
    pub fn iter(&self) -> impl Iterator<Item = (VariableId, WordId)> + '_ {
        self.words
            .iter()
            .enumerate()
            .filter_map(|(variable_id, word_id)| word_id.map(|word_id| (variable_id, word_id)))
    }

    /// The word string assigned to a variable.
    pub fn word<'a>(&self, config: &'a GridConfig, variable_id: VariableId) -> Option<&'a str> {
        self.get(variable_id).map(|word_id| config.word(word_id).string.as_str())
    }

    /// Resolve ids into the variables and word strings they stand for.
    pub fn entries<'a>(&'a self, config: &'a GridConfig) -> impl Iterator<Item = (&'a Variable, &'a str)> + 'a {
        self.iter().map(move |(variable_id, word_id)| {
            (config.variable(variable_id), config.word(word_id).string.as_str())
        })
    }
}
