use smallvec::{smallvec, SmallVec};
use std::collections::{BTreeSet, HashMap};
use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::MAX_SLOT_LENGTH;

/// An identifier for a given variable, based on its index in the config's `variables` field. This
/// is also the index used by the domain store and by assignments.
pub type VariableId = usize;

/// An identifier for a given word, based on its index in the config's sorted `words` field.
pub type WordId = usize;

/// Zero-indexed row and column of a cell in the grid, where row 0 is the top row.
pub type GridCoord = (usize, usize);

/// Direction that a variable is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Across,
    Down,
}

/// One crossword slot. Two variables are equal iff all four attributes match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    pub i: usize,
    pub j: usize,
    pub length: usize,
    pub direction: Direction,
}

impl Variable {
    pub fn new(i: usize, j: usize, length: usize, direction: Direction) -> Variable {
        Variable { i, j, length, direction }
    }

    /// Generate the coords for each cell of this variable, in word order.
    pub fn cells(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.length).map(move |k| match self.direction {
            Direction::Across => (self.i, self.j + k),
            Direction::Down => (self.i + k, self.j),
        })
    }
}

/// A crossing between one variable and another: character `cell` of this variable's word must
/// equal character `other_cell` of the other variable's word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub other_variable_id: VariableId,
    pub cell: usize,
    pub other_cell: usize,
}

/// A word from the corpus.
#[derive(Debug, Clone)]
pub struct Word {
    pub string: String,
    pub glyphs: SmallVec<[char; MAX_SLOT_LENGTH]>,
}

impl Word {
    fn new(string: String) -> Word {
        let glyphs = string.chars().collect();
        Word { string, glyphs }
    }

    /// Length in characters, which is what a variable's length is compared against.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum PuzzleError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("structure contains no rows")]
    EmptyStructure,

    #[error("structure contains no slots of length 2 or more")]
    NoVariables,

    #[error("variable {0:?} has no cells")]
    EmptyVariable(Variable),

    #[error("variable {0:?} covers cells that are blocked or outside the grid")]
    VariableOutsideGrid(Variable),
}

/// The static description of a puzzle: grid geometry, variables, their crossings, and the word
/// corpus. Nothing in here changes while solving.
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
    structure: Vec<Vec<bool>>,
    variables: Vec<Variable>,
    crossings: Vec<SmallVec<[Crossing; MAX_SLOT_LENGTH]>>,
    words: Vec<Word>,
}

impl Debug for GridConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridConfig")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("variables", &self.variables)
            .field("crossings", &self.crossings)
            .field("words", &(["(", &self.words.len().to_string(), " entries)"].join("")))
            .finish()
    }
}

impl GridConfig {
    /// Build a config from an explicit open/blocked structure, a list of variables, and a word
    /// corpus. Words are trimmed and upper-cased; blanks and duplicates are dropped.
    pub fn new<I>(
        structure: Vec<Vec<bool>>,
        variables: Vec<Variable>,
        words: I,
    ) -> Result<GridConfig, PuzzleError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        if structure.is_empty() {
            return Err(PuzzleError::EmptyStructure);
        }
        if variables.is_empty() {
            return Err(PuzzleError::NoVariables);
        }

        let height = structure.len();
        let width = structure.iter().map(|row| row.len()).max().unwrap_or(0);

        for variable in &variables {
            if variable.length == 0 {
                return Err(PuzzleError::EmptyVariable(*variable));
            }
            let inside = variable.cells().all(|(row, col)| {
                structure.get(row).and_then(|cells| cells.get(col)).copied().unwrap_or(false)
            });
            if !inside {
                return Err(PuzzleError::VariableOutsideGrid(*variable));
            }
        }

        let corpus: BTreeSet<String> = words
            .into_iter()
            .map(|word| word.as_ref().trim().to_uppercase())
            .filter(|word| !word.is_empty())
            .collect();

        let crossings = build_crossings(&variables);

        debug!(
            width,
            height,
            variables = variables.len(),
            words = corpus.len(),
            "built grid config"
        );

        Ok(GridConfig {
            width,
            height,
            structure,
            variables,
            crossings,
            words: corpus.into_iter().map(Word::new).collect(),
        })
    }

    /// Build a config from a structure template, with `_` (or `.`) representing open cells and
    /// anything else representing blocks.
    pub fn from_template_string<I>(template: &str, words: I) -> Result<GridConfig, PuzzleError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let structure = parse_structure(template)?;
        let variables = extract_variables(&structure);
        GridConfig::new(structure, variables, words)
    }

    /// Build a config from a list of variables alone. The grid is the smallest one containing
    /// every variable, and its open cells are exactly the cells the variables cover.
    pub fn from_variables<I>(variables: Vec<Variable>, words: I) -> Result<GridConfig, PuzzleError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        if let Some(variable) = variables.iter().find(|variable| variable.length == 0) {
            return Err(PuzzleError::EmptyVariable(*variable));
        }

        let cells: Vec<GridCoord> = variables.iter().flat_map(|variable| variable.cells()).collect();
        let height = cells.iter().map(|&(row, _)| row + 1).max().unwrap_or(0);
        let width = cells.iter().map(|&(_, col)| col + 1).max().unwrap_or(0);

        let mut structure = vec![vec![false; width]; height];
        for (row, col) in cells {
            structure[row][col] = true;
        }

        GridConfig::new(structure, variables, words)
    }

    /// Load a structure file and a word-list file.
    pub fn from_files(
        structure_path: impl AsRef<Path>,
        words_path: impl AsRef<Path>,
    ) -> Result<GridConfig, PuzzleError> {
        let template = read_file(structure_path.as_ref())?;
        let words = read_file(words_path.as_ref())?;
        GridConfig::from_template_string(&template, words.lines())
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, variable_id: VariableId) -> &Variable {
        &self.variables[variable_id]
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Look up the id of a variable by value.
    pub fn variable_id(&self, variable: &Variable) -> Option<VariableId> {
        self.variables.iter().position(|other| other == variable)
    }

    pub fn crossings(&self, variable_id: VariableId) -> &[Crossing] {
        &self.crossings[variable_id]
    }

    /// Every variable sharing a cell with the given one.
    pub fn neighbors(&self, variable_id: VariableId) -> impl Iterator<Item = VariableId> + '_ {
        self.crossings[variable_id].iter().map(|crossing| crossing.other_variable_id)
    }

    pub fn degree(&self, variable_id: VariableId) -> usize {
        self.crossings[variable_id].len()
    }

    /// The `(index in x, index in y)` pair for the cell shared by `x` and `y`, or `None` if they
    /// don't cross.
    pub fn overlap(&self, x: VariableId, y: VariableId) -> Option<(usize, usize)> {
        self.crossings[x]
            .iter()
            .find(|crossing| crossing.other_variable_id == y)
            .map(|crossing| (crossing.cell, crossing.other_cell))
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn word(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }

    /// Look up a word id; the lookup is case-insensitive like corpus loading.
    pub fn word_id(&self, word: &str) -> Option<WordId> {
        let word = word.trim().to_uppercase();
        self.words.binary_search_by(|other| other.string.cmp(&word)).ok()
    }

    pub fn is_open(&self, row: usize, col: usize) -> bool {
        self.structure.get(row).and_then(|cells| cells.get(col)).copied().unwrap_or(false)
    }
}

fn read_file(path: &Path) -> Result<String, PuzzleError> {
    fs::read_to_string(path).map_err(|source| PuzzleError::Io { path: path.to_path_buf(), source })
}

/// Turn a structure template into rows of open (`true`) and blocked (`false`) cells. Rows are
/// padded with blocked cells up to the longest row.
pub fn parse_structure(template: &str) -> Result<Vec<Vec<bool>>, PuzzleError> {
    let mut rows: Vec<Vec<bool>> = template
        .lines()
        .map(|line| line.trim_end_matches('\r').chars().map(|c| c == '_' || c == '.').collect())
        .collect();

    while rows.last().map(|row: &Vec<bool>| row.is_empty()).unwrap_or(false) {
        rows.pop();
    }
    if rows.is_empty() {
        return Err(PuzzleError::EmptyStructure);
    }

    let width = rows.iter().map(|row| row.len()).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, false);
    }

    Ok(rows)
}

/// Find every run of two or more open cells. Cells are scanned row-major, and a cell starting
/// both an across and a down run yields the across variable first.
pub fn extract_variables(structure: &[Vec<bool>]) -> Vec<Variable> {
    let is_open = |row: usize, col: usize| {
        structure.get(row).and_then(|cells| cells.get(col)).copied().unwrap_or(false)
    };

    let mut variables = vec![];

    for (i, cells) in structure.iter().enumerate() {
        for j in 0..cells.len() {
            if !is_open(i, j) {
                continue;
            }

            if j == 0 || !is_open(i, j - 1) {
                let length = (j..cells.len()).take_while(|&col| is_open(i, col)).count();
                if length > 1 {
                    variables.push(Variable::new(i, j, length, Direction::Across));
                }
            }

            if i == 0 || !is_open(i - 1, j) {
                let length = (i..structure.len()).take_while(|&row| is_open(row, j)).count();
                if length > 1 {
                    variables.push(Variable::new(i, j, length, Direction::Down));
                }
            }
        }
    }

    variables
}

/// Compute the crossings for every variable. Each unordered pair gets at most one shared cell,
/// recorded symmetrically on both sides.
fn build_crossings(variables: &[Variable]) -> Vec<SmallVec<[Crossing; MAX_SLOT_LENGTH]>> {
    // (variable id, cell index within variable) for every variable touching a cell.
    let mut entries_by_cell: HashMap<GridCoord, SmallVec<[(VariableId, usize); 2]>> =
        HashMap::new();

    for (variable_id, variable) in variables.iter().enumerate() {
        for (cell_idx, cell) in variable.cells().enumerate() {
            entries_by_cell.entry(cell).or_insert_with(|| smallvec![]).push((variable_id, cell_idx));
        }
    }

    let mut crossings: Vec<SmallVec<[Crossing; MAX_SLOT_LENGTH]>> =
        variables.iter().map(|_| smallvec![]).collect();

    for (variable_id, variable) in variables.iter().enumerate() {
        for (cell_idx, cell) in variable.cells().enumerate() {
            for &(other_variable_id, other_cell_idx) in &entries_by_cell[&cell] {
                if other_variable_id <= variable_id {
                    continue;
                }
                let already_crossed = crossings[variable_id]
                    .iter()
                    .any(|crossing| crossing.other_variable_id == other_variable_id);
                if already_crossed {
                    continue;
                }

                crossings[variable_id].push(Crossing {
                    other_variable_id,
                    cell: cell_idx,
                    other_cell: other_cell_idx,
                });
                crossings[other_variable_id].push(Crossing {
                    other_variable_id: variable_id,
                    cell: other_cell_idx,
                    other_cell: cell_idx,
                });
            }
        }
    }

    for variable_crossings in &mut crossings {
        variable_crossings.sort_by_key(|crossing| (crossing.cell, crossing.other_variable_id));
    }

    crossings
}

#[cfg(test)]
mod tests {
    use crate::grid_config::{extract_variables, parse_structure, GridConfig, PuzzleError, Variable};
    use crate::Direction::{Across, Down};

    const STRUCTURE: &str = include_str!("../data/structure0.txt");
    const WORDS: &str = include_str!("../data/words0.txt");

    #[test]
    fn test_parse_structure_pads_short_rows() {
        let structure = parse_structure("#__\n_\n\n").unwrap();

        assert_eq!(structure, vec![vec![false, true, true], vec![true, false, false]]);
    }

    #[test]
    fn test_parse_structure_rejects_empty_template() {
        assert!(matches!(parse_structure("\n\n"), Err(PuzzleError::EmptyStructure)));
    }

    /// #___#
    /// #_##_
    /// #_##_
    /// #_##_
    /// #____
    #[test]
    fn test_extract_variables_in_scan_order() {
        let structure = parse_structure(STRUCTURE).unwrap();

        assert_eq!(
            extract_variables(&structure),
            vec![
                Variable::new(0, 1, 3, Across),
                Variable::new(0, 1, 5, Down),
                Variable::new(1, 4, 4, Down),
                Variable::new(4, 1, 4, Across),
            ]
        );
    }

    #[test]
    fn test_overlaps_from_geometry() {
        let config = GridConfig::from_template_string(STRUCTURE, WORDS.lines()).unwrap();

        assert_eq!(config.overlap(0, 1), Some((0, 0)));
        assert_eq!(config.overlap(1, 3), Some((4, 0)));
        assert_eq!(config.overlap(3, 1), Some((0, 4)));
        assert_eq!(config.overlap(2, 3), Some((3, 3)));
        assert_eq!(config.overlap(0, 2), None);
        assert_eq!(config.overlap(0, 3), None);

        assert_eq!(config.neighbors(1).collect::<Vec<_>>(), vec![0, 3]);
        assert_eq!(config.degree(2), 1);

        assert_eq!(config.variable_id(&Variable::new(1, 4, 4, Down)), Some(2));
        assert_eq!(config.variable_id(&Variable::new(1, 4, 4, Across)), None);
    }

    #[test]
    fn test_words_are_normalized_and_sorted() {
        let config = GridConfig::from_variables(
            vec![Variable::new(0, 0, 3, Across)],
            [" cat", "DOG", "", "Cat", "ace "],
        )
        .unwrap();

        let words: Vec<_> = config.words().iter().map(|word| word.string.as_str()).collect();
        assert_eq!(words, vec!["ACE", "CAT", "DOG"]);
        assert_eq!(config.word_id("dog"), Some(2));
        assert_eq!(config.word_id("EMU"), None);
    }

    #[test]
    fn test_from_variables_derives_structure() {
        let config = GridConfig::from_variables(
            vec![Variable::new(0, 0, 3, Across), Variable::new(0, 1, 3, Down)],
            ["CAT"],
        )
        .unwrap();

        assert_eq!((config.width, config.height), (3, 3));
        assert!(config.is_open(0, 2));
        assert!(config.is_open(2, 1));
        assert!(!config.is_open(1, 0));
        assert!(!config.is_open(5, 5));
        assert_eq!(config.overlap(0, 1), Some((1, 0)));
    }

    #[test]
    fn test_variable_must_fit_the_structure() {
        let result = GridConfig::new(
            vec![vec![true, true, false]],
            vec![Variable::new(0, 0, 3, Across)],
            ["CAT"],
        );

        assert!(matches!(result, Err(PuzzleError::VariableOutsideGrid(_))));
    }

    #[test]
    fn test_structure_without_slots_is_rejected() {
        let result = GridConfig::from_template_string("_#_\n###", ["CAT"]);

        assert!(matches!(result, Err(PuzzleError::NoVariables)));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = GridConfig::from_files("/nonexistent/structure.txt", "/nonexistent/words.txt")
            .unwrap_err();

        assert!(err.to_string().contains("/nonexistent/structure.txt"));
    }
}
