use crate::core::loader::{file_exists, parse_line};
use crate::core::transcode::{Transcoder, Utf8Transcoder};
use crate::core::trie::{self, TrieNode};
use crate::core::types::{CodePoint, DictEntry, EngineState, StoreIndex};
use crate::error::{Result, TrieError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, error, info};

/// Prefix-trie dictionary used by maximal-probability word segmentation.
///
/// The engine is built once and then read many times:
///
/// 1. [`init`](Self::init) creates an empty trie.
/// 2. [`insert`](Self::insert) or [`load_dictionary`](Self::load_dictionary)
///    populate it.
/// 3. [`normalize`](Self::normalize) assigns every entry its log-probability
///    weight and freezes the engine. `load_dictionary` does this itself.
///
/// All lookups take `&self` and the engine is `Send + Sync`, so a frozen
/// engine can be shared between threads without locking. Mutation needs
/// `&mut self`; callers must not dispose an engine other threads still read.
#[derive(Debug)]
pub struct TrieEngine {
    state: EngineState,
    root: Option<Box<TrieNode>>,
    entries: Vec<DictEntry>,
    total_count: u64,
    min_weight: f64,
}

impl Default for TrieEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieEngine {
    /// Creates an uninitialized engine. Call [`init`](Self::init) before use.
    pub fn new() -> Self {
        Self {
            state: EngineState::Uninitialized,
            root: None,
            entries: Vec::new(),
            total_count: 0,
            min_weight: f64::MAX,
        }
    }

    /// Initializes an engine and loads the dictionary at `path` into it.
    pub fn from_dictionary(path: impl AsRef<Path>) -> Result<Self> {
        let mut engine = Self::new();
        engine.init()?;
        engine.load_dictionary(path)?;
        Ok(engine)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn init(&mut self) -> Result<()> {
        if self.state != EngineState::Uninitialized {
            error!("trie engine already initialized");
            return Err(TrieError::AlreadyInitialized);
        }
        self.root = Some(Box::new(TrieNode::new()));
        self.state = EngineState::Building;
        Ok(())
    }

    /// Releases every node and entry and returns the engine to the
    /// uninitialized state. A later `init` yields a fresh, empty engine.
    pub fn dispose(&mut self) -> Result<()> {
        if self.state == EngineState::Uninitialized {
            error!("dispose called on an uninitialized trie engine");
            return Err(TrieError::NotInitialized);
        }
        let released = self.root.take().map_or(0, trie::release);
        let entries = self.entries.len();
        self.entries.clear();
        self.total_count = 0;
        self.min_weight = f64::MAX;
        self.state = EngineState::Uninitialized;
        debug!(released, entries, "trie engine disposed");
        Ok(())
    }

    /// Adds one word. Returns the store index assigned to it.
    ///
    /// A word that is already present is rejected with `DuplicateEntry`;
    /// callers wanting accumulated counts must aggregate before inserting.
    pub fn insert(&mut self, mut entry: DictEntry) -> Result<StoreIndex> {
        self.require_building("insert")?;
        if entry.word.is_empty() {
            return Err(TrieError::EmptyWord);
        }
        if entry.raw_count == 0 {
            error!(word = %entry.word_string(), "refusing zero-frequency entry");
            return Err(TrieError::ZeroFrequencyEntry(entry.word_string()));
        }

        let root = self.root.as_deref_mut().ok_or(TrieError::NotInitialized)?;
        let node = root.descend_or_create(&entry.word)?;
        if node.is_leaf() {
            error!(word = %entry.word_string(), "word already inserted");
            return Err(TrieError::DuplicateEntry(entry.word_string()));
        }

        self.entries
            .try_reserve(1)
            .map_err(|_| TrieError::AllocationFailure)?;
        let index = self.entries.len();
        entry.store_index = index;
        entry.weight = 0.0;
        node.mark_leaf(index);
        self.entries.push(entry);
        Ok(index)
    }

    /// Loads a `<word> <count> [<tag>]` dictionary file, then normalizes.
    ///
    /// The load is all-or-nothing: the first bad line or rejected insert
    /// aborts it. The engine is then partially populated and should be
    /// disposed rather than resumed.
    pub fn load_dictionary(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.load_dictionary_with(path, &Utf8Transcoder)
    }

    pub fn load_dictionary_with(
        &mut self,
        path: impl AsRef<Path>,
        transcoder: &dyn Transcoder,
    ) -> Result<()> {
        let path = path.as_ref();
        self.require_building("load_dictionary")?;
        if !file_exists(path) {
            error!(path = %path.display(), "dictionary file not found");
            return Err(TrieError::FileNotFound(path.display().to_string()));
        }
        let reader = BufReader::new(File::open(path)?);
        self.load_from_reader(reader, transcoder)?;
        info!(
            path = %path.display(),
            entries = self.entries.len(),
            total_count = self.total_count,
            min_weight = self.min_weight,
            "dictionary loaded"
        );
        Ok(())
    }

    /// Same as [`load_dictionary_with`](Self::load_dictionary_with) for any buffered reader.
    pub fn load_from_reader<R: BufRead>(
        &mut self,
        reader: R,
        transcoder: &dyn Transcoder,
    ) -> Result<()> {
        self.require_building("load_dictionary")?;
        for (idx, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let parsed = parse_line(line_no, &line, transcoder).map_err(|e| {
                error!(line = line_no, error = %e, "dictionary line rejected");
                e
            })?;
            if let Some(entry) = parsed {
                self.insert(entry).map_err(|e| {
                    error!(line = line_no, error = %e, "dictionary insert failed");
                    e
                })?;
            }
        }
        self.normalize()
    }

    /// Assigns `weight = ln(raw_count / total_count)` to every entry and
    /// freezes the engine. Runs exactly once per build.
    ///
    /// # Panics
    ///
    /// Panics if an entry with a zero count is found after a non-zero total was
    /// established; `insert` never admits one, so the store is corrupt.
    pub fn normalize(&mut self) -> Result<()> {
        match self.state {
            EngineState::Uninitialized => return Err(TrieError::NotInitialized),
            EngineState::Frozen => {
                error!("weights have already been normalized");
                return Err(TrieError::NormalizationAlreadyRun);
            }
            EngineState::Building => {}
        }
        if self.entries.is_empty() {
            error!("cannot normalize an empty dictionary");
            return Err(TrieError::EmptyDictionary);
        }
        if self.total_count != 0 {
            return Err(TrieError::NormalizationAlreadyRun);
        }

        let total = total_count(&self.entries).map_err(|e| {
            error!("dictionary total frequency overflows");
            e
        })?;
        if total == 0 {
            error!("dictionary total frequency is zero");
            return Err(TrieError::EmptyDictionary);
        }

        let mut min_weight = f64::MAX;
        for entry in &mut self.entries {
            if entry.raw_count == 0 {
                let err = TrieError::ZeroFrequencyEntry(entry.word_string());
                error!(error = %err, "entry store is corrupt");
                panic!("{}", err);
            }
            entry.weight = (entry.raw_count as f64 / total as f64).ln();
            min_weight = min_weight.min(entry.weight);
        }

        self.total_count = total;
        self.min_weight = min_weight;
        self.state = EngineState::Frozen;
        debug!(total, min_weight, "weights normalized");
        Ok(())
    }

    /// Exact match of the whole sequence. Empty input never matches.
    pub fn find(&self, word: &[CodePoint]) -> Option<&DictEntry> {
        if word.is_empty() {
            return None;
        }
        let node = self.readable_root("find")?.descend(word)?;
        node.store_index().map(|index| self.resolve(index))
    }

    /// The longest dictionary word that is a prefix of `input`.
    ///
    /// If `input` is itself a dictionary word, that word is returned.
    pub fn find_prefix(&self, input: &[CodePoint]) -> Option<&DictEntry> {
        let mut node = self.readable_root("find_prefix")?;
        let mut best = None;
        for &cp in input {
            if node.is_leaf() {
                best = node.store_index();
            }
            match node.child(cp) {
                Some(next) => node = next,
                None => break,
            }
        }
        // The node the walk stopped on has not been checked when the whole
        // input was consumed.
        if node.is_leaf() {
            best = node.store_index();
        }
        best.map(|index| self.resolve(index))
    }

    /// Every dictionary word that is a prefix of `input`, shortest first.
    ///
    /// Each match is `(end, entry)` where `end` is the 0-based position of the
    /// last code point of the word within `input`.
    pub fn find_all_prefixes(&self, input: &[CodePoint]) -> Vec<(usize, &DictEntry)> {
        let mut matches = Vec::new();
        let Some(mut node) = self.readable_root("find_all_prefixes") else {
            return matches;
        };
        for (pos, &cp) in input.iter().enumerate() {
            match node.child(cp) {
                Some(next) => node = next,
                None => break,
            }
            if let Some(index) = node.store_index() {
                matches.push((pos, self.resolve(index)));
            }
        }
        matches
    }

    /// Weight of the exact match, or the minimum weight for empty and
    /// out-of-vocabulary input.
    pub fn get_weight(&self, word: &[CodePoint]) -> f64 {
        self.find(word).map_or(self.min_weight, |entry| entry.weight)
    }

    pub fn find_str(&self, word: &str) -> Option<&DictEntry> {
        self.find(&to_code_points(word))
    }

    pub fn find_prefix_str(&self, input: &str) -> Option<&DictEntry> {
        self.find_prefix(&to_code_points(input))
    }

    pub fn find_all_prefixes_str(&self, input: &str) -> Vec<(usize, &DictEntry)> {
        self.find_all_prefixes(&to_code_points(input))
    }

    pub fn get_weight_str(&self, word: &str) -> f64 {
        self.get_weight(&to_code_points(word))
    }

    /// Smallest weight in the dictionary; `f64::MAX` until normalized.
    pub fn get_min_weight(&self) -> f64 {
        self.min_weight
    }

    /// Sum of all raw counts; zero until normalized.
    pub fn get_total_count(&self) -> u64 {
        self.total_count
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &DictEntry> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of trie nodes, root included. Zero when uninitialized.
    pub fn node_count(&self) -> usize {
        self.root.as_deref().map_or(0, TrieNode::subtree_size)
    }

    /// Rebuilds a frozen engine from entries whose weights are already known.
    pub(crate) fn restore(
        entries: Vec<DictEntry>,
        total_count: u64,
        min_weight: f64,
    ) -> Result<Self> {
        let mut engine = Self::new();
        engine.init()?;
        for entry in entries {
            let weight = entry.weight;
            let index = engine.insert(entry)?;
            engine.entries[index].weight = weight;
        }
        if engine.entries.is_empty() {
            return Err(TrieError::EmptyDictionary);
        }
        engine.total_count = total_count;
        engine.min_weight = min_weight;
        engine.state = EngineState::Frozen;
        Ok(engine)
    }

    fn require_building(&self, op: &'static str) -> Result<()> {
        match self.state {
            EngineState::Building => Ok(()),
            EngineState::Uninitialized => {
                error!(op, "trie engine not initialized");
                Err(TrieError::NotInitialized)
            }
            state => {
                error!(op, state = state.as_str(), "trie engine is read-only");
                Err(TrieError::InvalidState {
                    op,
                    state: state.as_str(),
                })
            }
        }
    }

    fn readable_root(&self, op: &'static str) -> Option<&TrieNode> {
        match self.root.as_deref() {
            Some(root) if self.state != EngineState::Uninitialized => Some(root),
            _ => {
                error!(op, "trie engine not initialized");
                None
            }
        }
    }

    /// Resolves a node's back-reference into the entry store.
    ///
    /// # Panics
    ///
    /// Panics if the index is outside the store: the trie and the store have
    /// diverged and no returned weight could be trusted.
    fn resolve(&self, index: StoreIndex) -> &DictEntry {
        match self.entries.get(index) {
            Some(entry) => entry,
            None => {
                let err = TrieError::StoreIndexOutOfRange {
                    index,
                    len: self.entries.len(),
                };
                error!(error = %err, "trie node points outside the entry store");
                panic!("{}", err);
            }
        }
    }
}

/// Sum of raw counts, failing instead of wrapping when it does not fit in a `u64`.
pub(crate) fn total_count(entries: &[DictEntry]) -> Result<u64> {
    entries
        .iter()
        .try_fold(0u64, |acc, e| acc.checked_add(e.raw_count))
        .ok_or(TrieError::CountOverflow)
}

fn to_code_points(text: &str) -> Vec<CodePoint> {
    text.chars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cps(s: &str) -> Vec<CodePoint> {
        s.chars().collect()
    }

    fn building() -> TrieEngine {
        let mut engine = TrieEngine::new();
        engine.init().unwrap();
        engine
    }

    fn sample() -> TrieEngine {
        let mut engine = building();
        engine.insert(DictEntry::from_text("A", 3, Some("x"))).unwrap();
        engine.insert(DictEntry::from_text("AB", 2, Some("y"))).unwrap();
        engine.insert(DictEntry::from_text("C", 5, Some("z"))).unwrap();
        engine.normalize().unwrap();
        engine
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn lifecycle_transitions() {
        let mut engine = TrieEngine::new();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(matches!(engine.dispose(), Err(TrieError::NotInitialized)));

        engine.init().unwrap();
        assert_eq!(engine.state(), EngineState::Building);
        assert!(matches!(engine.init(), Err(TrieError::AlreadyInitialized)));

        engine.insert(DictEntry::from_text("A", 1, None)).unwrap();
        engine.normalize().unwrap();
        assert_eq!(engine.state(), EngineState::Frozen);

        engine.dispose().unwrap();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert_eq!(engine.node_count(), 0);
        assert!(matches!(engine.dispose(), Err(TrieError::NotInitialized)));

        engine.init().unwrap();
        assert!(engine.is_empty());
        assert_eq!(engine.get_total_count(), 0);
        assert_eq!(engine.node_count(), 1);
        assert!(engine.find_str("A").is_none());
    }

    #[test]
    fn insert_requires_init() {
        let mut engine = TrieEngine::new();
        let err = engine.insert(DictEntry::from_text("A", 1, None)).unwrap_err();
        assert!(matches!(err, TrieError::NotInitialized));
    }

    #[test]
    fn insert_after_freeze_is_rejected() {
        let mut engine = sample();
        let err = engine.insert(DictEntry::from_text("D", 1, None)).unwrap_err();
        assert!(matches!(err, TrieError::InvalidState { op: "insert", .. }));
        assert_eq!(engine.len(), 3);
    }

    #[test]
    fn duplicate_insert_keeps_first_entry() {
        let mut engine = building();
        engine.insert(DictEntry::from_text("AB", 2, Some("y"))).unwrap();
        let err = engine.insert(DictEntry::from_text("AB", 9, Some("q"))).unwrap_err();
        assert!(matches!(err, TrieError::DuplicateEntry(ref w) if w == "AB"));
        assert_eq!(engine.len(), 1);
        let entry = engine.find_str("AB").unwrap();
        assert_eq!(entry.raw_count, 2);
        assert_eq!(entry.tag.as_deref(), Some("y"));
    }

    #[test]
    fn zero_count_and_empty_word_are_rejected() {
        let mut engine = building();
        assert!(matches!(
            engine.insert(DictEntry::from_text("A", 0, None)),
            Err(TrieError::ZeroFrequencyEntry(_))
        ));
        assert!(matches!(
            engine.insert(DictEntry::from_text("", 4, None)),
            Err(TrieError::EmptyWord)
        ));
        assert!(engine.is_empty());
    }

    #[test]
    fn inserted_entries_round_trip_through_find() {
        let mut engine = building();
        let words = [("中", 10, Some("n")), ("中国", 7, Some("ns")), ("国", 4, None)];
        for (word, count, tag) in words {
            engine.insert(DictEntry::from_text(word, count, tag)).unwrap();
        }
        for (i, (word, count, tag)) in words.iter().enumerate() {
            let entry = engine.find_str(word).unwrap();
            assert_eq!(entry.word_string(), *word);
            assert_eq!(entry.raw_count, *count);
            assert_eq!(entry.tag.as_deref(), *tag);
            assert_eq!(entry.store_index, i);
        }
    }

    #[test]
    fn normalization_weights() {
        let engine = sample();
        assert_eq!(engine.get_total_count(), 10);
        assert!(close(engine.find_str("A").unwrap().weight, 0.3f64.ln()));
        assert!(close(engine.find_str("AB").unwrap().weight, 0.2f64.ln()));
        assert!(close(engine.find_str("C").unwrap().weight, 0.5f64.ln()));
        assert!(close(engine.get_min_weight(), 0.2f64.ln()));

        let min = engine.entries().map(|e| e.weight).fold(f64::MAX, f64::min);
        assert_eq!(min, engine.get_min_weight());
        let sum: u64 = engine.entries().map(|e| e.raw_count).sum();
        assert_eq!(sum, engine.get_total_count());
    }

    #[test]
    fn normalization_runs_once() {
        let mut engine = sample();
        assert!(matches!(
            engine.normalize(),
            Err(TrieError::NormalizationAlreadyRun)
        ));
    }

    #[test]
    fn normalizing_empty_store_fails() {
        let mut engine = building();
        assert!(matches!(engine.normalize(), Err(TrieError::EmptyDictionary)));
        assert_eq!(engine.state(), EngineState::Building);

        let mut engine = TrieEngine::new();
        assert!(matches!(engine.normalize(), Err(TrieError::NotInitialized)));
    }

    #[test]
    fn overflowing_total_is_rejected() {
        let mut engine = building();
        engine
            .insert(DictEntry::from_text("A", u64::MAX, Some("x")))
            .unwrap();
        engine.insert(DictEntry::from_text("B", 1, Some("y"))).unwrap();
        assert!(matches!(engine.normalize(), Err(TrieError::CountOverflow)));
        assert_eq!(engine.state(), EngineState::Building);
        assert_eq!(engine.get_total_count(), 0);
    }

    #[test]
    fn largest_single_count_normalizes() {
        let mut engine = building();
        engine
            .insert(DictEntry::from_text("A", u64::MAX, None))
            .unwrap();
        engine.normalize().unwrap();
        assert_eq!(engine.get_total_count(), u64::MAX);
        assert_eq!(engine.get_weight_str("A"), 0.0);
    }

    #[test]
    #[should_panic(expected = "zero frequency")]
    fn zero_count_in_store_is_fatal() {
        let mut engine = building();
        engine.insert(DictEntry::from_text("A", 3, None)).unwrap();
        engine.insert(DictEntry::from_text("B", 1, None)).unwrap();
        engine.entries[1].raw_count = 0;
        let _ = engine.normalize();
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn dangling_store_index_is_fatal() {
        let mut engine = sample();
        engine.entries.truncate(1);
        let _ = engine.find_str("C");
    }

    #[test]
    fn find_requires_whole_word() {
        let engine = sample();
        assert!(engine.find(&[]).is_none());
        assert!(engine.find_str("ABC").is_none());
        assert!(engine.find_str("B").is_none());
        assert_eq!(engine.find_str("AB").unwrap().word_string(), "AB");
    }

    #[test]
    fn find_on_internal_node_is_no_match() {
        let mut engine = building();
        engine.insert(DictEntry::from_text("ABC", 1, None)).unwrap();
        assert!(engine.find_str("AB").is_none());
        assert!(engine.find_prefix_str("AB").is_none());
    }

    #[test]
    fn longest_prefix_includes_whole_input() {
        let engine = sample();
        assert_eq!(engine.find_prefix_str("AB").unwrap().word_string(), "AB");
        assert_eq!(engine.find_prefix_str("A").unwrap().word_string(), "A");
        assert_eq!(engine.find_prefix_str("ABZ").unwrap().word_string(), "AB");
        assert_eq!(engine.find_prefix_str("AZ").unwrap().word_string(), "A");
        assert_eq!(engine.find_prefix_str("CAB").unwrap().word_string(), "C");
        assert!(engine.find_prefix_str("ZA").is_none());
        assert!(engine.find_prefix(&[]).is_none());
    }

    #[test]
    fn longest_prefix_skips_gap_nodes() {
        let mut engine = building();
        engine.insert(DictEntry::from_text("A", 1, None)).unwrap();
        engine.insert(DictEntry::from_text("ABCD", 1, None)).unwrap();
        assert_eq!(engine.find_prefix_str("ABC").unwrap().word_string(), "A");
        assert_eq!(engine.find_prefix_str("ABCDE").unwrap().word_string(), "ABCD");
    }

    #[test]
    fn all_prefixes_in_end_order() {
        let engine = sample();
        let found: Vec<(usize, String)> = engine
            .find_all_prefixes_str("AB")
            .into_iter()
            .map(|(pos, e)| (pos, e.word_string()))
            .collect();
        assert_eq!(found, vec![(0, "A".to_string()), (1, "AB".to_string())]);

        assert!(engine.find_all_prefixes_str("ZAB").is_empty());
        assert!(engine.find_all_prefixes(&[]).is_empty());
        assert_eq!(engine.find_all_prefixes_str("ABAB").len(), 2);
    }

    #[test]
    fn weight_falls_back_to_minimum() {
        let engine = sample();
        assert!(close(engine.get_weight_str("C"), 0.5f64.ln()));
        assert_eq!(engine.get_weight_str("Z"), engine.get_min_weight());
        assert_eq!(engine.get_weight(&[]), engine.get_min_weight());
        assert_eq!(engine.get_weight(&cps("ABC")), engine.get_min_weight());
    }

    #[test]
    fn lookups_on_uninitialized_engine_find_nothing() {
        let engine = TrieEngine::new();
        assert!(engine.find_str("A").is_none());
        assert!(engine.find_prefix_str("A").is_none());
        assert!(engine.find_all_prefixes_str("A").is_empty());
        assert_eq!(engine.get_weight_str("A"), f64::MAX);
    }

    #[test]
    fn restore_keeps_weights() {
        let engine = sample();
        let entries: Vec<DictEntry> = engine.entries().cloned().collect();
        let restored =
            TrieEngine::restore(entries, engine.get_total_count(), engine.get_min_weight())
                .unwrap();
        assert_eq!(restored.state(), EngineState::Frozen);
        assert_eq!(restored.get_weight_str("AB"), engine.get_weight_str("AB"));
        assert_eq!(restored.node_count(), engine.node_count());
    }
}
