// --- File: src/core/trie.rs
use crate::core::types::{CodePoint, StoreIndex};
use crate::error::{Result, TrieError};
use std::collections::HashMap;

/// One node of the dictionary trie.
///
/// Every node exclusively owns its children, so the structure is a plain tree:
/// no cycles, no shared subtrees. A node that terminates a word carries the
/// index of that word's entry in the engine's store; it may still have children
/// when the word is a prefix of a longer one.
#[derive(Debug, Default)]
pub struct TrieNode {
    children: HashMap<CodePoint, Box<TrieNode>>,
    entry: Option<StoreIndex>,
}

impl TrieNode {
    pub fn new() -> Self {
        Self {
            children: HashMap::new(),
            entry: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.entry.is_some()
    }

    /// Store index of the word ending here, if any.
    pub fn store_index(&self) -> Option<StoreIndex> {
        self.entry
    }

    pub(crate) fn mark_leaf(&mut self, index: StoreIndex) {
        self.entry = Some(index);
    }

    pub fn child(&self, cp: CodePoint) -> Option<&TrieNode> {
        self.children.get(&cp).map(Box::as_ref)
    }

    /// Follows `word` from this node, creating missing nodes on the way.
    /// O(k) where k is the word length.
    ///
    /// If growing a child map fails, the nodes created so far stay in place.
    /// They carry no leaf marker, so the trie remains valid.
    pub fn descend_or_create(&mut self, word: &[CodePoint]) -> Result<&mut TrieNode> {
        let mut node = self;
        for &cp in word {
            if !node.children.contains_key(&cp) {
                node.children
                    .try_reserve(1)
                    .map_err(|_| TrieError::AllocationFailure)?;
            }
            let next: &mut TrieNode = node
                .children
                .entry(cp)
                .or_insert_with(|| Box::new(TrieNode::new()));
            node = next;
        }
        Ok(node)
    }

    /// Follows `word` from this node without creating anything.
    pub fn descend(&self, word: &[CodePoint]) -> Option<&TrieNode> {
        word.iter().try_fold(self, |node, &cp| node.child(cp))
    }

    /// Number of nodes in this subtree, this node included.
    pub fn subtree_size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.values().map(Box::as_ref));
        }
        count
    }
}

// Words can be long enough that the default recursive drop of nested boxes
// would exhaust the stack, so children are unlinked onto a heap stack first.
impl Drop for TrieNode {
    fn drop(&mut self) {
        let mut stack: Vec<Box<TrieNode>> = self.children.drain().map(|(_, c)| c).collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.children.drain().map(|(_, c)| c));
        }
    }
}

struct Frame {
    node: Box<TrieNode>,
    pending: Vec<Box<TrieNode>>,
}

impl Frame {
    fn open(mut node: Box<TrieNode>) -> Self {
        let pending = node.children.drain().map(|(_, c)| c).collect();
        Self { node, pending }
    }
}

/// Frees a whole tree depth-first, children before parents, `root` last.
/// Returns the number of nodes released.
pub fn release(root: Box<TrieNode>) -> usize {
    let mut released = 0;
    let mut stack = vec![Frame::open(root)];
    while let Some(frame) = stack.last_mut() {
        let next = frame.pending.pop();
        match next {
            Some(child) => stack.push(Frame::open(child)),
            None => {
                if let Some(done) = stack.pop() {
                    debug_assert!(done.node.children.is_empty());
                    drop(done.node);
                    released += 1;
                }
            }
        }
    }
    released
}
