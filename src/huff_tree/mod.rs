/*! Huffman coding over 8-bit pixel intensities.

Huffman's algorithm by itself leaves the shape of the tree underdetermined
whenever two candidate subtrees carry the same weight. Here every node gets a
sequence number: leaves are numbered in ascending symbol order, and each
merged node takes the next free number. The priority queue orders by
(frequency, sequence), and the first node popped becomes the left child.
Building twice from the same table therefore always yields the same tree,
which is what lets a decoder rebuild it from a stored frequency table.
*/

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use bit_vec::BitVec;
use log::debug;
use serde::Serialize;
use thiserror::Error;

/// One pixel intensity
pub type Symbol = u8;

/// A prefix code, most significant (first transmitted) bit first
pub type Code = BitVec;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HuffTreeError {
  #[error("Cannot build a Huffman tree from an empty frequency table")]
  EmptyAlphabet,
}

/// Occurrence counts per symbol. Symbols that never occur are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrequencyTable {
  counts: BTreeMap<Symbol, usize>,
}

impl FrequencyTable {
  /// Get the frequencies of the symbols in the given input
  pub fn count(symbols: &[Symbol]) -> Self {
    let mut counts = BTreeMap::new();
    for sym in symbols.iter() {
      *counts.entry(*sym).or_insert(0) += 1;
    }
    Self { counts }
  }

  /// Assemble a table from (symbol, count) pairs. Repeated symbols accumulate
  /// and zero counts are dropped.
  pub fn from_counts<I>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (Symbol, usize)>,
  {
    let mut counts = BTreeMap::new();
    for (sym, ct) in pairs.into_iter().filter(|(_, ct)| *ct > 0) {
      *counts.entry(sym).or_insert(0) += ct;
    }
    Self { counts }
  }

  pub fn get(&self, sym: Symbol) -> usize {
    self.counts.get(&sym).copied().unwrap_or(0)
  }

  /// Number of distinct symbols
  pub fn len(&self) -> usize {
    self.counts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.counts.is_empty()
  }

  /// Total number of symbols observed
  pub fn total(&self) -> usize {
    self.counts.values().sum()
  }

  /// Iterate (symbol, count) pairs in ascending symbol order
  pub fn iter(&self) -> impl Iterator<Item = (Symbol, usize)> + '_ {
    self.counts.iter().map(|(sym, ct)| (*sym, *ct))
  }

  /// Shannon entropy of the distribution, in bits per symbol
  pub fn entropy(&self) -> f64 {
    let total = self.total() as f64;
    if total == 0.0 {
      return 0.0;
    }
    self
      .counts
      .values()
      .map(|ct| {
        let p = *ct as f64 / total;
        -p * p.log2()
      })
      .sum()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
  Leaf {
    sym: Symbol,
    freq: usize,
  },
  Internal {
    freq: usize,
    left: Box<Node>,
    right: Box<Node>,
  },
}

impl Node {
  fn freq(&self) -> usize {
    match self {
      Node::Leaf { freq, .. } | Node::Internal { freq, .. } => *freq,
    }
  }
}

/// A subtree waiting in the priority queue
struct Pending {
  seq: usize,
  node: Node,
}

impl Pending {
  fn key(&self) -> (usize, usize) {
    (self.node.freq(), self.seq)
  }
}

impl PartialEq for Pending {
  fn eq(&self, other: &Self) -> bool {
    self.key() == other.key()
  }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Pending {
  // BinaryHeap is a max-heap, so flip the comparison to pop the lightest first
  fn cmp(&self, other: &Self) -> Ordering {
    other.key().cmp(&self.key())
  }
}

/// Mapping from symbol to its prefix code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
  codes: BTreeMap<Symbol, Code>,
}

impl CodeTable {
  pub fn get(&self, sym: Symbol) -> Option<&Code> {
    self.codes.get(&sym)
  }

  pub fn len(&self) -> usize {
    self.codes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.codes.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (Symbol, &Code)> + '_ {
    self.codes.iter().map(|(sym, code)| (*sym, code))
  }

  /// Code lengths per symbol, as printed by the inspection tools
  pub fn lengths(&self) -> BTreeMap<Symbol, usize> {
    self.iter().map(|(sym, code)| (sym, code.len())).collect()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
  root: Node,
  codes: CodeTable,
}

impl HuffmanTree {
  /// Run Huffman's algorithm over the table and derive the code for every symbol.
  pub fn build(table: &FrequencyTable) -> Result<Self, HuffTreeError> {
    let mut heap = BinaryHeap::with_capacity(table.len());
    let mut seq = 0usize;
    for (sym, freq) in table.iter() {
      heap.push(Pending {
        seq,
        node: Node::Leaf { sym, freq },
      });
      seq += 1;
    }

    let root = loop {
      let first = heap.pop().ok_or(HuffTreeError::EmptyAlphabet)?;
      let second = match heap.pop() {
        Some(p) => p,
        None => break first.node,
      };
      let freq = first.node.freq() + second.node.freq();
      heap.push(Pending {
        seq,
        node: Node::Internal {
          freq,
          left: Box::new(first.node),
          right: Box::new(second.node),
        },
      });
      seq += 1;
    };

    let codes = Self::generate_codes(&root);
    debug!(
      "Built Huffman tree over {} symbols ({} nodes)",
      table.len(),
      seq
    );
    Ok(Self { root, codes })
  }

  /// Walk the tree, appending 0 on each left branch and 1 on each right.
  /// A lone root leaf gets the empty code.
  fn generate_codes(root: &Node) -> CodeTable {
    fn descend(node: &Node, prefix: &mut Code, codes: &mut BTreeMap<Symbol, Code>) {
      match node {
        Node::Leaf { sym, .. } => {
          codes.insert(*sym, prefix.clone());
        }
        Node::Internal { left, right, .. } => {
          prefix.push(false);
          descend(left, prefix, codes);
          prefix.pop();
          prefix.push(true);
          descend(right, prefix, codes);
          prefix.pop();
        }
      }
    }

    let mut codes = BTreeMap::new();
    descend(root, &mut BitVec::new(), &mut codes);
    CodeTable { codes }
  }

  pub fn codes(&self) -> &CodeTable {
    &self.codes
  }

  pub(crate) fn root(&self) -> &Node {
    &self.root
  }

  /// True when the alphabet has a single symbol and the root is a leaf
  pub fn is_degenerate(&self) -> bool {
    matches!(self.root, Node::Leaf { .. })
  }

  /// Exact number of bits the packer emits for the symbols counted in
  /// `table`. Empty codes count as the one-bit placeholder.
  pub fn encoded_bit_len(&self, table: &FrequencyTable) -> usize {
    table
      .iter()
      .map(|(sym, ct)| {
        let len = self.codes.get(sym).map(|c| c.len()).unwrap_or(0);
        ct * len.max(1)
      })
      .sum()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use quickcheck::TestResult;
  use quickcheck_macros::quickcheck;

  fn bits(s: &str) -> Code {
    s.chars().map(|c| c == '1').collect()
  }

  fn is_prefix(short: &Code, long: &Code) -> bool {
    short.len() <= long.len() && short.iter().zip(long.iter()).all(|(a, b)| a == b)
  }

  #[test]
  fn freqcount_1() {
    let pixels = vec![10, 10, 20, 30];
    let table = FrequencyTable::count(&pixels);
    let expected = FrequencyTable::from_counts(vec![(10, 2), (20, 1), (30, 1)]);
    assert_eq!(table, expected);
    assert_eq!(table.total(), 4);
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(40), 0);
  }

  #[test]
  fn empty_input_gives_empty_table() {
    let table = FrequencyTable::count(&[]);
    assert!(table.is_empty());
    assert_eq!(table.total(), 0);
  }

  #[test]
  fn from_counts_drops_zeros() {
    let table = FrequencyTable::from_counts(vec![(1, 0), (2, 3), (2, 1)]);
    assert_eq!(table.iter().collect::<Vec<_>>(), vec![(2, 4)]);
  }

  #[test]
  fn hufftree_2x2_scenario() {
    let table = FrequencyTable::count(&[10, 10, 20, 30]);
    let tree = HuffmanTree::build(&table).unwrap();

    let answer = Node::Internal {
      freq: 4,
      left: Box::new(Node::Leaf { sym: 10, freq: 2 }),
      right: Box::new(Node::Internal {
        freq: 2,
        left: Box::new(Node::Leaf { sym: 20, freq: 1 }),
        right: Box::new(Node::Leaf { sym: 30, freq: 1 }),
      }),
    };
    assert_eq!(tree.root, answer);

    let codes = tree.codes();
    assert_eq!(codes.get(10), Some(&bits("0")));
    assert_eq!(codes.get(20), Some(&bits("10")));
    assert_eq!(codes.get(30), Some(&bits("11")));
    assert_eq!(tree.encoded_bit_len(&table), 6);
  }

  #[test]
  fn simple_map() {
    // 5 a's, 2 b's, 1 c
    let table = FrequencyTable::from_counts(vec![(b'a', 5), (b'b', 2), (b'c', 1)]);
    let tree = HuffmanTree::build(&table).unwrap();
    let answer: BTreeMap<Symbol, Code> = vec![(b'c', bits("00")), (b'b', bits("01")), (b'a', bits("1"))]
      .into_iter()
      .collect();
    assert_eq!(tree.codes().codes, answer);
  }

  #[test]
  fn ties_resolve_by_symbol_order() {
    let table = FrequencyTable::from_counts(vec![(3, 1), (1, 1), (2, 1), (0, 1)]);
    let tree = HuffmanTree::build(&table).unwrap();
    let lens = tree.codes().lengths();
    assert!(lens.values().all(|l| *l == 2));
    assert_eq!(tree.codes().get(0), Some(&bits("00")));
    assert_eq!(tree.codes().get(1), Some(&bits("01")));
    assert_eq!(tree.codes().get(2), Some(&bits("10")));
    assert_eq!(tree.codes().get(3), Some(&bits("11")));
  }

  #[test]
  fn singleton_alphabet_is_single_leaf() {
    let table = FrequencyTable::count(&[7]);
    let tree = HuffmanTree::build(&table).unwrap();
    assert!(tree.is_degenerate());
    assert_eq!(tree.root, Node::Leaf { sym: 7, freq: 1 });
    assert_eq!(tree.codes().get(7), Some(&BitVec::new()));
    assert_eq!(tree.encoded_bit_len(&table), 1);
  }

  #[test]
  fn empty_alphabet_is_rejected() {
    let table = FrequencyTable::default();
    assert_eq!(
      HuffmanTree::build(&table),
      Err(HuffTreeError::EmptyAlphabet)
    );
  }

  #[test]
  fn entropy_of_uniform_table() {
    let table = FrequencyTable::from_counts((0..=255u8).map(|s| (s, 3)));
    assert!((table.entropy() - 8.0).abs() < 1e-9);
    assert_eq!(FrequencyTable::count(&[4, 4, 4]).entropy(), 0.0);
  }

  #[quickcheck]
  fn codes_are_prefix_free(pixels: Vec<u8>) -> TestResult {
    let table = FrequencyTable::count(&pixels);
    if table.len() < 2 {
      return TestResult::discard();
    }
    let tree = HuffmanTree::build(&table).unwrap();
    let codes: Vec<&Code> = tree.codes().iter().map(|(_, c)| c).collect();
    for (i, a) in codes.iter().enumerate() {
      if a.is_empty() {
        return TestResult::failed();
      }
      for (j, b) in codes.iter().enumerate() {
        if i != j && is_prefix(a, b) {
          return TestResult::failed();
        }
      }
    }
    TestResult::passed()
  }

  #[quickcheck]
  fn build_is_deterministic(pixels: Vec<u8>) -> TestResult {
    let table = FrequencyTable::count(&pixels);
    if table.is_empty() {
      return TestResult::discard();
    }
    let t1 = HuffmanTree::build(&table).unwrap();
    let t2 = HuffmanTree::build(&table.clone()).unwrap();
    TestResult::from_bool(t1 == t2 && t1.codes() == t2.codes())
  }

  #[quickcheck]
  fn code_lengths_satisfy_kraft(pixels: Vec<u8>) -> TestResult {
    let table = FrequencyTable::count(&pixels);
    if table.len() < 2 {
      return TestResult::discard();
    }
    let tree = HuffmanTree::build(&table).unwrap();
    let kraft: f64 = tree
      .codes()
      .iter()
      .map(|(_, c)| 2f64.powi(-(c.len() as i32)))
      .sum();
    TestResult::from_bool((kraft - 1.0).abs() < 1e-9)
  }
}
