// Copyright (c) 2017 King's College London
// created by the Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0
//
// Subject to the condition set forth below, permission is hereby granted to any person obtaining a
// copy of this software, associated documentation and/or data (collectively the "Software"), free
// of charge and under any and all copyright rights in the Software, and any and all patent rights
// owned or freely licensable by each licensor hereunder covering either (i) the unmodified
// Software as contributed to or provided by such licensor, or (ii) the Larger Works (as defined
// below), to deal in both
//
// (a) the Software, and
// (b) any piece of software and/or hardware listed in the lrgrwrks.txt file
// if one is included with the Software (each a "Larger Work" to which the Software is contributed
// by such licensors),
//
// without restriction, including without limitation the rights to copy, create derivative works
// of, display, perform, and distribute the Software and make, use, sell, offer for sale, import,
// export, have made, and have sold the Software and the Larger Work(s), and to sublicense the
// foregoing rights on either these or other terms.
//
// This license is subject to the following condition: The above copyright notice and either this
// complete permission notice or at a minimum a reference to the UPL must be included in all copies
// or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use std::{fmt, hash::Hash};

use cnfgrammar::{CnfGrammar, SymIdx};
use indexmap::IndexMap;
use num_traits::{AsPrimitive, PrimInt, Unsigned};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::table::{cell_offset, CykTable};

/// The reason a non-terminal was placed into a cell of the CYK table.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Witness<StorageT> {
    /// Base row only: the non-terminal has the rule `P: t` for the terminal `t` at this position.
    Terminal(SymIdx<StorageT>),
    /// The non-terminal has the rule `P: left right`, where `left` derives the first `split`
    /// symbols of the cell's span and `right` the rest.
    Split {
        split: usize,
        left: SymIdx<StorageT>,
        right: SymIdx<StorageT>,
    },
}

/// A generic parse tree.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Node<StorageT> {
    /// The terminal `sidx` at input position `pos`.
    Term { sidx: SymIdx<StorageT>, pos: usize },
    Nonterm {
        sidx: SymIdx<StorageT>,
        nodes: Vec<Node<StorageT>>,
    },
}

impl<StorageT: 'static + Hash + PrimInt + Unsigned> Node<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    pub fn sidx(&self) -> SymIdx<StorageT> {
        match *self {
            Node::Term { sidx, .. } | Node::Nonterm { sidx, .. } => sidx,
        }
    }

    /// Return the terminals of this tree from left to right.
    pub fn leaves(&self) -> Vec<SymIdx<StorageT>> {
        let mut st = vec![self];
        let mut leaves = Vec::new();
        while let Some(e) = st.pop() {
            match *e {
                Node::Term { sidx, .. } => leaves.push(sidx),
                Node::Nonterm { ref nodes, .. } => st.extend(nodes.iter().rev()),
            }
        }
        leaves
    }

    /// Return a pretty-printed version of this node.
    pub fn pp<Id: Clone + Eq + Hash + fmt::Display, TagT>(
        &self,
        grm: &CnfGrammar<Id, TagT, StorageT>,
    ) -> String {
        let mut st = vec![(0, self)]; // Stack of (indent level, node) pairs
        let mut s = String::new();
        while let Some((indent, e)) = st.pop() {
            for _ in 0..indent {
                s.push(' ');
            }
            match *e {
                Node::Term { sidx, pos } => {
                    s.push_str(&format!("{} {}\n", grm.symbol_id(sidx), pos));
                }
                Node::Nonterm { sidx, ref nodes } => {
                    s.push_str(&format!("{}\n", grm.symbol_id(sidx)));
                    for x in nodes.iter().rev() {
                        st.push((indent + 1, x));
                    }
                }
            }
        }
        s
    }
}

/// Every witness recorded while filling a CYK table, from which every parse tree of the input
/// can be rebuilt. A forest is empty if, and only if, the input was not accepted.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "StorageT: Serialize",
        deserialize = "StorageT: Deserialize<'de> + Eq + Hash"
    ))
)]
pub struct ParseForest<StorageT> {
    len: usize,
    /// Row-major triangle of cells, each mapping a non-terminal to the witnesses for it.
    cells: Vec<IndexMap<SymIdx<StorageT>, Vec<Witness<StorageT>>>>,
    roots: Vec<SymIdx<StorageT>>,
}

impl<StorageT: 'static + Hash + PrimInt + Unsigned> ParseForest<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    pub(crate) fn new<Id: Clone + Eq + Hash, TagT>(
        grm: &CnfGrammar<Id, TagT, StorageT>,
        input: &[Option<SymIdx<StorageT>>],
    ) -> Self {
        let len = input.len();
        let mut cells = vec![IndexMap::new(); len * (len + 1) / 2];
        let table = CykTable::fill_with(grm, input, |row, col, p, w| {
            cells[cell_offset(len, row, col)]
                .entry(p)
                .or_insert_with(Vec::new)
                .push(w)
        });
        if !table.accepts() {
            return ParseForest {
                len,
                cells: Vec::new(),
                roots: Vec::new(),
            };
        }
        let roots = cells[cell_offset(len, len - 1, 0)]
            .keys()
            .copied()
            .filter(|&s| grm.is_root(s))
            .collect::<Vec<_>>();
        ParseForest { len, cells, roots }
    }

    /// The length of the input this forest was built for, whether or not it was accepted.
    pub fn input_len(&self) -> usize {
        self.len
    }

    /// Was the input rejected?
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The root-tagged symbols deriving the whole input. Under CNF there is at most one.
    pub fn roots(&self) -> &[SymIdx<StorageT>] {
        &self.roots
    }

    /// Return the witnesses for `sidx` deriving cell `(row, col)`. The slice is empty if `sidx`
    /// was not placed in that cell (or the forest is empty).
    pub fn witnesses(
        &self,
        row: usize,
        col: usize,
        sidx: SymIdx<StorageT>,
    ) -> &[Witness<StorageT>] {
        if self.is_empty() || row >= self.len || col >= self.len - row {
            return &[];
        }
        self.cells[cell_offset(self.len, row, col)]
            .get(&sidx)
            .map(|ws| ws.as_slice())
            .unwrap_or(&[])
    }

    /// How many distinct parse trees does this forest contain? Saturates at `u64::MAX`.
    pub fn count_trees(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        // Witnesses only ever refer to strictly shorter spans, so filling in row order means every
        // child count is known before it is needed.
        let mut counts: Vec<Vec<u64>> = Vec::with_capacity(self.cells.len());
        for row in 0..self.len {
            for col in 0..self.len - row {
                let cell = &self.cells[cell_offset(self.len, row, col)];
                let mut ccounts = Vec::with_capacity(cell.len());
                for ws in cell.values() {
                    let mut n = 0u64;
                    for w in ws {
                        let m = match *w {
                            Witness::Terminal(_) => 1,
                            Witness::Split { split, left, right } => {
                                let l = self.count_in(&counts, split - 1, col, left);
                                let r = self.count_in(&counts, row - split, col + split, right);
                                l.saturating_mul(r)
                            }
                        };
                        n = n.saturating_add(m);
                    }
                    ccounts.push(n);
                }
                counts.push(ccounts);
            }
        }
        let top = self.len - 1;
        self.roots
            .iter()
            .fold(0u64, |n, &s| n.saturating_add(self.count_in(&counts, top, 0, s)))
    }

    fn count_in(
        &self,
        counts: &[Vec<u64>],
        row: usize,
        col: usize,
        sidx: SymIdx<StorageT>,
    ) -> u64 {
        let off = cell_offset(self.len, row, col);
        match self.cells[off].get_index_of(&sidx) {
            Some(i) => counts[off][i],
            None => 0,
        }
    }

    /// Return every parse tree in this forest. The number of trees can be exponential in the
    /// length of the input: see [`trees_limited`](#method.trees_limited).
    pub fn trees(&self) -> Vec<Node<StorageT>> {
        self.trees_limited(usize::MAX)
    }

    /// Return at most `max` parse trees from this forest, in a deterministic order.
    pub fn trees_limited(&self, max: usize) -> Vec<Node<StorageT>> {
        let mut trees = Vec::new();
        if max == 0 {
            return trees;
        }
        for &root in &self.roots {
            let rest = max - trees.len();
            trees.extend(self.build(self.len - 1, 0, root, rest));
            if trees.len() == max {
                break;
            }
        }
        trees
    }

    /// Build at most `max` (which must be at least 1) trees for `sidx` deriving `(row, col)`.
    fn build(
        &self,
        row: usize,
        col: usize,
        sidx: SymIdx<StorageT>,
        max: usize,
    ) -> Vec<Node<StorageT>> {
        let mut out = Vec::new();
        for w in self.witnesses(row, col, sidx) {
            match *w {
                Witness::Terminal(t) => out.push(Node::Nonterm {
                    sidx,
                    nodes: vec![Node::Term { sidx: t, pos: col }],
                }),
                Witness::Split { split, left, right } => {
                    let lefts = self.build(split - 1, col, left, max - out.len());
                    let rights = self.build(row - split, col + split, right, max - out.len());
                    'outer: for l in &lefts {
                        for r in &rights {
                            out.push(Node::Nonterm {
                                sidx,
                                nodes: vec![l.clone(), r.clone()],
                            });
                            if out.len() == max {
                                break 'outer;
                            }
                        }
                    }
                }
            }
            if out.len() == max {
                break;
            }
        }
        out
    }
}
