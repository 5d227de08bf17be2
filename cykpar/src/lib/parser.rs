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

use std::hash::Hash;

use cnfgrammar::{CnfGrammar, SymIdx};
use log::debug;
use num_traits::{AsPrimitive, PrimInt, Unsigned};

use crate::{CykTable, Node, ParseForest};

/// A CYK parser for a `CnfGrammar`. The grammar is only ever read, so any number of parsers (and
/// threads) may share it.
pub struct CykParserBuilder<'a, Id, TagT, StorageT> {
    grm: &'a CnfGrammar<Id, TagT, StorageT>,
    max_trees: Option<usize>,
}

impl<'a, Id: Clone + Eq + Hash, TagT, StorageT: 'static + Hash + PrimInt + Unsigned>
    CykParserBuilder<'a, Id, TagT, StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    pub fn new(grm: &'a CnfGrammar<Id, TagT, StorageT>) -> Self {
        CykParserBuilder {
            grm,
            max_trees: None,
        }
    }

    /// Return at most `max` trees from [`parse_trees`](#method.parse_trees). Ambiguous grammars
    /// can have exponentially many trees for an input, so callers who do not need all of them
    /// should set this. Defaults to unbounded.
    pub fn max_trees(mut self, max: usize) -> Self {
        self.max_trees = Some(max);
        self
    }

    /// Is `input` in the language of the grammar? Symbols the grammar does not know simply
    /// never match.
    pub fn recognize(&self, input: &[Id]) -> bool {
        self.recognize_resolved(&self.resolve(input))
    }

    /// As [`recognize`](#method.recognize), but for an input of symbol indices. Indices outside
    /// the grammar never match.
    pub fn recognize_idxs(&self, input: &[SymIdx<StorageT>]) -> bool {
        self.recognize_resolved(&self.resolve_idxs(input))
    }

    /// Build the parse forest of `input`. The forest is empty if `input` is not in the language
    /// of the grammar.
    pub fn parse(&self, input: &[Id]) -> ParseForest<StorageT> {
        self.parse_resolved(&self.resolve(input))
    }

    pub fn parse_idxs(&self, input: &[SymIdx<StorageT>]) -> ParseForest<StorageT> {
        self.parse_resolved(&self.resolve_idxs(input))
    }

    /// Parse `input` and return its parse trees (at most `max_trees` of them).
    pub fn parse_trees(&self, input: &[Id]) -> Vec<Node<StorageT>> {
        let forest = self.parse(input);
        match self.max_trees {
            Some(max) => forest.trees_limited(max),
            None => forest.trees(),
        }
    }

    fn resolve(&self, input: &[Id]) -> Vec<Option<SymIdx<StorageT>>> {
        input.iter().map(|id| self.grm.symbol_idx(id)).collect()
    }

    fn resolve_idxs(&self, input: &[SymIdx<StorageT>]) -> Vec<Option<SymIdx<StorageT>>> {
        let symbols_len = usize::from(self.grm.symbols_len());
        input
            .iter()
            .map(|&s| Some(s).filter(|&s| usize::from(s) < symbols_len))
            .collect()
    }

    fn recognize_resolved(&self, input: &[Option<SymIdx<StorageT>>]) -> bool {
        let accepted = CykTable::new(self.grm, input).accepts();
        debug!(
            "Input of length {} {}",
            input.len(),
            if accepted { "accepted" } else { "rejected" }
        );
        accepted
    }

    fn parse_resolved(&self, input: &[Option<SymIdx<StorageT>>]) -> ParseForest<StorageT> {
        let forest = ParseForest::new(self.grm, input);
        debug!(
            "Input of length {} {}",
            input.len(),
            if forest.is_empty() {
                "rejected"
            } else {
                "accepted"
            }
        );
        forest
    }
}
