use std::{collections::HashMap, error::Error, fmt, hash::Hash};

use indexmap::IndexSet;
use log::trace;
use num_traits::{self, AsPrimitive, PrimInt, Unsigned};

use crate::{SymIdx, SymbolId};

/// The various different possible errors when building a `BnfGrammar`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BnfGrammarErrorKind {
    DuplicateSymbol,
    UnknownParent,
    ParentIsTerminal,
    UnknownMember,
    /// Epsilon rules are not supported.
    EmptyRule,
    UnknownSymbol,
    /// `StorageT` cannot address another symbol.
    TooManySymbols,
}

/// Any error from building a `BnfGrammar` returns an instance of this struct. A call which
/// returns an error leaves the grammar exactly as it was before the call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BnfGrammarError<Id> {
    pub kind: BnfGrammarErrorKind,
    /// The symbol at fault. This is `None` only for an `EmptyRule` added to a start symbol which
    /// was created by the normaliser.
    pub sym: Option<Id>,
}

impl<Id: fmt::Debug> Error for BnfGrammarError<Id> {}

impl<Id: fmt::Debug> fmt::Display for BnfGrammarError<Id> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self.kind {
            BnfGrammarErrorKind::DuplicateSymbol => "Duplicate symbol",
            BnfGrammarErrorKind::UnknownParent => "Unknown parent symbol",
            BnfGrammarErrorKind::ParentIsTerminal => "Terminal symbols cannot have rules",
            BnfGrammarErrorKind::UnknownMember => "Rule references an unknown symbol",
            BnfGrammarErrorKind::EmptyRule => "Empty rules are not supported",
            BnfGrammarErrorKind::UnknownSymbol => "Unknown symbol",
            BnfGrammarErrorKind::TooManySymbols => "Too many symbols for StorageT to declare",
        };
        match self.sym {
            Some(ref sym) => write!(f, "{} {:?}", s, sym),
            None => write!(f, "{}", s),
        }
    }
}

/// The record for a single symbol.
#[derive(Clone, Debug)]
pub(crate) struct BnfSymbol<StorageT> {
    pub(crate) is_terminal: bool,
    /// Always empty for terminals.
    pub(crate) rules: IndexSet<Vec<SymIdx<StorageT>>>,
    pub(crate) parents: IndexSet<SymIdx<StorageT>>,
}

/// A grammar in Backus-Naur Form. Symbols are declared with
/// [`declare_symbol`](#method.declare_symbol) and rules added with
/// [`add_rule`](#method.add_rule); the grammar is then converted to Chomsky Normal Form, in
/// place, with [`normalize`](#method.normalize).
///
/// `Id` is the type of caller symbol identities (e.g. `&str`); `TagT` the type of the tags a
/// caller can attach to symbols (see [`assign_tag`](#method.assign_tag)).
#[derive(Clone, Debug)]
pub struct BnfGrammar<Id, TagT = Id, StorageT = u32> {
    /// A mapping from `SymIdx` -> `SymbolId` (and, via `get_index_of`, its inverse).
    pub(crate) ids: IndexSet<SymbolId<Id>>,
    /// A mapping from `SymIdx` -> `BnfSymbol`. Always the same length as `ids`.
    pub(crate) symbols: Vec<BnfSymbol<StorageT>>,
    /// The current start symbol. The START step may re-point this.
    pub(crate) start: SymIdx<StorageT>,
    pub(crate) next_synthetic: u32,
    pub(crate) next_start: u32,
    /// Tags assigned by the caller. Untagged symbols are given automatic tags by `normalize`.
    pub(crate) tags: HashMap<SymIdx<StorageT>, TagT>,
}

impl<Id: Clone + Eq + Hash> BnfGrammar<Id, Id, u32> {
    /// Create a grammar whose start symbol is the (non-terminal) user symbol `start`.
    pub fn new(start: Id) -> Self {
        BnfGrammar::new_with_storaget(start)
    }
}

impl<Id: Clone + Eq + Hash, TagT, StorageT: 'static + Hash + PrimInt + Unsigned>
    BnfGrammar<Id, TagT, StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// As [`new`](#method.new), but allowing the tag type and the `StorageT` used for symbol
    /// indices to be chosen.
    pub fn new_with_storaget(start: Id) -> Self {
        let mut grm = BnfGrammar {
            ids: IndexSet::new(),
            symbols: Vec::new(),
            start: SymIdx::from_usize(0),
            next_synthetic: 0,
            next_start: 0,
            tags: HashMap::new(),
        };
        grm.start = grm.push_symbol(SymbolId::User(start), false);
        grm
    }

    /// Declare the user symbol `id`. Terminal symbols can never have rules.
    pub fn declare_symbol(
        &mut self,
        id: Id,
        is_terminal: bool,
    ) -> Result<SymIdx<StorageT>, BnfGrammarError<Id>> {
        if self.symbol_idx(&id).is_some() {
            return Err(BnfGrammarError {
                kind: BnfGrammarErrorKind::DuplicateSymbol,
                sym: Some(id),
            });
        }
        if self.ids.len() >= num_traits::cast(StorageT::max_value()).unwrap() {
            return Err(BnfGrammarError {
                kind: BnfGrammarErrorKind::TooManySymbols,
                sym: Some(id),
            });
        }
        Ok(self.push_symbol(SymbolId::User(id), is_terminal))
    }

    pub fn declare_terminal(&mut self, id: Id) -> Result<SymIdx<StorageT>, BnfGrammarError<Id>> {
        self.declare_symbol(id, true)
    }

    pub fn declare_nonterminal(
        &mut self,
        id: Id,
    ) -> Result<SymIdx<StorageT>, BnfGrammarError<Id>> {
        self.declare_symbol(id, false)
    }

    /// Add the rule `parent: members` to the grammar. `parent` must be a declared non-terminal
    /// and every member must be declared. Adding a rule which already exists is a no-op.
    pub fn add_rule(&mut self, parent: &Id, members: &[Id]) -> Result<(), BnfGrammarError<Id>> {
        let p_sidx = self.symbol_idx(parent).ok_or_else(|| BnfGrammarError {
            kind: BnfGrammarErrorKind::UnknownParent,
            sym: Some(parent.clone()),
        })?;
        if self.is_terminal(p_sidx) {
            return Err(BnfGrammarError {
                kind: BnfGrammarErrorKind::ParentIsTerminal,
                sym: Some(parent.clone()),
            });
        }
        let rule = self.resolve_members(p_sidx, members)?;
        self.insert_rule(p_sidx, rule);
        Ok(())
    }

    /// Add the rule `members` to the current start symbol.
    pub fn add_rule_to_root(&mut self, members: &[Id]) -> Result<(), BnfGrammarError<Id>> {
        let rule = self.resolve_members(self.start, members)?;
        self.insert_rule(self.start, rule);
        Ok(())
    }

    fn resolve_members(
        &self,
        parent: SymIdx<StorageT>,
        members: &[Id],
    ) -> Result<Vec<SymIdx<StorageT>>, BnfGrammarError<Id>> {
        if members.is_empty() {
            return Err(BnfGrammarError {
                kind: BnfGrammarErrorKind::EmptyRule,
                sym: self.symbol_id(parent).user().cloned(),
            });
        }
        members
            .iter()
            .map(|m| {
                self.symbol_idx(m).ok_or_else(|| BnfGrammarError {
                    kind: BnfGrammarErrorKind::UnknownMember,
                    sym: Some(m.clone()),
                })
            })
            .collect()
    }

    /// Attach `tag` to the symbol `id`, replacing any tag previously assigned to it. The tag of
    /// the start symbol is always replaced by `Tag::Root` when the grammar is normalised.
    pub fn assign_tag(&mut self, id: &Id, tag: TagT) -> Result<(), BnfGrammarError<Id>> {
        let sidx = self.symbol_idx(id).ok_or_else(|| BnfGrammarError {
            kind: BnfGrammarErrorKind::UnknownSymbol,
            sym: Some(id.clone()),
        })?;
        self.tags.insert(sidx, tag);
        Ok(())
    }

    /// Return the tag the caller assigned to `sidx`, if any.
    pub fn tag(&self, sidx: SymIdx<StorageT>) -> Option<&TagT> {
        self.tags.get(&sidx)
    }

    /// How many symbols does this grammar have?
    pub fn symbols_len(&self) -> SymIdx<StorageT> {
        SymIdx::from_usize(self.symbols.len())
    }

    /// Return an iterator which produces (in order from `0..self.symbols_len()`) all this
    /// grammar's valid `SymIdx`s.
    pub fn iter_sidxs(&self) -> impl Iterator<Item = SymIdx<StorageT>> {
        // symbols.len() fits in StorageT: push_symbol checks that.
        (0..self.symbols.len()).map(SymIdx::from_usize)
    }

    /// Return the index of the current start symbol.
    pub fn start_idx(&self) -> SymIdx<StorageT> {
        self.start
    }

    /// Return the index of the user symbol `id` or `None` if it doesn't exist.
    pub fn symbol_idx(&self, id: &Id) -> Option<SymIdx<StorageT>> {
        self.ids
            .get_index_of(&SymbolId::User(id.clone()))
            .map(SymIdx::from_usize)
    }

    /// Return the identity of symbol `sidx`. Panics if `sidx` doesn't exist.
    pub fn symbol_id(&self, sidx: SymIdx<StorageT>) -> &SymbolId<Id> {
        &self.ids[usize::from(sidx)]
    }

    /// Is `sidx` a terminal? Panics if `sidx` doesn't exist.
    pub fn is_terminal(&self, sidx: SymIdx<StorageT>) -> bool {
        self.symbols[usize::from(sidx)].is_terminal
    }

    /// Return the rules of `sidx`. Panics if `sidx` doesn't exist.
    pub fn rules(&self, sidx: SymIdx<StorageT>) -> impl Iterator<Item = &[SymIdx<StorageT>]> + '_ {
        self.symbols[usize::from(sidx)]
            .rules
            .iter()
            .map(|r| r.as_slice())
    }

    /// Does `parent` have exactly the rule `rule`?
    pub fn has_rule(&self, parent: SymIdx<StorageT>, rule: &[SymIdx<StorageT>]) -> bool {
        self.symbols[usize::from(parent)].rules.contains(rule)
    }

    /// How many rules, over all symbols, does this grammar have?
    pub fn rules_len(&self) -> usize {
        self.symbols.iter().map(|s| s.rules.len()).sum()
    }

    /// Return the parents of `sidx` i.e. the symbols with at least one rule producing `sidx`.
    pub fn parents(&self, sidx: SymIdx<StorageT>) -> impl Iterator<Item = SymIdx<StorageT>> + '_ {
        self.symbols[usize::from(sidx)].parents.iter().copied()
    }

    /// Returns the string representation of the rule `rule` of `parent`, with terminals
    /// quoted.
    pub fn pp_rule(&self, parent: SymIdx<StorageT>, rule: &[SymIdx<StorageT>]) -> String
    where
        Id: fmt::Display,
    {
        let mut s = self.symbol_id(parent).to_string();
        s.push(':');
        for &sidx in rule {
            if self.is_terminal(sidx) {
                s.push_str(&format!(" \"{}\"", self.symbol_id(sidx)));
            } else {
                s.push_str(&format!(" {}", self.symbol_id(sidx)));
            }
        }
        s
    }

    /// Returns every rule of the grammar, one per line, in symbol order.
    pub fn pp(&self) -> String
    where
        Id: fmt::Display,
    {
        let mut s = String::new();
        for sidx in self.iter_sidxs() {
            for rule in self.rules(sidx) {
                s.push_str(&self.pp_rule(sidx, rule));
                s.push('\n');
            }
        }
        s
    }

    /// Add a new symbol to the end of the symbol arena.
    ///
    /// # Panics
    ///
    /// If `id` already exists (for synthetic and start symbols this means that the allocator has
    /// gone wrong) or if `StorageT` is too small to address another symbol.
    pub(crate) fn push_symbol(&mut self, id: SymbolId<Id>, is_terminal: bool) -> SymIdx<StorageT> {
        if self.ids.len() >= num_traits::cast(StorageT::max_value()).unwrap() {
            panic!("StorageT is not big enough to store this grammar's symbols.");
        }
        let (i, fresh) = self.ids.insert_full(id);
        if !fresh {
            panic!("Symbol {} allocated twice.", i);
        }
        self.symbols.push(BnfSymbol {
            is_terminal,
            rules: IndexSet::new(),
            parents: IndexSet::new(),
        });
        SymIdx::from_usize(i)
    }

    /// Allocate a fresh non-terminal from the synthetic namespace.
    pub(crate) fn fresh_synthetic(&mut self) -> SymIdx<StorageT> {
        let n = self.next_synthetic;
        self.next_synthetic = n
            .checked_add(1)
            .expect("Synthetic symbol namespace exhausted");
        self.push_symbol(SymbolId::Synthetic(n), false)
    }

    /// Allocate a fresh non-terminal from the start namespace.
    pub(crate) fn fresh_start(&mut self) -> SymIdx<StorageT> {
        let n = self.next_start;
        self.next_start = n.checked_add(1).expect("Start symbol namespace exhausted");
        self.push_symbol(SymbolId::Start(n), false)
    }

    /// Add `rule` to `parent` and record `parent` as a parent of each of `rule`'s members.
    /// Returns `false` if `parent` already had this rule.
    pub(crate) fn insert_rule(
        &mut self,
        parent: SymIdx<StorageT>,
        rule: Vec<SymIdx<StorageT>>,
    ) -> bool {
        debug_assert!(!self.is_terminal(parent));
        debug_assert!(!rule.is_empty());
        trace!(
            "Adding rule {} -> {:?}",
            usize::from(parent),
            rule.iter().map(|&m| usize::from(m)).collect::<Vec<_>>()
        );
        for &m in &rule {
            self.symbols[usize::from(m)].parents.insert(parent);
        }
        self.symbols[usize::from(parent)].rules.insert(rule)
    }

    /// Remove `rule` from `parent`. Each member of `rule` keeps `parent` as a parent if any of
    /// `parent`'s remaining rules still produces it.
    ///
    /// # Panics
    ///
    /// If `parent` does not have the rule `rule`.
    pub(crate) fn remove_rule(&mut self, parent: SymIdx<StorageT>, rule: &[SymIdx<StorageT>]) {
        let prules = &mut self.symbols[usize::from(parent)].rules;
        if !prules.shift_remove(rule) {
            panic!("Symbol {} has no such rule.", usize::from(parent));
        }
        for &m in rule {
            let still_produced = self.symbols[usize::from(parent)]
                .rules
                .iter()
                .any(|r| r.contains(&m));
            if !still_produced {
                self.symbols[usize::from(m)].parents.shift_remove(&parent);
            }
        }
        trace!(
            "Removed rule {} -> {:?}",
            usize::from(parent),
            rule.iter().map(|&m| usize::from(m)).collect::<Vec<_>>()
        );
    }

    /// Check that the parent relation is exactly the reflection of the rules.
    #[cfg(test)]
    pub(crate) fn assert_parents_consistent(&self) {
        for p in self.iter_sidxs() {
            if self.is_terminal(p) {
                assert_eq!(self.rules(p).count(), 0);
            }
            for rule in self.rules(p) {
                for &m in rule {
                    assert!(self.parents(m).any(|x| x == p));
                }
            }
        }
        for m in self.iter_sidxs() {
            for p in self.parents(m) {
                assert!(self.rules(p).any(|r| r.contains(&m)));
            }
        }
    }
}
