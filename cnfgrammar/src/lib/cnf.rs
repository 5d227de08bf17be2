use std::{fmt, hash::Hash};

use indexmap::IndexSet;
use num_traits::{AsPrimitive, PrimInt, Unsigned};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use vob::Vob;

use crate::{BnfGrammar, SymIdx, SymbolId, Tag};

/// A rule of a grammar in Chomsky Normal Form.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CnfRule<StorageT> {
    /// `P: t` where `t` is a terminal.
    Terminal(SymIdx<StorageT>),
    /// `P: L R` where `L` and `R` are non-terminals.
    Binary(SymIdx<StorageT>, SymIdx<StorageT>),
}

/// A grammar in Chomsky Normal Form, as produced by [`BnfGrammar::normalize`]. A `CnfGrammar`
/// cannot be altered once built; it can safely be shared between threads.
///
/// Symbol indices are identical to those of the `BnfGrammar` it was built from.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "Id: Serialize, TagT: Serialize, StorageT: Serialize",
        deserialize = "Id: Deserialize<'de> + Eq + Hash, TagT: Deserialize<'de>, \
                       StorageT: Deserialize<'de> + Eq + Hash"
    ))
)]
pub struct CnfGrammar<Id, TagT = Id, StorageT = u32> {
    /// A mapping from `SymIdx` -> `SymbolId`.
    ids: IndexSet<SymbolId<Id>>,
    /// A mapping from `SymIdx` -> `Tag`.
    tags: Vec<Tag<TagT>>,
    terminals: Vob,
    /// A mapping from `SymIdx` -> rules. Always empty for terminals.
    rules: Vec<IndexSet<CnfRule<StorageT>>>,
    /// A mapping from `SymIdx` -> parents, each a bit set over all symbols.
    parents: Vec<Vob>,
    start: SymIdx<StorageT>,
}

impl<Id: Clone + Eq + Hash, TagT, StorageT: 'static + Hash + PrimInt + Unsigned>
    CnfGrammar<Id, TagT, StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Build a `CnfGrammar` from `bnf`, which must already be in Chomsky Normal Form.
    pub(crate) fn from_bnf(bnf: &BnfGrammar<Id, TagT, StorageT>) -> Self
    where
        TagT: Clone,
    {
        assert!(bnf.is_cnf());
        let symbols_len = bnf.symbols.len();
        let mut tags = Vec::with_capacity(symbols_len);
        let mut next_auto = 0;
        for sidx in bnf.iter_sidxs() {
            if sidx == bnf.start {
                tags.push(Tag::Root);
            } else if let Some(t) = bnf.tags.get(&sidx) {
                tags.push(Tag::User(t.clone()));
            } else {
                tags.push(Tag::Auto(next_auto));
                next_auto += 1;
            }
        }

        let mut terminals = Vob::from_elem(false, symbols_len);
        let mut rules = Vec::with_capacity(symbols_len);
        let mut parents = vec![Vob::from_elem(false, symbols_len); symbols_len];
        for (i, sym) in bnf.symbols.iter().enumerate() {
            terminals.set(i, sym.is_terminal);
            for &p in &sym.parents {
                parents[i].set(usize::from(p), true);
            }
            let srules = sym
                .rules
                .iter()
                .map(|rule| match rule.as_slice() {
                    [t] => CnfRule::Terminal(*t),
                    [l, r] => CnfRule::Binary(*l, *r),
                    _ => unreachable!(),
                })
                .collect::<IndexSet<_>>();
            rules.push(srules);
        }

        CnfGrammar {
            ids: bnf.ids.clone(),
            tags,
            terminals,
            rules,
            parents,
            start: bnf.start,
        }
    }

    /// How many symbols does this grammar have?
    pub fn symbols_len(&self) -> SymIdx<StorageT> {
        SymIdx::from_usize(self.tags.len())
    }

    /// Return an iterator which produces (in order from `0..self.symbols_len()`) all this
    /// grammar's valid `SymIdx`s.
    pub fn iter_sidxs(&self) -> impl Iterator<Item = SymIdx<StorageT>> {
        (0..self.tags.len()).map(SymIdx::from_usize)
    }

    /// Return the index of the start symbol (the only symbol tagged `Tag::Root`).
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

    /// Return the tag of symbol `sidx`. Panics if `sidx` doesn't exist.
    pub fn tag(&self, sidx: SymIdx<StorageT>) -> &Tag<TagT> {
        &self.tags[usize::from(sidx)]
    }

    /// Is `sidx` tagged as the root of the grammar?
    pub fn is_root(&self, sidx: SymIdx<StorageT>) -> bool {
        self.tag(sidx).is_root()
    }

    /// Is `sidx` a terminal? Panics if `sidx` doesn't exist.
    pub fn is_terminal(&self, sidx: SymIdx<StorageT>) -> bool {
        self.terminals[usize::from(sidx)]
    }

    /// Return the rules of `sidx`. Panics if `sidx` doesn't exist.
    pub fn rules(&self, sidx: SymIdx<StorageT>) -> impl Iterator<Item = &CnfRule<StorageT>> + '_ {
        self.rules[usize::from(sidx)].iter()
    }

    /// Does `parent` have the rule `rule`?
    pub fn has_rule(&self, parent: SymIdx<StorageT>, rule: &CnfRule<StorageT>) -> bool {
        self.rules[usize::from(parent)].contains(rule)
    }

    /// How many rules, over all symbols, does this grammar have?
    pub fn rules_len(&self) -> usize {
        self.rules.iter().map(|r| r.len()).sum()
    }

    /// Return the parents of `sidx` as a bit set over all of this grammar's symbols.
    pub fn parents(&self, sidx: SymIdx<StorageT>) -> &Vob {
        &self.parents[usize::from(sidx)]
    }

    /// Return the symbols which are parents of both `left` and `right`.
    pub fn common_parents(&self, left: SymIdx<StorageT>, right: SymIdx<StorageT>) -> Vob {
        let mut v = Vob::from_elem(false, usize::from(self.symbols_len()));
        self.common_parents_into(left, right, &mut v);
        v
    }

    /// As [`common_parents`](#method.common_parents), but overwriting `out`, which must have
    /// one bit per symbol of this grammar. Any bits already set in `out` are cleared.
    pub fn common_parents_into(
        &self,
        left: SymIdx<StorageT>,
        right: SymIdx<StorageT>,
        out: &mut Vob,
    ) {
        debug_assert_eq!(out.len(), usize::from(self.symbols_len()));
        out.set_all(false);
        out.or(self.parents(left));
        out.and(self.parents(right));
    }

    /// Returns every rule of the grammar, one per line, in symbol order.
    pub fn pp(&self) -> String
    where
        Id: fmt::Display,
    {
        let mut s = String::new();
        for sidx in self.iter_sidxs() {
            for rule in self.rules(sidx) {
                s.push_str(&format!("{}:", self.symbol_id(sidx)));
                match *rule {
                    CnfRule::Terminal(t) => s.push_str(&format!(" \"{}\"\n", self.symbol_id(t))),
                    CnfRule::Binary(l, r) => s.push_str(&format!(
                        " {} {}\n",
                        self.symbol_id(l),
                        self.symbol_id(r)
                    )),
                }
            }
        }
        s
    }
}

#[cfg(test)]
mod test {
    use super::CnfRule;
    use crate::{BnfGrammar, SymbolId, Tag};
    use vob::Vob;

    #[test]
    fn test_from_bnf() {
        let mut grm = BnfGrammar::new("S");
        grm.declare_nonterminal("A").unwrap();
        grm.declare_nonterminal("B").unwrap();
        grm.declare_terminal("a").unwrap();
        grm.declare_terminal("b").unwrap();
        grm.add_rule(&"S", &["A", "B"]).unwrap();
        grm.add_rule(&"A", &["a"]).unwrap();
        grm.add_rule(&"B", &["b"]).unwrap();
        grm.assign_tag(&"a", "x").unwrap();
        grm.assign_tag(&"S", "ignored").unwrap();
        let cnf = grm.normalize();

        let s = cnf.symbol_idx(&"S").unwrap();
        let a_nt = cnf.symbol_idx(&"A").unwrap();
        let b_nt = cnf.symbol_idx(&"B").unwrap();
        let a = cnf.symbol_idx(&"a").unwrap();
        let b = cnf.symbol_idx(&"b").unwrap();
        assert_eq!(cnf.start_idx(), s);
        assert_eq!(usize::from(cnf.symbols_len()), 5);
        assert_eq!(cnf.rules_len(), 3);
        assert!(cnf.has_rule(s, &CnfRule::Binary(a_nt, b_nt)));
        assert!(!cnf.has_rule(s, &CnfRule::Binary(b_nt, a_nt)));
        assert!(cnf.has_rule(a_nt, &CnfRule::Terminal(a)));
        assert!(cnf.is_terminal(a));
        assert!(!cnf.is_terminal(a_nt));
        assert_eq!(cnf.symbol_id(b), &SymbolId::User("b"));

        assert_eq!(cnf.tag(s), &Tag::Root);
        assert!(cnf.is_root(s));
        assert_eq!(cnf.tag(a), &Tag::User("x"));
        assert_eq!(cnf.tag(a_nt), &Tag::Auto(0));
        assert_eq!(cnf.tag(b_nt), &Tag::Auto(1));
        assert_eq!(cnf.tag(b), &Tag::Auto(2));
        assert_eq!(cnf.iter_sidxs().filter(|&x| cnf.is_root(x)).count(), 1);

        assert_eq!(
            cnf.parents(a_nt).iter_set_bits(..).collect::<Vec<_>>(),
            vec![usize::from(s)]
        );
        assert_eq!(
            cnf.common_parents(a_nt, b_nt).iter_set_bits(..).collect::<Vec<_>>(),
            vec![usize::from(s)]
        );
        assert_eq!(cnf.common_parents(a, b).iter_set_bits(..).count(), 0);

        let mut scratch = Vob::from_elem(true, usize::from(cnf.symbols_len()));
        cnf.common_parents_into(a, b, &mut scratch);
        assert_eq!(scratch.iter_set_bits(..).count(), 0);
        cnf.common_parents_into(a_nt, b_nt, &mut scratch);
        assert_eq!(scratch, cnf.common_parents(a_nt, b_nt));
        cnf.common_parents_into(a, b, &mut scratch);
        assert_eq!(scratch.iter_set_bits(..).count(), 0);
        assert_eq!(cnf.pp(), "S: A B\nA: \"a\"\nB: \"b\"\n");
    }

    #[test]
    fn test_root_moves_with_start() {
        let mut grm = BnfGrammar::new("S");
        grm.declare_terminal("a").unwrap();
        grm.add_rule(&"S", &["S", "S"]).unwrap();
        grm.add_rule(&"S", &["a"]).unwrap();
        let cnf = grm.normalize();
        let s = cnf.symbol_idx(&"S").unwrap();
        assert_ne!(cnf.start_idx(), s);
        assert_eq!(cnf.symbol_id(cnf.start_idx()), &SymbolId::Start(0));
        assert!(cnf.is_root(cnf.start_idx()));
        assert!(!cnf.is_root(s));
        assert_eq!(cnf.parents(cnf.start_idx()).iter_set_bits(..).count(), 0);
        for sidx in cnf.iter_sidxs() {
            for rule in cnf.rules(sidx) {
                match *rule {
                    CnfRule::Terminal(t) => assert!(cnf.is_terminal(t)),
                    CnfRule::Binary(l, r) => {
                        assert!(!cnf.is_terminal(l) && !cnf.is_terminal(r))
                    }
                }
            }
        }
    }
}
