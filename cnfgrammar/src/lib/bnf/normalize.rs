//! Conversion of a [`BnfGrammar`] into Chomsky Normal Form.
//!
//! The classical conversion runs five steps (START, TERM, BIN, DEL, UNIT). A later step can
//! re-introduce something an earlier one got rid of, so rather than running them once we keep
//! running all five until the grammar is in CNF and the start symbol does not occur on the
//! right-hand side of any rule.

use std::hash::Hash;

use indexmap::IndexSet;
use log::{debug, trace};
use num_traits::{AsPrimitive, PrimInt, Unsigned};

use super::grammar::BnfGrammar;
use crate::{CnfGrammar, SymIdx};

impl<Id: Clone + Eq + Hash, TagT, StorageT: 'static + Hash + PrimInt + Unsigned>
    BnfGrammar<Id, TagT, StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Convert this grammar, in place, into Chomsky Normal Form and return the resulting
    /// [`CnfGrammar`]. The language of the grammar is unchanged.
    ///
    /// Every symbol without a caller-assigned tag is given a `Tag::Auto` value, and the (possibly
    /// new) start symbol is given `Tag::Root`. Normalising a grammar which is already normalised
    /// leaves it unchanged.
    pub fn normalize(&mut self) -> CnfGrammar<Id, TagT, StorageT>
    where
        TagT: Clone,
    {
        let mut passes = 0;
        while !self.is_cnf() || self.start_occurs_on_right() {
            passes += 1;
            debug!(
                "Normalization pass {}: {} symbols, {} rules",
                passes,
                self.symbols.len(),
                self.rules_len()
            );
            self.conversion_start();
            self.conversion_term();
            self.conversion_bin();
            self.conversion_del();
            self.conversion_unit();
        }
        debug!(
            "Grammar normalized after {} passes: {} symbols, {} rules",
            passes,
            self.symbols.len(),
            self.rules_len()
        );
        CnfGrammar::from_bnf(self)
    }

    /// Is every rule in this grammar in Chomsky Normal Form i.e. is every rule either a single
    /// terminal or a pair of non-terminals?
    pub fn is_cnf(&self) -> bool {
        self.symbols.iter().all(|sym| {
            sym.rules.iter().all(|rule| match rule.as_slice() {
                [t] => self.is_terminal(*t),
                [l, r] => !self.is_terminal(*l) && !self.is_terminal(*r),
                _ => false,
            })
        })
    }

    /// Does the current start symbol occur on the right-hand side of any rule?
    pub fn start_occurs_on_right(&self) -> bool {
        // The parents of a symbol are exactly the symbols with a rule producing it.
        self.parents(self.start).next().is_some()
    }

    fn is_unit_rule(&self, rule: &[SymIdx<StorageT>]) -> bool {
        matches!(rule, [m] if !self.is_terminal(*m))
    }

    /// Collect the rules of `sidx` which satisfy `pred`.
    fn rules_where<F>(&self, sidx: SymIdx<StorageT>, pred: F) -> Vec<Vec<SymIdx<StorageT>>>
    where
        F: Fn(&[SymIdx<StorageT>]) -> bool,
    {
        self.symbols[usize::from(sidx)]
            .rules
            .iter()
            .filter(|r| pred(r.as_slice()))
            .cloned()
            .collect()
    }

    /// START: if the start symbol occurs on the right-hand side of a rule, add a new start
    /// symbol `^n: S` (where `S` is the old start symbol).
    pub(crate) fn conversion_start(&mut self) {
        if self.start_occurs_on_right() {
            let old = self.start;
            let new = self.fresh_start();
            self.insert_rule(new, vec![old]);
            self.start = new;
            trace!("START: new start symbol {}", usize::from(new));
        }
    }

    /// TERM: in every rule with more than one member, replace each terminal `t` with a fresh
    /// non-terminal `~n` which has the sole rule `~n: t`.
    pub(crate) fn conversion_term(&mut self) {
        // Symbols created below only have single-terminal rules, so we needn't visit them.
        let sidxs = self.iter_sidxs().collect::<Vec<_>>();
        for sidx in sidxs {
            let old_rules = self.rules_where(sidx, |rule| {
                rule.len() > 1 && rule.iter().any(|&m| self.is_terminal(m))
            });
            for rule in old_rules {
                let mut new_rule = Vec::with_capacity(rule.len());
                for &m in &rule {
                    if self.is_terminal(m) {
                        let repl = self.fresh_synthetic();
                        self.insert_rule(repl, vec![m]);
                        new_rule.push(repl);
                    } else {
                        new_rule.push(m);
                    }
                }
                self.insert_rule(sidx, new_rule);
                self.remove_rule(sidx, &rule);
            }
        }
    }

    /// BIN: replace every rule `P: s1 s2 ... sk` with k > 2 with the right-branching chain
    /// `P: s1 ~a`, `~a: s2 ~b`, ..., `~z: s(k-1) sk`.
    pub(crate) fn conversion_bin(&mut self) {
        let sidxs = self.iter_sidxs().collect::<Vec<_>>();
        for sidx in sidxs {
            for rule in self.rules_where(sidx, |rule| rule.len() > 2) {
                let mut head = sidx;
                for &m in &rule[..rule.len() - 2] {
                    let next = self.fresh_synthetic();
                    self.insert_rule(head, vec![m, next]);
                    head = next;
                }
                self.insert_rule(head, rule[rule.len() - 2..].to_vec());
                self.remove_rule(sidx, &rule);
            }
        }
    }

    /// DEL: a no-op, since `add_rule` refuses empty rules.
    pub(crate) fn conversion_del(&mut self) {
        debug_assert!(self
            .symbols
            .iter()
            .all(|sym| sym.rules.iter().all(|rule| !rule.is_empty())));
    }

    /// UNIT: for every non-terminal `P`, find every non-terminal `Q` reachable from `P` through
    /// unit rules alone; copy each of `Q`'s non-unit rules to `P`; then remove `P`'s unit rules.
    pub(crate) fn conversion_unit(&mut self) {
        let mut inlines = Vec::new();
        for sidx in self.iter_sidxs() {
            let reachable = self.unit_closure(sidx);
            if reachable.is_empty() {
                continue;
            }
            let mut rules = Vec::new();
            for &q in &reachable {
                rules.extend(self.rules_where(q, |rule| !self.is_unit_rule(rule)));
            }
            inlines.push((sidx, rules));
        }
        for (sidx, rules) in inlines {
            let units = self.rules_where(sidx, |rule| self.is_unit_rule(rule));
            // Add before removing, so that a unit target which is also produced by one of the
            // inlined rules keeps `sidx` as a parent.
            for rule in rules {
                self.insert_rule(sidx, rule);
            }
            for rule in units {
                self.remove_rule(sidx, &rule);
            }
        }
    }

    /// Return the non-terminals reachable from `sidx` by following one or more unit rules.
    fn unit_closure(&self, sidx: SymIdx<StorageT>) -> IndexSet<SymIdx<StorageT>> {
        let mut seen = IndexSet::new();
        let mut todo = vec![sidx];
        while let Some(p) = todo.pop() {
            for rule in self.rules(p) {
                if self.is_unit_rule(rule) && seen.insert(rule[0]) {
                    todo.push(rule[0]);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use crate::{bnf::BnfGrammar, SymIdx, SymbolId};

    fn sidx(grm: &BnfGrammar<&'static str>, n: &'static str) -> SymIdx<u32> {
        grm.symbol_idx(&n).unwrap()
    }

    #[test]
    fn test_is_cnf() {
        let mut grm = BnfGrammar::new("S");
        grm.declare_nonterminal("A").unwrap();
        grm.declare_nonterminal("B").unwrap();
        grm.declare_terminal("a").unwrap();
        grm.add_rule(&"S", &["A", "B"]).unwrap();
        grm.add_rule(&"A", &["a"]).unwrap();
        assert!(grm.is_cnf());
        grm.add_rule(&"B", &["A"]).unwrap();
        assert!(!grm.is_cnf());

        let mut grm = BnfGrammar::new("S");
        grm.declare_nonterminal("A").unwrap();
        grm.declare_terminal("a").unwrap();
        grm.add_rule(&"S", &["A", "a"]).unwrap();
        assert!(!grm.is_cnf());
    }

    #[test]
    fn test_start() {
        let mut grm = BnfGrammar::new("S");
        grm.declare_terminal("a").unwrap();
        grm.add_rule(&"S", &["a"]).unwrap();
        grm.conversion_start();
        assert_eq!(grm.symbol_id(grm.start_idx()), &SymbolId::User("S"));

        grm.add_rule(&"S", &["S", "S"]).unwrap();
        grm.conversion_start();
        let start = grm.start_idx();
        assert_eq!(grm.symbol_id(start), &SymbolId::Start(0));
        assert!(grm.has_rule(start, &[sidx(&grm, "S")]));
        assert!(!grm.start_occurs_on_right());
        grm.assert_parents_consistent();
    }

    #[test]
    fn test_term() {
        let mut grm = BnfGrammar::new("S");
        grm.declare_nonterminal("A").unwrap();
        grm.declare_terminal("a").unwrap();
        grm.declare_terminal("b").unwrap();
        grm.add_rule(&"S", &["A", "b", "A", "b"]).unwrap();
        grm.add_rule(&"S", &["a"]).unwrap();
        grm.add_rule(&"A", &["a", "b"]).unwrap();
        grm.conversion_term();
        grm.assert_parents_consistent();

        let s = sidx(&grm, "S");
        let a_nt = sidx(&grm, "A");
        let a = sidx(&grm, "a");
        let b = sidx(&grm, "b");
        // The single terminal rule is left alone.
        assert!(grm.has_rule(s, &[a]));
        assert_eq!(grm.rules(s).count(), 2);
        let long = grm.rules(s).find(|r| r.len() == 4).unwrap().to_vec();
        assert_eq!(long[0], a_nt);
        assert_eq!(long[2], a_nt);
        for i in [1, 3] {
            assert!(matches!(grm.symbol_id(long[i]), SymbolId::Synthetic(_)));
            assert_eq!(grm.rules(long[i]).collect::<Vec<_>>(), vec![&[b][..]]);
        }
        assert_ne!(long[1], long[3]);
        // b is now only produced by the synthetic symbols.
        assert!(grm.parents(b).all(|p| p != s && p != a_nt));
        assert_eq!(grm.parents(b).count(), 3);
        assert!(grm.parents(a).any(|p| p == s));
        assert!(grm.rules(a_nt).all(|r| r.iter().all(|&m| !grm.is_terminal(m))));
    }

    #[test]
    fn test_bin() {
        let mut grm = BnfGrammar::new("S");
        for n in ["A", "B", "C", "D"] {
            grm.declare_nonterminal(n).unwrap();
        }
        grm.add_rule(&"S", &["A", "B", "C", "D"]).unwrap();
        grm.conversion_bin();
        grm.assert_parents_consistent();

        let s = sidx(&grm, "S");
        let rules = grm.rules(s).collect::<Vec<_>>();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0][0], sidx(&grm, "A"));
        let x = rules[0][1];
        assert_eq!(grm.symbol_id(x), &SymbolId::Synthetic(0));
        let rules = grm.rules(x).collect::<Vec<_>>();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0][0], sidx(&grm, "B"));
        let y = rules[0][1];
        assert_eq!(grm.symbol_id(y), &SymbolId::Synthetic(1));
        assert!(grm.has_rule(y, &[sidx(&grm, "C"), sidx(&grm, "D")]));
        // S no longer produces B, C, or D directly.
        assert_eq!(grm.parents(sidx(&grm, "D")).collect::<Vec<_>>(), vec![y]);
        assert_eq!(grm.parents(sidx(&grm, "B")).collect::<Vec<_>>(), vec![x]);
        assert_eq!(grm.parents(sidx(&grm, "A")).collect::<Vec<_>>(), vec![s]);
    }

    #[test]
    fn test_unit() {
        let mut grm = BnfGrammar::new("S");
        grm.declare_nonterminal("X").unwrap();
        grm.declare_terminal("a").unwrap();
        grm.add_rule(&"S", &["X"]).unwrap();
        grm.add_rule(&"X", &["a"]).unwrap();
        grm.conversion_unit();
        grm.assert_parents_consistent();

        let s = sidx(&grm, "S");
        let x = sidx(&grm, "X");
        let a = sidx(&grm, "a");
        assert_eq!(grm.rules(s).collect::<Vec<_>>(), vec![&[a][..]]);
        assert_eq!(grm.parents(x).count(), 0);
        assert_eq!(grm.parents(a).collect::<HashSet<_>>(), HashSet::from([s, x]));
    }

    #[test]
    fn test_unit_shared_target_and_cycle() {
        let mut grm = BnfGrammar::new("S");
        for n in ["A", "B", "C"] {
            grm.declare_nonterminal(n).unwrap();
        }
        grm.declare_terminal("a").unwrap();
        grm.declare_terminal("b").unwrap();
        // A and B reach each other through unit rules; both S and C reach them.
        grm.add_rule(&"S", &["A"]).unwrap();
        grm.add_rule(&"S", &["A", "C"]).unwrap();
        grm.add_rule(&"C", &["B"]).unwrap();
        grm.add_rule(&"A", &["B"]).unwrap();
        grm.add_rule(&"B", &["A"]).unwrap();
        grm.add_rule(&"A", &["a"]).unwrap();
        grm.add_rule(&"B", &["b"]).unwrap();
        grm.conversion_unit();
        grm.assert_parents_consistent();

        let a = sidx(&grm, "a");
        let b = sidx(&grm, "b");
        let a_nt = sidx(&grm, "A");
        let c = sidx(&grm, "C");
        for n in ["S", "A", "B", "C"] {
            let p = sidx(&grm, n);
            assert!(grm.has_rule(p, &[a]), "{} lost a", n);
            assert!(grm.has_rule(p, &[b]), "{} lost b", n);
            assert!(grm.rules(p).all(|r| !grm.is_unit_rule(r)));
        }
        let s = sidx(&grm, "S");
        assert!(grm.has_rule(s, &[a_nt, c]));
        // S still produces A through `S: A C`.
        assert_eq!(grm.parents(a_nt).collect::<Vec<_>>(), vec![s]);
    }

    #[test]
    fn test_normalize() {
        let mut grm = BnfGrammar::new("S");
        for n in ["A", "B"] {
            grm.declare_nonterminal(n).unwrap();
        }
        for n in ["a", "b", "c"] {
            grm.declare_terminal(n).unwrap();
        }
        grm.add_rule(&"S", &["a", "S", "b", "A"]).unwrap();
        grm.add_rule(&"S", &["B"]).unwrap();
        grm.add_rule(&"A", &["a", "b", "c"]).unwrap();
        grm.add_rule(&"A", &["B"]).unwrap();
        grm.add_rule(&"B", &["c"]).unwrap();
        let user_ids = grm
            .iter_sidxs()
            .map(|s| grm.symbol_id(s).clone())
            .collect::<Vec<_>>();

        grm.normalize();
        assert!(grm.is_cnf());
        assert!(!grm.start_occurs_on_right());
        assert_eq!(grm.symbol_id(grm.start_idx()), &SymbolId::Start(0));
        grm.assert_parents_consistent();

        // User symbols keep their indices; every new symbol is distinct.
        for (i, id) in user_ids.iter().enumerate() {
            assert_eq!(grm.symbol_id(SymIdx(i as u32)), id);
        }
        let ids = grm.iter_sidxs().map(|s| grm.symbol_id(s)).collect::<HashSet<_>>();
        assert_eq!(ids.len(), usize::from(grm.symbols_len()));
        for sidx in grm.iter_sidxs().skip(user_ids.len()) {
            assert!(grm.symbol_id(sidx).user().is_none());
        }
    }

    #[test]
    fn test_normalize_idempotent() {
        let mut grm = BnfGrammar::new("S");
        grm.declare_nonterminal("A").unwrap();
        grm.declare_terminal("a").unwrap();
        grm.add_rule(&"S", &["A", "a", "A"]).unwrap();
        grm.add_rule(&"A", &["S"]).unwrap();
        grm.add_rule(&"A", &["a"]).unwrap();
        grm.normalize();
        let pp = grm.pp();
        let symbols_len = grm.symbols_len();
        grm.normalize();
        assert_eq!(grm.pp(), pp);
        assert_eq!(grm.symbols_len(), symbols_len);
    }

    #[test]
    fn test_normalize_terminal_pair() {
        let mut grm = BnfGrammar::new("S");
        grm.declare_terminal("a").unwrap();
        grm.declare_terminal("b").unwrap();
        grm.add_rule(&"S", &["a", "b"]).unwrap();
        grm.normalize();
        assert!(grm.is_cnf());
        let s = grm.start_idx();
        let rules = grm.rules(s).collect::<Vec<_>>();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].iter().all(|&m| !grm.is_terminal(m)));
    }
}
