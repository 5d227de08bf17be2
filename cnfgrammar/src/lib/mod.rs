#![forbid(unsafe_code)]

//! A library for building context free grammars in Backus-Naur Form (BNF) and converting them
//! into Chomsky Normal Form (CNF), ready to be handed to a CYK parser such as `cykpar`.
//!
//! We use the following terminology:
//!
//!   * A *symbol* is either a *terminal* (which can never be rewritten) or a *non-terminal*
//!     (which owns zero or more rules).
//!   * A *rule* is an ordered, non-empty sequence of symbols that a non-terminal may produce.
//!   * The *parents* of a symbol are the non-terminals with at least one rule producing it.
//!   * A *tag* is the caller-visible value attached to a symbol in the finished CNF grammar.
//!
//! For example, in the following grammar:
//!
//! ```text
//!   S: A "b" | "c";
//!   A: "a";
//! ```
//!
//! there are two non-terminals (`S`, `A`), three terminals (`a`, `b`, `c`) and three rules;
//! the parents of `b` are `{S}`.
//!
//! cnfgrammar makes the following guarantees about grammars:
//!
//!   * Symbols are numbered from `0` to `symbols_len() - 1` (inclusive) and a symbol's
//!     [`SymIdx`] never changes, even as the normaliser adds new symbols.
//!   * The parent relation is always the exact reflection of the rules: `P` is a parent of `s`
//!     if, and only if, at least one of `P`'s rules contains `s`.
//!   * Symbols created by the normaliser live in their own namespaces (see [`SymbolId`]), so
//!     they can never clash with user symbols (or each other).
//!
//! The main entry points are [`BnfGrammar::new`] and [`BnfGrammar::normalize`]:
//!
//! ```
//! use cnfgrammar::BnfGrammar;
//!
//! let mut grm = BnfGrammar::new("S");
//! grm.declare_terminal("a").unwrap();
//! grm.declare_terminal("b").unwrap();
//! grm.add_rule(&"S", &["a", "S", "b"]).unwrap();
//! grm.add_rule(&"S", &["a", "b"]).unwrap();
//! let cnf = grm.normalize();
//! assert!(grm.is_cnf());
//! assert!(cnf.rules_len() > 2);
//! ```

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod bnf;
pub mod cnf;
mod idxnewtype;

pub use crate::{
    bnf::{BnfGrammar, BnfGrammarError, BnfGrammarErrorKind},
    cnf::{CnfGrammar, CnfRule},
    idxnewtype::SymIdx,
};

/// The identity of a symbol. Callers only ever create `User` symbols: `Synthetic` and `Start`
/// identities are allocated by the normaliser from two independently advancing counters, so the
/// three namespaces are disjoint by construction.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SymbolId<Id> {
    User(Id),
    /// An intermediate non-terminal introduced by the TERM or BIN steps.
    Synthetic(u32),
    /// A start symbol introduced by the START step.
    Start(u32),
}

impl<Id> SymbolId<Id> {
    /// Return the user identity of this symbol, or `None` if it was created by the normaliser.
    pub fn user(&self) -> Option<&Id> {
        match self {
            SymbolId::User(id) => Some(id),
            SymbolId::Synthetic(_) | SymbolId::Start(_) => None,
        }
    }
}

/// User identities which would print like a normaliser symbol (or like an escaped identity) are
/// prefixed with `\\`, so `User("~0")` prints as `\\~0` and never as `Synthetic(0)`'s `~0`.
impl<Id: fmt::Display> fmt::Display for SymbolId<Id> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SymbolId::User(id) => {
                let s = id.to_string();
                if s.starts_with(['~', '^', '\\']) {
                    write!(f, "\\{}", s)
                } else {
                    f.write_str(&s)
                }
            }
            SymbolId::Synthetic(n) => write!(f, "~{}", n),
            SymbolId::Start(n) => write!(f, "^{}", n),
        }
    }
}

/// The caller-visible value attached to a symbol of a [`CnfGrammar`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Tag<TagT> {
    /// The grammar's start symbol. Exactly one symbol of a `CnfGrammar` has this tag.
    Root,
    /// A tag assigned by the caller with [`BnfGrammar::assign_tag`].
    User(TagT),
    /// A tag assigned automatically to a symbol the caller did not tag.
    Auto(u32),
}

impl<TagT> Tag<TagT> {
    pub fn is_root(&self) -> bool {
        matches!(self, Tag::Root)
    }

    /// Return the caller's payload, or `None` for root and automatic tags.
    pub fn user(&self) -> Option<&TagT> {
        match self {
            Tag::User(t) => Some(t),
            Tag::Root | Tag::Auto(_) => None,
        }
    }
}

impl<TagT: fmt::Display> fmt::Display for Tag<TagT> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Tag::Root => write!(f, "<root>"),
            Tag::User(t) => write!(f, "{}", t),
            Tag::Auto(n) => write!(f, "#{}", n),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{SymbolId, Tag};

    #[test]
    fn test_symbol_id_namespaces() {
        let u: SymbolId<u32> = SymbolId::User(0);
        assert_ne!(u, SymbolId::Synthetic(0));
        assert_ne!(u, SymbolId::Start(0));
        assert_ne!(SymbolId::<u32>::Synthetic(0), SymbolId::Start(0));
        assert_eq!(u.user(), Some(&0));
        assert_eq!(SymbolId::<u32>::Start(3).user(), None);
        assert_eq!(SymbolId::User("S").to_string(), "S");
        assert_eq!(SymbolId::<&str>::Synthetic(2).to_string(), "~2");
        assert_eq!(SymbolId::<&str>::Start(0).to_string(), "^0");
    }

    #[test]
    fn test_symbol_id_display_escapes() {
        assert_eq!(SymbolId::User("~0").to_string(), "\\~0");
        assert_eq!(SymbolId::User("^1").to_string(), "\\^1");
        assert_eq!(SymbolId::User("\\x").to_string(), "\\\\x");
        assert_eq!(SymbolId::User("a~").to_string(), "a~");
        assert_ne!(
            SymbolId::User("~0").to_string(),
            SymbolId::<&str>::Synthetic(0).to_string()
        );
    }

    #[test]
    fn test_tags() {
        assert!(Tag::<&str>::Root.is_root());
        assert!(!Tag::User("x").is_root());
        assert_eq!(Tag::User("x").user(), Some(&"x"));
        assert_eq!(Tag::<&str>::Auto(1).user(), None);
        assert_eq!(Tag::<&str>::Auto(1).to_string(), "#1");
    }
}
