#![forbid(unsafe_code)]

//! `cykpar` recognises and parses input against a grammar in Chomsky Normal Form using the
//! Cocke-Younger-Kasami (CYK) algorithm. Grammars are built and normalised with `cnfgrammar`:
//!
//! ```
//! use cnfgrammar::BnfGrammar;
//!
//! let mut grm = BnfGrammar::new("S");
//! grm.declare_nonterminal("A").unwrap();
//! grm.declare_terminal("a").unwrap();
//! grm.declare_terminal("b").unwrap();
//! grm.add_rule(&"S", &["A", "b"]).unwrap();
//! grm.add_rule(&"A", &["a"]).unwrap();
//! grm.add_rule(&"A", &["a", "A"]).unwrap();
//! let cnf = grm.normalize();
//!
//! assert!(cykpar::recognize(&cnf, &["a", "a", "b"]));
//! assert!(!cykpar::recognize(&cnf, &["b"]));
//! let forest = cykpar::parse(&cnf, &["a", "b"]);
//! assert_eq!(forest.count_trees(), 1);
//! ```
//!
//! CYK is exhaustive: every way of deriving every span is kept, so [`parse`] returns a
//! [`ParseForest`] from which every tree of an ambiguous input can be recovered. Trees are over
//! the normalised grammar, so they include any symbols `cnfgrammar` introduced.

use std::hash::Hash;

use cnfgrammar::CnfGrammar;
use num_traits::{AsPrimitive, PrimInt, Unsigned};

mod forest;
mod parser;
mod table;

pub use crate::{
    forest::{Node, ParseForest, Witness},
    parser::CykParserBuilder,
    table::CykTable,
};

/// Is `input` in the language of `grm`? Empty input is never accepted.
pub fn recognize<Id: Clone + Eq + Hash, TagT, StorageT: 'static + Hash + PrimInt + Unsigned>(
    grm: &CnfGrammar<Id, TagT, StorageT>,
    input: &[Id],
) -> bool
where
    usize: AsPrimitive<StorageT>,
{
    CykParserBuilder::new(grm).recognize(input)
}

/// Build the parse forest of `input` against `grm`. The forest is empty if, and only if,
/// [`recognize`] would return `false`.
pub fn parse<Id: Clone + Eq + Hash, TagT, StorageT: 'static + Hash + PrimInt + Unsigned>(
    grm: &CnfGrammar<Id, TagT, StorageT>,
    input: &[Id],
) -> ParseForest<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    CykParserBuilder::new(grm).parse(input)
}
