#![deny(unreachable_pub)]

pub mod grammar;
mod normalize;

pub use self::grammar::{BnfGrammar, BnfGrammarError, BnfGrammarErrorKind};
