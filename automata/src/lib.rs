/*! Regular expression to minimal DFA pipeline.

A pattern over literal characters, `|`, `*`, groups and `\` escapes is parsed
into a [`SyntaxNode`] tree, turned into an epsilon NFA by Thompson
construction, determinized by subset construction and minimized by table
filling. Every stage is a plain function over the previous stage's output;
[`Regex`] runs them all at once and keeps the intermediate results.
*/

use std::collections::BTreeSet;

pub use ast::{build_syntax_tree, SyntaxNode};
pub use dfa::build_dfa;
pub use error::{Error, LogicError, SyntaxError, SyntaxErrorKind};
pub use graph::{Alphabet, Automaton, Letter, State, StateId};
pub use matcher::{check_string, simulate};
pub use minimize::{equivalence_classes, EquivalenceClasses};
pub use nfa::build_nfa;
pub use token::{Operator, Symbol, CONCATENATION_CHAR, ESCAPE_CHAR};

mod ast;
mod dfa;
mod error;
mod graph;
mod matcher;
mod minimize;
mod nfa;
mod render;
mod token;

/// A compiled pattern together with every intermediate stage.
#[derive(Clone, Debug)]
pub struct Regex {
    tree: SyntaxNode,
    nfa: Automaton,
    dfa: Automaton,
    classes: Vec<BTreeSet<StateId>>,
    minimized: Automaton,
}

impl Regex {
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let tree = build_syntax_tree(pattern)?;
        let nfa = build_nfa(&tree)?;
        let dfa = build_dfa(&nfa)?;
        let (classes, minimized) = {
            let classes = equivalence_classes(&dfa)?;
            let minimized = classes.to_dfa()?;
            (classes.into_classes(), minimized)
        };

        Ok(Self {
            tree,
            nfa,
            dfa,
            classes,
            minimized,
        })
    }

    /// True when the whole of `s` belongs to the language of the pattern.
    pub fn is_exact_match(&self, s: &str) -> Result<bool, LogicError> {
        check_string(s, &self.minimized)
    }

    pub fn syntax_tree(&self) -> &SyntaxNode {
        &self.tree
    }

    pub fn nfa(&self) -> &Automaton {
        &self.nfa
    }

    pub fn dfa(&self) -> &Automaton {
        &self.dfa
    }

    /// Classes over the states of [`Regex::dfa`].
    pub fn equivalence_classes(&self) -> EquivalenceClasses<'_> {
        EquivalenceClasses::new(&self.dfa, self.classes.clone())
    }

    pub fn minimized_dfa(&self) -> &Automaton {
        &self.minimized
    }
}
