use log::debug;

use crate::ast::SyntaxNode;
use crate::error::LogicError;
use crate::graph::{Alphabet, Automaton, Letter, StateId};
use crate::token::Operator;

/// Thompson construction. The alphabet is every literal of the tree plus
/// epsilon; the result has a single entry and a single exit state, which
/// coincide for the empty tree.
pub fn build_nfa(tree: &SyntaxNode) -> Result<Automaton, LogicError> {
    let mut alphabet: Alphabet = tree.literals().into_iter().map(Letter::Char).collect();
    alphabet.insert(Letter::Epsilon);
    let mut nfa = Automaton::new(alphabet);

    if let SyntaxNode::Empty = tree {
        let state = nfa.add_state();
        nfa.mark_entry(state)?;
        nfa.mark_exit(state)?;
        return Ok(nfa);
    }

    let entry = nfa.add_state();
    let exit = nfa.add_state();
    nfa.mark_entry(entry)?;
    nfa.mark_exit(exit)?;
    connect(&mut nfa, entry, exit, tree)?;

    debug!(
        "built NFA: {} states, {} letters",
        nfa.len(),
        nfa.alphabet().len()
    );
    Ok(nfa)
}

/// Wires the language of `node` between `start` and `end`.
fn connect(
    nfa: &mut Automaton,
    start: StateId,
    end: StateId,
    node: &SyntaxNode,
) -> Result<(), LogicError> {
    let (operator, children) = match node {
        SyntaxNode::Empty => return Err(LogicError::MisplacedEmptyNode),
        SyntaxNode::Leaf(c) => return nfa.add_transition(start, Letter::Char(*c), end),
        SyntaxNode::Operator { operator, children } => (*operator, children),
    };

    if children.len() != operator.arity() {
        return Err(LogicError::ArityMismatch {
            operator: operator.into(),
            expected: operator.arity(),
            actual: children.len(),
        });
    }

    match operator {
        // both branches share the same ends
        Operator::Union => {
            connect(nfa, start, end, &children[0])?;
            connect(nfa, start, end, &children[1])
        }
        Operator::Concatenation => {
            let middle = nfa.add_state();
            connect(nfa, start, middle, &children[0])?;
            connect(nfa, middle, end, &children[1])
        }
        Operator::Star => {
            let body_start = nfa.add_state();
            let body_end = nfa.add_state();
            nfa.add_transition(start, Letter::Epsilon, body_start)?;
            // skips the body
            nfa.add_transition(start, Letter::Epsilon, end)?;
            // repeats the body
            nfa.add_transition(body_end, Letter::Epsilon, body_start)?;
            nfa.add_transition(body_end, Letter::Epsilon, end)?;
            connect(nfa, body_start, body_end, &children[0])
        }
    }
}
