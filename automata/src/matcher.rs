use log::trace;
use std::collections::BTreeSet;

use crate::error::LogicError;
use crate::graph::{Automaton, Letter, StateId};

/// Walks `dfa` from its entry one character at a time. The input is accepted
/// when every character has a transition and the walk ends on an exit state.
pub fn check_string(input: &str, dfa: &Automaton) -> Result<bool, LogicError> {
    let mut current = dfa.entry()?;

    for c in input.chars() {
        match dfa.state(current)?.single_destination(Letter::Char(c))? {
            Some(next) => current = next,
            None => {
                trace!("no transition from #{current} on '{c}'");
                return Ok(false);
            }
        }
    }

    Ok(dfa.state(current)?.is_exit())
}

/// Runs `nfa` on `input` by tracking the epsilon closure of every state it
/// can be in.
pub fn simulate(nfa: &Automaton, input: &str) -> Result<bool, LogicError> {
    let mut current = nfa.epsilon_closure([nfa.entry()?])?;

    for c in input.chars() {
        let mut next_after_char: BTreeSet<StateId> = BTreeSet::new();
        for &state in &current {
            if let Some(destinations) = nfa.state(state)?.destinations(Letter::Char(c)) {
                next_after_char.extend(destinations);
            }
        }

        current = nfa.epsilon_closure(next_after_char)?;
        if current.is_empty() {
            return Ok(false);
        }
    }

    for state in current {
        if nfa.state(state)?.is_exit() {
            return Ok(true);
        }
    }
    Ok(false)
}
