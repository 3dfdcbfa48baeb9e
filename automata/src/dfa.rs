use log::{debug, trace};
use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::error::LogicError;
use crate::graph::{Alphabet, Automaton, Letter, StateId};

/// Ids of the NFA states merged into one DFA state, sorted. Two closures with
/// the same combined id always map to the same DFA state.
type CombinedId = BTreeSet<StateId>;

/// Subset construction over epsilon closures. The DFA alphabet is the NFA
/// alphabet without epsilon.
pub fn build_dfa(nfa: &Automaton) -> Result<Automaton, LogicError> {
    let alphabet: Alphabet = nfa
        .alphabet()
        .iter()
        .copied()
        .filter(|letter| *letter != Letter::Epsilon)
        .collect();

    if alphabet.is_empty() {
        let mut dfa = Automaton::new(alphabet);
        let state = dfa.add_state();
        dfa.mark_entry(state)?;
        dfa.mark_exit(state)?;
        return Ok(dfa);
    }

    let dfa = SubsetBuilder::new(nfa, alphabet).build()?;
    debug!("built DFA: {} states from {} NFA states", dfa.len(), nfa.len());
    Ok(dfa)
}

struct SubsetBuilder<'a> {
    nfa: &'a Automaton,
    dfa: Automaton,
    merged: HashMap<CombinedId, StateId>,
    // merged states whose transitions are not wired yet
    pending: VecDeque<(StateId, CombinedId)>,
}

impl<'a> SubsetBuilder<'a> {
    fn new(nfa: &'a Automaton, alphabet: Alphabet) -> Self {
        Self {
            nfa,
            dfa: Automaton::new(alphabet),
            merged: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    fn build(mut self) -> Result<Automaton, LogicError> {
        let closure = self.nfa.epsilon_closure([self.nfa.entry()?])?;
        let entry = self.merge(closure)?;
        self.dfa.mark_entry(entry)?;

        let letters: Vec<Letter> = self.dfa.alphabet().iter().copied().collect();
        while let Some((state, members)) = self.pending.pop_front() {
            for &letter in &letters {
                let destinations = self.step(&members, letter)?;
                if destinations.is_empty() {
                    continue;
                }
                let target = match self.merged.get(&destinations) {
                    Some(&known) => known,
                    None => self.merge(destinations)?,
                };
                self.dfa.add_transition(state, letter, target)?;
            }
        }

        Ok(self.dfa)
    }

    /// Union of the epsilon closures of every destination reachable on
    /// `letter` from any of `members`.
    fn step(&self, members: &CombinedId, letter: Letter) -> Result<CombinedId, LogicError> {
        let mut res = BTreeSet::new();
        for &member in members {
            if let Some(destinations) = self.nfa.state(member)?.destinations(letter) {
                res.extend(self.nfa.epsilon_closure(destinations.iter().copied())?);
            }
        }
        Ok(res)
    }

    /// Allocates the DFA state for `members`. The memo entry is written before
    /// any successor is explored, so epsilon and star loops come back to it.
    fn merge(&mut self, members: CombinedId) -> Result<StateId, LogicError> {
        let state = self.dfa.add_state();
        for &member in &members {
            if self.nfa.state(member)?.is_exit() {
                self.dfa.mark_exit(state)?;
                break;
            }
        }
        trace!("DFA state #{state} merges {members:?}");
        self.merged.insert(members.clone(), state);
        self.pending.push_back((state, members));
        Ok(state)
    }
}
