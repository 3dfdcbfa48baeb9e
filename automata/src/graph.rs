use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::LogicError;

static NEXT_ARENA: AtomicUsize = AtomicUsize::new(0);

/// Index of a state inside its [`Automaton`], tagged with the automaton that
/// allocated it. Indices are handed out from zero by every automaton, so an
/// id is only valid in the automaton (or the clones of it) it came from.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StateId {
    index: usize,
    arena: usize,
}

impl StateId {
    pub fn index(self) -> usize {
        self.index
    }
}

impl Display for StateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.index)
    }
}

/// A transition label. `Epsilon` sorts after every character.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Letter {
    Char(char),
    Epsilon,
}

impl Display for Letter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Letter::Char(c) => write!(f, "{c}"),
            Letter::Epsilon => write!(f, "ε"),
        }
    }
}

pub type Alphabet = BTreeSet<Letter>;

#[derive(Clone, Debug)]
pub struct State {
    id: StateId,
    is_entry: bool,
    is_exit: bool,
    transitions: BTreeMap<Letter, BTreeSet<StateId>>,
}

impl State {
    fn new(id: StateId) -> Self {
        Self {
            id,
            is_entry: false,
            is_exit: false,
            transitions: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn is_entry(&self) -> bool {
        self.is_entry
    }

    pub fn is_exit(&self) -> bool {
        self.is_exit
    }

    /// Destinations on `letter` ordered by id, `None` if there are none.
    pub fn destinations(&self, letter: Letter) -> Option<&BTreeSet<StateId>> {
        self.transitions.get(&letter).filter(|set| !set.is_empty())
    }

    pub fn transitions(&self) -> impl Iterator<Item = (Letter, &BTreeSet<StateId>)> {
        self.transitions
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(letter, set)| (*letter, set))
    }

    /// The only destination on `letter`, for states of a deterministic
    /// automaton.
    pub fn single_destination(&self, letter: Letter) -> Result<Option<StateId>, LogicError> {
        match self.destinations(letter) {
            None => Ok(None),
            Some(set) if set.len() == 1 => Ok(set.first().copied()),
            Some(set) => Err(LogicError::NotDeterministic {
                state: self.id,
                letter,
                count: set.len(),
            }),
        }
    }
}

/// Arena of states sharing one alphabet. States reference each other by
/// [`StateId`], so cycles need no shared ownership. The arena is also the
/// id counter of the build that fills it.
#[derive(Clone, Debug)]
pub struct Automaton {
    arena: usize,
    alphabet: Alphabet,
    states: Vec<State>,
    entry: Option<StateId>,
}

impl Automaton {
    pub fn new(alphabet: Alphabet) -> Self {
        Self {
            arena: NEXT_ARENA.fetch_add(1, Ordering::Relaxed),
            alphabet,
            states: Vec::new(),
            entry: None,
        }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn has_epsilon(&self) -> bool {
        self.alphabet.contains(&Letter::Epsilon)
    }

    /// Number of allocated states, reachable or not.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    /// Fails with `UnknownState` for ids allocated by another automaton,
    /// whether or not their index is in range here.
    pub fn state(&self, id: StateId) -> Result<&State, LogicError> {
        if id.arena != self.arena {
            return Err(LogicError::UnknownState(id));
        }
        self.states.get(id.index).ok_or(LogicError::UnknownState(id))
    }

    fn state_mut(&mut self, id: StateId) -> Result<&mut State, LogicError> {
        if id.arena != self.arena {
            return Err(LogicError::UnknownState(id));
        }
        self.states.get_mut(id.index).ok_or(LogicError::UnknownState(id))
    }

    pub fn entry(&self) -> Result<StateId, LogicError> {
        self.entry.ok_or(LogicError::MissingEntry)
    }

    /// Allocates a state with the next id. With epsilon in the alphabet the
    /// state gets its epsilon self-loop right away.
    pub fn add_state(&mut self) -> StateId {
        let id = StateId {
            index: self.states.len(),
            arena: self.arena,
        };
        let mut state = State::new(id);
        if self.has_epsilon() {
            state.transitions.entry(Letter::Epsilon).or_default().insert(id);
        }
        self.states.push(state);
        id
    }

    pub fn add_transition(
        &mut self,
        from: StateId,
        letter: Letter,
        to: StateId,
    ) -> Result<(), LogicError> {
        if !self.alphabet.contains(&letter) {
            return Err(LogicError::LetterOutsideAlphabet(letter));
        }
        self.state(to)?;
        self.state_mut(from)?
            .transitions
            .entry(letter)
            .or_default()
            .insert(to);
        Ok(())
    }

    /// Designates `id` as the only entry state.
    pub fn mark_entry(&mut self, id: StateId) -> Result<(), LogicError> {
        self.state_mut(id)?.is_entry = true;
        if let Some(previous) = self.entry.replace(id).filter(|prev| *prev != id) {
            self.state_mut(previous)?.is_entry = false;
        }
        Ok(())
    }

    pub fn mark_exit(&mut self, id: StateId) -> Result<(), LogicError> {
        self.state_mut(id)?.is_exit = true;
        Ok(())
    }

    /// All states reachable from `seeds` through epsilon transitions only,
    /// seeds included.
    pub fn epsilon_closure<I>(&self, seeds: I) -> Result<BTreeSet<StateId>, LogicError>
    where
        I: IntoIterator<Item = StateId>,
    {
        let mut reachable = BTreeSet::new();
        let mut queue: VecDeque<StateId> = VecDeque::new();

        for state in seeds {
            if reachable.insert(state) {
                queue.push_back(state);
            }
        }

        while let Some(cur) = queue.pop_front() {
            if let Some(destinations) = self.state(cur)?.destinations(Letter::Epsilon) {
                for &next in destinations {
                    if reachable.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        Ok(reachable)
    }

    /// States reachable from the entry over any letter, ordered by id.
    pub fn reachable(&self) -> Result<BTreeSet<StateId>, LogicError> {
        let entry = self.entry()?;
        let mut visited = BTreeSet::from([entry]);
        let mut stack = vec![entry];

        while let Some(cur) = stack.pop() {
            for (_, destinations) in self.state(cur)?.transitions() {
                for &next in destinations {
                    if visited.insert(next) {
                        stack.push(next);
                    }
                }
            }
        }

        Ok(visited)
    }

    /// True when no reachable state has epsilon transitions or more than one
    /// destination on a letter.
    pub fn is_deterministic(&self) -> Result<bool, LogicError> {
        for id in self.reachable()? {
            let state = self.state(id)?;
            let deterministic = state
                .transitions()
                .all(|(letter, set)| letter != Letter::Epsilon && set.len() <= 1);
            if !deterministic {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
