use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::LogicError;
use crate::graph::{Automaton, Letter, StateId};

/// Disjoint sets of behaviorally indistinguishable states covering every
/// reachable state of `dfa`.
#[derive(Clone, Debug)]
pub struct EquivalenceClasses<'a> {
    dfa: &'a Automaton,
    classes: Vec<BTreeSet<StateId>>,
}

/// Myhill–Nerode classes of the states reachable from the entry of `dfa`.
pub fn equivalence_classes(dfa: &Automaton) -> Result<EquivalenceClasses<'_>, LogicError> {
    let reachable = reachable_states(dfa)?;

    if reachable.len() < 2 {
        return Ok(EquivalenceClasses::new(dfa, vec![reachable]));
    }

    let states: Vec<StateId> = reachable.into_iter().collect();
    let table = fill_table(dfa, &states)?;

    let mut groups = DisjointSets::new(states.len());
    for i in 1..states.len() {
        for j in 0..i {
            if !table.is_marked(i, j) {
                groups.union(i, j);
            }
        }
    }

    let mut by_root: BTreeMap<usize, BTreeSet<StateId>> = BTreeMap::new();
    for (i, &state) in states.iter().enumerate() {
        by_root.entry(groups.find(i)).or_default().insert(state);
    }
    let mut classes: Vec<BTreeSet<StateId>> = by_root.into_values().collect();
    classes.sort();

    debug!(
        "{} reachable DFA states fall into {} equivalence classes",
        states.len(),
        classes.len()
    );
    Ok(EquivalenceClasses::new(dfa, classes))
}

/// Depth-first walk over the DFA's own transitions.
fn reachable_states(dfa: &Automaton) -> Result<BTreeSet<StateId>, LogicError> {
    let entry = dfa.entry()?;
    let mut visited = BTreeSet::from([entry]);
    let mut stack = vec![entry];

    while let Some(cur) = stack.pop() {
        let state = dfa.state(cur)?;
        for &letter in dfa.alphabet() {
            if let Some(next) = state.single_destination(letter)? {
                if visited.insert(next) {
                    stack.push(next);
                }
            }
        }
    }

    Ok(visited)
}

/// Table filling over `states`. A marked pair is distinguishable.
fn fill_table(dfa: &Automaton, states: &[StateId]) -> Result<PairTable, LogicError> {
    let index_of: HashMap<StateId, usize> =
        states.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let letters: Vec<Letter> = dfa.alphabet().iter().copied().collect();

    // destinations[i][l] is the dense index of the destination of states[i] on letters[l]
    let mut destinations: Vec<Vec<Option<usize>>> = Vec::with_capacity(states.len());
    let mut exits = Vec::with_capacity(states.len());
    for &id in states {
        let state = dfa.state(id)?;
        let mut row = Vec::with_capacity(letters.len());
        for &letter in &letters {
            let next = state
                .single_destination(letter)?
                .map(|next| index_of.get(&next).copied().ok_or(LogicError::UnknownState(next)))
                .transpose()?;
            row.push(next);
        }
        destinations.push(row);
        exits.push(state.is_exit());
    }

    let mut table = PairTable::new(states.len());
    for i in 1..states.len() {
        for j in 0..i {
            if exits[i] != exits[j] {
                table.mark(i, j);
            }
        }
    }

    let mut pass = 0;
    loop {
        let mut flipped = 0;
        for i in 1..states.len() {
            for j in 0..i {
                if table.is_marked(i, j) {
                    continue;
                }
                let distinguishable = (0..letters.len()).any(|l| {
                    match (destinations[i][l], destinations[j][l]) {
                        (None, None) => false,
                        (Some(_), None) | (None, Some(_)) => true,
                        (Some(a), Some(b)) => table.is_marked(a, b),
                    }
                });
                if distinguishable {
                    table.mark(i, j);
                    flipped += 1;
                }
            }
        }
        pass += 1;
        trace!("table filling pass {pass}: {flipped} pairs became distinguishable");
        if flipped == 0 {
            break;
        }
    }

    Ok(table)
}

/// Symmetric relation over dense indices stored as a lower triangle.
struct PairTable {
    cells: Vec<bool>,
}

impl PairTable {
    fn new(size: usize) -> Self {
        Self {
            cells: vec![false; size * size.saturating_sub(1) / 2],
        }
    }

    fn offset(a: usize, b: usize) -> usize {
        let (hi, lo) = if a > b { (a, b) } else { (b, a) };
        hi * (hi - 1) / 2 + lo
    }

    fn is_marked(&self, a: usize, b: usize) -> bool {
        a != b && self.cells[Self::offset(a, b)]
    }

    fn mark(&mut self, a: usize, b: usize) {
        if a != b {
            self.cells[Self::offset(a, b)] = true;
        }
    }
}

struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

impl<'a> EquivalenceClasses<'a> {
    pub fn new(dfa: &'a Automaton, classes: Vec<BTreeSet<StateId>>) -> Self {
        Self { dfa, classes }
    }

    pub fn dfa(&self) -> &'a Automaton {
        self.dfa
    }

    pub fn classes(&self) -> &[BTreeSet<StateId>] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class_of(&self, state: StateId) -> Option<&BTreeSet<StateId>> {
        self.classes.iter().find(|class| class.contains(&state))
    }

    pub fn into_classes(self) -> Vec<BTreeSet<StateId>> {
        self.classes
    }

    /// Builds the minimized DFA: one state per class, starting from the class
    /// of the old entry.
    pub fn to_dfa(&self) -> Result<Automaton, LogicError> {
        let old_entry = self.find_entry()?;
        let mut rebuild = Rebuild {
            classes: self,
            minimized: Automaton::new(self.dfa.alphabet().clone()),
            old_to_new: HashMap::new(),
            pending: Vec::new(),
        };

        let entry = rebuild.reserve(old_entry)?;
        rebuild.minimized.mark_entry(entry)?;
        rebuild.wire()?;

        debug!(
            "minimized DFA: {} states from {} classes",
            rebuild.minimized.len(),
            self.classes.len()
        );
        Ok(rebuild.minimized)
    }

    fn find_entry(&self) -> Result<StateId, LogicError> {
        for &id in self.classes.iter().flatten() {
            if self.dfa.state(id)?.is_entry() {
                return Ok(id);
            }
        }
        Err(LogicError::EntryNotFound)
    }
}

struct Rebuild<'c, 'a> {
    classes: &'c EquivalenceClasses<'a>,
    minimized: Automaton,
    old_to_new: HashMap<StateId, StateId>,
    // old representative and the new state whose transitions are not wired yet
    pending: Vec<(StateId, StateId)>,
}

impl Rebuild<'_, '_> {
    /// Allocates the new state of `old`'s class and maps every member to it
    /// before any transition is followed, which breaks cycles.
    fn reserve(&mut self, old: StateId) -> Result<StateId, LogicError> {
        let class = self
            .classes
            .class_of(old)
            .ok_or(LogicError::StateNotInClasses(old))?;
        let merged = self.minimized.add_state();

        for &member in class {
            self.old_to_new.insert(member, merged);
            if self.classes.dfa.state(member)?.is_exit() {
                self.minimized.mark_exit(merged)?;
            }
        }

        self.pending.push((old, merged));
        Ok(merged)
    }

    fn wire(&mut self) -> Result<(), LogicError> {
        let dfa = self.classes.dfa;
        let letters: Vec<Letter> = dfa.alphabet().iter().copied().collect();

        while let Some((old, merged)) = self.pending.pop() {
            let state = dfa.state(old)?;
            for &letter in &letters {
                let Some(old_destination) = state.single_destination(letter)? else {
                    continue;
                };
                let destination = match self.old_to_new.get(&old_destination) {
                    Some(&known) => known,
                    None => self.reserve(old_destination)?,
                };
                self.minimized.add_transition(merged, letter, destination)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build_syntax_tree;
    use crate::dfa::build_dfa;
    use crate::graph::Alphabet;
    use crate::matcher::check_string;
    use crate::nfa::build_nfa;
    use rstest::rstest;

    fn dfa_of(pattern: &str) -> Automaton {
        build_dfa(&build_nfa(&build_syntax_tree(pattern).unwrap()).unwrap()).unwrap()
    }

    fn minimized(pattern: &str) -> Automaton {
        let dfa = dfa_of(pattern);
        equivalence_classes(&dfa).unwrap().to_dfa().unwrap()
    }

    /// 0 -a-> 1, 0 -b-> 2, 1 -a-> 1, 2 -a-> 2; 1 and 2 are exits.
    fn redundant_dfa() -> (Automaton, [StateId; 3]) {
        let mut dfa = Automaton::new(Alphabet::from([Letter::Char('a'), Letter::Char('b')]));
        let s = [dfa.add_state(), dfa.add_state(), dfa.add_state()];
        dfa.mark_entry(s[0]).unwrap();
        dfa.mark_exit(s[1]).unwrap();
        dfa.mark_exit(s[2]).unwrap();
        dfa.add_transition(s[0], Letter::Char('a'), s[1]).unwrap();
        dfa.add_transition(s[0], Letter::Char('b'), s[2]).unwrap();
        dfa.add_transition(s[1], Letter::Char('a'), s[1]).unwrap();
        dfa.add_transition(s[2], Letter::Char('a'), s[2]).unwrap();
        (dfa, s)
    }

    mod classes {
        use super::*;

        #[test]
        fn indistinguishable_states_share_a_class() {
            // given
            let (dfa, s) = redundant_dfa();

            // when
            let classes = equivalence_classes(&dfa).unwrap();

            // then
            assert_eq!(
                classes.classes(),
                &[BTreeSet::from([s[0]]), BTreeSet::from([s[1], s[2]])]
            );
        }

        #[test]
        fn missing_transition_distinguishes_states() {
            // given: 0 -a-> 1 -a-> 2, nothing leaves 2; 1 and 2 are exits
            let mut dfa = Automaton::new(Alphabet::from([Letter::Char('a')]));
            let s = [dfa.add_state(), dfa.add_state(), dfa.add_state()];
            dfa.mark_entry(s[0]).unwrap();
            dfa.mark_exit(s[1]).unwrap();
            dfa.mark_exit(s[2]).unwrap();
            dfa.add_transition(s[0], Letter::Char('a'), s[1]).unwrap();
            dfa.add_transition(s[1], Letter::Char('a'), s[2]).unwrap();

            // when
            let classes = equivalence_classes(&dfa).unwrap();

            // then
            assert_eq!(classes.len(), 3);
        }

        #[test]
        fn unreachable_states_are_left_out() {
            // given
            let (mut dfa, _) = redundant_dfa();
            let orphan = dfa.add_state();

            // when
            let classes = equivalence_classes(&dfa).unwrap();

            // then
            assert!(classes.class_of(orphan).is_none());
        }

        #[test]
        fn single_state_is_its_own_class() {
            // given
            let dfa = dfa_of("");

            // when
            let classes = equivalence_classes(&dfa).unwrap();

            // then
            assert_eq!(classes.len(), 1);
            assert_eq!(classes.classes()[0].len(), 1);
        }

        #[test]
        fn nondeterministic_automaton_is_rejected() {
            // given
            let nfa = build_nfa(&build_syntax_tree("a|ab").unwrap()).unwrap();

            // when
            let res = equivalence_classes(&nfa);

            // then
            assert!(matches!(res, Err(LogicError::NotDeterministic { .. })));
        }
    }

    mod rebuild {
        use super::*;

        #[test]
        fn classes_collapse_into_single_states() {
            // given
            let (dfa, _) = redundant_dfa();

            // when
            let minimized = equivalence_classes(&dfa).unwrap().to_dfa().unwrap();

            // then
            assert_eq!(minimized.len(), 2);
            assert_eq!(check_string("aaa", &minimized), Ok(true));
            assert_eq!(check_string("baa", &minimized), Ok(true));
            assert_eq!(check_string("", &minimized), Ok(false));
            assert_eq!(check_string("ab", &minimized), Ok(false));
        }

        #[test]
        fn missing_entry_is_a_logic_error() {
            // given
            let (dfa, s) = redundant_dfa();
            let classes = EquivalenceClasses::new(&dfa, vec![BTreeSet::from([s[1], s[2]])]);

            // when
            let res = classes.to_dfa();

            // then
            assert_eq!(res.unwrap_err(), LogicError::EntryNotFound);
        }

        #[test]
        fn destination_outside_classes_is_a_logic_error() {
            // given
            let (dfa, s) = redundant_dfa();
            let classes = EquivalenceClasses::new(&dfa, vec![BTreeSet::from([s[0], s[1]])]);

            // when
            let res = classes.to_dfa();

            // then
            assert_eq!(res.unwrap_err(), LogicError::StateNotInClasses(s[2]));
        }

        #[rstest]
        #[case("a|b", 2)]
        #[case("ab*", 2)]
        #[case("(a|b)*", 1)]
        #[case("a**", 1)]
        #[case("(a|b)*abb", 4)]
        #[case("", 1)]
        fn minimal_state_count(#[case] pattern: &str, #[case] count: usize) {
            assert_eq!(minimized(pattern).reachable().unwrap().len(), count);
        }

        #[rstest]
        #[case("a|b")]
        #[case("(a|b)*abb")]
        #[case("((a|b)(c|d)*)*e")]
        fn exactly_one_entry_survives(#[case] pattern: &str) {
            // when
            let minimized = minimized(pattern);

            // then
            let entries = minimized
                .reachable()
                .unwrap()
                .into_iter()
                .filter(|id| minimized.state(*id).unwrap().is_entry())
                .count();
            assert_eq!(entries, 1);
        }
    }

    mod pair_table {
        use super::*;

        #[test]
        fn marks_are_symmetric() {
            // given
            let mut table = PairTable::new(4);

            // when
            table.mark(3, 1);

            // then
            assert!(table.is_marked(1, 3));
            assert!(!table.is_marked(1, 2));
            assert!(!table.is_marked(3, 3));
        }
    }
}
