/*! Human readable forms of every pipeline stage: syntax trees as ASCII trees,
automata as adjacency tables and equivalence classes as lists of sets. */

use ::ascii_tree::Tree;
use ::ascii_tree::Tree::{Leaf, Node};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::ast::SyntaxNode;
use crate::graph::{Automaton, Letter, State, StateId};
use crate::minimize::EquivalenceClasses;
use crate::token::Symbol;

const COLUMN_GAP: &str = "  ";

impl SyntaxNode {
    /// Returns a representation of the tree as an ASCII tree.
    pub fn ascii_tree(&self) -> Tree {
        match self {
            SyntaxNode::Empty => Leaf(vec![String::new()]),
            SyntaxNode::Leaf(c) => Leaf(vec![Symbol::Literal(*c).to_string()]),
            SyntaxNode::Operator { operator, children } => Node(
                operator.to_string(),
                children.iter().map(SyntaxNode::ascii_tree).collect(),
            ),
        }
    }
}

impl Display for SyntaxNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        ::ascii_tree::write_tree(f, &self.ascii_tree())
    }
}

fn header_label(letter: Letter) -> String {
    match letter {
        Letter::Char(c) => c.to_string(),
        // the epsilon column also holds the self-loops
        Letter::Epsilon => format!("{letter}*"),
    }
}

fn row_label(state: &State) -> String {
    let marker = match (state.is_entry(), state.is_exit()) {
        (true, true) => ">X",
        (true, false) => " >",
        (false, true) => " X",
        (false, false) => "  ",
    };
    format!("{marker}{}:", state.id())
}

fn cell(destinations: Option<&BTreeSet<StateId>>) -> String {
    match destinations {
        None => "-".to_owned(),
        Some(set) => set
            .iter()
            .map(StateId::to_string)
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Adjacency table: one column per letter, one row per reachable state.
impl Display for Automaton {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Display can't report a LogicError, so an automaton without an entry
        // is listed in full instead
        let ids: Vec<StateId> = match self.reachable() {
            Ok(reachable) => reachable.into_iter().collect(),
            Err(_) => self.states().map(State::id).collect(),
        };
        let states: Vec<&State> = self
            .states()
            .filter(|state| ids.contains(&state.id()))
            .collect();
        let letters: Vec<Letter> = self.alphabet().iter().copied().collect();

        let labels: Vec<String> = states.iter().map(|state| row_label(state)).collect();
        let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);

        if letters.is_empty() {
            for label in &labels {
                writeln!(f, "{label:>label_width$} -")?;
            }
            return Ok(());
        }

        let headers: Vec<String> = letters.iter().map(|l| header_label(*l)).collect();
        let rows: Vec<Vec<String>> = states
            .iter()
            .map(|state| letters.iter().map(|l| cell(state.destinations(*l))).collect())
            .collect();
        let widths: Vec<usize> = (0..letters.len())
            .map(|col| {
                rows.iter()
                    .map(|row| row[col].chars().count())
                    .chain([headers[col].chars().count()])
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write_row(f, ("", label_width), &headers, &widths)?;
        for (label, row) in labels.iter().zip(&rows) {
            write_row(f, (label.as_str(), label_width), row, &widths)?;
        }
        Ok(())
    }
}

/// The last cell is not padded, so rows carry no trailing spaces.
fn write_row(
    f: &mut Formatter<'_>,
    (label, label_width): (&str, usize),
    cells: &[String],
    widths: &[usize],
) -> std::fmt::Result {
    write!(f, "{label:>label_width$}")?;
    for (col, text) in cells.iter().enumerate() {
        if col + 1 == cells.len() {
            write!(f, "{COLUMN_GAP}{text}")?;
        } else {
            write!(f, "{COLUMN_GAP}{text:<width$}", width = widths[col])?;
        }
    }
    writeln!(f)
}

impl Display for EquivalenceClasses<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .classes()
            .iter()
            .map(|class| {
                let members: Vec<String> = class.iter().map(StateId::to_string).collect();
                format!("{{{}}}", members.join(", "))
            })
            .collect();
        write!(f, "{}", rendered.join(", "))
    }
}
