#[cfg(test)]
use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::token::{Operator, Symbol, Token, TokenSequence};

#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(test, derive(Serialize))]
pub enum SyntaxNode {
    /// Tree of the empty pattern, matches only the empty string.
    Empty,
    Leaf(char),
    Operator {
        operator: Operator,
        children: Vec<SyntaxNode>,
    },
}

impl SyntaxNode {
    pub fn unary(operator: Operator, child: SyntaxNode) -> Self {
        SyntaxNode::Operator {
            operator,
            children: vec![child],
        }
    }

    pub fn binary(operator: Operator, left: SyntaxNode, right: SyntaxNode) -> Self {
        SyntaxNode::Operator {
            operator,
            children: vec![left, right],
        }
    }

    pub fn children(&self) -> &[SyntaxNode] {
        match self {
            SyntaxNode::Operator { children, .. } => children,
            SyntaxNode::Empty | SyntaxNode::Leaf(_) => &[],
        }
    }

    /// Every character appearing at a leaf.
    pub fn literals(&self) -> BTreeSet<char> {
        let mut res = BTreeSet::new();
        self.collect_literals(&mut res);
        res
    }

    fn collect_literals(&self, res: &mut BTreeSet<char>) {
        match self {
            SyntaxNode::Empty => {}
            SyntaxNode::Leaf(c) => {
                res.insert(*c);
            }
            SyntaxNode::Operator { children, .. } => {
                children.iter().for_each(|child| child.collect_literals(res))
            }
        }
    }

    pub(crate) fn from_tokens(tokens: &[Token]) -> Result<Self, SyntaxError> {
        if tokens.is_empty() {
            return Ok(SyntaxNode::Empty);
        }
        TreeBuilder { tokens }.build(0, tokens.len())
    }
}

/// Tokenizes and parses `pattern`. Union splits the tree first, then
/// concatenation, and star binds tightest.
pub fn build_syntax_tree(pattern: &str) -> Result<SyntaxNode, SyntaxError> {
    if pattern.is_empty() {
        return Ok(SyntaxNode::Empty);
    }

    let mut seq = TokenSequence::try_from(pattern)?;
    seq.preprocess()?;

    if seq.is_empty() {
        return Err(SyntaxError::new(SyntaxErrorKind::EmptyPattern, 0));
    }

    let tree = SyntaxNode::from_tokens(seq.as_slice())?;
    log::debug!("parsed '{pattern}' as '{seq}'");
    Ok(tree)
}

struct TreeBuilder<'a> {
    tokens: &'a [Token],
}

impl TreeBuilder<'_> {
    /// Builds the node for the non-empty token range `start..end`.
    fn build(&self, mut start: usize, mut end: usize) -> Result<SyntaxNode, SyntaxError> {
        'scan: loop {
            let mut chosen: Option<(usize, Operator)> = None;
            let mut i = start;

            while i < end {
                match self.tokens[i].symbol {
                    Symbol::Open => {
                        let close = self.matching_close(i, end)?;
                        if i == start && close == end - 1 {
                            start += 1;
                            end -= 1;
                            continue 'scan;
                        }
                        i = close;
                    }
                    // every group was skipped as a whole, so this one has no opening pair
                    Symbol::Close => {
                        return Err(self.error(SyntaxErrorKind::UnbalancedGroup, i));
                    }
                    Symbol::Operator(op) => {
                        if Self::takes_precedence(op, chosen.map(|(_, cur)| cur)) {
                            chosen = Some((i, op));
                        }
                    }
                    Symbol::Literal(_) => {}
                }
                i += 1;
            }

            return match chosen {
                Some((idx, op)) => self.split(start, idx, end, op),
                None => self.leaf(start, end),
            };
        }
    }

    /// Highest priority wins, leftmost on ties. Postfix operators are the
    /// exception: in `a**` the last star is applied last, so it wins.
    fn takes_precedence(candidate: Operator, current: Option<Operator>) -> bool {
        match current {
            None => true,
            Some(cur) if candidate.priority() == cur.priority() => candidate.is_unary(),
            Some(cur) => candidate.priority() > cur.priority(),
        }
    }

    fn matching_close(&self, open: usize, end: usize) -> Result<usize, SyntaxError> {
        let mut depth = 0usize;
        for i in open..end {
            match self.tokens[i].symbol {
                Symbol::Open => depth += 1,
                Symbol::Close => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }
        Err(self.error(SyntaxErrorKind::UnbalancedGroup, open))
    }

    fn split(
        &self,
        start: usize,
        idx: usize,
        end: usize,
        op: Operator,
    ) -> Result<SyntaxNode, SyntaxError> {
        if op.is_unary() && idx != end - 1 {
            return Err(self.error(SyntaxErrorKind::MisplacedUnaryOperator(op.into()), idx));
        }
        if idx == start {
            return Err(self.error(SyntaxErrorKind::MissingOperand(op.into()), idx));
        }

        let left = self.build(start, idx)?;
        if op.is_unary() {
            return Ok(SyntaxNode::unary(op, left));
        }

        if idx + 1 == end {
            return Err(self.error(SyntaxErrorKind::MissingOperand(op.into()), idx));
        }
        let right = self.build(idx + 1, end)?;
        Ok(SyntaxNode::binary(op, left, right))
    }

    fn leaf(&self, start: usize, end: usize) -> Result<SyntaxNode, SyntaxError> {
        match &self.tokens[start..end] {
            [token] => match token.symbol {
                Symbol::Literal(c) => Ok(SyntaxNode::Leaf(c)),
                Symbol::Operator(op) => {
                    Err(self.error(SyntaxErrorKind::MissingOperand(op.into()), start))
                }
                Symbol::Open | Symbol::Close => {
                    Err(self.error(SyntaxErrorKind::UnbalancedGroup, start))
                }
            },
            _ => Err(self.error(SyntaxErrorKind::DisconnectedSymbols, start)),
        }
    }

    fn error(&self, kind: SyntaxErrorKind, idx: usize) -> SyntaxError {
        let position = self.tokens.get(idx).map_or(0, |token| token.position);
        SyntaxError::new(kind, position)
    }
}
