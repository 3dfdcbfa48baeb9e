#[cfg(test)]
use serde::Serialize;
use std::fmt::{Display, Formatter};

use crate::error::{SyntaxError, SyntaxErrorKind};

/// Marker of the explicit concatenation operator. Implicit concatenations
/// (`ab`) are materialized with it during preprocessing.
pub const CONCATENATION_CHAR: char = '·';
pub const ESCAPE_CHAR: char = '\\';

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(test, derive(Serialize))]
pub enum Operator {
    Union,
    Concatenation,
    Star,
}

impl Operator {
    /// Higher value means the operator is applied later, i.e. it splits the
    /// syntax tree closer to the root.
    pub fn priority(&self) -> u8 {
        match self {
            Operator::Union => 2,
            Operator::Concatenation => 1,
            Operator::Star => 0,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Operator::Star => 1,
            Operator::Union | Operator::Concatenation => 2,
        }
    }

    pub fn is_unary(&self) -> bool {
        self.arity() == 1
    }

    pub fn is_binary(&self) -> bool {
        self.arity() == 2
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '|' => Some(Operator::Union),
            CONCATENATION_CHAR => Some(Operator::Concatenation),
            '*' => Some(Operator::Star),
            _ => None,
        }
    }
}

impl From<Operator> for char {
    fn from(value: Operator) -> Self {
        match value {
            Operator::Union => '|',
            Operator::Concatenation => CONCATENATION_CHAR,
            Operator::Star => '*',
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", char::from(*self))
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Symbol {
    Literal(char),
    Operator(Operator),
    Open,
    Close,
}

impl Symbol {
    /// Characters that keep a special meaning unless escaped.
    pub fn is_special(c: char) -> bool {
        Operator::from_char(c).is_some() || c == '(' || c == ')' || c == ESCAPE_CHAR
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, Symbol::Operator(_))
    }

    pub fn is_binary_operator(&self) -> bool {
        matches!(self, Symbol::Operator(op) if op.is_binary())
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Symbol::Open)
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Symbol::Close)
    }
}

impl From<char> for Symbol {
    fn from(value: char) -> Self {
        match value {
            '(' => Symbol::Open,
            ')' => Symbol::Close,
            _ => Operator::from_char(value)
                .map(Symbol::Operator)
                .unwrap_or(Symbol::Literal(value)),
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Literal(c) if Symbol::is_special(*c) => write!(f, "{ESCAPE_CHAR}{c}"),
            Symbol::Literal(c) => write!(f, "{c}"),
            Symbol::Operator(op) => write!(f, "{op}"),
            Symbol::Open => write!(f, "("),
            Symbol::Close => write!(f, ")"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct Token {
    pub symbol: Symbol,
    // char index in the original pattern, inserted concatenations borrow
    // the position of the token following them
    pub position: usize,
}

impl Token {
    pub fn new(symbol: Symbol, position: usize) -> Self {
        Self { symbol, position }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct TokenSequence {
    tokens: Vec<Token>,
}

impl TokenSequence {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[cfg(test)]
    pub fn symbols(&self) -> Vec<Symbol> {
        self.tokens.iter().map(|t| t.symbol).collect()
    }

    pub fn preprocess(&mut self) -> Result<(), SyntaxError> {
        self.remove_empty_groups()?;
        self.insert_concatenations();
        Ok(())
    }

    /// Drops `()` pairs, rescanning from just before each removal so that
    /// `a(())` collapses to `a`. A removal that would leave the scan before
    /// the first token is an error: an empty group can't open a pattern that
    /// goes on after it (`()a`, `(())a`), nor empty an enclosing group
    /// opened at the start (`(())`).
    fn remove_empty_groups(&mut self) -> Result<(), SyntaxError> {
        let mut i = 0;
        while i + 1 < self.tokens.len() {
            if !(self.tokens[i].symbol.is_open() && self.tokens[i + 1].symbol.is_close()) {
                i += 1;
                continue;
            }

            let open = self.tokens[i].position;
            self.tokens.drain(i..i + 2);
            if i >= self.tokens.len() {
                break;
            }

            // a following `)` may close a group that is empty now
            let rewind = if self.tokens[i].symbol.is_close() { 2 } else { 1 };
            if i < rewind {
                return Err(SyntaxError::new(SyntaxErrorKind::EmptyGroup, open));
            }
            i = i + 1 - rewind;
        }
        Ok(())
    }

    fn insert_concatenations(&mut self) {
        let mut res: Vec<Token> = Vec::with_capacity(self.tokens.len() * 2);
        for token in self.tokens.drain(..) {
            if let Some(prev) = res.last().map(|t| t.symbol) {
                let left_accepts = !prev.is_binary_operator() && !prev.is_open();
                let right_accepts = !token.symbol.is_operator() && !token.symbol.is_close();
                if left_accepts && right_accepts {
                    res.push(Token::new(
                        Symbol::Operator(Operator::Concatenation),
                        token.position,
                    ));
                }
            }
            res.push(token);
        }
        self.tokens = res;
    }
}

impl Display for TokenSequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.tokens
            .iter()
            .try_for_each(|token| write!(f, "{}", token.symbol))
    }
}

impl TryFrom<&str> for TokenSequence {
    type Error = SyntaxError;

    fn try_from(pattern: &str) -> Result<Self, Self::Error> {
        let mut tokens = Vec::with_capacity(pattern.len());
        let mut pattern_iter = pattern.chars().enumerate();

        while let Some((pos, cur)) = pattern_iter.next() {
            if cur == ESCAPE_CHAR {
                match pattern_iter.next() {
                    Some((_, escaped)) if Symbol::is_special(escaped) => {
                        tokens.push(Token::new(Symbol::Literal(escaped), pos));
                    }
                    Some((escaped_pos, escaped)) => {
                        return Err(SyntaxError::new(
                            SyntaxErrorKind::InvalidEscape(escaped),
                            escaped_pos,
                        ));
                    }
                    None => {
                        return Err(SyntaxError::new(SyntaxErrorKind::TrailingBackslash, pos));
                    }
                }
            } else {
                tokens.push(Token::new(Symbol::from(cur), pos));
            }
        }
        Ok(TokenSequence::new(tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use Operator::{Concatenation, Star, Union};
    use Symbol::{Close, Literal, Open};

    fn tokenize(pattern: &str) -> Vec<Symbol> {
        TokenSequence::try_from(pattern).unwrap().symbols()
    }

    fn preprocess(pattern: &str) -> String {
        let mut seq = TokenSequence::try_from(pattern).unwrap();
        seq.preprocess().unwrap();
        seq.to_string()
    }

    mod operators {
        use super::*;

        #[rstest]
        #[case(Union, 2, 2)]
        #[case(Concatenation, 1, 2)]
        #[case(Star, 0, 1)]
        fn priority_and_arity_are_fixed(
            #[case] op: Operator,
            #[case] priority: u8,
            #[case] arity: usize,
        ) {
            assert_eq!(op.priority(), priority);
            assert_eq!(op.arity(), arity);
        }

        #[test]
        fn every_operator_round_trips_through_its_char() {
            for op in [Union, Concatenation, Star] {
                assert_eq!(Operator::from_char(char::from(op)), Some(op));
            }
        }
    }

    mod tokenizing {
        use super::*;

        #[test]
        fn test_parsing_of_all_special_tokens() {
            // given
            let pattern = "a|b*(c)·d";
            let expected = vec![
                Literal('a'),
                Symbol::Operator(Union),
                Literal('b'),
                Symbol::Operator(Star),
                Open,
                Literal('c'),
                Close,
                Symbol::Operator(Concatenation),
                Literal('d'),
            ];

            // when
            let res = tokenize(pattern);

            // then
            assert_eq!(res, expected);
        }

        #[test]
        fn test_parsing_with_escaped_special_characters() {
            // given
            let pattern = r"a\|b\*c\(d\)\\\·";
            let expected = vec![
                Literal('a'),
                Literal('|'),
                Literal('b'),
                Literal('*'),
                Literal('c'),
                Literal('('),
                Literal('d'),
                Literal(')'),
                Literal('\\'),
                Literal('·'),
            ];

            // when
            let res = tokenize(pattern);

            // then
            assert_eq!(res, expected);
        }

        #[test]
        fn test_tokens_keep_original_position() {
            // given
            let pattern = r"a\*b";

            // when
            let seq = TokenSequence::try_from(pattern).unwrap();
            let positions: Vec<usize> = seq.as_slice().iter().map(|t| t.position).collect();

            // then
            assert_eq!(positions, vec![0, 1, 3]);
        }

        #[test]
        fn test_parsing_fails_on_trailing_escape_character() {
            // given
            let pattern = r"abc\";

            // when
            let res = TokenSequence::try_from(pattern);

            // then
            assert_eq!(
                res.unwrap_err(),
                SyntaxError::new(SyntaxErrorKind::TrailingBackslash, 3)
            );
        }

        #[rstest]
        #[case(r"\a", 'a', 1)]
        #[case(r"ab\.", '.', 3)]
        #[case(r"\ ", ' ', 1)]
        fn test_parsing_fails_on_escaping_ordinary_character(
            #[case] pattern: &str,
            #[case] escaped: char,
            #[case] position: usize,
        ) {
            // when
            let res = TokenSequence::try_from(pattern);

            // then
            assert_eq!(
                res.unwrap_err(),
                SyntaxError::new(SyntaxErrorKind::InvalidEscape(escaped), position)
            );
        }

        #[test]
        fn test_parsing_empty_string_returns_empty_sequence() {
            assert!(TokenSequence::try_from("").unwrap().is_empty());
        }

        #[test]
        fn test_non_ascii_characters_are_literals() {
            assert_eq!(tokenize("ñж"), vec![Literal('ñ'), Literal('ж')]);
        }
    }

    mod preprocessing {
        use super::*;

        #[rstest]
        #[case("ab", "a·b")]
        #[case("abc", "a·b·c")]
        #[case("a*b", "a*·b")]
        #[case("a|b", "a|b")]
        #[case("(a)(b)", "(a)·(b)")]
        #[case("a(b|c)*d", "a·(b|c)*·d")]
        #[case("a**", "a**")]
        #[case(r"\*a", r"\*·a")]
        fn implicit_concatenation_is_materialized(#[case] pattern: &str, #[case] expected: &str) {
            assert_eq!(preprocess(pattern), expected);
        }

        #[rstest]
        #[case("a()", "a")]
        #[case("a()b", "a·b")]
        #[case("a(())b", "a·b")]
        #[case("a(())", "a")]
        #[case("(()a)", "(a)")]
        #[case("a(()())", "a")]
        #[case("()", "")]
        fn empty_groups_are_removed(#[case] pattern: &str, #[case] expected: &str) {
            assert_eq!(preprocess(pattern), expected);
        }

        #[rstest]
        #[case("()a", 0)]
        #[case("()()a", 0)]
        #[case("()*", 0)]
        #[case("(())a", 1)]
        #[case("(())", 1)]
        #[case("(()())", 3)]
        fn empty_group_before_the_rest_of_the_pattern_is_rejected(
            #[case] pattern: &str,
            #[case] position: usize,
        ) {
            // given
            let mut seq = TokenSequence::try_from(pattern).unwrap();

            // when
            let res = seq.preprocess();

            // then
            assert_eq!(
                res,
                Err(SyntaxError::new(SyntaxErrorKind::EmptyGroup, position))
            );
        }

        #[test]
        fn inserted_concatenation_takes_position_of_right_token() {
            // given
            let mut seq = TokenSequence::try_from("ab").unwrap();

            // when
            seq.preprocess().unwrap();

            // then
            assert_eq!(
                seq.as_slice()[1],
                Token::new(Symbol::Operator(Concatenation), 1)
            );
        }
    }
}
