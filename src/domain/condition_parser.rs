//! Condition ladder parser.
//!
//! Recursive descent over the ladder grammar:
//!
//! ```text
//! ladder := stage (';' stage)*
//! stage  := expr (',' expr)*
//! expr   := AND '(' expr (',' expr)+ ')'
//!         | OR '(' expr (',' expr)+ ')'
//!         | NOT '(' expr ')'
//!         | KEY
//! ```
//!
//! Keys are resolved against the [`ConditionRegistry`] while parsing, so an
//! unknown key is reported with its character offset.

use crate::domain::condition::{ConditionGroup, ConditionTree};
use crate::domain::condition_registry::ConditionRegistry;
use crate::domain::error::ParseError;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    registry: &'a ConditionRegistry,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, registry: &'a ConditionRegistry) -> Self {
        Self {
            input,
            pos: 0,
            registry,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError {
                message: format!("expected '{}', found '{}'", expected, ch),
                position: self.pos,
            }),
            None => Err(ParseError {
                message: format!("expected '{}', found end of input", expected),
                position: self.pos,
            }),
        }
    }

    fn word_len(&self) -> usize {
        self.remaining()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .map(char::len_utf8)
            .sum()
    }

    fn peek_word(&self) -> String {
        let len = self.word_len();
        if len == 0 {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            self.remaining()[..len].to_string()
        }
    }

    /// An operator keyword is only an operator when an opening paren follows.
    fn peek_operator(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        remaining.starts_with(keyword)
            && self.word_len() == keyword.len()
            && remaining[keyword.len()..].trim_start().starts_with('(')
    }

    fn parse_expr(&mut self) -> Result<ConditionTree, ParseError> {
        self.skip_whitespace();

        if self.peek_operator("AND") {
            let children = self.parse_variadic("AND")?;
            return Ok(ConditionTree::And(children));
        }
        if self.peek_operator("OR") {
            let children = self.parse_variadic("OR")?;
            return Ok(ConditionTree::Or(children));
        }
        if self.peek_operator("NOT") {
            self.pos += "NOT".len();
            self.expect_char('(')?;
            let child = self.parse_expr()?;
            self.expect_char(')')?;
            return Ok(ConditionTree::Not(Box::new(child)));
        }

        self.parse_key()
    }

    fn parse_variadic(&mut self, keyword: &str) -> Result<Vec<ConditionTree>, ParseError> {
        let start = self.pos;
        self.pos += keyword.len();
        self.expect_char('(')?;

        let mut children = vec![self.parse_expr()?];
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            self.expect_char(',')?;
            children.push(self.parse_expr()?);
        }

        if children.len() < 2 {
            return Err(ParseError {
                message: format!("{} requires at least 2 conditions", keyword),
                position: start,
            });
        }
        Ok(children)
    }

    fn parse_key(&mut self) -> Result<ConditionTree, ParseError> {
        let start = self.pos;
        let len = self.word_len();
        if len == 0 {
            return Err(ParseError {
                message: format!("expected condition, found '{}'", self.peek_word()),
                position: start,
            });
        }

        let key = &self.input[start..start + len];
        let condition = self.registry.resolve(key).map_err(|e| ParseError {
            message: e.to_string(),
            position: start,
        })?;
        self.pos += len;

        Ok(ConditionTree::Leaf {
            key: key.to_string(),
            condition,
        })
    }

    fn parse_stage(&mut self) -> Result<ConditionGroup, ParseError> {
        let mut group = vec![self.parse_expr()?];
        loop {
            self.skip_whitespace();
            if self.peek() != Some(',') {
                break;
            }
            self.advance();
            group.push(self.parse_expr()?);
        }
        Ok(group)
    }

    fn parse_ladder(&mut self) -> Result<Vec<ConditionGroup>, ParseError> {
        self.skip_whitespace();
        if self.at_end() {
            return Ok(Vec::new());
        }

        let mut stages = vec![self.parse_stage()?];
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(';') => {
                    self.advance();
                    stages.push(self.parse_stage()?);
                }
                Some(_) => {
                    return Err(ParseError {
                        message: format!("unexpected input after stage: '{}'", self.remaining()),
                        position: self.pos,
                    });
                }
            }
        }
        Ok(stages)
    }

    fn parse(&mut self) -> Result<ConditionTree, ParseError> {
        let tree = self.parse_expr()?;
        self.skip_whitespace();
        if !self.at_end() {
            return Err(ParseError {
                message: format!("unexpected input after condition: '{}'", self.remaining()),
                position: self.pos,
            });
        }
        Ok(tree)
    }
}

/// Parse a single condition expression against the shared registry.
pub fn parse_condition(input: &str) -> Result<ConditionTree, ParseError> {
    parse_condition_with(input, ConditionRegistry::global())
}

pub fn parse_condition_with(
    input: &str,
    registry: &ConditionRegistry,
) -> Result<ConditionTree, ParseError> {
    Parser::new(input, registry).parse()
}

/// Parse a ladder string. Blank input is an empty ladder.
pub fn parse_ladder(input: &str) -> Result<Vec<ConditionGroup>, ParseError> {
    Parser::new(input, ConditionRegistry::global()).parse_ladder()
}

/// Render a ladder back to its string form.
pub fn format_ladder(stages: &[ConditionGroup]) -> String {
    stages
        .iter()
        .map(|stage| {
            stage
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::condition::{Condition, MaLine, MaPair};

    #[test]
    fn parse_single_key() {
        let tree = parse_condition("MAS_GT_MAM").unwrap();
        assert_eq!(
            tree,
            ConditionTree::Leaf {
                key: "MAS_GT_MAM".into(),
                condition: Condition::MaAbove(MaPair::ShortMiddle),
            }
        );
    }

    #[test]
    fn parse_and_or_not() {
        let tree = parse_condition("AND(MAS_UP, OR(VOLUME_HIGH, KDJ_OVERSOLD), NOT(SIGN1))").unwrap();
        match tree {
            ConditionTree::And(children) => {
                assert_eq!(children.len(), 3);
                assert!(matches!(children[1], ConditionTree::Or(_)));
                assert!(matches!(children[2], ConditionTree::Not(_)));
            }
            _ => panic!("expected And"),
        }
    }

    #[test]
    fn parse_whitespace_handling() {
        let tree = parse_condition("  NOT (  MAM_DOWN )  ").unwrap();
        match tree {
            ConditionTree::Not(child) => assert_eq!(
                *child,
                ConditionTree::Leaf {
                    key: "MAM_DOWN".into(),
                    condition: Condition::MaFalling(MaLine::Middle),
                }
            ),
            _ => panic!("expected Not"),
        }
    }

    #[test]
    fn error_unknown_key_has_position() {
        let err = parse_condition("AND(MAS_UP, MAS_SIDEWAYS)").unwrap_err();
        assert!(err.message.contains("unknown condition key: MAS_SIDEWAYS"));
        assert_eq!(err.position, 12);
    }

    #[test]
    fn error_single_operand_and() {
        let err = parse_condition("AND(MAS_UP)").unwrap_err();
        assert!(err.message.contains("AND requires at least 2 conditions"));
        let err = parse_condition("OR(MAS_UP)").unwrap_err();
        assert!(err.message.contains("OR requires at least 2 conditions"));
    }

    #[test]
    fn error_missing_paren() {
        let err = parse_condition("NOT(MAS_UP").unwrap_err();
        assert!(err.message.contains("expected ')'"));
        assert_eq!(err.position, 10);
    }

    #[test]
    fn error_trailing_input() {
        let err = parse_condition("MAS_UP MAM_UP").unwrap_err();
        assert!(err.message.contains("unexpected input"));
    }

    #[test]
    fn error_empty_expression() {
        let err = parse_condition("").unwrap_err();
        assert!(err.message.contains("expected condition"));
        assert_eq!(err.position, 0);
    }

    #[test]
    fn case_sensitive_keys() {
        let err = parse_condition("mas_up").unwrap_err();
        assert!(err.message.contains("unknown condition key"));
    }

    #[test]
    fn ladder_stages_and_entries() {
        let ladder = parse_ladder("MAS_CROSS_UP_MAM, VOLUME_HIGH; OR(MACD_CROSS_UP_GOLDEN, KDJ_OVERSOLD)")
            .unwrap();
        assert_eq!(ladder.len(), 2);
        assert_eq!(ladder[0].len(), 2);
        assert_eq!(ladder[1].len(), 1);
        assert!(matches!(ladder[1][0], ConditionTree::Or(_)));
    }

    #[test]
    fn ladder_blank_is_empty() {
        assert!(parse_ladder("").unwrap().is_empty());
        assert!(parse_ladder("   ").unwrap().is_empty());
    }

    #[test]
    fn ladder_rejects_empty_stage() {
        let err = parse_ladder("MAS_UP;;MAM_UP").unwrap_err();
        assert!(err.message.contains("expected condition"));
        assert_eq!(err.position, 7);
    }

    #[test]
    fn ladder_format_round_trip() {
        let input = "MAS_UP, NOT(VOLUME_LOW); AND(MAM_UP, MAL_UP)";
        let ladder = parse_ladder(input).unwrap();
        assert_eq!(format_ladder(&ladder), input);
    }

    #[test]
    fn error_display_with_context() {
        let input = "MAS_UP; BOGUS";
        let err = parse_ladder(input).unwrap_err();
        let ctx = err.display_with_context(input);
        assert!(ctx.contains("        ^"));
    }
}
