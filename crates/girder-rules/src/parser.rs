//! Recursive-descent parser for the textual rule DSL.
//!
//! Errors are collected with positions rather than failing fast: a bad
//! statement skips to the next statement boundary and a bad rule skips to
//! the next `RULE`, so one mistake does not suppress diagnostics for the
//! rest of the file.

use crate::ir::{
    ComparisonOp, Condition, Metric, ParseDiagnostics, ParseError, Pattern, Rule, RuleSet,
    Statement,
};
use crate::lexer::{Lexer, Token, TokenKind};

/// Parse DSL text into an (unvalidated) rule set, or every error found.
pub fn parse_dsl(input: &str, source_file: &str) -> Result<RuleSet, ParseDiagnostics> {
    let mut parser = Parser::new(input, source_file);
    let rules = parser.parse_ruleset();
    if parser.errors.is_empty() {
        Ok(RuleSet { rules })
    } else {
        Err(ParseDiagnostics {
            errors: parser.errors,
        })
    }
}

const STATEMENT_KEYWORDS: [&str; 4] = ["LIMIT", "FORBID", "REQUIRE", "ALLOW"];

struct Parser {
    lexer: Lexer,
    current: Token,
    errors: Vec<ParseError>,
    file: String,
}

impl Parser {
    fn new(input: &str, file: &str) -> Self {
        let mut parser = Parser {
            lexer: Lexer::new(input, file),
            current: Token {
                kind: TokenKind::Eof,
                line: 1,
                column: 1,
            },
            errors: Vec::new(),
            file: file.to_string(),
        };
        parser.advance();
        parser
    }

    fn parse_ruleset(&mut self) -> Vec<Rule> {
        let mut rules = Vec::new();
        while self.current.kind != TokenKind::Eof {
            if self.at_keyword("RULE") {
                if let Some(rule) = self.parse_rule() {
                    rules.push(rule);
                }
            } else {
                self.error_here(format!(
                    "expected RULE, found {}",
                    self.current.kind.describe()
                ));
                self.recover_to_rule();
            }
        }
        rules
    }

    fn parse_rule(&mut self) -> Option<Rule> {
        let line = self.current.line;
        self.advance(); // RULE

        let name = match &self.current.kind {
            TokenKind::Str(name) => {
                let name = name.clone();
                self.advance();
                name
            }
            other => {
                self.error_here(format!("expected rule name string, found {}", other.describe()));
                self.recover_to_rule();
                return None;
            }
        };

        if self.current.kind != TokenKind::LBrace {
            self.error_here(format!(
                "expected '{{' after rule name, found {}",
                self.current.kind.describe()
            ));
            self.recover_to_rule();
            return None;
        }
        self.advance();

        let mut statements = Vec::new();
        loop {
            match &self.current.kind {
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => {
                    self.error_here("unterminated rule: expected '}'");
                    break;
                }
                TokenKind::Comma => self.advance(),
                _ => match self.parse_statement() {
                    Some(statement) => statements.push(statement),
                    None => self.recover_statement(),
                },
            }
        }

        Some(Rule {
            name,
            source_file: self.file.clone(),
            line,
            statements,
        })
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        let keyword = match &self.current.kind {
            TokenKind::Ident(name) => {
                let upper = name.to_ascii_uppercase();
                if !STATEMENT_KEYWORDS.contains(&upper.as_str()) {
                    self.error_here(format!("unknown statement keyword '{name}'"));
                    return None;
                }
                upper
            }
            other => {
                self.error_here(format!(
                    "expected statement keyword, found {}",
                    other.describe()
                ));
                return None;
            }
        };
        self.advance();

        if !self.expect(TokenKind::LParen, "'('") {
            return None;
        }

        let statement = if keyword == "LIMIT" {
            Statement::Limit(self.parse_condition()?)
        } else {
            let from = self.parse_pattern()?;
            let to = if self.current.kind == TokenKind::Arrow {
                self.advance();
                Some(self.parse_pattern()?)
            } else {
                None
            };
            match keyword.as_str() {
                "FORBID" => Statement::Forbid { from, to },
                "REQUIRE" => Statement::Require { from, to },
                _ => Statement::Allow { from, to },
            }
        };

        if !self.expect(TokenKind::RParen, "')'") {
            return None;
        }
        Some(statement)
    }

    /// `pattern operator value`, where the pattern's last segment names the
    /// metric being compared.
    fn parse_condition(&mut self) -> Option<Condition> {
        let (segments, line, column) = self.parse_pattern_segments()?;
        let Some(metric_name) = segments.last() else {
            return None;
        };
        let Some(metric) = Metric::parse(metric_name) else {
            self.error_at(line, column, format!("unknown metric '{metric_name}'"));
            return None;
        };

        let identity = &segments[..segments.len() - 1];
        let mut pattern = if identity.is_empty() {
            Pattern::any()
        } else {
            match Pattern::from_segments(identity) {
                Ok(pattern) => pattern,
                Err(message) => {
                    self.error_at(line, column, message);
                    return None;
                }
            }
        };
        pattern.metric = Some(metric);

        let op = self.parse_operator()?;
        let value = self.parse_value()?;
        Some(Condition { pattern, op, value })
    }

    fn parse_pattern(&mut self) -> Option<Pattern> {
        let (segments, line, column) = self.parse_pattern_segments()?;
        match Pattern::from_segments(&segments) {
            Ok(pattern) => Some(pattern),
            Err(message) => {
                self.error_at(line, column, message);
                None
            }
        }
    }

    /// `ident (('.' | ':') ident)*`, returning the segments with the
    /// position of the first one.
    fn parse_pattern_segments(&mut self) -> Option<(Vec<String>, u32, u32)> {
        let (line, column) = (self.current.line, self.current.column);
        let mut segments = Vec::new();
        loop {
            match &self.current.kind {
                TokenKind::Ident(name) => {
                    segments.push(name.clone());
                    self.advance();
                }
                other => {
                    self.error_here(format!("expected pattern segment, found {}", other.describe()));
                    return None;
                }
            }
            match self.current.kind {
                TokenKind::Dot | TokenKind::Colon => self.advance(),
                _ => return Some((segments, line, column)),
            }
        }
    }

    fn parse_operator(&mut self) -> Option<ComparisonOp> {
        let op = match self.current.kind {
            TokenKind::Gt => ComparisonOp::Gt,
            TokenKind::Lt => ComparisonOp::Lt,
            TokenKind::Ge => ComparisonOp::Ge,
            TokenKind::Le => ComparisonOp::Le,
            TokenKind::EqEq => ComparisonOp::Eq,
            TokenKind::Ne => ComparisonOp::Ne,
            _ => {
                self.error_here(format!(
                    "expected comparison operator, found {}",
                    self.current.kind.describe()
                ));
                return None;
            }
        };
        self.advance();
        Some(op)
    }

    fn parse_value(&mut self) -> Option<f64> {
        match &self.current.kind {
            TokenKind::Number(value) => {
                let value = *value;
                self.advance();
                Some(value)
            }
            TokenKind::Ident(name) if name.eq_ignore_ascii_case("true") => {
                self.advance();
                Some(1.0)
            }
            TokenKind::Ident(name) if name.eq_ignore_ascii_case("false") => {
                self.advance();
                Some(0.0)
            }
            TokenKind::Str(_) => {
                self.error_here("string values are not supported in metric comparisons");
                None
            }
            other => {
                self.error_here(format!("expected value, found {}", other.describe()));
                None
            }
        }
    }

    // -- Recovery and token plumbing --

    /// Skip to the next statement boundary: past a comma, or up to a
    /// statement keyword, closing brace, or the next RULE.
    fn recover_statement(&mut self) {
        loop {
            match &self.current.kind {
                TokenKind::Comma => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace | TokenKind::Eof => return,
                TokenKind::Ident(name)
                    if STATEMENT_KEYWORDS.contains(&name.to_ascii_uppercase().as_str())
                        || name.eq_ignore_ascii_case("RULE") =>
                {
                    return;
                }
                _ => self.advance(),
            }
        }
    }

    fn recover_to_rule(&mut self) {
        while self.current.kind != TokenKind::Eof && !self.at_keyword("RULE") {
            self.advance();
        }
    }

    fn advance(&mut self) {
        loop {
            match self.lexer.next_token() {
                Ok(token) => {
                    self.current = token;
                    return;
                }
                Err(error) => self.errors.push(error),
            }
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(&self.current.kind, TokenKind::Ident(name) if name.eq_ignore_ascii_case(keyword))
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.current.kind == kind {
            self.advance();
            true
        } else {
            self.error_here(format!(
                "expected {what}, found {}",
                self.current.kind.describe()
            ));
            false
        }
    }

    fn error_here(&mut self, message: impl Into<String>) {
        let (line, column) = (self.current.line, self.current.column);
        self.error_at(line, column, message);
    }

    fn error_at(&mut self, line: u32, column: u32, message: impl Into<String>) {
        self.errors.push(ParseError {
            file: self.file.clone(),
            line,
            column,
            message: message.into(),
        });
    }
}
