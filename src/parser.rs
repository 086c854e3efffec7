use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use crate::{
    ast::{Expression, InfixOperator, Literal, Program, RelationalOperator},
    tokenizer::{ScanError, Token, TokenType, Tokenizer},
};

/// Number of tokens the parser may look ahead.
const LOOKAHEAD: usize = 2;

/// Bounds applied while compiling an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum depth of nested grammar rules. Evaluation recursion is bounded
    /// by the depth of the tree, so this bounds both.
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_depth: 512 }
    }
}

#[derive(Debug)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Grammar rules active when the error occurred, outermost first.
    pub rules: Vec<&'static str>,
    pub token: Token,
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.rules.is_empty() {
            writeln!(f, "While parsing {}", self.rules.join(" > "))?;
        }
        write!(
            f,
            "{} at {} but found \"{}\"",
            self.kind, self.token.span, self.token.token_type
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseErrorKind {
    #[error(transparent)]
    Lexical(#[from] ScanError),
    #[error("Unexpected end-of-input")]
    UnexpectedEof,
    #[error("Unexpected \"{0}\"")]
    Unexpected(TokenType),
    #[error("Expected \"{0}\"")]
    Expected(TokenType),
    #[error("Expected identifier")]
    ExpectedIdentifier,
    #[error("Expression nested deeper than {0} levels")]
    TooDeep(usize),
}

#[derive(Debug, Clone)]
struct ParseContext {
    stack: Rc<RefCell<Vec<&'static str>>>,
}

impl ParseContext {
    fn new() -> Self {
        Self {
            stack: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    fn push(&self, name: &'static str) -> ParseContextGuard {
        self.stack.borrow_mut().push(name);
        ParseContextGuard {
            context: self.clone(),
        }
    }

    fn pop(&self) {
        self.stack.borrow_mut().pop();
    }

    fn rules(&self) -> Vec<&'static str> {
        self.stack.borrow().clone()
    }
}

struct ParseContextGuard {
    context: ParseContext,
}

impl Drop for ParseContextGuard {
    fn drop(&mut self) {
        self.context.pop();
    }
}

type Rule = fn(&mut Parser) -> Result<Expression, ParseError>;

pub struct Parser {
    tokenizer: Tokenizer,
    lookahead: VecDeque<Token>,
    context: ParseContext,
    limits: Limits,
}

impl Parser {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self::with_limits(tokenizer, Limits::default())
    }

    pub fn with_limits(tokenizer: Tokenizer, limits: Limits) -> Self {
        Self {
            tokenizer,
            lookahead: VecDeque::with_capacity(LOOKAHEAD),
            context: ParseContext::new(),
            limits,
        }
    }

    /// Look at the `n`th upcoming token without consuming it.
    ///
    /// # Panics
    ///
    /// Panics if `n` is beyond the lookahead capacity; the grammar never
    /// needs more than that.
    pub fn peek(&mut self, n: usize) -> &Token {
        assert!(
            n < LOOKAHEAD,
            "Look-ahead overrun: {} >= {}",
            n + 1,
            LOOKAHEAD
        );
        while self.lookahead.len() <= n {
            let token = self.tokenizer.scan();
            self.lookahead.push_back(token);
        }
        &self.lookahead[n]
    }

    /// Consume the next token.
    pub fn next(&mut self) -> Token {
        match self.lookahead.pop_front() {
            Some(token) => token,
            None => self.tokenizer.scan(),
        }
    }

    /// Parse a single expression spanning the whole input.
    pub fn parse(mut self) -> Result<Program, ParseError> {
        let expr = self.expression()?;

        let token = self.next();
        match &token.token_type {
            TokenType::Eof => {}
            TokenType::Error(e) => return Err(self.error(e.clone().into(), token)),
            other => return Err(self.error(ParseErrorKind::Unexpected(other.clone()), token)),
        }

        let program = Program(expr);
        log::debug!("compiled {}", program);
        #[cfg(feature = "disassemble")]
        log::debug!("{:#?}", program);
        Ok(program)
    }

    fn error(&self, kind: ParseErrorKind, token: Token) -> ParseError {
        ParseError {
            kind,
            rules: self.context.rules(),
            token,
        }
    }

    fn enter(&mut self, name: &'static str) -> Result<ParseContextGuard, ParseError> {
        if self.context.depth() >= self.limits.max_depth {
            let token = self.peek(0).clone();
            return Err(self.error(ParseErrorKind::TooDeep(self.limits.max_depth), token));
        }
        Ok(self.context.push(name))
    }

    /// Fails if the upcoming token is malformed.
    fn check_lexical(&mut self) -> Result<(), ParseError> {
        let token = self.peek(0);
        if let TokenType::Error(e) = &token.token_type {
            let kind = e.clone().into();
            let token = token.clone();
            return Err(self.error(kind, token));
        }
        Ok(())
    }

    /// `operand ( op this )?` where `this` is the rule being parsed, so
    /// chains of the same precedence associate to the right.
    fn right_recursive<Op: Copy>(
        &mut self,
        operand: Rule,
        this: Rule,
        operator: fn(&TokenType) -> Option<Op>,
        build: fn(Expression, Op, Expression) -> Expression,
    ) -> Result<Expression, ParseError> {
        let left = operand(self)?;

        let Some(op) = operator(self.peek(0).token_type()) else {
            self.check_lexical()?;
            return Ok(left);
        };
        self.next();

        let right = this(self)?;
        Ok(build(left, op, right))
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        let _guard = self.enter("expression")?;
        self.logical_or()
    }

    fn logical_or(&mut self) -> Result<Expression, ParseError> {
        let _guard = self.enter("logical_or")?;
        self.right_recursive(
            Self::logical_and,
            Self::logical_or,
            |token| matches!(token, TokenType::Or).then_some(()),
            |left, (), right| Expression::Or(Box::new(left), Box::new(right)),
        )
    }

    fn logical_and(&mut self) -> Result<Expression, ParseError> {
        let _guard = self.enter("logical_and")?;
        self.right_recursive(
            Self::relational,
            Self::logical_and,
            |token| matches!(token, TokenType::And).then_some(()),
            |left, (), right| Expression::And(Box::new(left), Box::new(right)),
        )
    }

    fn relational(&mut self) -> Result<Expression, ParseError> {
        let _guard = self.enter("relational")?;
        self.right_recursive(
            Self::additive,
            Self::relational,
            |token| match token {
                TokenType::EqualEqual => Some(RelationalOperator::Equal),
                TokenType::BangEqual => Some(RelationalOperator::NotEqual),
                TokenType::Less => Some(RelationalOperator::LessThan),
                TokenType::LessEqual => Some(RelationalOperator::LessThanOrEqual),
                TokenType::Greater => Some(RelationalOperator::GreaterThan),
                TokenType::GreaterEqual => Some(RelationalOperator::GreaterThanOrEqual),
                _ => None,
            },
            |left, op, right| Expression::Relational(Box::new(left), op, Box::new(right)),
        )
    }

    fn additive(&mut self) -> Result<Expression, ParseError> {
        let _guard = self.enter("additive")?;
        self.right_recursive(
            Self::multiplicative,
            Self::additive,
            |token| match token {
                TokenType::Plus => Some(InfixOperator::Plus),
                TokenType::Minus => Some(InfixOperator::Minus),
                _ => None,
            },
            |left, op, right| Expression::Arithmetic(Box::new(left), op, Box::new(right)),
        )
    }

    fn multiplicative(&mut self) -> Result<Expression, ParseError> {
        let _guard = self.enter("multiplicative")?;
        self.right_recursive(
            Self::deref,
            Self::multiplicative,
            |token| match token {
                TokenType::Star => Some(InfixOperator::Multiply),
                TokenType::Slash => Some(InfixOperator::Divide),
                TokenType::Percent => Some(InfixOperator::Modulo),
                _ => None,
            },
            |left, op, right| Expression::Arithmetic(Box::new(left), op, Box::new(right)),
        )
    }

    fn deref(&mut self) -> Result<Expression, ParseError> {
        let _guard = self.enter("deref")?;
        let left = self.primary()?;

        if self.peek(0).token_type() != &TokenType::Dot {
            self.check_lexical()?;
            return Ok(left);
        }
        self.next();

        let member = self.peek(0).clone();
        let right = self.deref()?;
        if !right.is_member() {
            return Err(self.error(ParseErrorKind::ExpectedIdentifier, member));
        }

        Ok(Expression::Deref(Box::new(left), Box::new(right)))
    }

    fn primary(&mut self) -> Result<Expression, ParseError> {
        let _guard = self.enter("primary")?;
        let token = self.next();

        match &token.token_type {
            TokenType::Number(n) => Ok(Expression::Literal(Literal::Number(*n))),
            TokenType::String(s) | TokenType::Uuid(s) => {
                Ok(Expression::Literal(Literal::String(s.clone())))
            }
            TokenType::True => Ok(Expression::Literal(Literal::Boolean(true))),
            TokenType::False => Ok(Expression::Literal(Literal::Boolean(false))),
            TokenType::Nil => Ok(Expression::Literal(Literal::Nil)),
            TokenType::Identifier(name) => Ok(Expression::Identifier(name.clone())),
            TokenType::LeftParen => {
                let expr = self.expression()?;
                self.consume(TokenType::RightParen)?;
                Ok(expr)
            }
            TokenType::Eof => Err(self.error(ParseErrorKind::UnexpectedEof, token)),
            TokenType::Error(e) => Err(self.error(e.clone().into(), token)),
            other => Err(self.error(ParseErrorKind::Unexpected(other.clone()), token)),
        }
    }

    fn consume(&mut self, expected: TokenType) -> Result<Token, ParseError> {
        let token = self.next();
        match &token.token_type {
            t if t == &expected => Ok(token),
            TokenType::Error(e) => Err(self.error(e.clone().into(), token)),
            _ => Err(self.error(ParseErrorKind::Expected(expected), token)),
        }
    }
}

/// Compile `source` into a program.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    Parser::new(Tokenizer::new(source)).parse()
}

/// Compile `source` with custom limits.
pub fn parse_with(source: &str, limits: Limits) -> Result<Program, ParseError> {
    Parser::with_limits(Tokenizer::new(source), limits).parse()
}

#[cfg(test)]
mod test {
    use super::*;

    fn tree(source: &str) -> String {
        parse(source).unwrap().to_string()
    }

    fn error(source: &str) -> ParseError {
        parse(source).unwrap_err()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(tree("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(tree("a || b && c == d"), "(|| a (&& b (== c d)))");
        assert_eq!(tree("1 < 2 + 3"), "(< 1 (+ 2 3))");
        assert_eq!(tree("(1 + 2) * 3"), "(* (+ 1 2) 3)");
    }

    #[test]
    fn test_same_precedence_is_right_recursive() {
        assert_eq!(tree("10 - 2 - 3"), "(- 10 (- 2 3))");
        assert_eq!(tree("a || b || c"), "(|| a (|| b c))");
    }

    #[test]
    fn test_deref_chain() {
        let program = parse("foo.bar.zar").unwrap();
        assert_eq!(
            program.root(),
            &Expression::Deref(
                Box::new(Expression::Identifier("foo".to_string())),
                Box::new(Expression::Deref(
                    Box::new(Expression::Identifier("bar".to_string())),
                    Box::new(Expression::Identifier("zar".to_string())),
                )),
            )
        );
        assert_eq!(tree("a.b * 2"), "(* a.b 2)");
    }

    #[test]
    fn test_literals() {
        assert_eq!(tree("nil"), "nil");
        assert_eq!(tree("\"abc\""), "\"abc\"");
        assert_eq!(
            tree("U:0f8fad5b-d9cb-469f-a165-70867728950e"),
            "\"0f8fad5b-d9cb-469f-a165-70867728950e\""
        );
        assert_eq!(tree("(-5)"), "-5");
    }

    #[test]
    fn test_unexpected_eof() {
        let error = error("1 +");
        assert!(matches!(error.kind, ParseErrorKind::UnexpectedEof));
        assert_eq!(error.token.token_type, TokenType::Eof);
        assert_eq!(error.token.span.offset, 3);
        assert_eq!(error.rules.last(), Some(&"primary"));
        assert!(error.to_string().contains("Unexpected end-of-input"));
    }

    #[test]
    fn test_unbalanced_parens() {
        let missing = error("(1 + 2");
        assert!(matches!(
            missing.kind,
            ParseErrorKind::Expected(TokenType::RightParen)
        ));

        let extra = error("1 + 2)");
        assert!(matches!(
            extra.kind,
            ParseErrorKind::Unexpected(TokenType::RightParen)
        ));
        assert_eq!(extra.token.span.excerpt(), ")");
    }

    #[test]
    fn test_deref_requires_identifier() {
        let error = error("a.1");
        assert!(matches!(error.kind, ParseErrorKind::ExpectedIdentifier));
        assert_eq!(error.token.span.excerpt(), "1");
        assert!(matches!(
            self::error("a.(1 + 2)").kind,
            ParseErrorKind::ExpectedIdentifier
        ));
    }

    #[test]
    fn test_illegal_primary() {
        let error = error("* 2");
        assert!(matches!(
            error.kind,
            ParseErrorKind::Unexpected(TokenType::Star)
        ));
    }

    #[test]
    fn test_lexical_error() {
        let error = error("1 + \"open");
        assert!(matches!(
            error.kind,
            ParseErrorKind::Lexical(ScanError::UnterminatedString)
        ));
        assert!(matches!(
            self::error("a # b").kind,
            ParseErrorKind::Lexical(ScanError::UnexpectedCharacter('#'))
        ));
    }

    #[test]
    fn test_too_deep() {
        let source = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        let error = parse_with(&source, Limits { max_depth: 64 }).unwrap_err();
        assert!(matches!(error.kind, ParseErrorKind::TooDeep(64)));
        assert_eq!(error.rules.len(), 64);

        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert!(parse(&shallow).is_ok());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut parser = Parser::new(Tokenizer::new("a + b"));
        assert_eq!(parser.peek(1).token_type, TokenType::Plus);
        assert_eq!(
            parser.peek(0).token_type,
            TokenType::Identifier("a".to_string())
        );
        assert_eq!(
            parser.next().token_type,
            TokenType::Identifier("a".to_string())
        );
        assert_eq!(parser.next().token_type, TokenType::Plus);
        assert_eq!(
            parser.next().token_type,
            TokenType::Identifier("b".to_string())
        );
        assert_eq!(parser.next().token_type, TokenType::Eof);
    }

    #[test]
    #[should_panic(expected = "Look-ahead overrun")]
    fn test_lookahead_overrun() {
        let mut parser = Parser::new(Tokenizer::new("a + b"));
        parser.peek(LOOKAHEAD);
    }
}
