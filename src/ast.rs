use std::fmt::Display;

/// A compiled expression. The tree is never mutated after parsing, so one
/// program can be evaluated any number of times, from any number of threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Program(pub(crate) Expression);

impl Program {
    pub fn root(&self) -> &Expression {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    /// `left.right`, where `right` is an identifier or another dereference.
    Deref(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Relational(Box<Expression>, RelationalOperator, Box<Expression>),
    Arithmetic(Box<Expression>, InfixOperator, Box<Expression>),
}

impl Expression {
    /// Whether this node may appear on the right of a `.`.
    pub fn is_member(&self) -> bool {
        matches!(self, Expression::Identifier(_) | Expression::Deref(..))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationalOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Literal(literal) => write!(f, "{}", literal),
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::Deref(left, right) => write!(f, "{}.{}", left, right),
            Expression::Or(left, right) => write!(f, "(|| {} {})", left, right),
            Expression::And(left, right) => write!(f, "(&& {} {})", left, right),
            Expression::Relational(left, op, right) => write!(f, "({} {} {})", op, left, right),
            Expression::Arithmetic(left, op, right) => write!(f, "({} {} {})", op, left, right),
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Nil => write!(f, "nil"),
        }
    }
}

impl Display for RelationalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationalOperator::Equal => write!(f, "=="),
            RelationalOperator::NotEqual => write!(f, "!="),
            RelationalOperator::LessThan => write!(f, "<"),
            RelationalOperator::LessThanOrEqual => write!(f, "<="),
            RelationalOperator::GreaterThan => write!(f, ">"),
            RelationalOperator::GreaterThanOrEqual => write!(f, ">="),
        }
    }
}

impl Display for InfixOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InfixOperator::Plus => write!(f, "+"),
            InfixOperator::Minus => write!(f, "-"),
            InfixOperator::Multiply => write!(f, "*"),
            InfixOperator::Divide => write!(f, "/"),
            InfixOperator::Modulo => write!(f, "%"),
        }
    }
}
