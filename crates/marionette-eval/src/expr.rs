//! Expression tree
//!
//! Nodes are immutable once built. Tree-wide passes (variable collection,
//! static validation) are written once against [`Expr::each`] instead of
//! per variant.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::{Scope, Value};

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOperator {
    /// Numeric negation
    Minus,
    /// Logical negation of truthiness
    Not,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Minus => "-",
            UnaryOperator::Not => "!",
        }
    }
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Plus,
    Minus,
    Times,
    Divide,
    Modulo,
    LeftShift,
    RightShift,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    In,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Times => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::LeftShift => "<<",
            BinaryOperator::RightShift => ">>",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::In => "in",
        }
    }
}

/// What a branch node does with its children's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    /// Statement sequence: value of the last child, `undef` when empty
    #[default]
    Sequence,
    /// Argument or array list: every child's value, in order
    List,
}

/// A node of the configuration-language syntax tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    Literal {
        value: Value,
    },
    Variable {
        name: String,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Branch {
        #[serde(default)]
        kind: BranchKind,
        children: Vec<Expr>,
    },
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal {
            value: value.into(),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable { name: name.into() }
    }

    pub fn unary(op: UnaryOperator, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn minus(operand: Expr) -> Self {
        Self::unary(UnaryOperator::Minus, operand)
    }

    pub fn not(operand: Expr) -> Self {
        Self::unary(UnaryOperator::Not, operand)
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn sequence(children: Vec<Expr>) -> Self {
        Expr::Branch {
            kind: BranchKind::Sequence,
            children,
        }
    }

    pub fn list(children: Vec<Expr>) -> Self {
        Expr::Branch {
            kind: BranchKind::List,
            children,
        }
    }

    /// Immediate children in declaration order; none for leaves.
    pub fn each(&self) -> Children<'_> {
        match self {
            Expr::Literal { .. } | Expr::Variable { .. } => Children::new([None, None], &[]),
            Expr::Unary { operand, .. } => Children::new([Some(operand.as_ref()), None], &[]),
            Expr::Binary { left, right, .. } => {
                Children::new([Some(left.as_ref()), Some(right.as_ref())], &[])
            }
            Expr::Branch { children, .. } => Children::new([None, None], children),
        }
    }

    /// Visit this node and every descendant, parents before children
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        for child in self.each() {
            child.walk(visit);
        }
    }

    /// Names of every variable referenced anywhere in the tree
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.walk(&mut |node| {
            if let Expr::Variable { name } = node {
                names.insert(name.as_str());
            }
        });
        names
    }

    /// Referenced variables that `scope` cannot resolve, sorted.
    ///
    /// These evaluate to `undef`; callers doing static checks decide
    /// whether that deserves a warning.
    pub fn unresolved(&self, scope: &Scope<'_>) -> Vec<String> {
        self.variables()
            .into_iter()
            .filter(|name| !scope.is_defined(name))
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal { value: Value::String(s) } => write!(f, "'{}'", s),
            Expr::Literal { value } => write!(f, "{}", value),
            Expr::Variable { name } => write!(f, "${}", name),
            Expr::Unary { op, operand } => write!(f, "{}{}", op.symbol(), operand),
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::Branch { kind, children } => {
                let (open, sep, close) = match kind {
                    BranchKind::Sequence => ("{ ", "; ", " }"),
                    BranchKind::List => ("[", ", ", "]"),
                };
                write!(f, "{}", open)?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", sep)?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, "{}", close)
            }
        }
    }
}

/// Iterator over a node's immediate children
#[derive(Debug, Clone)]
pub struct Children<'a> {
    fixed: std::array::IntoIter<Option<&'a Expr>, 2>,
    rest: std::slice::Iter<'a, Expr>,
}

impl<'a> Children<'a> {
    fn new(fixed: [Option<&'a Expr>; 2], rest: &'a [Expr]) -> Self {
        Self {
            fixed: fixed.into_iter(),
            rest: rest.iter(),
        }
    }
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a Expr;

    fn next(&mut self) -> Option<Self::Item> {
        for child in self.fixed.by_ref() {
            if child.is_some() {
                return child;
            }
        }
        self.rest.next()
    }
}
