//! Operators appearing in expressions.
//!
//! Each enum round-trips with the symbol the parser emits.

/// Binary operators (always evaluate both sides).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,

    // Comparison
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Mod,
            "**" => Self::Exp,
            "==" => Self::Eq,
            "!=" => Self::NotEq,
            "===" => Self::StrictEq,
            "!==" => Self::StrictNotEq,
            "<" => Self::Lt,
            "<=" => Self::LtEq,
            ">" => Self::Gt,
            ">=" => Self::GtEq,
            "&" => Self::BitAnd,
            "|" => Self::BitOr,
            "^" => Self::BitXor,
            "<<" => Self::Shl,
            ">>" => Self::Shr,
            ">>>" => Self::UShr,
            _ => return None,
        })
    }

    /// Returns the source-level symbol for this operator.
    ///
    /// Used in error messages to show the exact operator that failed.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Exp => "**",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::StrictEq => "===",
            Self::StrictNotEq => "!==",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::UShr => ">>>",
        }
    }

    /// Bitwise and shift operators work on 32-bit integers.
    pub const fn is_bitwise(self) -> bool {
        matches!(
            self,
            Self::BitAnd | Self::BitOr | Self::BitXor | Self::Shl | Self::Shr | Self::UShr
        )
    }
}

/// Short-circuiting operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

impl LogicalOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "&&" => Some(Self::And),
            "||" => Some(Self::Or),
            "??" => Some(Self::Coalesce),
            _ => None,
        }
    }

    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::Coalesce => "??",
        }
    }
}

/// Unary prefix operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    TypeOf,
}

impl UnaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "!" => Some(Self::Not),
            "-" => Some(Self::Neg),
            "+" => Some(Self::Plus),
            "~" => Some(Self::BitNot),
            "typeof" => Some(Self::TypeOf),
            _ => None,
        }
    }

    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Neg => "-",
            Self::Plus => "+",
            Self::BitNot => "~",
            Self::TypeOf => "typeof",
        }
    }
}

/// `++` and `--`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "++" => Some(Self::Increment),
            "--" => Some(Self::Decrement),
            _ => None,
        }
    }

    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Increment => "++",
            Self::Decrement => "--",
        }
    }

    /// The amount added to the target.
    pub const fn delta(self) -> f64 {
        match self {
            Self::Increment => 1.0,
            Self::Decrement => -1.0,
        }
    }
}

/// Assignment operators; compound forms carry the binary operator they apply.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
}

impl AssignOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        if symbol == "=" {
            return Some(Self::Assign);
        }
        let binary = symbol.strip_suffix('=')?;
        match BinaryOp::from_symbol(binary)? {
            op @ (BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Exp
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::UShr) => Some(Self::Compound(op)),
            _ => None,
        }
    }
}

/// `var`, `let` or `const`. All three bind in the enclosing function frame.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DeclarationKind {
    Var,
    Let,
    Const,
}

impl DeclarationKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "var" => Some(Self::Var),
            "let" => Some(Self::Let),
            "const" => Some(Self::Const),
            _ => None,
        }
    }
}
