//! CALC error taxonomy.

use std::fmt;

/// CALC error kinds; the discriminant is the wire value reported through
/// `PERROR`.
///
/// Negative codes are syntax errors: they are produced only while parsing
/// the step table and permanently disable the block. Positive codes are
/// runtime errors: they are recorded and execution continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[repr(i16)]
pub enum CalcError {
    /// Branch target beyond the end of the program.
    InvalidGoto = -4,
    /// Out-of-range operand index.
    OperandOutOfRange = -3,
    /// Verifier failure or unknown named operand.
    InvalidOperand = -2,
    /// Unknown operation code.
    InvalidOpcode = -1,
    /// No error recorded.
    NoError = 0,
    /// Square root of a negative accumulator.
    Sqrt = 1,
    /// Arc sine of a value outside `[-1, 1]`.
    Asin = 2,
    /// Arc cosine of a value outside `[-1, 1]`.
    Acos = 3,
    /// Division by zero.
    Div = 4,
    /// Stack depth exceeded; the oldest element was dropped.
    StackOverflow = 5,
    /// Pop from an empty stack.
    StackUnderflow = 6,
    /// Common logarithm of a non-positive accumulator.
    Log = 7,
    /// Natural logarithm of a non-positive accumulator.
    Ln = 8,
    /// Exponentiation of a negative base.
    Exp = 9,
    /// Reserved index error.
    Index = 10,
    /// Reserved bit error.
    Bit = 11,
}

impl CalcError {
    /// Wire value written to `PERROR`.
    pub const fn code(self) -> i16 {
        self as i16
    }

    /// Whether this error is produced at parse time and permanently
    /// disables the block.
    pub const fn is_syntax(self) -> bool {
        self.code() < 0
    }

    /// Human-readable description.
    pub const fn description(self) -> &'static str {
        match self {
            CalcError::InvalidGoto => "invalid go to step number",
            CalcError::OperandOutOfRange => "out of range operand index",
            CalcError::InvalidOperand => "invalid operand type",
            CalcError::InvalidOpcode => "invalid operation code",
            CalcError::NoError => "no error",
            CalcError::Sqrt => "SQRT error (accumulator < 0)",
            CalcError::Asin => "ASIN error (absolute value of accumulator > 1)",
            CalcError::Acos => "ACOS error (absolute value of accumulator > 1)",
            CalcError::Div => "DIV error (divide by zero)",
            CalcError::StackOverflow => "stack overflow",
            CalcError::StackUnderflow => "stack underflow",
            CalcError::Log => "LOG error (accumulator <= 0)",
            CalcError::Ln => "LN error (accumulator <= 0)",
            CalcError::Exp => "EXP error (base < 0)",
            CalcError::Index => "index error",
            CalcError::Bit => "bit error",
        }
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.description(), self.code())
    }
}

impl std::error::Error for CalcError {}

/// Errors that make a logic-flow graph impossible to construct.
///
/// These never reach `PERROR`; the caller decides how to surface them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GraphingError {
    /// The program contains an instruction whose control flow cannot be
    /// followed statically.
    #[error("graphing not possible for opcode")]
    BreakingInstruction,
    /// A branch step carries operands other than a single target literal.
    #[error("invalid operand makes graphing impossible")]
    InvalidOperand,
}
