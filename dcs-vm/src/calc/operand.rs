//! Step operands and the operand-shape verification combinators.
//!
//! An operand is either a signed integer literal or a named reference of the
//! form `[~]<prefix><suffix>` addressing a block parameter. The verifiers
//! are small boolean functions over the operand tuple; [`any_of`] and
//! [`all_of`] combine them into the per-opcode rules of the opcode table.

use std::fmt;

use super::parameters::ParamId;

/// A parsed step operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Signed integer literal.
    Literal(i64),
    /// Reference to a block parameter.
    Named(NamedOperand),
}

/// An operand addressing a CALC block parameter by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedOperand {
    /// Leading alphabetic characters of the name.
    pub prefix: String,
    /// Remainder of the name; never empty.
    pub suffix: String,
    /// Leading `~`: the parameter reads as an inverted boolean.
    pub inverted: bool,
    /// Field resolved from `prefix + suffix`; `None` when the name matches
    /// no canonical parameter.
    pub param: Option<ParamId>,
}

impl Operand {
    /// Parse one token: an integer literal if possible, a named reference
    /// otherwise. Returns `None` for tokens that are neither.
    pub fn parse(token: &str) -> Option<Self> {
        if let Ok(literal) = token.parse::<i64>() {
            return Some(Operand::Literal(literal));
        }
        NamedOperand::parse(token).map(Operand::Named)
    }

    /// Whether a named reference resolves to a canonical parameter.
    /// Literals trivially resolve.
    pub(crate) fn resolves(&self) -> bool {
        match self {
            Operand::Literal(_) => true,
            Operand::Named(operand) => operand.param.is_some(),
        }
    }
}

impl NamedOperand {
    /// Split `[~]<prefix><suffix>`. The prefix is the run of leading
    /// alphabetic characters; the suffix is the non-empty remainder.
    fn parse(token: &str) -> Option<Self> {
        let (inverted, rest) = match token.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, token),
        };

        let split = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let (prefix, suffix) = rest.split_at(split);

        if suffix.is_empty() {
            return None;
        }

        Some(NamedOperand {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            inverted,
            param: ParamId::from_name(rest),
        })
    }

    /// Reconstructed parameter name.
    pub fn name(&self) -> String {
        format!("{}{}", self.prefix, self.suffix)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(literal) => write!(f, "{literal}"),
            Operand::Named(named) => write!(f, "{named}"),
        }
    }
}

impl fmt::Display for NamedOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            write!(f, "~{}{}", self.prefix, self.suffix)
        } else {
            write!(f, "{}{}", self.prefix, self.suffix)
        }
    }
}

/// An operand-shape rule.
pub(crate) type Verifier = fn(&[Operand]) -> bool;

/// Satisfied when any rule accepts the operands.
pub(crate) fn any_of(operands: &[Operand], rules: &[Verifier]) -> bool {
    rules.iter().any(|rule| rule(operands))
}

/// Satisfied when every rule accepts the operands.
pub(crate) fn all_of(operands: &[Operand], rules: &[Verifier]) -> bool {
    rules.iter().all(|rule| rule(operands))
}

/// No operands at all.
pub(crate) fn no_operand(operands: &[Operand]) -> bool {
    operands.is_empty()
}

/// Exactly one operand of any kind.
pub(crate) fn one_operand(operands: &[Operand]) -> bool {
    operands.len() == 1
}

/// Exactly one integer literal.
pub(crate) fn const_operand(operands: &[Operand]) -> bool {
    matches!(operands, [Operand::Literal(_)])
}

fn named_operand(operands: &[Operand], prefix_rule: impl Fn(&str) -> bool) -> bool {
    match operands {
        [Operand::Named(operand)] => operand.param.is_some() && prefix_rule(&operand.prefix),
        _ => false,
    }
}

/// One named real parameter (`R` prefix).
pub(crate) fn real(operands: &[Operand]) -> bool {
    named_operand(operands, |prefix| prefix.starts_with('R'))
}

/// One named boolean parameter (`B` prefix).
pub(crate) fn boolean(operands: &[Operand]) -> bool {
    named_operand(operands, |prefix| prefix.starts_with('B'))
}

/// One named integer parameter (`I` prefix).
pub(crate) fn integer(operands: &[Operand]) -> bool {
    named_operand(operands, |prefix| prefix.starts_with('I'))
}

/// One named long parameter (`L` prefix).
pub(crate) fn long(operands: &[Operand]) -> bool {
    named_operand(operands, |prefix| prefix.starts_with('L'))
}

/// One named memory cell (`M` prefix exactly).
pub(crate) fn memory(operands: &[Operand]) -> bool {
    named_operand(operands, |prefix| prefix == "M")
}

/// One named input parameter (prefix ends in `I`).
pub(crate) fn input_parameter(operands: &[Operand]) -> bool {
    named_operand(operands, |prefix| prefix.ends_with('I'))
}

/// One named output parameter (prefix ends in `O`).
pub(crate) fn output_parameter(operands: &[Operand]) -> bool {
    named_operand(operands, |prefix| prefix.ends_with('O'))
}

/// The operand is not an inverted named reference.
pub(crate) fn not_inverted(operands: &[Operand]) -> bool {
    !matches!(operands, [Operand::Named(operand)] if operand.inverted)
}
