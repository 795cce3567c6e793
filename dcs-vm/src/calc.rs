//! Emulation of the CALC programmable block type.
//!
//! A CALC block holds up to fifty textual step instructions which are parsed
//! eagerly at construction into a fixed-length program. [`Calc::execute`]
//! runs one full cycle over the program: a pointer walks the steps in order,
//! each step manipulating the operand stack, the memory cells and the typed
//! I/O parameters. Parse failures are syntax errors and permanently disable
//! the block; runtime errors are recorded through the `PERROR`/`STERR`
//! outputs and execution carries on.

use std::{
    cell::{Ref, RefCell},
    fmt,
    rc::Rc,
    str::FromStr,
};

use dcs_data::Block;

mod error;
mod exec;
mod graph;
mod opcode;
mod operand;
mod parameters;

pub use error::{CalcError, GraphingError};
pub use opcode::Opcode;
pub use operand::{NamedOperand, Operand};
pub use parameters::{
    CalcParameters,
    Connection,
    ParamId,
    Parameter,
    UnresolvedConnection,
};

use crate::signal::{Real, Value};

/// Number of STEP slots in a program.
pub const PROGRAM_LENGTH: usize = 50;

/// Runtime stack depth limit; the oldest element is dropped past this.
pub const MAX_STACK_DEPTH: usize = 32;

/// Initial seed of the per-block pseudo-random number generator, and the
/// upper bound `SEED` accepts (inclusive).
pub const INITIAL_SEED: u32 = 524_287;

/// Modulus of the multiplicative congruential generator.
const RNG_MODULUS: u32 = 2_796_203;

/// A value on the runtime stack, together with the step that pushed it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackElement {
    /// Pushed value.
    pub value: Real,
    /// 1-based step number that pushed it.
    pub step: usize,
}

/// A parsed step: mnemonic plus verified operand tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Resolved mnemonic.
    pub opcode: Opcode,
    /// Operands, already shape-checked against the opcode's rule.
    pub operands: Vec<Operand>,
}

impl Step {
    /// First operand, if any.
    fn operand(&self) -> Option<&Operand> {
        self.operands.first()
    }

    /// First operand as an integer literal; 0 when absent. Only called for
    /// opcodes whose rule guarantees a literal.
    fn literal(&self) -> i64 {
        match self.operand() {
            Some(Operand::Literal(literal)) => *literal,
            _ => 0,
        }
    }

    /// First operand as a named reference, if it is one.
    fn named(&self) -> Option<&NamedOperand> {
        match self.operand() {
            Some(Operand::Named(named)) => Some(named),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for operand in &self.operands {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

/// Clamp `value` into `[low, high]` without assuming the bounds are ordered.
fn clamp(value: f64, low: f64, high: f64) -> f64 {
    value.min(high).max(low)
}

/// An emulated CALC block.
pub struct Calc {
    compound: String,
    name: String,
    parameters: Rc<RefCell<CalcParameters>>,
    program: Rc<[Option<Step>]>,
    errors: Vec<(usize, CalcError)>,
    stack: Vec<StackElement>,
    pointer: usize,
    should_increment: bool,
    should_terminate: bool,
    syntax_error: bool,
    seed: u32,
}

impl Calc {
    /// Build a block from its parameter record, parsing every STEP string
    /// into the program. Parse failures are recorded as syntax errors and
    /// leave the offending program slot empty.
    pub fn new(
        compound: impl Into<String>,
        name: impl Into<String>,
        parameters: CalcParameters,
    ) -> Self {
        let mut calc = Calc {
            compound: compound.into(),
            name: name.into(),
            parameters: Rc::new(RefCell::new(parameters)),
            program: Rc::from(Vec::new()),
            errors: Vec::new(),
            stack: Vec::new(),
            pointer: 1,
            should_increment: true,
            should_terminate: false,
            syntax_error: false,
            seed: INITIAL_SEED,
        };

        // MA latches from INITMA at construction and gates non-memory
        // output writes from then on.
        let manual = calc.parameters.borrow().value(ParamId::INITMA).as_f64() != 0.0;
        calc.parameters
            .borrow_mut()
            .get_mut(ParamId::MA)
            .assign(Value::boolean(manual));

        let mut program = Vec::with_capacity(PROGRAM_LENGTH);
        for number in 1..=PROGRAM_LENGTH {
            let source = calc.parameters.borrow().step_source(number);
            match parse_step(&source) {
                Ok(step) => program.push(step),
                Err(error) => {
                    program.push(None);
                    calc.error(number, error);
                }
            }
        }
        calc.program = program.into();

        calc
    }

    /// Build a block straight from a parsed dump record.
    pub fn from_block(block: &Block) -> Self {
        Self::new(
            block.compound.clone(),
            block.name.clone(),
            CalcParameters::from_block(block),
        )
    }

    /// Compound containing the block.
    pub fn compound(&self) -> &str {
        &self.compound
    }

    /// Block name within its compound.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the parameter record.
    pub fn parameters(&self) -> Ref<'_, CalcParameters> {
        self.parameters.borrow()
    }

    /// Shared handle to the parameter record; connection resolution stores
    /// clones of this in referencing blocks.
    pub(crate) fn parameters_rc(&self) -> &Rc<RefCell<CalcParameters>> {
        &self.parameters
    }

    /// Parsed program slots, in step order. An empty slot is a no-op or an
    /// unrecoverable parse failure.
    pub fn program(&self) -> &[Option<Step>] {
        &self.program
    }

    /// Errors recorded during the last cycle (or during parsing, for syntax
    /// errors).
    pub fn errors(&self) -> &[(usize, CalcError)] {
        &self.errors
    }

    /// Runtime stack as of the end of the last cycle.
    pub fn stack(&self) -> &[StackElement] {
        &self.stack
    }

    /// Whether a parse failure has permanently disabled the block.
    pub fn syntax_error(&self) -> bool {
        self.syntax_error
    }

    /// Current PRNG seed.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Run one full cycle over the program.
    ///
    /// A block with a recorded syntax error never executes again.
    #[tracing::instrument(name = "cycle", level = "trace", skip(self), fields(block = %self))]
    pub fn execute(&mut self) {
        if self.syntax_error {
            return;
        }

        self.errors.clear();
        self.stack.clear();
        self.pointer = 1;
        self.should_increment = true;
        self.should_terminate = false;

        let program = Rc::clone(&self.program);
        while !self.should_terminate && self.pointer <= program.len() {
            if let Some(step) = &program[self.pointer - 1] {
                tracing::trace!(step = self.pointer, op = %step, "execute");
                self.execute_step(step);
            }

            if self.should_increment {
                self.pointer += 1;
            } else {
                self.should_increment = true;
            }
        }
    }

    /// Extract the logic-flow graph and serialise it as DOT text.
    pub fn to_dot(&self) -> Result<String, GraphingError> {
        graph::generate_dot(&self.compound, &self.name, &self.program)
    }

    /// Record `error` against `step_number`, mirroring it to the `PERROR`
    /// and `STERR` outputs. Negative codes stick and disable the block.
    fn error(&mut self, step_number: usize, error: CalcError) {
        {
            let mut parameters = self.parameters.borrow_mut();
            parameters
                .get_mut(ParamId::PERROR)
                .assign(Value::integer(f64::from(error.code())));
            parameters
                .get_mut(ParamId::STERR)
                .assign(Value::integer(step_number as f64));
        }
        self.errors.push((step_number, error));

        if error.is_syntax() {
            tracing::warn!(step = step_number, %error, block = %self, "syntax error");
            self.syntax_error = true;
        } else {
            tracing::debug!(step = step_number, %error, "runtime error");
        }
    }

    /// Push onto the stack, dropping the oldest element past the depth cap.
    fn push(&mut self, value: f64) {
        self.stack.push(StackElement {
            value: Real::new(value),
            step: self.pointer,
        });

        if self.stack.len() > MAX_STACK_DEPTH {
            self.stack.remove(0);
            self.error(self.pointer, CalcError::StackOverflow);
        }
    }

    /// Pop the top of the stack; an empty stack records an underflow and
    /// yields 0.
    fn pop(&mut self) -> f64 {
        match self.stack.pop() {
            Some(element) => element.value.get(),
            None => {
                self.error(self.pointer, CalcError::StackUnderflow);
                0.0
            }
        }
    }

    /// Pop `n` values, most recent first.
    fn pop_many(&mut self, n: i64) -> Vec<f64> {
        (0..n.max(0)).map(|_| self.pop()).collect()
    }

    /// Drain the stack, most recent first.
    fn pop_all(&mut self) -> Vec<f64> {
        let values = self
            .stack
            .iter()
            .rev()
            .map(|element| element.value.get())
            .collect();
        self.stack.clear();
        values
    }

    /// Accumulator: the top of the stack, without removal. An empty stack
    /// records an underflow and yields 0.
    fn acc(&mut self) -> f64 {
        match self.stack.last() {
            Some(element) => element.value.get(),
            None => {
                self.error(self.pointer, CalcError::StackUnderflow);
                0.0
            }
        }
    }

    /// Empty the stack.
    fn clear(&mut self) {
        self.stack.clear();
    }

    /// Move the pointer to step `target` and suppress the automatic
    /// increment. Targets outside the program record `INVALID_GOTO` and
    /// leave control to fall through.
    fn jump(&mut self, target: i64) {
        if !(1..=PROGRAM_LENGTH as i64).contains(&target) {
            self.error(self.pointer, CalcError::InvalidGoto);
            return;
        }

        self.pointer = target as usize;
        self.should_increment = false;
    }

    /// Next value of the multiplicative congruential generator, as a real
    /// in `[0, 1]`.
    fn rng(&mut self) -> f64 {
        self.seed = self.seed * 125 % RNG_MODULUS;
        Real::new(f64::from(self.seed) / f64::from(RNG_MODULUS)).get()
    }

    /// Read a named operand as a float. Inverted references project to a
    /// 0/1 boolean; scaled reals clamp between their `LSC`/`HSC` siblings.
    fn get_operand(&mut self, operand: &NamedOperand) -> f64 {
        let Some(id) = operand.param else {
            self.error(self.pointer, CalcError::InvalidOperand);
            return 0.0;
        };

        let value = self.parameters.borrow().value(id);

        if operand.inverted {
            return if value.as_f64() == 0.0 { 1.0 } else { 0.0 };
        }

        if operand.prefix.starts_with('R') {
            let low = self.scale_limit("LSC", operand);
            let high = self.scale_limit("HSC", operand);
            return clamp(value.as_f64(), low, high);
        }

        value.as_f64()
    }

    /// Write a named operand. Memory cells store unconditionally; all other
    /// targets are gated on `MA` and stored with the width and clamping of
    /// the field's value class.
    fn set_operand(&mut self, operand: &NamedOperand, value: f64) {
        let Some(id) = operand.param else {
            self.error(self.pointer, CalcError::InvalidOperand);
            return;
        };

        if operand.prefix.starts_with('M') {
            self.parameters
                .borrow_mut()
                .get_mut(id)
                .assign(Value::real(value));
            return;
        }

        if self.parameters.borrow().value(ParamId::MA).as_f64() == 0.0 {
            return;
        }

        let stored = match operand.prefix.chars().next() {
            Some('R') => {
                let low = self.scale_limit("LSC", operand);
                let high = self.scale_limit("HSC", operand);
                Some(Value::real(clamp(value, low, high)))
            }
            Some('I') => Some(Value::integer(value)),
            Some('L') => Some(Value::long(value)),
            Some('B') => Some(Value::boolean(value != 0.0)),
            _ => None,
        };

        if let Some(stored) = stored {
            self.parameters.borrow_mut().get_mut(id).assign(stored);
        }
    }

    /// Scale sibling of a scaled-real operand: `LSC`/`HSC` plus the channel
    /// letter and index digit, e.g. `RI01` clamps by `LSCI1`/`HSCI1`.
    fn scale_limit(&mut self, scale: &str, operand: &NamedOperand) -> f64 {
        let sibling = operand
            .prefix
            .chars()
            .nth(1)
            .zip(operand.suffix.chars().nth(1))
            .and_then(|(channel, index)| ParamId::from_name(&format!("{scale}{channel}{index}")));

        match sibling {
            Some(id) => self.parameters.borrow().value(id).as_f64(),
            None => {
                self.error(self.pointer, CalcError::InvalidOperand);
                0.0
            }
        }
    }
}

impl fmt::Display for Calc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.compound, self.name)
    }
}

/// Parse one STEP string into a verified step.
///
/// Comments run from the first `;` to the end of the line; an empty or
/// comment-only step is a no-op (`Ok(None)`). Unknown mnemonics and operand
/// tuples that fail the opcode's shape rule are syntax errors.
fn parse_step(source: &str) -> Result<Option<Step>, CalcError> {
    let code = source.split(';').next().unwrap_or_default();
    let mut tokens = code.split_whitespace();

    let Some(mnemonic) = tokens.next() else {
        return Ok(None);
    };

    let opcode = Opcode::from_str(mnemonic).map_err(|_| CalcError::InvalidOpcode)?;
    let operands: Vec<Operand> = tokens.filter_map(Operand::parse).collect();

    if operands.iter().all(Operand::resolves) && opcode.verify(&operands) {
        Ok(Some(Step { opcode, operands }))
    } else {
        Err(CalcError::InvalidOperand)
    }
}
