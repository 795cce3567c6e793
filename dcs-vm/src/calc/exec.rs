//! Opcode implementations.
//!
//! Dispatch is a single `match` over the mnemonic; the parsed operand tuple
//! rides on the step, so no per-step closures are allocated. Operand shapes
//! were checked at parse time, which keeps the extraction helpers here
//! infallible in practice.

use super::{
    error::CalcError,
    opcode::Opcode,
    operand::Operand,
    parameters::ParamId,
    Calc,
    Step,
    INITIAL_SEED,
};
use crate::signal::{Integer, Value};

/// Ceiling of the no-operand/literal `INC` forms.
const INCREMENT_CEILING: f64 = 16_777_214.0;

/// Floor of the no-operand/literal `DEC` forms.
const DECREMENT_FLOOR: f64 = -16_777_215.0;

/// Round half-way cases to the even neighbour (banker's rounding).
fn round_half_even(value: f64) -> f64 {
    let floor = value.floor();
    let diff = value - floor;
    if diff > 0.5 {
        floor + 1.0
    } else if diff < 0.5 {
        floor
    } else if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    }
}

/// Flooring integer division, remainder carrying the divisor's sign.
fn floor_div(numerator: i64, denominator: i64) -> i64 {
    let quotient = numerator / denominator;
    if numerator % denominator != 0 && (numerator < 0) != (denominator < 0) {
        quotient - 1
    } else {
        quotient
    }
}

/// Truncate a stack value into the 16-bit integer width.
fn to_integer(value: f64) -> i64 {
    i64::from(Integer::new(value).get())
}

impl Calc {
    /// Gather inputs for the diadic/polyadic shape: two values, a literal
    /// count, or the top of stack paired with a named operand.
    fn polyadic_two(&mut self, step: &Step) -> Vec<f64> {
        match step.operand() {
            None => self.pop_many(2),
            Some(Operand::Literal(count)) => self.pop_many(*count),
            Some(Operand::Named(operand)) => {
                let top = self.pop();
                let other = self.get_operand(operand);
                vec![top, other]
            }
        }
    }

    /// Gather inputs for the drain shape: the whole stack, a literal count,
    /// or the top of stack paired with a named operand.
    fn polyadic_all(&mut self, step: &Step) -> Vec<f64> {
        match step.operand() {
            None => self.pop_all(),
            Some(Operand::Literal(count)) => self.pop_many(*count),
            Some(Operand::Named(operand)) => {
                let top = self.pop();
                let other = self.get_operand(operand);
                vec![top, other]
            }
        }
    }

    /// Write `value` through the step's named operand, if it has one.
    fn set_named(&mut self, step: &Step, value: f64) {
        if let Some(operand) = step.named() {
            self.set_operand(operand, value);
        }
    }

    /// Execute one parsed step against the VM state.
    pub(crate) fn execute_step(&mut self, step: &Step) {
        use Opcode::*;

        match step.opcode {
            // Unary arithmetic.
            ABS => {
                let value = self.pop();
                self.push(value.abs());
            }
            CHS => {
                let value = self.pop();
                self.push(-value);
            }
            RND => {
                let value = self.pop();
                self.push(round_half_even(value));
            }
            TRC => {
                let value = self.pop();
                self.push(value.trunc());
            }
            SQR => {
                let value = self.pop();
                self.push(value * value);
            }
            SQRT => {
                let value = self.pop();
                if value < 0.0 {
                    self.error(self.pointer, CalcError::Sqrt);
                } else {
                    self.push(value.sqrt());
                }
            }
            LN => {
                // The domain check inspects the accumulator without popping.
                if self.acc() <= 0.0 {
                    self.error(self.pointer, CalcError::Ln);
                } else {
                    let value = self.pop();
                    self.push(value.ln());
                }
            }
            LOG => {
                if self.acc() <= 0.0 {
                    self.error(self.pointer, CalcError::Log);
                } else {
                    let value = self.pop();
                    self.push(value.log10());
                }
            }
            ALN => {
                let value = self.pop();
                self.push(value.exp());
            }
            ALOG => {
                let value = self.pop();
                self.push(10f64.powf(value));
            }

            // Diadic and polyadic arithmetic.
            ADD => {
                let sum: f64 = self.polyadic_two(step).iter().sum();
                self.push(sum);
            }
            SUB => match step.named() {
                None => {
                    let subtrahend = self.pop();
                    let minuend = self.pop();
                    self.push(minuend - subtrahend);
                }
                Some(operand) => {
                    let minuend = self.pop();
                    let subtrahend = self.get_operand(operand);
                    self.push(minuend - subtrahend);
                }
            },
            MUL => {
                let product: f64 = self.polyadic_two(step).iter().product();
                self.push(product);
            }
            DIV => {
                let (numerator, denominator) = match step.named() {
                    None => {
                        let denominator = self.pop();
                        (self.pop(), denominator)
                    }
                    Some(operand) => {
                        let denominator = self.get_operand(operand);
                        (self.pop(), denominator)
                    }
                };
                if denominator == 0.0 {
                    self.error(self.pointer, CalcError::Div);
                    self.push(0.0);
                } else {
                    self.push(numerator / denominator);
                }
            }
            IDIV => {
                let denominator = to_integer(self.pop());
                let numerator = to_integer(self.pop());
                if denominator == 0 {
                    self.error(self.pointer, CalcError::Div);
                    self.push(0.0);
                } else {
                    let quotient = floor_div(numerator, denominator);
                    let remainder = numerator - quotient * denominator;
                    self.push(quotient as f64);
                    self.set_named(step, remainder as f64);
                }
            }
            IMOD => {
                let denominator = to_integer(self.pop());
                let numerator = to_integer(self.pop());
                if denominator == 0 {
                    self.error(self.pointer, CalcError::Div);
                    self.push(0.0);
                } else {
                    let remainder = numerator - floor_div(numerator, denominator) * denominator;
                    self.push(remainder as f64);
                }
            }
            EXP => {
                let exponent = match step.named() {
                    None => self.pop(),
                    Some(operand) => self.get_operand(operand),
                };
                let base = self.pop();
                if base < 0.0 {
                    self.push(exponent);
                    self.error(self.pointer, CalcError::Exp);
                } else if base == 0.0 && exponent <= 0.0 {
                    self.push(0.0);
                } else {
                    self.push(base.powf(exponent));
                }
            }
            AVE => {
                let values = self.polyadic_two(step);
                if values.is_empty() {
                    self.push(0.0);
                } else {
                    self.push(values.iter().sum::<f64>() / values.len() as f64);
                }
            }
            MAX | MAXO => {
                let values = self.polyadic_all(step);
                let max = values.into_iter().reduce(f64::max).unwrap_or(0.0);
                self.push(max);
            }
            MIN => {
                let values = self.polyadic_all(step);
                let min = values.into_iter().reduce(f64::min).unwrap_or(0.0);
                self.push(min);
            }
            MEDN => {
                let mut values = self.pop_all();
                if values.is_empty() {
                    self.push(0.0);
                } else {
                    values.sort_by(f64::total_cmp);
                    let mid = values.len() / 2;
                    if values.len() % 2 == 0 {
                        self.push((values[mid - 1] + values[mid]) / 2.0);
                    } else {
                        self.push(values[mid]);
                    }
                }
            }
            INC => match step.operand() {
                None => {
                    let value = self.pop();
                    self.push((value + 1.0).min(INCREMENT_CEILING));
                }
                Some(Operand::Literal(amount)) => {
                    let amount = *amount as f64;
                    let value = self.pop();
                    self.push((value + amount).min(INCREMENT_CEILING));
                }
                Some(Operand::Named(operand)) => {
                    let value = self.get_operand(operand);
                    self.set_operand(operand, value + 1.0);
                }
            },
            DEC => match step.operand() {
                None => {
                    let value = self.pop();
                    self.push((value - 1.0).max(DECREMENT_FLOOR));
                }
                Some(Operand::Literal(amount)) => {
                    let amount = *amount as f64;
                    let value = self.pop();
                    self.push((value - amount).max(DECREMENT_FLOOR));
                }
                Some(Operand::Named(operand)) => {
                    let value = self.get_operand(operand);
                    self.set_operand(operand, value - 1.0);
                }
            },

            // Random numbers.
            RAND => {
                let value = self.rng();
                self.push(value);
            }
            RANG => {
                // Box-Muller from two uniform draws.
                let magnitude = (-2.0 * self.rng().ln()).sqrt();
                let rotation = (2.0 * std::f64::consts::PI * self.rng()).cos();
                self.push(magnitude * rotation);
            }
            SEED => {
                let acc = self.acc();
                if (0.0..=f64::from(INITIAL_SEED)).contains(&acc) {
                    self.seed = acc as u32;
                }
            }

            // Trigonometry, in radians.
            SIN => {
                let value = self.pop();
                self.push(value.sin());
            }
            COS => {
                let value = self.pop();
                self.push(value.cos());
            }
            TAN => {
                let value = self.pop();
                self.push(value.tan());
            }
            ASIN => {
                let value = self.pop();
                if !(-1.0..=1.0).contains(&value) {
                    self.error(self.pointer, CalcError::Asin);
                    self.push(value);
                } else {
                    self.push(value.asin());
                }
            }
            ACOS => {
                let value = self.pop();
                if !(-1.0..=1.0).contains(&value) {
                    self.error(self.pointer, CalcError::Acos);
                    self.push(value);
                } else {
                    self.push(value.acos());
                }
            }
            ATAN => {
                let value = self.pop();
                self.push(value.atan());
            }

            // Boolean logic; inputs coerce through integer truncation.
            AND => {
                let all = self
                    .polyadic_all(step)
                    .iter()
                    .all(|value| value.trunc() != 0.0);
                self.push(if all { 1.0 } else { 0.0 });
            }
            OR => {
                let any = self
                    .polyadic_all(step)
                    .iter()
                    .any(|value| value.trunc() != 0.0);
                self.push(if any { 1.0 } else { 0.0 });
            }
            NAND => {
                let all = self
                    .polyadic_all(step)
                    .iter()
                    .all(|value| value.trunc() != 0.0);
                self.push(if all { 0.0 } else { 1.0 });
            }
            NOR => {
                let any = self
                    .polyadic_all(step)
                    .iter()
                    .any(|value| value.trunc() != 0.0);
                self.push(if any { 0.0 } else { 1.0 });
            }
            XOR => {
                let parity = self
                    .polyadic_all(step)
                    .iter()
                    .filter(|value| value.trunc() != 0.0)
                    .count()
                    % 2;
                self.push(parity as f64);
            }
            NXOR => {
                let parity = self
                    .polyadic_all(step)
                    .iter()
                    .filter(|value| value.trunc() != 0.0)
                    .count()
                    % 2;
                self.push(if parity == 0 { 1.0 } else { 0.0 });
            }
            NOT => {
                let value = self.pop();
                self.push(if value == 0.0 { 1.0 } else { 0.0 });
            }

            // Flip-flops: pop reset, then set.
            FF => {
                let reset = self.pop() != 0.0;
                let set = self.pop() != 0.0;
                let output = match (set, reset) {
                    (false, false) | (true, true) => self.acc(),
                    (false, true) => 0.0,
                    (true, false) => 1.0,
                };
                self.push(output);
            }
            MRS => {
                let reset = self.pop() != 0.0;
                let set = self.pop() != 0.0;
                let output = match (set, reset) {
                    (false, false) => self.acc(),
                    (false, true) | (true, true) => 0.0,
                    (true, false) => 1.0,
                };
                self.push(output);
            }

            // Program control.
            END | EXIT => self.should_terminate = true,
            NOP => {}
            GTO => {
                let target = step.literal();
                self.jump(target);
            }
            BIZ | BIF => {
                if self.acc() == 0.0 {
                    self.jump(step.literal());
                }
            }
            BIT => {
                if self.acc() != 0.0 {
                    self.jump(step.literal());
                }
            }
            BIN => {
                if self.acc() < 0.0 {
                    self.jump(step.literal());
                }
            }
            BIP => {
                if self.acc() >= 0.0 {
                    self.jump(step.literal());
                }
            }
            // The block-initialising flag is not wired through; BII and SSI
            // never fire.
            BII | SSI => {}
            SSZ | SSF => {
                if self.acc() == 0.0 {
                    self.set_named(step, 1.0);
                    self.pointer += 1;
                }
            }
            SST => {
                if self.acc() != 0.0 {
                    self.set_named(step, 1.0);
                    self.pointer += 1;
                }
            }
            SSN => {
                if self.acc() < 0.0 {
                    self.set_named(step, 1.0);
                    self.pointer += 1;
                }
            }
            SSP => {
                if self.acc() >= 0.0 {
                    self.set_named(step, 1.0);
                    self.pointer += 1;
                }
            }

            // Stack and memory.
            POP => {
                self.pop();
            }
            CST => self.clear(),
            STM => {
                let value = self.acc();
                self.set_named(step, value);
            }
            LAC => {
                if let Some(operand) = step.named() {
                    let value = self.get_operand(operand);
                    self.push(value);
                }
            }
            CLA => {
                let mut parameters = self.parameters.borrow_mut();
                for cell in ParamId::MEMORY_CELLS {
                    parameters.get_mut(cell).assign(Value::real(0.0));
                }
            }
            CLM => self.set_named(step, 0.0),
            RCL => {
                if let Some(operand) = step.named() {
                    let value = self.get_operand(operand);
                    self.push(value);
                    self.set_operand(operand, 0.0);
                }
            }

            // Input and output.
            IN => match step.operand() {
                None => self.push(0.0),
                Some(Operand::Literal(literal)) => {
                    let literal = *literal as f64;
                    self.push(literal);
                }
                Some(Operand::Named(operand)) => {
                    let value = self.get_operand(operand);
                    self.push(value);
                }
            },
            OUT => {
                let value = self.acc();
                self.set_named(step, value);
            }

            // Recognised mnemonics whose runtime behaviour is reserved:
            // packed booleans, indirect addressing, status reads/writes,
            // timing and propagation.
            ANDX | CLRB | NANX | NORX | NOTX | NXOX | ORX | XORX | SETB | TSTB | DUP | SWP
            | GTI | STMI | LACI | INB | INH | INL | INR | INS | RBD | RCN | RE | RER
            | RON | ROO | RQE | RQL | CBD | CE | CEC | CHI | CHN | CLE | CLR | COO
            | DOFF | DON | OSP | PRI | PRO | PRP | REL | SAC | SBD | SE | SEC | SET
            | SIEC | SOO | STH | STL | TIM => {}
        }
    }
}
