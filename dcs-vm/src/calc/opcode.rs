//! Opcode mnemonics and the operand verification table.
//!
//! One entry per mnemonic the interpreter recognises. Parsing resolves a
//! step's first token through [`Opcode::from_str`]; verification checks the
//! operand tuple against the per-opcode rule in [`Opcode::verify`]. Several
//! mnemonics are recognised and verified but have reserved runtime
//! behaviour; the execution table treats them as no-ops.

use super::operand::{
    all_of,
    any_of,
    boolean,
    const_operand,
    input_parameter,
    integer,
    long,
    memory,
    no_operand,
    not_inverted,
    output_parameter,
    real,
    Operand,
};

/// Every opcode mnemonic the CALC interpreter recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum Opcode {
    /// Absolute value (unary).
    ABS,
    /// Arc cosine (unary).
    ACOS,
    /// Add (diadic or polyadic).
    ADD,
    /// Natural antilog (unary).
    ALN,
    /// Common antilog (unary).
    ALOG,
    /// Logical and (diadic or polyadic).
    AND,
    /// Packed logical and (polyadic).
    ANDX,
    /// Arc sine (unary).
    ASIN,
    /// Arc tangent (unary).
    ATAN,
    /// Average (diadic or polyadic).
    AVE,
    /// Branch if false (conditional branch).
    BIF,
    /// Branch if initializing (conditional branch).
    BII,
    /// Branch if negative (conditional branch).
    BIN,
    /// Branch if positive or zero (conditional branch).
    BIP,
    /// Branch if true (conditional branch).
    BIT,
    /// Branch if zero (conditional branch).
    BIZ,
    /// Clear bad status (output status).
    CBD,
    /// Clear error status (output status).
    CE,
    /// Clear error and propagation status (output status).
    CEC,
    /// Clear history.
    CHI,
    /// Clear step history.
    CHN,
    /// Change sign (unary).
    CHS,
    /// Clear all memory registers (memory).
    CLA,
    /// Clear error flag (error control).
    CLE,
    /// Clear memory register (memory).
    CLM,
    /// Clear (unconditional clear).
    CLR,
    /// Clear packed boolean (unconditional clear).
    CLRB,
    /// Clear out-of-service status (output status).
    COO,
    /// Cosine (unary).
    COS,
    /// Clear stack (stack).
    CST,
    /// Decrement (unary).
    DEC,
    /// Divide (diadic).
    DIV,
    /// Delayed OFF timing.
    DOFF,
    /// Delayed ON timing.
    DON,
    /// Duplicate (stack).
    DUP,
    /// End program (program termination).
    END,
    /// Exit program (program termination).
    EXIT,
    /// Exponent (diadic).
    EXP,
    /// Flip-flop (logic).
    FF,
    /// Go to indirect (unconditional branch).
    GTI,
    /// Go to (unconditional branch).
    GTO,
    /// Integer division (diadic).
    IDIV,
    /// Integer modulus (diadic).
    IMOD,
    /// Input (input value).
    IN,
    /// Input indexed boolean (input value).
    INB,
    /// Increment (unary).
    INC,
    /// Input high order (input value).
    INH,
    /// Input low order (input value).
    INL,
    /// Input indexed real (input value).
    INR,
    /// Input status (input status).
    INS,
    /// Load accumulator (memory/stack).
    LAC,
    /// Load accumulator indirect (memory/stack).
    LACI,
    /// Natural logarithm (unary).
    LN,
    /// Common logarithm (unary).
    LOG,
    /// Maximum (diadic or polyadic).
    MAX,
    /// Maximum; identical to `MAX`.
    MAXO,
    /// Median (polyadic).
    MEDN,
    /// Minimum (diadic or polyadic).
    MIN,
    /// Master reset flip-flop (logic).
    MRS,
    /// Multiply (diadic or polyadic).
    MUL,
    /// Logical not and (diadic or polyadic).
    NAND,
    /// Packed logical nand (polyadic).
    NANX,
    /// No operation.
    NOP,
    /// Logical not or (diadic or polyadic).
    NOR,
    /// Packed logical nor (polyadic, packed boolean).
    NORX,
    /// Not (unary).
    NOT,
    /// Packed logical not (unary, packed boolean).
    NOTX,
    /// Logical not exclusive or (diadic or polyadic).
    NXOR,
    /// Packed logical not exclusive or (polyadic, packed boolean).
    NXOX,
    /// Logical or (diadic or polyadic).
    OR,
    /// Packed logical or (polyadic, packed boolean).
    ORX,
    /// One-shot pulse timing.
    OSP,
    /// Output (output value).
    OUT,
    /// Pop stack (stack).
    POP,
    /// Propagate upstream (cascade/propagation).
    PRI,
    /// Propagate downstream (cascade).
    PRO,
    /// Propagate errors (propagation).
    PRP,
    /// Generate random number (unary).
    RAND,
    /// Generate random number, Gaussian (unary).
    RANG,
    /// Read bad and out-of-service bits (input status).
    RBD,
    /// Read and clear (input value/unconditional clear).
    RCL,
    /// Read connect status (input linkage type).
    RCN,
    /// Read error bit (input status).
    RE,
    /// Clear secure status (output status).
    REL,
    /// Read error flag (error control).
    RER,
    /// Round (unary).
    RND,
    /// Read in-service status (input status).
    RON,
    /// Read out-of-service bit (input status).
    ROO,
    /// Read quality including error (input status).
    RQE,
    /// Read quality (input status).
    RQL,
    /// Store accumulator in output (output value).
    SAC,
    /// Set bad status (output status).
    SBD,
    /// Set error status (output status).
    SE,
    /// Set secure status (output status).
    SEC,
    /// Seed random number generator (unary).
    SEED,
    /// Set (unconditional set).
    SET,
    /// Set packed boolean (unconditional set).
    SETB,
    /// Skip if error cleared (error control).
    SIEC,
    /// Sine (unary).
    SIN,
    /// Set out-of-service status (output status).
    SOO,
    /// Square (unary).
    SQR,
    /// Square root (unary).
    SQRT,
    /// Set boolean and skip if accumulator false; identical to `SSZ`.
    SSF,
    /// Set boolean and skip if block initializing (program control).
    SSI,
    /// Set boolean and skip if accumulator negative (program control).
    SSN,
    /// Set boolean and skip if accumulator positive (program control).
    SSP,
    /// Set boolean and skip if accumulator true (program control).
    SST,
    /// Set boolean and skip if accumulator zero (program control).
    SSZ,
    /// Store high order (output value).
    STH,
    /// Store low order (output value).
    STL,
    /// Store memory (memory/stack).
    STM,
    /// Store memory indirect (memory/stack).
    STMI,
    /// Subtract (diadic).
    SUB,
    /// Swap (operand/stack).
    SWP,
    /// Tangent (unary).
    TAN,
    /// Time since midnight (time reporting).
    TIM,
    /// Truncate (unary).
    TRC,
    /// Test packed boolean (stack).
    TSTB,
    /// Logical exclusive or (diadic or polyadic).
    XOR,
    /// Packed logical exclusive or (polyadic, packed boolean).
    XORX,
}

impl Opcode {
    /// Check the operand tuple against this mnemonic's shape rule.
    pub fn verify(self, operands: &[Operand]) -> bool {
        use Opcode::*;
        match self {
            // Pure stack operations take nothing.
            ABS | ACOS | ALN | ALOG | ASIN | ATAN | CHI | CHS | CLA | CLE | COS | CST
            | DUP | END | EXIT | FF | IMOD | LN | LOG | MEDN | MRS | NOP | NOT | NOTX
            | POP | RAND | RANG | RER | RND | SEED | SIEC | SIN | SQR | SQRT | TAN
            | TIM | TRC => no_operand(operands),
            BIF | BII | BIN | BIP | BIT | BIZ | CHN | GTO => const_operand(operands),
            ANDX | CLRB | NANX | NORX | NXOX | ORX | SETB | TSTB | XORX => {
                any_of(operands, &[no_operand, const_operand])
            }
            ADD | AVE | MAX | MAXO | MIN | MUL => any_of(
                operands,
                &[no_operand, const_operand, |o| {
                    all_of(o, &[|o| any_of(o, &[real, memory]), not_inverted])
                }],
            ),
            DIV | EXP | SUB => any_of(
                operands,
                &[no_operand, |o| {
                    all_of(o, &[|o| any_of(o, &[real, memory]), not_inverted])
                }],
            ),
            IDIV => any_of(operands, &[no_operand, |o| all_of(o, &[memory, not_inverted])]),
            AND => any_of(
                operands,
                &[no_operand, const_operand, boolean, integer, memory],
            ),
            NAND | NOR | NXOR | OR => any_of(
                operands,
                &[no_operand, const_operand, real, integer, boolean],
            ),
            XOR => any_of(
                operands,
                &[no_operand, const_operand, boolean, integer, memory],
            ),
            DEC | INC => any_of(
                operands,
                &[no_operand, const_operand, |o| {
                    all_of(
                        o,
                        &[
                            |o| {
                                any_of(o, &[
                                    |o| all_of(o, &[|o| any_of(o, &[real, integer, long]), output_parameter]),
                                    memory,
                                ])
                            },
                            not_inverted,
                        ],
                    )
                }],
            ),
            IN => any_of(
                operands,
                &[no_operand, const_operand, real, integer, boolean, memory],
            ),
            OUT => any_of(
                operands,
                &[
                    |o| all_of(o, &[output_parameter, not_inverted]),
                    |o| all_of(o, &[boolean, output_parameter]),
                    memory,
                ],
            ),
            SAC => any_of(
                operands,
                &[
                    |o| {
                        all_of(o, &[
                            |o| any_of(o, &[real, integer]),
                            output_parameter,
                            not_inverted,
                        ])
                    },
                    |o| all_of(o, &[boolean, output_parameter]),
                    memory,
                ],
            ),
            GTI => all_of(
                operands,
                &[|o| any_of(o, &[real, integer, memory]), not_inverted],
            ),
            CLM | LAC | LACI | OSP | STM | STMI => {
                all_of(operands, &[memory, not_inverted])
            }
            DOFF | DON => any_of(
                operands,
                &[no_operand, const_operand, |o| all_of(o, &[memory, not_inverted])],
            ),
            CBD | CE | CEC | COO | SBD | SE | SEC | SOO => {
                all_of(operands, &[output_parameter, not_inverted])
            }
            CLR | SET => any_of(
                operands,
                &[no_operand, |o| {
                    all_of(o, &[|o| any_of(o, &[output_parameter, memory]), not_inverted])
                }],
            ),
            SSF | SSI | SSN | SSP | SST | SSZ => all_of(
                operands,
                &[|o| any_of(o, &[output_parameter, memory]), not_inverted],
            ),
            INB => any_of(
                operands,
                &[no_operand, |o| {
                    all_of(
                        o,
                        &[
                            |o| {
                                any_of(o, &[
                                    |o| all_of(o, &[integer, input_parameter]),
                                    memory,
                                ])
                            },
                            not_inverted,
                        ],
                    )
                }],
            ),
            INR => any_of(
                operands,
                &[no_operand, |o| {
                    all_of(
                        o,
                        &[
                            |o| {
                                any_of(o, &[
                                    |o| all_of(o, &[integer, output_parameter]),
                                    memory,
                                ])
                            },
                            not_inverted,
                        ],
                    )
                }],
            ),
            INH | INL => all_of(operands, &[long, not_inverted]),
            INS | RE | RON | ROO | RBD => all_of(
                operands,
                &[|o| any_of(o, &[real, boolean, integer, long]), not_inverted],
            ),
            RCL => any_of(operands, &[real, boolean, integer, long, memory]),
            RCN | RQE | RQL => all_of(
                operands,
                &[
                    |o| any_of(o, &[real, integer, long, boolean]),
                    input_parameter,
                    not_inverted,
                ],
            ),
            REL => all_of(
                operands,
                &[
                    |o| any_of(o, &[real, integer, long, boolean]),
                    output_parameter,
                    not_inverted,
                ],
            ),
            PRI | PRO | PRP => all_of(operands, &[real, output_parameter, not_inverted]),
            STH | STL => all_of(operands, &[long, output_parameter, not_inverted]),
            SWP => any_of(
                operands,
                &[no_operand, |o| {
                    all_of(
                        o,
                        &[
                            |o| {
                                any_of(o, &[
                                    |o| {
                                        all_of(o, &[
                                            |o| any_of(o, &[real, boolean, integer]),
                                            output_parameter,
                                        ])
                                    },
                                    memory,
                                ])
                            },
                            not_inverted,
                        ],
                    )
                }],
            ),
        }
    }

    /// `END` / `EXIT`: merged into the synthetic graph end node.
    pub(crate) fn is_termination(self) -> bool {
        matches!(self, Opcode::END | Opcode::EXIT)
    }

    /// Conditional branches rendered as graph diamonds.
    pub(crate) fn is_conditional_branch(self) -> bool {
        matches!(
            self,
            Opcode::BIF | Opcode::BIZ | Opcode::BII | Opcode::BIN | Opcode::BIP | Opcode::BIT
        )
    }

    /// Unconditional branches.
    pub(crate) fn is_unconditional_branch(self) -> bool {
        matches!(self, Opcode::GTO)
    }

    /// Instructions whose control flow cannot be followed statically.
    pub(crate) fn is_breaking(self) -> bool {
        matches!(self, Opcode::GTI)
    }

    /// Any branch.
    pub(crate) fn is_branch(self) -> bool {
        self.is_conditional_branch() || self.is_unconditional_branch()
    }

    /// Branches and terminations: instructions that end a sequential group.
    pub(crate) fn is_special(self) -> bool {
        self.is_branch() || self.is_termination()
    }
}
