//! DCS control-block emulation core.
//!
//! The centrepiece is the CALC block: a programmable control block whose
//! behaviour is defined by up to fifty textual step instructions, executed
//! each control cycle against an operand stack, twenty-four memory cells and
//! a fixed record of typed I/O parameters. This crate provides:
//!
//! - [`signal`]: value primitives with bit-exact width and half-precision
//!   emulation, plus the packed signal status word;
//! - [`calc`]: the CALC step parser, operand verifier, execution engine and
//!   logic-flow graph extractor;
//! - [`emulator`]: the host that owns blocks, resolves inter-block
//!   connections and drives one round-robin pass per tick.
//!
//! Blocks are constructed from [`dcs_data::Block`] records parsed out of CP
//! configuration dumps.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

pub mod calc;
pub mod emulator;
pub mod signal;

#[doc(no_inline)]
pub use dcs_data;

pub use calc::Calc;
pub use emulator::{Emulator, EmulatorError};

pub mod prelude {
    //! Convenience re-exports for typical embedders.

    #[doc(no_inline)]
    pub use dcs_data::{parse_dump, Block};

    pub use crate::{
        calc::{
            Calc,
            CalcError,
            CalcParameters,
            GraphingError,
            Opcode,
            Operand,
            ParamId,
            Parameter,
            Step,
        },
        emulator::{Emulator, EmulatorError},
        signal::{Real, Status, Value},
    };
}
