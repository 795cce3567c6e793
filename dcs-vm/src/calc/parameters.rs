//! The fixed-shape CALC parameter record.
//!
//! Every canonical parameter is declared once in the [`calc_parameters!`]
//! table below, which generates the [`ParamId`] enum, the default table, and
//! the name index. A named operand lookup is an ordinary hash probe
//! returning an option; parameter storage is a slot vector indexed by id.

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::Rc,
    sync::OnceLock,
};

use dcs_data::{connection_parts, Block};
use strum::IntoEnumIterator;

use super::PROGRAM_LENGTH;
use crate::signal::{Signal, Value};

/// Value class and default for one canonical parameter.
#[derive(Debug, Clone, Copy)]
enum ParamDefault {
    Real(f64),
    Integer(f64),
    Short(f64),
    Long(f64),
    Bool(bool),
    Str(&'static str),
}

impl ParamDefault {
    fn to_value(self) -> Value {
        match self {
            ParamDefault::Real(v) => Value::real(v),
            ParamDefault::Integer(v) => Value::integer(v),
            ParamDefault::Short(v) => Value::short(v),
            ParamDefault::Long(v) => Value::long(v),
            ParamDefault::Bool(v) => Value::boolean(v),
            ParamDefault::Str(v) => Value::text(v),
        }
    }
}

macro_rules! calc_parameters {
    ($($name:ident: $kind:ident = $default:expr),* $(,)?) => {
        /// Canonical CALC parameter identifiers.
        #[allow(missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
        #[repr(u16)]
        pub enum ParamId {
            $($name),*
        }

        impl ParamId {
            /// Number of canonical parameters.
            pub const COUNT: usize = [$(ParamId::$name),*].len();
        }

        /// Canonical name and default of every parameter, in id order.
        const PARAM_DEFS: [(&str, ParamDefault); ParamId::COUNT] = [
            $((stringify!($name), ParamDefault::$kind($default))),*
        ];
    };
}

calc_parameters! {
    NAME: Str = "",
    TYPE: Integer = 18.0,
    DESCRP: Str = "",
    PERIOD: Short = 1.0,
    PHASE: Integer = 0.0,
    LOOPID: Str = "",
    MA: Bool = false,
    INITMA: Short = 1.0,
    TIMINI: Short = 0.0,
    BLKSTA: Integer = 0.0,
    PERROR: Integer = 0.0,
    STERR: Integer = 0.0,

    RI01: Real = 0.0,
    RI02: Real = 0.0,
    RI03: Real = 0.0,
    RI04: Real = 0.0,
    RI05: Real = 0.0,
    RI06: Real = 0.0,
    RI07: Real = 0.0,
    RI08: Real = 0.0,
    HSCI1: Real = 100.0,
    HSCI2: Real = 100.0,
    HSCI3: Real = 100.0,
    HSCI4: Real = 100.0,
    HSCI5: Real = 100.0,
    HSCI6: Real = 100.0,
    HSCI7: Real = 100.0,
    HSCI8: Real = 100.0,
    LSCI1: Real = 0.0,
    LSCI2: Real = 0.0,
    LSCI3: Real = 0.0,
    LSCI4: Real = 0.0,
    LSCI5: Real = 0.0,
    LSCI6: Real = 0.0,
    LSCI7: Real = 0.0,
    LSCI8: Real = 0.0,
    DELTI1: Real = 1.0,
    DELTI2: Real = 1.0,
    DELTI3: Real = 1.0,
    DELTI4: Real = 1.0,
    DELTI5: Real = 1.0,
    DELTI6: Real = 1.0,
    DELTI7: Real = 1.0,
    DELTI8: Real = 1.0,
    EI1: Str = "%",
    EI2: Str = "%",
    EI3: Str = "%",
    EI4: Str = "%",
    EI5: Str = "%",
    EI6: Str = "%",
    EI7: Str = "%",
    EI8: Str = "%",
    BI01: Bool = false,
    BI02: Bool = false,
    BI03: Bool = false,
    BI04: Bool = false,
    BI05: Bool = false,
    BI06: Bool = false,
    BI07: Bool = false,
    BI08: Bool = false,
    BI09: Bool = false,
    BI10: Bool = false,
    BI11: Bool = false,
    BI12: Bool = false,
    BI13: Bool = false,
    BI14: Bool = false,
    BI15: Bool = false,
    BI16: Bool = false,
    II01: Integer = 0.0,
    II02: Integer = 0.0,
    LI01: Long = 0.0,
    LI02: Long = 0.0,

    RO01: Real = 0.0,
    RO02: Real = 0.0,
    RO03: Real = 0.0,
    RO04: Real = 0.0,
    HSCO1: Real = 100.0,
    HSCO2: Real = 100.0,
    HSCO3: Real = 100.0,
    HSCO4: Real = 100.0,
    LSCO1: Real = 0.0,
    LSCO2: Real = 0.0,
    LSCO3: Real = 0.0,
    LSCO4: Real = 0.0,
    EO1: Str = "%",
    EO2: Str = "%",
    EO3: Str = "%",
    EO4: Str = "%",
    BO01: Bool = false,
    BO02: Bool = false,
    BO03: Bool = false,
    BO04: Bool = false,
    BO05: Bool = false,
    BO06: Bool = false,
    BO07: Bool = false,
    BO08: Bool = false,
    IO01: Integer = 0.0,
    IO02: Integer = 0.0,
    IO03: Integer = 0.0,
    IO04: Integer = 0.0,
    IO05: Integer = 0.0,
    IO06: Integer = 0.0,
    LO01: Long = 0.0,
    LO02: Long = 0.0,

    M01: Real = 0.0,
    M02: Real = 0.0,
    M03: Real = 0.0,
    M04: Real = 0.0,
    M05: Real = 0.0,
    M06: Real = 0.0,
    M07: Real = 0.0,
    M08: Real = 0.0,
    M09: Real = 0.0,
    M10: Real = 0.0,
    M11: Real = 0.0,
    M12: Real = 0.0,
    M13: Real = 0.0,
    M14: Real = 0.0,
    M15: Real = 0.0,
    M16: Real = 0.0,
    M17: Real = 0.0,
    M18: Real = 0.0,
    M19: Real = 0.0,
    M20: Real = 0.0,
    M21: Real = 0.0,
    M22: Real = 0.0,
    M23: Real = 0.0,
    M24: Real = 0.0,

    STEP01: Str = "",
    STEP02: Str = "",
    STEP03: Str = "",
    STEP04: Str = "",
    STEP05: Str = "",
    STEP06: Str = "",
    STEP07: Str = "",
    STEP08: Str = "",
    STEP09: Str = "",
    STEP10: Str = "",
    STEP11: Str = "",
    STEP12: Str = "",
    STEP13: Str = "",
    STEP14: Str = "",
    STEP15: Str = "",
    STEP16: Str = "",
    STEP17: Str = "",
    STEP18: Str = "",
    STEP19: Str = "",
    STEP20: Str = "",
    STEP21: Str = "",
    STEP22: Str = "",
    STEP23: Str = "",
    STEP24: Str = "",
    STEP25: Str = "",
    STEP26: Str = "",
    STEP27: Str = "",
    STEP28: Str = "",
    STEP29: Str = "",
    STEP30: Str = "",
    STEP31: Str = "",
    STEP32: Str = "",
    STEP33: Str = "",
    STEP34: Str = "",
    STEP35: Str = "",
    STEP36: Str = "",
    STEP37: Str = "",
    STEP38: Str = "",
    STEP39: Str = "",
    STEP40: Str = "",
    STEP41: Str = "",
    STEP42: Str = "",
    STEP43: Str = "",
    STEP44: Str = "",
    STEP45: Str = "",
    STEP46: Str = "",
    STEP47: Str = "",
    STEP48: Str = "",
    STEP49: Str = "",
    STEP50: Str = "",
}

impl ParamId {
    /// The 24 memory cells, in order.
    pub const MEMORY_CELLS: [ParamId; 24] = [
        ParamId::M01,
        ParamId::M02,
        ParamId::M03,
        ParamId::M04,
        ParamId::M05,
        ParamId::M06,
        ParamId::M07,
        ParamId::M08,
        ParamId::M09,
        ParamId::M10,
        ParamId::M11,
        ParamId::M12,
        ParamId::M13,
        ParamId::M14,
        ParamId::M15,
        ParamId::M16,
        ParamId::M17,
        ParamId::M18,
        ParamId::M19,
        ParamId::M20,
        ParamId::M21,
        ParamId::M22,
        ParamId::M23,
        ParamId::M24,
    ];

    /// Canonical (uppercase) parameter name.
    pub fn name(self) -> &'static str {
        PARAM_DEFS[self as usize].0
    }

    /// Look up a parameter by canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        static INDEX: OnceLock<HashMap<&'static str, ParamId>> = OnceLock::new();
        INDEX
            .get_or_init(|| ParamId::iter().map(|id| (id.name(), id)).collect())
            .get(name)
            .copied()
    }

    /// STEP parameter for 1-based step `number`.
    pub fn step(number: usize) -> Option<Self> {
        if !(1..=PROGRAM_LENGTH).contains(&number) {
            return None;
        }
        ParamId::from_name(&format!("STEP{number:02}"))
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A textual reference to another block's parameter, awaiting resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedConnection {
    /// Compound of the referenced block.
    pub compound: String,
    /// Name of the referenced block.
    pub block: String,
    /// Referenced parameter name.
    pub parameter: String,
}

impl fmt::Display for UnresolvedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.compound, self.block, self.parameter)
    }
}

/// A resolved reference to another block's parameter.
///
/// Reads forward to the referenced store; connected parameters reject
/// writes.
#[derive(Clone)]
pub struct Connection {
    pub(crate) params: Rc<RefCell<CalcParameters>>,
    pub(crate) param: ParamId,
}

impl Connection {
    fn read(&self) -> Value {
        self.params.borrow().value(self.param)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("param", &self.param)
            .finish_non_exhaustive()
    }
}

/// A block parameter slot.
#[derive(Debug, Clone)]
pub enum Parameter {
    /// A directly held value.
    Value(Value),
    /// A value carrying signal status.
    Signal(Signal),
    /// A connection reference not yet resolved by the host.
    Unresolved(UnresolvedConnection),
    /// A resolved connection; reads forward to the referenced block.
    Connection(Connection),
}

impl Parameter {
    /// Current value; follows resolved connections.
    ///
    /// # Panics
    ///
    /// Reading an unresolved connection is a host contract violation and
    /// panics; the emulator resolves every connection before the first tick.
    pub fn value(&self) -> Value {
        match self {
            Parameter::Value(value) => value.clone(),
            Parameter::Signal(signal) => signal.value.clone(),
            Parameter::Connection(connection) => connection.read(),
            Parameter::Unresolved(connection) => {
                panic!("read of unresolved connection {connection}")
            }
        }
    }

    /// Overwrite the held value.
    ///
    /// # Panics
    ///
    /// Connected parameters (resolved or not) reject writes; assigning to
    /// one is a host contract violation.
    pub fn assign(&mut self, value: Value) {
        match self {
            Parameter::Value(held) => *held = value,
            Parameter::Signal(signal) => signal.value = value,
            Parameter::Connection(_) => panic!("cannot assign to a connected parameter"),
            Parameter::Unresolved(connection) => {
                panic!("write to unresolved connection {connection}")
            }
        }
    }

    fn coerce(&mut self, raw: &str) {
        match self {
            Parameter::Value(value) => value.coerce(raw),
            Parameter::Signal(signal) => signal.value.coerce(raw),
            Parameter::Unresolved(_) | Parameter::Connection(_) => {}
        }
    }
}

/// Fixed-shape record of every canonical CALC parameter.
#[derive(Debug, Clone)]
pub struct CalcParameters {
    slots: Vec<Parameter>,
}

impl Default for CalcParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl CalcParameters {
    /// A record with every parameter at its default.
    pub fn new() -> Self {
        CalcParameters {
            slots: PARAM_DEFS
                .iter()
                .map(|(_, default)| Parameter::Value(default.to_value()))
                .collect(),
        }
    }

    /// Build a record from a block's raw configuration.
    ///
    /// Each non-empty entry naming a canonical field (other than `TYPE`) is
    /// coerced into the field's value class, unless it is a connection
    /// reference, in which case the slot becomes [`Parameter::Unresolved`].
    /// An empty compound in the reference means the containing block's
    /// compound.
    pub fn from_block(block: &Block) -> Self {
        let mut parameters = Self::new();

        for (key, raw) in &block.config {
            if raw.is_empty() || key == "TYPE" {
                continue;
            }
            let Some(id) = ParamId::from_name(key) else {
                continue;
            };
            if !raw.contains('.') || !raw.contains(':') {
                parameters.get_mut(id).coerce(raw);
            } else if let Some(parts) = connection_parts(raw) {
                let compound = if parts.compound.is_empty() {
                    block.compound.as_str()
                } else {
                    parts.compound
                };
                *parameters.get_mut(id) = Parameter::Unresolved(UnresolvedConnection {
                    compound: compound.to_string(),
                    block: parts.block.to_string(),
                    parameter: parts.parameter.to_string(),
                });
            }
        }

        parameters
    }

    /// Borrow the slot for `id`.
    pub fn get(&self, id: ParamId) -> &Parameter {
        &self.slots[id as usize]
    }

    /// Mutably borrow the slot for `id`.
    pub fn get_mut(&mut self, id: ParamId) -> &mut Parameter {
        &mut self.slots[id as usize]
    }

    /// Current value of `id`; follows resolved connections.
    pub fn value(&self, id: ParamId) -> Value {
        self.get(id).value()
    }

    /// Replace the slot for `id` with a direct value.
    pub fn set(&mut self, id: ParamId, value: Value) {
        self.slots[id as usize] = Parameter::Value(value);
    }

    /// Store program text into STEP `number` (1-based).
    ///
    /// # Panics
    ///
    /// Panics when `number` is outside `1..=50`.
    pub fn set_step(&mut self, number: usize, source: &str) {
        let id = ParamId::step(number)
            .unwrap_or_else(|| panic!("step number out of range: {number}"));
        self.set(id, Value::text(source));
    }

    /// Program text of STEP `number` (1-based); empty when unset.
    pub fn step_source(&self, number: usize) -> String {
        ParamId::step(number)
            .and_then(|id| self.value(id).as_text().map(str::to_string))
            .unwrap_or_default()
    }

    /// Iterate over every slot, mutably; used by the host to resolve
    /// connections in place.
    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.slots.iter_mut()
    }
}
