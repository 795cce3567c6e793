//! Round-robin host for emulated blocks.
//!
//! The emulator owns every block and drives one pass over all of them per
//! logical tick. Before the first tick it resolves the textual connection
//! references left by block construction into concrete parameter handles;
//! a reference to a missing block or parameter is fatal.

use std::{collections::HashMap, rc::Rc};

use dcs_data::Block;

use crate::calc::{Calc, Connection, ParamId, Parameter};

/// Host-level failures; the VM itself never raises these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmulatorError {
    /// A block whose `TYPE` the emulator cannot instantiate.
    #[error("block type not supported: `{0}`")]
    UnsupportedBlockType(String),
    /// A connection reference naming a block or parameter that does not
    /// exist.
    #[error("unresolved connection `{compound}:{block}.{parameter}`")]
    UnresolvedConnection {
        /// Compound of the missing reference.
        compound: String,
        /// Block of the missing reference.
        block: String,
        /// Parameter of the missing reference.
        parameter: String,
    },
}

/// Owns emulated blocks and executes them in insertion order.
#[derive(Default)]
pub struct Emulator {
    blocks: Vec<Calc>,
    index: HashMap<(String, String), usize>,
    resolved: bool,
}

impl Emulator {
    /// An empty emulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate an emulated block from a dump record, dispatching on its
    /// configured `TYPE`.
    pub fn create_block(&self, block: &Block) -> Result<Calc, EmulatorError> {
        match block.block_type() {
            "CALC" => Ok(Calc::from_block(block)),
            other => Err(EmulatorError::UnsupportedBlockType(other.to_string())),
        }
    }

    /// Add an already constructed block, replacing any block with the same
    /// identity.
    pub fn add_block(&mut self, block: Calc) {
        let key = (block.compound().to_string(), block.name().to_string());
        match self.index.get(&key) {
            Some(&existing) => self.blocks[existing] = block,
            None => {
                self.index.insert(key, self.blocks.len());
                self.blocks.push(block);
            }
        }
    }

    /// Instantiate a block from a dump record and add it.
    pub fn create_and_add_block(&mut self, block: &Block) -> Result<(), EmulatorError> {
        let block = self.create_block(block)?;
        tracing::debug!(block = %block, "block added");
        self.add_block(block);
        Ok(())
    }

    /// Borrow a block by identity.
    pub fn get(&self, compound: &str, name: &str) -> Option<&Calc> {
        self.index
            .get(&(compound.to_string(), name.to_string()))
            .map(|&position| &self.blocks[position])
    }

    /// Blocks in insertion order.
    pub fn blocks(&self) -> impl Iterator<Item = &Calc> {
        self.blocks.iter()
    }

    /// Perform one tick: resolve connections on the first call, then
    /// execute every block once, in insertion order.
    #[tracing::instrument(name = "tick", level = "debug", skip(self))]
    pub fn execute(&mut self) -> Result<(), EmulatorError> {
        if !self.resolved {
            self.resolve_connections()?;
            self.resolved = true;
        }

        for block in &mut self.blocks {
            block.execute();
        }

        Ok(())
    }

    /// Replace every unresolved connection with a handle to the referenced
    /// block's parameter store.
    fn resolve_connections(&mut self) -> Result<(), EmulatorError> {
        for position in 0..self.blocks.len() {
            let parameters = Rc::clone(self.blocks[position].parameters_rc());
            let mut parameters = parameters.borrow_mut();

            for slot in parameters.slots_mut() {
                let Parameter::Unresolved(reference) = slot else {
                    continue;
                };

                let target = self
                    .index
                    .get(&(reference.compound.clone(), reference.block.clone()))
                    .map(|&target| &self.blocks[target]);
                let param = ParamId::from_name(&reference.parameter);

                match (target, param) {
                    (Some(target), Some(param)) => {
                        tracing::debug!(reference = %reference, "connection resolved");
                        *slot = Parameter::Connection(Connection {
                            params: Rc::clone(target.parameters_rc()),
                            param,
                        });
                    }
                    _ => {
                        return Err(EmulatorError::UnresolvedConnection {
                            compound: reference.compound.clone(),
                            block: reference.block.clone(),
                            parameter: reference.parameter.clone(),
                        })
                    }
                }
            }
        }

        Ok(())
    }
}
