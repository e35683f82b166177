use hashbrown::HashMap;

use super::code_builder::byte_offsets;
use super::instruction_set::Instruction;
use super::refs::{Label, Type};
use crate::Vec;

/// A finished method body: instructions with resolved labels.
#[derive(Clone, PartialEq)]
pub struct Code<'a> {
    pub instructions: Vec<Instruction<'a>>,
    /// Instruction index each label is bound to (indexed by label id).
    pub labels: Vec<usize>,
    pub locals: Vec<Type<'a>>,
    pub max_stack_size: usize,
    pub returns_value: bool,
}

impl<'a> Code<'a> {
    /// Instruction index a label resolves to.
    pub fn target(&self, label: Label) -> usize {
        self.labels[label.index()]
    }

    /// Byte offset of every instruction, plus the end offset.
    pub fn byte_offsets(&self) -> Vec<usize> {
        byte_offsets(&self.instructions)
    }

    /// Encoded size of the body in bytes.
    pub fn code_size(&self) -> usize {
        self.instructions.iter().map(Instruction::size).sum()
    }
}

impl core::fmt::Debug for Code<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Code {{")?;
        write!(f, "  locals: [")?;
        for (i, ty) in self.locals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", ty)?;
        }
        writeln!(f, "]")?;
        writeln!(f, "  max_stack_size: {}", self.max_stack_size)?;

        // Only labels that some branch targets get printed.
        let mut by_position: HashMap<usize, Vec<Label>> = HashMap::new();
        for instr in &self.instructions {
            if let Some(label) = instr.branch_label() {
                let entry = by_position.entry(self.target(label)).or_default();
                if !entry.contains(&label) {
                    entry.push(label);
                }
            }
        }
        for labels in by_position.values_mut() {
            labels.sort();
        }

        let offsets = self.byte_offsets();
        writeln!(f, "  instructions:")?;
        for (addr, instr) in self.instructions.iter().enumerate() {
            if let Some(labels) = by_position.get(&addr) {
                for label in labels {
                    writeln!(f, "  {}:", label)?;
                }
            }
            writeln!(f, "    IL_{:04x}  {:?}", offsets[addr], instr)?;
        }
        if let Some(labels) = by_position.get(&self.instructions.len()) {
            for label in labels {
                writeln!(f, "  {}:", label)?;
            }
        }

        write!(f, "}}")
    }
}
