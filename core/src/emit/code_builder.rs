//! In-memory instruction sink.

use tracing::{debug, trace};

use super::code::Code;
use super::error::EmitError;
use super::instruction_set::{BranchForm, Instruction};
use super::refs::{Label, LocalRef, Type};
use super::sink::InstructionSink;
use crate::Vec;

/// How the builder encodes branch displacements when the code is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchEncoding {
    /// Short form wherever the displacement fits, long form elsewhere.
    #[default]
    Auto,
    /// Short form everywhere; a displacement that does not fit is an error.
    Short,
    /// Long form everywhere.
    Long,
}

/// Records instructions, labels and locals for one method body.
///
/// The builder tracks the operand stack precisely: every instruction is
/// checked for underflow, and every label remembers the depth the first path
/// to reach it had, so paths that join with a different depth are rejected.
/// After an unconditional transfer (`br`, `ret`) the stack is assumed empty
/// unless the next marked label already recorded a depth.
pub struct CodeBuilder<'a> {
    instructions: Vec<Instruction<'a>>,

    /// Instruction index each label is bound to, once marked.
    labels: Vec<Option<usize>>,

    /// Stack depth recorded for each label.
    label_depths: Vec<Option<usize>>,

    locals: Vec<Type<'a>>,

    current_stack_depth: usize,

    /// Maximum stack depth observed
    max_stack_size: usize,

    /// Whether the next instruction can be reached by falling through.
    reachable: bool,

    /// Whether `ret` pops a return value.
    returns_value: bool,

    encoding: BranchEncoding,
}

impl<'a> CodeBuilder<'a> {
    pub fn new(returns_value: bool, encoding: BranchEncoding) -> Self {
        Self {
            instructions: Vec::new(),
            labels: Vec::new(),
            label_depths: Vec::new(),
            locals: Vec::new(),
            current_stack_depth: 0,
            max_stack_size: 0,
            reachable: true,
            returns_value,
            encoding,
        }
    }

    pub fn instructions(&self) -> &[Instruction<'a>] {
        &self.instructions
    }

    pub fn stack_depth(&self) -> usize {
        self.current_stack_depth
    }

    pub fn max_stack_size(&self) -> usize {
        self.max_stack_size
    }

    pub fn locals(&self) -> &[Type<'a>] {
        &self.locals
    }

    fn check_label(&self, label: Label) -> Result<(), EmitError> {
        if label.index() < self.labels.len() {
            Ok(())
        } else {
            Err(EmitError::UnknownLabel { label })
        }
    }

    fn record_depth(&mut self, label: Label, depth: usize) -> Result<(), EmitError> {
        match self.label_depths[label.index()] {
            None => {
                self.label_depths[label.index()] = Some(depth);
                Ok(())
            }
            Some(expected) if expected != depth => Err(EmitError::StackMismatch {
                label,
                expected,
                found: depth,
            }),
            Some(_) => Ok(()),
        }
    }

    /// Resolve labels and choose branch encodings.
    pub fn finish(mut self) -> Result<Code<'a>, EmitError> {
        let mut targets = Vec::with_capacity(self.labels.len());
        for (index, position) in self.labels.iter().enumerate() {
            // Unreferenced labels may stay unmarked; they resolve to the end.
            targets.push(position.unwrap_or(self.instructions.len()));
            let label = Label(index as u32);
            if position.is_none()
                && self
                    .instructions
                    .iter()
                    .any(|instr| instr.branch_label() == Some(label))
            {
                return Err(EmitError::UnmarkedLabel { label });
            }
        }

        let long_branches = self.relax_branches(&targets)?;

        let code = Code {
            instructions: self.instructions,
            labels: targets,
            locals: self.locals,
            max_stack_size: self.max_stack_size,
            returns_value: self.returns_value,
        };
        debug!(
            instructions = code.instructions.len(),
            code_size = code.code_size(),
            long_branches,
            max_stack_size = code.max_stack_size,
            "Finished code"
        );
        Ok(code)
    }

    /// Promote short branches whose displacement does not fit until a fixed
    /// point is reached. Promotion only grows the code, so this terminates.
    ///
    /// Returns the number of branches in long form.
    fn relax_branches(&mut self, targets: &[usize]) -> Result<usize, EmitError> {
        if self.encoding == BranchEncoding::Long {
            let mut count = 0;
            for instr in self.instructions.iter_mut() {
                if let Instruction::Branch { form, .. } = instr {
                    *form = BranchForm::Long;
                    count += 1;
                }
            }
            return Ok(count);
        }

        loop {
            let offsets = byte_offsets(&self.instructions);
            let mut promoted = false;

            for at in 0..self.instructions.len() {
                let Instruction::Branch { op, label, form } = self.instructions[at] else {
                    continue;
                };
                if form == BranchForm::Long {
                    continue;
                }
                let next = offsets[at] + self.instructions[at].size();
                let displacement = offsets[targets[label.index()]] as i64 - next as i64;
                if i8::try_from(displacement).is_ok() {
                    continue;
                }
                if self.encoding == BranchEncoding::Short {
                    return Err(EmitError::BranchOutOfRange {
                        at,
                        label,
                        displacement,
                    });
                }
                trace!(at, %label, displacement, "Promoting branch to long form");
                self.instructions[at] = Instruction::Branch {
                    op,
                    label,
                    form: BranchForm::Long,
                };
                promoted = true;
            }

            if !promoted {
                break;
            }
        }

        Ok(self
            .instructions
            .iter()
            .filter(|instr| {
                matches!(
                    instr,
                    Instruction::Branch {
                        form: BranchForm::Long,
                        ..
                    }
                )
            })
            .count())
    }
}

/// Byte offset of every instruction, plus the end offset as the last entry.
pub(crate) fn byte_offsets(instructions: &[Instruction<'_>]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(instructions.len() + 1);
    let mut offset = 0;
    for instr in instructions {
        offsets.push(offset);
        offset += instr.size();
    }
    offsets.push(offset);
    offsets
}

impl<'a> InstructionSink<'a> for CodeBuilder<'a> {
    fn emit(&mut self, instruction: Instruction<'a>) -> Result<(), EmitError> {
        let at = self.instructions.len();
        let target = instruction.branch_label();
        if let Some(label) = target {
            self.check_label(label)?;
        }

        let (pops, pushes) = instruction.stack_effect(self.returns_value);
        if self.current_stack_depth < pops as usize {
            return Err(EmitError::StackUnderflow {
                at,
                needed: pops,
                depth: self.current_stack_depth,
            });
        }
        self.current_stack_depth -= pops as usize;
        if let Some(label) = target {
            self.record_depth(label, self.current_stack_depth)?;
        }
        self.current_stack_depth += pushes as usize;
        if self.current_stack_depth > self.max_stack_size {
            self.max_stack_size = self.current_stack_depth;
        }

        trace!(at, ?instruction, depth = self.current_stack_depth, "Emit");
        self.instructions.push(instruction);

        self.reachable = !instruction.ends_block();
        if !self.reachable {
            self.current_stack_depth = 0;
        }
        Ok(())
    }

    fn define_label(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(None);
        self.label_depths.push(None);
        label
    }

    fn mark_label(&mut self, label: Label) -> Result<(), EmitError> {
        self.check_label(label)?;
        if self.labels[label.index()].is_some() {
            return Err(EmitError::LabelAlreadyMarked { label });
        }

        if self.reachable {
            self.record_depth(label, self.current_stack_depth)?;
        } else {
            self.current_stack_depth = self.label_depths[label.index()].unwrap_or(0);
            self.label_depths[label.index()] = Some(self.current_stack_depth);
        }

        self.labels[label.index()] = Some(self.instructions.len());
        self.reachable = true;
        trace!(%label, at = self.instructions.len(), "Mark label");
        Ok(())
    }

    fn declare_local(&mut self, ty: Type<'a>) -> Result<LocalRef<'a>, EmitError> {
        let index: u16 = self
            .locals
            .len()
            .try_into()
            .map_err(|_| EmitError::TooManyLocals)?;
        self.locals.push(ty);
        Ok(LocalRef { index, ty })
    }
}
