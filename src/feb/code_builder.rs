use super::{
    decode_instructions, ChannelId, ChannelSet, ClassConstantIndex, Error, ExceptionHandlerSite,
    FunctionConstantIndex, FunctionDescriptor, InstructionAttribute, Opcode,
};
use std::fmt;

/// Opaque jump target inside one function body
#[derive(Copy, Clone, Hash, Eq, PartialEq)]
pub struct Label(usize);

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}

#[derive(Debug)]
enum LabelState {
    /// Jumps emitted so far which target the label
    Unplaced {
        /// Channel offsets of the `u16` placeholders to patch once the label is placed
        fixups: Vec<usize>,

        /// Stack depth at the first jump to the label
        stack_depth: Option<usize>,
    },
    Placed {
        offset: u16,
    },
}

/// This provides a simplified interface for building up function bodies on top of a
/// [`ChannelSet`]. It does internal bookkeeping to track labels, jump fixups, operand stack depth
/// and the exception table.
///
/// ### Labels and fixups
///
/// Jumps are emitted against labels. Backward jumps are encoded directly, since their target is
/// already known. Forward jumps are encoded with a `0` placeholder whose position is recorded as a
/// fixup on the label; placing the label patches every one of them. `result` refuses to finish a
/// body that still has fixups pending.
///
/// For the rare case where the target is tracked outside of any label (break records), the raw
/// `push_jump_placeholder`/`patch_jump` pair is available too.
///
/// ### Tracking stack depth
///
/// The maximum operand stack depth is computed on the fly. After an instruction which does not
/// fall through, the following code is unreachable until a label is placed. At that point the
/// stack depth is the one recorded at the first jump to the label (or 0 if the label was never
/// targeted). Exception handlers start with just the exception on the stack.
pub struct CodeBuilder<'c> {
    channels: &'c mut ChannelSet,

    /// Channel holding the function body
    channel: ChannelId,

    /// Channel to reactivate once the body is finished
    previous_active: Option<ChannelId>,

    labels: Vec<LabelState>,

    /// Current operand stack depth (`None` when the current position is unreachable)
    stack_depth: Option<usize>,
    max_stack_size: usize,

    exception_table: Vec<ExceptionHandlerSite>,
    local_variable_count: u16,
}

impl<'c> CodeBuilder<'c> {
    /// Largest local index expressible in `LoadA`/`StoreA`
    pub const MAX_LOCAL: u16 = u8::MAX as u16;

    /// Create a builder writing into a fresh channel, which is activated
    pub fn new(channels: &'c mut ChannelSet) -> Self {
        let channel = channels.add_channel();
        CodeBuilder::on_channel(channels, channel)
    }

    /// Create a builder writing into an existing (empty) channel, which is activated
    pub fn on_channel(channels: &'c mut ChannelSet, channel: ChannelId) -> Self {
        let previous_active = channels.active();
        channels.set_active(channel);
        CodeBuilder {
            channels,
            channel,
            previous_active,
            labels: vec![],
            stack_depth: Some(0),
            max_stack_size: 0,
            exception_table: vec![],
            local_variable_count: 0,
        }
    }

    /// Turn the builder into the function's instruction attribute
    ///
    /// The channel holding the body is closed and the previously active channel is reactivated,
    /// whether or not the body turns out to be well formed.
    pub fn result(mut self) -> Result<InstructionAttribute, Error> {
        let instructions = self.channels.remove_channel(self.channel);
        if let Some(previous) = self.previous_active.filter(|prev| *prev != self.channel) {
            self.channels.set_active(previous);
        }

        let unplaced_labels: Vec<Label> = self
            .labels
            .iter()
            .enumerate()
            .filter_map(|(idx, state)| match state {
                LabelState::Unplaced { fixups, .. } if !fixups.is_empty() => Some(Label(idx)),
                _ => None,
            })
            .collect();
        if !unplaced_labels.is_empty() {
            return Err(Error::CodeNotFinished { unplaced_labels });
        }

        let max_stack_size = u16::try_from(self.max_stack_size)
            .map_err(|_| Error::MaxStackOverflow(self.max_stack_size))?;

        if instructions.len() > u16::MAX as usize {
            return Err(Error::InstructionOverflow(instructions.len()));
        }

        if cfg!(debug_assertions) {
            for insn in decode_instructions(&instructions)? {
                if let Some(target) = insn.jump_target() {
                    assert!(
                        target as usize <= instructions.len(),
                        "jump at {} targets {} past the end",
                        insn.offset,
                        target
                    );
                }
            }
        }

        Ok(InstructionAttribute {
            max_stack_size,
            local_variable_count: self.local_variable_count,
            instructions,
            exception_table: self.exception_table,
        })
    }

    /// Generate a fresh label
    pub fn fresh_label(&mut self) -> Label {
        let label = Label(self.labels.len());
        self.labels.push(LabelState::Unplaced {
            fixups: vec![],
            stack_depth: None,
        });
        label
    }

    /// Offset of the next instruction
    pub fn current_offset(&self) -> Result<u16, Error> {
        let size = self.channels.size(self.channel);
        u16::try_from(size).map_err(|_| Error::InstructionOverflow(size))
    }

    /// Is the current position reachable by falling through from the previous instruction or
    /// through a label placed here?
    pub fn is_reachable(&self) -> bool {
        self.stack_depth.is_some()
    }

    /// Bind a label to the current offset, patching every jump already emitted against it
    pub fn place_label(&mut self, label: Label) -> Result<(), Error> {
        let offset = self.current_offset()?;
        let state = std::mem::replace(&mut self.labels[label.0], LabelState::Placed { offset });
        match state {
            LabelState::Placed { .. } => Err(Error::DuplicateLabel(label)),
            LabelState::Unplaced {
                fixups,
                stack_depth,
            } => {
                for fixup in fixups {
                    self.channels.patch_u16(self.channel, fixup, offset);
                }
                if self.stack_depth.is_none() {
                    self.stack_depth = Some(stack_depth.unwrap_or(0));
                }
                Ok(())
            }
        }
    }

    /// Record a change in the operand stack depth
    fn adjust_stack(&mut self, effect: isize) {
        let depth = self.stack_depth.unwrap_or(0) as isize + effect;
        let depth = depth.max(0) as usize;
        self.max_stack_size = self.max_stack_size.max(depth);
        self.stack_depth = Some(depth);
    }

    /// Push a non-jump, non-invoke instruction
    pub fn push_instruction(&mut self, opcode: Opcode, operands: &[u16]) -> Result<(), Error> {
        assert!(
            !opcode.is_jump() && !opcode.is_invoke(),
            "{:?} must be pushed through its dedicated method",
            opcode
        );
        if matches!(opcode, Opcode::LoadA | Opcode::StoreA) {
            if let Some(local) = operands.first().filter(|local| **local > Self::MAX_LOCAL) {
                return Err(Error::LocalsOverflow(*local as usize));
            }
        }

        self.channels.emit(opcode, operands);
        if let Some(effect) = opcode.stack_effect() {
            self.adjust_stack(effect);
        }
        if opcode.is_unconditional() {
            self.stack_depth = None;
        }
        Ok(())
    }

    /// Push one of the `Invoke*` instructions
    ///
    /// Every invocation except `InvokeStatic` also consumes a receiver.
    pub fn push_invoke(
        &mut self,
        opcode: Opcode,
        function: FunctionConstantIndex,
        descriptor: &FunctionDescriptor,
    ) -> Result<(), Error> {
        assert!(opcode.is_invoke(), "{:?} is not an invocation", opcode);
        let receiver = if opcode == Opcode::InvokeStatic { 0 } else { 1 };

        self.channels.emit(opcode, &[(function.0).0]);
        self.adjust_stack(descriptor.stack_effect() - receiver);
        Ok(())
    }

    /// Push a jump to a label
    pub fn push_jump(&mut self, opcode: Opcode, label: Label) -> Result<(), Error> {
        assert!(opcode.is_jump(), "{:?} is not a jump", opcode);
        let target = match &self.labels[label.0] {
            LabelState::Placed { offset } => *offset,
            LabelState::Unplaced { .. } => 0,
        };

        let opcode_offset = self.channels.emit(opcode, &[target]);
        self.adjust_stack(opcode.stack_effect().unwrap_or(0));

        let depth_at_jump = self.stack_depth;
        if let LabelState::Unplaced {
            fixups,
            stack_depth,
        } = &mut self.labels[label.0]
        {
            fixups.push(opcode_offset + 1);
            if stack_depth.is_none() {
                *stack_depth = depth_at_jump;
            }
        }

        if opcode.is_unconditional() {
            self.stack_depth = None;
        }
        Ok(())
    }

    /// Push a jump whose target will be patched later with `patch_jump`
    ///
    /// Returns the offset of the placeholder operand.
    pub fn push_jump_placeholder(&mut self, opcode: Opcode) -> Result<usize, Error> {
        assert!(opcode.is_jump(), "{:?} is not a jump", opcode);
        let opcode_offset = self.channels.emit(opcode, &[0]);
        self.adjust_stack(opcode.stack_effect().unwrap_or(0));
        if opcode.is_unconditional() {
            self.stack_depth = None;
        }
        Ok(opcode_offset + 1)
    }

    /// Patch a placeholder emitted by `push_jump_placeholder`
    pub fn patch_jump(&mut self, placeholder: usize, target: u16) {
        self.channels.patch_u16(self.channel, placeholder, target);
    }

    /// Mark the current position as the start of an exception handler
    ///
    /// The thrown exception is the only thing on the operand stack.
    pub fn enter_handler(&mut self) {
        self.stack_depth = Some(0);
        self.adjust_stack(1);
    }

    /// Add an exception handler site covering `[start, stop)`
    pub fn add_exception_handler(
        &mut self,
        start: u16,
        stop: u16,
        handler: u16,
        exception_class: Option<ClassConstantIndex>,
    ) {
        let size = self.channels.size(self.channel);
        assert!(
            start < stop && stop as usize <= size && (handler as usize) < size,
            "malformed handler site [{}, {}) -> {} in {} bytes",
            start,
            stop,
            handler,
            size
        );
        self.exception_table.push(ExceptionHandlerSite {
            start_index: start,
            stop_index: stop,
            handler_index: handler,
            exception_class,
        });
    }

    /// Set the number of local slots the function needs
    pub fn set_local_variable_count(&mut self, count: u16) {
        self.local_variable_count = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feb::ConstantIndex;

    #[test]
    fn forward_and_backward_jumps() {
        let mut channels = ChannelSet::new();
        let mut code = CodeBuilder::new(&mut channels);

        let start = code.fresh_label();
        let end = code.fresh_label();
        code.place_label(start).unwrap();
        code.push_instruction(Opcode::LoadA, &[0]).unwrap();
        code.push_jump(Opcode::JumpEq0I, end).unwrap();
        code.push_jump(Opcode::Jump, start).unwrap();
        code.place_label(end).unwrap();
        code.push_instruction(Opcode::Return, &[]).unwrap();

        let attribute = code.result().unwrap();
        let insns = decode_instructions(&attribute.instructions).unwrap();
        assert_eq!(insns[1].jump_target(), Some(8));
        assert_eq!(insns[2].jump_target(), Some(0));
        assert_eq!(attribute.max_stack_size, 1);
        assert_eq!(channels.open_channels(), 0);
    }

    #[test]
    fn unplaced_label_is_an_error() {
        let mut channels = ChannelSet::new();
        let mut code = CodeBuilder::new(&mut channels);
        let nowhere = code.fresh_label();
        let _never_targeted = code.fresh_label();
        code.push_jump(Opcode::Jump, nowhere).unwrap();

        match code.result() {
            Err(Error::CodeNotFinished { unplaced_labels }) => {
                assert_eq!(unplaced_labels, vec![nowhere]);
            }
            other => panic!("expected unfinished code, got {:?}", other),
        }
        assert_eq!(channels.open_channels(), 0);
    }

    #[test]
    fn duplicate_label() {
        let mut channels = ChannelSet::new();
        let mut code = CodeBuilder::new(&mut channels);
        let label = code.fresh_label();
        code.place_label(label).unwrap();
        assert!(matches!(
            code.place_label(label),
            Err(Error::DuplicateLabel(_))
        ));
    }

    #[test]
    fn placeholders_patch_manually() {
        let mut channels = ChannelSet::new();
        let mut code = CodeBuilder::new(&mut channels);
        let at = code.push_jump_placeholder(Opcode::Jump).unwrap();
        assert!(!code.is_reachable());
        code.push_instruction(Opcode::Nop, &[]).unwrap();
        let target = code.current_offset().unwrap();
        code.patch_jump(at, target);
        code.push_instruction(Opcode::Return, &[]).unwrap();

        let attribute = code.result().unwrap();
        assert_eq!(attribute.instructions, vec![0x40, 0x00, 0x04, 0x00, 0x51]);
    }

    #[test]
    fn stack_depth_resumes_from_jump() {
        let mut channels = ChannelSet::new();
        let mut code = CodeBuilder::new(&mut channels);
        let function = FunctionConstantIndex(ConstantIndex(1));
        let join = code.fresh_label();

        code.push_instruction(Opcode::PushNull, &[]).unwrap();
        code.push_instruction(Opcode::PushNull, &[]).unwrap();
        code.push_jump(Opcode::Jump, join).unwrap();
        code.place_label(join).unwrap();
        code.push_invoke(
            Opcode::InvokeStatic,
            function,
            &FunctionDescriptor::dynamic(2),
        )
        .unwrap();
        code.push_instruction(Opcode::PushNull, &[]).unwrap();
        code.push_instruction(Opcode::Duplicate2, &[]).unwrap();

        let attribute = code.result().unwrap();
        assert_eq!(attribute.max_stack_size, 4);
    }

    #[test]
    fn restores_previous_channel() {
        let mut channels = ChannelSet::new();
        let primary = channels.add_channel();
        channels.set_active(primary);

        let mut code = CodeBuilder::new(&mut channels);
        code.push_instruction(Opcode::Return, &[]).unwrap();
        code.result().unwrap();
        assert_eq!(channels.active(), Some(primary));
    }

    #[test]
    fn handler_sites() {
        let mut channels = ChannelSet::new();
        let mut code = CodeBuilder::new(&mut channels);
        code.push_instruction(Opcode::Nop, &[]).unwrap();
        code.push_instruction(Opcode::Return, &[]).unwrap();
        let handler = code.current_offset().unwrap();
        code.enter_handler();
        code.push_instruction(Opcode::Throw, &[]).unwrap();
        code.add_exception_handler(0, 1, handler, None);

        let attribute = code.result().unwrap();
        assert_eq!(attribute.exception_table.len(), 1);
        assert_eq!(attribute.exception_table[0].handler_index, 2);
    }

    #[test]
    fn wide_locals_overflow() {
        let mut channels = ChannelSet::new();
        let mut code = CodeBuilder::new(&mut channels);
        assert!(matches!(
            code.push_instruction(Opcode::LoadA, &[256]),
            Err(Error::LocalsOverflow(256))
        ));
    }
}
