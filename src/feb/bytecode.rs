use super::Error;
use std::fmt;

/// Instructions understood by the virtual machine
///
/// Every instruction is a one byte opcode followed by a fixed number of big-endian operands
/// (see [`Opcode::operands`]). Jump operands are absolute offsets into the instruction stream of
/// the enclosing function.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0x00,
    PushNull = 0x01,

    /// Push a constant pool entry (integer, long, float, double, or string)
    LoadCpr = 0x10,
    LoadA = 0x11,
    StoreA = 0x12,

    LoadStaticField = 0x18,
    StoreStaticField = 0x19,
    LoadInstanceField = 0x1A,
    StoreInstanceField = 0x1B,

    InvokeSpecial = 0x20,
    InvokeVirtual = 0x21,
    InvokeDynamic = 0x22,
    InvokeStatic = 0x23,

    New = 0x28,

    Duplicate = 0x30,
    DuplicateX1 = 0x31,
    Duplicate2 = 0x32,
    Pop = 0x33,
    Swap = 0x34,

    Jump = 0x40,
    JumpEq0I = 0x41,
    JumpNe0I = 0x42,
    JumpEq0A = 0x43,
    JumpNe0A = 0x44,

    Throw = 0x50,
    Return = 0x51,
    ReturnA = 0x52,
}

/// Width of one instruction operand
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OperandWidth {
    U8,
    U16,
}

impl OperandWidth {
    pub fn bytes(self) -> usize {
        match self {
            OperandWidth::U8 => 1,
            OperandWidth::U16 => 2,
        }
    }
}

impl Opcode {
    const ALL: [Opcode; 27] = [
        Opcode::Nop,
        Opcode::PushNull,
        Opcode::LoadCpr,
        Opcode::LoadA,
        Opcode::StoreA,
        Opcode::LoadStaticField,
        Opcode::StoreStaticField,
        Opcode::LoadInstanceField,
        Opcode::StoreInstanceField,
        Opcode::InvokeSpecial,
        Opcode::InvokeVirtual,
        Opcode::InvokeDynamic,
        Opcode::InvokeStatic,
        Opcode::New,
        Opcode::Duplicate,
        Opcode::DuplicateX1,
        Opcode::Duplicate2,
        Opcode::Pop,
        Opcode::Swap,
        Opcode::Jump,
        Opcode::JumpEq0I,
        Opcode::JumpNe0I,
        Opcode::JumpEq0A,
        Opcode::JumpNe0A,
        Opcode::Throw,
        Opcode::Return,
        Opcode::ReturnA,
    ];

    /// Decode an opcode byte
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        Self::ALL.iter().copied().find(|op| *op as u8 == byte)
    }

    /// Operand shape of the instruction
    pub fn operands(self) -> &'static [OperandWidth] {
        use OperandWidth::*;
        match self {
            Opcode::LoadA | Opcode::StoreA => &[U8],

            Opcode::LoadCpr
            | Opcode::LoadStaticField
            | Opcode::StoreStaticField
            | Opcode::LoadInstanceField
            | Opcode::StoreInstanceField
            | Opcode::InvokeSpecial
            | Opcode::InvokeVirtual
            | Opcode::InvokeDynamic
            | Opcode::InvokeStatic
            | Opcode::New => &[U16],

            Opcode::Jump
            | Opcode::JumpEq0I
            | Opcode::JumpNe0I
            | Opcode::JumpEq0A
            | Opcode::JumpNe0A => &[U16],

            Opcode::Nop
            | Opcode::PushNull
            | Opcode::Duplicate
            | Opcode::DuplicateX1
            | Opcode::Duplicate2
            | Opcode::Pop
            | Opcode::Swap
            | Opcode::Throw
            | Opcode::Return
            | Opcode::ReturnA => &[],
        }
    }

    /// Encoded length of the instruction, in bytes
    pub fn length(self) -> usize {
        1 + self
            .operands()
            .iter()
            .map(|width| width.bytes())
            .sum::<usize>()
    }

    /// Does the instruction take a jump target as operand?
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Jump | Opcode::JumpEq0I | Opcode::JumpNe0I | Opcode::JumpEq0A | Opcode::JumpNe0A
        )
    }

    /// Does the instruction never fall through to the next one?
    pub fn is_unconditional(self) -> bool {
        matches!(
            self,
            Opcode::Jump | Opcode::Throw | Opcode::Return | Opcode::ReturnA
        )
    }

    /// Is this one of the four `Invoke*` instructions?
    pub fn is_invoke(self) -> bool {
        matches!(
            self,
            Opcode::InvokeSpecial
                | Opcode::InvokeVirtual
                | Opcode::InvokeDynamic
                | Opcode::InvokeStatic
        )
    }

    /// Change in operand stack depth
    ///
    /// Invocations depend on the descriptor of the function being called, so they return `None`.
    pub fn stack_effect(self) -> Option<isize> {
        let effect = match self {
            Opcode::Nop | Opcode::Swap | Opcode::Jump | Opcode::Return => 0,
            Opcode::LoadInstanceField => 0,
            Opcode::PushNull
            | Opcode::LoadCpr
            | Opcode::LoadA
            | Opcode::LoadStaticField
            | Opcode::New
            | Opcode::Duplicate
            | Opcode::DuplicateX1 => 1,
            Opcode::Duplicate2 => 2,
            Opcode::StoreA
            | Opcode::StoreStaticField
            | Opcode::Pop
            | Opcode::JumpEq0I
            | Opcode::JumpNe0I
            | Opcode::JumpEq0A
            | Opcode::JumpNe0A
            | Opcode::Throw
            | Opcode::ReturnA => -1,
            Opcode::StoreInstanceField => -2,
            Opcode::InvokeSpecial
            | Opcode::InvokeVirtual
            | Opcode::InvokeDynamic
            | Opcode::InvokeStatic => return None,
        };
        Some(effect)
    }
}

/// One decoded instruction
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Instruction {
    /// Byte offset of the opcode
    pub offset: usize,
    pub opcode: Opcode,
    pub operands: Vec<u16>,
}

impl Instruction {
    /// Jump target, if this is a jump
    pub fn jump_target(&self) -> Option<u16> {
        if self.opcode.is_jump() {
            self.operands.first().copied()
        } else {
            None
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}: {:?}", self.offset, self.opcode)?;
        for operand in &self.operands {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}

/// Walk an instruction stream using the operand table
pub fn decode_instructions(bytes: &[u8]) -> Result<Vec<Instruction>, Error> {
    let mut instructions = vec![];
    let mut offset = 0;

    while offset < bytes.len() {
        let byte = bytes[offset];
        let opcode = Opcode::from_byte(byte).ok_or(Error::MalformedInstruction { offset, byte })?;
        if offset + opcode.length() > bytes.len() {
            return Err(Error::TruncatedInstruction { offset });
        }

        let mut cursor = offset + 1;
        let mut operands = vec![];
        for width in opcode.operands() {
            let operand = match width {
                OperandWidth::U8 => bytes[cursor] as u16,
                OperandWidth::U16 => u16::from_be_bytes([bytes[cursor], bytes[cursor + 1]]),
            };
            operands.push(operand);
            cursor += width.bytes();
        }

        instructions.push(Instruction {
            offset,
            opcode,
            operands,
        });
        offset = cursor;
    }

    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_bytes_round_trip() {
        for opcode in Opcode::ALL {
            assert_eq!(Opcode::from_byte(opcode as u8), Some(opcode));
        }
        assert_eq!(Opcode::from_byte(0xFF), None);
    }

    #[test]
    fn decode_mixed_widths() {
        let bytes = [
            0x11, 0x03, // LoadA 3
            0x10, 0x00, 0x07, // LoadCpr 7
            0x41, 0x00, 0x0A, // JumpEq0I 10
            0x33, // Pop
            0x52, // ReturnA
        ];
        let decoded = decode_instructions(&bytes).unwrap();
        let opcodes: Vec<Opcode> = decoded.iter().map(|insn| insn.opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                Opcode::LoadA,
                Opcode::LoadCpr,
                Opcode::JumpEq0I,
                Opcode::Pop,
                Opcode::ReturnA
            ]
        );
        assert_eq!(decoded[0].operands, vec![3]);
        assert_eq!(decoded[2].jump_target(), Some(10));
        assert_eq!(decoded[4].offset, 9);
    }

    #[test]
    fn decode_rejects_bad_streams() {
        assert!(matches!(
            decode_instructions(&[0x01, 0xEE]),
            Err(Error::MalformedInstruction {
                offset: 1,
                byte: 0xEE
            })
        ));
        assert!(matches!(
            decode_instructions(&[0x40, 0x00]),
            Err(Error::TruncatedInstruction { offset: 0 })
        ));
    }
}
