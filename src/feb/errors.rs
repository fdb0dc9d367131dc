use super::{Constant, Label};

#[derive(Debug)]
pub enum Error {
    ConstantPoolOverflow {
        constant: Constant,
        offset: usize,
    },
    IoError(std::io::Error),

    /// UTF-8 constant longer than its `u16` length prefix can describe
    Utf8TooLong(usize),

    /// Instruction stream would be longer than jump operands can address
    InstructionOverflow(usize),

    /// Maximum operand stack depth does not fit in the instruction attribute
    MaxStackOverflow(usize),

    /// Local index does not fit in the operand of `LoadA`/`StoreA`
    LocalsOverflow(usize),

    /// Function body finished while some jumps still target labels that were never placed
    CodeNotFinished { unplaced_labels: Vec<Label> },

    /// Label placed twice (indicates a bug)
    DuplicateLabel(Label),

    /// Byte at this offset does not start a known instruction
    MalformedInstruction { offset: usize, byte: u8 },

    /// Instruction at this offset is cut short by the end of the stream
    TruncatedInstruction { offset: usize },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
