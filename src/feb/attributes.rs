use super::{ClassConstantIndex, Serialize, Utf8ConstantIndex};
use byteorder::WriteBytesExt;

/// Attributes (used on entities and functions)
///
/// The representation is designed to be easily extended with custom attributes. Currently the
/// only attribute generated is the instruction attribute carrying a function's bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name_index: Utf8ConstantIndex,
    pub info: Vec<u8>,
}

impl Serialize for Attribute {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.name_index.serialize(writer)?;

        // Attribute info length is 4 bytes
        (self.info.len() as u32).serialize(writer)?;
        writer.write_all(&self.info)?;

        Ok(())
    }
}

/// Attributes are all stored in the same way (see `Attribute`), but internally
/// they represent very different things. This trait is implemented by things
/// which can be turned into attributes.
pub trait AttributeLike: Serialize {
    /// Name of the attribute
    const NAME: &'static str;
}

/// Bytecode of a function along with the bookkeeping the virtual machine needs to run it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionAttribute {
    pub max_stack_size: u16,
    pub local_variable_count: u16,
    pub instructions: Vec<u8>,
    pub exception_table: Vec<ExceptionHandlerSite>,
}

impl Serialize for InstructionAttribute {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.max_stack_size.serialize(writer)?;
        self.local_variable_count.serialize(writer)?;
        (self.instructions.len() as u32).serialize(writer)?;
        writer.write_all(&self.instructions)?;
        self.exception_table.serialize(writer)?;
        Ok(())
    }
}

impl AttributeLike for InstructionAttribute {
    const NAME: &'static str = "vm/InstructionAttribute";
}

/// One row of a function's exception table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandlerSite {
    /// Start of the protected range (inclusive)
    pub start_index: u16,

    /// End of the protected range (exclusive)
    pub stop_index: u16,

    /// Start of the exception handler
    pub handler_index: u16,

    /// Class of exceptions caught (`None` catches anything)
    pub exception_class: Option<ClassConstantIndex>,
}

impl Serialize for ExceptionHandlerSite {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_index.serialize(writer)?;
        self.stop_index.serialize(writer)?;
        self.handler_index.serialize(writer)?;
        match self.exception_class {
            Some(class) => class.serialize(writer)?,
            None => 0u16.serialize(writer)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feb::ConstantIndex;

    #[test]
    fn instruction_attribute_layout() {
        let attribute = InstructionAttribute {
            max_stack_size: 2,
            local_variable_count: 3,
            instructions: vec![0x01, 0x52],
            exception_table: vec![ExceptionHandlerSite {
                start_index: 0,
                stop_index: 1,
                handler_index: 1,
                exception_class: None,
            }],
        };
        let mut out = vec![];
        attribute.serialize(&mut out).unwrap();
        assert_eq!(
            out,
            vec![
                0, 2, // max stack
                0, 3, // locals
                0, 0, 0, 2, 0x01, 0x52, // instructions
                0, 1, 0, 0, 0, 1, 0, 1, 0, 0, // exception table
            ]
        );
    }

    #[test]
    fn typed_handler_site() {
        let site = ExceptionHandlerSite {
            start_index: 4,
            stop_index: 9,
            handler_index: 12,
            exception_class: Some(ClassConstantIndex(ConstantIndex(6))),
        };
        let mut out = vec![];
        site.serialize(&mut out).unwrap();
        assert_eq!(out, vec![0, 4, 0, 9, 0, 12, 0, 6]);
    }
}
