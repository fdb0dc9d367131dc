use super::Serialize;
use bitflags::bitflags;
use byteorder::WriteBytesExt;
use std::io::Result;

bitflags! {
    /// Flags on the entity itself (the class declared by a unit)
    pub struct EntityFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const SECRET = 0x0004;
        const FINAL = 0x0010;
        const ABSTRACT = 0x0400;
    }
}

bitflags! {
    /// Flags on functions
    pub struct FunctionFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const SECRET = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
    }
}

bitflags! {
    /// Flags on fields
    pub struct FieldFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const SECRET = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
    }
}

impl Serialize for EntityFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for FunctionFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for FieldFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}
