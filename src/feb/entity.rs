use super::{
    Attribute, ClassConstantIndex, Constant, EntityFlags, FieldFlags, FunctionFlags, Serialize,
    Utf8ConstantIndex, Version,
};
use byteorder::WriteBytesExt;
use std::fs;
use std::path::Path;

/// Kind of entity described by an entity file
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum EntityType {
    Class = 0x00,
}

impl Serialize for EntityType {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        (*self as u8).serialize(writer)
    }
}

/// Representation of one `.feb` entity file
///
/// Every file is self-contained: it carries its own constant pool, which all the indices in the
/// entity header, fields and functions refer to.
#[derive(Debug)]
pub struct EntityFile {
    pub version: Version,
    pub stream_flags: u16,
    pub constants: Vec<Constant>,
    pub entity_type: EntityType,
    pub entity_flags: EntityFlags,
    pub this_entity: ClassConstantIndex,
    pub superclasses: Vec<ClassConstantIndex>,
    pub attributes: Vec<Attribute>,
    pub fields: Vec<FieldEntity>,
    pub functions: Vec<FunctionEntity>,
}

impl EntityFile {
    /// Magic header bytes that go at the front of the serialized entity file
    pub const MAGIC: [u8; 4] = [0xFE, 0xB7, 0x20, 0x00];

    /// File extension of serialized entities
    pub const EXTENSION: &'static str = "feb";

    /// Save the entity file to disk
    pub fn save_to_path<P: AsRef<Path>>(
        &self,
        path: P,
        create_missing_directories: bool,
    ) -> std::io::Result<()> {
        let path = path.as_ref();
        if create_missing_directories {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut entity_file = fs::File::create(path)?;
        self.serialize(&mut entity_file)
    }
}

impl Serialize for EntityFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&EntityFile::MAGIC)?;
        self.version.serialize(writer)?;
        self.stream_flags.serialize(writer)?;
        self.constants.serialize(writer)?;
        self.entity_type.serialize(writer)?;
        self.entity_flags.serialize(writer)?;
        self.this_entity.serialize(writer)?;
        self.superclasses.serialize(writer)?;
        self.attributes.serialize(writer)?;

        (self.fields.len() as u16).serialize(writer)?;
        table_size(self.fields.iter().map(|field| field.table_index)).serialize(writer)?;
        for field in &self.fields {
            field.serialize(writer)?;
        }

        (self.functions.len() as u16).serialize(writer)?;
        table_size(self.functions.iter().map(|function| function.table_index))
            .serialize(writer)?;
        for function in &self.functions {
            function.serialize(writer)?;
        }

        Ok(())
    }
}

/// Number of slots needed to hold every table index
fn table_size(indices: impl Iterator<Item = u16>) -> u16 {
    indices.map(|idx| idx.saturating_add(1)).max().unwrap_or(0)
}

#[derive(Debug)]
pub struct FieldEntity {
    pub flags: FieldFlags,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub table_index: u16,
    pub attributes: Vec<Attribute>,
}

impl Serialize for FieldEntity {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.flags.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.table_index.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct FunctionEntity {
    pub flags: FunctionFlags,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub table_index: u16,

    /// Abstract and native functions have no instruction attribute
    pub attributes: Vec<Attribute>,
}

impl Serialize for FunctionEntity {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.flags.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.table_index.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}
