use super::*;
use std::result::Result;

/// Things which can be interned into a [`ConstantPool`]
///
/// Implementations first intern every component the entry refers to (names, descriptors, the
/// owning class) so that the composite entry is keyed on resolved indices.
pub trait ConstantsWriter<Index = ConstantIndex> {
    /// Get or insert a constant into the constant pool and return the associated index
    fn constant_index(&self, constants: &mut ConstantPool) -> Result<Index, Error>;
}

impl ConstantsWriter<ClassConstantIndex> for BinaryName {
    fn constant_index(&self, constants: &mut ConstantPool) -> Result<ClassConstantIndex, Error> {
        let class_name = constants.get_utf8(self.as_str())?;
        constants.get_class(class_name)
    }
}

/// Reference to a field of some entity
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType,
}

impl ConstantsWriter<FieldConstantIndex> for FieldRef {
    fn constant_index(&self, constants: &mut ConstantPool) -> Result<FieldConstantIndex, Error> {
        let class_idx = self.class.constant_index(constants)?;
        let desc_utf8 = constants.get_utf8(self.descriptor.render())?;
        let name_utf8 = constants.get_utf8(self.name.as_str())?;
        constants.get_field(class_idx, desc_utf8, name_utf8)
    }
}

/// Reference to a function of some entity
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionRef {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FunctionDescriptor,

    /// Slot in the owning entity's function table, or 0 if it isn't known statically
    pub table_index: u16,
}

impl ConstantsWriter<FunctionConstantIndex> for FunctionRef {
    fn constant_index(
        &self,
        constants: &mut ConstantPool,
    ) -> Result<FunctionConstantIndex, Error> {
        let class_idx = self.class.constant_index(constants)?;
        let desc_utf8 = constants.get_utf8(self.descriptor.render())?;
        let name_utf8 = constants.get_utf8(self.name.as_str())?;
        constants.get_function(class_idx, desc_utf8, name_utf8, self.table_index)
    }
}

/// Literal data loadable with `LoadCpr`
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantData {
    String(String),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl ConstantsWriter<ConstantIndex> for ConstantData {
    fn constant_index(&self, constants: &mut ConstantPool) -> Result<ConstantIndex, Error> {
        match self {
            ConstantData::String(string) => {
                let str_utf8 = constants.get_utf8(string.as_str())?;
                let str_idx = constants.get_string(str_utf8)?;
                Ok(str_idx.into())
            }
            ConstantData::Integer(integer) => constants.get_integer(*integer),
            ConstantData::Long(long) => constants.get_long(*long),
            ConstantData::Float(float) => constants.get_float(*float),
            ConstantData::Double(double) => constants.get_double(*double),
        }
    }
}
