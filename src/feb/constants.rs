use super::{Attribute, AttributeLike, Error, Serialize};
use byteorder::WriteBytesExt;
use std::borrow::Cow;
use std::collections::HashMap;

/// Entity constants pool builder
///
/// The pool is append only until it is `reset` at the start of the next declaration unit. Each
/// distinct constant is stored exactly once: a second request for an identical (fully resolved)
/// constant returns the index handed out the first time. Index 0 is never handed out.
///
/// The [`ConstantsWriter`](super::ConstantsWriter) trait exposes inserting higher-level
/// descriptions (classes, field and function references, literals) into the pool.
#[derive(Debug, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    indices: HashMap<Constant, ConstantIndex>,
}

impl ConstantPool {
    /// Largest index that can be referenced from a `u16` operand
    const MAX_INDEX: usize = u16::MAX as usize;

    /// Make a fresh empty constants pool
    pub fn new() -> ConstantPool {
        ConstantPool::default()
    }

    /// Drop all entries, so the next unit starts back at index 1
    pub fn reset(&mut self) {
        self.constants.clear();
        self.indices.clear();
    }

    /// Number of entries (the reserved slot 0 is not counted)
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Look up the constant stored at an index
    pub fn get(&self, index: impl Into<ConstantIndex>) -> Option<&Constant> {
        let index: ConstantIndex = index.into();
        (index.0 as usize)
            .checked_sub(1)
            .and_then(|offset| self.constants.get(offset))
    }

    /// Entries in index order, starting at index 1
    pub fn entries(&self) -> &[Constant] {
        &self.constants
    }

    /// Get the index of an existing constant, or append it to the pool
    fn intern(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        if let Some(idx) = self.indices.get(&constant) {
            return Ok(*idx);
        }

        // Compute the offset at which this constant will be inserted
        let offset = self.constants.len() + 1;
        if offset > Self::MAX_INDEX {
            return Err(Error::ConstantPoolOverflow { constant, offset });
        }

        let idx = ConstantIndex(offset as u16);
        log::trace!("Interning {:?} at {}", constant, offset);
        self.constants.push(constant.clone());
        self.indices.insert(constant, idx);
        Ok(idx)
    }

    /// Get or insert a utf8 constant from the constant pool
    pub fn get_utf8<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        utf8: S,
    ) -> Result<Utf8ConstantIndex, Error> {
        let utf8 = utf8.into();
        if utf8.len() > u16::MAX as usize {
            return Err(Error::Utf8TooLong(utf8.len()));
        }
        let constant = Constant::Utf8(utf8.into_owned());
        self.intern(constant).map(Utf8ConstantIndex)
    }

    /// Get or insert a string constant from the constant pool
    pub fn get_string(&mut self, utf8: Utf8ConstantIndex) -> Result<StringConstantIndex, Error> {
        self.intern(Constant::String(utf8)).map(StringConstantIndex)
    }

    /// Get or insert a class constant from the constant pool
    pub fn get_class(&mut self, name: Utf8ConstantIndex) -> Result<ClassConstantIndex, Error> {
        self.intern(Constant::Class(name)).map(ClassConstantIndex)
    }

    /// Get or insert a field reference constant from the constant pool
    pub fn get_field(
        &mut self,
        class: ClassConstantIndex,
        descriptor: Utf8ConstantIndex,
        name: Utf8ConstantIndex,
    ) -> Result<FieldConstantIndex, Error> {
        let constant = Constant::Field {
            class,
            descriptor,
            name,
        };
        self.intern(constant).map(FieldConstantIndex)
    }

    /// Get or insert a function reference constant from the constant pool
    pub fn get_function(
        &mut self,
        class: ClassConstantIndex,
        descriptor: Utf8ConstantIndex,
        name: Utf8ConstantIndex,
        table_index: u16,
    ) -> Result<FunctionConstantIndex, Error> {
        let constant = Constant::Function {
            class,
            descriptor,
            name,
            table_index,
        };
        self.intern(constant).map(FunctionConstantIndex)
    }

    pub fn get_integer(&mut self, integer: i32) -> Result<ConstantIndex, Error> {
        self.intern(Constant::Integer(integer))
    }

    pub fn get_long(&mut self, long: i64) -> Result<ConstantIndex, Error> {
        self.intern(Constant::Long(long))
    }

    /// Floats are deduplicated by bit pattern (so `0.0` and `-0.0` are distinct)
    pub fn get_float(&mut self, float: f32) -> Result<ConstantIndex, Error> {
        self.intern(Constant::Float(float.to_bits()))
    }

    /// Doubles are deduplicated by bit pattern (so `0.0` and `-0.0` are distinct)
    pub fn get_double(&mut self, double: f64) -> Result<ConstantIndex, Error> {
        self.intern(Constant::Double(double.to_bits()))
    }

    /// Add an attribute to the constant pool
    pub fn get_attribute<A: AttributeLike>(&mut self, attribute: A) -> Result<Attribute, Error> {
        let name_index = self.get_utf8(A::NAME)?;
        let mut info = vec![];

        attribute.serialize(&mut info).map_err(Error::IoError)?;

        Ok(Attribute { name_index, info })
    }
}

/// Constants as in the constant pool
///
/// Composite constants refer to their components by index, so two composite constants are equal
/// exactly when their components were interned to the same indices.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Constant {
    /// Constant primitive of type `i`
    Integer(i32),

    /// Constant primitive of type `l`
    Long(i64),

    /// Constant primitive of type `f`, as raw IEEE 754 bits
    Float(u32),

    /// Constant primitive of type `d`, as raw IEEE 754 bits
    Double(u64),

    /// Raw UTF-8 encoded string data
    Utf8(String),

    /// Constant object of type `zen/core/String`
    String(Utf8ConstantIndex),

    /// Function of some entity
    Function {
        class: ClassConstantIndex,
        descriptor: Utf8ConstantIndex,
        name: Utf8ConstantIndex,

        /// Slot of the function in its entity's function table (0 when unknown)
        table_index: u16,
    },

    /// Field of some entity
    Field {
        class: ClassConstantIndex,
        descriptor: Utf8ConstantIndex,
        name: Utf8ConstantIndex,
    },

    /// Entity
    Class(Utf8ConstantIndex),
}

impl Constant {
    pub const INTEGER_TAG: u8 = 0x01;
    pub const LONG_TAG: u8 = 0x02;
    pub const FLOAT_TAG: u8 = 0x03;
    pub const DOUBLE_TAG: u8 = 0x04;
    pub const UTF8_TAG: u8 = 0x05;
    pub const STRING_TAG: u8 = 0x06;
    pub const FUNCTION_TAG: u8 = 0x07;
    pub const FIELD_TAG: u8 = 0x08;
    pub const CLASS_TAG: u8 = 0x09;

    pub fn tag(&self) -> u8 {
        match self {
            Constant::Integer(_) => Self::INTEGER_TAG,
            Constant::Long(_) => Self::LONG_TAG,
            Constant::Float(_) => Self::FLOAT_TAG,
            Constant::Double(_) => Self::DOUBLE_TAG,
            Constant::Utf8(_) => Self::UTF8_TAG,
            Constant::String(_) => Self::STRING_TAG,
            Constant::Function { .. } => Self::FUNCTION_TAG,
            Constant::Field { .. } => Self::FIELD_TAG,
            Constant::Class(_) => Self::CLASS_TAG,
        }
    }
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.tag().serialize(writer)?;
        match self {
            Constant::Integer(integer) => integer.serialize(writer)?,
            Constant::Long(long) => long.serialize(writer)?,
            Constant::Float(bits) => bits.serialize(writer)?,
            Constant::Double(bits) => bits.serialize(writer)?,
            Constant::Utf8(string) => {
                (string.len() as u16).serialize(writer)?;
                writer.write_all(string.as_bytes())?;
            }
            Constant::String(utf8) => utf8.serialize(writer)?,
            Constant::Function {
                class,
                descriptor,
                name,
                table_index,
            } => {
                class.serialize(writer)?;
                descriptor.serialize(writer)?;
                name.serialize(writer)?;
                table_index.serialize(writer)?;
            }
            Constant::Field {
                class,
                descriptor,
                name,
            } => {
                class.serialize(writer)?;
                descriptor.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::Class(name) => name.serialize(writer)?,
        };
        Ok(())
    }
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct ConstantIndex(pub u16);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct Utf8ConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct StringConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct ClassConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct FieldConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct FunctionConstantIndex(pub ConstantIndex);

impl From<Utf8ConstantIndex> for ConstantIndex {
    fn from(index: Utf8ConstantIndex) -> ConstantIndex {
        index.0
    }
}
impl From<StringConstantIndex> for ConstantIndex {
    fn from(index: StringConstantIndex) -> ConstantIndex {
        index.0
    }
}
impl From<ClassConstantIndex> for ConstantIndex {
    fn from(index: ClassConstantIndex) -> ConstantIndex {
        index.0
    }
}
impl From<FieldConstantIndex> for ConstantIndex {
    fn from(index: FieldConstantIndex) -> ConstantIndex {
        index.0
    }
}
impl From<FunctionConstantIndex> for ConstantIndex {
    fn from(index: FunctionConstantIndex) -> ConstantIndex {
        index.0
    }
}

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}
impl Serialize for Utf8ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}
impl Serialize for StringConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}
impl Serialize for ClassConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}
impl Serialize for FieldConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}
impl Serialize for FunctionConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_zero_is_reserved() {
        let mut pool = ConstantPool::new();
        let first = pool.get_integer(42).unwrap();
        assert_eq!(first, ConstantIndex(1));
        assert!(pool.get(ConstantIndex(0)).is_none());
        assert_eq!(pool.get(first), Some(&Constant::Integer(42)));
    }

    #[test]
    fn utf8_and_class_dedup() {
        let mut pool = ConstantPool::new();
        let object1 = pool.get_utf8("zen/core/Object").unwrap();
        let object2 = pool.get_utf8(String::from("zen/core/Object")).unwrap();
        assert_eq!(object1, object2);

        let class1 = pool.get_class(object1).unwrap();
        let class2 = pool.get_class(object2).unwrap();
        assert_eq!(class1, class2);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn distinct_entries_in_insertion_order() {
        let mut pool = ConstantPool::new();
        let indices = vec![
            pool.get_integer(1).unwrap(),
            pool.get_long(1).unwrap(),
            pool.get_float(1.0).unwrap(),
            pool.get_double(1.0).unwrap(),
            pool.get_utf8("1").unwrap().into(),
        ];
        let expected: Vec<ConstantIndex> = (1..=5).map(ConstantIndex).collect();
        assert_eq!(indices, expected);

        // Same again, no new entries
        assert_eq!(pool.get_long(1).unwrap(), ConstantIndex(2));
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn composite_entries_compare_resolved_indices() {
        let mut pool = ConstantPool::new();
        let class_name = pool.get_utf8("demo/Main").unwrap();
        let class = pool.get_class(class_name).unwrap();
        let name = pool.get_utf8("run").unwrap();
        let descriptor = pool.get_utf8("()@zen/core/Object;").unwrap();

        let f1 = pool.get_function(class, descriptor, name, 3).unwrap();
        let f2 = pool.get_function(class, descriptor, name, 3).unwrap();
        let f3 = pool.get_function(class, descriptor, name, 0).unwrap();
        assert_eq!(f1, f2);
        assert_ne!(f1, f3);

        let field = pool.get_field(class, descriptor, name).unwrap();
        assert_ne!(ConstantIndex::from(field), ConstantIndex::from(f1));
    }

    #[test]
    fn reset_starts_over() {
        let mut pool = ConstantPool::new();
        pool.get_utf8("a").unwrap();
        pool.get_utf8("b").unwrap();
        pool.reset();
        assert!(pool.is_empty());
        assert_eq!(pool.get_utf8("b").unwrap(), Utf8ConstantIndex(ConstantIndex(1)));
    }

    #[test]
    fn float_dedup_by_bits() {
        let mut pool = ConstantPool::new();
        let zero = pool.get_double(0.0).unwrap();
        let negative_zero = pool.get_double(-0.0).unwrap();
        assert_ne!(zero, negative_zero);
        assert_eq!(pool.get_double(f64::NAN).unwrap(), pool.get_double(f64::NAN).unwrap());
    }

    #[test]
    fn serialize_entries() {
        let mut pool = ConstantPool::new();
        let name = pool.get_utf8("ab").unwrap();
        pool.get_class(name).unwrap();
        pool.get_integer(-1).unwrap();

        let mut out = vec![];
        for constant in pool.entries() {
            constant.serialize(&mut out).unwrap();
        }
        assert_eq!(
            out,
            vec![
                0x05, 0x00, 0x02, b'a', b'b', // utf8
                0x09, 0x00, 0x01, // class
                0x01, 0xFF, 0xFF, 0xFF, 0xFF, // integer
            ]
        );
    }

    #[test]
    fn overflow_is_reported() {
        let mut pool = ConstantPool::new();
        for i in 0..u16::MAX as i32 {
            pool.get_integer(i).unwrap();
        }
        match pool.get_integer(-1) {
            Err(Error::ConstantPoolOverflow { offset, .. }) => assert_eq!(offset, 65536),
            other => panic!("expected overflow, got {:?}", other),
        }
        // Existing entries are still found
        assert_eq!(pool.get_integer(7).unwrap(), ConstantIndex(8));
    }

    #[test]
    fn long_utf8_is_rejected() {
        let mut pool = ConstantPool::new();
        let longest = "a".repeat(u16::MAX as usize);
        assert!(pool.get_utf8(longest.as_str()).is_ok());

        match pool.get_utf8("a".repeat(70_000)) {
            Err(Error::Utf8TooLong(length)) => assert_eq!(length, 70_000),
            other => panic!("expected a length error, got {:?}", other),
        }
        assert_eq!(pool.len(), 1);
    }
}
