//! Manipulate Zen binary entities (`.feb` files)
//!
//! ### Simple example
//!
//! Generating an entity with a single static function returning `null`:
//!
//! ```
//! use zen2feb::feb::*;
//!
//! # fn generate_entity() -> Result<(), Error> {
//! let mut constants = ConstantPool::new();
//! let mut channels = ChannelSet::new();
//!
//! // Declare the entity
//! let this_entity = BinaryName::qualify(vec!["demo"], "Main")
//!     .unwrap()
//!     .constant_index(&mut constants)?;
//! let object = BinaryName::OBJECT.constant_index(&mut constants)?;
//!
//! // Generate the function body
//! let mut code = CodeBuilder::new(&mut channels);
//! code.push_instruction(Opcode::PushNull, &[])?;
//! code.push_instruction(Opcode::ReturnA, &[])?;
//! let body = code.result()?;
//!
//! let function = FunctionEntity {
//!     flags: FunctionFlags::PUBLIC | FunctionFlags::STATIC,
//!     name_index: constants.get_utf8("main")?,
//!     descriptor_index: constants.get_utf8(FunctionDescriptor::dynamic(0).render())?,
//!     table_index: 0,
//!     attributes: vec![constants.get_attribute(body)?],
//! };
//!
//! // Finally, encode the entity into bytes
//! let entity = EntityFile {
//!     version: Version::FEB_1_0,
//!     stream_flags: 0,
//!     constants: constants.entries().to_vec(),
//!     entity_type: EntityType::Class,
//!     entity_flags: EntityFlags::PUBLIC,
//!     this_entity,
//!     superclasses: vec![object],
//!     attributes: vec![],
//!     fields: vec![],
//!     functions: vec![function],
//! };
//! let mut entity_bytes: Vec<u8> = vec![];
//! entity.serialize(&mut entity_bytes).map_err(Error::IoError)?;
//! # Ok(())
//! # }
//! ```

mod access_flags;
mod attributes;
mod binary_format;
mod bytecode;
mod channel;
mod code_builder;
mod constants;
mod constants_writer;
mod descriptors;
mod entity;
mod errors;
mod names;
mod version;

pub use access_flags::*;
pub use attributes::*;
pub use binary_format::*;
pub use bytecode::*;
pub use channel::*;
pub use code_builder::*;
pub use constants::*;
pub use constants_writer::*;
pub use descriptors::*;
pub use entity::*;
pub use errors::*;
pub use names::*;
pub use version::*;
