use super::Serialize;
use byteorder::WriteBytesExt;
use std::io::Result;

/// Version of the entity format, which the virtual machine checks before loading an entity
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Version {
    pub major_version: u16,
    pub minor_version: u16,
}

impl Version {
    /// First stable release of the entity format
    pub const FEB_1_0: Version = Version {
        major_version: 1,
        minor_version: 0,
    };
}

impl Serialize for Version {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.major_version.serialize(writer)?;
        self.minor_version.serialize(writer)?;
        Ok(())
    }
}
