use crate::feb::{BinaryName, Version};
use std::path::PathBuf;

pub struct Settings {
    /// Directory under which `<qualified-name>.feb` files are written
    pub output_directory: PathBuf,

    /// Entity format version stamped on every file
    pub version: Version,

    /// Superclass of classes which don't declare any
    pub default_superclass: BinaryName,

    /// Skip writing entities for units that had errors reported
    ///
    /// An entity generated despite errors still has placeholders where the erroneous code was,
    /// so it is only useful for debugging the generator.
    pub suppress_output_on_error: bool,

    /// Create package directories under `output_directory` as needed
    pub create_missing_directories: bool,
}

impl Settings {
    pub fn new(output_directory: impl Into<PathBuf>) -> Settings {
        Settings {
            output_directory: output_directory.into(),
            version: Version::FEB_1_0,
            default_superclass: BinaryName::OBJECT,
            suppress_output_on_error: true,
            create_missing_directories: true,
        }
    }
}
