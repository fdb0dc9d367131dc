use std::borrow::Cow;
use std::fmt::{Debug, Display, Error as FmtError, Formatter};

/// Names of functions and fields
///
/// Unqualified names may not contain any of the separators used by qualified names and
/// descriptors. Angle brackets are reserved for the special names the generator produces
/// (`<initialize>` and `<staticInitializer>`).
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct UnqualifiedName(Cow<'static, str>);

/// Names of entities, written as `zen/core/Object`
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct BinaryName(Cow<'static, str>);

/// Extracts the raw underlying string name
impl AsRef<str> for UnqualifiedName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

/// Extracts the raw underlying string name
impl AsRef<str> for BinaryName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

pub trait Name: Sized {
    /// Check if a string would be a valid name
    fn check_valid(name: impl AsRef<str>) -> Result<(), String>;

    /// Extact the raw underlying string data
    fn as_cow(&self) -> &Cow<'static, str>;

    /// Extact the raw underlying string name
    fn as_str(&self) -> &str {
        self.as_cow().as_ref()
    }

    /// Try to construct a name from a string
    fn from_string(name: String) -> Result<Self, String>;
}

impl Name for UnqualifiedName {
    fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name.contains(&['.', ';', '@', '/', '(', ')', '<', '>'][..]) {
            Err(format!(
                "Unqualified name '{}' contains an illegal character",
                name
            ))
        } else if name.is_empty() {
            Err(format!("Unqualified name '{}' is empty", name))
        } else {
            Ok(())
        }
    }

    fn as_cow(&self) -> &Cow<'static, str> {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        match Self::check_valid(&name) {
            Ok(()) => Ok(UnqualifiedName(Cow::Owned(name))),
            Err(msg) => Err(msg),
        }
    }
}

impl Name for BinaryName {
    fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name.is_empty() {
            Err(format!("Binary name '{}' is empty", name))
        } else {
            name.split('/').map(UnqualifiedName::check_valid).collect()
        }
    }

    fn as_cow(&self) -> &Cow<'static, str> {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        match Self::check_valid(&name) {
            Ok(()) => Ok(BinaryName(Cow::Owned(name))),
            Err(msg) => Err(msg),
        }
    }
}

impl Debug for UnqualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

impl Debug for BinaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

impl Display for UnqualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

impl Display for BinaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

impl From<UnqualifiedName> for BinaryName {
    fn from(name: UnqualifiedName) -> BinaryName {
        BinaryName(name.0)
    }
}

impl UnqualifiedName {
    const fn name(value: &'static str) -> UnqualifiedName {
        UnqualifiedName(Cow::Borrowed(value))
    }

    // Special unqualified names - only these are allowed to have angle brackets in them
    pub const INITIALIZE: Self = Self::name("<initialize>");
    pub const STATIC_INITIALIZER: Self = Self::name("<staticInitializer>");

    // Runtime names
    pub const ACQUIRE: Self = Self::name("acquire");
    pub const ADD: Self = Self::name("add");
    pub const CLOSE: Self = Self::name("close");
    pub const EVALUATE: Self = Self::name("evaluate");
    pub const FALSE: Self = Self::name("FALSE");
    pub const GETITERATOR: Self = Self::name("getIterator");
    pub const GETNEXT: Self = Self::name("getNext");
    pub const HASNEXT: Self = Self::name("hasNext");
    pub const INVOKE: Self = Self::name("invoke");
    pub const ISTRUE: Self = Self::name("isTrue");
    pub const LOADFIELD: Self = Self::name("loadField");
    pub const LOADSUBSCRIPT: Self = Self::name("loadSubscript");
    pub const NEWINSTANCE: Self = Self::name("newInstance");
    pub const PUTVALUE: Self = Self::name("putValue");
    pub const RELEASE: Self = Self::name("release");
    pub const STOREFIELD: Self = Self::name("storeField");
    pub const STORESUBSCRIPT: Self = Self::name("storeSubscript");
    pub const SUPPRESS: Self = Self::name("suppress");
    pub const TRUE: Self = Self::name("TRUE");
}

impl BinaryName {
    /// Build a qualified name from a package path and a simple name
    pub fn qualify<'a>(
        package: impl IntoIterator<Item = &'a str>,
        name: &str,
    ) -> Result<BinaryName, String> {
        let mut qualified = String::new();
        for segment in package {
            qualified.push_str(segment);
            qualified.push('/');
        }
        qualified.push_str(name);
        BinaryName::from_string(qualified)
    }

    const fn name(value: &'static str) -> BinaryName {
        BinaryName(Cow::Borrowed(value))
    }

    // Runtime names
    pub const BOOLEAN: Self = Self::name("zen/core/Boolean");
    pub const DOUBLE: Self = Self::name("zen/core/Double");
    pub const EXCEPTION: Self = Self::name("zen/core/Exception");
    pub const FLOAT: Self = Self::name("zen/core/Float");
    pub const INTEGER: Self = Self::name("zen/core/Integer");
    pub const KERNEL: Self = Self::name("zen/core/ZenKernel");
    pub const LIST: Self = Self::name("zen/core/List");
    pub const LONG: Self = Self::name("zen/core/Long");
    pub const MAP: Self = Self::name("zen/core/Map");
    pub const OBJECT: Self = Self::name("zen/core/Object");
    pub const STRING: Self = Self::name("zen/core/String");
}
