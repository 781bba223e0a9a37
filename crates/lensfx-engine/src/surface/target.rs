use std::fmt;

/// Logical name of an output target ("preview", "record", ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(String);

impl TargetId {
    pub const PREVIEW: &'static str = "preview";
    pub const RECORD: &'static str = "record";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn preview() -> Self {
        Self::new(Self::PREVIEW)
    }

    pub fn record() -> Self {
        Self::new(Self::RECORD)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TargetId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TargetId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
