//! Protocol version and capability predicates.

use std::fmt;

/// A GLF protocol version, carried in the file header and consulted by the
/// codec for version-gated behavior.
///
/// Capability checks go through the named predicates so call sites read as
/// intent rather than raw version comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolVersion {
    major: u16,
    minor: u16,
}

impl ProtocolVersion {
    /// The legacy uncompressed protocol with string-table strings.
    pub const V1: Self = Self::new(1, 0);

    /// The current protocol: gzip payload, direct strings, fragment support.
    pub const CURRENT: Self = Self::new(2, 2);

    /// Creates a version from raw major/minor numbers.
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Returns the major version number.
    #[must_use]
    pub const fn major(self) -> u16 {
        self.major
    }

    /// Returns the minor version number.
    #[must_use]
    pub const fn minor(self) -> u16 {
        self.minor
    }

    /// Protocol 1 interns strings through the shared table; later versions
    /// encode them directly.
    #[must_use]
    pub const fn uses_string_table(self) -> bool {
        self.major == 1
    }

    /// Whether the session packet stream is wrapped in gzip.
    #[must_use]
    pub const fn compresses_payload(self) -> bool {
        self.major >= 2
    }

    /// Whether the session header carries a computer id.
    #[must_use]
    pub const fn supports_computer_id(self) -> bool {
        self.major >= 2
    }

    /// Whether the session header carries environment and promotion fields.
    #[must_use]
    pub const fn supports_environment(self) -> bool {
        self.major >= 2
    }

    /// Whether multi-file session fragments are described in the header.
    #[must_use]
    pub const fn supports_fragments(self) -> bool {
        self.major >= 2
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
