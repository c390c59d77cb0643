// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed identifiers and names.
//!
//! Identifiers are opaque UUID-backed strings with a fixed prefix
//! (`host-<32 hex>`, `agent-<32 hex>`, ...). Equality and ordering are
//! lexical over the string form. Names are human-readable labels, unique
//! within a provider instance at any moment but reusable after destroy.

/// Define a prefixed, UUID-backed identifier newtype.
///
/// Generates `generate()`, `parse()`, `as_str()`, `hex_suffix()`, `short()`,
/// `Display`, and lexical `Ord` over the string form. Serde round-trips the
/// id as a plain string.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh identifier from a v4 UUID.
            pub fn generate() -> Self {
                let hex = uuid::Uuid::new_v4().simple().to_string();
                Self(format!("{}-{}", $prefix, hex))
            }

            /// Parse the canonical form: `<prefix>-<32 lowercase hex>`.
            pub fn parse(s: &str) -> Result<Self, $crate::error::IdParseError> {
                let Some(suffix) = s.strip_prefix(concat!($prefix, "-")) else {
                    return Err($crate::error::IdParseError::new($prefix, s));
                };
                if suffix.len() != 32
                    || !suffix.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
                {
                    return Err($crate::error::IdParseError::new($prefix, s));
                }
                Ok(Self(s.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The 32-hex suffix shared by associated identifiers.
            pub fn hex_suffix(&self) -> &str {
                &self.0[$prefix.len() + 1..]
            }

            /// Returns a string slice truncated to at most `n` characters.
            pub fn short(&self, n: usize) -> &str {
                if self.0.len() <= n {
                    &self.0
                } else {
                    &self.0[..n]
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

crate::define_id! {
    /// Unique identifier for a host.
    pub struct HostId("host");
}

crate::define_id! {
    /// Unique identifier for an agent instance.
    pub struct AgentId("agent");
}

crate::define_id! {
    /// Unique identifier for a host snapshot.
    pub struct SnapshotId("snap");
}

crate::define_id! {
    /// Unique identifier for a provider volume.
    pub struct VolumeId("vol");
}

impl HostId {
    /// The volume associated with this host shares the hex suffix.
    pub fn to_volume_id(&self) -> VolumeId {
        VolumeId(format!("vol-{}", self.hex_suffix()))
    }
}

impl VolumeId {
    /// The host associated with this volume shares the hex suffix.
    pub fn to_host_id(&self) -> HostId {
        HostId(format!("host-{}", self.hex_suffix()))
    }
}

impl SnapshotId {
    /// Wrap a provider-issued handle (e.g. a Docker image id) as a snapshot id.
    ///
    /// Snapshot ids are the one identifier whose suffix the provider may
    /// choose; `parse` still only accepts the canonical generated form.
    pub fn from_provider_handle(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }
}

/// Define a human-readable name newtype.
macro_rules! define_name {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_name! {
    /// Human-readable host label, unique within a provider instance.
    pub struct HostName;
}

define_name! {
    /// Human-readable agent label, unique on a host at any moment.
    pub struct AgentName;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
