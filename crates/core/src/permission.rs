//! Permission gating — one capability-check abstraction for every tool.
//!
//! Tools that touch user data declare a [`Permission`] in their spec. The
//! dispatcher asks a [`PermissionGate`] before invoking such a tool.
//! Platform-specific checks live behind adapters; this crate ships two:
//! [`AllowAll`] and [`StaticPermissions`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A capability a tool may require.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Calendar,
    Contacts,
    Location,
    Microphone,
    SpeechRecognition,
    Custom(String),
}

impl Permission {
    /// Parse a permission from its configuration name.
    ///
    /// Unknown names become [`Permission::Custom`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "calendar" => Self::Calendar,
            "contacts" => Self::Contacts,
            "location" => Self::Location,
            "microphone" => Self::Microphone,
            "speech_recognition" | "speech" => Self::SpeechRecognition,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Calendar => "calendar",
            Self::Contacts => "contacts",
            Self::Location => "location",
            Self::Microphone => "microphone",
            Self::SpeechRecognition => "speech_recognition",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The capability does not exist on this platform; requesting is pointless.
    Unavailable,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// The capability-check collaborator.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Check the current grant state without prompting anyone.
    async fn check(&self, permission: &Permission) -> PermissionStatus;

    /// Ask for the permission. Returns `Granted` or `Denied`.
    async fn request(&self, permission: &Permission) -> PermissionStatus;
}

/// Grants everything. Useful for trusted hosts and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl PermissionGate for AllowAll {
    async fn check(&self, _permission: &Permission) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn request(&self, _permission: &Permission) -> PermissionStatus {
        PermissionStatus::Granted
    }
}

/// A fixed grant table, typically built from configuration.
///
/// Permissions not listed are `Denied`; `request()` never changes that.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    granted: HashSet<Permission>,
    unavailable: HashSet<Permission>,
}

impl StaticPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, permission: Permission) -> Self {
        self.unavailable.remove(&permission);
        self.granted.insert(permission);
        self
    }

    pub fn unavailable(mut self, permission: Permission) -> Self {
        self.granted.remove(&permission);
        self.unavailable.insert(permission);
        self
    }

    /// Build from configuration names.
    pub fn from_names<'a>(
        granted: impl IntoIterator<Item = &'a str>,
        unavailable: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut table = Self::new();
        for name in granted {
            table = table.grant(Permission::from_name(name));
        }
        for name in unavailable {
            table = table.unavailable(Permission::from_name(name));
        }
        table
    }
}

#[async_trait]
impl PermissionGate for StaticPermissions {
    async fn check(&self, permission: &Permission) -> PermissionStatus {
        if self.granted.contains(permission) {
            PermissionStatus::Granted
        } else if self.unavailable.contains(permission) {
            PermissionStatus::Unavailable
        } else {
            PermissionStatus::Denied
        }
    }

    async fn request(&self, permission: &Permission) -> PermissionStatus {
        if self.granted.contains(permission) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }
}
