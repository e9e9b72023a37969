//! Compiler settings.
//!
//! Settings are plain data: parsing engine parameters is up to the caller, which hands the
//! result to the schema builders and compilers. [`Settings::from_json_str`] and
//! [`Settings::from_json_file`] cover the common case of a JSON settings file.

use crate::error::{CompileError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Private graph of the address book.
pub const DEFAULT_GRAPH_IRI: &str = "urn:uuid:08070f5c-a334-4d19-a8b0-12a3071bfab9";
/// Graph written by the instant messaging bridge.
pub const TELEPATHY_GRAPH_IRI: &str = "urn:uuid:679293d4-60f0-49c7-8d63-f1528fe31f66";
/// Sync target of contacts created through the address book.
pub const SYNC_TARGET_ADDRESS_BOOK: &str = "addressbook";
/// Sync target of contacts created by the instant messaging bridge.
pub const SYNC_TARGET_TELEPATHY: &str = "telepathy";

/// Avatar implementations a person schema can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarType {
    /// Picture chosen for the contact by the user
    Personal,
    /// Picture published by an online account
    Online,
    /// Picture fetched from a social network
    Social,
}

/// Settings shared by the schema builders and the compilers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Trailing digits compared when matching phone numbers
    pub local_phone_number_length: usize,

    /// Store phone numbers with ASCII digits
    pub convert_numbers_to_latin: bool,

    /// Allow writing presence and online account chains
    pub write_back_presence: bool,

    /// Graph written to; values from other graphs are read-only
    pub graph_iri: String,

    /// URI of the manager whose contacts are stored here
    pub manager_uri: String,

    /// Sync target assigned to contacts without a strong one
    pub default_sync_target: String,

    /// Sync targets replaced by the default one when a contact is saved
    pub weak_sync_targets: Vec<String>,

    /// Avatar implementations registered in the person schema
    pub avatar_types: Vec<AvatarType>,

    /// Largest number of contacts removed by one statement
    pub remove_chunk_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            local_phone_number_length: 7,
            convert_numbers_to_latin: true,
            write_back_presence: false,
            graph_iri: DEFAULT_GRAPH_IRI.to_string(),
            manager_uri: String::new(),
            default_sync_target: SYNC_TARGET_ADDRESS_BOOK.to_string(),
            weak_sync_targets: vec![SYNC_TARGET_TELEPATHY.to_string()],
            avatar_types: vec![AvatarType::Personal, AvatarType::Online],
            remove_chunk_size: 250,
        }
    }
}

impl Settings {
    /// Settings of a device: presence is written back and every avatar type is known.
    pub fn device() -> Self {
        Self {
            write_back_presence: true,
            avatar_types: vec![AvatarType::Personal, AvatarType::Online, AvatarType::Social],
            ..Default::default()
        }
    }

    /// Settings for tests and tools: digits are kept as entered and no avatars are known.
    pub fn minimal() -> Self {
        Self {
            convert_numbers_to_latin: false,
            avatar_types: Vec::new(),
            ..Default::default()
        }
    }

    /// Load settings from JSON; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CompileError::config("failed to parse settings", Some(e)))
    }

    /// Load settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CompileError::config(format!("failed to read {}", path.display()), Some(e))
        })?;
        Self::from_json_str(&json)
    }

    /// Set the number of digits compared when matching phone numbers.
    pub fn with_local_phone_number_length(mut self, length: usize) -> Self {
        self.local_phone_number_length = length;
        self
    }

    /// Set the private graph.
    pub fn with_graph_iri(mut self, graph_iri: impl Into<String>) -> Self {
        self.graph_iri = graph_iri.into();
        self
    }

    /// Set the manager URI.
    pub fn with_manager_uri(mut self, manager_uri: impl Into<String>) -> Self {
        self.manager_uri = manager_uri.into();
        self
    }

    /// Allow writing presence chains.
    pub fn with_write_back_presence(mut self, write_back: bool) -> Self {
        self.write_back_presence = write_back;
        self
    }

    /// Set the avatar implementations.
    pub fn with_avatar_types(mut self, types: Vec<AvatarType>) -> Self {
        self.avatar_types = types;
        self
    }

    /// Set the remove chunk size.
    pub fn with_remove_chunk_size(mut self, size: usize) -> Self {
        self.remove_chunk_size = size;
        self
    }

    /// Whether `sync_target` is replaced by the default sync target on save.
    ///
    /// The empty target is always weak.
    pub fn is_weak_sync_target(&self, sync_target: &str) -> bool {
        sync_target.is_empty() || self.weak_sync_targets.iter().any(|t| t == sync_target)
    }

    /// Whether `graph_iri` is some other writer's graph.
    pub fn is_foreign_graph(&self, graph_iri: &str) -> bool {
        !graph_iri.is_empty() && graph_iri != self.graph_iri
    }

    /// Whether avatars of `avatar_type` are registered.
    pub fn has_avatar_type(&self, avatar_type: AvatarType) -> bool {
        self.avatar_types.contains(&avatar_type)
    }
}
