//! Course site record types.
//!
//! These deserialize straight from the Moodle web service responses and are
//! serialized unchanged into the local course snapshots.

use serde::{Deserialize, Serialize};

/// Moodle reports web service failures as a 200 response with this body.
#[derive(Debug, Deserialize)]
pub struct WsException {
    pub exception: String,
    #[serde(default)]
    pub errorcode: String,
    #[serde(default)]
    pub message: String,
}

impl WsException {
    /// Whether the failure means the token is no longer accepted.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.errorcode.as_str(),
            "invalidtoken" | "accessexception" | "usernotfullysetup"
        )
    }
}

/// Site information, used to check a token is still valid.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteInfo {
    #[serde(rename = "userid")]
    pub user_id: u64,
    pub username: String,
    #[serde(rename = "fullname", default)]
    pub full_name: String,
}

/// An enrolled course.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    #[serde(rename = "shortname")]
    pub short_name: String,
    #[serde(rename = "fullname", default)]
    pub full_name: String,
}

impl Course {
    /// Name used for storage folders and notification titles.
    pub fn name(&self) -> &str {
        &self.short_name
    }
}

/// A course section (week or topic) and its modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub modules: Vec<Module>,
}

/// A course module (resource, forum, assignment...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: u64,
    #[serde(default)]
    pub instance: u64,
    pub name: String,
    #[serde(rename = "modname", default)]
    pub mod_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contents: Vec<Content>,
}

impl Module {
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// A downloadable file attached to a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "filename")]
    pub file_name: String,
    #[serde(rename = "fileurl", default)]
    pub file_url: String,
    #[serde(rename = "filesize", default)]
    pub file_size: u64,
    #[serde(rename = "timemodified", default)]
    pub time_modified: i64,
}

/// A file attached to a forum discussion post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "filename")]
    pub file_name: String,
    #[serde(rename = "fileurl")]
    pub file_url: String,
    #[serde(rename = "mimetype", default)]
    pub mime_type: Option<String>,
}

/// Where a piece of content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Module,
    Attachment,
}

/// Everything needed to download, open or share one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRef {
    pub file_name: String,
    pub url: String,
    pub description: String,
    pub kind: ContentKind,
}

impl ContentRef {
    pub fn from_module(content: &Content, module: &Module) -> Self {
        Self {
            file_name: content.file_name.clone(),
            url: content.file_url.clone(),
            description: module.description().to_string(),
            kind: ContentKind::Module,
        }
    }

    pub fn from_attachment(attachment: &Attachment, description: &str) -> Self {
        Self {
            file_name: attachment.file_name.clone(),
            url: attachment.file_url.clone(),
            description: description.to_string(),
            kind: ContentKind::Attachment,
        }
    }
}
