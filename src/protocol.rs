//! Messages exchanged between the preview (client) and the host (server).
//!
//! Every message is a JSON object tagged by `type`. Anything that does not match one of the shapes
//! below, or carries values that fail validation, is dropped without a reply.

use crate::item::Item;
use crate::resource_key::{resource_key, ResourceKey};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Ready,
    GetItemTexture {
        item: Item,
    },
    GetResource {
        version: String,
        resource: String,
    },
    UpdateItem {
        item: Option<Item>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    UpdateItem {
        item: Option<Item>,
    },
    UpdateVersions {
        versions: Vec<String>,
    },
    ItemTexture {
        item: Item,
        #[serde(rename = "textureBase64")]
        texture_base64: String,
    },
    Resource {
        version: String,
        resource: String,
        #[serde(rename = "textureBase64")]
        texture_base64: String,
    },
    UpdateItemComponents {
        components: Vec<String>,
    },
}

impl ClientMessage {
    pub fn parse(raw: &str) -> Option<Self> {
        let message: Self = decode(raw)?;
        let valid = match &message {
            ClientMessage::Ready => true,
            ClientMessage::GetItemTexture { item } => valid_item(item),
            ClientMessage::GetResource { version, resource } => valid_resource(version, resource),
            ClientMessage::UpdateItem { item } => item.as_ref().map_or(true, valid_item),
        };
        accept(message, valid)
    }

    pub fn to_json(&self) -> String {
        encode(self)
    }

    pub fn get_item_texture(item: &Item) -> Self {
        ClientMessage::GetItemTexture { item: item.clone() }
    }

    pub fn get_resource(version: &str, resource: &str) -> Self {
        ClientMessage::GetResource { version: version.to_string(), resource: resource.to_string() }
    }
}

impl ServerMessage {
    pub fn parse(raw: &str) -> Option<Self> {
        let message: Self = decode(raw)?;
        let valid = match &message {
            ServerMessage::UpdateItem { item } => item.as_ref().map_or(true, valid_item),
            ServerMessage::UpdateVersions { .. } | ServerMessage::UpdateItemComponents { .. } => true,
            ServerMessage::ItemTexture { item, .. } => valid_item(item),
            ServerMessage::Resource { version, resource, .. } => valid_resource(version, resource),
        };
        accept(message, valid)
    }

    pub fn to_json(&self) -> String {
        encode(self)
    }

    pub fn item_texture(item: &Item, bytes: &[u8]) -> Self {
        ServerMessage::ItemTexture { item: item.clone(), texture_base64: encode_texture(bytes) }
    }

    pub fn resource(version: &str, resource: &str, bytes: &[u8]) -> Self {
        ServerMessage::Resource {
            version: version.to_string(),
            resource: resource.to_string(),
            texture_base64: encode_texture(bytes),
        }
    }

    /// Cache key a response is filed under, re-derived from the fields it echoes back.
    pub fn response_key(&self) -> Option<ResourceKey> {
        match self {
            ServerMessage::ItemTexture { item, .. } => Some(resource_key(&item.version, &item.id)),
            ServerMessage::Resource { version, resource, .. } => Some(resource_key(version, resource)),
            _ => None,
        }
    }
}

pub fn encode_texture(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_texture(encoded: &str) -> Option<Vec<u8>> {
    match STANDARD.decode(encoded) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            log::debug!(target: "protocol", "Dropping undecodable texture payload: {err}");
            None
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(message) => Some(message),
        Err(err) => {
            log::debug!(target: "protocol", "Dropping unrecognized message: {err}");
            None
        }
    }
}

fn encode<T: Serialize>(message: &T) -> String {
    // Plain data with string keys; serialization cannot fail.
    serde_json::to_string(message).unwrap_or_default()
}

fn accept<T: std::fmt::Debug>(message: T, valid: bool) -> Option<T> {
    if !valid {
        log::debug!(target: "protocol", "Dropping invalid message: {message:?}");
        return None;
    }
    Some(message)
}

fn valid_item(item: &Item) -> bool {
    !item.id.is_empty() && valid_version(&item.version) && item.count >= 0
}

// `#` is the cache key separator.
fn valid_version(version: &str) -> bool {
    !version.is_empty() && !version.contains('#')
}

fn valid_resource(version: &str, resource: &str) -> bool {
    valid_version(version)
        && !resource.is_empty()
        && !resource.starts_with(['/', '\\'])
        && !resource.split(['/', '\\']).any(|segment| segment == ".." || segment.contains(':'))
}
