//! Host side of the preview channel: answers client requests from the unpacked bundles.

use crate::assets::{ResolveError, ResourceResolver, VersionAssetManager};
use crate::item::Item;
use crate::protocol::{ClientMessage, ServerMessage};
use std::cell::RefCell;
use std::io::ErrorKind;
use std::path::Path;

pub struct PreviewHost {
    manager: VersionAssetManager,
    resolver: ResourceResolver,
    item: RefCell<Option<Item>>,
}

impl PreviewHost {
    pub fn new(manager: VersionAssetManager, item: Option<Item>) -> Self {
        let resolver = ResourceResolver::new(manager.paths().clone());
        Self { manager, resolver, item: RefCell::new(item) }
    }

    pub fn manager(&self) -> &VersionAssetManager {
        &self.manager
    }

    pub fn current_item(&self) -> Option<Item> {
        self.item.borrow().clone()
    }

    /// Parses and answers one raw message. Unrecognized input produces no reply.
    pub async fn handle_raw(&self, raw: &str) -> Vec<String> {
        let Some(message) = ClientMessage::parse(raw) else {
            return Vec::new();
        };
        self.handle(message).await.iter().map(ServerMessage::to_json).collect()
    }

    pub async fn handle(&self, message: ClientMessage) -> Vec<ServerMessage> {
        match message {
            ClientMessage::Ready => self.on_ready().await,
            ClientMessage::GetItemTexture { item } => self.on_item_texture(item).await.into_iter().collect(),
            ClientMessage::GetResource { version, resource } => {
                self.on_resource(version, resource).await.into_iter().collect()
            }
            ClientMessage::UpdateItem { item } => {
                log::debug!(target: "host", "Item updated: {:?}", item.as_ref().map(|item| &item.id));
                self.item.replace(item);
                Vec::new()
            }
        }
    }

    async fn on_ready(&self) -> Vec<ServerMessage> {
        let item = self.current_item();
        let versions = self.resolver.installed_versions().unwrap_or_else(|err| {
            log::warn!(target: "host", "Could not list installed versions: {err:#}");
            Vec::new()
        });
        let mut replies =
            vec![ServerMessage::UpdateItem { item: item.clone() }, ServerMessage::UpdateVersions { versions }];

        if let Some(item) = item {
            if self.ensure_bundle(&item.version).await {
                match self.resolver.component_names(&item.version) {
                    Ok(components) => replies.push(ServerMessage::UpdateItemComponents { components }),
                    Err(err) => log::warn!(target: "host", "No component list for {}: {err:#}", item.version),
                }
            }
        }
        replies
    }

    async fn on_item_texture(&self, item: Item) -> Option<ServerMessage> {
        if !self.ensure_bundle(&item.version).await {
            return None;
        }
        let path = match self.resolver.resolve_item_sprite(&item.version, &item.id) {
            Ok(path) => path,
            Err(ResolveError::ResourceNotFound(what)) => {
                log::warn!(target: "host", "No sprite for {what}");
                return None;
            }
            Err(err) => {
                log::warn!(target: "host", "Sprite lookup for {} failed: {err}", item.id);
                return None;
            }
        };
        let bytes = read_resource(&path).await?;
        Some(ServerMessage::item_texture(&item, &bytes))
    }

    async fn on_resource(&self, version: String, resource: String) -> Option<ServerMessage> {
        if !self.ensure_bundle(&version).await {
            return None;
        }
        let path = self.resolver.resolve_generic_resource(&version, &resource);
        let bytes = read_resource(&path).await?;
        Some(ServerMessage::resource(&version, &resource, &bytes))
    }

    async fn ensure_bundle(&self, version: &str) -> bool {
        match self.manager.ensure_unpacked(version).await {
            Ok(()) => true,
            Err(err) => {
                log::warn!(target: "host", "{err}");
                false
            }
        }
    }
}

async fn read_resource(path: &Path) -> Option<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            log::warn!(target: "host", "Resource not found: {}", path.display());
            None
        }
        Err(err) => {
            log::warn!(target: "host", "Failed to read {}: {err}", path.display());
            None
        }
    }
}
