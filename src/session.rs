//! Rendering side of the preview channel.
//!
//! The session keeps every texture and resource it has ever been sent, keyed by [`ResourceKey`],
//! and decides what to request whenever the item changes. Responses are matched back to the
//! current item only through their key, so answers for an earlier selection still land in the
//! cache and are reused if that selection comes back. Requests still unanswered when the selection
//! changes are forgotten, so choosing that item again sends them once more.

use crate::compositor::{Compositor, FontAtlas};
use crate::config::PreviewConfig;
use crate::font::{self, FontManifest, PAGE_COUNT, PAGE_FILES};
use crate::item::Item;
use crate::protocol::{decode_texture, ClientMessage, ServerMessage};
use crate::resource_key::{resource_key, ResourceKey};
use glam::UVec2;
use image::RgbaImage;
use std::collections::{HashMap, HashSet};

const FONT_NAME: &str = "default";
const FONT_PAGE_DIR: &str = "textures/font";

pub struct PreviewSession {
    config: PreviewConfig,
    item: Option<Item>,
    versions: Vec<String>,
    components: Vec<String>,
    textures: HashMap<ResourceKey, RgbaImage>,
    resources: HashMap<ResourceKey, Vec<u8>>,
    requested: HashSet<ResourceKey>,
    fonts_version: Option<String>,
    compositor: Compositor,
    alive: bool,
}

impl PreviewSession {
    pub fn new(config: PreviewConfig) -> Self {
        let compositor = Compositor::new(config.width, config.height);
        Self {
            config,
            item: None,
            versions: Vec::new(),
            components: Vec::new(),
            textures: HashMap::new(),
            resources: HashMap::new(),
            requested: HashSet::new(),
            fonts_version: None,
            compositor,
            alive: true,
        }
    }

    pub fn start(&self) -> Vec<ClientMessage> {
        vec![ClientMessage::Ready]
    }

    pub fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn has_texture(&self, key: &ResourceKey) -> bool {
        self.textures.contains_key(key)
    }

    /// Stops reacting to responses; anything arriving afterwards is dropped.
    pub fn dispose(&mut self) {
        self.alive = false;
    }

    /// Applies a local edit and tells the host about it.
    pub fn edit_item(&mut self, item: Option<Item>) -> Vec<ClientMessage> {
        let mut outgoing = vec![ClientMessage::UpdateItem { item: item.clone() }];
        outgoing.extend(self.select_item(item));
        outgoing
    }

    pub fn receive_raw(&mut self, raw: &str) -> Vec<ClientMessage> {
        match ServerMessage::parse(raw) {
            Some(message) => self.receive(message),
            None => Vec::new(),
        }
    }

    pub fn receive(&mut self, message: ServerMessage) -> Vec<ClientMessage> {
        if !self.alive {
            log::debug!(target: "session", "Session disposed, dropping late {message:?}");
            return Vec::new();
        }
        let key = message.response_key();
        match message {
            ServerMessage::UpdateItem { item } => return self.select_item(item),
            ServerMessage::UpdateVersions { versions } => self.versions = versions,
            ServerMessage::UpdateItemComponents { components } => self.components = components,
            ServerMessage::ItemTexture { texture_base64, .. } => {
                if let Some(key) = key {
                    self.store_texture(key, &texture_base64);
                }
                self.refresh_sprite();
            }
            ServerMessage::Resource { resource, texture_base64, .. } => {
                if let Some(key) = key {
                    if resource.ends_with(".png") {
                        self.store_texture(key, &texture_base64);
                    } else if let Some(bytes) = decode_texture(&texture_base64) {
                        self.requested.remove(&key);
                        self.resources.insert(key, bytes);
                    }
                }
                self.refresh_glint();
                self.refresh_fonts();
            }
        }
        Vec::new()
    }

    /// Advances animation state and renders one frame at the configured size.
    pub fn frame(&mut self, time: f32) -> RgbaImage {
        self.compositor.tick(time, self.config.width, self.config.height);
        self.compositor.render()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
    }

    fn select_item(&mut self, item: Option<Item>) -> Vec<ClientMessage> {
        let version_changed = self.item.as_ref().map(|i| &i.version) != item.as_ref().map(|i| &i.version);
        let id_changed = self.item.as_ref().map(|i| &i.id) != item.as_ref().map(|i| &i.id);
        if version_changed || id_changed {
            // The host never answers a request it cannot serve; a new selection asks again.
            self.requested.clear();
        }
        if version_changed {
            self.fonts_version = None;
            self.compositor.clear_fonts();
        }
        self.item = item;
        self.compositor.set_item(self.item.clone());
        self.refresh_sprite();
        self.refresh_glint();
        self.refresh_fonts();
        self.pending_requests()
    }

    fn pending_requests(&mut self) -> Vec<ClientMessage> {
        let Some(item) = self.item.clone() else {
            return Vec::new();
        };
        let mut outgoing = Vec::new();
        let sprite = resource_key(&item.version, &item.id);
        if self.wants(&sprite) {
            outgoing.push(ClientMessage::get_item_texture(&item));
        }
        for path in self.version_resources() {
            if self.wants(&resource_key(&item.version, &path)) {
                outgoing.push(ClientMessage::get_resource(&item.version, &path));
            }
        }
        log::debug!(target: "session", "Requesting {} resources for {}", outgoing.len(), item.id);
        outgoing
    }

    fn version_resources(&self) -> Vec<String> {
        let mut paths: Vec<String> = PAGE_FILES.iter().map(|page| format!("{FONT_PAGE_DIR}/{page}")).collect();
        paths.push(self.config.font_manifest.clone());
        paths.push(self.config.glint_texture.clone());
        paths
    }

    fn wants(&mut self, key: &ResourceKey) -> bool {
        !self.textures.contains_key(key) && !self.resources.contains_key(key) && self.requested.insert(key.clone())
    }

    fn store_texture(&mut self, key: ResourceKey, encoded: &str) {
        self.requested.remove(&key);
        let Some(bytes) = decode_texture(encoded) else {
            return;
        };
        match image::load_from_memory(&bytes) {
            Ok(decoded) => {
                self.textures.insert(key, decoded.to_rgba8());
            }
            Err(err) => log::warn!(target: "session", "Undecodable texture for {key}: {err}"),
        }
    }

    fn refresh_sprite(&mut self) {
        let sprite = self.item.as_ref().and_then(|item| self.textures.get(&resource_key(&item.version, &item.id)));
        self.compositor.set_sprite(sprite.cloned());
    }

    fn refresh_glint(&mut self) {
        let glint = self
            .item
            .as_ref()
            .and_then(|item| self.textures.get(&resource_key(&item.version, &self.config.glint_texture)));
        self.compositor.set_glint(glint.cloned());
    }

    fn refresh_fonts(&mut self) {
        let Some(version) = self.item.as_ref().map(|item| item.version.clone()) else {
            return;
        };
        if self.fonts_version.as_deref() == Some(version.as_str()) {
            return;
        }
        let Some(manifest_bytes) = self.resources.get(&resource_key(&version, &self.config.font_manifest)) else {
            return;
        };
        let mut pages = Vec::with_capacity(PAGE_COUNT);
        for page in PAGE_FILES {
            match self.textures.get(&resource_key(&version, &format!("{FONT_PAGE_DIR}/{page}"))) {
                Some(image) => pages.push(image.clone()),
                None => return,
            }
        }
        let manifest = match FontManifest::from_slice(manifest_bytes) {
            Ok(manifest) => manifest,
            Err(err) => {
                log::warn!(target: "session", "Font manifest for {version} unusable: {err:#}");
                return;
            }
        };
        let Ok(pages) = <[RgbaImage; PAGE_COUNT]>::try_from(pages) else {
            return;
        };
        let dims = pages.each_ref().map(|page| UVec2::new(page.width(), page.height()));
        let glyphs = font::build(FONT_NAME, dims, &manifest);
        log::info!(target: "session", "Font ready for {version} ({} glyphs)", glyphs.len());
        self.fonts_version = Some(version);
        self.compositor.set_fonts(FontAtlas { pages, glyphs });
    }
}
