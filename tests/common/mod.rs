#![allow(dead_code)]

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use image::{ImageFormat, Rgba, RgbaImage};
use item_preview::assets::datagen::{DataGenerator, GeneratorInvocation};
use item_preview::assets::{AssetPaths, VersionAssetManager};
use item_preview::config::DatagenConfig;
use std::cell::Cell;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;
use std::rc::Rc;
use zip::write::SimpleFileOptions;

pub const VERSION: &str = "1.21";
pub const STICK_COLOR: [u8; 4] = [200, 30, 30, 255];
pub const FURNACE_COLOR: [u8; 4] = [90, 90, 90, 255];
pub const GLINT_COLOR: [u8; 4] = [0, 0, 255, 255];

pub const FONT_MANIFEST: &str = r#"{"providers":[
    {"type":"space","advances":{" ":4}},
    {"type":"bitmap","file":"minecraft:font/ascii.png","ascent":7,"chars":["abcdefghijklmnop","qrstuvwxyz:_ ABC"]}
]}"#;

pub const REGISTRIES: &str = r#"{
    "minecraft:item":{"entries":{"minecraft:stick":{}}},
    "minecraft:data_component_type":{"entries":{"minecraft:custom_name":{},"minecraft:lore":{}}}
}"#;

/// Stands in for the external generator; counts runs and writes the registry report.
#[derive(Default)]
pub struct FakeGenerator {
    pub calls: Cell<usize>,
    pub fail: Cell<bool>,
}

impl DataGenerator for FakeGenerator {
    fn generate<'a>(&'a self, invocation: &'a GeneratorInvocation) -> LocalBoxFuture<'a, anyhow::Result<()>> {
        async move {
            self.calls.set(self.calls.get() + 1);
            tokio::task::yield_now().await;
            if self.fail.get() {
                anyhow::bail!("generator exited with status 1");
            }
            let report = invocation.registries_report();
            fs::create_dir_all(report.parent().expect("report dir"))?;
            fs::write(report, REGISTRIES)?;
            Ok::<(), anyhow::Error>(())
        }
        .boxed_local()
    }
}

pub fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbaImage::from_pixel(width, height, Rgba(color))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}

/// Lays out a game directory with one installed version and returns the paths rooted at `root`.
pub fn game_fixture(root: &Path) -> AssetPaths {
    let paths = AssetPaths::new(root.join("data"), root.join("game"));
    let jar = paths.version_jar(VERSION);
    fs::create_dir_all(jar.parent().expect("version dir")).expect("create version dir");

    let white = png(128, 128, [255, 255, 255, 255]);
    let entries: Vec<(&str, Vec<u8>)> = vec![
        ("net/minecraft/data/Main.class", b"\xCA\xFE\xBA\xBE".to_vec()),
        ("assets/minecraft/lang/en_us.json", b"{}".to_vec()),
        ("assets/minecraft/textures/item/stick.png", png(16, 16, STICK_COLOR)),
        ("assets/minecraft/textures/block/furnace_side.png", png(16, 16, FURNACE_COLOR)),
        (
            "assets/minecraft/models/block/furnace.json",
            br#"{"parent":"block/orientable","textures":{"top":"block/furnace_top","side":"block/furnace_side"}}"#
                .to_vec(),
        ),
        ("assets/minecraft/textures/font/ascii.png", white.clone()),
        ("assets/minecraft/textures/font/accented.png", white.clone()),
        ("assets/minecraft/textures/font/nonlatin_european.png", white),
        ("assets/minecraft/font/include/default.json", FONT_MANIFEST.as_bytes().to_vec()),
        ("assets/minecraft/textures/misc/enchanted_glint_item.png", png(8, 8, GLINT_COLOR)),
    ];
    let mut writer = zip::ZipWriter::new(File::create(&jar).expect("create jar"));
    for (name, data) in &entries {
        writer.start_file(*name, SimpleFileOptions::default()).expect("start entry");
        writer.write_all(data).expect("write entry");
    }
    writer.finish().expect("finish jar");

    fs::write(paths.version_manifest(VERSION), r#"{"id":"1.21","libraries":[]}"#).expect("write manifest");
    paths
}

pub fn manager(paths: &AssetPaths, generator: &Rc<FakeGenerator>) -> VersionAssetManager {
    let generator: Rc<dyn DataGenerator> = generator.clone();
    VersionAssetManager::with_generator(paths.clone(), DatagenConfig::default(), generator)
}
