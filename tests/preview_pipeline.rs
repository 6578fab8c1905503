mod common;

use common::{game_fixture, manager, FakeGenerator, FURNACE_COLOR, STICK_COLOR, VERSION};
use image::RgbaImage;
use item_preview::channel::{pump, run_until_settled, PreviewChannel};
use item_preview::compositor::RenderMode;
use item_preview::config::PreviewConfig;
use item_preview::host::PreviewHost;
use item_preview::item::Item;
use item_preview::protocol::ClientMessage;
use item_preview::render_with_manager;
use item_preview::session::PreviewSession;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

const SIZE: u32 = 160;
const SETTLE: Duration = Duration::from_secs(10);

// 160x160 surface: checker cell 10, sprite square 80px at (40, 10), tooltip panel from y = 100.
async fn render(item: Item) -> (RgbaImage, Rc<FakeGenerator>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let paths = game_fixture(dir.path());
    let generator = Rc::new(FakeGenerator::default());
    let preview = PreviewConfig { width: SIZE, height: SIZE, ..PreviewConfig::default() };
    let frame = LocalSet::new()
        .run_until(render_with_manager(manager(&paths, &generator), &preview, item, 0.0))
        .await
        .expect("render preview");
    (frame, generator)
}

#[tokio::test]
async fn renders_sprite_and_tooltip_from_unpacked_version() {
    let (frame, generator) = render(Item::new(VERSION, "minecraft:stick")).await;
    assert_eq!(frame.dimensions(), (SIZE, SIZE));
    assert_eq!(generator.calls.get(), 1);
    assert_eq!(frame.get_pixel(80, 50).0, STICK_COLOR);

    // Widest line is "minecraft:stick": 15 glyphs of 8px plus 4px padding each side.
    let panel_left = (SIZE - 128) / 2;
    let panel_top = 100;
    // Name line "Stick": 'S' is not in the font, so 't' starts one space advance in.
    assert_eq!(frame.get_pixel(panel_left + 4 + 8, panel_top + 4).0, [255, 255, 255, 255]);
    // Id line is dark gray.
    assert_eq!(frame.get_pixel(panel_left + 4, panel_top + 12).0, [0x55, 0x55, 0x55, 255]);
}

#[tokio::test]
async fn enchanted_items_get_the_glint() {
    let item = Item::new(VERSION, "minecraft:stick")
        .with_component("minecraft:enchantments", r#"{levels:{"minecraft:unbreaking":3}}"#);
    let (frame, _) = render(item).await;
    let [r, g, b, a] = frame.get_pixel(80, 50).0;
    assert_eq!((r, g, a), (STICK_COLOR[0], STICK_COLOR[1], 255));
    assert!(b > STICK_COLOR[2], "glint should brighten the blue channel, got {b}");
}

#[tokio::test]
async fn missing_sprite_still_renders_tooltip() {
    let (frame, _) = render(Item::new(VERSION, "minecraft:ghost")).await;
    let sprite_area = frame.get_pixel(80, 50).0;
    assert_ne!(sprite_area, STICK_COLOR);
    // "minecraft:ghost" is as wide as "minecraft:stick"; the id line starts with 'm'.
    assert_eq!(frame.get_pixel((SIZE - 128) / 2 + 4, 100 + 12).0, [0x55, 0x55, 0x55, 255]);
}

#[tokio::test]
async fn failed_unpack_is_retried_when_the_selection_changes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let paths = game_fixture(dir.path());
    let generator = Rc::new(FakeGenerator::default());
    generator.fail.set(true);
    let stick = Item::new(VERSION, "minecraft:stick");
    let host = Rc::new(PreviewHost::new(manager(&paths, &generator), Some(stick.clone())));
    let mut session = PreviewSession::new(PreviewConfig { width: SIZE, height: SIZE, ..PreviewConfig::default() });

    LocalSet::new()
        .run_until(async {
            let mut channel = PreviewChannel::new(host);
            run_until_settled(&mut session, &mut channel, SETTLE).await.expect("settles after failure");
            assert_eq!(session.item(), Some(&stick));
            assert!(session.compositor().mode().is_empty(), "nothing was unpacked");
            let failed_runs = generator.calls.get();
            assert!(failed_runs >= 1);
            assert!(!paths.bundle_dir(VERSION).exists());

            generator.fail.set(false);
            let furnace = Item::new(VERSION, "minecraft:furnace");
            for message in session.edit_item(Some(furnace)) {
                channel.send(&message);
            }
            pump(&mut session, &mut channel).await;
            assert_eq!(session.compositor().mode(), RenderMode::HAS_SPRITE | RenderMode::FONTS_READY);
            assert_eq!(generator.calls.get(), failed_runs + 1);
            assert_eq!(session.frame(0.0).get_pixel(80, 50).0, FURNACE_COLOR);

            let outgoing = session.edit_item(Some(stick.clone()));
            assert_eq!(outgoing.len(), 2, "only the stick sprite is still missing: {outgoing:?}");
            assert_eq!(outgoing[1], ClientMessage::get_item_texture(&stick));
            for message in outgoing {
                channel.send(&message);
            }
            pump(&mut session, &mut channel).await;
            assert_eq!(session.frame(0.0).get_pixel(80, 50).0, STICK_COLOR);
            assert_eq!(generator.calls.get(), failed_runs + 1);
        })
        .await;
}
