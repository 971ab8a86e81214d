use super::*;
use crate::{
    catalog::index::AssetIndex,
    manifest::model::LayerSpec,
    recipe::random::ScriptedSource,
    render::{backend::LayerImage, cpu::CpuSurface, loader::MemoryImageLoader},
};

fn solid(px: [u8; 4]) -> LayerImage {
    LayerImage {
        pixels: image::RgbaImage::from_pixel(2, 2, image::Rgba(px)),
    }
}

fn manifest() -> Manifest {
    Manifest::new(vec![
        LayerSpec::required("face"),
        LayerSpec::optional("hair", Some(1.0)),
        LayerSpec::optional("eyebrows", Some(1.0)),
    ])
}

fn index() -> AssetIndex {
    AssetIndex::new()
        .with_flat("face", ["a.png", "b.png"])
        .with_flat("hair", ["h1.png", "h2.png"])
        .with_moded(
            "eyebrows",
            [
                ("color1", vec!["01.png", "02.png"]),
                ("color2", vec!["01.png"]),
            ],
        )
}

fn loader() -> MemoryImageLoader {
    MemoryImageLoader::new()
        .with("face/a.png", solid([255, 0, 0, 255]))
        .with("face/b.png", solid([0, 0, 255, 255]))
        .with("hair/h1.png", solid([0, 255, 0, 255]))
        .with("hair/h2.png", solid([0, 128, 0, 255]))
        .with("eyebrows/color1/01.png", solid([10, 10, 10, 255]))
        .with("eyebrows/color1/02.png", solid([20, 20, 20, 255]))
        .with("eyebrows/color2/01.png", solid([30, 30, 30, 255]))
}

fn small() -> RenderOpts {
    RenderOpts {
        preview: Canvas::square(2),
        thumbnail: Canvas::square(1),
    }
}

fn session() -> Session {
    Session::new(manifest(), index())
        .unwrap()
        .with_render_opts(small())
}

#[test]
fn new_session_is_uninitialized_with_first_tab() {
    let s = session();
    assert_eq!(s.phase(), SessionPhase::Uninitialized);
    assert_eq!(s.active_tab(), Some("face"));
    assert!(s.recipe().is_none());
    assert!(s.begin_render().is_none());
    assert!(s.recipe_text().is_none());
    assert!(s.export_file_name().is_none());
}

#[test]
fn invalid_manifest_is_rejected() {
    let m = Manifest::new(vec![LayerSpec::required("face"), LayerSpec::required("face")]);
    assert!(matches!(
        Session::new(m, index()),
        Err(AvatarError::ConfigLoad(_))
    ));
}

#[test]
fn generate_records_modes_and_bumps_generation() {
    let mut s = session();
    // face: pick 0 -> a.png; hair: include, pick 0.9 -> h2; eyebrows: include, mode, file.
    let mut rng = ScriptedSource::new([0.0, 0.0, 0.9, 0.0, 0.9, 0.0]);
    let recipe = s.generate(&mut rng).unwrap().clone();
    assert_eq!(recipe.get("face"), Some(&AssetRef::flat("a.png")));
    assert_eq!(recipe.get("hair"), Some(&AssetRef::flat("h2.png")));
    let eyebrows = recipe.get("eyebrows").unwrap();
    assert_eq!(
        s.selected_modes().get("eyebrows").map(String::as_str),
        eyebrows.mode()
    );
    assert_eq!(s.phase(), SessionPhase::Ready);
    assert_eq!(s.generation(), 1);
}

#[test]
fn failed_generate_leaves_state_untouched() {
    let m = Manifest::new(vec![LayerSpec::required("face")]);
    let mut s = Session::new(m, AssetIndex::new()).unwrap();
    let err = s.generate(&mut ScriptedSource::new([0.0])).unwrap_err();
    assert!(matches!(err, AvatarError::EmptyAssetPool { .. }));
    assert!(s.recipe().is_none());
    assert_eq!(s.generation(), 0);
}

#[test]
fn select_asset_from_uninitialized_synthesizes_default() {
    let mut s = session();
    s.select_asset("hair", AssetRef::flat("h1.png")).unwrap();
    let r = s.recipe().unwrap();
    assert_eq!(r.get("face"), Some(&AssetRef::flat("a.png")));
    assert_eq!(r.get("hair"), Some(&AssetRef::flat("h1.png")));
    assert_eq!(r.get("eyebrows"), Some(&AssetRef::None));
}

#[test]
fn select_asset_rejects_omitting_required_layer() {
    let mut s = session();
    let err = s.select_asset("face", AssetRef::None).unwrap_err();
    assert!(matches!(err, AvatarError::Validation(_)));
    assert!(matches!(
        s.select_asset("nose", AssetRef::flat("x.png")),
        Err(AvatarError::Validation(_))
    ));
}

#[test]
fn select_moded_asset_remembers_mode() {
    let mut s = session();
    s.select_asset("eyebrows", AssetRef::moded("color2", "01.png"))
        .unwrap();
    assert_eq!(
        s.selected_modes().get("eyebrows").map(String::as_str),
        Some("color2")
    );
}

#[test]
fn color_mode_is_ignored_before_first_recipe() {
    let mut s = session();
    assert!(!s.select_color_mode("eyebrows", "color2").unwrap());
    assert!(s.recipe().is_none());
    assert!(s.selected_modes().is_empty());
}

#[test]
fn color_mode_keeps_filename_when_available() {
    let mut s = session();
    s.select_asset("eyebrows", AssetRef::moded("color1", "01.png"))
        .unwrap();
    assert!(s.select_color_mode("eyebrows", "color2").unwrap());
    assert_eq!(
        s.recipe().unwrap().get("eyebrows"),
        Some(&AssetRef::moded("color2", "01.png"))
    );
}

#[test]
fn color_mode_falls_back_to_first_file() {
    let mut s = session();
    s.select_asset("eyebrows", AssetRef::moded("color2", "01.png"))
        .unwrap();
    s.select_asset("eyebrows", AssetRef::moded("color1", "02.png"))
        .unwrap();
    assert!(s.select_color_mode("eyebrows", "color2").unwrap());
    assert_eq!(
        s.recipe().unwrap().get("eyebrows"),
        Some(&AssetRef::moded("color2", "01.png"))
    );
}

#[test]
fn color_mode_on_omitted_layer_only_records_mode() {
    let mut s = session();
    s.select_asset("eyebrows", AssetRef::None).unwrap();
    assert!(s.select_color_mode("eyebrows", "color2").unwrap());
    assert_eq!(s.recipe().unwrap().get("eyebrows"), Some(&AssetRef::None));
    assert_eq!(
        s.selected_modes().get("eyebrows").map(String::as_str),
        Some("color2")
    );
}

#[test]
fn color_mode_rules_for_flat_and_unknown() {
    let mut s = session();
    s.select_asset("hair", AssetRef::flat("h1.png")).unwrap();
    assert!(!s.select_color_mode("hair", "color1").unwrap());
    assert!(matches!(
        s.select_color_mode("eyebrows", "color9"),
        Err(AvatarError::Validation(_))
    ));
}

#[test]
fn background_choice_lightens_fill_and_shows_in_text() {
    let mut s = session();
    s.select_asset("hair", AssetRef::flat("h1.png")).unwrap();
    assert!(s.recipe_text().unwrap().ends_with("color: none"));

    s.set_background(Rgb8::new(0xff, 0, 0));
    assert_eq!(s.background().fill(), Some(Rgb8::new(0xff, 0x33, 0x33)));
    assert_eq!(
        s.recipe_text().unwrap(),
        "face: a.png\nhair: h1.png\neyebrows: none\ncolor: #ff0000"
    );
}

#[test]
fn active_tab_must_name_a_layer() {
    let mut s = session();
    s.set_active_tab("eyebrows").unwrap();
    assert_eq!(s.active_tab(), Some("eyebrows"));
    assert!(s.set_active_tab("nose").is_err());
    assert_eq!(s.active_tab(), Some("eyebrows"));
}

#[test]
fn render_preview_commits_frame() {
    let mut s = session();
    s.select_asset("face", AssetRef::flat("b.png")).unwrap();
    let frame = s
        .render_preview(&loader(), &CpuSurface::default())
        .unwrap();
    assert_eq!(frame.pixel(0, 0), Some([0, 0, 255, 255]));
    assert!(s.last_frame().is_some());
}

#[test]
fn stale_ticket_is_dropped() {
    let mut s = session();
    s.select_asset("face", AssetRef::flat("a.png")).unwrap();
    let ticket = s.begin_render().unwrap();
    s.select_asset("face", AssetRef::flat("b.png")).unwrap();

    let result = ticket.render(&loader(), &CpuSurface::default());
    let outcome = s.commit_render(&ticket, result).unwrap();
    assert!(matches!(outcome, RenderOutcome::Stale));
    assert!(s.last_frame().is_none());
}

#[test]
fn failed_render_keeps_last_good_frame() {
    let mut s = session();
    s.select_asset("face", AssetRef::flat("a.png")).unwrap();
    let good = s
        .render_preview(&loader(), &CpuSurface::default())
        .unwrap();

    s.select_asset("hair", AssetRef::flat("missing.png")).unwrap();
    let err = s
        .render_preview(&loader(), &CpuSurface::default())
        .unwrap_err();
    assert!(matches!(err, AvatarError::AssetLoad { .. }));
    assert_eq!(s.last_frame(), Some(&good));
}

#[test]
fn thumbnail_grid_lists_none_first_and_marks_selection() {
    let mut s = session();
    s.select_asset("hair", AssetRef::flat("h2.png")).unwrap();
    let grid = s
        .thumbnail_grid("hair", &loader(), &CpuSurface::default())
        .unwrap();
    let candidates = grid.iter().map(|e| e.candidate.clone()).collect::<Vec<_>>();
    assert_eq!(
        candidates,
        [
            AssetRef::None,
            AssetRef::flat("h1.png"),
            AssetRef::flat("h2.png")
        ]
    );
    let selected = grid.iter().filter(|e| e.selected).count();
    assert_eq!(selected, 1);
    assert!(grid[2].selected);
    assert!(grid.iter().all(|e| e.image.is_some()));
}

#[test]
fn thumbnail_grid_uses_selected_mode() {
    let mut s = session();
    s.select_asset("eyebrows", AssetRef::moded("color2", "01.png"))
        .unwrap();
    let grid = s
        .thumbnail_grid("eyebrows", &loader(), &CpuSurface::default())
        .unwrap();
    let candidates = grid.iter().map(|e| e.candidate.clone()).collect::<Vec<_>>();
    assert_eq!(
        candidates,
        [AssetRef::None, AssetRef::moded("color2", "01.png")]
    );
}

#[test]
fn required_layer_grid_has_no_none_entry() {
    let mut s = session();
    let grid = s
        .thumbnail_grid("face", &loader(), &CpuSurface::default())
        .unwrap();
    assert_eq!(grid.len(), 2);
    assert!(grid[0].selected);
    assert!(s.recipe().is_some());
}

#[test]
fn thumbnails_are_memoized_until_invalidated() {
    let mut s = session();
    let loader = loader();
    let surface = CpuSurface::default();
    s.thumbnail_grid("hair", &loader, &surface).unwrap();
    let misses = s.thumbnail_cache().stats().misses;
    s.thumbnail_grid("hair", &loader, &surface).unwrap();
    assert_eq!(s.thumbnail_cache().stats().misses, misses);

    s.set_background(Rgb8::new(0, 0, 0xff));
    assert!(s.thumbnail_cache().is_empty());
    s.thumbnail_grid("hair", &loader, &surface).unwrap();
    assert_eq!(s.thumbnail_cache().stats().misses, misses * 2);
}

#[test]
fn failing_thumbnail_degrades_to_none() {
    let mut s = session();
    let grid = s
        .thumbnail_grid("hair", &MemoryImageLoader::new(), &CpuSurface::default())
        .unwrap();
    assert!(grid.iter().all(|e| e.image.is_none()));
}

#[test]
fn reload_catalog_clears_thumbnails_and_redetects_shape() {
    let mut s = session();
    s.thumbnail_grid("hair", &loader(), &CpuSurface::default())
        .unwrap();
    let before = s.generation();
    s.reload_catalog(
        AssetIndex::new()
            .with_flat("face", ["a.png"])
            .with_moded("hair", [("red", vec!["h1.png"])]),
    );
    assert!(s.thumbnail_cache().is_empty());
    assert!(s.generation() > before);
    assert!(s.index().is_moded_layer("hair"));
}

#[test]
fn export_name_follows_recipe_fingerprint() {
    let mut s = session();
    s.select_asset("hair", AssetRef::flat("h1.png")).unwrap();
    let name = s.export_file_name().unwrap();
    assert_eq!(
        name,
        format!("avatar-{:016x}.png", s.recipe().unwrap().fingerprint())
    );
    s.select_asset("hair", AssetRef::flat("h2.png")).unwrap();
    assert_ne!(s.export_file_name().unwrap(), name);
}
