use super::*;

fn sample() -> AssetIndex {
    AssetIndex::from_reader(
        r#"{
            "face": ["a.png", "b.png"],
            "eyebrows": { "color3": ["02.png"], "color2": ["01.png", "03.png"] },
            "empty": {}
        }"#
        .as_bytes(),
    )
    .unwrap()
}

#[test]
fn shape_is_detected_per_entry() {
    let idx = sample();
    assert!(!idx.is_moded_layer("face"));
    assert!(idx.is_moded_layer("eyebrows"));
    assert!(idx.is_moded_layer("empty"));
    assert!(!idx.is_moded_layer("missing"));
}

#[test]
fn modes_are_sorted_and_empty_for_flat_or_missing() {
    let idx = sample();
    assert_eq!(idx.list_modes("eyebrows"), ["color2", "color3"]);
    assert!(idx.list_modes("face").is_empty());
    assert!(idx.list_modes("missing").is_empty());
}

#[test]
fn list_assets_covers_every_shape() {
    let idx = sample();
    assert_eq!(idx.list_assets("face", None), ["a.png", "b.png"]);
    assert_eq!(idx.list_assets("face", Some("color2")), ["a.png", "b.png"]);
    assert_eq!(idx.list_assets("eyebrows", Some("color3")), ["02.png"]);
    assert!(idx.list_assets("eyebrows", Some("color9")).is_empty());
    assert_eq!(
        idx.list_assets("eyebrows", None),
        ["01.png", "03.png", "02.png"]
    );
    assert!(idx.list_assets("missing", None).is_empty());
    assert!(idx.list_assets("empty", None).is_empty());
}

#[test]
fn json_shape_survives_serialization() {
    let idx = sample();
    let json = idx.to_json_pretty().unwrap();
    let back = AssetIndex::from_reader(json.as_bytes()).unwrap();
    assert_eq!(back, idx);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["face"].is_array());
    assert!(value["eyebrows"].is_object());
}

#[test]
fn builders_match_parsed_catalog() {
    let built = AssetIndex::new()
        .with_flat("face", ["a.png", "b.png"])
        .with_moded(
            "eyebrows",
            [("color2", vec!["01.png", "03.png"]), ("color3", vec!["02.png"])],
        )
        .with_moded("empty", Vec::<(&str, Vec<&str>)>::new());
    assert_eq!(built, sample());
    assert_eq!(built.layer("eyebrows").map(LayerAssets::len), Some(3));
    assert!(built.layer("empty").unwrap().is_empty());
}

#[test]
fn bad_shape_is_config_load_error() {
    let err = AssetIndex::from_reader(r#"{ "face": 3 }"#.as_bytes()).unwrap_err();
    assert!(matches!(err, AvatarError::ConfigLoad(_)));
}
