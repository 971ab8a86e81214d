use super::*;

#[test]
fn parses_external_json_shape() {
    let json = r#"{
        "layers": [
            { "name": "face", "required": true },
            { "name": "hair", "required": false, "includeChance": 0.8 },
            { "name": "eyebrows", "required": true, "modeChances": { "color2": 3, "color3": 1 } },
            { "name": "tattoo", "required": false }
        ]
    }"#;
    let m = Manifest::from_reader(json.as_bytes()).unwrap();
    assert_eq!(
        m.layer_names().collect::<Vec<_>>(),
        ["face", "hair", "eyebrows", "tattoo"]
    );
    assert_eq!(m.layers[1].effective_include_chance(), 0.8);
    assert_eq!(m.layers[3].effective_include_chance(), DEFAULT_INCLUDE_CHANCE);
    assert_eq!(m.layers[2].mode_weight("color2"), Some(3.0));
    assert_eq!(m.layers[2].mode_weight("color9"), Some(0.0));
    assert_eq!(m.layers[0].mode_weight("color2"), None);
}

#[test]
fn duplicate_names_are_rejected() {
    let m = Manifest::new(vec![LayerSpec::required("face"), LayerSpec::required("face")]);
    let err = m.validate().unwrap_err();
    assert!(matches!(err, AvatarError::ConfigLoad(_)));
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn include_chance_out_of_range_is_rejected() {
    let m = Manifest::new(vec![LayerSpec::optional("hair", Some(1.5))]);
    assert!(m.validate().is_err());
    let m = Manifest::new(vec![LayerSpec::optional("hair", Some(f64::NAN))]);
    assert!(m.validate().is_err());
}

#[test]
fn negative_mode_weight_is_rejected() {
    let m = Manifest::new(vec![
        LayerSpec::required("eyes").with_mode_chances([("blue", -1.0)]),
    ]);
    assert!(m.validate().is_err());
}

#[test]
fn layer_names_cannot_escape_asset_root() {
    let m = Manifest::new(vec![LayerSpec::required("../face")]);
    assert!(m.validate().is_err());
}

#[test]
fn malformed_json_is_config_load_error() {
    let err = Manifest::from_reader("{ \"layers\": [".as_bytes()).unwrap_err();
    assert!(matches!(err, AvatarError::ConfigLoad(_)));
}

#[test]
fn require_layer_reports_unknown_name() {
    let m = Manifest::new(vec![LayerSpec::required("face")]);
    assert!(m.require_layer("face").is_ok());
    assert!(matches!(
        m.require_layer("cape").unwrap_err(),
        AvatarError::Validation(_)
    ));
}
