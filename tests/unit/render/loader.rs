use std::io::Cursor;

use super::*;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "avatar_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn write_png(path: &Path, px: [u8; 4]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(path, &buf).unwrap();
}

#[test]
fn fs_loader_decodes_each_path_once() {
    let root = temp_dir("loader_once");
    write_png(&root.join("eyebrows/color2/01.png"), [1, 2, 3, 255]);

    let loader = FsImageLoader::new(&root);
    let path = AssetPath::new("eyebrows/color2/01.png").unwrap();
    let a = loader.load(&path).unwrap();
    let b = loader.load(&path).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(loader.decode_count(), 1);
    assert_eq!(a.pixels.get_pixel(0, 0).0, [1, 2, 3, 255]);

    loader.clear();
    loader.load(&path).unwrap();
    assert_eq!(loader.decode_count(), 2);

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn fs_loader_reports_missing_and_corrupt_files() {
    let root = temp_dir("loader_missing");
    std::fs::create_dir_all(root.join("face")).unwrap();
    std::fs::write(root.join("face/bad.png"), b"garbage").unwrap();
    let loader = FsImageLoader::new(&root);

    let err = loader.load(&AssetPath::new("face/none.png").unwrap()).unwrap_err();
    assert!(matches!(err, AvatarError::AssetLoad { ref path, .. } if path == "face/none.png"));
    let err = loader.load(&AssetPath::new("face/bad.png").unwrap()).unwrap_err();
    assert!(matches!(err, AvatarError::AssetLoad { .. }));
    assert_eq!(loader.decode_count(), 0);

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn memory_loader_serves_registered_paths() {
    let img = LayerImage {
        pixels: image::RgbaImage::from_pixel(1, 1, image::Rgba([5, 5, 5, 255])),
    };
    let loader = MemoryImageLoader::new().with("face/a.png", img);
    assert!(loader.load(&AssetPath::new("face/a.png").unwrap()).is_ok());
    assert!(loader.load(&AssetPath::new("face/b.png").unwrap()).is_err());
    assert_eq!(loader.load_count(), 2);
}
