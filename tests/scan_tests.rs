use std::fs;
use std::path::Path;

use carousel_showcase::scan::{resolve, ImageSource, ManifestSource, PatternSource};
use tempfile::tempdir;

fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), b"x").unwrap();
}

fn names(dir: &Path, prefix: &str, max: usize) -> Vec<String> {
    resolve(dir, prefix, max)
        .into_iter()
        .map(|a| a.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn numbered_files_come_first_in_numeric_order() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for name in ["empresa10.jpg", "empresa2.png", "empresa1.jpg", "empresa_site.jpg"] {
        touch(root, name);
    }
    assert_eq!(
        names(root, "empresa", 24),
        vec!["empresa1.jpg", "empresa2.png", "empresa10.jpg", "empresa_site.jpg"]
    );
}

#[test]
fn extension_priority_breaks_number_ties() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for name in ["thumb1.png", "thumb1.jpeg", "thumb1.jpg"] {
        touch(root, name);
    }
    assert_eq!(
        names(root, "thumb", 24),
        vec!["thumb1.jpg", "thumb1.jpeg", "thumb1.png"]
    );
}

#[test]
fn wildcard_matches_are_lexicographic() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for name in ["pthumb_zeta.png", "pthumb-alpha.jpg", "pthumb_beta.JPG"] {
        touch(root, name);
    }
    assert_eq!(
        names(root, "pthumb", 24),
        vec!["pthumb-alpha.jpg", "pthumb_beta.JPG", "pthumb_zeta.png"]
    );
}

#[test]
fn empty_and_foreign_files_are_skipped() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    touch(root, "empresa1.jpg");
    fs::write(root.join("empresa2.jpg"), b"").unwrap();
    touch(root, "empresa3.gif");
    touch(root, "other1.jpg");
    fs::create_dir(root.join("empresa4.jpg")).unwrap();
    assert_eq!(names(root, "empresa", 24), vec!["empresa1.jpg"]);
}

#[test]
fn result_is_truncated_to_max_count() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for i in 1..=5 {
        touch(root, &format!("empresa{i}.jpg"));
    }
    touch(root, "empresa_extra.jpg");
    assert_eq!(
        names(root, "empresa", 3),
        vec!["empresa1.jpg", "empresa2.jpg", "empresa3.jpg"]
    );
}

#[test]
fn missing_directory_yields_nothing() {
    let tmp = tempdir().unwrap();
    assert!(resolve(&tmp.path().join("nope"), "empresa", 3).is_empty());
}

#[test]
fn subdirectories_are_not_scanned() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::create_dir(root.join("nested")).unwrap();
    touch(&root.join("nested"), "empresa1.jpg");
    assert!(names(root, "empresa", 3).is_empty());
}

#[test]
fn pattern_source_delegates_to_resolve() {
    let tmp = tempdir().unwrap();
    touch(tmp.path(), "thumb1.jpg");
    let source = PatternSource::new(tmp.path(), "thumb", 2);
    let listed = source.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].stem, "thumb1");
}

#[test]
fn manifest_source_resolves_relative_entries() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    touch(root, "b.png");
    touch(root, "a.jpg");
    fs::write(root.join("empty.jpg"), b"").unwrap();
    fs::write(
        root.join("manifest.json"),
        r#"["b.png", "missing.jpg", "empty.jpg", "a.jpg", "b.png"]"#,
    )
    .unwrap();
    let source = ManifestSource {
        manifest: root.join("manifest.json"),
        max_count: 10,
    };
    let stems: Vec<String> = source.list().into_iter().map(|a| a.stem).collect();
    assert_eq!(stems, vec!["b", "a"]);
}

#[test]
fn malformed_manifest_yields_nothing() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("manifest.json"), "{not json").unwrap();
    let source = ManifestSource {
        manifest: tmp.path().join("manifest.json"),
        max_count: 10,
    };
    assert!(source.list().is_empty());
}
