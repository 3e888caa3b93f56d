use assert_cmd::cargo::cargo_bin_cmd;
use lopdf::{dictionary, Object};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

fn write_pdf(dir: &Path, name: &str, pages: &[(i64, i64)]) -> PathBuf {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = pages
        .iter()
        .map(|&(width, height)| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).expect("fixture should be written");
    path
}

fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.json");
    let json = r#"{ "dpi_x": 72.0, "dpi_y": 72.0, "viewport_width": 100, "viewport_height": 80 }"#;
    fs::write(&path, json).expect("config should be written");
    path
}

fn stdout_lines(output: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(output).lines().map(ToOwned::to_owned).collect()
}

#[test]
fn info_emits_page_geometry() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "two.pdf", &[(612, 792), (300, 400)]);

    let output = cargo_bin_cmd!("leafview")
        .arg("info")
        .arg(&pdf)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(value["page_count"], 2);
    assert_eq!(value["pages"][0]["media_width_pt"], 612.0);
    assert_eq!(value["pages"][1]["page"], 2);
    assert_eq!(value["pages"][1]["crop_height_pt"], 400.0);
    assert_eq!(value["pages"][1]["rotation"], 0);
}

#[test]
fn info_fails_for_missing_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    cargo_bin_cmd!("leafview")
        .arg("info")
        .arg(temp.path().join("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let path = temp.path().join("invalid.pdf");
    fs::write(&path, b"this is not a pdf").expect("fixture should be written");

    cargo_bin_cmd!("leafview")
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open PDF"));
}

#[test]
fn info_fails_for_encrypted_marker_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let path = write_pdf(temp.path(), "encrypted.pdf", &[(612, 792)]);
    let mut bytes = fs::read(&path).expect("fixture should be readable");
    bytes.extend_from_slice(b"\n% /Encrypt\n");
    fs::write(&path, bytes).expect("fixture should be written");

    cargo_bin_cmd!("leafview")
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("encrypted PDFs are not supported"));
}

#[test]
fn render_writes_viewport_sized_png() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "letter.pdf", &[(612, 792)]);
    let config = write_config(temp.path());
    let output_path = temp.path().join("out/frame.png");

    cargo_bin_cmd!("leafview")
        .arg("--config")
        .arg(&config)
        .arg("render")
        .arg(&pdf)
        .arg("--zoom")
        .arg("1")
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("rebuilt"));

    let image = image::open(&output_path).expect("frame should be a readable image").to_rgba8();
    assert_eq!(image.dimensions(), (100, 80));
    assert_eq!(image.get_pixel(0, 0).0, [200, 200, 200, 255]);
    assert_eq!(image.get_pixel(50, 40).0, [255, 255, 255, 255]);
}

#[test]
fn render_slices_when_cache_budget_is_too_small() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "letter.pdf", &[(612, 792)]);
    let config = write_config(temp.path());
    let output_path = temp.path().join("frame.png");

    cargo_bin_cmd!("leafview")
        .arg("render")
        .arg(&pdf)
        .arg("--config")
        .arg(&config)
        .arg("--zoom")
        .arg("1")
        .arg("--offset")
        .arg("100,100")
        .arg("--viewport")
        .arg("64x64")
        .arg("--budget")
        .arg("1024")
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("sliced"));

    let image = image::open(&output_path).expect("frame should be a readable image").to_rgba8();
    assert_eq!(image.dimensions(), (64, 64));
    assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
}

#[test]
fn render_rejects_page_past_end() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "two.pdf", &[(612, 792), (612, 792)]);
    let config = write_config(temp.path());

    cargo_bin_cmd!("leafview")
        .arg("--config")
        .arg(&config)
        .arg("render")
        .arg(&pdf)
        .arg("--page")
        .arg("3")
        .arg("--output")
        .arg(temp.path().join("frame.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("page 3 out of range (page_count=2)"));
}

#[test]
fn view_prints_label_after_each_command_and_resumes() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "five.pdf", &[(612, 792); 5]);
    let state = temp.path().join("state");

    let output = cargo_bin_cmd!("leafview")
        .arg("view")
        .arg(&pdf)
        .arg("--state-dir")
        .arg(&state)
        .arg("--commands")
        .arg("next; next; goto 5; zoom 0.5")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(stdout_lines(&output), ["1/5", "2/5", "3/5", "5/5", "5/5"]);
    assert!(state.join("views.json").exists());

    let output = cargo_bin_cmd!("leafview")
        .arg("view")
        .arg(&pdf)
        .arg("--state-dir")
        .arg(&state)
        .arg("--resume")
        .arg("--commands")
        .arg("prev")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(stdout_lines(&output), ["5/5", "4/5"]);
}

#[test]
fn view_rejects_unknown_command() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "one.pdf", &[(612, 792)]);

    cargo_bin_cmd!("leafview")
        .arg("view")
        .arg(&pdf)
        .arg("--state-dir")
        .arg(temp.path().join("state"))
        .arg("--commands")
        .arg("next; explode")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown command: explode"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("leafview")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
