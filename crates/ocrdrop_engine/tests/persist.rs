use std::fs;
use std::io::Write;

use ocrdrop_engine::{archive_file_name, ensure_output_dir, AtomicFileWriter, StagedFile};
use tempfile::TempDir;

#[test]
fn creates_missing_download_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("downloads");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

fn stage(writer: &AtomicFileWriter, name: &str, contents: &[u8]) -> StagedFile {
    let staged = writer.begin(name).unwrap();
    let mut handle = staged.handle().unwrap();
    handle.write_all(contents).unwrap();
    staged
}

#[test]
fn commit_replaces_existing_archive() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = stage(&writer, "out.zip", b"one").commit().unwrap();
    assert_eq!(first.file_name().unwrap(), "out.zip");
    assert_eq!(fs::read(&first).unwrap(), b"one");

    let second = stage(&writer, "out.zip", b"two").commit().unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"two");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn target_is_hidden_until_commit() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let staged = stage(&writer, "out.zip", b"partial");
    assert_eq!(staged.target(), temp.path().join("out.zip"));
    assert!(!staged.target().exists());

    let saved = staged.commit().unwrap();
    assert_eq!(fs::read(saved).unwrap(), b"partial");
}

#[test]
fn dropped_stage_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    drop(stage(&writer, "out.zip", b"interrupted"));
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn no_partial_file_when_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.begin("out.zip").is_err());
    assert!(!file_path.with_file_name("out.zip").exists());
}

#[test]
fn archive_names_follow_the_url() {
    assert_eq!(archive_file_name("/download/abc"), "processed_files_abc.zip");
    assert_eq!(archive_file_name("/files/result.zip?x=1"), "result.zip");
    assert_eq!(archive_file_name("/download/"), "processed_files.zip");
    assert_eq!(archive_file_name("/download/a b"), "processed_files_a_b.zip");
    assert_eq!(
        archive_file_name("demo://processed_files_demo-1.zip"),
        "processed_files_demo-1.zip"
    );
}
