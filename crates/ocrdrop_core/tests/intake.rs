use ocrdrop_core::{FileIntake, IntakeError, PendingFile, PDF_MIME, SIZE_CAP_BYTES};
use pretty_assertions::assert_eq;

const MB: u64 = 1024 * 1024;

fn pdf(name: &str, size: u64) -> PendingFile {
    PendingFile::new(name, size, PDF_MIME, format!("/scans/{name}"))
}

fn names(intake: &FileIntake) -> Vec<&str> {
    intake.files().iter().map(|f| f.name.as_str()).collect()
}

#[test]
fn non_pdf_files_are_skipped_with_a_warning() {
    let mut intake = FileIntake::new();
    let report = intake.add_files(vec![
        pdf("a.pdf", 10),
        PendingFile::new("notes.txt", 5, "text/plain", "/scans/notes.txt"),
        pdf("b.pdf", 20),
    ]);

    assert_eq!(names(&intake), vec!["a.pdf", "b.pdf"]);
    assert_eq!(intake.total_bytes(), 30);
    assert_eq!(report.added, 2);
    assert_eq!(report.skipped_non_pdf, 1);
    assert_eq!(
        report.warnings(),
        vec!["Some files were skipped because they are not PDFs.".to_string()]
    );
}

#[test]
fn cap_truncates_in_selection_order() {
    let mut intake = FileIntake::with_cap(100);
    intake.add_files(vec![pdf("first.pdf", 40)]);
    let report = intake.add_files(vec![
        pdf("second.pdf", 30),
        pdf("third.pdf", 50),
        pdf("fourth.pdf", 1),
    ]);

    assert_eq!(names(&intake), vec!["first.pdf", "second.pdf"]);
    assert_eq!(report.added, 1);
    assert_eq!(report.skipped_over_cap, 2);
    assert_eq!(report.attempted_total_bytes, 121);
    assert!(intake.total_bytes() <= intake.cap_bytes());
}

#[test]
fn cap_is_never_exceeded_across_many_batches() {
    let mut intake = FileIntake::with_cap(1_000);
    let sizes = [120_u64, 333, 7, 999, 250, 1, 64, 500, 2, 90];
    for (round, chunk) in sizes.chunks(3).enumerate() {
        let batch = chunk
            .iter()
            .enumerate()
            .map(|(i, size)| pdf(&format!("r{round}-{i}.pdf"), *size))
            .collect();
        intake.add_files(batch);
        assert!(intake.total_bytes() <= 1_000);
    }
    assert_eq!(names(&intake), vec!["r0-0.pdf", "r0-1.pdf", "r0-2.pdf", "r2-0.pdf", "r3-0.pdf"]);
}

#[test]
fn two_gigabyte_batch_is_truncated_locally() {
    let mut intake = FileIntake::new();
    let report = intake.add_files(vec![
        pdf("one.pdf", 700 * MB),
        pdf("two.pdf", 700 * MB),
        pdf("three.pdf", 648 * MB),
    ]);

    assert_eq!(SIZE_CAP_BYTES, 1536 * MB);
    assert_eq!(names(&intake), vec!["one.pdf", "two.pdf"]);
    assert_eq!(report.skipped_over_cap, 1);
    assert_eq!(
        report.warnings(),
        vec!["Total file size exceeds the 1.5GB limit. Current total: 2.00GB".to_string()]
    );
}

#[test]
fn remove_file_drops_exactly_that_index() {
    let mut intake = FileIntake::new();
    intake.add_files(vec![pdf("a.pdf", 1), pdf("b.pdf", 2), pdf("c.pdf", 3)]);

    let removed = intake.remove_file(1).expect("index 1 exists");
    assert_eq!(removed.name, "b.pdf");
    assert_eq!(names(&intake), vec!["a.pdf", "c.pdf"]);
    assert_eq!(intake.total_bytes(), 4);
}

#[test]
fn remove_file_out_of_range_is_an_error_and_changes_nothing() {
    let mut intake = FileIntake::new();
    intake.add_files(vec![pdf("a.pdf", 1)]);

    let err = intake.remove_file(3).unwrap_err();
    assert_eq!(err, IntakeError::IndexOutOfRange { index: 3, len: 1 });
    assert_eq!(names(&intake), vec!["a.pdf"]);
}

#[test]
fn oversized_first_candidate_adds_nothing() {
    let mut intake = FileIntake::with_cap(100);
    let report = intake.add_files(vec![pdf("big.pdf", 101), pdf("small.pdf", 1)]);
    assert_eq!(report.added, 0);
    assert_eq!(report.skipped_over_cap, 2);
    assert!(intake.is_empty());
}

#[test]
fn file_sizes_format_like_the_upload_list() {
    use ocrdrop_core::format_file_size;
    assert_eq!(format_file_size(512), "512 bytes");
    assert_eq!(format_file_size(1536), "1.5 KB");
    assert_eq!(format_file_size(5 * MB), "5.0 MB");
}

#[test]
fn huge_reported_sizes_saturate_instead_of_overflowing() {
    let mut intake = FileIntake::new();
    let half = u64::MAX / 2 + 1;
    let report = intake.add_files(vec![pdf("sparse-a.pdf", half), pdf("sparse-b.pdf", half)]);
    assert_eq!(report.added, 0);
    assert_eq!(report.skipped_over_cap, 2);
    assert_eq!(report.attempted_total_bytes, u64::MAX);
    assert!(intake.is_empty());
    assert_eq!(report.warnings().len(), 1);
}
