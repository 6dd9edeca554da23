use ocrdrop_core::{estimate_remaining, format_elapsed, JobStats};

#[test]
fn elapsed_is_minutes_and_seconds() {
    assert_eq!(format_elapsed(0.0), "00:00");
    assert_eq!(format_elapsed(65.9), "01:05");
    assert_eq!(format_elapsed(3600.0), "60:00");
}

#[test]
fn remaining_time_buckets() {
    assert_eq!(estimate_remaining(0, 4, 10.0), "Calculating...");
    assert_eq!(estimate_remaining(1, 2, 30.0), "Less than a minute");
    assert_eq!(estimate_remaining(1, 2, 60.0), "About 1 minute");
    assert_eq!(estimate_remaining(1, 11, 300.0), "About 50 minutes");
    assert_eq!(estimate_remaining(1, 2, 3600.0), "About 1 hour");
    assert_eq!(estimate_remaining(1, 3, 5400.0), "About 3 hours");
    assert_eq!(estimate_remaining(2, 3, 9000.0), "About 1 hour and 15 minutes");
}

#[test]
fn worker_count_falls_back_to_file_estimate() {
    let reported = JobStats {
        cpu_cores: Some(8),
        total_files: Some(2),
        ..JobStats::default()
    };
    assert_eq!(reported.worker_count(), 8);

    let few = JobStats {
        total_files: Some(2),
        ..JobStats::default()
    };
    assert_eq!(few.worker_count(), 2);

    let many = JobStats {
        total_files: Some(12),
        ..JobStats::default()
    };
    assert_eq!(many.worker_count(), 4);

    assert_eq!(JobStats::default().worker_count(), 1);
}
