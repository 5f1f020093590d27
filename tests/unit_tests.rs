use clap::Parser;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use yolo_dataset_tool::{
    create_dataset_yaml, partition, process_dataset, scan_pairs, split_counts, Cli, Command,
    DatasetError, MaterializeOptions, RunOutcome, SplitCounts, SplitJob, SplitRatios,
};

fn touch(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for name in names {
        fs::write(dir.join(name), name.as_bytes()).unwrap();
    }
}

fn write_classes(dir: &Path) -> PathBuf {
    let path = dir.join("classification.txt");
    fs::write(&path, "zebra_crossing\n\n  red_light  \ngreen_light\n").unwrap();
    path
}

#[test]
fn test_scan_reports_pairs_and_orphans() {
    let temp_dir = tempfile::tempdir().unwrap();
    touch(temp_dir.path(), &["a.jpg", "a.txt", "b.png", "b.txt", "c.jpg"]);

    let scan = scan_pairs(temp_dir.path()).unwrap();

    let names: Vec<_> = scan.pairs.iter().map(|p| p.base_name()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(scan.unmatched.images, vec![temp_dir.path().join("c.jpg")]);
    assert!(scan.unmatched.labels.is_empty());
}

#[test]
fn test_scan_counts_match_shared_base_names() {
    let temp_dir = tempfile::tempdir().unwrap();
    // 6 images, 5 labels, 4 shared base names
    touch(
        temp_dir.path(),
        &[
            "1.jpg", "2.jpg", "3.png", "4.bmp", "5.tif", "6.jpeg", "1.txt", "2.txt", "3.txt",
            "4.txt", "9.txt",
        ],
    );

    let scan = scan_pairs(temp_dir.path()).unwrap();

    assert_eq!(scan.pairs.len(), 4);
    assert_eq!(scan.unmatched.images.len(), 2);
    assert_eq!(scan.unmatched.labels.len(), 1);
}

#[test]
fn test_scan_missing_source_is_not_found() {
    let temp_dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        scan_pairs(&temp_dir.path().join("missing")),
        Err(DatasetError::NotFound { .. })
    ));
}

#[test]
fn test_partition_ten_pairs() {
    let temp_dir = tempfile::tempdir().unwrap();
    let names: Vec<String> = (0..10)
        .flat_map(|i| [format!("{}.jpg", i), format!("{}.txt", i)])
        .collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    touch(temp_dir.path(), &names);

    let pairs = scan_pairs(temp_dir.path()).unwrap().pairs;
    let ratios = SplitRatios::new(0.7, 0.15, 0.15).unwrap();
    let assignment = partition(pairs.clone(), &ratios, Some(42)).unwrap();

    assert_eq!(
        assignment.counts(),
        SplitCounts {
            train: 7,
            val: 1,
            test: 2
        }
    );
    let all: HashSet<_> = assignment.iter().map(|(_, p)| p.clone()).collect();
    assert_eq!(all, pairs.iter().cloned().collect::<HashSet<_>>());

    let again = partition(pairs, &ratios, Some(42)).unwrap();
    assert_eq!(assignment, again);
}

#[test]
fn test_split_counts_boundaries() {
    let all_train = SplitRatios::new(1.0, 0.0, 0.0).unwrap();
    assert_eq!(
        split_counts(5, &all_train),
        SplitCounts {
            train: 5,
            val: 0,
            test: 0
        }
    );

    let ratios = SplitRatios::new(0.7, 0.2, 0.1).unwrap();
    assert_eq!(split_counts(1, &ratios).total(), 1);
}

#[test]
fn test_invalid_ratios_are_rejected_before_any_output() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("mixed");
    touch(&source, &["a.jpg", "a.txt", "b.jpg", "b.txt"]);
    let output = temp_dir.path().join("dataset");
    let classes = write_classes(temp_dir.path());

    let cli = Cli::try_parse_from([
        OsStr::new("yolo-dataset-tool"),
        OsStr::new("split"),
        OsStr::new("--source"),
        source.as_os_str(),
        OsStr::new("--output"),
        output.as_os_str(),
        OsStr::new("--classes"),
        classes.as_os_str(),
        OsStr::new("--train-ratio"),
        OsStr::new("0.7"),
        OsStr::new("--val-ratio"),
        OsStr::new("0.2"),
        OsStr::new("--test-ratio"),
        OsStr::new("0.2"),
    ])
    .unwrap();
    let Command::Split(args) = cli.command else {
        panic!("expected the split command");
    };

    assert!(matches!(args.into_job(), Err(DatasetError::InvalidRatio(_))));
    assert!(!output.exists());
    assert_eq!(fs::read_dir(&source).unwrap().count(), 4);
}

#[test]
fn test_split_pipeline_layout_and_descriptor() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("mixed");
    let names: Vec<String> = (0..20)
        .flat_map(|i| [format!("frame_{:03}.png", i), format!("frame_{:03}.txt", i)])
        .collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    touch(&source, &names);
    touch(&source, &["orphan.jpg", "stray.txt"]);
    let output = temp_dir.path().join("dataset");

    let job = SplitJob {
        source: source.clone(),
        label_dir: None,
        output: output.clone(),
        class_file: write_classes(temp_dir.path()),
        ratios: SplitRatios::new(0.7, 0.2, 0.1).unwrap(),
        seed: Some(2024),
        materialize: MaterializeOptions {
            jobs: Some(3),
            ..Default::default()
        },
    };

    let calls = AtomicUsize::new(0);
    let summary = process_dataset(&job, &|_, total| {
        assert_eq!(total, 20);
        calls.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 20);
    assert_eq!(summary.matched_pairs, 20);
    assert_eq!(summary.orphan_images, 1);
    assert_eq!(summary.orphan_labels, 1);
    assert_eq!(summary.outcome, RunOutcome::Clean);

    for (split, expected) in [("train", 14), ("val", 4), ("test", 2)] {
        let images: HashSet<String> = fs::read_dir(output.join("images").join(split))
            .unwrap()
            .map(|e| {
                let name = e.unwrap().file_name().to_string_lossy().into_owned();
                name.trim_end_matches(".png").to_string()
            })
            .collect();
        let labels: HashSet<String> = fs::read_dir(output.join("labels").join(split))
            .unwrap()
            .map(|e| {
                let name = e.unwrap().file_name().to_string_lossy().into_owned();
                name.trim_end_matches(".txt").to_string()
            })
            .collect();
        assert_eq!(images.len(), expected, "{} images", split);
        assert_eq!(images, labels, "{} images and labels must pair up", split);
    }

    let yaml = fs::read_to_string(output.join("dataset.yaml")).unwrap();
    assert!(yaml.contains("train: images/train"));
    assert!(yaml.contains("names:\n  0: zebra_crossing\n  1: red_light\n  2: green_light\n"));
    assert!(source.join("frame_000.png").exists(), "copy mode keeps sources");
}

#[test]
fn test_empty_source_creates_no_output() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("empty");
    fs::create_dir_all(&source).unwrap();
    let output = temp_dir.path().join("dataset");

    let job = SplitJob {
        source,
        label_dir: None,
        output: output.clone(),
        class_file: write_classes(temp_dir.path()),
        ratios: SplitRatios::default(),
        seed: None,
        materialize: MaterializeOptions::default(),
    };

    assert!(matches!(
        process_dataset(&job, &|_, _| {}),
        Err(DatasetError::EmptyDataset)
    ));
    assert!(!output.exists());
}

#[test]
fn test_split_with_separate_label_dir() {
    let temp_dir = tempfile::tempdir().unwrap();
    let images = temp_dir.path().join("images_raw");
    let labels = temp_dir.path().join("labels_raw");
    touch(&images, &["a.png", "b.jpg", "c.png"]);
    touch(&labels, &["a.txt", "b.txt", "c.txt"]);
    let output = temp_dir.path().join("dataset");

    let job = SplitJob {
        source: images,
        label_dir: Some(labels),
        output: output.clone(),
        class_file: write_classes(temp_dir.path()),
        ratios: SplitRatios::new(1.0, 0.0, 0.0).unwrap(),
        seed: Some(1),
        materialize: MaterializeOptions::default(),
    };
    let summary = process_dataset(&job, &|_, _| {}).unwrap();

    assert_eq!(summary.split.train, 3);
    assert!(output.join("images/train/b.jpg").exists());
    assert!(output.join("labels/train/b.txt").exists());
    assert_eq!(fs::read_dir(output.join("images/val")).unwrap().count(), 0);
}

#[test]
fn test_descriptor_rewrite_is_byte_identical() {
    let temp_dir = tempfile::tempdir().unwrap();
    let names = vec!["person".to_string(), "car".to_string()];

    let path = create_dataset_yaml(temp_dir.path(), &names).unwrap();
    let first = fs::read(&path).unwrap();
    let path = create_dataset_yaml(temp_dir.path(), &names).unwrap();

    assert_eq!(first, fs::read(&path).unwrap());
}
