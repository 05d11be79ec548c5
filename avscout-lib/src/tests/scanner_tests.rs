use super::*;

use avscout_core::Classification;
use tempfile::TempDir;

const LARGE: usize = 200;
const SMALL: usize = 10;

fn settings() -> ScannerSettings {
    ScannerSettings {
        minimum_size: 100,
        ..Default::default()
    }
}

/// A temp dir with a fixed-name library folder, so the random temp name never
/// feeds the parent-folder fallback.
fn library() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("library");
    std::fs::create_dir(&root).unwrap();
    (dir, root)
}

fn touch(root: &Path, rel: &str, size: usize) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, vec![0u8; size]).unwrap();
}

fn scan(root: &Path, settings: &ScannerSettings) -> ScanReport {
    Scanner::new(settings).unwrap().scan(root).unwrap()
}

fn names(movie: &Movie) -> Vec<String> {
    movie.files().iter().map(DiscoveredFile::file_name).collect()
}

#[test]
fn zero_based_parts_become_one_movie() {
    let (_dir, root) = library();
    touch(&root, "ABC-123- 2.mp4", LARGE);
    touch(&root, "ABC-123-1.mp4", LARGE);
    touch(&root, "ABC-123-0.mp4", LARGE);

    let report = scan(&root, &settings());
    assert_eq!(report.movies.len(), 1);
    let movie = &report.movies[0];
    assert_eq!(movie.key(), "ABC-123");
    assert_eq!(
        names(movie),
        vec!["ABC-123-0.mp4", "ABC-123-1.mp4", "ABC-123- 2.mp4"]
    );
    assert!(report.is_clean());
}

#[test]
fn cd_parts_with_gap_are_ambiguous() {
    let (_dir, root) = library();
    touch(&root, "ABC-123.CD2.mp4", LARGE);
    touch(&root, "ABC-123.CD4.mp4", LARGE);

    let report = scan(&root, &settings());
    assert!(report.movies.is_empty());
    assert_eq!(report.ambiguous.len(), 1);
    assert_eq!(report.ambiguous[0].key, "ABC-123");
    assert_eq!(
        report.ambiguous[0].reason,
        AmbiguityReason::Slices(SliceError::BadOrigin('2'))
    );
}

#[test]
fn same_id_in_two_folders_is_ambiguous() {
    let (_dir, root) = library();
    touch(&root, "a/ABC-123.mp4", LARGE);
    touch(&root, "b/ABC-123.mp4", LARGE);

    let report = scan(&root, &settings());
    assert!(report.movies.is_empty());
    assert!(matches!(
        &report.ambiguous[0].reason,
        AmbiguityReason::SpansDirectories(dirs) if dirs.len() == 2
    ));

    let text = report.ambiguity_report();
    assert!(text.contains("ABC-123"));
    assert!(text.contains(&Path::new("a").join("ABC-123.mp4").display().to_string()));
}

#[test]
fn duplicate_part_tokens_are_ambiguous() {
    let (_dir, root) = library();
    touch(&root, "ABC-123-A.mp4", LARGE);
    touch(&root, "ABC-123-a.mkv", LARGE);

    let report = scan(&root, &settings());
    assert!(report.movies.is_empty());
    assert_eq!(report.ambiguous.len(), 1);
}

#[test]
fn unidentified_files_are_reported() {
    let (_dir, root) = library();
    touch(&root, "home video.mp4", LARGE);
    touch(&root, "XYZ-001.mp4", LARGE);

    let report = scan(&root, &settings());
    assert_eq!(report.movies.len(), 1);
    assert_eq!(report.unidentified, vec![root.join("home video.mp4")]);
    assert!(report.ambiguity_report().contains("home video.mp4"));
}

#[test]
fn folder_name_identifies_generic_file() {
    let (_dir, root) = library();
    touch(&root, "XYZ-002/movie.mp4", LARGE);

    let report = scan(&root, &settings());
    assert_eq!(report.movies.len(), 1);
    assert_eq!(report.movies[0].key(), "XYZ-002");
}

#[test]
fn filters_extensions_hidden_and_ignored_folders() {
    let (_dir, root) = library();
    touch(&root, "ABC-123.txt", LARGE);
    touch(&root, ".ABC-124.mp4", LARGE);
    touch(&root, ".hidden/XYZ-001.mp4", LARGE);
    touch(&root, "#recycle/XYZ-002.mp4", LARGE);
    touch(&root, "ok/XYZ-003.MKV", LARGE);

    let report = scan(&root, &settings());
    let keys: Vec<&str> = report.movies.iter().map(Movie::key).collect();
    assert_eq!(keys, vec!["XYZ-003"]);
}

#[test]
fn folders_with_nfo_can_be_skipped() {
    let (_dir, root) = library();
    touch(&root, "done/XYZ-003.mp4", LARGE);
    touch(&root, "done/XYZ-003.nfo", SMALL);
    touch(&root, "XYZ-004.mp4", LARGE);

    assert_eq!(scan(&root, &settings()).movies.len(), 2);

    let skipping = ScannerSettings {
        skip_nfo_dir: true,
        ..settings()
    };
    let report = scan(&root, &skipping);
    let keys: Vec<&str> = report.movies.iter().map(Movie::key).collect();
    assert_eq!(keys, vec!["XYZ-004"]);
}

#[test]
fn small_part_joins_a_valid_sequence() {
    let (_dir, root) = library();
    touch(&root, "ABC-123-1.mp4", LARGE);
    touch(&root, "ABC-123-2.mp4", SMALL);

    let report = scan(&root, &settings());
    assert_eq!(report.movies.len(), 1);
    assert_eq!(names(&report.movies[0]), vec!["ABC-123-1.mp4", "ABC-123-2.mp4"]);
    assert!(report.skipped_small.is_empty());
}

#[test]
fn small_file_that_breaks_the_group_is_dropped() {
    let (_dir, root) = library();
    touch(&root, "XYZ-001.mp4", LARGE);
    touch(&root, "XYZ-001-sample.mp4", SMALL);
    touch(&root, "TINY-001.mp4", SMALL);
    touch(&root, "clip.mp4", SMALL);

    let report = scan(&root, &settings());
    assert_eq!(report.movies.len(), 1);
    assert_eq!(names(&report.movies[0]), vec!["XYZ-001.mp4"]);
    assert_eq!(
        report.skipped_small,
        vec![
            root.join("TINY-001.mp4"),
            root.join("XYZ-001-sample.mp4"),
            root.join("clip.mp4"),
        ]
    );
    assert!(report.unidentified.is_empty());
}

#[test]
fn content_id_groups_keep_backup_primary() {
    let (_dir, root) = library();
    touch(&root, "abc00123cd2.mp4", LARGE);
    touch(&root, "abc00123cd1.mp4", LARGE);

    let report = scan(&root, &settings());
    assert_eq!(report.movies.len(), 1);
    let movie = &report.movies[0];
    assert_eq!(movie.classification(), Classification::Cid);
    assert_eq!(movie.key(), "abc00123");
    assert_eq!(movie.identity().primary_id(), Some("ABC-00123"));
    assert_eq!(names(movie), vec!["abc00123cd1.mp4", "abc00123cd2.mp4"]);
}

#[test]
fn rescanning_is_deterministic() {
    let (_dir, root) = library();
    touch(&root, "b/FC2-PPV-123456.mp4", LARGE);
    touch(&root, "a/ABC-123-1.mp4", LARGE);
    touch(&root, "a/ABC-123-2.mp4", LARGE);
    touch(&root, "c/my clip.mp4", LARGE);

    let first = scan(&root, &settings());
    let second = scan(&root, &settings());
    assert_eq!(first.movies, second.movies);
    assert_eq!(first.unidentified, second.unidentified);
    let keys: Vec<&str> = first.movies.iter().map(Movie::key).collect();
    assert_eq!(keys, vec!["ABC-123", "FC2-123456"]);
}

#[test]
fn missing_root_is_an_error() {
    let (_dir, root) = library();
    let err = Scanner::new(&settings())
        .unwrap()
        .scan(&root.join("nope"))
        .unwrap_err();
    assert!(matches!(err, ScanError::MissingRoot(_)));
}

#[test]
fn invalid_folder_pattern_is_an_error() {
    let bad = ScannerSettings {
        ignored_folders: vec!["[".into()],
        ..settings()
    };
    assert!(matches!(
        Scanner::new(&bad),
        Err(ScanError::InvalidFolderPattern { .. })
    ));
}
