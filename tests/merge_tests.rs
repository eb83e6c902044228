//! End-to-end merge tests over files on disk and in-memory sources.


use std::fs;

use logmerge_core::config::{LineEnding, MergeConfig, OutputDestination};
use logmerge_core::id::SourceId;
use logmerge_exec::{Engine, MergeError};
use logmerge_io::SourceLocation;
use test_data_gen::{assert_sorted, reference_line, reference_parser, write_log_files};

fn engine_to(path: &std::path::Path) -> Engine {
    Engine::new(MergeConfig {
        output: OutputDestination::Path(path.to_path_buf()),
        ..Default::default()
    })
    .expect("valid config")
}

fn file_locations(paths: &[std::path::PathBuf]) -> Vec<SourceLocation> {
    paths.iter().cloned().map(SourceLocation::Path).collect()
}

#[tokio::test]
async fn test_ten_files_merge_sorted_and_complete() {
    let dir = tempfile::tempdir().unwrap();
    // 44 lines across ten files, one of them empty.
    let counts = [5, 3, 7, 0, 4, 6, 2, 8, 5, 4];
    let inputs = write_log_files(dir.path(), &counts);
    let out = dir.path().join("output/merged.log");

    let report = engine_to(&out).merge(file_locations(&inputs)).await.unwrap();

    let merged = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = merged.lines().collect();
    assert_eq!(lines.len(), 44);
    assert_eq!(report.lines_written, 44);
    assert_sorted(&lines, &reference_parser());

    // Every input line appears exactly once.
    let mut expected: Vec<String> = inputs
        .iter()
        .flat_map(|p| fs::read_to_string(p).unwrap().lines().map(str::to_string).collect::<Vec<_>>())
        .collect();
    let mut actual: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
    expected.sort();
    actual.sort();
    assert_eq!(expected, actual);

    for (summary, &count) in report.sources.iter().zip(counts.iter()) {
        assert_eq!(summary.lines, count as u64);
    }
}

#[tokio::test]
async fn test_output_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_log_files(dir.path(), &[6, 6, 6, 6]);
    let out_a = dir.path().join("a.log");
    let out_b = dir.path().join("b.log");

    let a = engine_to(&out_a).merge(file_locations(&inputs)).await.unwrap();
    let b = engine_to(&out_b).merge(file_locations(&inputs)).await.unwrap();

    assert_eq!(fs::read(&out_a).unwrap(), fs::read(&out_b).unwrap());
    assert_eq!(a.output_digest, b.output_digest);
    assert!(a.output_digest.is_some());
}

#[tokio::test]
async fn test_equal_timestamps_break_ties_by_source_index() {
    let ts = reference_line(10, "");
    let ts = ts.trim_end();
    let inputs = vec![
        SourceLocation::from_lines("1.log", &[format!("{ts} from-0")]),
        SourceLocation::from_lines("2.log", &[format!("{ts} from-1")]),
        SourceLocation::from_lines("3.log", &[format!("{ts} from-2")]),
    ];
    // Reverse the list: source index, not name, decides.
    let inputs: Vec<SourceLocation> = inputs.into_iter().rev().collect();

    let engine = Engine::new(MergeConfig::default()).unwrap();
    let (_, out) = engine.merge_into(inputs, Vec::new()).await.unwrap();
    let text = String::from_utf8(out).unwrap();
    let tags: Vec<&str> = text.lines().map(|l| &l[33..]).collect();
    assert_eq!(tags, vec!["from-2", "from-1", "from-0"]);
}

#[tokio::test]
async fn test_reference_scenario_order() {
    let engine = Engine::new(MergeConfig {
        timestamp_prefix_len: 19,
        ..Default::default()
    })
    .unwrap();
    let inputs = vec![
        SourceLocation::from_lines("a", &["2024-01-01T00:00:02 A", "2024-01-01T00:00:05 A2"]),
        SourceLocation::from_lines("b", &["2024-01-01T00:00:01 B"]),
        SourceLocation::from_lines("c", &["2024-01-01T00:00:03 C"]),
    ];
    let (report, out) = engine.merge_into(inputs, Vec::new()).await.unwrap();
    let text = String::from_utf8(out).unwrap();
    let tags: Vec<&str> = text.lines().map(|l| &l[20..]).collect();
    assert_eq!(tags, vec!["B", "A", "C", "A2"]);
    assert!(report.max_frontier_size <= 3);
}

#[tokio::test]
async fn test_reference_scenario_with_default_width() {
    // Timestamps narrower than the default prefix, followed by message text.
    let engine = Engine::new(MergeConfig::default()).unwrap();
    let inputs = vec![
        SourceLocation::from_lines("a", &["2024-01-01T00:00:02 A", "2024-01-01T00:00:05 A2"]),
        SourceLocation::from_lines("b", &["2024-01-01T00:00:01 B"]),
        SourceLocation::from_lines("c", &["2024-01-01T00:00:03 C"]),
    ];
    let (_, out) = engine.merge_into(inputs, Vec::new()).await.unwrap();
    let text = String::from_utf8(out).unwrap();
    let tags: Vec<&str> = text.lines().map(|l| &l[20..]).collect();
    assert_eq!(tags, vec!["B", "A", "C", "A2"]);
}

#[tokio::test]
async fn test_frontier_never_exceeds_source_count() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_log_files(dir.path(), &[200, 150, 1, 0, 90]);
    let out = dir.path().join("merged.log");
    let report = engine_to(&out).merge(file_locations(&inputs)).await.unwrap();
    assert_eq!(report.lines_written, 441);
    assert!(report.max_frontier_size <= inputs.len());
    // Four non-empty sources must all be buffered before the first write.
    assert_eq!(report.max_frontier_size, 4);
}

#[tokio::test]
async fn test_only_empty_sources_produce_empty_output() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_log_files(dir.path(), &[0, 0, 0]);
    let out = dir.path().join("merged.log");
    let report = engine_to(&out).merge(file_locations(&inputs)).await.unwrap();
    assert_eq!(report.lines_written, 0);
    assert_eq!(fs::read_to_string(&out).unwrap(), "");
}

#[tokio::test]
async fn test_crlf_input_and_output() {
    let engine = Engine::new(MergeConfig {
        timestamp_prefix_len: 19,
        line_ending: LineEnding::Crlf,
        ..Default::default()
    })
    .unwrap();
    let inputs = vec![
        SourceLocation::memory("w", b"2024-01-01T00:00:02 w\r\n".to_vec()),
        SourceLocation::memory("u", b"2024-01-01T00:00:01 u\n2024-01-01T00:00:03 u".to_vec()),
    ];
    let (_, out) = engine.merge_into(inputs, Vec::new()).await.unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "2024-01-01T00:00:01 u\r\n2024-01-01T00:00:02 w\r\n2024-01-01T00:00:03 u\r\n"
    );
}

#[tokio::test]
async fn test_missing_input_aborts_merge() {
    let dir = tempfile::tempdir().unwrap();
    let mut inputs = write_log_files(dir.path(), &[3, 3]);
    inputs.push(dir.path().join("absent.log"));
    let out = dir.path().join("merged.log");

    let err = engine_to(&out).merge(file_locations(&inputs)).await.unwrap_err();
    match err {
        MergeError::SourceRead { source_id, name, .. } => {
            assert_eq!(source_id, SourceId::new(2));
            assert!(name.ends_with("absent.log"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_bad_timestamp_is_fatal() {
    let engine = Engine::new(MergeConfig::default()).unwrap();
    let inputs = vec![
        SourceLocation::from_lines("ok", &[reference_line(1, "fine")]),
        SourceLocation::from_lines("bad", &["this line has no timestamp at all".to_string()]),
    ];
    let err = engine.merge_into(inputs, Vec::new()).await.unwrap_err();
    assert!(matches!(
        err,
        MergeError::TimestampParse { source_id, line_no: 1, .. } if source_id == SourceId::new(1)
    ));
}

#[tokio::test]
async fn test_expected_source_count_mismatch() {
    let engine = Engine::new(MergeConfig {
        source_count: Some(10),
        ..Default::default()
    })
    .unwrap();
    let err = engine
        .merge_into(vec![SourceLocation::from_lines("1", &[reference_line(0, "x")])], Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, MergeError::SourceCountMismatch { expected: 10, actual: 1 }));
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let engine = Engine::new(MergeConfig::default()).unwrap();
    let inputs = vec![SourceLocation::from_lines("1.log", &[reference_line(5, "x")])];
    let (report, _) = engine.merge_into(inputs, Vec::new()).await.unwrap();
    let json = report.to_json_pretty().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["lines_written"], 1);
    assert_eq!(value["sources"][0]["name"], "1.log");
}
