use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use bimorph_config::{MoveRow, load_move_request_csv};
use rstest::rstest;
use tempfile::{TempDir, tempdir};

fn write_csv(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("request.csv");
    let mut f = File::create(&path).unwrap();
    write!(f, "{body}").unwrap();
    path
}

#[rstest]
fn loads_rows_in_file_order() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "channel,target\n13,350.0\n12, 350.5\n");
    let rows = load_move_request_csv(&path).unwrap();
    assert_eq!(
        rows,
        vec![
            MoveRow {
                channel: 13,
                target: 350.0
            },
            MoveRow {
                channel: 12,
                target: 350.5
            },
        ]
    );
}

#[rstest]
#[case("chan,volts\n1,2.0\n", "headers 'channel,target'")]
#[case("channel,target\n32,10.0\n", "out of range")]
#[case("channel,target\n4,10.0\n4,20.0\n", "duplicate channel 4")]
#[case("channel,target\n4,abc\n", "invalid csv row 2")]
#[case("channel,target\n4,NaN\n", "must be finite")]
#[case("channel,target\n", "no rows")]
fn rejects_bad_files(#[case] body: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, body);
    let err = load_move_request_csv(&path).expect_err("bad CSV must be rejected");
    assert!(
        format!("{err}").to_lowercase().contains(&needle.to_lowercase()),
        "error {err} does not mention {needle}"
    );
}

#[rstest]
fn missing_file_reports_path() {
    let dir = tempdir().unwrap();
    let err = load_move_request_csv(&dir.path().join("nope.csv")).expect_err("missing file");
    assert!(format!("{err}").contains("nope.csv"));
}
