//! Runs the acquirer and whole cycles against shell-script stand-ins for
//! `sar` and `sadf`.
#![cfg(unix)]

mod common;

use common::{captured_paths, write_scripts};
use sar_statsd::{AcquireError, EmitSummary, GaugeEmitter, ReportAcquirer, run_cycle};
use std::{
    collections::BTreeSet,
    net::{Ipv4Addr, UdpSocket},
    path::PathBuf,
    sync::{Arc, LazyLock},
    time::Duration,
};
use tempfile::TempDir;

const SAR_RECORD: &str = r#"#!/bin/sh
[ "$1" = 1 ] && [ "$2" = 1 ] && [ "$3" = -A ] && [ "$4" = -o ] || exit 4
echo "$5" >> "$0.path"
printf 'captured' > "$5"
"#;

const SAR_SLOW: &str = r#"#!/bin/sh
echo "$5" >> "$0.path"
sleep 0.3
printf 'captured' > "$5"
"#;

const SAR_FAIL: &str = r#"#!/bin/sh
echo "$5" >> "$0.path"
echo "cannot open /proc" >&2
exit 2
"#;

const SADF_REPORT: &str = r#"#!/bin/sh
[ "$1" = 1 ] && [ "$2" = 1 ] && [ "$3" = -- ] && [ "$4" = -A ] || exit 4
[ -s "$5" ] || exit 5
printf '# hostname\tinterval\ttimestamp\tdevice\tfield\tvalue\n'
printf 'host\t1\t2024-05-01 10:00:01 UTC\tall\t%%usr\t2.50\n'
printf 'host\t1\t2024-05-01 10:00:01 UTC\tcpu0\t%%usr\t3.00\n'
printf 'host\t1\t2024-05-01 10:00:01 UTC\t-\tkbmemfree\t100\n'
printf 'host\t1\t2024-05-01 10:00:01 UTC\teth0\trxkB/s\t10\n'
"#;

const SADF_FAIL: &str = r#"#!/bin/sh
printf 'host\t1\tts\t-\tkbmemfree\t100\n'
exit 1
"#;

const SADF_MANGLED: &str = r#"#!/bin/sh
printf 'host\t1\tts\t-\tkbmemfree\t100\n'
printf 'host\t1\tts\t/mnt/\377x\tMBfsfree\t7\n'
"#;

const SADF_RAGGED: &str = r#"#!/bin/sh
printf 'host\t1\tts\t-\tkbmemfree\t100\n'
printf 'host\t1\tts\t-\tkbmemused\n'
"#;

static SCRIPTS: LazyLock<TempDir> = LazyLock::new(|| {
    write_scripts(&[
        ("sar-success", SAR_RECORD),
        ("sar-formatter-fails", SAR_RECORD),
        ("sar-ragged", SAR_RECORD),
        ("sar-mangled", SAR_RECORD),
        ("sar-cycle", SAR_RECORD),
        ("sar-ragged-cycle", SAR_RECORD),
        ("sar-overlap", SAR_SLOW),
        ("sar-fail", SAR_FAIL),
        ("sadf-report", SADF_REPORT),
        ("sadf-fail", SADF_FAIL),
        ("sadf-mangled", SADF_MANGLED),
        ("sadf-ragged", SADF_RAGGED),
    ])
});

fn script(name: &str) -> PathBuf {
    SCRIPTS.path().join(name)
}

fn acquirer(sar: &str, sadf: &str) -> ReportAcquirer {
    ReportAcquirer::new(script(sar), script(sadf))
}

#[tokio::test]
async fn acquires_records_and_removes_window() {
    let records = acquirer("sar-success", "sadf-report")
        .acquire_records()
        .await
        .unwrap();

    assert_eq!(records.len(), 5);
    assert_eq!(records[3].field(4), Some("kbmemfree"));

    let paths = captured_paths(&script("sar-success"));
    assert_eq!(paths.len(), 1);
    assert!(!paths[0].exists());
}

#[tokio::test]
async fn sampler_failure_abandons_cycle() {
    let err = acquirer("sar-fail", "sadf-report")
        .acquire_records()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AcquireError::Exit { ref status, .. } if status.code() == Some(2)
    ));
    for path in captured_paths(&script("sar-fail")) {
        assert!(!path.exists());
    }
}

#[tokio::test]
async fn missing_sampler_is_a_spawn_error() {
    let err = acquirer("no-such-sar", "sadf-report")
        .acquire_records()
        .await
        .unwrap_err();

    assert!(matches!(err, AcquireError::Spawn { .. }));
}

#[tokio::test]
async fn formatter_failure_abandons_cycle() {
    let err = acquirer("sar-formatter-fails", "sadf-fail")
        .acquire_records()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AcquireError::Exit { ref status, .. } if status.code() == Some(1)
    ));
    let paths = captured_paths(&script("sar-formatter-fails"));
    assert!(!paths[0].exists());
}

#[tokio::test]
async fn ragged_report_abandons_cycle() {
    let err = acquirer("sar-ragged", "sadf-ragged")
        .acquire_records()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AcquireError::RaggedRecord {
            line: 2,
            expected: 6,
            found: 5
        }
    ));
    let paths = captured_paths(&script("sar-ragged"));
    assert!(!paths[0].exists());
}

#[tokio::test]
async fn undecodable_bytes_keep_the_rest_of_the_report() {
    let records = acquirer("sar-mangled", "sadf-mangled")
        .acquire_records()
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].field(4), Some("kbmemfree"));
    assert_eq!(records[1].field(3), Some("/mnt/\u{fffd}x"));
    assert!(!captured_paths(&script("sar-mangled"))[0].exists());
}

#[tokio::test]
async fn overlapping_cycles_use_distinct_windows() {
    let acquirer = acquirer("sar-overlap", "sadf-report");

    let (a, b) = tokio::join!(acquirer.acquire_records(), acquirer.acquire_records());
    assert_eq!(a.unwrap().len(), 5);
    assert_eq!(b.unwrap().len(), 5);

    let paths = captured_paths(&script("sar-overlap"));
    assert_eq!(paths.len(), 2);
    assert_ne!(paths[0], paths[1]);
    assert!(paths.iter().all(|path| !path.exists()));
}

#[tokio::test]
async fn cycle_sends_translated_gauges() {
    let server = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    server
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let emitter = Arc::new(GaugeEmitter::connect(server.local_addr().unwrap(), "sar").unwrap());

    let summary = run_cycle(acquirer("sar-cycle", "sadf-report"), emitter)
        .await
        .unwrap();
    assert_eq!(
        summary,
        EmitSummary {
            emitted: 4,
            skipped: 1
        }
    );

    let mut buf = [0u8; 512];
    let received: BTreeSet<String> = (0..4)
        .map(|_| {
            let n = server.recv(&mut buf).unwrap();
            String::from_utf8(buf[..n].to_vec()).unwrap()
        })
        .collect();
    let expected: BTreeSet<String> = [
        "sar.pct_usr:2.5|g",
        "sar.cpu0.pct_usr:3|g",
        "sar.memfree:102400|g",
        "sar.eth0.rxbit/s:81920|g",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(received, expected);
}

#[tokio::test]
async fn failed_cycle_sends_nothing() {
    let server = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    server
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    let emitter = Arc::new(GaugeEmitter::connect(server.local_addr().unwrap(), "sar").unwrap());

    let result = run_cycle(acquirer("sar-ragged-cycle", "sadf-ragged"), emitter).await;
    assert!(result.is_err());

    let mut buf = [0u8; 512];
    assert!(server.recv(&mut buf).is_err());
}
