use crate::{DecodeFailure, DomainCount, Error, Parser, ParserConfig, Report};
use core::time::Duration;
use std::{
    collections::HashMap,
    io::{self, Cursor, Read, Write},
    path::PathBuf,
    sync::Arc,
    time::Instant,
};
use tokio_util::sync::CancellationToken;

const HEADER: &str = "first_name,last_name,email,gender,ip_address\n";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name)
}

fn parser(worker_count: usize, buffer_size: usize) -> Parser {
    Parser::new(ParserConfig::new(worker_count, buffer_size).unwrap())
}

fn reader(body: &str) -> Cursor<Vec<u8>> {
    Cursor::new(format!("{HEADER}{body}").into_bytes())
}

/// Writes `rows` well-formed rows spread over 37 domains, with every 11th
/// row malformed in one of three ways.
fn generated_input(rows: usize) -> (tempfile::NamedTempFile, Vec<DomainCount>, u64) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let mut expected: HashMap<String, u64> = HashMap::new();
    let mut malformed = 0;

    file.write_all(HEADER.as_bytes()).unwrap();
    for i in 0..rows {
        match i % 11 {
            3 => writeln!(file, "Short,Row").unwrap(),
            5 => writeln!(file, "No,Sep,user{i}.example.com,x,10.0.0.1").unwrap(),
            7 => writeln!(file, "Empty,Email,,x,10.0.0.1").unwrap(),
            _ => {
                let domain = format!("d{:02}.example.com", i % 37);
                writeln!(file, "First,Last,user{i}@{domain},x,10.0.0.1").unwrap();
                *expected.entry(domain).or_insert(0) += 1;
                continue;
            }
        }
        malformed += 1;
    }
    file.flush().unwrap();

    let mut expected: Vec<_> = expected
        .into_iter()
        .map(|(d, n)| DomainCount::new(d, n))
        .collect();
    expected.sort_by(|a, b| a.domain.cmp(&b.domain));
    (file, expected, malformed)
}

fn assert_sorted_unique(counts: &[DomainCount]) {
    for pair in counts.windows(2) {
        assert!(
            pair[0].domain.as_bytes() < pair[1].domain.as_bytes(),
            "not strictly ascending: {:?} then {:?}",
            pair[0].domain,
            pair[1].domain
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn counts_fixture_file() {
    let want = vec![
        DomainCount::new("about.com", 1),
        DomainCount::new("bigcartel.com", 1),
        DomainCount::new("bizjournals.com", 1),
        DomainCount::new("fastcompany.com", 1),
        DomainCount::new("goo.gl", 1),
        DomainCount::new("google.com", 2),
        DomainCount::new("i2i.jp", 1),
        DomainCount::new("nasa.gov", 1),
        DomainCount::new("topsy.com", 1),
    ];

    let got = parser(10, 0)
        .domain_counts(fixture("test_customer_data.csv"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(got, want);
}

#[tokio::test(flavor = "multi_thread")]
async fn counts_three_row_example() {
    let input = reader(
        "A,A,a@x.com,f,1.1.1.1\n\
         B,B,b@y.com,m,1.1.1.2\n\
         C,C,c@x.com,f,1.1.1.3\n",
    );
    let got = parser(4, 2)
        .domain_counts_from_reader(input, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        got,
        vec![DomainCount::new("x.com", 2), DomainCount::new("y.com", 1)]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn header_only_input_is_empty_result() {
    let report = parser(3, 0)
        .report_from_reader(reader(""), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report, Report::default());
}

#[tokio::test(flavor = "multi_thread")]
async fn result_is_invariant_across_worker_and_buffer_sizes() {
    let (file, expected, malformed) = generated_input(5_000);
    let cancel = CancellationToken::new();

    for worker_count in [1, 10, 200] {
        for buffer_size in [0, 10, 200] {
            let report = parser(worker_count, buffer_size)
                .report(file.path(), &cancel)
                .await
                .unwrap();
            assert_eq!(
                report.counts, expected,
                "workers={worker_count} buffer={buffer_size}"
            );
            assert_eq!(report.rows_read, 5_000);
            assert_eq!(report.malformed_rows, malformed);
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn total_users_equals_well_formed_rows() {
    let (file, _, malformed) = generated_input(2_000);
    let report = parser(8, 16)
        .report(file.path(), &CancellationToken::new())
        .await
        .unwrap();

    assert_sorted_unique(&report.counts);
    assert_eq!(report.total_users(), report.rows_read - malformed);
    assert_eq!(report.total_users() + report.malformed_rows, report.rows_read);
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_runs_are_identical() {
    let (file, _, _) = generated_input(3_000);
    let parser = parser(16, 4);
    let cancel = CancellationToken::new();

    let first = parser.report(file.path(), &cancel).await.unwrap();
    let second = parser.report(file.path(), &cancel).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_rows_are_skipped_not_fatal() {
    let input = reader(
        "only,two\n\
         Three,Fields,a@x.com\n\
         No,At,nobody.example,f,1.1.1.1\n\
         Empty,Email,,f,1.1.1.1\n\
         Trailing,At,someone@,f,1.1.1.1\n\
         Good,Row,good@x.com,f,1.1.1.1\n\
         Also,Good,fine@y.org,m,1.1.1.2\n",
    );
    let report = parser(3, 0)
        .report_from_reader(input, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report.counts,
        vec![DomainCount::new("x.com", 1), DomainCount::new("y.org", 1)]
    );
    assert_eq!(report.rows_read, 7);
    assert_eq!(report.malformed_rows, 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn structural_error_fails_the_run() {
    let mut body = Vec::from(HEADER.as_bytes());
    for i in 0..1_000 {
        body.extend_from_slice(format!("F,L,u{i}@x.com,f,1.1.1.1\n").as_bytes());
    }
    body.extend_from_slice(b"F,L,\xff\xfe@x.com,f,1.1.1.1\n");
    for i in 0..1_000 {
        body.extend_from_slice(format!("F,L,v{i}@y.com,f,1.1.1.1\n").as_bytes());
    }

    let cancel = CancellationToken::new();
    let err = parser(4, 0)
        .report_from_reader(Cursor::new(body), &cancel)
        .await
        .unwrap_err();

    match err {
        Error::StructuralDecode { line, .. } => assert_eq!(line, Some(1_002)),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!cancel.is_cancelled(), "caller token must not be cancelled");
}

#[tokio::test(flavor = "multi_thread")]
async fn unclosed_quote_fails_the_run() {
    let input = reader(
        "A,A,a@x.com,f,1\n\
         B,\"B,b@y.com,m,2\n\
         C,C,c@x.com,f,3\n\
         D,D,d@x.com,f,4\n\
         E,E,e@z.com,f,5\n",
    );
    let err = parser(2, 0)
        .report_from_reader(input, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            Error::StructuralDecode {
                line: Some(3),
                source: DecodeFailure::UnterminatedQuote { .. },
            }
        ),
        "{err:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn bare_quote_fails_the_run() {
    let input = reader(
        "A,A,a@x.com,f,1\n\
         B,B\"x,b@y.com,m,2\n\
         C,C,c@x.com,f,3\n",
    );
    let err = parser(2, 0)
        .report_from_reader(input, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            Error::StructuralDecode {
                line: Some(3),
                source: DecodeFailure::StrayQuote { field: 1 },
            }
        ),
        "{err:?}"
    );
}

/// Stalls on its first read like a slow device would.
struct SlowStart {
    inner: Cursor<Vec<u8>>,
    delay: Option<Duration>,
}

impl Read for SlowStart {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(delay) = self.delay.take() {
            std::thread::sleep(delay);
        }
        self.inner.read(buf)
    }
}

// Single-threaded runtime: a header read on the runtime thread would hold
// back the timer below until the read finished.
#[tokio::test]
async fn header_is_read_off_the_runtime_thread() {
    let input = SlowStart {
        inner: reader("A,A,a@x.com,f,1\n"),
        delay: Some(Duration::from_millis(200)),
    };
    let parser = parser(1, 0);
    let cancel = CancellationToken::new();
    let started = Instant::now();

    let ((report, finished), ticked) = tokio::join!(
        async {
            let report = parser.report_from_reader(input, &cancel).await;
            (report, started.elapsed())
        },
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            started.elapsed()
        },
    );

    assert_eq!(report.unwrap().rows_read, 1);
    assert!(ticked < finished, "timer {ticked:?}, run {finished:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_input_is_missing_header() {
    let err = parser(2, 2)
        .report_from_reader(Cursor::new(Vec::new()), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingHeader));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_file_is_file_unavailable() {
    let err = parser(2, 2)
        .domain_counts(fixture("does_not_exist.csv"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FileUnavailable { .. }), "{err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_workers_is_rejected() {
    let parser = Parser::new(ParserConfig {
        worker_count: 0,
        buffer_size: 10,
    });
    let err = parser
        .report_from_reader(reader("A,A,a@x.com,f\n"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn pre_cancelled_token_yields_cancelled() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = parser(2, 2)
        .domain_counts(fixture("test_customer_data.csv"), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

/// Produces the same record forever. The first copy doubles as the header.
struct EndlessRows {
    pos: usize,
    _guard: Arc<()>,
}

impl EndlessRows {
    const LINE: &'static [u8] = b"First,Last,user@endless.io,x,10.0.0.1\n";
}

impl Read for EndlessRows {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        for byte in buf.iter_mut() {
            *byte = Self::LINE[self.pos % Self::LINE.len()];
            self.pos += 1;
        }
        Ok(buf.len())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_mid_run_unwinds_every_participant() {
    for (worker_count, buffer_size) in [(1, 0), (10, 10), (200, 200)] {
        let guard = Arc::new(());
        let input = EndlessRows {
            pos: 0,
            _guard: Arc::clone(&guard),
        };
        let cancel = CancellationToken::new();
        let run = tokio::spawn({
            let cancel = cancel.clone();
            let parser = parser(worker_count, buffer_size);
            async move { parser.report_from_reader(input, &cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(10), run)
            .await
            .expect("run did not unwind after cancellation")
            .unwrap();
        assert!(
            matches!(outcome, Err(Error::Cancelled)),
            "workers={worker_count}: {outcome:?}"
        );
        // The dispatch thread has dropped the reader, so nothing outlived the run.
        assert_eq!(Arc::strong_count(&guard), 1);
    }
}
