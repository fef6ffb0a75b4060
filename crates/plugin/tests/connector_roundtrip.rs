use prost::Message;
use sse_common::{CardinalityPolicy, PluginConfig, SseError};
use sse_plugin::bundle::{first_column, numeric_bundle, MAX_BUNDLE_SIZE};
use sse_plugin::grpc::{ConnectorClient, PluginService};
use sse_plugin::header::{FUNCTION_REQUEST_HEADER_KEY, INVALID_FUNCTION_ID};
use sse_plugin::{v1, CallHeader, FunctionId, PluginClient, StrategyOptions};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::metadata::BinaryMetadataValue;
use tonic::transport::Server;
use tonic::{Code, Request};

async fn start_server(service: PluginService) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(
        Server::builder()
            .add_service(service.into_server())
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );
    format!("http://{addr}")
}

async fn connect_default() -> PluginClient {
    let endpoint = start_server(PluginService::new(&PluginConfig::default())).await;
    PluginClient::connect(&endpoint).await.expect("connect")
}

fn call(function: FunctionId, cardinality: u64) -> CallHeader {
    CallHeader {
        function_id: function.as_i32(),
        cardinality,
        app_id: "integration".to_string(),
        version: "1.0.0".to_string(),
        ..CallHeader::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn capabilities_are_stable_across_calls() {
    let mut client = connect_default().await;
    let first = client.capabilities().await.expect("first");
    let second = client.capabilities().await.expect("second");
    assert_eq!(first.encode_to_vec(), second.encode_to_vec());
    let names = first
        .functions
        .iter()
        .map(|f| (f.name.as_str(), f.function_id))
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![("SumOfRows", 0), ("SumOfColumn", 1), ("TwoNormRanking", 2)]
    );
    assert!(!first.allow_script);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sum_of_rows_output_does_not_depend_on_chunking() {
    let mut client = connect_default().await;
    let rows = (1..=5)
        .map(|i| vec![i as f64, 10.0 * i as f64])
        .collect::<Vec<_>>();

    let one = client
        .execute(&call(FunctionId::SumOfRows, 5), vec![numeric_bundle(rows.clone())])
        .await
        .expect("one bundle");
    let five = client
        .execute(
            &call(FunctionId::SumOfRows, 5),
            rows.iter().map(|r| numeric_bundle([r.clone()])).collect(),
        )
        .await
        .expect("five bundles");

    let expected = vec![11.0, 22.0, 33.0, 44.0, 55.0];
    assert_eq!(first_column(&one), expected);
    assert_eq!(first_column(&five), expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sum_of_column_returns_single_total() {
    let mut client = connect_default().await;
    let out = client
        .execute(
            &call(FunctionId::SumOfColumn, 3),
            vec![
                numeric_bundle([vec![3.0, -1.0]]),
                numeric_bundle([vec![4.0, -1.0], vec![5.0, -1.0]]),
            ],
        )
        .await
        .expect("sum of column");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].rows.len(), 1);
    assert_eq!(first_column(&out), vec![12.0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_norm_ranking_breaks_ties_by_arrival() {
    let mut client = connect_default().await;
    let out = client
        .execute(
            &call(FunctionId::TwoNormRanking, 3),
            vec![numeric_bundle([vec![1.0, 0.0], vec![0.0, 1.0], vec![3.0, 4.0]])],
        )
        .await
        .expect("ranking");
    assert_eq!(first_column(&out), vec![0.0, 1.0, 2.0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_norm_ranking_rechunks_large_output() {
    let mut client = connect_default().await;
    let n = MAX_BUNDLE_SIZE + 5;
    // Norm shrinks with arrival index, so the ranking is the reversed arrival order.
    let rows = (0..n).map(|i| vec![0.0, (n - i) as f64]).collect::<Vec<_>>();
    let input = rows
        .chunks(8 * 1024)
        .map(|c| numeric_bundle(c.to_vec()))
        .collect::<Vec<_>>();

    let out = client
        .execute(&call(FunctionId::TwoNormRanking, n as u64), input)
        .await
        .expect("ranking");

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].rows.len(), MAX_BUNDLE_SIZE);
    assert_eq!(out[1].rows.len(), 5);
    let ranked = first_column(&out);
    let expected = (0..n).rev().map(|i| i as f64).collect::<Vec<_>>();
    assert_eq!(ranked, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_or_missing_function_is_cancelled() {
    let mut client = connect_default().await;
    let header = CallHeader {
        function_id: INVALID_FUNCTION_ID,
        ..CallHeader::default()
    };
    let err = client
        .execute(&header, vec![numeric_bundle([vec![1.0, 2.0]])])
        .await
        .expect_err("invalid id");
    assert!(matches!(err, SseError::Cancelled(ref m) if m.contains("unknown function id 3")));

    // No metadata at all: the raw client sends no headers.
    let endpoint = start_server(PluginService::new(&PluginConfig::default())).await;
    let mut raw = ConnectorClient::connect(endpoint).await.expect("connect");
    let request = Request::new(tokio_stream::iter(vec![numeric_bundle([vec![1.0]])]));
    let status = raw
        .execute_function(request)
        .await
        .err()
        .expect("no header");
    assert_eq!(status.code(), Code::Cancelled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_function_header_is_invalid_argument() {
    let endpoint = start_server(PluginService::new(&PluginConfig::default())).await;
    let mut raw = ConnectorClient::connect(endpoint).await.expect("connect");
    let mut request = Request::new(tokio_stream::iter(Vec::<v1::BundledRows>::new()));
    request.metadata_mut().insert_bin(
        FUNCTION_REQUEST_HEADER_KEY,
        BinaryMetadataValue::from_bytes(&[0xff, 0xff, 0xff]),
    );
    let status = raw
        .execute_function(request)
        .await
        .err()
        .expect("corrupt header");
    assert_eq!(status.code(), Code::InvalidArgument);
    assert!(status.message().contains(FUNCTION_REQUEST_HEADER_KEY));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn short_row_in_ranking_fails_the_call_only() {
    let mut client = connect_default().await;
    let err = client
        .execute(
            &call(FunctionId::TwoNormRanking, 2),
            vec![numeric_bundle([vec![1.0, 1.0], vec![2.0]])],
        )
        .await
        .expect_err("short row");
    assert!(matches!(
        err,
        SseError::Remote { code, ref message }
            if code == Code::OutOfRange as i32 && message.contains("needs at least 2")
    ));

    // Same connection keeps serving other calls.
    let out = client
        .execute(
            &call(FunctionId::SumOfRows, 2),
            vec![numeric_bundle([vec![1.0, 1.0], vec![2.0]])],
        )
        .await
        .expect("sum of rows after failure");
    assert_eq!(first_column(&out), vec![2.0, 2.0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cardinality_overrun_depends_on_policy() {
    let rows = vec![numeric_bundle([vec![3.0, 4.0], vec![0.0, 1.0]])];

    let mut strict = connect_default().await;
    let err = strict
        .execute(&call(FunctionId::TwoNormRanking, 1), rows.clone())
        .await
        .expect_err("overrun");
    assert!(matches!(
        err,
        SseError::Remote { code, ref message }
            if code == Code::OutOfRange as i32 && message.contains("cardinality overrun")
    ));

    let lenient = PluginService::with_options(StrategyOptions {
        cardinality_policy: CardinalityPolicy::Lenient,
        ..StrategyOptions::default()
    });
    let endpoint = start_server(lenient).await;
    let mut client = PluginClient::connect(&endpoint).await.expect("connect");
    let out = client
        .execute(&call(FunctionId::TwoNormRanking, 1), rows)
        .await
        .expect("lenient grows");
    assert_eq!(first_column(&out), vec![1.0, 0.0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_calls_keep_separate_state() {
    let client = connect_default().await;
    let mut a = client.clone();
    let mut b = client;
    let header = call(FunctionId::SumOfColumn, 0);
    let ones = (0..50).map(|_| numeric_bundle([vec![1.0]])).collect();
    let twos = (0..50).map(|_| numeric_bundle([vec![2.0]])).collect();
    let (left, right) = tokio::join!(a.execute(&header, ones), b.execute(&header, twos));
    assert_eq!(first_column(&left.expect("left")), vec![50.0]);
    assert_eq!(first_column(&right.expect("right")), vec![100.0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn script_evaluation_is_unimplemented() {
    let endpoint = start_server(PluginService::new(&PluginConfig::default())).await;
    let mut raw = ConnectorClient::connect(endpoint).await.expect("connect");
    let status = raw
        .evaluate_script(Request::new(tokio_stream::iter(Vec::<v1::BundledRows>::new())))
        .await
        .err()
        .expect("unimplemented");
    assert_eq!(status.code(), Code::Unimplemented);
}
