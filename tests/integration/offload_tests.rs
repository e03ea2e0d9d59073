//! Integration tests for tokenizing large buffers on a worker

use std::sync::mpsc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use rust_sqlscope::parser::{
    parse_with_options, tokenize_on_worker, tokenize_with_timeout, DEFAULT_OFFLOAD_TIMEOUT,
};
use rust_sqlscope::{parse, tokenize, ParseOptions};

fn large_script() -> String {
    let mut sql = String::new();
    for i in 0..2_000 {
        sql.push_str(&format!(
            "CREATE TABLE #t{i} (id int, v varchar(10))\nINSERT INTO #t{i} (id, v) SELECT o.id, o.v FROM Orders o WHERE o.id > -{i}\nGO\n"
        ));
    }
    sql
}

#[test]
fn test_offloaded_parse_equals_synchronous_parse() {
    let sql = large_script();
    let offloaded = parse_with_options(
        &sql,
        &ParseOptions {
            offload_threshold: Some(1024),
            offload_timeout: DEFAULT_OFFLOAD_TIMEOUT,
        },
    );
    assert_eq!(offloaded, parse_with_options(&sql, &ParseOptions::synchronous()));
    assert_eq!(offloaded.temp_tables.len(), 2_000);
    assert_eq!(offloaded.chunks.last().map(|c| c.go_batch_index), Some(1_999));
}

#[test]
fn test_worker_result_matches_tokenize() {
    let sql = large_script();
    let (tx, rx) = mpsc::channel();
    tokenize_on_worker(&sql, |_| {}, move |tokens| tx.send(tokens).unwrap());
    let tokens = rx.recv_timeout(Duration::from_secs(60)).unwrap();
    assert_eq!(tokens, tokenize(&sql));
}

#[test]
fn test_cancelled_worker_completes_at_most_once() {
    let sql = large_script();
    let (tx, rx) = mpsc::channel();
    let handle = tokenize_on_worker(&sql, |_| {}, move |tokens| {
        let _ = tx.send(tokens);
    });
    if handle.cancel() {
        assert!(handle.is_cancelled());
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    } else {
        assert!(!handle.is_cancelled());
        let tokens = rx.recv_timeout(Duration::from_secs(60)).unwrap();
        assert_eq!(tokens, tokenize(&sql));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}

#[test]
fn test_zero_timeout_still_returns_tokens() {
    let sql = "SELECT a FROM t WHERE b = -1";
    assert_eq!(tokenize_with_timeout(sql, Duration::ZERO), tokenize(sql));
    assert_eq!(parse(sql).chunks.len(), 1);
}
