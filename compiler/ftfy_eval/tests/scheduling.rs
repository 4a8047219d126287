//! Event loop behaviour seen from programs: timers, suspension and file
//! reads.
//!
//! Timing assertions only ever bound from below (a timer never fires early)
//! or compare orderings, so they hold under scheduling jitter.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

mod common;

use std::path::PathBuf;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};

/// `showTime()` as a statement on `line`.
fn show_time(line: u32) -> Json {
    expr(at(line, call(id("showTime"), vec![])))
}

fn set_timeout(arguments: Vec<Json>) -> Json {
    call(id("setTimeout"), arguments)
}

/// Milliseconds from a `showTime` record such as `"12 ms"`.
fn millis(value: &Json) -> u64 {
    let text = value.as_str().expect("showTime records a string");
    text.strip_suffix(" ms")
        .and_then(|ms| ms.parse().ok())
        .unwrap_or_else(|| panic!("not a showTime record: {text}"))
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("ftfy-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_timers_and_suspension() {
    // 1  // No time has passed since we started
    // 2  showTime()
    // 3
    // 4  setTimeout(() => {
    // 5    showTime()
    // 6    setTimeout(20)
    // 7    showTime()
    // 8  }, 10)
    // 9
    // 10 showTime()
    let out = run(vec![
        show_time(2),
        expr(set_timeout(vec![
            arrow(
                vec![],
                block(vec![
                    show_time(5),
                    expr(set_timeout(vec![num(20)])),
                    show_time(7),
                ]),
            ),
            num(10),
        ])),
        show_time(10),
    ]);
    out.value.as_ref().unwrap();

    let lines: Vec<i64> = out.records.iter().map(|record| record.line).collect();
    assert_eq!(lines, vec![2, 10, 5, 7]);
    let ms: Vec<u64> = out.records.iter().map(|record| millis(&record.value)).collect();
    assert!(ms[0] < 10 && ms[1] < 10, "synchronous part took {ms:?}");
    assert!(ms[2] >= 10, "first timer fired early: {ms:?}");
    assert!(ms[3] >= 30, "suspension ended early: {ms:?}");
}

/// Three timers at 10, 20 and 30 ms, then `iterations` rounds of busy work
/// and a `showTime()` on line 4.
fn timers_behind_busy_loop(iterations: i64) -> Outcome {
    let mut body = Vec::new();
    for (line, delay) in [(1, 10), (2, 20), (3, 30)] {
        body.push(expr(set_timeout(vec![
            arrow(vec![], at(line, call(id("showTime"), vec![]))),
            num(delay),
        ])));
    }
    body.push(let_("n", num(0)));
    body.push(while_(
        bin("<", id("n"), num(iterations)),
        expr(update("++", false, id("n"))),
    ));
    body.push(show_time(4));
    run(body)
}

#[test]
fn test_timers_fire_in_order_after_synchronous_work() {
    // Grow the busy loop until the synchronous part outlasts every timer.
    const SYNC_MS: u64 = 200;
    let mut iterations = 50_000;
    let (out, ms) = loop {
        let out = timers_behind_busy_loop(iterations);
        out.value.as_ref().unwrap();
        let ms: Vec<u64> = out.records.iter().map(|record| millis(&record.value)).collect();
        if ms[0] >= SYNC_MS || iterations >= 50_000 << 12 {
            break (out, ms);
        }
        iterations *= 2;
    };

    let lines: Vec<i64> = out.records.iter().map(|record| record.line).collect();
    assert_eq!(lines, vec![4, 1, 2, 3]);
    let sync_end = ms[0];
    assert!(sync_end >= SYNC_MS, "busy work finished at {sync_end} ms");
    for (fired, requested) in ms[1..].iter().zip([10, 20, 30]) {
        assert!(*fired >= requested, "timer for {requested} ms fired at {fired} ms");
        assert!(*fired >= sync_end, "timer interrupted synchronous work: {ms:?}");
    }
}

#[test]
fn test_timers_run_while_main_is_suspended() {
    // var TASKS = [["task 1.1", "task 1.2"], ["task 2"], ["task 3"]]
    // function asyncWork() { setTimeout(50) }
    // function forEach(array, cb) {
    //   for (var i = 0; i < array.length; ++i) cb(array[i])
    // }
    // setTimeout(() => showTime(), 75)
    // forEach(TASKS, tasks => forEach(tasks, task => {
    //   asyncWork(); showTime(); console.log(task)
    // }))
    let tasks = array(vec![
        array(vec![string("task 1.1"), string("task 1.2")]),
        array(vec![string("task 2")]),
        array(vec![string("task 3")]),
    ]);
    let for_each = function_decl(
        "forEach",
        vec![id("array"), id("cb")],
        vec![for_(
            var("var", id("i"), num(0)),
            bin("<", id("i"), dot(id("array"), "length")),
            update("++", true, id("i")),
            expr(call(id("cb"), vec![index(id("array"), id("i"))])),
        )],
    );
    let out = run(vec![
        var("var", id("TASKS"), tasks),
        function_decl(
            "asyncWork",
            vec![],
            vec![expr(set_timeout(vec![num(50)]))],
        ),
        for_each,
        expr(set_timeout(vec![
            arrow(vec![], at(17, call(id("showTime"), vec![]))),
            num(75),
        ])),
        expr(call(
            id("forEach"),
            vec![
                id("TASKS"),
                arrow(
                    vec![id("tasks")],
                    call(
                        id("forEach"),
                        vec![
                            id("tasks"),
                            arrow(
                                vec![id("task")],
                                block(vec![
                                    expr(call(id("asyncWork"), vec![])),
                                    show_time(23),
                                    log(24, vec![id("task")]),
                                ]),
                            ),
                        ],
                    ),
                ),
            ],
        )),
    ]);
    out.value.as_ref().unwrap();

    let lines: Vec<i64> = out.records.iter().map(|record| record.line).collect();
    assert_eq!(lines, vec![23, 24, 17, 23, 24, 23, 24, 23, 24]);
    let logged: Vec<Json> = out
        .records
        .iter()
        .filter(|record| record.line == 24)
        .map(|record| record.value.clone())
        .collect();
    assert_eq!(
        logged,
        vec![json!("task 1.1"), json!("task 1.2"), json!("task 2"), json!("task 3")]
    );
    let waits: Vec<u64> = out
        .records
        .iter()
        .filter(|record| record.line == 23)
        .map(|record| millis(&record.value))
        .collect();
    for (i, waited) in waits.iter().enumerate() {
        let at_least = 50 * (u64::try_from(i).unwrap() + 1);
        assert!(*waited >= at_least, "wait {i} ended at {waited} ms");
    }
}

#[test]
fn test_read_file_suspends_and_lets_timers_run() {
    let path = temp_file("hw", "hello world\n");
    let out = run(vec![
        import(&["readFile"], "fs"),
        let_("val", num(0)),
        expr(set_timeout(vec![
            arrow(vec![], update("++", true, id("val"))),
            num(0),
        ])),
        let_("before", id("val")),
        var(
            "const",
            id("body"),
            call(
                id("readFile"),
                vec![string(path.to_str().unwrap()), string("utf-8")],
            ),
        ),
        expr(array(vec![id("before"), id("val"), id("body")])),
    ]);
    std::fs::remove_file(&path).ok();
    assert_eq!(out.json(), json!([0, 1, "hello world\n"]));
}

#[test]
fn test_read_file_with_callback() {
    let path = temp_file("callback", "from disk");
    let out = run(vec![
        import(&["readFile"], "fs"),
        expr(call(
            id("readFile"),
            vec![
                string(path.to_str().unwrap()),
                string("utf-8"),
                arrow(vec![id("err"), id("data")], block(vec![log(4, vec![id("data")])])),
            ],
        )),
        log(6, vec![string("first")]),
    ]);
    std::fs::remove_file(&path).ok();
    out.value.as_ref().unwrap();
    assert_eq!(
        out.lines(),
        vec![(6, json!("first")), (4, json!("from disk"))]
    );
}

#[test]
fn test_missing_file_aborts_the_run() {
    let path = std::env::temp_dir().join(format!("ftfy-{}-absent", std::process::id()));
    let out = run(vec![
        import(&["readFile"], "fs"),
        expr(at(
            2,
            call(id("readFile"), vec![string(path.to_str().unwrap())]),
        )),
        log(3, vec![string("unreachable")]),
    ]);
    let message = out.error();
    assert!(message.starts_with("NativeFailure: Line 2: readFile:"), "{message}");
    assert!(out.records.is_empty());
}

#[test]
fn test_failing_timer_callback_aborts_the_run() {
    let out = run(vec![
        expr(set_timeout(vec![
            arrow(vec![], at(1, id("nope"))),
            num(0),
        ])),
        log(2, vec![string("main finished")]),
    ]);
    assert_eq!(out.lines(), vec![(2, json!("main finished"))]);
    assert_eq!(out.error(), "ReferenceError: Line 1: nope is not defined");
}
