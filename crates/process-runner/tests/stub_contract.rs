//! Contract tests for the stub runner as seen through `background`

use call_context::Context;
use process_runner::{background, command_line, stub_key, with_local, with_stub, ProcessError};
use std::io::Write;
use std::thread;

fn run(ctx: &Context, argv: &[&str]) -> Result<String, ProcessError> {
    futures::executor::block_on(background(ctx, argv))
}

#[test]
fn test_every_call_is_logged_once_in_order() {
    let (ctx, stub) = with_stub(&Context::background());
    stub.with_failure_for("b", "failed")
        .with_callback_for("c", |_| Err("callback failed".into()));

    let script: &[&[&str]] = &[&["a"], &["b"], &["c"], &["/usr/bin/d", "x"], &["a"]];
    for (i, argv) in script.iter().enumerate() {
        let _ = run(&ctx, argv);
        assert_eq!(stub.len(), i + 1);
    }

    assert_eq!(stub.commands(), vec!["a", "b", "c", "d x", "a"]);
}

#[test]
fn test_canonicalization_is_deterministic() {
    let argv = ["/opt/tool", "--flag", "value"];
    assert_eq!(command_line(&argv), command_line(&argv));
    assert_eq!(stub_key(&argv), stub_key(&argv));

    let (ctx, stub) = with_stub(&Context::background());
    stub.with_stdout_for("tool a b", "joined");

    // Same joined text, different argv: the stub cannot tell them apart.
    assert_eq!(run(&ctx, &["tool", "a b"]).unwrap(), "joined");
    assert_eq!(run(&ctx, &["tool", "a", "b"]).unwrap(), "joined");
}

#[test]
fn test_default_and_override_scenario() {
    let (ctx, stub) = with_stub(&Context::background());
    stub.with_stdout_for("qux 1", "first")
        .with_stdout_for("qux 2", "second")
        .with_failure_for("qux 3", "nope");

    assert_eq!(run(&ctx, &["/path/is/irrelevant/qux", "1"]).unwrap(), "first");
    assert_eq!(run(&ctx, &["/path/is/irrelevant/qux", "2"]).unwrap(), "second");

    let err = run(&ctx, &["/path/is/irrelevant/qux", "3"]).unwrap_err();
    assert_eq!(err.to_string(), "/path/is/irrelevant/qux 3: nope");

    assert_eq!(stub.to_string(), "process stub with 3 calls");
}

#[test]
fn test_plain_failure_scenario() {
    let (ctx, stub) = with_stub(&Context::background());
    stub.with_failure("nope");

    let err = run(&ctx, &["/bin/x", "1"]).unwrap_err();
    assert_eq!(err.to_string(), "/bin/x 1: nope");
    assert_eq!(stub.len(), 1);
}

#[test]
fn test_callback_round_trip() {
    let (ctx, stub) = with_stub(&Context::background());
    stub.with_callback(|cmd| {
        cmd.stderr().write_all(b"E")?;
        cmd.stdout().write_all(b"O")?;
        Err("broken pipe".into())
    });

    let err = run(&ctx, &["/bin/cat", "file"]).unwrap_err();
    assert_eq!(err.stderr, "E");
    assert_eq!(err.stdout, "O");
    assert_eq!(err.to_string(), "/bin/cat file: broken pipe");
    assert_eq!(err.cause().to_string(), "broken pipe");
}

#[test]
fn test_environment_propagation_scenario() {
    let (ctx, stub) = with_stub(&Context::background());
    let ctx = ctx.with_env("FOO", "bar");

    assert_eq!(stub.combined_environment(&ctx).get("FOO").map(String::as_str), Some("bar"));
    assert_eq!(stub.lookup_env(&ctx, "FOO"), "bar");

    stub.with_stdout("meeee");
    assert_eq!(run(&ctx, &["/usr/local/bin/meeecho", "1", "--foo", "bar"]).unwrap(), "meeee");
    assert_eq!(stub.commands(), vec!["meeecho 1 --foo bar"]);
    assert_eq!(stub.calls()[0].env.get("FOO").map(String::as_str), Some("bar"));
}

#[test]
fn test_stub_shadows_outer_local_runner() {
    let outer = with_local(&Context::background());
    let (ctx, stub) = with_stub(&outer);
    stub.with_failure("would have been real");

    // Nothing is spawned even though the binary does not exist.
    let err = run(&ctx, &["this_command_does_not_exist_12345"]).unwrap_err();
    assert_eq!(err.to_string(), "this_command_does_not_exist_12345: would have been real");
}

#[test]
fn test_concurrent_invocations_are_all_recorded() {
    const THREADS: usize = 8;
    const CALLS: usize = 50;

    let (ctx, stub) = with_stub(&Context::background());
    stub.with_stdout("ok");

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let ctx = ctx.clone();
            thread::spawn(move || {
                for i in 0..CALLS {
                    let worker = t.to_string();
                    let call = i.to_string();
                    let argv = ["worker", worker.as_str(), call.as_str()];
                    assert_eq!(run(&ctx, &argv).unwrap(), "ok");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(stub.len(), THREADS * CALLS);

    // Each worker's calls keep their relative order in the shared log.
    let commands = stub.commands();
    for t in 0..THREADS {
        let prefix = format!("worker {t} ");
        let seen: Vec<usize> = commands
            .iter()
            .filter_map(|command| command.strip_prefix(&prefix))
            .map(|call| call.parse().unwrap())
            .collect();
        assert_eq!(seen, (0..CALLS).collect::<Vec<_>>());
    }
}

#[smol_potat::test]
async fn test_callback_runs_outside_the_lock() {
    let (ctx, stub) = with_stub(&Context::background());
    // A strong clone inside the stub's own callback would never be freed.
    let observer = stub.downgrade();
    stub.with_callback_for("count", move |cmd| {
        let observer = observer.upgrade().ok_or("stub dropped")?;
        // The call is already logged while the callback runs.
        write!(cmd.stdout(), "{}", observer.len())?;
        Ok(())
    });

    let _ = background(&ctx, &["warmup"]).await;
    let out = background(&ctx, &["count"]).await.unwrap();

    assert_eq!(out, "2");
    assert_eq!(stub.commands(), vec!["warmup", "count"]);
}
