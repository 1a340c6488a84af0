mod common;

use common::{read, stderr_of, stdout_of, Sandbox};

#[test]
fn test_overwrite_replaces_existing_content() {
    let sandbox = Sandbox::new();
    let out = sandbox.write("out.txt", "previous\ncontent\nthat is longer\n");

    let output = sandbox.run_line("echo hi > out.txt");

    assert!(output.status.success());
    assert_eq!(read(&out), "hi\n");
    assert_eq!(stdout_of(&output), "");
}

#[test]
fn test_append_keeps_existing_content() {
    let sandbox = Sandbox::new();
    let out = sandbox.write("out.txt", "first\n");

    sandbox.run_line("echo second >> out.txt");
    sandbox.run_line("echo third >> out.txt");

    assert_eq!(read(&out), "first\nsecond\nthird\n");
}

#[test]
fn test_append_creates_missing_file() {
    let sandbox = Sandbox::new();
    let output = sandbox.run_line("echo fresh >> new.txt");

    assert!(output.status.success());
    assert_eq!(read(&sandbox.path("new.txt")), "fresh\n");
}

#[test]
fn test_input_file_is_visible_on_stdin() {
    let sandbox = Sandbox::new();
    sandbox.write("in.txt", "line one\nline two\n");

    let output = sandbox.run_line("cat < in.txt");

    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "line one\nline two\n");
}

#[test]
fn test_input_and_output_on_one_command() {
    let sandbox = Sandbox::new();
    sandbox.write("in.txt", "pear\napple\nfig\n");

    let output = sandbox.run_line("sort < in.txt > sorted.txt");

    assert!(output.status.success());
    assert_eq!(read(&sandbox.path("sorted.txt")), "apple\nfig\npear\n");
}

#[test]
fn test_missing_input_file_does_not_run_command() {
    let sandbox = Sandbox::new();

    let output = sandbox.run_line("cat < missing.txt > out.txt");

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("Could not open file missing.txt"));
    assert!(!sandbox.path("out.txt").exists());
    assert!(sandbox.trace().contains("Could not open file missing.txt"));
}
