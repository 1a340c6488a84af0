mod common;

use common::{read, stderr_of, stdout_of, Sandbox};

#[test]
fn test_ls_piped_into_wc() {
    let sandbox = Sandbox::new();
    sandbox.write("a.txt", "a");
    sandbox.write("b.txt", "b");

    // trace.log is the third entry.
    let output = sandbox.run_line("ls | wc -l");

    assert!(output.status.success());
    assert_eq!(stdout_of(&output).trim(), "3");
}

#[test]
fn test_pipe_moves_bytes_unchanged() {
    let sandbox = Sandbox::new();
    // Larger than a pipe buffer, so both stages have to run concurrently.
    let data: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    sandbox.write("blob.bin", &data);

    let output = sandbox.run_line("cat < blob.bin | cat > copy.bin");

    assert!(output.status.success());
    assert_eq!(std::fs::read(sandbox.path("copy.bin")).unwrap(), data);
}

#[test]
fn test_pipe_with_append() {
    let sandbox = Sandbox::new();
    let out = sandbox.write("count.txt", "before\n");
    sandbox.write("in.txt", "x\ny\n");

    let output = sandbox.run_line("cat < in.txt | wc -l >> count.txt");

    assert!(output.status.success());
    let contents = read(&out);
    assert!(contents.starts_with("before\n"));
    assert_eq!(contents.lines().nth(1).map(str::trim), Some("2"));
}

#[test]
fn test_redirections_stay_on_their_side() {
    let sandbox = Sandbox::new();
    sandbox.write("in.txt", "hello\n");

    // The right side reads the pipe, not in.txt; the left side writes the pipe.
    let output = sandbox.run_line("cat < in.txt | tr a-z A-Z > upper.txt");

    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "");
    assert_eq!(read(&sandbox.path("upper.txt")), "HELLO\n");
}

#[test]
fn test_pipeline_waits_for_both_stages() {
    let sandbox = Sandbox::new();
    sandbox.write("slow.sh", "sleep 0.3\necho done > late.txt\n");

    // The left stage outlives the right one; the line must not return before it.
    let output = sandbox.run_line("sh slow.sh | true");

    assert!(output.status.success());
    assert_eq!(read(&sandbox.path("late.txt")), "done\n");
    assert!(sandbox.trace().contains("Pipeline finished"));
}

#[test]
fn test_pipeline_exit_status_is_right_stage() {
    let sandbox = Sandbox::new();
    assert_eq!(sandbox.run_line("true | false").status.code(), Some(1));
    assert_eq!(sandbox.run_line("false | true").status.code(), Some(0));
}

#[test]
fn test_writer_stops_quietly_when_reader_exits() {
    let sandbox = Sandbox::new();

    let output = sandbox.run_line("seq 1 10000000 | head -n 1");

    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "1\n");
    assert_eq!(stderr_of(&output), "");
}

#[test]
fn test_stages_inherit_only_standard_descriptors() {
    let sandbox = Sandbox::new();

    sandbox.run_line("ls /proc/self/fd > single.txt");
    sandbox.run_line("ls /proc/self/fd | cat > piped.txt");

    // Same table either way: 0, 1, 2 and the directory ls is reading.
    assert_eq!(read(&sandbox.path("piped.txt")), read(&sandbox.path("single.txt")));
}
