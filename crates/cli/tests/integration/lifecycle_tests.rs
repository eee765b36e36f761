use predicates::prelude::*;

use super::common::TestEnv;

const HELLO: &str = r#"
name: hello
parts:
  libhello:
    plugin: dump
    options:
      source: libhello
  hello:
    plugin: dump
    after: [libhello]
    options:
      source: hello
"#;

fn hello_env() -> TestEnv {
  let env = TestEnv::with_project(HELLO);
  env.write_file("libhello/lib/libhello.so", "lib");
  env.write_file("hello/bin/hello", "#!/bin/sh\necho hello\n");
  env
}

#[test]
fn prime_populates_prime_tree() {
  let env = hello_env();

  env
    .snapforge_cmd()
    .arg("prime")
    .assert()
    .success()
    .stdout(predicate::str::contains("pull libhello"))
    .stdout(predicate::str::contains("prime hello"))
    .stdout(predicate::str::contains("Prime complete"));

  assert_eq!(env.read_file("prime/lib/libhello.so"), "lib");
  assert_eq!(env.read_file("prime/bin/hello"), "#!/bin/sh\necho hello\n");
  assert!(env.exists("stage/bin/hello"));
  assert!(env.exists("parts/hello/state/prime.json"));
}

#[test]
fn second_run_has_nothing_to_do() {
  let env = hello_env();
  env.snapforge_cmd().arg("prime").assert().success();

  env
    .snapforge_cmd()
    .arg("prime")
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to prime"));
}

#[test]
fn json_report_lists_executed_phases() {
  let env = hello_env();

  let output = env.snapforge_cmd().args(["pull", "--output", "json"]).output().unwrap();

  assert!(output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let executed = report["executed"].as_array().unwrap();
  assert_eq!(executed.len(), 2);
  assert!(report["skipped"].as_array().unwrap().is_empty());
}

#[test]
fn status_json_reports_phase_states() {
  let env = hello_env();
  env.snapforge_cmd().args(["build", "libhello"]).assert().success();

  let output = env.snapforge_cmd().args(["status", "--output", "json"]).output().unwrap();

  assert!(output.status.success());
  let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let parts = status.as_array().unwrap();
  assert_eq!(parts.len(), 2);
  assert_eq!(parts[0]["name"], "libhello");
  assert_eq!(parts[0]["phases"][1]["state"], "done");
  assert_eq!(parts[1]["name"], "hello");
  assert_eq!(parts[1]["phases"][0]["state"], "pending");
}

#[test]
fn status_text_names_parts() {
  let env = hello_env();

  env
    .snapforge_cmd()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("libhello"))
    .stdout(predicate::str::contains("pending"));
}

#[test]
fn clean_removes_part_outputs() {
  let env = hello_env();
  env.snapforge_cmd().arg("prime").assert().success();

  env
    .snapforge_cmd()
    .args(["clean", "hello"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Cleaned hello"));

  assert!(!env.exists("prime/bin/hello"));
  assert!(!env.exists("parts/hello"));
  assert_eq!(env.read_file("prime/lib/libhello.so"), "lib");
}

#[test]
fn conflict_names_both_parts() {
  let env = TestEnv::with_project(
    r#"
parts:
  one:
    plugin: dump
    options:
      source: one
  two:
    plugin: dump
    options:
      source: two
"#,
  );
  env.write_file("one/etc/motd", "one");
  env.write_file("two/etc/motd", "two");

  env
    .snapforge_cmd()
    .arg("stage")
    .assert()
    .failure()
    .stderr(predicate::str::contains("'one'"))
    .stderr(predicate::str::contains("'two'"))
    .stderr(predicate::str::contains("etc/motd"));
}

#[test]
fn dependency_cycle_is_reported() {
  let env = TestEnv::with_project(
    r#"
parts:
  a:
    plugin: nil
    after: [b]
  b:
    plugin: nil
    after: [a]
"#,
  );

  env
    .snapforge_cmd()
    .arg("pull")
    .assert()
    .failure()
    .stderr(predicate::str::contains("dependency cycle detected"));
}
