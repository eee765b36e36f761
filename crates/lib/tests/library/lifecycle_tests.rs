use snapforge_lib::lifecycle::PhaseState;
use snapforge_lib::lock::{LockMode, ProjectLock};
use snapforge_lib::merge::SharedTree;
use snapforge_lib::{ExecuteOptions, LifecycleError, Phase};

use super::common::{TestProject, write_tgz};

const TWO_PARTS: &str = r#"
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

fn two_parts() -> TestProject {
  let test = TestProject::new(TWO_PARTS);
  test.write_file("libhello/lib/libhello.so", "lib");
  test.write_file("libhello/share/doc/COPYING", "GPL");
  test.write_file("hello/bin/hello", "#!/bin/sh\necho hello\n");
  test.write_file("hello/share/doc/COPYING", "GPL");
  test
}

#[test]
fn prime_merges_all_parts() {
  let test = two_parts();

  let report = test.lifecycle().execute(Phase::Prime, &[], &ExecuteOptions::default()).unwrap();

  assert_eq!(report.executed.len(), 8);
  assert_eq!(test.read_file("prime/lib/libhello.so"), "lib");
  assert_eq!(test.read_file("prime/bin/hello"), "#!/bin/sh\necho hello\n");
  assert_eq!(test.read_file("stage/share/doc/COPYING"), "GPL");

  let index = SharedTree::prime(test.load().paths()).index().unwrap();
  let owners: Vec<_> = index.owners("share/doc/COPYING").unwrap().iter().cloned().collect();
  assert_eq!(owners, vec!["hello", "libhello"]);
}

#[test]
fn rerun_is_a_no_op() {
  let test = two_parts();
  test.lifecycle().execute(Phase::Prime, &[], &ExecuteOptions::default()).unwrap();

  let report = test.lifecycle().execute(Phase::Prime, &[], &ExecuteOptions::default()).unwrap();

  assert!(report.executed.is_empty());
  assert_eq!(report.skipped.len(), 8);
}

#[test]
fn forced_pull_picks_up_new_source_content() {
  let test = two_parts();
  let lifecycle = test.lifecycle();
  lifecycle.execute(Phase::Prime, &[], &ExecuteOptions::default()).unwrap();
  test.write_file("hello/bin/hello", "v2");

  let options = ExecuteOptions {
    force_from: Some(Phase::Pull),
  };
  let report = lifecycle.execute(Phase::Prime, &["hello".to_string()], &options).unwrap();

  assert!(report.was_executed("hello", Phase::Pull));
  assert!(!report.was_executed("libhello", Phase::Build));
  assert_eq!(test.read_file("prime/bin/hello"), "v2");
}

#[test]
fn conflicting_parts_fail_with_both_names() {
  let test = TestProject::new(
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
  test.write_file("one/etc/motd", "one");
  test.write_file("two/etc/motd", "two");

  let err = test.lifecycle().execute(Phase::Stage, &[], &ExecuteOptions::default()).unwrap_err();

  assert!(matches!(err, LifecycleError::Merge { phase: Phase::Stage, .. }));
  let message = err.to_string();
  assert!(message.contains("'one'"), "{message}");
  assert!(message.contains("'two'"), "{message}");
  assert!(message.contains("etc/motd"), "{message}");
  assert_eq!(test.read_file("stage/etc/motd"), "one");
}

#[test]
fn tarball_sources_are_extracted() {
  let test = TestProject::new("parts:\n  data:\n    plugin: tar\n    options:\n      source: data-1.0.tgz\n");
  write_tgz(
    &test.path("data-1.0.tgz"),
    &[("data-1.0/share/data.txt", "payload"), ("data-1.0/README", "readme")],
  );

  test.lifecycle().execute(Phase::Stage, &[], &ExecuteOptions::default()).unwrap();

  assert_eq!(test.read_file("stage/share/data.txt"), "payload");
  assert!(test.exists("stage/README"));
  assert!(!test.exists("stage/data-1.0"));
}

#[test]
fn remote_source_fails_pull() {
  let test = TestProject::new("parts:\n  web:\n    plugin: dump\n    options:\n      source: https://example.com/web.tar.gz\n");

  let err = test.lifecycle().execute(Phase::Pull, &[], &ExecuteOptions::default()).unwrap_err();

  assert!(matches!(err, LifecycleError::Phase { phase: Phase::Pull, ref part, .. } if part == "web"));
}

#[test]
fn editing_project_marks_part_stale() {
  let test = two_parts();
  test.lifecycle().execute(Phase::Build, &[], &ExecuteOptions::default()).unwrap();
  test.write_file("hello2/bin/hello", "other");
  test.set_project(&TWO_PARTS.replace("source: hello\n", "source: hello2\n"));

  let status = test.lifecycle().status().unwrap();

  let hello = status.iter().find(|s| s.name == "hello").unwrap();
  assert_eq!(hello.phase(Phase::Pull).unwrap().state, PhaseState::Stale);
  let libhello = status.iter().find(|s| s.name == "libhello").unwrap();
  assert_eq!(libhello.phase(Phase::Build).unwrap().state, PhaseState::Done);
}

#[test]
fn clean_everything_resets_project() {
  let test = two_parts();
  let lifecycle = test.lifecycle();
  lifecycle.execute(Phase::Prime, &[], &ExecuteOptions::default()).unwrap();

  let cleaned = lifecycle.clean(&[], Phase::Pull).unwrap();

  assert_eq!(cleaned, vec!["libhello", "hello"]);
  assert!(!test.exists("parts/hello"));
  assert!(!test.exists("parts/libhello"));
  assert!(!test.exists("prime/bin/hello"));
  assert!(!test.exists("stage/share"));
  let status = lifecycle.status().unwrap();
  assert!(status.iter().flat_map(|s| &s.phases).all(|p| p.state == PhaseState::Pending));
}

#[test]
fn lock_lives_in_parts_dir() {
  let test = two_parts();
  let project = test.load();

  let lock = ProjectLock::acquire(&project.paths().parts, LockMode::Exclusive, "test").unwrap();

  assert_eq!(lock.lock_path(), test.dir().join("parts/.lock"));
}
