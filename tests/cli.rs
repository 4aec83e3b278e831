use assert_cmd::Command;
use predicates::prelude::*;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("interview-os").expect("binary built");
    // Keep the user's config file and overrides out of the run.
    cmd.env(
        "XDG_CONFIG_HOME",
        std::env::temp_dir().join("interview-os-cli-no-config"),
    )
    .env_remove("INTERVIEW_OS_CATALOG__PATH");
    cmd
}

#[test]
fn prints_version() {
    bin()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("InterviewOS"))
        .stdout(predicate::str::contains("--list-topics"));
}

#[test]
fn lists_embedded_topics() {
    bin()
        .arg("--list-topics")
        .assert()
        .success()
        .stdout(predicate::str::contains("/topic/databases/acid"))
        .stdout(predicate::str::contains("Mock Interviews"))
        .stdout(predicate::str::is_match(r"\d+ topics, \d+ subtopics").unwrap());
}

#[test]
fn lists_topics_from_configured_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.yaml");
    std::fs::write(
        &path,
        "topics:\n  - id: graphs\n    title: Graph Theory\n    subtopics:\n      - { id: bfs, title: Breadth-first search }\n",
    )
    .unwrap();
    bin()
        .env("INTERVIEW_OS_CATALOG__PATH", &path)
        .arg("--list-topics")
        .assert()
        .success()
        .stdout(predicate::str::contains("Graph Theory  /topic/graphs"))
        .stdout(predicate::str::contains("1 topics, 1 subtopics"));
}

#[test]
fn broken_catalog_fails_listing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.yaml");
    std::fs::write(&path, "topics:\n  - id: ''\n    title: Nameless\n").unwrap();
    bin()
        .env("INTERVIEW_OS_CATALOG__PATH", &path)
        .arg("--list-topics")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn rejects_unknown_option() {
    bin()
        .arg("--bogus")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown option"));
}
