//! CLI integration tests for kb commands.
//!
//! These tests focus on exit codes and basic behavioral verification,
//! not specific output formatting which may change.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

/// Helper to create a temp directory for tests.
fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

/// Helper to get a kb command with HOME isolated to `dir`, running in `dir`.
fn kb(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("kb").unwrap();
    cmd.env("HOME", dir).env_remove("KB_LOG").current_dir(dir);
    cmd
}

/// Writes the sample notes into `dir` and returns their file names.
fn write_notes(dir: &Path) -> Vec<&'static str> {
    fs::write(
        dir.join("ml.md"),
        "# Machine Learning\n\nSupervised learning fits a model to labelled examples.\n\n\
         ## Gradient descent\n\nGradient descent follows the slope of the loss.\n",
    )
    .unwrap();
    fs::write(
        dir.join("bread.txt"),
        "Sourdough bread needs a lively starter and a long proofing time.\n",
    )
    .unwrap();
    vec!["ml.md", "bread.txt"]
}

/// Runs `kb add` over the sample notes.
fn add_notes(dir: &Path) {
    kb(dir).arg("add").args(write_notes(dir)).assert().success();
}

/// Runs a JSON search and parses the response.
fn search_json(dir: &Path, query: &str) -> Value {
    let output = kb(dir)
        .args(["search", query, "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

mod init {
    use super::*;

    #[test]
    fn creates_config_file() {
        let dir = temp_dir();

        kb(dir.path()).arg("init").assert().success();

        let contents = fs::read_to_string(dir.path().join(".kb.toml")).unwrap();
        assert!(contents.contains("[search]"));
        assert!(contents.contains("# keyword_weight"));
    }

    #[test]
    fn fails_if_config_exists() {
        let dir = temp_dir();
        fs::write(dir.path().join(".kb.toml"), "existing").unwrap();

        kb(dir.path())
            .arg("init")
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn force_overwrites_existing_config() {
        let dir = temp_dir();
        fs::write(dir.path().join(".kb.toml"), "existing").unwrap();

        kb(dir.path()).args(["init", "--force"]).assert().success();

        let contents = fs::read_to_string(dir.path().join(".kb.toml")).unwrap();
        assert!(contents.contains("[budget]"));
    }

    #[test]
    fn adds_data_dir_to_gitignore() {
        let dir = temp_dir();
        fs::write(dir.path().join(".gitignore"), "target/").unwrap();

        kb(dir.path()).arg("init").assert().success();

        let gitignore = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(gitignore, "target/\n.kb/\n");
    }

    #[test]
    fn leaves_gitignore_alone_when_listed() {
        let dir = temp_dir();
        fs::write(dir.path().join(".gitignore"), ".kb/\n").unwrap();

        kb(dir.path()).arg("init").assert().success();

        let gitignore = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(gitignore, ".kb/\n");
    }
}

mod add {
    use super::*;

    #[test]
    fn ingests_files_into_store() {
        let dir = temp_dir();
        add_notes(dir.path());

        assert!(dir.path().join(".kb/store.json").exists());
        assert!(dir.path().join(".kb/index").is_dir());
    }

    #[test]
    fn missing_file_fails() {
        let dir = temp_dir();

        kb(dir.path())
            .args(["add", "nope.md"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("error: failed to add"));
    }

    #[test]
    fn re_adding_a_file_keeps_one_item() {
        let dir = temp_dir();
        add_notes(dir.path());
        kb(dir.path()).args(["add", "ml.md"]).assert().success();

        let results = search_json(dir.path(), "gradient");
        assert_eq!(results["total_found"], 1);
    }
}

mod search {
    use super::*;

    #[test]
    fn finds_ingested_content() {
        let dir = temp_dir();
        add_notes(dir.path());

        let results = search_json(dir.path(), "gradient descent");
        assert_eq!(results["query"], "gradient descent");
        assert_eq!(results["results"][0]["item"]["title"], "Machine Learning");
        assert_eq!(results["strategy"], "chunked");
    }

    #[test]
    fn reports_no_results() {
        let dir = temp_dir();
        add_notes(dir.path());

        kb(dir.path())
            .args(["search", "xyznonexistentkeyword12345"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No results found."));
    }

    #[test]
    fn table_output_lists_titles() {
        let dir = temp_dir();
        add_notes(dir.path());

        kb(dir.path())
            .args(["search", "sourdough"])
            .assert()
            .success()
            .stdout(predicate::str::contains("bread"));
    }

    #[test]
    fn conflicting_filters_fail() {
        let dir = temp_dir();

        kb(dir.path())
            .args(["search", "x", "--category", "a", "--exclude-category", "a"])
            .assert()
            .failure()
            .stderr(predicate::str::starts_with("error:"));
    }

    #[test]
    fn zero_limit_fails() {
        let dir = temp_dir();

        kb(dir.path())
            .args(["search", "x", "-n", "0"])
            .assert()
            .failure();
    }

    #[test]
    fn rejects_unknown_sort() {
        let dir = temp_dir();

        kb(dir.path())
            .args(["search", "x", "--sort", "size"])
            .assert()
            .failure();
    }

    #[test]
    fn rejects_out_of_range_relevance() {
        let dir = temp_dir();

        kb(dir.path())
            .args(["search", "x", "--min-relevance", "1.5"])
            .assert()
            .failure();
    }

    #[test]
    fn group_adds_grouped_results() {
        let dir = temp_dir();
        add_notes(dir.path());

        let output = kb(dir.path())
            .args(["search", "sourdough", "--group", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let results: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert!(results["grouped_results"]["Uncategorized"].is_array());
    }
}

mod suggest {
    use super::*;

    #[test]
    fn completes_indexed_words() {
        let dir = temp_dir();
        add_notes(dir.path());

        kb(dir.path())
            .args(["suggest", "sour"])
            .assert()
            .success()
            .stdout(predicate::str::contains("sourdough"));
    }
}

mod similar {
    use super::*;

    #[test]
    fn unknown_item_fails() {
        let dir = temp_dir();
        add_notes(dir.path());

        kb(dir.path())
            .args(["similar", "missing-id"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no item with id missing-id"));
    }

    #[test]
    fn known_item_succeeds() {
        let dir = temp_dir();
        add_notes(dir.path());
        let results = search_json(dir.path(), "sourdough");
        let id = results["results"][0]["item"]["id"].as_str().unwrap().to_string();

        kb(dir.path()).args(["similar", &id]).assert().success();
    }
}

mod rm {
    use super::*;

    #[test]
    fn removes_item_from_search() {
        let dir = temp_dir();
        add_notes(dir.path());
        let results = search_json(dir.path(), "sourdough");
        let id = results["results"][0]["item"]["id"].as_str().unwrap().to_string();

        kb(dir.path()).args(["rm", &id]).assert().success();

        let results = search_json(dir.path(), "sourdough");
        assert_eq!(results["total_found"], 0);
    }

    #[test]
    fn unknown_item_fails() {
        let dir = temp_dir();

        kb(dir.path())
            .args(["rm", "missing-id"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no item with id"));
    }
}

mod rebuild {
    use super::*;

    #[test]
    fn reports_counts() {
        let dir = temp_dir();
        add_notes(dir.path());

        kb(dir.path())
            .arg("rebuild")
            .assert()
            .success()
            .stdout(predicate::str::contains("Rebuilt 2 items"));
    }

    #[test]
    fn restores_deleted_index() {
        let dir = temp_dir();
        add_notes(dir.path());
        fs::remove_dir_all(dir.path().join(".kb/index")).unwrap();

        kb(dir.path()).arg("rebuild").assert().success();

        let results = search_json(dir.path(), "gradient");
        assert_eq!(results["total_found"], 1);
    }
}

mod status {
    use super::*;

    #[test]
    fn empty_directory_suggests_adding() {
        let dir = temp_dir();

        kb(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("kb add"));
    }

    #[test]
    fn shows_counts_after_adding() {
        let dir = temp_dir();
        add_notes(dir.path());

        kb(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("keyword index"));
    }
}

mod check {
    use super::*;

    #[test]
    fn defaults_have_no_issues() {
        let dir = temp_dir();

        kb(dir.path())
            .arg("check")
            .assert()
            .success()
            .stdout(predicate::str::contains("No issues found."));
    }

    #[test]
    fn template_has_no_issues() {
        let dir = temp_dir();
        kb(dir.path()).arg("init").assert().success();

        kb(dir.path()).arg("check").assert().success();
    }

    #[test]
    fn reports_warnings() {
        let dir = temp_dir();
        fs::write(
            dir.path().join(".kb.toml"),
            "[search]\nkeyword_weight = 0.9\nsemantic_weight = 0.9\n",
        )
        .unwrap();

        kb(dir.path())
            .arg("check")
            .assert()
            .failure()
            .stdout(predicate::str::contains("Warnings (1)"));
    }

    #[test]
    fn invalid_toml_fails() {
        let dir = temp_dir();
        fs::write(dir.path().join(".kb.toml"), "[search\n").unwrap();

        kb(dir.path())
            .arg("check")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error: failed to load configuration"));
    }
}
