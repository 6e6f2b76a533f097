use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn synthsense() -> Command {
    let mut cmd = Command::cargo_bin("synthsense").unwrap();
    cmd.env("SYNTHSENSE_CONFIG", fixture("missing-config.toml"));
    cmd
}

#[test]
fn analyze_prints_json_with_version() {
    synthsense()
        .args(["analyze", "--json", &fixture("scenario_a.json")])
        .assert()
        .success()
        .stdout(contains("\"version\": \"0.1.0\""))
        .stdout(contains("\"label\": \"AI_GENERATED\""));
}

#[test]
fn analyze_reads_stdin() {
    let request = std::fs::read_to_string(fixture("scenario_b.json")).unwrap();
    synthsense()
        .args(["analyze", "--json", "--fields", "disagreement"])
        .write_stdin(request)
        .assert()
        .success()
        .stdout(contains("\"classification\": \"conflict\""))
        .stdout(contains("\"verdict\"").not());
}

#[test]
fn analyze_human_output_has_sections() {
    synthsense()
        .args(["--no-color", "analyze", &fixture("composite.json")])
        .assert()
        .success()
        .stdout(contains("Verdict:"))
        .stdout(contains("Spatial:"))
        .stdout(contains("composite = true"))
        .stdout(contains("hotspot top-left"));
}

#[test]
fn analyze_unknown_field_fails() {
    synthsense()
        .args(["analyze", "--json", "--fields", "nope", &fixture("scenario_a.json")])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("unknown field: nope"));
}

#[test]
fn analyze_empty_request_fails() {
    synthsense()
        .args(["analyze", &fixture("empty.json")])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("no detector observations"));
}

#[test]
fn analyze_missing_file_fails() {
    synthsense()
        .args(["analyze", &fixture("does-not-exist.json")])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn check_ai_on_agreeing_detectors() {
    synthsense()
        .args(["check", "-i", &fixture("scenario_a.json"), "ai"])
        .assert()
        .success()
        .stdout(contains("true  ai  (actual: true)"));

    synthsense()
        .args(["check", "-i", &fixture("scenario_a.json"), "!ai"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn check_conflict_recommends_review() {
    synthsense()
        .args([
            "check",
            "--input",
            &fixture("scenario_b.json"),
            "conflict",
            "review",
            "recommendation=human_review_recommended",
        ])
        .assert()
        .success()
        .stdout(contains("overall = true"));
}

#[test]
fn check_composite() {
    synthsense()
        .args(["check", "-q", "-i", &fixture("composite.json"), "composite"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn check_degraded_run() {
    synthsense()
        .args(["check", "-i", &fixture("all_errored.json"), "degraded", "review"])
        .assert()
        .success();
}

#[test]
fn check_generator_attribution() {
    synthsense()
        .args([
            "check",
            "-i",
            &fixture("attribution.json"),
            "generator=midjourney",
        ])
        .assert()
        .success()
        .stdout(contains("(actual: Midjourney)"));
}

#[test]
fn check_any_mode_json() {
    synthsense()
        .args([
            "check",
            "--json",
            "--any",
            "-i",
            &fixture("scenario_a.json"),
            "composite",
            "verdict=AI_GENERATED",
        ])
        .assert()
        .success()
        .stdout(contains("\"mode\": \"any\""))
        .stdout(contains("\"overall\": true"));
}

#[test]
fn check_bad_predicate_fails() {
    synthsense()
        .args(["check", "-i", &fixture("scenario_a.json"), "verdict=sorta"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("invalid value"));
}

#[test]
fn check_without_predicates_fails() {
    synthsense()
        .args(["check", "-i", &fixture("scenario_a.json")])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn generators_lists_builtin_registry() {
    synthsense()
        .arg("generators")
        .assert()
        .success()
        .stdout(contains("Midjourney (generator)"))
        .stdout(contains("Real Photo (real_photo)"));
}

#[test]
fn schema_describes_report() {
    synthsense()
        .arg("schema")
        .assert()
        .success()
        .stdout(contains("\"FusionReport\""))
        .stdout(contains("\"uncertainty\""));
}

#[test]
fn config_honors_config_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("synthsense.toml");
    std::fs::write(&path, "[calibration]\nshrinkage = 0.25\n").unwrap();

    synthsense()
        .args(["config", "--config", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("shrinkage = 0.25"));
}

#[test]
fn invalid_config_flag_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[calibration]\nshrinkage = 3.0\n").unwrap();

    synthsense()
        .args(["--config", path.to_str().unwrap(), "analyze", &fixture("scenario_a.json")])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn no_args_prints_help() {
    Command::cargo_bin("synthsense")
        .unwrap()
        .assert()
        .failure()
        .stderr(contains("Usage"));
}
