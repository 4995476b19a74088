use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn taskboard_help_works() {
    Command::cargo_bin("taskboard")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Usage: taskboard"));
}

#[test]
fn subcommand_help_works() {
    let subcommands: [&[&str]; 8] = [
        &["serve"],
        &["board"],
        &["task"],
        &["task", "add"],
        &["task", "list"],
        &["task", "edit"],
        &["task", "move"],
        &["task", "rm"],
    ];

    for cmd in subcommands {
        Command::cargo_bin("taskboard")
            .expect("binary")
            .args(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}
