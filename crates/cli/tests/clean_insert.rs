use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn run_trice(workdir: &Path, args: &[&str]) -> (bool, Value, String) {
    let output = Command::cargo_bin("trice")
        .expect("binary")
        .current_dir(workdir)
        .args(args)
        .output()
        .expect("command run");

    let stats: Value = serde_json::from_slice(&output.stdout).unwrap_or(Value::Null);
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    (output.status.success(), stats, stderr)
}

fn setup_tree(workdir: &Path, main_c: &str) {
    fs::create_dir_all(workdir.join("src")).unwrap();
    fs::write(workdir.join("src/main.c"), main_c).unwrap();
    fs::write(workdir.join("til.json"), b"").unwrap();
    fs::write(workdir.join("li.json"), b"").unwrap();
}

#[test]
fn insert_assigns_ids_and_writes_the_catalog() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    setup_tree(
        root,
        "void f(void) {\n    TRICE( \"boot\\n\" );\n    trice16( \"x=%d\\n\", x );\n}\n",
    );

    let (ok, stats, stderr) = run_trice(
        root,
        &[
            "insert",
            "--src",
            ".",
            "--til",
            "til.json",
            "--li",
            "li.json",
            "--id-min",
            "100",
            "--id-max",
            "200",
            "--id-method",
            "upward",
        ],
    );
    assert!(ok, "stderr: {stderr}");
    assert_eq!(stats["assigned"].as_u64(), Some(2));

    let source = fs::read_to_string(root.join("src/main.c")).unwrap();
    assert!(source.contains("TRICE( iD(100), \"boot\\n\" );"));
    assert!(source.contains("trice16( iD(101), \"x=%d\\n\", x );"));

    let til: Value = serde_json::from_str(&fs::read_to_string(root.join("til.json")).unwrap())
        .expect("valid catalog JSON");
    assert_eq!(til["100"]["Type"], "TRICE");
    assert_eq!(til["100"]["Strg"], "boot\\n");
    assert_eq!(til["101"]["Type"], "trice16_1");

    let li: Value = serde_json::from_str(&fs::read_to_string(root.join("li.json")).unwrap())
        .expect("valid location JSON");
    assert_eq!(li["101"]["File"].as_str().map(|f| f.ends_with("main.c")), Some(true));
    assert_eq!(li["101"]["Line"].as_u64(), Some(3));
}

#[test]
fn insert_twice_is_stable() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    setup_tree(root, "TRICE( \"tick %u\\n\", n );\n");

    let args = [
        "insert", "--src", ".", "--til", "til.json", "--li", "li.json", "--id-min", "100",
        "--id-max", "200", "--id-method", "upward",
    ];
    let (ok, _, _) = run_trice(root, &args);
    assert!(ok);
    let first = fs::read_to_string(root.join("src/main.c")).unwrap();
    let first_til = fs::read_to_string(root.join("til.json")).unwrap();

    let (ok, stats, _) = run_trice(root, &args);
    assert!(ok);
    assert_eq!(stats["assigned"].as_u64(), Some(0));
    assert_eq!(fs::read_to_string(root.join("src/main.c")).unwrap(), first);
    assert_eq!(fs::read_to_string(root.join("til.json")).unwrap(), first_til);
}

#[test]
fn clean_removes_ids_from_the_tree() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    setup_tree(root, "TRICE( iD(1234), \"done %u\\n\", n );\n");

    let (ok, stats, stderr) = run_trice(root, &["clean", "--src", "."]);
    assert!(ok, "stderr: {stderr}");
    assert_eq!(stats["removed"].as_u64(), Some(1));

    let source = fs::read_to_string(root.join("src/main.c")).unwrap();
    assert!(!source.contains("iD("));
    assert!(source.contains("TRICE( \"done %u\\n\", n );"));
}

#[test]
fn insert_without_an_id_list_fails_with_a_hint() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/main.c"), "TRICE( \"boot\\n\" );\n").unwrap();

    let (ok, _, stderr) = run_trice(root, &["insert", "--src", ".", "--til", "til.json"]);
    assert!(!ok);
    assert!(
        stderr.contains("create an empty file first"),
        "stderr: {stderr}"
    );
}

#[test]
fn unknown_id_method_is_rejected_by_the_parser() {
    let temp = tempdir().unwrap();
    let (ok, _, stderr) = run_trice(
        temp.path(),
        &["insert", "--til", "til.json", "--id-method", "sideways"],
    );
    assert!(!ok);
    assert!(stderr.contains("invalid value"), "stderr: {stderr}");
}
