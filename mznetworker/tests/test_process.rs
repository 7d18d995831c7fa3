use std::{error::Error, fs, path::PathBuf, process::Command};

use assert_cmd::prelude::*;
use predicates::prelude::*;

fn output_dir(name: &str) -> PathBuf {
    let path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    if path.exists() {
        fs::remove_dir_all(&path).unwrap();
    }
    path
}

#[test]
fn test_file_missing() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mznetworker")?;
    let out = output_dir("file_missing");

    cmd.arg("not_real.tsv").arg("-o").arg(&out);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"));
    assert!(!out.exists());
    Ok(())
}

#[test]
fn test_unsupported_file_type() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mznetworker")?;
    let out = output_dir("xlsx");

    cmd.arg("features.xlsx").arg("-o").arg(&out);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("UnsupportedFileType"));
    assert!(!out.exists());
    Ok(())
}

#[test]
fn test_malformed_start_node() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mznetworker")?;

    cmd.arg("./tests/data/features.tsv").args(["-p", "1500"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("does not start with \"M_\""));

    let mut cmd = Command::cargo_bin("mznetworker")?;
    cmd.arg("./tests/data/features.tsv").args(["-x", "G345"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Expected a mass entry of the form LABEL=MASS"));
    Ok(())
}

#[test]
fn test_run_network() -> Result<(), Box<dyn Error>> {
    let out = output_dir("run_network");
    let mut cmd = Command::cargo_bin("mznetworker")?;
    cmd.env("RUST_LOG", "info");
    cmd.arg("./tests/data/features.tsv")
        .arg("-o")
        .arg(&out)
        .args(["-p", "M_1500", "-c", "3"]);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Dropped 1 of 7 rows"))
        .stderr(predicate::str::contains(
            "Network generated with 4 nodes and 3 edges",
        ))
        .stderr(predicate::str::contains("Found 1 sequences from M_1500"));

    let edges = fs::read_to_string(out.join("net.txt"))?;
    let mut lines = edges.lines();
    assert_eq!(
        lines.next(),
        Some("Node1\tedge\tNode2\tbase\tppm\tlog-intensity1\tlog-intensity2")
    );
    assert!(lines
        .next()
        .unwrap()
        .starts_with("M_1500\tmassdiff\tM_1805\tC\t"));
    assert_eq!(lines.count(), 2);

    let nodes = fs::read_to_string(out.join("nodes.txt"))?;
    assert_eq!(nodes.lines().count(), 5);

    let paths = fs::read_to_string(out.join("paths.txt"))?;
    assert!(paths.contains("start-C-A-G\tM_1500-M_1805-M_2134-M_2479\tppm-"));

    let fragments = fs::read_to_string(out.join("fragments.txt"))?;
    let rows: Vec<_> = fragments.lines().collect();
    assert_eq!(
        rows[0],
        "Group\tNodeName\tBase\tMonoisotopic Mass\tSum Intensity\tApex RT"
    );
    assert_eq!(rows.len(), 5);
    assert!(rows[1].starts_with("1\tM_1500\tstart\t"));
    assert!(rows[4].starts_with("1\tM_2479\tG\t"));
    assert!(rows[4].ends_with("\t11.8"));

    let elements = fs::read_to_string(out.join("network.json"))?;
    assert!(elements.contains("\"M_1500-M_1805\""));
    assert!(out.join("params.toml").exists());
    Ok(())
}

#[test]
fn test_run_cutoffs() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mznetworker")?;
    cmd.env("RUST_LOG", "info");
    cmd.arg("./tests/data/features.tsv.gz")
        .arg("-o")
        .arg(output_dir("run_cutoffs"))
        .args(["-m", "0", "-t", "10"]);
    cmd.assert().success().stderr(predicate::str::contains(
        "Network generated with 5 nodes and 4 edges",
    ));

    let mut cmd = Command::cargo_bin("mznetworker")?;
    cmd.env("RUST_LOG", "info");
    cmd.arg("./tests/data/features.tsv")
        .arg("-o")
        .arg(output_dir("run_mass_table"))
        .args(["-f", "./tests/data/short_mass_table.csv"]);
    cmd.assert().success().stderr(predicate::str::contains(
        "Network generated with 3 nodes and 2 edges",
    ));
    Ok(())
}

#[test]
fn test_from_network() -> Result<(), Box<dyn Error>> {
    let first = output_dir("first_pass");
    let mut cmd = Command::cargo_bin("mznetworker")?;
    cmd.arg("./tests/data/features.tsv").arg("-o").arg(&first);
    cmd.assert().success();

    let second = output_dir("second_pass");
    let mut cmd = Command::cargo_bin("mznetworker")?;
    cmd.env("RUST_LOG", "info");
    cmd.arg(&first)
        .arg("-o")
        .arg(&second)
        .args(["-n", "-p", "M_1805", "-c", "1"]);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains(
            "Network generated with 4 nodes and 3 edges",
        ))
        .stderr(predicate::str::contains("Found 2 sequences from M_1805"));
    assert!(!second.join("net.txt").exists());
    assert!(!second.join("fragments.txt").exists());
    assert!(second.join("paths.txt").exists());
    Ok(())
}
