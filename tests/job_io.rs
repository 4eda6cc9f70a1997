use anyhow::Result;
use std::fs;
use std::path::Path;
use topmatch::config::JobConfig;
use topmatch::job::{JobSpec, run_job};
use topmatch::testing::*;

fn read_output(dir: &Path) -> Result<Vec<String>> {
    let mut rows = Vec::new();
    let mut names: Vec<_> = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<_>>()?;
    names.sort();
    for name in names.iter().filter(|n| n.starts_with("part-r-")) {
        rows.extend(fs::read_to_string(dir.join(name))?.lines().map(str::to_string));
    }
    rows.sort();
    Ok(rows)
}

#[test]
fn reads_directory_of_parts_and_skips_markers() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("input");
    fs::create_dir(&input)?;
    let lines = sample_pairs();
    fs::write(input.join("part-m-00000"), lines[..4].join("\n"))?;
    fs::write(input.join("part-m-00001"), lines[4..].join("\n"))?;
    fs::write(input.join("_SUCCESS"), "")?;
    fs::write(input.join(".part-m-00000.crc"), "garbage")?;

    let config = JobConfig {
        class_attr_ord: Some(0),
        match_count: 1,
        ..JobConfig::default()
    };
    let out = tmp.path().join("out");
    let summary = run_job(&JobSpec::new(
        vec![input.to_string_lossy().into_owned()],
        &out,
        config,
    ))?;

    assert_eq!(summary.report.counters.records_read, lines.len() as u64);
    assert_eq!(summary.errors.error_count(), 0);
    assert_eq!(
        read_output(&out)?,
        vec!["A,C1,K1,Z", "A,C1,K2,V", "B,C2,K1,X"]
    );
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn reads_gzip_input_through_glob() -> Result<()> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let tmp = tempfile::tempdir()?;
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(sample_pairs().join("\n").as_bytes())?;
    fs::write(tmp.path().join("pairs-1.txt.gz"), enc.finish()?)?;

    let config = JobConfig {
        class_attr_ord: Some(0),
        nearest_by_distance: Some(true),
        match_distance: 10,
        compact_output: true,
        ..JobConfig::default()
    };
    let pattern = tmp.path().join("pairs-*.gz").to_string_lossy().into_owned();
    let out = tmp.path().join("out");
    run_job(&JobSpec::new(vec![pattern], &out, config))?;

    assert_eq!(read_output(&out)?, vec!["A,C1,K1,Z,X", "B,C2,K1,X"]);
    Ok(())
}

#[test]
fn toml_config_with_property_names_drives_the_job() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("pairs.tsv");
    let tsv: Vec<String> = sample_pairs().iter().map(|l| l.replace(',', "\t")).collect();
    fs::write(&input, tsv.join("\n"))?;

    let config_path = tmp.path().join("job.toml");
    fs::write(
        &config_path,
        r#"
"field.delim" = ";"
"field.delim.regex" = "\\t"
"tmc.class.attr.ord" = 0
"tmc.top.match.count" = 1
"tmc.num.reducer" = 2
"#,
    )?;
    let config = JobConfig::load(&config_path)?;

    let out = tmp.path().join("out");
    let summary = run_job(&JobSpec::new(
        vec![input.to_string_lossy().into_owned()],
        &out,
        config,
    ))?;
    assert_eq!(summary.parts.len(), 2);
    assert_eq!(
        read_output(&out)?,
        vec!["A;C1;K1;Z", "A;C1;K2;V", "B;C2;K1;X"]
    );
    Ok(())
}

#[test]
fn error_report_lists_skipped_lines() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("pairs.txt");
    let mut lines = sample_pairs();
    lines.insert(1, "A,X,C1,K1,not-a-rank".to_string());
    fs::write(&input, lines.join("\n"))?;

    let config = JobConfig {
        class_attr_ord: Some(0),
        ..JobConfig::default()
    };
    let mut spec = JobSpec::new(
        vec![input.to_string_lossy().into_owned()],
        tmp.path().join("out"),
        config,
    );
    spec.errors_out = Some(tmp.path().join("errors.json"));
    run_job(&spec)?;

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("errors.json"))?)?;
    assert_eq!(report[0]["line"], 2);
    assert!(report[0]["message"].as_str().unwrap_or_default().contains("malformed"));
    Ok(())
}

#[test]
fn error_report_names_the_file_and_its_line() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("input");
    fs::create_dir(&input)?;
    let lines = sample_pairs();
    fs::write(input.join("part-m-00000"), lines[..4].join("\n"))?;
    let second = [lines[4].as_str(), "A,Q,C1,K1", lines[5].as_str()];
    fs::write(input.join("part-m-00001"), second.join("\n"))?;

    let config = JobConfig {
        class_attr_ord: Some(0),
        ..JobConfig::default()
    };
    let mut spec = JobSpec::new(
        vec![input.to_string_lossy().into_owned()],
        tmp.path().join("out"),
        config,
    );
    spec.errors_out = Some(tmp.path().join("errors.json"));
    let summary = run_job(&spec)?;

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("errors.json"))?)?;
    let source = report[0]["source"].as_str().unwrap_or_default();
    assert!(source.ends_with("part-m-00001"), "{source}");
    assert_eq!(report[0]["line"], 2);
    assert!(summary.errors.errors()[0].to_string().contains("part-m-00001:2:"));
    Ok(())
}
