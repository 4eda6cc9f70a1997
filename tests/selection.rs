use anyhow::Result;
use std::collections::BTreeSet;
use topmatch::config::JobConfig;
use topmatch::job::run_lines;
use topmatch::runner::Runner;
use topmatch::testing::*;

fn count_config(k: usize) -> JobConfig {
    JobConfig {
        class_attr_ord: Some(0),
        match_count: k,
        ..JobConfig::default()
    }
}

fn distance_config(d: u64) -> JobConfig {
    JobConfig {
        class_attr_ord: Some(0),
        nearest_by_distance: Some(true),
        match_distance: d,
        ..JobConfig::default()
    }
}

fn lines_of(rows: &[&str]) -> Vec<String> {
    rows.iter().map(|s| s.to_string()).collect()
}

#[test]
fn count_based_keeps_lowest_ranks_in_order() -> Result<()> {
    let out = run_lines(&count_config(2), &Runner::sequential(), &sample_pairs())?;
    assert_eq!(
        out.formatted(","),
        vec![lines_of(&[
            "A,C1,K1,Z",
            "A,C1,K1,X",
            "A,C1,K2,V",
            "B,C2,K1,X",
            "B,C2,K1,Y",
        ])]
    );
    assert_eq!(out.counters.reduce_groups, 3);
    assert_eq!(out.counters.rows_emitted, 5);
    Ok(())
}

#[test]
fn count_larger_than_group_keeps_everything() -> Result<()> {
    let out = run_lines(&count_config(100), &Runner::sequential(), &sample_pairs())?;
    assert_eq!(out.rows().count(), sample_pairs().len());
    Ok(())
}

#[test]
fn equal_ranks_keep_input_order() -> Result<()> {
    let out = run_lines(&count_config(3), &Runner::sequential(), &sample_pairs())?;
    let first_group: Vec<String> = out.formatted(",")[0][..3].to_vec();
    assert_eq!(first_group, lines_of(&["A,C1,K1,Z", "A,C1,K1,X", "A,C1,K1,Y"]));
    Ok(())
}

#[test]
fn distance_based_keeps_ranks_within_threshold() -> Result<()> {
    let out = run_lines(&distance_config(10), &Runner::sequential(), &sample_pairs())?;
    assert_eq!(
        out.formatted(","),
        vec![lines_of(&["A,C1,K1,Z", "A,C1,K1,X", "B,C2,K1,X"])]
    );
    // (A, C1, K2) only has rank 250 and produces nothing.
    assert_eq!(out.counters.groups_empty, 1);
    assert_eq!(out.counters.reduce_groups, 3);
    Ok(())
}

#[test]
fn distance_threshold_is_inclusive() -> Result<()> {
    let out = run_lines(&distance_config(200), &Runner::sequential(), &sample_pairs())?;
    assert!(sorted_lines(&out, ",").contains(&"B,C2,K1,Y".to_string()));
    assert!(!sorted_lines(&out, ",").contains(&"A,C1,K2,V".to_string()));
    Ok(())
}

#[test]
fn single_neighbor_examples() -> Result<()> {
    let input = vec![pair_line("A", "X", "C1", "K1", 5), pair_line("A", "Y", "C1", "K1", 15)];
    let by_count = run_lines(&count_config(1), &Runner::sequential(), &input)?;
    let by_distance = run_lines(&distance_config(10), &Runner::sequential(), &input)?;
    assert_eq!(by_count.formatted(","), vec![lines_of(&["A,C1,K1,X"])]);
    assert_eq!(by_distance.formatted(","), vec![lines_of(&["A,C1,K1,X"])]);
    Ok(())
}

#[test]
fn compact_output_lists_group_on_one_row() -> Result<()> {
    let input = vec![
        pair_line("A", "Z", "C1", "K1", 30),
        pair_line("A", "X", "C1", "K1", 10),
        pair_line("A", "Y", "C1", "K1", 20),
    ];
    let cfg = JobConfig {
        compact_output: true,
        ..count_config(3)
    };
    let out = run_lines(&cfg, &Runner::sequential(), &input)?;
    assert_eq!(out.formatted(","), vec![lines_of(&["A,C1,K1,X,Y,Z"])]);
    Ok(())
}

#[test]
fn compact_and_per_neighbor_carry_the_same_pairs() -> Result<()> {
    let input = synthetic_pairs(6, 9);
    for cfg in [count_config(4), distance_config(40)] {
        let compact_cfg = JobConfig {
            compact_output: true,
            ..cfg.clone()
        };
        let per_neighbor = run_lines(&cfg, &Runner::sequential(), &input)?;
        let compact = run_lines(&compact_cfg, &Runner::sequential(), &input)?;

        let expand = |out: &topmatch::JobOutput| -> Vec<String> {
            out.rows()
                .flat_map(|row| {
                    row.pairs()
                        .map(|(p, t)| {
                            format!("{},{},{},{t}", p.source_id, p.source_class, p.target_class)
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        };
        assert_eq!(expand(&per_neighbor), expand(&compact));
        assert!(compact.rows().all(|r| !r.targets.is_empty()));
    }
    Ok(())
}

#[test]
fn every_row_comes_from_a_matching_input_group() -> Result<()> {
    let input = synthetic_pairs(5, 7);
    let input_groups: BTreeSet<String> = input
        .iter()
        .map(|l| {
            let f: Vec<&str> = l.split(',').collect();
            format!("{},{},{}|{}", f[0], f[2], f[3], f[1])
        })
        .collect();
    let out = run_lines(&count_config(3), &Runner::sequential(), &input)?;
    for row in out.rows() {
        for (p, t) in row.pairs() {
            let key = format!("{},{},{}|{t}", p.source_id, p.source_class, p.target_class);
            assert!(input_groups.contains(&key), "{key} not in input");
        }
    }
    Ok(())
}

#[test]
fn class_ordinal_selects_attribute_in_both_blocks() -> Result<()> {
    let cfg = JobConfig {
        class_attr_ord: Some(1),
        match_count: 1,
        ..JobConfig::default()
    };
    let out = run_lines(&cfg, &Runner::sequential(), &sample_multi_attribute_pairs())?;
    assert_eq!(
        out.formatted(","),
        vec![lines_of(&[
            "P1,gold,gold,Q3",
            "P1,gold,silver,Q2",
            "P2,silver,silver,Q1",
        ])]
    );
    Ok(())
}

#[test]
fn class_ordinal_past_the_block_fails_setup() {
    let cfg = JobConfig {
        class_attr_ord: Some(2),
        ..JobConfig::default()
    };
    let err = run_lines(&cfg, &Runner::sequential(), &sample_multi_attribute_pairs()).unwrap_err();
    assert!(format!("{err:#}").contains("out of bounds"));
}

#[test]
fn malformed_records_are_skipped_and_counted() -> Result<()> {
    let mut input = sample_pairs();
    input.push(RecordLineBuilder::new("A", "Q").classes("C1", "K1").raw_rank("abc").build());
    input.push(RecordLineBuilder::new("A", "Q").classes("C1", "K1").raw_rank("-3").build());
    input.push("A,Q,C1,C9,K1,K9,1".to_string());
    input.push("A,Q".to_string());
    input.push(String::new());

    let out = run_lines(&count_config(2), &Runner::sequential(), &input)?;
    let clean = run_lines(&count_config(2), &Runner::sequential(), &sample_pairs())?;
    assert_same_rows(&out, &clean);
    assert_eq!(out.counters.records_malformed, 4);
    assert_eq!(out.errors.error_count(), 4);
    // Blank lines are not records.
    assert_eq!(out.counters.records_read, sample_pairs().len() as u64 + 4);
    Ok(())
}

#[test]
fn ambiguous_policy_is_rejected() {
    let cfg = JobConfig {
        nearest_by_count: Some(true),
        ..distance_config(10)
    };
    let err = run_lines(&cfg, &Runner::sequential(), &sample_pairs()).unwrap_err();
    assert!(format!("{err:#}").contains("ambiguous"));
}

#[test]
fn empty_input_produces_no_rows() -> Result<()> {
    let out = run_lines(&count_config(2), &Runner::sequential(), &[])?;
    assert_eq!(out.rows().count(), 0);
    assert_eq!(out.counters.records_read, 0);
    Ok(())
}
