//! Line-oriented input and part-file output.

use super::compression::open_reader;
use anyhow::{Context, Result, bail};
use std::fs::{File, create_dir_all};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Marker written after every part file is complete.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Name of the part file for reducer `index`.
pub fn part_file_name(index: usize) -> String {
    format!("part-r-{index:05}")
}

/// Lines of every input file, concatenated, with the offset where each file starts.
#[derive(Debug, Default)]
pub struct InputLines {
    pub lines: Vec<String>,
    files: Vec<(usize, PathBuf)>,
}

impl InputLines {
    /// Map a 1-based line of the concatenated input to its file and 1-based line
    /// within that file.
    pub fn locate(&self, line: u64) -> Option<(&Path, u64)> {
        let idx = usize::try_from(line.checked_sub(1)?).ok()?;
        if idx >= self.lines.len() {
            return None;
        }
        let file = self.files.partition_point(|(start, _)| *start <= idx).checked_sub(1)?;
        let (start, path) = &self.files[file];
        Some((path.as_path(), (idx - start + 1) as u64))
    }
}

/// Read all lines of `paths`, in order, into memory.
///
/// Carriage returns before the newline are stripped; blank lines are kept so line
/// numbers stay meaningful (the runner ignores them).
///
/// # Errors
/// Returns an error if a file cannot be opened, decompressed, or read.
pub fn read_lines<P: AsRef<Path>>(paths: &[P]) -> Result<InputLines> {
    let mut out = InputLines::default();
    for path in paths {
        let path = path.as_ref();
        out.files.push((out.lines.len(), path.to_path_buf()));
        let reader = open_reader(path)?;
        for (idx, line) in reader.lines().enumerate() {
            let mut line =
                line.with_context(|| format!("read line {} in {}", idx + 1, path.display()))?;
            if line.ends_with('\r') {
                line.pop();
            }
            out.lines.push(line);
        }
        tracing::debug!(path = %path.display(), total_lines = out.lines.len(), "read input file");
    }
    Ok(out)
}

/// Write one part file per partition plus the success marker into `dir`.
///
/// `dir` must not exist yet; it is created along with missing parents.
/// Returns the part file paths.
///
/// # Errors
/// Returns an error if `dir` already exists or any write fails.
pub fn write_partitions(dir: impl AsRef<Path>, partitions: &[Vec<String>]) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if dir.exists() {
        bail!("output directory {} already exists", dir.display());
    }
    create_dir_all(dir).with_context(|| format!("mkdir -p {}", dir.display()))?;

    let mut written = Vec::with_capacity(partitions.len());
    for (i, rows) in partitions.iter().enumerate() {
        let path = dir.join(part_file_name(i));
        let f = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let mut w = BufWriter::new(f);
        for row in rows {
            w.write_all(row.as_bytes())
                .and_then(|()| w.write_all(b"\n"))
                .with_context(|| format!("write {}", path.display()))?;
        }
        w.flush().with_context(|| format!("flush {}", path.display()))?;
        written.push(path);
    }

    let marker = dir.join(SUCCESS_MARKER);
    File::create(&marker).with_context(|| format!("create {}", marker.display()))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_parts_and_marker() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("out");
        let parts = vec![vec!["A,C1,K1,X".to_string()], vec![]];
        let written = write_partitions(&out, &parts)?;
        assert_eq!(written.len(), 2);
        assert_eq!(std::fs::read_to_string(out.join("part-r-00000"))?, "A,C1,K1,X\n");
        assert_eq!(std::fs::read_to_string(out.join("part-r-00001"))?, "");
        assert!(out.join(SUCCESS_MARKER).exists());

        assert!(write_partitions(&out, &parts).is_err());
        Ok(())
    }

    #[test]
    fn reads_lines_across_files_stripping_cr() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "A,X,C1,K1,5\r\n\r\n")?;
        std::fs::write(&b, "B,Y,C1,K1,7")?;
        let input = read_lines(&[a, b])?;
        assert_eq!(input.lines, vec!["A,X,C1,K1,5", "", "B,Y,C1,K1,7"]);
        Ok(())
    }

    #[test]
    fn locates_lines_within_their_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let a = dir.path().join("a.txt");
        let empty = dir.path().join("empty.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "1\n2\n")?;
        std::fs::write(&empty, "")?;
        std::fs::write(&b, "3\n4\n5\n")?;
        let input = read_lines(&[&a, &empty, &b])?;

        assert_eq!(input.locate(2), Some((a.as_path(), 2)));
        assert_eq!(input.locate(3), Some((b.as_path(), 1)));
        assert_eq!(input.locate(5), Some((b.as_path(), 3)));
        assert_eq!(input.locate(0), None);
        assert_eq!(input.locate(6), None);
        Ok(())
    }
}
