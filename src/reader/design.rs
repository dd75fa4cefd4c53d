use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{CustomError, Result};
use crate::reader::pair::PairReader;

pub(crate) const NDF_EXTENSION: &str = "ndf";

/// Picks the design file for a run: an explicit path wins, then a lone
/// `.ndf` in `dir`, then the `.ndf` named after the `designname` recorded in
/// `pair_hint`.
pub fn locate_design(
    explicit: Option<&Path>,
    dir: &Path,
    pair_hint: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let mut candidates = list_ndf_files(dir)?;
    debug!("found {} design candidate(s) in {}", candidates.len(), dir.display());
    match candidates.len() {
        0 => Err(CustomError::DesignNotFound {
            dir: dir.to_path_buf(),
        }),
        1 => Ok(candidates.swap_remove(0)),
        n_candidates => {
            let design_name = match pair_hint {
                Some(pair) => PairReader::open(pair)?.design_name().map(str::to_string),
                None => None,
            };
            let matched = design_name.as_deref().and_then(|name| {
                candidates
                    .iter()
                    .position(|c| c.file_stem().and_then(|s| s.to_str()) == Some(name))
            });
            matched
                .map(|idx| candidates.swap_remove(idx))
                .ok_or_else(|| CustomError::DesignAmbiguous {
                    dir: dir.to_path_buf(),
                    n_candidates,
                    design_name,
                })
        }
    }
}

fn list_ndf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    // An empty parent means the working directory
    let read_dir_path = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    let entries = fs::read_dir(read_dir_path).map_err(|e| CustomError::ReadWithPath {
        source: e,
        path: read_dir_path.to_path_buf(),
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CustomError::ReadWithPath {
            source: e,
            path: read_dir_path.to_path_buf(),
        })?;
        let path = entry.path();
        let is_ndf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(NDF_EXTENSION));
        if is_ndf && path.is_file() {
            candidates.push(dir.join(entry.file_name()));
        }
    }
    candidates.sort();
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::pair::PAIR_HEADER;

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("nimbleqc-unit")
            .join(format!("{}-design-{}", std::process::id(), label));
        if dir.exists() {
            fs::remove_dir_all(&dir).unwrap();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn explicit_design_wins() {
        let dir = scratch_dir("explicit");
        let explicit = dir.join("elsewhere.ndf");
        let found = locate_design(Some(&explicit), &dir, None).unwrap();
        assert_eq!(found, explicit);
    }

    #[test]
    fn single_candidate_is_used() {
        let dir = scratch_dir("single");
        fs::write(dir.join("array.ndf"), "header\n").unwrap();
        fs::write(dir.join("notes.txt"), "not a design\n").unwrap();
        let found = locate_design(None, &dir, None).unwrap();
        assert_eq!(found, dir.join("array.ndf"));
    }

    #[test]
    fn missing_design_is_an_error() {
        let dir = scratch_dir("missing");
        assert!(matches!(
            locate_design(None, &dir, None),
            Err(CustomError::DesignNotFound { .. })
        ));
    }

    #[test]
    fn design_name_breaks_ties() {
        let dir = scratch_dir("tie");
        fs::write(dir.join("HG18_A.ndf"), "header\n").unwrap();
        fs::write(dir.join("HG18_B.ndf"), "header\n").unwrap();
        let pair = dir.join("s1.pair");
        fs::write(
            &pair,
            format!("# designname=HG18_B\n{}\n", PAIR_HEADER.join("\t")),
        )
        .unwrap();

        let found = locate_design(None, &dir, Some(&pair)).unwrap();
        assert_eq!(found, dir.join("HG18_B.ndf"));

        match locate_design(None, &dir, None) {
            Err(CustomError::DesignAmbiguous { n_candidates, .. }) => {
                assert_eq!(n_candidates, 2)
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
