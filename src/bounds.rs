//! Bounds Extraction & Slot Validation
//!
//! One authoritative walk over the template's slot tree produces two text
//! artifacts: a geometry report (`name=width,height` per image-capable
//! slot) and a validation report (`ALL_LAYERS_FOUND` or
//! `MISSING_LAYERS:a,b,c` followed by a debug dump of every slot visited).
//! For live runs the same artifacts are produced inside the host by the
//! emitted extraction script and parsed back here; the parsers are lenient
//! about everything except the first validation line.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::slots::{Slot, SlotGeometry};

pub const GEOMETRY_REPORT_FILE: &str = "layer_bounds.txt";
pub const VALIDATION_REPORT_FILE: &str = "layer_validation.txt";

pub const ALL_FOUND_LINE: &str = "ALL_LAYERS_FOUND";
pub const MISSING_PREFIX: &str = "MISSING_LAYERS:";

/// Result of walking a slot tree against a required-name set.
#[derive(Debug, Clone)]
pub struct BoundsScan {
    /// `name=width,height` lines, traversal order.
    geometry_lines: Vec<String>,
    /// Every visited slot name, traversal order, duplicates included.
    visited: Vec<String>,
    /// Debug dump lines for the validation report tail.
    dump_lines: Vec<String>,
    /// Required names absent from the visited set, order-preserving,
    /// de-duplicated.
    missing: Vec<String>,
}

impl BoundsScan {
    /// The single extraction walk. Membership of required names is checked
    /// against ALL visited slots, not only image-capable ones.
    pub fn run(root: &Slot, required: &[String]) -> Self {
        let mut geometry_lines = vec![];
        let mut visited = vec![];
        let mut dump_lines = vec![];

        root.visit(0, &mut |depth, slot| {
            visited.push(slot.name.clone());
            dump_lines.push(format!(
                "# depth={} kind={} name={}",
                depth,
                slot.kind.label(),
                slot.name
            ));
            if slot.geometry_eligible() {
                if let Some(SlotGeometry { width, height }) = slot.geometry {
                    geometry_lines.push(format!("{}={},{}", slot.name, width, height));
                }
            }
        });

        let mut missing = vec![];
        for name in required {
            if !visited.iter().any(|v| v == name) && !missing.contains(name) {
                missing.push(name.clone());
            }
        }

        Self {
            geometry_lines,
            visited,
            dump_lines,
            missing,
        }
    }

    pub fn visited_names(&self) -> &[String] {
        &self.visited
    }

    pub fn missing_names(&self) -> &[String] {
        &self.missing
    }

    pub fn geometry_report(&self) -> String {
        let mut out = self.geometry_lines.join("\n");
        out.push('\n');
        out
    }

    pub fn validation_report(&self) -> String {
        let first = if self.missing.is_empty() {
            ALL_FOUND_LINE.to_string()
        } else {
            format!("{}{}", MISSING_PREFIX, self.missing.join(","))
        };
        let mut lines = vec![first];
        lines.extend(self.dump_lines.iter().cloned());
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Persist both artifacts. A write failure here is a fatal
    /// configuration error, not a retryable condition.
    pub fn write_reports(&self, dir: &Path) -> Result<(PathBuf, PathBuf), std::io::Error> {
        fs::create_dir_all(dir)?;
        let geometry_path = dir.join(GEOMETRY_REPORT_FILE);
        let validation_path = dir.join(VALIDATION_REPORT_FILE);
        fs::write(&geometry_path, self.geometry_report())?;
        fs::write(&validation_path, self.validation_report())?;
        Ok((geometry_path, validation_path))
    }
}

/// Immutable slot-name -> geometry mapping, built once per run.
#[derive(Debug, Clone, Default)]
pub struct BoundsMap {
    entries: HashMap<String, SlotGeometry>,
}

impl BoundsMap {
    /// Parse a geometry report. Malformed lines (no `=`, non-integer or
    /// non-positive dimensions) are skipped with a warning; they never
    /// abort parsing of subsequent lines.
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_bounds_line(line) {
                Some((name, geometry)) => {
                    entries.insert(name, geometry);
                }
                None => {
                    warn!(line, "skipping malformed bounds line");
                }
            }
        }
        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn get(&self, slot_name: &str) -> Option<SlotGeometry> {
        self.entries.get(slot_name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_bounds_line(line: &str) -> Option<(String, SlotGeometry)> {
    // Split on the LAST '=' so slot names containing '=' still parse.
    let (name, dims) = line.rsplit_once('=')?;
    let (w, h) = dims.split_once(',')?;
    let width: u32 = w.trim().parse().ok()?;
    let height: u32 = h.trim().parse().ok()?;
    if width == 0 || height == 0 || name.is_empty() {
        return None;
    }
    Some((name.to_string(), SlotGeometry { width, height }))
}

/// First-line verdict of a validation report. Everything after the first
/// line is free-form debug text and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    AllFound,
    Missing(Vec<String>),
}

impl ValidationOutcome {
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.lines().next()?.trim();
        if first == ALL_FOUND_LINE {
            return Some(Self::AllFound);
        }
        let rest = first.strip_prefix(MISSING_PREFIX)?;
        let names: Vec<String> = rest
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Some(Self::Missing(names))
    }

    pub fn load(path: &Path) -> Result<Option<Self>, std::io::Error> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::Slot;

    fn tree() -> Slot {
        Slot::container(
            "root",
            vec![
                Slot::image("Image 1", 800, 600),
                Slot::text("Image Caption"),
                Slot::container("Title", vec![Slot::text("Headline")]),
            ],
        )
    }

    #[test]
    fn all_found_when_every_name_visited() {
        let required = vec!["Title".to_string(), "Image 1".to_string()];
        let scan = BoundsScan::run(&tree(), &required);
        assert!(scan.missing_names().is_empty());
        assert!(scan.validation_report().starts_with(ALL_FOUND_LINE));
    }

    #[test]
    fn missing_names_are_order_preserving_and_deduped() {
        let required = vec![
            "Ghost".to_string(),
            "Image 1".to_string(),
            "Phantom".to_string(),
            "Ghost".to_string(),
        ];
        let scan = BoundsScan::run(&tree(), &required);
        assert_eq!(scan.missing_names(), ["Ghost", "Phantom"]);
        assert!(scan
            .validation_report()
            .starts_with("MISSING_LAYERS:Ghost,Phantom"));
    }

    #[test]
    fn geometry_excludes_wrong_kind_but_dump_includes_it() {
        let scan = BoundsScan::run(&tree(), &[]);
        let report = scan.geometry_report();
        assert_eq!(report, "Image 1=800,600\n");
        // Name-only match "Image Caption" is still visited.
        assert!(scan.visited_names().contains(&"Image Caption".to_string()));
        assert!(scan.validation_report().contains("name=Image Caption"));
    }

    #[test]
    fn extraction_is_idempotent() {
        let required = vec!["Title".to_string()];
        let a = BoundsScan::run(&tree(), &required);
        let b = BoundsScan::run(&tree(), &required);
        assert_eq!(a.geometry_report(), b.geometry_report());
        assert_eq!(a.validation_report(), b.validation_report());
    }

    #[test]
    fn bounds_map_skips_malformed_lines() {
        let text = "Image 1=800,600\nbroken\nBad=0,50\nWorse=12,-4\nImage 2=640,480\n";
        let map = BoundsMap::parse(text);
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.get("Image 1"),
            Some(SlotGeometry {
                width: 800,
                height: 600
            })
        );
        assert_eq!(
            map.get("Image 2"),
            Some(SlotGeometry {
                width: 640,
                height: 480
            })
        );
        assert_eq!(map.get("Bad"), None);
    }

    #[test]
    fn validation_parse_reads_only_first_line() {
        let ok = "ALL_LAYERS_FOUND\n# depth=0 kind=container name=root\n";
        assert_eq!(ValidationOutcome::parse(ok), Some(ValidationOutcome::AllFound));

        let missing = "MISSING_LAYERS:Title\nMISSING_LAYERS:NotParsed\n";
        assert_eq!(
            ValidationOutcome::parse(missing),
            Some(ValidationOutcome::Missing(vec!["Title".to_string()]))
        );

        assert_eq!(ValidationOutcome::parse("garbage\n"), None);
    }
}
