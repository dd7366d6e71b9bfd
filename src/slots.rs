//! Slot Model - The Template As A Tree
//!
//! A template is a tree of named slots. Containers nest other slots;
//! traversal is depth-first with siblings in document order. Duplicate
//! names across containers resolve to whichever slot is visited first;
//! this mirrors the host's own lookup order and is a known limitation,
//! not something this crate disambiguates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    /// Holds a replaceable embedded raster image (host "smart object").
    Image,
    /// Holds directly editable text content.
    Text,
    /// Nests other slots.
    Container,
    Other,
}

impl SlotKind {
    pub fn label(&self) -> &'static str {
        match self {
            SlotKind::Image => "image",
            SlotKind::Text => "text",
            SlotKind::Container => "container",
            SlotKind::Other => "other",
        }
    }
}

/// Width and height in device pixels that a replacement image must fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotGeometry {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    pub kind: SlotKind,
    #[serde(default)]
    pub geometry: Option<SlotGeometry>,
    #[serde(default)]
    pub children: Vec<Slot>,
}

impl Slot {
    pub fn container(name: impl Into<String>, children: Vec<Slot>) -> Self {
        Self {
            name: name.into(),
            kind: SlotKind::Container,
            geometry: None,
            children,
        }
    }

    pub fn image(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            kind: SlotKind::Image,
            geometry: Some(SlotGeometry { width, height }),
            children: vec![],
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SlotKind::Text,
            geometry: None,
            children: vec![],
        }
    }

    /// Eligible for the geometry report: name mentions "image" and the
    /// slot actually is image-capable. Name-only matches are visited and
    /// dumped but never emit geometry.
    pub fn geometry_eligible(&self) -> bool {
        self.kind == SlotKind::Image && self.name.to_lowercase().contains("image")
    }

    /// Depth-first walk, self first, then children in document order.
    pub fn visit<'a>(&'a self, depth: usize, f: &mut impl FnMut(usize, &'a Slot)) {
        f(depth, self);
        for child in &self.children {
            child.visit(depth + 1, f);
        }
    }

    /// First slot with the given name in traversal order.
    pub fn find(&self, name: &str) -> Option<&Slot> {
        let mut found = None;
        self.visit(0, &mut |_, slot| {
            if found.is_none() && slot.name == name {
                found = Some(slot);
            }
        });
        found
    }

    /// First text-capable slot anywhere inside this slot (not counting
    /// the slot itself), traversal order. Used by nested-text bindings.
    pub fn first_nested_text(&self) -> Option<&Slot> {
        for child in &self.children {
            let mut found = None;
            child.visit(0, &mut |_, slot| {
                if found.is_none() && slot.kind == SlotKind::Text {
                    found = Some(slot);
                }
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

/// Load a slot-tree snapshot (JSON) for offline inspection.
pub fn load_snapshot(path: &std::path::Path) -> Result<Slot, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Slot {
        Slot::container(
            "root",
            vec![
                Slot::image("Image 1", 800, 600),
                Slot::container(
                    "Title",
                    vec![Slot::text("Headline"), Slot::text("Subhead")],
                ),
                Slot::text("Footer"),
            ],
        )
    }

    #[test]
    fn visit_is_depth_first_document_order() {
        let tree = sample_tree();
        let mut names = vec![];
        tree.visit(0, &mut |depth, slot| names.push((depth, slot.name.clone())));
        assert_eq!(
            names,
            vec![
                (0, "root".to_string()),
                (1, "Image 1".to_string()),
                (1, "Title".to_string()),
                (2, "Headline".to_string()),
                (2, "Subhead".to_string()),
                (1, "Footer".to_string()),
            ]
        );
    }

    #[test]
    fn find_resolves_first_match() {
        let tree = Slot::container(
            "root",
            vec![
                Slot::container("a", vec![Slot::text("Dup")]),
                Slot::image("Dup", 100, 100),
            ],
        );
        // "Dup" inside container "a" is visited before the image slot.
        assert_eq!(tree.find("Dup").unwrap().kind, SlotKind::Text);
    }

    #[test]
    fn first_nested_text_stops_at_first() {
        let tree = sample_tree();
        let title = tree.find("Title").unwrap();
        assert_eq!(title.first_nested_text().unwrap().name, "Headline");
    }

    #[test]
    fn geometry_eligibility_requires_kind_and_name() {
        assert!(Slot::image("Hero Image", 10, 10).geometry_eligible());
        assert!(!Slot::text("Image Caption").geometry_eligible());
        assert!(!Slot::image("Background", 10, 10).geometry_eligible());
    }
}
