// ============================================================
// Layer 3 — ClassIndex Domain Type
// ============================================================
// Maps class folder names to integer labels.
//
// Labels are assigned by sorting the folder names, so the
// same dataset always produces the same mapping:
//
//   dataset/
//     cover_drive/   → 0
//     pull_shot/     → 1
//     sweep/         → 2
//
// On disk this is stored as a JSON object, one entry per class:
//   {"cover_drive": 0, "pull_shot": 1, "sweep": 2}
//
// Reference: Rust Book §8 (Collections)
//            serde container attributes (from / try_from)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered list of class names; a class's label is its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, usize>",
    into = "BTreeMap<String, usize>"
)]
pub struct ClassIndex {
    classes: Vec<String>,
}

impl ClassIndex {
    /// Build an index from unsorted class names. Duplicates are dropped.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = names.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Label for a class name, if the class exists
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(name)).ok()
    }

    /// Class name for a label, if the label is in range
    pub fn label(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.classes
    }
}

impl From<ClassIndex> for BTreeMap<String, usize> {
    fn from(index: ClassIndex) -> Self {
        index
            .classes
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect()
    }
}

impl TryFrom<BTreeMap<String, usize>> for ClassIndex {
    type Error = anyhow::Error;

    fn try_from(map: BTreeMap<String, usize>) -> Result<Self> {
        let n = map.len();
        let mut slots: Vec<Option<String>> = vec![None; n];

        for (name, idx) in map {
            if idx >= n {
                bail!("class '{}' has index {} but only {} classes exist", name, idx, n);
            }
            if slots[idx].is_some() {
                bail!("class index {} is assigned more than once", idx);
            }
            slots[idx] = Some(name);
        }

        let classes: Vec<String> = slots.into_iter().flatten().collect();

        // Labels must follow alphabetical order or training/prediction disagree
        let index = ClassIndex::from_names(classes.clone());
        if index.classes != classes {
            bail!("class indices are not in sorted name order");
        }
        Ok(index)
    }
}
