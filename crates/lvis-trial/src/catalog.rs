// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::collections::HashMap;

use crate::error::{DatasetError, Result};

/// Ordered category names with a reverse lookup.
///
/// Index order decides which output-pattern slot a category owns, so it must
/// be stable across runs; the scanner sorts names before building a catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryCatalog {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl CategoryCatalog {
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if index.insert(name.clone(), idx).is_some() {
                return Err(DatasetError::DuplicateCategory { name: name.clone() });
            }
        }
        Ok(Self { names, index })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.names.iter().enumerate().map(|(i, n)| (i, n.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_bidirectional() {
        let catalog = CategoryCatalog::from_names(["banana", "car", "chair"]).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.index_of("car"), Some(1));
        assert_eq!(catalog.name(2), Some("chair"));
        assert_eq!(catalog.index_of("lamp"), None);
        assert_eq!(catalog.name(3), None);
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = CategoryCatalog::from_names(["car", "car"]).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateCategory { ref name } if name == "car"));
    }
}
