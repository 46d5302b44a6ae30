use std::collections::HashMap;

use crate::format::CanonicalPlate;

/// Aggregation state for one canonical plate.
///
/// `frame` and `image` belong to the first observation of the plate;
/// `frequency` counts every observation of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateRecord {
    pub frequency: u32,
    pub frame: u64,
    pub image: Vec<u8>,
}

impl PlateRecord {
    pub fn new(frame: u64, image: Vec<u8>) -> Self {
        Self {
            frequency: 1,
            frame,
            image,
        }
    }
}

/// Mapping from canonical plate to record, iterated in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlateMap {
    entries: Vec<(CanonicalPlate, PlateRecord)>,
    index: HashMap<CanonicalPlate, usize>,
}

impl PlateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, plate: &CanonicalPlate) -> bool {
        self.index.contains_key(plate)
    }

    pub fn get(&self, plate: &CanonicalPlate) -> Option<&PlateRecord> {
        self.index.get(plate).map(|&at| &self.entries[at].1)
    }

    /// Looks a plate up by its text.
    pub fn get_str(&self, plate: &str) -> Option<&PlateRecord> {
        CanonicalPlate::parse(plate).and_then(|plate| self.get(&plate))
    }

    pub(crate) fn get_mut(&mut self, plate: &CanonicalPlate) -> Option<&mut PlateRecord> {
        match self.index.get(plate) {
            Some(&at) => Some(&mut self.entries[at].1),
            None => None,
        }
    }

    /// Inserts or replaces a record. A replaced key keeps its position.
    pub fn insert(&mut self, plate: CanonicalPlate, record: PlateRecord) -> Option<PlateRecord> {
        if let Some(&at) = self.index.get(&plate) {
            return Some(std::mem::replace(&mut self.entries[at].1, record));
        }
        self.index.insert(plate.clone(), self.entries.len());
        self.entries.push((plate, record));
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalPlate, &PlateRecord)> {
        self.entries.iter().map(|(plate, record)| (plate, record))
    }

    pub fn keys(&self) -> impl Iterator<Item = &CanonicalPlate> {
        self.entries.iter().map(|(plate, _)| plate)
    }

    /// Sum of all frequencies.
    pub fn total_frequency(&self) -> u64 {
        self.entries
            .iter()
            .map(|(_, record)| u64::from(record.frequency))
            .sum()
    }
}

impl IntoIterator for PlateMap {
    type Item = (CanonicalPlate, PlateRecord);
    type IntoIter = std::vec::IntoIter<(CanonicalPlate, PlateRecord)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(CanonicalPlate, PlateRecord)> for PlateMap {
    fn from_iter<T: IntoIterator<Item = (CanonicalPlate, PlateRecord)>>(iter: T) -> Self {
        let mut map = PlateMap::new();
        for (plate, record) in iter {
            map.insert(plate, record);
        }
        map
    }
}
