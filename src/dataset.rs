use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::CocoError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: u64,
    pub file_name: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,
}

// `[x, y, width, height]`, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x, y, width, height]: [f64; 4]) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x, bbox.y, bbox.width, bbox.height]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub bbox: BoundingBox,
    #[serde(default)]
    pub utf8_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
}

impl AnnotationRecord {
    pub fn text(&self) -> &str {
        self.utf8_string.as_deref().unwrap_or("")
    }
}

// `imgToAnns` lists ids both as numbers and as strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AnnotationId {
    Number(u64),
    Text(String),
}

impl AnnotationId {
    pub fn key(&self) -> String {
        match self {
            AnnotationId::Number(id) => id.to_string(),
            AnnotationId::Text(id) => id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    positions: HashMap<String, usize>,
}

impl<V> OrderedMap<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.positions.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: String, value: V) {
        match self.positions.get(&key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut map = OrderedMap::default();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetIndex {
    #[serde(rename = "imgs")]
    images: OrderedMap<ImageRecord>,
    #[serde(rename = "imgToAnns", default)]
    image_annotations: OrderedMap<Vec<AnnotationId>>,
    #[serde(rename = "anns", default)]
    annotations: OrderedMap<AnnotationRecord>,
}

impl DatasetIndex {
    pub fn load(path: &Path) -> Result<Self, CocoError> {
        let content = fs::read_to_string(path).map_err(|err| CocoError::IndexRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let index = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            images = index.len(),
            annotations = index.annotation_count(),
            "annotation index loaded"
        );
        Ok(index)
    }

    pub fn from_json(content: &str) -> Result<Self, CocoError> {
        serde_json::from_str(content).map_err(|err| CocoError::IndexParse(err.to_string()))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    pub fn image(&self, image_id: u64) -> Option<&ImageRecord> {
        self.images.get(&image_id.to_string())
    }

    pub fn filter_by_prefix(&self, prefix: &str) -> Vec<&ImageRecord> {
        self.images
            .values()
            .filter(|image| image.file_name.starts_with(prefix))
            .collect()
    }

    pub fn annotations_for_image(&self, image_id: u64) -> Vec<&AnnotationRecord> {
        let Some(ids) = self.image_annotations.get(&image_id.to_string()) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| {
                let key = id.key();
                let found = self.annotations.get(&key);
                if found.is_none() {
                    tracing::debug!(image_id, annotation_id = %key, "dangling annotation id");
                }
                found
            })
            .collect()
    }

    pub fn filter_annotated<'a>(&self, images: Vec<&'a ImageRecord>) -> Vec<&'a ImageRecord> {
        images
            .into_iter()
            .filter(|image| !self.annotations_for_image(image.id).is_empty())
            .collect()
    }
}

pub fn select<'a>(images: &[&'a ImageRecord], index: usize) -> Result<&'a ImageRecord, CocoError> {
    images
        .get(index)
        .copied()
        .ok_or(CocoError::SelectionOutOfRange {
            index,
            len: images.len(),
        })
}
