//! Bulk drug import: target fields, header matching, and the uploads held
//! between preview and commit.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::structs::ImportPreview;

#[derive(Serialize, Debug, Clone, Copy)]
pub struct TargetField {
    /// Field name the backend expects in the mapping.
    pub key: &'static str,
    /// Column header used by the backend's export template.
    pub label: &'static str,
    pub title: &'static str,
}

pub const TARGET_FIELDS: [TargetField; 10] = [
    TargetField { key: "name", label: "الاسم التجاري", title: "Trade name" },
    TargetField { key: "genericName", label: "الاسم العلمي", title: "Generic name" },
    TargetField { key: "manufacturer", label: "الشركة المصنعة", title: "Manufacturer" },
    TargetField { key: "price", label: "السعر", title: "Price" },
    TargetField { key: "quantity", label: "الكمية", title: "Quantity" },
    TargetField { key: "category", label: "التصنيف", title: "Category" },
    TargetField { key: "expiryDate", label: "تاريخ الانتهاء", title: "Expiry date" },
    TargetField { key: "batchNumber", label: "رقم الطبخة", title: "Batch number" },
    TargetField { key: "dosage", label: "العيار", title: "Strength" },
    TargetField { key: "dosageForm", label: "الشكل الصيدلاني", title: "Dosage form" },
];

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// A header matches a label when, ignoring case and surrounding whitespace,
/// one equals or contains the other. Blank headers match nothing.
pub fn header_matches(label: &str, header: &str) -> bool {
    let label = normalize(label);
    let header = normalize(header);
    if header.is_empty() || label.is_empty() {
        return false;
    }
    header == label || header.contains(&label) || label.contains(&header)
}

/// Field key to chosen source header. Unmapped fields are absent.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping(BTreeMap<String, String>);

impl ColumnMapping {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, header: &str) {
        if header.is_empty() {
            self.0.remove(key);
        } else {
            self.0.insert(key.to_owned(), header.to_owned());
        }
    }

    pub fn mapped_count(&self) -> usize {
        self.0.len()
    }

    /// Reads an operator's selections, keeping only known target fields.
    pub fn from_selections(selections: &HashMap<String, String>) -> Self {
        let mut mapping = ColumnMapping::default();
        for field in TARGET_FIELDS.iter() {
            if let Some(header) = selections.get(field.key) {
                mapping.set(field.key, header.trim());
            }
        }
        mapping
    }
}

/// First matching header for each target field.
pub fn propose_mapping(headers: &[String]) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();
    for field in TARGET_FIELDS.iter() {
        if let Some(found) = headers.iter().find(|h| header_matches(field.label, h)) {
            mapping.set(field.key, found);
        }
    }
    mapping
}

/// An uploaded spreadsheet waiting for the operator to confirm its mapping.
#[derive(Debug)]
pub struct PendingImport {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub preview: ImportPreview,
    created: Instant,
    /// Last mapping the operator submitted, kept across a failed commit.
    mapping: Mutex<Option<ColumnMapping>>,
}

impl PendingImport {
    pub fn new(file_name: String, content_type: String, bytes: Vec<u8>, preview: ImportPreview) -> Self {
        Self {
            file_name,
            content_type,
            bytes,
            preview,
            created: Instant::now(),
            mapping: Mutex::new(None),
        }
    }

    pub async fn remember(&self, mapping: ColumnMapping) {
        *self.mapping.lock().await = Some(mapping);
    }

    /// The operator's last mapping, or the automatic proposal before they
    /// have submitted one.
    pub async fn mapping(&self) -> ColumnMapping {
        match self.mapping.lock().await.as_ref() {
            Some(mapping) => mapping.clone(),
            None => propose_mapping(&self.preview.headers),
        }
    }
}

#[derive(Clone)]
pub struct ImportStore {
    pending: Arc<Mutex<HashMap<Uuid, Arc<PendingImport>>>>,
    ttl: Duration,
}

impl ImportStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn insert(&self, import: PendingImport) -> Uuid {
        let id = Uuid::new_v4();
        let mut pending = self.pending.lock().await;
        let ttl = self.ttl;
        pending.retain(|_, held| held.created.elapsed() < ttl);
        pending.insert(id, Arc::new(import));
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<Arc<PendingImport>> {
        let pending = self.pending.lock().await;
        pending
            .get(id)
            .filter(|held| held.created.elapsed() < self.ttl)
            .cloned()
    }

    pub async fn remove(&self, id: &Uuid) {
        self.pending.lock().await.remove(id);
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }
}
