use super::{JointDb, JointMeta, JointRecord};
use crate::common::*;

/// The record source backed by a JSON list of records.
///
/// Relative image paths are resolved against the directory of the JSON file.
#[derive(Debug, Clone)]
pub struct JsonJointDb {
    meta: JointMeta,
    records: Vec<Arc<JointRecord>>,
}

impl JsonJointDb {
    pub fn load(path: impl AsRef<Path>, meta: JointMeta) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(
            File::open(path)
                .with_context(|| format!("failed to open annotation file '{}'", path.display()))?,
        );
        let records: Vec<JointRecord> = serde_json::from_reader(reader)
            .with_context(|| format!("failed to parse annotation file '{}'", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let records = Self::from_records(records, base_dir, meta)?;
        info!(
            "loaded {} records of dataset '{}' from '{}'",
            records.records.len(),
            records.meta.name(),
            path.display()
        );

        Ok(records)
    }

    /// Validates records against the metadata.
    pub fn from_records(
        records: Vec<JointRecord>,
        base_dir: &Path,
        meta: JointMeta,
    ) -> Result<Self> {
        let records: Vec<_> = records
            .into_iter()
            .enumerate()
            .map(|(index, mut record)| -> Result<_> {
                record
                    .validate(&meta)
                    .with_context(|| format!("invalid record at index {}", index))?;
                if record.image_path.is_relative() {
                    record.image_path = base_dir.join(&record.image_path);
                }
                Ok(Arc::new(record))
            })
            .collect::<Result<_>>()?;

        Ok(Self { meta, records })
    }
}

impl JointDb for JsonJointDb {
    fn meta(&self) -> &JointMeta {
        &self.meta
    }

    fn records(&self) -> &[Arc<JointRecord>] {
        &self.records
    }
}
