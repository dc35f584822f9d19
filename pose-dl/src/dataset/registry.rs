use super::{JointDb, JointMeta, JsonJointDb, Split};
use crate::common::*;

/// Creates the record source of a split from the dataset root directory.
pub type JointDbFactory = fn(&Path, Split) -> Result<Box<dyn JointDb>>;

static GLOBAL_REGISTRY: Lazy<DatasetRegistry> = Lazy::new(|| {
    let mut registry = DatasetRegistry::default();
    registry.insert("human36m", open_human36m);
    registry.insert("mpii", open_mpii);
    registry.insert("mscoco", open_mscoco);
    registry
});

/// The mapping from dataset identifiers to record source factories.
#[derive(Debug, Clone, Default)]
pub struct DatasetRegistry {
    factories: IndexMap<&'static str, JointDbFactory>,
}

impl DatasetRegistry {
    /// The registry of the built-in datasets.
    pub fn global() -> &'static Self {
        &GLOBAL_REGISTRY
    }

    pub fn insert(
        &mut self,
        name: &'static str,
        factory: JointDbFactory,
    ) -> Option<JointDbFactory> {
        self.factories.insert(name, factory)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().cloned()
    }

    pub fn get(&self, name: &str) -> Option<JointDbFactory> {
        self.factories.get(name).cloned()
    }

    /// Opens the split of the named dataset under the root directory.
    pub fn open(&self, name: &str, root: &Path, split: Split) -> Result<Box<dyn JointDb>> {
        let factory = self.get(name).ok_or_else(|| {
            format_err!(
                "unknown dataset '{}', the available datasets are {}",
                name,
                self.names().map(|name| format!("'{}'", name)).join(", ")
            )
        })?;
        factory(root, split).with_context(|| format!("failed to open dataset '{}'", name))
    }
}

fn open_json(root: &Path, split: Split, meta: JointMeta) -> Result<Box<dyn JointDb>> {
    let path = root.join(format!("{}_{}.json", meta.name(), split));
    let db = JsonJointDb::load(path, meta)?;
    Ok(Box::new(db))
}

fn open_human36m(root: &Path, split: Split) -> Result<Box<dyn JointDb>> {
    open_json(root, split, JointMeta::human36m())
}

fn open_mpii(root: &Path, split: Split) -> Result<Box<dyn JointDb>> {
    open_json(root, split, JointMeta::mpii())
}

fn open_mscoco(root: &Path, split: Split) -> Result<Box<dyn JointDb>> {
    open_json(root, split, JointMeta::mscoco())
}
