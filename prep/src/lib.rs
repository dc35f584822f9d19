//! The sample preparation program for the pose-dl project.

pub mod batch;
pub mod common;
pub mod config;
pub mod loader;

use crate::{
    batch::{Batch, SampleFields},
    common::*,
    config::{Config, DatasetConfig},
    loader::{LoaderInit, PassSummary},
};
use pose_dl::{
    dataset::{
        DatasetRegistry, FullOutput, FullPipelineInit, JointDb, LiftingInit, LiftingOutput,
        SampleDataset, Split,
    },
    joints::KeypointSource,
    processor::Preprocessor,
};

/// One loader pass over a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassPlan {
    pub split: Split,
    pub shuffle: bool,
    pub batch_size: usize,
}

/// Lists the passes implied by the dataset options.
///
/// Detection caching makes a shuffled pass over the train split, or over
/// the test split when `is_train` is off, and an ordered pass over the test
/// split with `with_valid`, both with the full batch size. Lifting makes a
/// shuffled train pass when `is_train` is on and always an ordered test pass
/// with the validation batch size.
pub fn plan_passes(config: &Config) -> Vec<PassPlan> {
    let dataset = &config.dataset;
    let batch_size = config.loader.batch_size.get();
    let mut passes = vec![];

    if dataset.detection_2d {
        let split = if dataset.is_train {
            Split::Train
        } else {
            Split::Test
        };
        passes.push(PassPlan {
            split,
            shuffle: true,
            batch_size,
        });

        if dataset.with_valid {
            passes.push(PassPlan {
                split: Split::Test,
                shuffle: false,
                batch_size,
            });
        }
    } else {
        if dataset.is_train {
            passes.push(PassPlan {
                split: Split::Train,
                shuffle: true,
                batch_size,
            });
        }

        passes.push(PassPlan {
            split: Split::Test,
            shuffle: false,
            batch_size: config.loader.valid_batch_size(),
        });
    }

    passes
}

/// The entry of the sample preparation program.
pub async fn start(config: Arc<Config>) -> Result<()> {
    let preprocessor = Arc::new(config.preprocessor.clone().build()?);
    let loader_config = &config.loader;
    debug!("{}", serde_json::to_string_pretty(&*config)?);

    // validate the detector name before loading anything
    KeypointSource::parse(&config.dataset.keypoints)?;

    for plan in plan_passes(&config) {
        let init = LoaderInit {
            batch_size: plan.batch_size,
            num_workers: loader_config.num_workers.get(),
            seed: loader_config.seed,
            shuffle: plan.shuffle,
            channel_size: loader_config.channel_size,
        };
        prepare_split(&config.dataset, plan.split, preprocessor.clone(), init).await?;
    }

    Ok(())
}

/// Builds the dataset of a split and drives one pass over it.
pub async fn prepare_split(
    config: &DatasetConfig,
    split: Split,
    preprocessor: Arc<Preprocessor>,
    init: LoaderInit,
) -> Result<PassSummary> {
    let is_train = split == Split::Train;
    let db = open_db(config, split).await?;
    let name = format!("{}/{}", config.name, split);

    let summary = if config.detection_2d {
        let dataset = FullPipelineInit {
            is_train,
            occlusion: config.occlusion,
            output: FullOutput::DetectionCache,
            ..Default::default()
        }
        .build(db, preprocessor)?;
        run_pass(&name, dataset, init).await?
    } else {
        let dataset = LiftingInit {
            is_train,
            keypoints: KeypointSource::parse(&config.keypoints)?,
            keypoints_dir: config.keypoints_dir.clone(),
            output: LiftingOutput::Training,
        }
        .build(db)?;
        run_pass(&name, dataset, init).await?
    };

    Ok(summary)
}

async fn open_db(config: &DatasetConfig, split: Split) -> Result<Arc<dyn JointDb>> {
    let name = config.name.clone();
    let root = config.root.clone();

    info!("loading dataset '{}' ({}) from '{}'", name, split, root.display());
    let db = async_std::task::spawn_blocking(move || {
        DatasetRegistry::global().open(&name, &root, split)
    })
    .await?;

    Ok(db.into())
}

async fn run_pass<D>(name: &str, dataset: D, init: LoaderInit) -> Result<PassSummary>
where
    D: 'static + SampleDataset,
    D::Sample: Into<SampleFields>,
{
    let loader = init.build(dataset)?;
    loader
        .run(name, |batch: Batch| {
            let shapes: Vec<_> = batch.fields.iter().map(|field| field.size()).collect();
            debug!("batch {} shapes {:?}", batch.step, shapes);
            Ok(())
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(detection_2d: bool, is_train: bool, with_valid: bool) -> Config {
        let mut config: Config = json5::from_str(
            r#"{
                dataset: { name: "human36m", root: "data" },
                loader: { batch_size: 64, num_workers: 2 },
            }"#,
        )
        .unwrap();
        config.dataset.detection_2d = detection_2d;
        config.dataset.is_train = is_train;
        config.dataset.with_valid = with_valid;
        config
    }

    fn pass(split: Split, shuffle: bool, batch_size: usize) -> PassPlan {
        PassPlan {
            split,
            shuffle,
            batch_size,
        }
    }

    #[test]
    fn lifting_passes_always_validate() {
        assert_eq!(
            plan_passes(&config(false, true, false)),
            vec![pass(Split::Train, true, 64), pass(Split::Test, false, 8)]
        );
        assert_eq!(
            plan_passes(&config(false, false, false)),
            vec![pass(Split::Test, false, 8)]
        );
    }

    #[test]
    fn detection_passes_use_full_batches() {
        assert_eq!(
            plan_passes(&config(true, true, true)),
            vec![pass(Split::Train, true, 64), pass(Split::Test, false, 64)]
        );
        assert_eq!(
            plan_passes(&config(true, false, false)),
            vec![pass(Split::Test, true, 64)]
        );
    }
}
