//! The parallel batch loader over a sample dataset.

use crate::{
    batch::{Batch, SampleFields},
    common::*,
};
use pose_dl::dataset::{SampleDataset, Worker, WorkerStats};

/// Loader initializer.
#[derive(Debug, Clone)]
pub struct LoaderInit {
    pub batch_size: usize,
    pub num_workers: usize,
    pub seed: u64,
    pub shuffle: bool,
    pub channel_size: usize,
}

impl LoaderInit {
    pub fn build<D>(self, dataset: D) -> Result<Loader<D>>
    where
        D: 'static + SampleDataset,
        D::Sample: Into<SampleFields>,
    {
        let Self {
            batch_size,
            num_workers,
            seed,
            shuffle,
            channel_size,
        } = self;

        ensure!(batch_size > 0, "batch_size must be positive");
        ensure!(num_workers > 0, "num_workers must be positive");
        ensure!(dataset.num_samples() > 0, "the dataset is empty");

        Ok(Loader {
            dataset: Arc::new(dataset),
            batch_size,
            num_workers,
            seed,
            shuffle,
            channel_size,
        })
    }
}

/// Drives one pass over a dataset with parallel workers.
#[derive(Debug)]
pub struct Loader<D> {
    dataset: Arc<D>,
    batch_size: usize,
    num_workers: usize,
    seed: u64,
    shuffle: bool,
    channel_size: usize,
}

/// The summary of a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub num_batches: usize,
    pub num_samples: usize,
    pub skipped_occlusions: usize,
}

impl<D> Loader<D>
where
    D: 'static + SampleDataset,
    D::Sample: Into<SampleFields>,
{
    pub fn num_samples(&self) -> usize {
        self.dataset.num_samples()
    }

    /// Splits the sample indices into batches, shuffled if requested.
    /// The last batch may be smaller.
    pub fn batches(&self) -> Vec<Vec<usize>> {
        let mut indices: Vec<_> = (0..self.num_samples()).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed);
            indices.shuffle(&mut rng);
        }

        indices
            .into_iter()
            .chunks(self.batch_size)
            .into_iter()
            .map(|chunk| chunk.collect())
            .collect()
    }

    /// Distributes batches round-robin over workers.
    pub fn jobs(&self) -> Vec<Vec<(usize, Vec<usize>)>> {
        let mut jobs: Vec<Vec<_>> = (0..self.num_workers).map(|_| vec![]).collect();
        self.batches()
            .into_iter()
            .enumerate()
            .for_each(|(step, batch)| jobs[step % self.num_workers].push((step, batch)));
        jobs
    }

    /// Fetches and collates all batches, calling the consumer in arrival
    /// order.
    pub async fn run<F>(&self, name: &str, mut consumer: F) -> Result<PassSummary>
    where
        F: FnMut(Batch) -> Result<()>,
    {
        let (tx, rx) = flume::bounded(self.channel_size);
        let num_batches = self.batches().len();
        info!(
            "{}: {} samples in {} batches on {} workers",
            name,
            self.num_samples(),
            num_batches,
            self.num_workers
        );

        let worker_futures: Vec<_> = self
            .jobs()
            .into_iter()
            .enumerate()
            .map(|(worker_index, jobs)| {
                let dataset = self.dataset.clone();
                let tx = tx.clone();
                let seed = self.seed;

                async_std::task::spawn_blocking(move || -> Result<WorkerStats> {
                    let mut worker = Worker::new(worker_index, seed);

                    for (step, indices) in jobs {
                        let samples: Vec<SampleFields> = indices
                            .into_iter()
                            .map(|index| -> Result<_> {
                                let sample = dataset
                                    .sample(index, &mut worker)
                                    .with_context(|| format!("failed to load sample {}", index))?;
                                Ok(sample.into())
                            })
                            .collect::<Result<_>>()?;
                        let batch = Batch::collate(step, worker_index, samples)?;

                        // the consumer is gone
                        if tx.send(batch).is_err() {
                            break;
                        }
                    }

                    Ok(worker.stats)
                })
            })
            .collect();
        drop(tx);

        let consume_future = async move {
            let mut summary = PassSummary::default();
            let mut instant = Instant::now();

            while let Ok(batch) = rx.recv_async().await {
                summary.num_batches += 1;
                summary.num_samples += batch.num_samples;
                debug!(
                    "{}: received batch {} from worker {}",
                    name, batch.step, batch.worker_index
                );
                consumer(batch)?;

                if instant.elapsed() >= Duration::from_secs(1) {
                    info!("{}: {}/{} batches", name, summary.num_batches, num_batches);
                    instant = Instant::now();
                }
            }

            Fallible::Ok(summary)
        };

        let (stats, summary) = futures::join!(future::try_join_all(worker_futures), consume_future);
        let stats = stats?;
        let summary = PassSummary {
            skipped_occlusions: stats.iter().map(|stats| stats.skipped_occlusions).sum(),
            ..summary?
        };

        if summary.skipped_occlusions > 0 {
            warn!(
                "{}: occlusion skipped on {} samples",
                name, summary.skipped_occlusions
            );
        }
        info!(
            "{}: done with {} samples in {} batches",
            name, summary.num_samples, summary.num_batches
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pose_dl::dataset::{ConcatMode, MultipleDatasets};

    #[derive(Debug)]
    struct RangeDataset(usize);

    #[derive(Debug)]
    struct RangeSample(usize);

    impl From<RangeSample> for SampleFields {
        fn from(sample: RangeSample) -> Self {
            SampleFields {
                tensors: vec![Tensor::of_slice(&[sample.0 as i64])],
                image_path: None,
            }
        }
    }

    impl SampleDataset for RangeDataset {
        type Sample = RangeSample;

        fn num_samples(&self) -> usize {
            self.0
        }

        fn sample(&self, index: usize, worker: &mut Worker) -> Result<RangeSample> {
            ensure!(index < self.0, "index {} is out of range", index);
            worker.stats.samples += 1;
            Ok(RangeSample(index))
        }
    }

    fn init(shuffle: bool) -> LoaderInit {
        LoaderInit {
            batch_size: 4,
            num_workers: 3,
            seed: 1,
            shuffle,
            channel_size: 2,
        }
    }

    #[test]
    fn ordered_batches() {
        let loader = init(false).build(RangeDataset(10)).unwrap();
        assert_eq!(
            loader.batches(),
            vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]
        );

        let jobs = loader.jobs();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0], vec![(0, vec![0, 1, 2, 3])]);
        assert_eq!(jobs[2], vec![(2, vec![8, 9])]);
    }

    #[test]
    fn shuffled_batches_cover_all_indices() {
        let loader = init(true).build(RangeDataset(10)).unwrap();
        let batches = loader.batches();
        assert_eq!(batches, loader.batches());

        let mut indices: Vec<_> = batches.into_iter().flatten().collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn run_visits_every_sample_once() {
        let loader = init(true).build(RangeDataset(10)).unwrap();
        let mut seen = vec![];

        let summary = async_std::task::block_on(loader.run("test", |batch| {
            seen.extend(
                (0..batch.num_samples as i64).map(|index| batch.fields[0].int64_value(&[index, 0])),
            );
            Ok(())
        }))
        .unwrap();

        assert_eq!(summary.num_batches, 3);
        assert_eq!(summary.num_samples, 10);
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn run_over_concatenated_datasets() {
        let datasets: Vec<Box<dyn SampleDataset<Sample = RangeSample>>> =
            vec![Box::new(RangeDataset(3)), Box::new(RangeDataset(5))];
        let dataset = MultipleDatasets::new(datasets, ConcatMode::SameLength).unwrap();
        let loader = init(false).build(dataset).unwrap();

        let summary = async_std::task::block_on(loader.run("test", |_| Ok(()))).unwrap();
        assert_eq!(summary.num_samples, 10);
    }

    #[test]
    fn reject_empty_dataset() {
        assert!(init(false).build(RangeDataset(0)).is_err());
    }
}
