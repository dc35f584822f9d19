use super::{SampleDataset, Worker};
use crate::common::*;

/// How [MultipleDatasets] lays out the indices of its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcatMode {
    /// Every member spans the length of the largest member. Smaller members
    /// are cycled and the incomplete last cycle is sampled randomly.
    SameLength,
    /// Members are laid out one after another.
    Concat,
}

/// Presents several datasets with the same sample type as one.
#[derive(Debug)]
pub struct MultipleDatasets<S> {
    datasets: Vec<Box<dyn SampleDataset<Sample = S>>>,
    mode: ConcatMode,
    max_len: usize,
    /// The cumulative member lengths.
    boundaries: Vec<usize>,
}

impl<S> MultipleDatasets<S> {
    pub fn new(
        datasets: Vec<Box<dyn SampleDataset<Sample = S>>>,
        mode: ConcatMode,
    ) -> Result<Self> {
        ensure!(!datasets.is_empty(), "no dataset is given");
        if mode == ConcatMode::SameLength {
            if let Some(index) = datasets.iter().position(|dataset| dataset.num_samples() == 0) {
                bail!("dataset {} is empty, which is not allowed in same length mode", index);
            }
        }

        let max_len = datasets
            .iter()
            .map(|dataset| dataset.num_samples())
            .max()
            .unwrap_or(0);
        let boundaries: Vec<_> = datasets
            .iter()
            .scan(0, |sum, dataset| {
                *sum += dataset.num_samples();
                Some(*sum)
            })
            .collect();

        Ok(Self {
            datasets,
            mode,
            max_len,
            boundaries,
        })
    }

    pub fn mode(&self) -> ConcatMode {
        self.mode
    }

    pub fn num_datasets(&self) -> usize {
        self.datasets.len()
    }

    /// Maps a logical index to a member index and an index in that member.
    pub fn resolve<R>(&self, index: usize, rng: &mut R) -> Result<(usize, usize)>
    where
        R: Rng,
    {
        let num_samples = self.len();
        ensure!(
            index < num_samples,
            "index {} is out of range for {} samples",
            index,
            num_samples
        );

        let resolved = match self.mode {
            ConcatMode::SameLength => {
                let dataset_index = index / self.max_len;
                let offset = index % self.max_len;
                let len = self.datasets[dataset_index].num_samples();

                // the largest multiple of len not exceeding max_len
                let cycled = len * (self.max_len / len);
                let data_index = if offset >= cycled {
                    rng.gen_range(0..len)
                } else {
                    offset % len
                };
                (dataset_index, data_index)
            }
            ConcatMode::Concat => {
                let dataset_index = self
                    .boundaries
                    .iter()
                    .position(|&boundary| index < boundary)
                    .ok_or_else(|| format_err!("index {} is out of range", index))?;
                let data_index = match dataset_index {
                    0 => index,
                    _ => index - self.boundaries[dataset_index - 1],
                };
                (dataset_index, data_index)
            }
        };

        Ok(resolved)
    }

    fn len(&self) -> usize {
        match self.mode {
            ConcatMode::SameLength => self.max_len * self.datasets.len(),
            ConcatMode::Concat => self.boundaries.last().copied().unwrap_or(0),
        }
    }
}

impl<S> SampleDataset for MultipleDatasets<S>
where
    S: 'static + Debug,
{
    type Sample = S;

    fn num_samples(&self) -> usize {
        self.len()
    }

    fn sample(&self, index: usize, worker: &mut Worker) -> Result<Self::Sample> {
        let (dataset_index, data_index) = self.resolve(index, &mut worker.rng)?;
        self.datasets[dataset_index]
            .sample(data_index, worker)
            .with_context(|| {
                format!(
                    "failed to fetch sample {} of dataset {}",
                    data_index, dataset_index
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Yields its own indices.
    #[derive(Debug)]
    struct RangeDataset(usize);

    impl SampleDataset for RangeDataset {
        type Sample = usize;

        fn num_samples(&self) -> usize {
            self.0
        }

        fn sample(&self, index: usize, _worker: &mut Worker) -> Result<usize> {
            ensure!(index < self.0, "index {} is out of range", index);
            Ok(index)
        }
    }

    fn datasets(lens: &[usize]) -> Vec<Box<dyn SampleDataset<Sample = usize>>> {
        lens.iter()
            .map(|&len| Box::new(RangeDataset(len)) as Box<dyn SampleDataset<Sample = usize>>)
            .collect()
    }

    #[test]
    fn same_length_boundary() {
        let multiple = MultipleDatasets::new(datasets(&[3, 10]), ConcatMode::SameLength).unwrap();
        assert_eq!(multiple.num_samples(), 20);

        let mut rng = StdRng::seed_from_u64(7);
        for index in 0..9 {
            assert_eq!(multiple.resolve(index, &mut rng).unwrap(), (0, index % 3));
        }
        for _ in 0..100 {
            let (dataset_index, data_index) = multiple.resolve(9, &mut rng).unwrap();
            assert_eq!(dataset_index, 0);
            assert!(data_index < 3);
        }
        for index in 10..20 {
            assert_eq!(multiple.resolve(index, &mut rng).unwrap(), (1, index - 10));
        }
        assert!(multiple.resolve(20, &mut rng).is_err());
    }

    #[test]
    fn same_length_without_overflow() {
        let multiple = MultipleDatasets::new(datasets(&[5, 10]), ConcatMode::SameLength).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let indices: Vec<_> = (0..10)
            .map(|index| multiple.resolve(index, &mut rng).unwrap().1)
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn concat_boundary() {
        let multiple = MultipleDatasets::new(datasets(&[3, 10]), ConcatMode::Concat).unwrap();
        assert_eq!(multiple.num_samples(), 13);

        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(multiple.resolve(0, &mut rng).unwrap(), (0, 0));
        assert_eq!(multiple.resolve(2, &mut rng).unwrap(), (0, 2));
        assert_eq!(multiple.resolve(3, &mut rng).unwrap(), (1, 0));
        assert_eq!(multiple.resolve(12, &mut rng).unwrap(), (1, 9));
        assert!(multiple.resolve(13, &mut rng).is_err());
    }

    #[test]
    fn sample_through_members() {
        let multiple = MultipleDatasets::new(datasets(&[3, 10]), ConcatMode::Concat).unwrap();
        let mut worker = Worker::new(0, 0);
        assert_eq!(multiple.sample(4, &mut worker).unwrap(), 1);
        assert!(multiple.sample(13, &mut worker).is_err());
    }

    #[test]
    fn reject_empty_datasets() {
        assert!(MultipleDatasets::new(datasets(&[]), ConcatMode::Concat).is_err());
        assert!(MultipleDatasets::new(datasets(&[0, 3]), ConcatMode::SameLength).is_err());

        let multiple = MultipleDatasets::new(datasets(&[0, 3]), ConcatMode::Concat).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(multiple.resolve(0, &mut rng).unwrap(), (1, 0));
    }
}
