use super::{JointMeta, JointRecord, Worker};
use crate::common::*;

/// The source of annotated person records.
pub trait JointDb
where
    Self: Debug + Send + Sync,
{
    /// The joint definitions shared by all records.
    fn meta(&self) -> &JointMeta;

    /// Get the list of records in the dataset.
    fn records(&self) -> &[Arc<JointRecord>];

    fn num_records(&self) -> usize {
        self.records().len()
    }

    /// Get the nth record in the dataset.
    fn record(&self, index: usize) -> Result<&Arc<JointRecord>> {
        self.records().get(index).ok_or_else(|| {
            format_err!(
                "index {} is out of range for {} records",
                index,
                self.num_records()
            )
        })
    }
}

/// The dataset that produces training samples by index.
///
/// Samples only read the dataset. Randomness and scratch space come from
/// the worker, so a dataset can be shared across parallel workers.
pub trait SampleDataset
where
    Self: Debug + Send + Sync,
{
    type Sample;

    /// Get number of samples in the dataset.
    fn num_samples(&self) -> usize;

    /// Produce the nth sample.
    fn sample(&self, index: usize, worker: &mut Worker) -> Result<Self::Sample>;
}

impl<D> SampleDataset for Box<D>
where
    D: SampleDataset + ?Sized,
{
    type Sample = D::Sample;

    fn num_samples(&self) -> usize {
        (**self).num_samples()
    }

    fn sample(&self, index: usize, worker: &mut Worker) -> Result<Self::Sample> {
        (**self).sample(index, worker)
    }
}

impl<D> SampleDataset for Arc<D>
where
    D: SampleDataset + ?Sized,
{
    type Sample = D::Sample;

    fn num_samples(&self) -> usize {
        (**self).num_samples()
    }

    fn sample(&self, index: usize, worker: &mut Worker) -> Result<Self::Sample> {
        (**self).sample(index, worker)
    }
}
