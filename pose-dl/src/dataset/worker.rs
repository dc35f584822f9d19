use super::JointRecord;
use crate::{common::*, processor::Occlusion};

/// The mutable state owned by one sampling worker.
#[derive(Debug)]
pub struct Worker {
    index: usize,
    /// The worker's random generator, seeded by `seed + index`.
    pub rng: StdRng,
    pub buffer: JointBuffer,
    pub stats: WorkerStats,
}

impl Worker {
    pub fn new(index: usize, seed: u64) -> Self {
        Self {
            index,
            rng: StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            buffer: JointBuffer::default(),
            stats: WorkerStats::default(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// The reusable working copy of the joints of one record.
#[derive(Debug, Clone, Default)]
pub struct JointBuffer {
    pub joint_img: Vec<[f64; 3]>,
    pub joint_vis: Vec<f64>,
}

impl JointBuffer {
    /// Copies the image plane joints and visibilities of the record into
    /// the buffer, reusing its allocation.
    pub fn load(&mut self, record: &JointRecord) -> (&mut [[f64; 3]], &mut [f64]) {
        self.joint_img.clear();
        self.joint_img.extend_from_slice(&record.joint_img);
        self.joint_vis.clear();
        self.joint_vis.extend_from_slice(&record.joint_vis);
        (&mut self.joint_img[..], &mut self.joint_vis[..])
    }
}

/// Counters of soft conditions met by a worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub samples: usize,
    pub skipped_occlusions: usize,
}

impl WorkerStats {
    pub fn record_occlusion(&mut self, occlusion: &Occlusion) {
        if let Occlusion::Skipped = occlusion {
            self.skipped_occlusions += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workers_have_distinct_streams() {
        let mut lhs = Worker::new(0, 42);
        let mut rhs = Worker::new(1, 42);
        let mut again = Worker::new(0, 42);

        let lhs: Vec<u64> = (0..8).map(|_| lhs.rng.gen()).collect();
        let rhs: Vec<u64> = (0..8).map(|_| rhs.rng.gen()).collect();
        let again: Vec<u64> = (0..8).map(|_| again.rng.gen()).collect();

        assert_ne!(lhs, rhs);
        assert_eq!(lhs, again);
    }

    #[test]
    fn stats_count_skipped_occlusions() {
        let mut stats = WorkerStats::default();
        stats.record_occlusion(&Occlusion::NotRequested);
        stats.record_occlusion(&Occlusion::Skipped);
        stats.record_occlusion(&Occlusion::Skipped);
        assert_eq!(stats.skipped_occlusions, 2);
    }
}
