//! Narrow interface to the delegated output writer.
//!
//! The core hands finalized arrays to a [`DatasetSink`]; the HDF5 writer (or
//! anything else) lives behind it. [`MemorySink`] collects datasets in memory
//! for tests and examples.

pub trait DatasetSink {
    /// Receive one named array with its dimensions, row-major.
    fn write_dataset(&mut self, name: &str, dims: &[usize], data: &[f64]);
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub datasets: Vec<(String, Vec<usize>, Vec<f64>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&(String, Vec<usize>, Vec<f64>)> {
        self.datasets.iter().find(|(n, _, _)| n == name)
    }
}

impl DatasetSink for MemorySink {
    fn write_dataset(&mut self, name: &str, dims: &[usize], data: &[f64]) {
        debug_assert_eq!(dims.iter().product::<usize>(), data.len());
        self.datasets
            .push((name.to_string(), dims.to_vec(), data.to_vec()));
    }
}
