use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
