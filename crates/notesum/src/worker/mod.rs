pub mod job_worker;
pub mod pool;

pub use job_worker::{JobWorker, Processed};
pub use pool::WorkerPool;
