//! Synchronization primitives for the syscall layer

pub mod gate;
pub mod semaphore;

pub use gate::{ReadAdmission, RwGate, WriteAdmission};
pub use semaphore::Semaphore;
