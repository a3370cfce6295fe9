pub mod envelope;
pub mod pool;
pub mod status;
pub mod transaction;

pub use envelope::Envelope;
