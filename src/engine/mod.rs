mod fengine;
pub mod result;

pub use fengine::{FEngine, DOS_BATCH_SIZE};
pub use result::{classify_response, is_data_empty, OpResult, ResultKind, SuccessPolicy};
