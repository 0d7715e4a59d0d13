pub mod normalize;
pub mod record;

pub use normalize::{derive_status, normalize, refine_pending, status_icon};
pub use record::{PrStatus, StatusRecord, TabId};
