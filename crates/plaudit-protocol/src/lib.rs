pub mod frames;
pub mod names;
pub mod reconcile;

pub use frames::{ErrorShape, EventFrame, Frame, FrameHead, ReqFrame, ResFrame};
pub use reconcile::DashboardView;
