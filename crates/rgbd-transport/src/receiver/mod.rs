//! The receiver side of a session: FEC reassembly, request planning and
//! render dispatch.

pub mod dispatcher;
pub mod request_planner;
pub mod storage;

pub use dispatcher::RenderDispatcher;
pub use request_planner::plan_requests;
pub use storage::{FrameState, GroupState, ReceiverStorage};
