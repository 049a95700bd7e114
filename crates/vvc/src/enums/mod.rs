mod nal_unit_type;
pub use nal_unit_type::*;

mod constant_frame_rate;
pub use constant_frame_rate::*;
