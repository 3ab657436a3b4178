pub mod influence;
pub mod record;
