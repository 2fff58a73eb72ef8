pub mod briefing;
pub mod index;
pub mod status;
pub mod transition;
