pub mod device;
pub mod directory;
pub mod login;
pub mod progress;
pub mod prompts;
pub mod tenant;
