pub mod category;
pub mod goal;
pub mod history;
pub mod progress;
