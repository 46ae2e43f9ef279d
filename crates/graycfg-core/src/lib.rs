pub mod error;
pub mod event;
pub mod placeholder;
pub mod settings;
pub mod source;
pub mod telemetry;
pub mod types;

pub use error::*;
pub use event::*;
pub use placeholder::*;
pub use settings::*;
pub use source::*;
pub use telemetry::*;
pub use types::*;
