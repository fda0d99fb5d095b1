pub mod events;
pub mod profile;
pub mod track;

pub use events::{DriverCommand, ReaderEvent, UserGrant};
pub use profile::{ConnectionProfile, TEMPLATE_9600_1};
pub use track::{Track2, TrackParser};
