pub mod object;
pub mod profile;
pub mod session;

pub use object::{object_key, PendingImage, StoredObject};
pub use profile::{ProfileFields, ProfileUpdate};
pub use session::{Session, User};
