pub mod note;
pub mod user;

pub use note::{NewNote, Note, SearchCriteria};
pub use user::User;
