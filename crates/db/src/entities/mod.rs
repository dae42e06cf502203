//! Database entities.

pub mod comment;
pub mod post;
pub mod user;
pub mod vote;

pub use comment::Entity as Comment;
pub use post::Entity as Post;
pub use user::Entity as User;
pub use vote::Entity as Vote;
