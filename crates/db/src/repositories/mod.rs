//! Database repositories.

mod comment;
mod post;
mod user;
mod vote;

pub use comment::CommentRepository;
pub use post::PostRepository;
pub use user::UserRepository;
pub use vote::VoteRepository;
