//! Business logic services.

#![allow(missing_docs)]

pub mod comment;
pub mod post;
pub mod threading;
pub mod user;
pub mod voting;

pub use comment::{CommentService, CommentView, CreateCommentInput, UpdateCommentInput};
pub use post::{CreatePostInput, PostPage, PostService, PostView, UpdatePostInput};
pub use threading::{
    CommentTree, Threaded, build_comment_tree, flatten_comment_tree, validate_reply_depth,
};
pub use user::{AuthorSummary, CreateUserInput, UserService};
pub use voting::{VoteValue, VotingService};
