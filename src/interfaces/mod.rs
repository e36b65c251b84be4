//! External collaborators the pipeline consumes: who is asking, and how
//! outcomes and confirmation prompts reach them.

pub mod auth;
pub mod presenter;

pub use auth::{AuthenticationProvider, StaticAuthProvider};
pub use presenter::{ChannelPresenter, PresentationEvent, Presenter, TracingPresenter};
