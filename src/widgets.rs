mod explore_prompt;
mod not_signed_in;
mod post;

pub use explore_prompt::ExplorePrompt;
pub use not_signed_in::NotSignedIn;
pub use post::post_text;
