use ratatui::style::Stylize;
use ratatui::text::{Line, Text};

/// Banner shown above a timeline that is too quiet.
pub struct ExplorePrompt;

impl From<ExplorePrompt> for Text<'static> {
    fn from(_: ExplorePrompt) -> Self {
        Text::from(vec![
            Line::from("Your home feed is quiet!").bold().yellow(),
            Line::from("  Follow more people, or browse the feeds you have saved,"),
            Line::from("  to see more posts here."),
        ])
    }
}
