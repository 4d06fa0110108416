use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Stylize;
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, Padding, Paragraph, Widget, Wrap};

pub struct NotSignedIn;

impl Widget for NotSignedIn {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(Text::from(vec![
            Line::from("You are not signed in.").bold(),
            Line::from(""),
            Line::from("Run with `--login <handle>` to sign in.").dim(),
        ]))
        .alignment(Alignment::Center)
        .wrap(Wrap::default())
        .block(Block::default().padding(Padding::proportional(1)))
        .render(area, buf);
    }
}
