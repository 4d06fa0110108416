use crate::backend::types::Post;
use chrono::Local;
use ratatui::style::Stylize;
use ratatui::text::{Line, Span, Text};
use textwrap::Options;

pub fn post_text(post: &Post, width: u16) -> Text<'static> {
    let mut name = vec![Span::from(
        post.created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S %z")
            .to_string(),
    )
    .green()];
    name.push(Span::from(": "));
    if let Some(display_name) = &post.display_name {
        name.extend([
            Span::from(display_name.clone()).bold(),
            Span::from(" "),
            Span::from(format!("@{}", post.handle)).gray(),
        ]);
    } else {
        name.push(Span::from(format!("@{}", post.handle)).bold());
    }
    let mut lines = vec![Line::from(name)];
    if let Some(by) = &post.reposted_by {
        lines.push(Line::from(format!("  Reposted by {by}")).blue());
    }
    lines.extend(
        textwrap::wrap(
            &post.text,
            Options::new(usize::from(width.max(4)) - 2)
                .initial_indent("  ")
                .subsequent_indent("  "),
        )
        .iter()
        .map(|s| Line::from(s.to_string())),
    );
    lines.push(
        Line::from(format!(
            "   💬{:<4} 🔁{:<4} 🩷{:<4}",
            post.reply_count, post.repost_count, post.like_count
        ))
        .dim(),
    );
    Text::from(lines)
}
