use horizon_core::{
    format_message, ChatMessage, ChatRole, CopyId, CopyTracker, DocumentNode, InlinePart, LineNode,
    Provider,
};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode};

const COPIED_BADGE: &str = " ✓ copied";

fn code_style() -> Style {
    Style::default().fg(Color::Yellow).bg(Color::Rgb(40, 40, 40))
}

fn copied_style() -> Style {
    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
}

/// Convert one classified line to styled spans
fn line_node_to_line(node: &LineNode) -> Line<'static> {
    match node {
        LineNode::Heading { text } => Line::from(Span::styled(
            text.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )),
        LineNode::BoldStatement { text } => Line::from(Span::styled(
            text.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        LineNode::InlineMixed { parts } => Line::from(
            parts
                .iter()
                .filter_map(|part| match part {
                    InlinePart::Plain(text) if text.is_empty() => None,
                    InlinePart::Plain(text) => Some(Span::raw(text.clone())),
                    InlinePart::Code(code) => Some(Span::styled(code.clone(), code_style())),
                })
                .collect::<Vec<_>>(),
        ),
        LineNode::Paragraph { text } => Line::from(text.clone()),
        LineNode::Blank => Line::default(),
    }
}

/// Render a formatted reply. Code blocks get a header naming the language and
/// the number key that copies them.
pub fn document_lines(
    message: usize,
    nodes: &[DocumentNode],
    copy_tracker: &CopyTracker,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut block = 0;

    for node in nodes {
        match node {
            DocumentNode::TextBlock { lines: text_lines } => {
                lines.extend(text_lines.iter().map(line_node_to_line));
            }
            DocumentNode::CodeBlock { language, code } => {
                let mut header = vec![
                    Span::styled(format!("┌─ {language} "), Style::default().fg(Color::DarkGray)),
                    Span::styled(format!("[{}]", block + 1), Style::default().fg(Color::DarkGray)),
                ];
                if copy_tracker.is_copied(CopyId::CodeBlock { message, block }) {
                    header.push(Span::styled(COPIED_BADGE, copied_style()));
                }
                lines.push(Line::from(header));

                for code_line in code.lines() {
                    lines.push(Line::from(vec![
                        Span::styled("│ ", Style::default().fg(Color::DarkGray)),
                        Span::styled(code_line.to_string(), Style::default().fg(Color::Green)),
                    ]));
                }
                lines.push(Line::from(Span::styled("└─", Style::default().fg(Color::DarkGray))));
                block += 1;
            }
        }
    }

    lines
}

fn message_lines(
    index: usize,
    message: &ChatMessage,
    selected: bool,
    copy_tracker: &CopyTracker,
) -> Vec<Line<'static>> {
    let (label, color) = match message.role {
        ChatRole::User => ("You:", Color::Cyan),
        ChatRole::Assistant => ("AI:", Color::Yellow),
    };

    let mut header = vec![Span::styled(
        if selected { "▶ " } else { "" },
        Style::default().fg(Color::Magenta),
    )];
    header.push(Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)));
    if copy_tracker.is_copied(CopyId::Message(index)) {
        header.push(Span::styled(COPIED_BADGE, copied_style()));
    }

    let mut lines = vec![Line::from(header)];
    match message.role {
        ChatRole::User => lines.extend(message.content.lines().map(|l| Line::from(l.to_string()))),
        ChatRole::Assistant => {
            let nodes = format_message(&message.content);
            lines.extend(document_lines(index, &nodes, copy_tracker));
        }
    }
    lines.push(Line::default());
    lines
}

/// Rows a set of lines takes once wrapped to `width`
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    // Render popups
    if app.show_provider_picker {
        render_provider_picker(app, frame, area);
    } else if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Horizon AI Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("{} · {} ", app.provider().label(), app.generator.model()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let mut lines: Vec<Line> = Vec::new();
    for (index, message) in app.conversation.transcript().iter().enumerate() {
        let selected = app.selected_message == Some(index);
        lines.extend(message_lines(index, message, selected, &app.copy_tracker));
    }

    if app.conversation.is_loading() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat(usize::from(app.animation_frame) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{dots}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    app.settle_scroll(wrapped_height(&lines, inner_width), inner_height);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }))
        .title(" Conversation ");

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn input_title(app: &App) -> &'static str {
    if app.conversation.is_loading() {
        " Waiting for reply... "
    } else if app.conversation.can_submit() {
        " Enter to send "
    } else {
        " Ask me anything "
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let loading = app.conversation.is_loading();

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(input_title(app));

    // Calculate visible portion of input with horizontal scrolling
    let input = app.conversation.input();
    let inner_width = usize::from(area.width.saturating_sub(2));
    let cursor_pos = input.cursor();
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = input
        .text()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let paragraph = Paragraph::new(visible_text)
        .style(Style::default().fg(if loading { Color::DarkGray } else { Color::Cyan }))
        .block(input_block);

    frame.render_widget(paragraph, area);

    if editing {
        let cursor_x = u16::try_from(cursor_pos - scroll_offset).unwrap_or(0);
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" y ", key_style),
            Span::styled(" copy ", label_style),
            Span::styled(" 1-9 ", key_style),
            Span::styled(" copy code ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" p/m ", key_style),
            Span::styled(" provider/model ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)]
            .into_iter()
            .chain(hints)
            .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

/// Centered popup area for a list of `rows` items
fn popup_area(area: Rect, width: u16, rows: usize) -> Rect {
    let popup_width = width.min(area.width.saturating_sub(4));
    let popup_height = u16::try_from(rows + 2)
        .unwrap_or(u16::MAX)
        .min(area.height.saturating_sub(4));

    let popup_x = area.width.saturating_sub(popup_width) / 2;
    let popup_y = area.height.saturating_sub(popup_height) / 2;

    Rect::new(popup_x, popup_y, popup_width, popup_height)
}

fn picker_list(items: Vec<ListItem<'static>>, title: &'static str) -> List<'static> {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ")
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = if app.models_loading {
        vec![ListItem::new(" Loading models... ").style(Style::default().fg(Color::DarkGray))]
    } else if app.available_models.is_empty() {
        vec![ListItem::new(" No models found ").style(Style::default().fg(Color::DarkGray))]
    } else {
        app.available_models
            .iter()
            .map(|model| {
                let style = if model == app.generator.model() {
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(format!(" {model} ")).style(style)
            })
            .collect()
    };

    let popup = popup_area(area, 50, items.len());
    frame.render_widget(Clear, popup);
    let list = picker_list(items, " Select Model (Enter to select, Esc to cancel) ");
    frame.render_stateful_widget(list, popup, &mut app.model_picker_state);
}

fn render_provider_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let current = app.provider();
    let items: Vec<ListItem> = Provider::all()
        .into_iter()
        .map(|provider| {
            let key_source = match provider {
                Provider::Ollama => Some("local"),
                _ => app.config.key_source(provider),
            };
            let is_current = provider == current;

            let status = match key_source {
                Some("env") => "(env var)",
                Some("config") => "(configured)",
                Some("local") => "(local)",
                _ => "(needs key)",
            };
            let prefix = if is_current { "* " } else { "  " };

            let style = if is_current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if key_source.is_some() {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(format!("{}{} {}", prefix, provider.display_name(), status)).style(style)
        })
        .collect();

    let popup = popup_area(area, 45, items.len());
    frame.render_widget(Clear, popup);
    let list = picker_list(items, " Select Provider ");
    frame.render_stateful_widget(list, popup, &mut app.provider_picker_state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_core::{Config, NoClipboard};

    fn plain_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_code_block_is_framed() {
        let nodes = format_message("Run:\n```sh\ncargo test\n```");
        let lines = document_lines(0, &nodes, &CopyTracker::new());
        let text: Vec<String> = lines.iter().map(plain_text).collect();
        assert_eq!(text, vec!["Run:", "", "┌─ sh [1]", "│ cargo test", "└─", ""]);
    }

    #[test]
    fn test_copied_code_block_shows_badge() {
        let mut tracker = CopyTracker::new();
        tracker.mark_copied(CopyId::CodeBlock { message: 3, block: 1 });

        let nodes = format_message("```a\n1\n```\n```b\n2\n```");
        let headers: Vec<String> = document_lines(3, &nodes, &tracker)
            .iter()
            .map(plain_text)
            .filter(|t| t.starts_with('┌'))
            .collect();
        assert_eq!(headers, vec!["┌─ a [1]", "┌─ b [2] ✓ copied"]);
    }

    #[test]
    fn test_input_title_tracks_submit_state() {
        let mut app = App::new(Config::default(), Box::new(NoClipboard::new("test")));
        assert_eq!(input_title(&app), " Ask me anything ");

        app.conversation.input_mut().insert('h');
        assert_eq!(input_title(&app), " Enter to send ");

        app.conversation.begin_from_input();
        assert_eq!(input_title(&app), " Waiting for reply... ");
    }

    #[test]
    fn test_inline_code_drops_empty_runs() {
        let line = line_node_to_line(&LineNode::InlineMixed {
            parts: vec![
                InlinePart::Plain(String::new()),
                InlinePart::Code("x".to_string()),
                InlinePart::Plain(" y".to_string()),
            ],
        });
        assert_eq!(line.spans.len(), 2);
        assert_eq!(plain_text(&line), "x y");
    }

    #[test]
    fn test_message_header_marks_copy() {
        let mut tracker = CopyTracker::new();
        tracker.mark_copied(CopyId::Message(0));
        let lines = message_lines(0, &ChatMessage::user("hey"), true, &tracker);
        assert_eq!(plain_text(&lines[0]), "▶ You: ✓ copied");
        assert_eq!(plain_text(&lines[1]), "hey");
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("a".repeat(25)), Line::default(), Line::from("short")];
        assert_eq!(wrapped_height(&lines, 10), 5);
    }
}
