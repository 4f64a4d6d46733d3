use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

use jumpbox_core::navigator::{MenuEntry, MenuView};

use super::input::InputState;
use super::theme::styles;

/// A free-text question drawn over the menu
pub struct PromptOverlay<'a> {
    pub question: &'a str,
    pub answer: &'a str,
}

pub fn render(f: &mut Frame, view: &MenuView, input: &InputState, prompt: Option<PromptOverlay>) {
    let area = f.area();

    // [ title + breadcrumb ]
    // [ entries ]
    // [ note ]
    // [ input ]
    // [ footer ]
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    f.render_widget(Paragraph::new(header_line(view)), outer[0]);

    let items: Vec<ListItem> = view.entries.iter().map(entry_item).collect();
    let list_title = match (&view.filter, &view.listing) {
        (Some(filter), _) => format!(" filter: {} ({}) ", filter, view.entries.len()),
        (None, Some(listing)) => format!(" {} ({}) ", listing, view.entries.len()),
        (None, None) => format!(" {} ", view.breadcrumb.last().unwrap_or(&view.title)),
    };
    let list = List::new(items)
        .block(
            Block::default()
                .title(list_title)
                .borders(Borders::ALL)
                .border_style(styles::border_subtle()),
        )
        .highlight_style(styles::selection())
        .highlight_symbol("▶ ");
    let mut list_state = ListState::default();
    if !view.entries.is_empty() {
        list_state.select(Some(input.selected.min(view.entries.len() - 1)));
    }
    f.render_stateful_widget(list, outer[1], &mut list_state);

    if let Some(note) = &view.note {
        f.render_widget(
            Paragraph::new(Span::styled(format!(" {}", note.text), styles::note(note.kind))),
            outer[2],
        );
    }

    let input_block = Block::default()
        .title(" Selection ")
        .borders(Borders::ALL)
        .border_style(if prompt.is_none() {
            styles::border_focused()
        } else {
            styles::border_subtle()
        });
    let input_line = Line::from(vec![
        Span::styled("> ", styles::accent()),
        Span::styled(input.buffer.as_str(), styles::text()),
    ]);
    f.render_widget(Paragraph::new(input_line).block(input_block), outer[3]);

    f.render_widget(Paragraph::new(footer_line(view)), outer[4]);

    match prompt {
        Some(prompt) => render_prompt(f, area, &prompt),
        None => {
            let cursor_x = outer[3].x + 3 + input.buffer.chars().count() as u16;
            f.set_cursor_position((cursor_x.min(outer[3].right().saturating_sub(2)), outer[3].y + 1));
        }
    }
}

fn header_line(view: &MenuView) -> Line<'_> {
    let mut spans = vec![Span::styled(format!(" {} ", view.title), styles::accent_bold())];
    for crumb in &view.breadcrumb {
        spans.push(Span::styled("› ", styles::text_muted()));
        spans.push(Span::styled(format!("{} ", crumb), styles::text()));
    }
    Line::from(spans)
}

fn entry_item(entry: &MenuEntry) -> ListItem<'_> {
    let number = Span::styled(format!("{:>3} - ", entry.number), styles::text_dim());
    let line = if entry.is_device {
        let mut spans = vec![
            number,
            Span::styled(entry.label.as_str(), styles::text()),
            Span::styled(": ", styles::text_dim()),
            Span::styled(entry.detail.as_str(), styles::text_dim()),
        ];
        if let Some(status) = entry.status.as_deref().filter(|s| !s.eq_ignore_ascii_case("active")) {
            spans.push(Span::styled(format!("  [{}]", status), styles::text_muted()));
        }
        Line::from(spans)
    } else {
        Line::from(vec![
            number,
            Span::styled(entry.label.as_str(), styles::group()),
            Span::styled(format!("  ({})", entry.detail), styles::text_muted()),
        ])
    };
    ListItem::new(line)
}

fn footer_line(view: &MenuView) -> Line<'_> {
    let mut spans = vec![
        Span::styled(" ↑↓", styles::key_hint()),
        Span::styled(" move  ", styles::text_dim()),
        Span::styled("enter", styles::key_hint()),
        Span::styled(" select  ", styles::text_dim()),
        Span::styled("esc", styles::key_hint()),
        Span::styled(format!(" {}  ", view.back_hint), styles::text_dim()),
        Span::styled("text", styles::key_hint()),
        Span::styled(" filter  ", styles::text_dim()),
        Span::styled("search <text>", styles::key_hint()),
        Span::styled("/", styles::text_dim()),
        Span::styled("all", styles::key_hint()),
        Span::styled(" devices  ", styles::text_dim()),
    ];
    if view.quick_connect {
        spans.push(Span::styled("connect <host>", styles::key_hint()));
        spans.push(Span::styled(" direct  ", styles::text_dim()));
    }
    spans.push(Span::styled("q", styles::key_hint()));
    spans.push(Span::styled(" quit  ", styles::text_dim()));
    spans.push(Span::styled(
        concat!("v", env!("CARGO_PKG_VERSION")),
        styles::text_muted(),
    ));
    Line::from(spans)
}

/// 60% of the screen, kept between 30 and 60 columns where the screen allows
fn popup_width(screen: u16) -> u16 {
    let share = (u32::from(screen) * 60 / 100) as u16;
    share.clamp(30.min(screen), 60.min(screen))
}

fn render_prompt(f: &mut Frame, area: Rect, prompt: &PromptOverlay) {
    let width = popup_width(area.width);
    let height = 3.min(area.height);
    let rect = Rect {
        x: area.width.saturating_sub(width) / 2,
        y: area.height.saturating_sub(height) / 2,
        width,
        height,
    };

    f.render_widget(Clear, rect);
    let block = Block::default()
        .title(format!(" {} ", prompt.question))
        .borders(Borders::ALL)
        .border_style(styles::border_focused());
    let line = Line::from(vec![
        Span::styled("> ", styles::accent()),
        Span::styled(prompt.answer, styles::text()),
    ]);
    f.render_widget(Paragraph::new(line).block(block), rect);

    let cursor_x = rect.x + 3 + prompt.answer.chars().count() as u16;
    f.set_cursor_position((cursor_x.min(rect.right().saturating_sub(2)), rect.y + 1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use jumpbox_core::navigator::Note;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn view() -> MenuView {
        MenuView {
            title: "Jumpbox".into(),
            breadcrumb: vec!["nyc".into(), "switch".into()],
            entries: vec![
                MenuEntry {
                    number: 1,
                    label: "core-sw1".into(),
                    detail: "10.0.0.1".into(),
                    is_device: true,
                    status: Some("Active".into()),
                },
                MenuEntry {
                    number: 2,
                    label: "core-sw2".into(),
                    detail: "10.0.0.2".into(),
                    is_device: true,
                    status: Some("Offline".into()),
                },
            ],
            listing: None,
            filter: None,
            back_hint: "Return to nyc menu".into(),
            note: Some(Note::error("could not connect to core-sw2 (10.0.0.2)")),
            quick_connect: false,
        }
    }

    fn rows(terminal: &Terminal<TestBackend>) -> Vec<String> {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    #[test]
    fn test_renders_entries_breadcrumb_and_note() {
        let mut terminal = Terminal::new(TestBackend::new(100, 16)).unwrap();
        terminal
            .draw(|f| render(f, &view(), &InputState::default(), None))
            .unwrap();
        let screen = rows(&terminal).join("\n");

        assert!(screen.contains("Jumpbox"));
        assert!(screen.contains("nyc"));
        assert!(screen.contains("1 - core-sw1: 10.0.0.1"));
        assert!(screen.contains("2 - core-sw2: 10.0.0.2  [Offline]"));
        assert!(!screen.contains("[Active]"));
        assert!(screen.contains("could not connect to core-sw2"));
        assert!(screen.contains("Return to nyc menu"));
    }

    #[test]
    fn test_renders_filter_and_group_counts() {
        let mut v = view();
        v.filter = Some("sw".into());
        v.entries = vec![MenuEntry {
            number: 1,
            label: "switch".into(),
            detail: "2 devices".into(),
            is_device: false,
            status: None,
        }];
        v.note = None;

        let mut terminal = Terminal::new(TestBackend::new(100, 16)).unwrap();
        terminal
            .draw(|f| render(f, &v, &InputState::default(), None))
            .unwrap();
        let screen = rows(&terminal).join("\n");

        assert!(screen.contains("filter: sw (1)"));
        assert!(screen.contains("1 - switch  (2 devices)"));
    }

    #[test]
    fn test_renders_listing_title() {
        let mut v = view();
        v.listing = Some("Search: core".into());
        v.note = None;

        let mut terminal = Terminal::new(TestBackend::new(100, 16)).unwrap();
        terminal
            .draw(|f| render(f, &v, &InputState::default(), None))
            .unwrap();
        let screen = rows(&terminal).join("\n");

        assert!(screen.contains("Search: core (2)"));
        assert!(screen.contains("1 - core-sw1: 10.0.0.1"));
    }

    #[test]
    fn test_popup_width_on_any_screen() {
        assert_eq!(popup_width(12), 12);
        assert_eq!(popup_width(80), 48);
        assert_eq!(popup_width(2000), 60);
        assert_eq!(popup_width(u16::MAX), 60);
    }

    #[test]
    fn test_renders_prompt_overlay() {
        let mut terminal = Terminal::new(TestBackend::new(80, 16)).unwrap();
        terminal
            .draw(|f| {
                render(
                    f,
                    &view(),
                    &InputState::default(),
                    Some(PromptOverlay {
                        question: "Username",
                        answer: "netops",
                    }),
                )
            })
            .unwrap();
        let screen = rows(&terminal).join("\n");

        assert!(screen.contains("Username"));
        assert!(screen.contains("> netops"));
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(12, 4)).unwrap();
        terminal
            .draw(|f| {
                render(
                    f,
                    &view(),
                    &InputState::default(),
                    Some(PromptOverlay {
                        question: "Username",
                        answer: "",
                    }),
                )
            })
            .unwrap();
    }
}
