use crate::filter::Tab;
use crate::gallery::{Category, Gallery};
use crate::i18n::{Language, Translations, translations};
use crate::inbox::{Confirmation, Inbox};
use crate::models::{Message, MessageId, MessageStatus};
use chrono::{DateTime, Local, Utc};
use inflections::case::to_title_case;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
};
use tui_textarea::TextArea;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum View {
    #[default]
    Login,
    Inbox,
    Gallery,
    Upload,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum LoginField {
    #[default]
    Email,
    Password,
}

pub struct LoginForm<'a> {
    pub email: TextArea<'a>,
    pub password: TextArea<'a>,
    pub focused_field: LoginField,
    pub error: Option<String>,
}

impl<'a> Default for LoginForm<'a> {
    fn default() -> Self {
        let mut email = TextArea::default();
        let mut password = TextArea::default();
        let no_highlight = Style::default();
        email.set_cursor_line_style(no_highlight);
        password.set_cursor_line_style(no_highlight);
        password.set_mask_char('•');
        Self {
            email,
            password,
            focused_field: LoginField::Email,
            error: None,
        }
    }
}

impl<'a> LoginForm<'a> {
    pub fn get_email(&self) -> String {
        self.email.lines().join("").trim().to_string()
    }

    pub fn get_password(&self) -> String {
        self.password.lines().join("")
    }

    pub fn focused_textarea(&mut self) -> &mut TextArea<'a> {
        match self.focused_field {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn switch_field(&mut self) {
        self.focused_field = match self.focused_field {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }
}

pub struct UploadForm<'a> {
    pub path: TextArea<'a>,
    pub selected: Vec<String>,
    pub categories_focused: bool,
    pub cursor: usize,
}

impl<'a> Default for UploadForm<'a> {
    fn default() -> Self {
        let mut path = TextArea::default();
        path.set_cursor_line_style(Style::default());
        Self {
            path,
            selected: Vec::new(),
            categories_focused: false,
            cursor: 0,
        }
    }
}

impl<'a> UploadForm<'a> {
    pub fn get_path(&self) -> String {
        self.path.lines().join("").trim().to_string()
    }

    pub fn toggle_category(&mut self, category: &str) {
        if let Some(pos) = self.selected.iter().position(|c| c == category) {
            self.selected.remove(pos);
        } else {
            self.selected.push(category.to_string());
        }
    }
}

pub struct UIState<'a> {
    pub view: View,
    pub language: Language,
    pub selected_message_index: usize,
    pub selected_image_index: usize,
    pub list_scroll: usize,
    pub login: LoginForm<'a>,
    pub upload: UploadForm<'a>,
    pub search_input: Option<TextArea<'a>>,
    /// Screen area of the message list; clicks outside it collapse.
    pub list_area: Rect,
    /// Screen rows occupied by each visible message, for mouse hits.
    pub hit_regions: Vec<(MessageId, Rect)>,
    pub session_email: Option<String>,
}

impl<'a> Default for UIState<'a> {
    fn default() -> Self {
        Self {
            view: View::Login,
            language: Language::En,
            selected_message_index: 0,
            selected_image_index: 0,
            list_scroll: 0,
            login: LoginForm::default(),
            upload: UploadForm::default(),
            search_input: None,
            list_area: Rect::default(),
            hit_regions: Vec::new(),
            session_email: None,
        }
    }
}

impl<'a> UIState<'a> {
    pub fn message_at(&self, column: u16, row: u16) -> Option<MessageId> {
        self.hit_regions
            .iter()
            .find(|(_, rect)| rect.contains((column, row).into()))
            .map(|(id, _)| *id)
    }

    pub fn clamp_selection(&mut self, messages: usize, images: usize) {
        self.selected_message_index = self
            .selected_message_index
            .min(messages.saturating_sub(1));
        self.selected_image_index = self.selected_image_index.min(images.saturating_sub(1));
    }
}

pub fn render(f: &mut Frame, state: &mut UIState<'_>, inbox: &Inbox, gallery: &Gallery) {
    let t = translations(state.language);
    match state.view {
        View::Login => render_login(f, state, t),
        View::Inbox => render_inbox(f, state, inbox, t),
        View::Gallery | View::Upload => {
            render_gallery(f, state, gallery, t);
            if state.view == View::Upload {
                render_upload(f, state, gallery, t);
            }
        }
    }
}

fn header_line<'a>(title: &'a str, state: &UIState<'_>) -> Line<'a> {
    Line::from(vec![
        Span::styled(
            format!(" {} ", title),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            state.session_email.clone().unwrap_or_default(),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("  [{}]", state.language.code()),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

fn render_inbox(f: &mut Frame, state: &mut UIState<'_>, inbox: &Inbox, t: &Translations) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(3), // Tabs
            Constraint::Length(if state.search_input.is_some() { 3 } else { 0 }),
            Constraint::Min(3),    // Message list
            Constraint::Length(1), // Notice
            Constraint::Length(1), // Help
        ])
        .split(f.area());

    let mut header = header_line(t.inbox_title, state);
    if !inbox.pending_reads().is_empty() {
        header.spans.push(Span::styled(
            format!("  {} {}", t.unsaved_reads, inbox.pending_reads().len()),
            Style::default().fg(Color::Magenta),
        ));
    }
    f.render_widget(Paragraph::new(header), chunks[0]);

    let counts = inbox.counts();
    let titles: Vec<Line> = Tab::ALL
        .iter()
        .map(|tab| Line::from(format!("{} ({})", t.tab(*tab), inbox.tab_count(*tab))))
        .collect();
    let selected_tab = Tab::ALL.iter().position(|tab| *tab == inbox.tab()).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL))
        .select(selected_tab)
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, chunks[1]);

    if let Some(search) = &mut state.search_input {
        search.set_block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", t.search))
                .border_style(Style::default().fg(Color::Cyan)),
        );
        f.render_widget(&*search, chunks[2]);
    }

    let title = match inbox.search() {
        Some(q) => format!("{} ({}) - {}: \"{}\"", t.inbox_title, counts.active, t.search, q),
        None => format!("{} ({})", t.inbox_title, counts.active),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(chunks[3]);
    state.list_area = chunks[3];

    let visible = inbox.visible();
    state.clamp_selection(visible.len(), 0);

    if visible.is_empty() {
        state.hit_regions.clear();
        let empty = Paragraph::new(t.no_messages)
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(empty, chunks[3]);
    } else {
        let width = inner.width.saturating_sub(2) as usize;
        let mut lines: Vec<Line> = Vec::new();
        let mut regions: Vec<(MessageId, usize, usize)> = Vec::new();
        for (i, m) in visible.iter().enumerate() {
            let start = lines.len();
            let expanded = inbox.expanded() == Some(m.id);
            push_message_lines(
                &mut lines,
                m,
                i == state.selected_message_index,
                expanded,
                width,
                t,
            );
            regions.push((m.id, start, lines.len()));
            lines.push(Line::styled(
                "─".repeat(width),
                Style::default().fg(Color::DarkGray),
            ));
        }

        // Keep the selected message in view.
        let height = inner.height as usize;
        if let Some(&(_, start, end)) = regions.get(state.selected_message_index) {
            if start < state.list_scroll {
                state.list_scroll = start;
            } else if end > state.list_scroll + height {
                state.list_scroll = end.saturating_sub(height);
            }
        }
        state.list_scroll = state.list_scroll.min(lines.len().saturating_sub(1));

        state.hit_regions = regions
            .into_iter()
            .filter_map(|(id, start, end)| {
                let top = start.max(state.list_scroll);
                let bottom = end.min(state.list_scroll + height);
                (top < bottom).then(|| {
                    (
                        id,
                        Rect::new(
                            inner.x,
                            inner.y + (top - state.list_scroll) as u16,
                            inner.width,
                            (bottom - top) as u16,
                        ),
                    )
                })
            })
            .collect();

        let list = Paragraph::new(lines)
            .block(block)
            .scroll((state.list_scroll as u16, 0));
        f.render_widget(list, chunks[3]);
    }

    if let Some(notice) = inbox.notice() {
        let color = if notice.kind.is_error() {
            Color::Red
        } else {
            Color::Green
        };
        f.render_widget(
            Paragraph::new(format!(" {}", t.notice(notice.kind)))
                .style(Style::default().fg(color)),
            chunks[4],
        );
    }
    f.render_widget(
        Paragraph::new(format!(" {}", t.inbox_help)).style(Style::default().fg(Color::DarkGray)),
        chunks[5],
    );

    if let Some(confirmation) = inbox.confirmation() {
        let prompt = match confirmation {
            Confirmation::DeleteOne(_) => t.confirm_delete_one,
            Confirmation::DeleteAllArchived => t.confirm_delete_archived,
        };
        render_confirm(f, prompt, t);
    }
}

fn push_message_lines<'a>(
    lines: &mut Vec<Line<'a>>,
    m: &Message,
    selected: bool,
    expanded: bool,
    width: usize,
    t: &Translations,
) {
    let mut style = if selected {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    match m.status {
        MessageStatus::Unread => style = style.add_modifier(Modifier::BOLD),
        MessageStatus::Archived => style = style.add_modifier(Modifier::DIM),
        MessageStatus::Read => {}
    }

    let indicator = if selected { "█" } else { " " };
    let arrow = if expanded { "▾" } else { "▸" };
    let sender = m.email.as_deref().unwrap_or(t.unknown_sender);
    lines.push(Line::styled(
        truncate(&format!("{}{} {}", indicator, arrow, sender), width),
        style,
    ));
    lines.push(Line::styled(
        format!("{}  {}", indicator, format_time(m.created_at_parsed())),
        style.remove_modifier(Modifier::BOLD).fg(Color::Gray),
    ));

    if expanded {
        lines.push(Line::from(format!(
            "   {}: {}",
            t.name,
            m.name.as_deref().unwrap_or(t.unknown_sender)
        )));
        lines.push(Line::from(""));
        let body = clean_body(m.body.as_deref().unwrap_or(""));
        for line in body.split('\n') {
            for chunk in wrap(line, width.saturating_sub(3)) {
                lines.push(Line::from(format!("   {}", chunk)));
            }
        }
    }
}

fn format_time(created_at: Option<DateTime<Utc>>) -> String {
    match created_at {
        Some(date) => date
            .with_timezone(&Local)
            .format("%b %d %Y @ %-I:%M%p")
            .to_string(),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, len: usize) -> String {
    if s.chars().count() > len {
        let truncated: String = s.chars().take(len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

fn wrap(line: &str, width: usize) -> Vec<String> {
    if width == 0 || line.is_empty() {
        return vec![line.to_string()];
    }
    let chars: Vec<char> = line.chars().collect();
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

fn render_gallery(f: &mut Frame, state: &mut UIState<'_>, gallery: &Gallery, t: &Translations) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    f.render_widget(Paragraph::new(header_line(t.gallery_title, state)), chunks[0]);

    let mut titles: Vec<Line> = vec![Line::from(t.tab_all)];
    titles.extend(
        gallery
            .categories()
            .iter()
            .map(|c| Line::from(to_title_case(c))),
    );
    let selected = match gallery.filter() {
        Category::All => 0,
        Category::Tag(tag) => gallery
            .categories()
            .iter()
            .position(|c| c == tag)
            .map_or(0, |i| i + 1),
    };
    f.render_widget(
        Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL))
            .select(selected)
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        chunks[1],
    );

    let visible = gallery.visible();
    state.clamp_selection(usize::MAX, visible.len());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(t.gallery_title)
        .border_style(Style::default().fg(Color::Yellow));

    if visible.is_empty() {
        f.render_widget(
            Paragraph::new(t.no_images)
                .block(block)
                .style(Style::default().fg(Color::DarkGray)),
            chunks[2],
        );
    } else {
        let width = chunks[2].width.saturating_sub(2) as usize;
        let lines: Vec<Line> = visible
            .iter()
            .enumerate()
            .map(|(i, img)| {
                let is_selected = i == state.selected_image_index;
                let style = if is_selected {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };
                let categories: Vec<String> =
                    img.categories.iter().map(|c| to_title_case(c)).collect();
                let date = format_time(img.created_at.as_deref().and_then(crate::models::parse_timestamp));
                let text = format!(
                    "{}#{:<5} {:<32} {:<22} {}",
                    if is_selected { "█" } else { " " },
                    img.id,
                    categories.join(", "),
                    date,
                    img.title.as_deref().unwrap_or(&img.image_url)
                );
                Line::styled(truncate(&text, width), style)
            })
            .collect();
        let height = chunks[2].height.saturating_sub(2) as usize;
        let scroll = state.selected_image_index.saturating_sub(height.saturating_sub(1));
        f.render_widget(
            Paragraph::new(lines).block(block).scroll((scroll as u16, 0)),
            chunks[2],
        );
    }

    if let Some(kind) = gallery.notice() {
        f.render_widget(
            Paragraph::new(format!(" {}", t.gallery_notice(kind)))
                .style(Style::default().fg(Color::Cyan)),
            chunks[3],
        );
    }
    f.render_widget(
        Paragraph::new(format!(" {}", t.gallery_help)).style(Style::default().fg(Color::DarkGray)),
        chunks[4],
    );

    if gallery.pending_delete().is_some() {
        render_confirm(f, t.confirm_delete_image, t);
    }
}

fn render_upload(f: &mut Frame, state: &mut UIState<'_>, gallery: &Gallery, t: &Translations) {
    let area = centered_rect(60, 50, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .title(t.upload_title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(inner);

    let path_border = if state.upload.categories_focused {
        Color::Gray
    } else {
        Color::Cyan
    };
    state.upload.path.set_block(
        Block::default()
            .borders(Borders::ALL)
            .title(t.upload_path)
            .border_style(Style::default().fg(path_border)),
    );
    f.render_widget(&state.upload.path, chunks[0]);

    let lines: Vec<Line> = gallery
        .categories()
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let checked = state.upload.selected.contains(c);
            let mut style = if checked {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let at_cursor = state.upload.categories_focused && i == state.upload.cursor;
            if at_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::styled(
                format!(
                    " {} [{}] {}",
                    i + 1,
                    if checked { "x" } else { " " },
                    to_title_case(c)
                ),
                style,
            )
        })
        .collect();
    f.render_widget(Paragraph::new(lines), chunks[1]);
    f.render_widget(
        Paragraph::new(t.upload_hint)
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: true }),
        chunks[2],
    );
}

fn render_confirm(f: &mut Frame, prompt: &str, t: &Translations) {
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let text = vec![
        Line::from(""),
        Line::styled(
            prompt.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::from(""),
        Line::styled(t.confirm_hint, Style::default().fg(Color::Gray)),
    ];
    f.render_widget(
        Paragraph::new(text)
            .block(block)
            .alignment(ratatui::layout::Alignment::Center)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_login(f: &mut Frame, state: &mut UIState<'_>, t: &Translations) {
    let area = centered_rect(50, 40, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(t.login_title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(inner);

    let form = &mut state.login;
    let focused = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let unfocused = Style::default().fg(Color::Gray);

    let email_style = if form.focused_field == LoginField::Email {
        focused
    } else {
        unfocused
    };
    form.email.set_block(
        Block::default()
            .borders(Borders::ALL)
            .title(t.email)
            .border_style(email_style),
    );
    f.render_widget(&form.email, chunks[0]);

    let password_style = if form.focused_field == LoginField::Password {
        focused
    } else {
        unfocused
    };
    form.password.set_block(
        Block::default()
            .borders(Borders::ALL)
            .title(t.password)
            .border_style(password_style),
    );
    f.render_widget(&form.password, chunks[1]);

    f.render_widget(
        Paragraph::new(t.login_hint).style(Style::default().fg(Color::Gray)),
        chunks[2],
    );

    if let Some(error) = &form.error {
        f.render_widget(
            Paragraph::new(format!("{}: {}", t.login_failed, error))
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true }),
            chunks[3],
        );
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Normalizes line endings, trims trailing whitespace and collapses runs
/// of blank lines to one.
fn clean_body(body: &str) -> String {
    let normalized = body.replace("\r\n", "\n").replace('\r', "\n");
    let mut result = String::with_capacity(normalized.len());

    let mut consecutive_empty_lines = 0;
    let mut first_content = true;

    for line in normalized.split('\n') {
        let trimmed = line.trim_end();

        if trimmed.is_empty() {
            consecutive_empty_lines += 1;
        } else {
            if !first_content {
                let newlines_to_add = std::cmp::min(consecutive_empty_lines + 1, 2);
                for _ in 0..newlines_to_add {
                    result.push('\n');
                }
            }

            result.push_str(trimmed);
            consecutive_empty_lines = 0;
            first_content = false;
        }
    }

    result
}
