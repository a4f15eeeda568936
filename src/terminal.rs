// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front end
//!
//! Renders the scanner with ratatui: a tab bar (Camera, Upload, Paste), the
//! camera preview drawn with Unicode half-block characters, the last result
//! and a status bar. Key presses and bracketed pastes become [`Message`]s
//! for the application model.

use crate::app::{AppModel, Flow, InputTab, Message};
use crate::backends::camera::types::CameraFrame;
use crate::config::{AppTheme, Config};
use crate::constants::{session, ui};
use crate::decode::{DecodeCapability, FrameEvent};

use crossterm::{
    event::{
        DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph, Tabs, Widget, Wrap},
};
use std::io::{self, Stdout, stdout};
use std::sync::Arc;
use tracing::{debug, info};

type TerminalBackend = Terminal<CrosstermBackend<Stdout>>;

/// Run the terminal scanner until the user quits
pub async fn run<D: DecodeCapability>(
    capability: D,
    config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut model = AppModel::new(capability, config);
    let result = run_app(&mut terminal, &mut model).await;
    model.manager.stop_camera();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

/// What woke the event loop
enum Wake {
    Frame(FrameEvent),
    Terminal(Option<io::Result<Event>>),
    Preview,
    Tick,
}

async fn run_app<D: DecodeCapability>(
    terminal: &mut TerminalBackend,
    model: &mut AppModel<D>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(ui::TICK);

    info!("Terminal scanner started");

    loop {
        terminal.draw(|f| draw(f, model))?;

        let wake = tokio::select! {
            event = model.manager.next_event() => Wake::Frame(event),
            event = events.next() => Wake::Terminal(event),
            Ok(()) = model.preview.changed() => Wake::Preview,
            _ = tick.tick() => Wake::Tick,
        };

        let message = match wake {
            Wake::Frame(event) => Some(Message::Frame(event)),
            Wake::Terminal(Some(Ok(event))) => message_for_event(event, model.ui.tab),
            Wake::Terminal(Some(Err(e))) => return Err(e.into()),
            Wake::Terminal(None) => Some(Message::Quit),
            Wake::Preview | Wake::Tick => None,
        };

        if let Some(message) = message
            && model.update(message).await == Flow::Quit
        {
            break;
        }
    }

    info!("Terminal scanner exiting");
    Ok(())
}

/// Translate a terminal event for the active tab
pub fn message_for_event(event: Event, tab: InputTab) -> Option<Message> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => message_for_key(key, tab),
        // A paste gesture: read the real clipboard, which may hold an image
        Event::Paste(text) if tab == InputTab::Paste => {
            debug!(chars = text.len(), "Bracketed paste");
            Some(Message::PasteRequested)
        }
        _ => None,
    }
}

fn message_for_key(key: KeyEvent, tab: InputTab) -> Option<Message> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => Some(Message::Quit),
        KeyCode::Char('q') => Some(Message::Quit),
        KeyCode::Tab | KeyCode::Right => Some(Message::NextTab),
        KeyCode::BackTab | KeyCode::Left => Some(Message::PrevTab),
        KeyCode::Char(c @ '1'..='3') => {
            InputTab::from_index(c as usize - '1' as usize).map(Message::SelectTab)
        }
        KeyCode::Char('t') => Some(Message::ToggleTheme),
        KeyCode::Char('o') => Some(Message::OpenResult),
        KeyCode::Char(' ') | KeyCode::Enter => Some(match tab {
            InputTab::Camera => Message::ToggleCamera,
            InputTab::Upload => Message::UploadRequested,
            InputTab::Paste => Message::PasteRequested,
        }),
        KeyCode::Char('u') if tab == InputTab::Upload => Some(Message::UploadRequested),
        KeyCode::Char('v') if tab == InputTab::Paste => Some(Message::PasteRequested),
        _ => None,
    }
}

/// Colors for a theme
#[derive(Debug, Clone, Copy)]
struct Palette {
    fg: Color,
    bg: Color,
    muted: Color,
    accent: Color,
    error: Color,
}

impl Palette {
    fn for_theme(theme: AppTheme) -> Self {
        match theme {
            AppTheme::System => Self {
                fg: Color::Reset,
                bg: Color::Reset,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                error: Color::Red,
            },
            AppTheme::Dark => Self {
                fg: Color::White,
                bg: Color::Black,
                muted: Color::Gray,
                accent: Color::LightCyan,
                error: Color::LightRed,
            },
            AppTheme::Light => Self {
                fg: Color::Black,
                bg: Color::White,
                muted: Color::DarkGray,
                accent: Color::Blue,
                error: Color::Red,
            },
        }
    }

    fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }
}

fn draw<D: DecodeCapability>(f: &mut Frame, model: &AppModel<D>) {
    let palette = Palette::for_theme(model.ui.theme);
    let area = f.area();
    f.render_widget(Block::default().style(palette.base()), area);

    let result_height = if model.manager.last_result().is_some() { 6 } else { 0 };
    let [header, tabs, body, result, status] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(result_height),
        Constraint::Length(1),
    ])
    .areas(area);

    draw_header(f, header, model.ui.theme, palette);
    draw_tabs(f, tabs, model.ui.tab, palette);

    match model.ui.tab {
        InputTab::Camera => draw_camera_tab(f, body, model, palette),
        InputTab::Upload => draw_prompt(
            f,
            body,
            "Upload",
            "Press u or Enter to choose an image file",
            "[ Upload Image ]",
            palette,
        ),
        InputTab::Paste => draw_prompt(
            f,
            body,
            "Paste",
            "Paste an image here (v or your terminal's paste shortcut)",
            "",
            palette,
        ),
    }

    if result_height > 0 {
        draw_result(f, result, model, palette);
    }

    let (message, is_error) = match &model.ui.status {
        Some(status) => (status.text.clone(), status.is_error),
        None => (help_text(model.ui.tab), false),
    };
    f.render_widget(
        StatusBar {
            message: &message,
            is_error,
            palette,
        },
        status,
    );
}

fn draw_header(f: &mut Frame, area: Rect, theme: AppTheme, palette: Palette) {
    let icon = if theme == AppTheme::Light { "☾" } else { "☀" };
    let title = Line::from(vec![
        Span::styled(
            "QR Code Scanner",
            palette.base().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
    ]);
    f.render_widget(Paragraph::new(title).style(palette.base()), area);
    f.render_widget(
        Paragraph::new(format!("{} t ", icon))
            .alignment(Alignment::Right)
            .style(palette.base().fg(palette.muted)),
        area,
    );
}

fn draw_tabs(f: &mut Frame, area: Rect, tab: InputTab, palette: Palette) {
    let titles = InputTab::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{} {}", i + 1, t.title()));
    let tabs = Tabs::new(titles)
        .select(tab.index())
        .style(palette.base().fg(palette.muted))
        .highlight_style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );
    f.render_widget(tabs, area);
}

fn draw_camera_tab<D: DecodeCapability>(
    f: &mut Frame,
    area: Rect,
    model: &AppModel<D>,
    palette: Palette,
) {
    let [preview_area, button_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(area);

    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .title(session::MOUNT_POINT_ID)
        .style(palette.base().fg(palette.muted));
    let inner = block.inner(preview_area);
    f.render_widget(block, preview_area);

    let frame = if model.manager.is_camera_running() {
        model.preview.borrow().clone()
    } else {
        None
    };
    f.render_widget(
        &FrameWidget {
            frame,
            placeholder: if model.manager.is_camera_running() {
                "Waiting for camera..."
            } else {
                "Camera off"
            },
        },
        inner,
    );

    f.render_widget(
        Paragraph::new(format!("[ {} ]", model.camera_button_label()))
            .alignment(Alignment::Center)
            .style(palette.base().fg(palette.accent).add_modifier(Modifier::BOLD)),
        button_area,
    );
}

fn draw_prompt(
    f: &mut Frame,
    area: Rect,
    title: &str,
    prompt: &str,
    button: &str,
    palette: Palette,
) {
    let block = Block::bordered()
        .border_type(BorderType::Plain)
        .title(title.to_string())
        .style(palette.base().fg(palette.muted));

    let mut lines = vec![Line::from(""), Line::from(prompt.to_string())];
    if !button.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::styled(
            button.to_string(),
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ));
    }

    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block),
        area,
    );
}

fn draw_result<D: DecodeCapability>(
    f: &mut Frame,
    area: Rect,
    model: &AppModel<D>,
    palette: Palette,
) {
    let (Some(text), Some(action)) = (model.manager.last_result(), model.result_action()) else {
        return;
    };

    let mut title = format!("Scan Result: {}", action.kind());
    if action.openable_uri().is_some() {
        title.push_str(" (o to open)");
    }

    f.render_widget(
        Paragraph::new(text.to_string())
            .wrap(Wrap { trim: false })
            .style(palette.base())
            .block(
                Block::bordered()
                    .title(title)
                    .style(palette.base().fg(palette.accent)),
            ),
        area,
    );
}

fn help_text(tab: InputTab) -> String {
    let action = match tab {
        InputTab::Camera => "Space: start/stop",
        InputTab::Upload => "u: upload",
        InputTab::Paste => "v: paste",
    };
    format!("{} | Tab: switch | t: theme | o: open | q: quit", action)
}

/// Widget that renders a camera frame using half-block characters
struct FrameWidget {
    frame: Option<Arc<CameraFrame>>,
    placeholder: &'static str,
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.as_deref().filter(|f| f.width > 0 && f.height > 0) else {
            let msg = self.placeholder;
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        // Each terminal cell displays 2 vertical pixels using half-block characters
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        // Upper half (▀) takes the fg color, lower half the bg color
        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let (tr, tg, tb) = frame.rgb_at(src_x, src_y_top);
                let (br, bg, bb) = frame.rgb_at(src_x, src_y_bottom);

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(Color::Rgb(tr, tg, tb));
                    cell.set_bg(Color::Rgb(br, bg, bb));
                }
            }
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    is_error: bool,
    palette: Palette,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg = if self.is_error {
            self.palette.error
        } else {
            Color::DarkGray
        };

        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(bg);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(area.x, area.y, text, Style::default().fg(Color::White).bg(bg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn test_space_depends_on_tab() {
        assert!(matches!(
            message_for_event(press(KeyCode::Char(' ')), InputTab::Camera),
            Some(Message::ToggleCamera)
        ));
        assert!(matches!(
            message_for_event(press(KeyCode::Enter), InputTab::Upload),
            Some(Message::UploadRequested)
        ));
        assert!(matches!(
            message_for_event(press(KeyCode::Char(' ')), InputTab::Paste),
            Some(Message::PasteRequested)
        ));
    }

    #[test]
    fn test_tab_shortcuts() {
        assert!(matches!(
            message_for_event(press(KeyCode::Char('3')), InputTab::Camera),
            Some(Message::SelectTab(InputTab::Paste))
        ));
        assert!(matches!(
            message_for_event(press(KeyCode::Tab), InputTab::Camera),
            Some(Message::NextTab)
        ));
        assert!(message_for_event(press(KeyCode::Char('u')), InputTab::Camera).is_none());
    }

    #[test]
    fn test_ctrl_c_quits() {
        let event = Event::Key(KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        });
        assert!(matches!(
            message_for_event(event, InputTab::Upload),
            Some(Message::Quit)
        ));
    }

    #[test]
    fn test_bracketed_paste_only_on_paste_tab() {
        assert!(matches!(
            message_for_event(Event::Paste("x".into()), InputTab::Paste),
            Some(Message::PasteRequested)
        ));
        assert!(message_for_event(Event::Paste("x".into()), InputTab::Camera).is_none());
    }
}
