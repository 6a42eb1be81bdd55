mod auth;
mod cache;
mod config;
mod filter;
mod gallery;
mod gateway;
mod i18n;
mod inbox;
mod models;
mod rest;
mod ui;

use crate::auth::TokenStore;
use crate::cache::ListCache;
use crate::config::{Config, matches_key};
use crate::gallery::Gallery;
use crate::gateway::Gateway;
use crate::inbox::Inbox;
use crate::models::{MessageId, Session};
use crate::rest::RestClient;
use crate::ui::{UIState, UploadForm, View};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::Position;
use std::io;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tui_textarea::TextArea;

const LOG_FILE: &str = "steelworks.log";
const DEFAULT_CACHE_URL: &str = "sqlite:steelworks.db?mode=rwc";

struct App<'a> {
    config: Config,
    client: RestClient,
    store: TokenStore,
    cache: ListCache,
    inbox: Inbox,
    gallery: Gallery,
    session: Option<Session>,
    ui: UIState<'a>,
    should_quit: bool,
}

impl<'a> App<'a> {
    fn selected_message(&self) -> Option<MessageId> {
        self.inbox
            .visible()
            .get(self.ui.selected_message_index)
            .map(|m| m.id)
    }

    /// Loads the inbox and the signed-in user side by side.
    async fn enter_inbox(&mut self) {
        let (loaded, session) = futures::join!(
            self.inbox.load_messages(&self.client),
            self.client.get_session()
        );
        if let Err(e) = loaded {
            warn!("{}", e);
        }
        match session {
            Ok(session) => self.set_session(session),
            Err(e) => warn!("Could not fetch session: {}", e),
        }
        self.ui.view = View::Inbox;
    }

    fn set_session(&mut self, session: Option<Session>) {
        self.ui.session_email = session.as_ref().and_then(|s| s.email.clone());
        self.session = session;
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        match self.ui.view {
            View::Login => self.handle_login_key(key).await,
            View::Inbox => self.handle_inbox_key(key).await,
            View::Gallery => self.handle_gallery_key(key).await,
            View::Upload => self.handle_upload_key(key).await,
        }
    }

    async fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab => self.ui.login.switch_field(),
            KeyCode::Enter => {
                let email = self.ui.login.get_email();
                let password = self.ui.login.get_password();
                match auth::sign_in(&self.client, &self.store, &email, &password).await {
                    Ok(_) => {
                        self.ui.login = ui::LoginForm::default();
                        self.enter_inbox().await;
                    }
                    Err(e) => {
                        error!("Sign-in failed: {:#}", e);
                        self.ui.login.error = Some(format!("{:#}", e));
                    }
                }
            }
            _ => {
                self.ui.login.focused_textarea().input(key);
            }
        }
    }

    async fn handle_inbox_key(&mut self, key: KeyEvent) {
        if self.inbox.confirmation().is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    if let Err(e) = self.inbox.confirm(&self.client).await {
                        warn!("{}", e);
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => self.inbox.cancel_confirmation(),
                _ => {}
            }
            return;
        }

        if let Some(search) = &mut self.ui.search_input {
            match key.code {
                KeyCode::Esc => {
                    self.ui.search_input = None;
                    self.inbox.set_search(None);
                }
                KeyCode::Enter => self.ui.search_input = None,
                _ => {
                    search.input(key);
                    let query = search.lines().join("");
                    self.inbox.set_search(Some(query));
                    self.ui.selected_message_index = 0;
                }
            }
            return;
        }

        let keys = &self.config.keybindings;
        if matches_key(key, &keys.quit) {
            self.should_quit = true;
        } else if matches_key(key, &keys.next_tab) || matches_key(key, &keys.prev_tab) {
            let tab = if matches_key(key, &keys.next_tab) {
                self.inbox.tab().next()
            } else {
                self.inbox.tab().prev()
            };
            self.inbox.select_tab(&self.client, tab).await;
            self.ui.selected_message_index = 0;
            self.ui.list_scroll = 0;
        } else if matches_key(key, &keys.move_down) {
            let len = self.inbox.visible().len();
            if self.ui.selected_message_index < len.saturating_sub(1) {
                self.ui.selected_message_index += 1;
            }
        } else if matches_key(key, &keys.move_up) {
            self.ui.selected_message_index = self.ui.selected_message_index.saturating_sub(1);
        } else if matches_key(key, &keys.toggle_expand) {
            if let Some(id) = self.selected_message() {
                self.inbox.toggle_expand(id);
            }
        } else if matches_key(key, &keys.collapse) {
            self.inbox.collapse();
        } else if matches_key(key, &keys.archive) {
            if let Some(id) = self.selected_message() {
                if let Err(e) = self.inbox.archive(&self.client, id).await {
                    warn!("{}", e);
                }
            }
        } else if matches_key(key, &keys.restore) {
            if let Some(id) = self.selected_message() {
                if let Err(e) = self.inbox.restore(&self.client, id).await {
                    warn!("{}", e);
                }
            }
        } else if matches_key(key, &keys.delete_archived) {
            self.inbox.request_delete_all_archived();
        } else if matches_key(key, &keys.delete) {
            if let Some(id) = self.selected_message() {
                self.inbox.request_delete(id);
            }
        } else if matches_key(key, &keys.refresh) {
            if let Err(e) = self.inbox.flush_read_queue(&self.client).await {
                warn!("{}", e);
            }
            if let Err(e) = self.inbox.load_messages(&self.client).await {
                warn!("{}", e);
            }
        } else if matches_key(key, &keys.search) {
            let mut input = TextArea::from([self.inbox.search().unwrap_or_default()]);
            input.move_cursor(tui_textarea::CursorMove::End);
            self.ui.search_input = Some(input);
        } else if matches_key(key, &keys.switch_view) {
            // Leaving the inbox is a boundary like any other.
            if let Err(e) = self.inbox.flush_read_queue(&self.client).await {
                warn!("{}", e);
            }
            self.inbox.collapse();
            self.ui.view = View::Gallery;
            if let Err(e) = self.gallery.load(&self.client, &self.cache).await {
                warn!("{}", e);
            }
        } else if matches_key(key, &keys.language) {
            self.ui.language = self.ui.language.toggle();
        }
    }

    async fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.ui.view != View::Inbox
            || self.inbox.confirmation().is_some()
            || self.ui.search_input.is_some()
        {
            return;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(id) = self.ui.message_at(mouse.column, mouse.row) {
                    if let Some(index) = self.inbox.visible().iter().position(|m| m.id == id) {
                        self.ui.selected_message_index = index;
                    }
                    self.inbox.toggle_expand(id);
                } else {
                    let point = Position::new(mouse.column, mouse.row);
                    if let Err(e) = self
                        .inbox
                        .handle_outside_interaction(&self.client, point, &self.ui.list_area)
                        .await
                    {
                        warn!("{}", e);
                    }
                }
            }
            MouseEventKind::ScrollDown => {
                let len = self.inbox.visible().len();
                if self.ui.selected_message_index < len.saturating_sub(1) {
                    self.ui.selected_message_index += 1;
                }
            }
            MouseEventKind::ScrollUp => {
                self.ui.selected_message_index = self.ui.selected_message_index.saturating_sub(1);
            }
            _ => {}
        }
    }

    async fn handle_gallery_key(&mut self, key: KeyEvent) {
        if self.gallery.pending_delete().is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    if let Err(e) = self.gallery.confirm_delete(&self.client, &self.cache).await {
                        warn!("{}", e);
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => self.gallery.cancel_delete(),
                _ => {}
            }
            return;
        }

        let keys = &self.config.keybindings;
        let selected = self
            .gallery
            .visible()
            .get(self.ui.selected_image_index)
            .map(|img| (img.id, img.image_url.clone()));

        if matches_key(key, &keys.quit) {
            self.should_quit = true;
        } else if matches_key(key, &keys.next_tab) {
            self.gallery.cycle_filter(true);
            self.ui.selected_image_index = 0;
        } else if matches_key(key, &keys.prev_tab) {
            self.gallery.cycle_filter(false);
            self.ui.selected_image_index = 0;
        } else if matches_key(key, &keys.move_down) {
            let len = self.gallery.visible().len();
            if self.ui.selected_image_index < len.saturating_sub(1) {
                self.ui.selected_image_index += 1;
            }
        } else if matches_key(key, &keys.move_up) {
            self.ui.selected_image_index = self.ui.selected_image_index.saturating_sub(1);
        } else if matches_key(key, &keys.open_image) {
            if let Some((_, url)) = selected {
                if let Err(e) = open::that(&url) {
                    error!("Could not open {}: {}", url, e);
                }
            }
        } else if matches_key(key, &keys.delete) {
            if let Some((id, _)) = selected {
                if let Err(e) = self.gallery.request_delete(id, self.session.as_ref()) {
                    warn!("{}", e);
                }
            }
        } else if matches_key(key, &keys.upload) {
            self.ui.upload = UploadForm::default();
            self.ui.view = View::Upload;
        } else if matches_key(key, &keys.refresh) {
            if let Err(e) = self.gallery.reload(&self.client, &self.cache).await {
                warn!("{}", e);
            }
        } else if matches_key(key, &keys.switch_view) {
            self.ui.view = View::Inbox;
        } else if matches_key(key, &keys.language) {
            self.ui.language = self.ui.language.toggle();
        }
    }

    async fn handle_upload_key(&mut self, key: KeyEvent) {
        let form = &mut self.ui.upload;
        match key.code {
            KeyCode::Esc => self.ui.view = View::Gallery,
            KeyCode::Tab | KeyCode::BackTab => form.categories_focused = !form.categories_focused,
            KeyCode::Enter => {
                let path = PathBuf::from(form.get_path());
                let categories = form.selected.clone();
                let uploaded = self
                    .gallery
                    .upload(
                        &self.client,
                        &self.cache,
                        self.session.as_ref(),
                        &path,
                        &categories,
                    )
                    .await;
                match uploaded {
                    Ok(_) => {
                        self.gallery.set_filter(gallery::Category::All);
                        self.ui.selected_image_index = 0;
                        self.ui.view = View::Gallery;
                    }
                    Err(e) => warn!("{}", e),
                }
            }
            _ if form.categories_focused => {
                let categories = self.gallery.categories();
                match key.code {
                    KeyCode::Up => form.cursor = form.cursor.saturating_sub(1),
                    KeyCode::Down => {
                        if form.cursor < categories.len().saturating_sub(1) {
                            form.cursor += 1;
                        }
                    }
                    KeyCode::Char(' ') => {
                        if let Some(category) = categories.get(form.cursor) {
                            form.toggle_category(category);
                        }
                    }
                    KeyCode::Char(c @ '1'..='9') => {
                        let index = c as usize - '1' as usize;
                        if let Some(category) = categories.get(index) {
                            form.cursor = index;
                            form.toggle_category(category);
                        }
                    }
                    _ => {}
                }
            }
            _ => {
                form.path.input(key);
            }
        }
    }
}

fn init_logging() -> anyhow::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)?;
    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .init();
    Ok(())
}

fn cache_url_from_args(args: &[String]) -> String {
    args.iter()
        .position(|a| a == "--cache")
        .and_then(|i| args.get(i + 1))
        .cloned()
        .unwrap_or_else(|| DEFAULT_CACHE_URL.to_string())
}

async fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App<'_>) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| ui::render(f, &mut app.ui, &app.inbox, &app.gallery))?;

        if !event::poll(std::time::Duration::from_millis(100))? {
            continue;
        }

        match event::read()? {
            Event::Key(key) => app.handle_key(key).await,
            Event::Mouse(mouse) => app.handle_mouse(mouse).await,
            _ => {}
        }

        if app.should_quit {
            // Whatever has been read but not written goes out now.
            if let Err(e) = app.inbox.flush_read_queue(&app.client).await {
                error!("Read state lost on quit: {}", e);
            }
            return Ok(());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--debug") {
        init_logging()?;
    }

    let store = TokenStore;
    if args.iter().any(|arg| arg == "--reset-token") {
        store.clear()?;
        println!("Session cleared. Please restart without --reset-token to sign in again.");
        return Ok(());
    }

    let config = Config::load();
    if config.backend.url.is_empty() || config.backend.anon_key.is_empty() {
        anyhow::bail!(
            "Backend not configured: set [backend] url and anon_key in {} or STEELWORKS_URL/STEELWORKS_ANON_KEY",
            config::SETTINGS_FILE
        );
    }

    let client = RestClient::new(&config.backend.url, &config.backend.anon_key)?;
    let cache = ListCache::new(&cache_url_from_args(&args), config.gallery.cache_ttl()).await?;
    cache.run_migrations().await?;
    for entry in cache.entries().await? {
        debug!(
            "Cached {}: {} bytes from {}",
            entry.dataset, entry.bytes, entry.fetched_at
        );
    }

    let tokens = auth::restore_session(&client, &store)
        .await
        .unwrap_or_else(|e| {
            warn!("Could not restore session: {:#}", e);
            None
        });

    let mut app = App {
        inbox: Inbox::new(config.inbox.unread_policy, config.inbox.notice_ttl()),
        gallery: Gallery::new(
            config.gallery.categories.clone(),
            config.access.admin_user_ids.clone(),
            config.inbox.notice_ttl(),
        ),
        ui: UIState {
            language: config.language,
            ..UIState::default()
        },
        config,
        client,
        store,
        cache,
        session: None,
        should_quit: false,
    };

    if tokens.is_some() {
        info!("Resuming stored session");
        app.enter_inbox().await;
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::event::DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_url_from_args() {
        let args: Vec<String> = ["steelworks", "--cache", "sqlite::memory:"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(cache_url_from_args(&args), "sqlite::memory:");
        assert_eq!(cache_url_from_args(&args[..1]), DEFAULT_CACHE_URL);
        assert_eq!(cache_url_from_args(&args[..2]), DEFAULT_CACHE_URL);
    }
}
